use std::fmt;

/// Build a [`DexError`] value of the given kind.
#[macro_export]
macro_rules! err {
    ($kind:ident, $msg:literal) => {
        $crate::dex::error::DexError::new($crate::dex::error::DexErrorKind::$kind, $msg)
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        $crate::dex::error::DexError::new($crate::dex::error::DexErrorKind::$kind, &format!($fmtstr, $($args)*))
    };
}

/// Return early with a [`DexError`] of the given kind.
#[macro_export]
macro_rules! fail {
    ($kind:ident, $msg:literal) => {
        return Err($crate::err!($kind, $msg))
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        return Err($crate::err!($kind, $fmtstr, $($args)*))
    };
}

/// Which check failed while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DexErrorKind
{
    /// Bad magic, bad endian tag, or a read past the end of the buffer.
    MalformedContainer,
    /// A uleb128 value still had its continuation bit set on the 5th byte.
    MalformedVarint,
    /// An encoded_value carried a value type this decoder does not know.
    UnsupportedEncodedValueTag,
    /// A class was reached again while its own superclass chain was being resolved.
    CyclicHierarchy,
}

impl fmt::Display for DexErrorKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let s = match self {
            DexErrorKind::MalformedContainer => "malformed dex container",
            DexErrorKind::MalformedVarint => "malformed uleb128",
            DexErrorKind::UnsupportedEncodedValueTag => "unsupported encoded value",
            DexErrorKind::CyclicHierarchy => "cyclic class hierarchy",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DexError
{
    kind: DexErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError
{
    pub(crate) fn new(kind: DexErrorKind, msg: &str) -> Self
    {
        DexError {
            kind,
            msg: msg.to_string(),
            contexts: Vec::new(),
        }
    }

    pub(crate) fn with_context(base: DexError, context: String) -> Self
    {
        let mut contexts = base.contexts;
        contexts.push(context);
        DexError { kind: base.kind, msg: base.msg, contexts }
    }

    pub fn kind(&self) -> DexErrorKind
    {
        self.kind
    }

    pub fn message(&self) -> &str
    {
        &self.msg
    }
}

impl fmt::Display for DexError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}: {}", self.kind, self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_chains_contexts()
    {
        let e = err!(MalformedContainer, "Unexpected end of stream reading u4 at index {}", 12);
        let e = DexError::with_context(e, "class Lfoo/Bar;".to_string());
        let e = DexError::with_context(e, "dex segment #2".to_string());
        assert_eq!(e.kind(), DexErrorKind::MalformedContainer);
        assert_eq!(
            e.to_string(),
            "malformed dex container: Unexpected end of stream reading u4 at index 12 for class Lfoo/Bar; of dex segment #2"
        );
    }

    #[test]
    fn kinds_are_distinguishable()
    {
        let bad_magic = err!(MalformedContainer, "Invalid magic value");
        let bad_tag = err!(UnsupportedEncodedValueTag, "Unknown EncodedValue type 0x{:02x}", 0x05);
        assert_ne!(bad_magic.kind(), bad_tag.kind());
        assert!(bad_tag.to_string().starts_with("unsupported encoded value"));
    }
}
