use crate::dex::encoded_values::{AnnotationElement, EncodedValue};
use crate::dex::error::DexError;
use crate::dex::DexFile;
use crate::parser::format::format_descriptor;
use serde::Serialize;

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// An annotation value with every pool reference resolved to text.
///
/// Floats and doubles compare and hash by bit pattern, so `NaN == NaN` here and
/// `0.0 != -0.0`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DecodedValue {
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Raw type descriptor, e.g. `Ljava/lang/Exception;`
    Type(String),
    /// Name of the enum constant
    Enum(String),
    Boolean(bool),
    Null,
    Array(Vec<DecodedValue>),
    Annotation {
        name: String,
        values: BTreeMap<String, DecodedValue>,
    },
}

impl DecodedValue
{
    pub fn from_encoded(dex: &DexFile, value: &EncodedValue) -> Result<DecodedValue, DexError>
    {
        Ok(match value {
            EncodedValue::Byte(v) => DecodedValue::Byte(*v),
            EncodedValue::Short(v) => DecodedValue::Short(*v),
            EncodedValue::Char(v) => DecodedValue::Char(*v),
            EncodedValue::Int(v) => DecodedValue::Int(*v),
            EncodedValue::Long(v) => DecodedValue::Long(*v),
            EncodedValue::Float(v) => DecodedValue::Float(*v),
            EncodedValue::Double(v) => DecodedValue::Double(*v),
            EncodedValue::String(idx) => DecodedValue::String(dex.get_string(*idx)?),
            EncodedValue::Type(idx) => DecodedValue::Type(dex.type_descriptor(*idx)?),
            EncodedValue::Enum(idx) => DecodedValue::Enum(dex.get_string(dex.field(*idx)?.name_idx)?),
            EncodedValue::Boolean(v) => DecodedValue::Boolean(*v),
            EncodedValue::Null => DecodedValue::Null,
            EncodedValue::Array(values) => DecodedValue::Array(
                values.iter().map(|v| DecodedValue::from_encoded(dex, v)).collect::<Result<_, _>>()?,
            ),
            EncodedValue::Annotation(annotation) => DecodedValue::Annotation {
                name: format_descriptor(&dex.type_descriptor(annotation.type_idx)?)?,
                values: decode_elements(dex, &annotation.elements)?,
            },
            // Never seen in test annotations
            EncodedValue::MethodType(_)
            | EncodedValue::MethodHandle(_)
            | EncodedValue::Field(_)
            | EncodedValue::Method(_) => DecodedValue::Null,
        })
    }
}

/// Resolve annotation elements to a name -> value map.
pub(crate) fn decode_elements(dex: &DexFile, elements: &[AnnotationElement]) -> Result<BTreeMap<String, DecodedValue>, DexError>
{
    let mut values = BTreeMap::new();
    for element in elements {
        let name = dex.get_string(element.name_idx)?;
        values.insert(name, DecodedValue::from_encoded(dex, &element.value)?);
    }
    Ok(values)
}

impl PartialEq for DecodedValue
{
    fn eq(&self, other: &Self) -> bool
    {
        use DecodedValue::*;
        match (self, other) {
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (String(a), String(b)) => a == b,
            (Type(a), Type(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Null, Null) => true,
            (Array(a), Array(b)) => a == b,
            (Annotation { name: n1, values: v1 }, Annotation { name: n2, values: v2 }) => n1 == n2 && v1 == v2,
            _ => false,
        }
    }
}

impl Eq for DecodedValue {}

impl Hash for DecodedValue
{
    fn hash<H: Hasher>(&self, state: &mut H)
    {
        use DecodedValue::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Byte(v) => v.hash(state),
            Short(v) => v.hash(state),
            Char(v) => v.hash(state),
            Int(v) => v.hash(state),
            Long(v) => v.hash(state),
            Float(v) => v.to_bits().hash(state),
            Double(v) => v.to_bits().hash(state),
            String(v) | Type(v) | Enum(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Null => {}
            Array(v) => v.hash(state),
            Annotation { name, values } => {
                name.hash(state);
                values.hash(state);
            }
        }
    }
}
