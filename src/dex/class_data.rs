//! class_data_item: the field and method lists of a class definition.

use crate::dex::error::DexError;
use crate::dex::read_uleb128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField
{
    /// Absolute index into field_ids
    pub field_idx: u32,
    pub access_flags: u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMethod
{
    /// Absolute index into method_ids
    pub method_idx: u32,
    pub access_flags: u32,
    /// Offset to the code_item, 0 for abstract and native methods. Not followed.
    pub code_off: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDataItem {
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassDataItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDataItem, DexError>
    {
        let static_field_size = read_uleb128(bytes, ix)?;
        let instance_field_size = read_uleb128(bytes, ix)?;
        let direct_method_size = read_uleb128(bytes, ix)?;
        let virtual_method_size = read_uleb128(bytes, ix)?;

        // Each list is delta-encoded and restarts its running index at zero.
        let static_fields = read_fields(bytes, ix, static_field_size)?;
        let instance_fields = read_fields(bytes, ix, instance_field_size)?;
        let direct_methods = read_methods(bytes, ix, direct_method_size)?;
        let virtual_methods = read_methods(bytes, ix, virtual_method_size)?;

        Ok(ClassDataItem { static_fields, instance_fields, direct_methods, virtual_methods })
    }

    pub fn virtual_method_indices(&self) -> Vec<u32>
    {
        self.virtual_methods.iter().map(|m| m.method_idx).collect()
    }
}

fn read_fields(bytes: &[u8], ix: &mut usize, count: u32) -> Result<Vec<EncodedField>, DexError>
{
    let mut fields = Vec::with_capacity((count as usize).min(1024));
    let mut offset: u32 = 0;
    for _ in 0..count {
        offset = offset.wrapping_add(read_uleb128(bytes, ix)?);
        fields.push(EncodedField { field_idx: offset, access_flags: read_uleb128(bytes, ix)? });
    }
    Ok(fields)
}

fn read_methods(bytes: &[u8], ix: &mut usize, count: u32) -> Result<Vec<EncodedMethod>, DexError>
{
    let mut methods = Vec::with_capacity((count as usize).min(1024));
    let mut offset: u32 = 0;
    for _ in 0..count {
        offset = offset.wrapping_add(read_uleb128(bytes, ix)?);
        let access_flags = read_uleb128(bytes, ix)?;
        let code_off = read_uleb128(bytes, ix)?;
        methods.push(EncodedMethod { method_idx: offset, access_flags, code_off });
    }
    Ok(methods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::write_uleb128;

    #[test]
    fn virtual_methods_follow_every_other_list()
    {
        let mut bytes = vec![];
        // 1 static field, 2 instance fields, 1 direct method, 3 virtual methods
        for n in [1, 2, 1, 3] { write_uleb128(&mut bytes, n); }
        // static field 4
        for n in [4, 0x8] { write_uleb128(&mut bytes, n); }
        // instance fields 1, 2 (restarting from zero)
        for n in [1, 0x2, 1, 0x2] { write_uleb128(&mut bytes, n); }
        // direct method 300 with a large code offset, so sizes vary
        for n in [300, 0x10001, 0x12345] { write_uleb128(&mut bytes, n); }
        // virtual methods 5, 7, 200
        for n in [5, 0x1, 0x100, 2, 0x1, 0x104, 193, 0x401, 0] { write_uleb128(&mut bytes, n); }

        let mut ix = 0;
        let cd = ClassDataItem::read(&bytes, &mut ix).unwrap();
        assert_eq!(ix, bytes.len());
        assert_eq!(cd.static_fields, vec![EncodedField { field_idx: 4, access_flags: 8 }]);
        assert_eq!(cd.instance_fields.iter().map(|f| f.field_idx).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(cd.direct_methods[0].method_idx, 300);
        assert_eq!(cd.direct_methods[0].code_off, 0x12345);
        assert_eq!(cd.virtual_method_indices(), vec![5, 7, 200]);
        assert_eq!(cd.virtual_methods[2].access_flags, 0x401);
    }

    #[test]
    fn truncated_class_data_fails()
    {
        let mut bytes = vec![];
        for n in [0, 0, 0, 2, 1, 1, 0] { write_uleb128(&mut bytes, n); }
        let mut ix = 0;
        assert!(ClassDataItem::read(&bytes, &mut ix).is_err());
    }
}
