/* Dex file format structures */

use crate::dex::annotations::{AnnotationSetItem, AnnotationsDirectoryItem};
use crate::dex::class_data::ClassDataItem;
use crate::dex::error::DexError;
use crate::dex::{read_cstring_bytes, read_u2, read_u4, read_uleb128, read_x};
use crate::{err, fail};
use bitflags::bitflags;
use log::debug;
use once_cell::sync::OnceCell;

use std::collections::HashMap;

/* Constants */
pub const DEX_FILE_MAGIC_PREFIX: [u8; 4] = [ 0x64, 0x65, 0x78, 0x0a ];
pub const MIN_DEX_VERSION: u32 = 35;
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const HEADER_SIZE: usize = 0x70;
pub const NO_INDEX: u32 = 0xffffffff;

pub const INHERITED_ANNOTATION_DESCRIPTOR: &str = "Ljava/lang/annotation/Inherited;";

bitflags! {
    /// access_flags of classes, fields and methods.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

type StringId = u32;
type TypeId = u32;
type ProtoId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringIdItem {
    pub string_data_off: u32,
}

impl StringIdItem {
    pub const SIZE: usize = 4;

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<StringIdItem, DexError> {
        Ok(StringIdItem { string_data_off: read_u4(bytes, ix)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeIdItem {
    pub descriptor_idx: StringId,
}

impl TypeIdItem {
    pub const SIZE: usize = 4;

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<TypeIdItem, DexError> {
        Ok(TypeIdItem { descriptor_idx: read_u4(bytes, ix)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrototypeItem {
    // The proto_id_item struct
    pub shorty_idx: StringId,
    pub return_type_idx: TypeId,
    pub parameters_off: u32,
}

impl PrototypeItem {
    pub const SIZE: usize = 12;

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<PrototypeItem, DexError> {
        Ok(PrototypeItem {
            shorty_idx: read_u4(bytes, ix)?,
            return_type_idx: read_u4(bytes, ix)?,
            parameters_off: read_u4(bytes, ix)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldItem {
    // The field_id_item struct
    pub class_idx: TypeId,
    pub type_idx: TypeId,
    pub name_idx: StringId
}

impl FieldItem
{
    pub const SIZE: usize = 8;

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<FieldItem, DexError>
    {
        Ok(FieldItem {
            class_idx: read_u2(bytes, ix)? as TypeId,
            type_idx: read_u2(bytes, ix)? as TypeId,
            name_idx: read_u4(bytes, ix)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodItem {
    // The method_id_item struct
    pub class_idx: TypeId,
    pub proto_idx: ProtoId,
    pub name_idx: StringId
}

impl MethodItem
{
    pub const SIZE: usize = 8;

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<MethodItem, DexError>
    {
        Ok(MethodItem {
            class_idx: read_u2(bytes, ix)? as TypeId,
            proto_idx: read_u2(bytes, ix)? as ProtoId,
            name_idx: read_u4(bytes, ix)?,
        })
    }
}

/// class_def_item. Offsets are left unresolved; zero means "not present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDefItem {
    pub class_idx: TypeId,
    pub access_flags: u32,
    /// `NO_INDEX` for java.lang.Object
    pub superclass_idx: TypeId,
    pub interfaces_off: u32,
    pub source_file_idx: StringId,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
}

impl ClassDefItem
{
    pub const SIZE: usize = 0x20;

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDefItem, DexError>
    {
        Ok(ClassDefItem {
            class_idx: read_u4(bytes, ix)?,
            access_flags: read_u4(bytes, ix)?,
            superclass_idx: read_u4(bytes, ix)?,
            interfaces_off: read_u4(bytes, ix)?,
            source_file_idx: read_u4(bytes, ix)?,
            annotations_off: read_u4(bytes, ix)?,
            class_data_off: read_u4(bytes, ix)?,
            static_values_off: read_u4(bytes, ix)?,
        })
    }

    pub fn flags(&self) -> AccessFlags
    {
        AccessFlags::from_bits_retain(self.access_flags)
    }

    pub fn is_interface(&self) -> bool
    {
        self.flags().contains(AccessFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool
    {
        self.flags().contains(AccessFlags::ABSTRACT)
    }

    /// Neither abstract nor an interface.
    pub fn is_concrete(&self) -> bool
    {
        !self.is_abstract() && !self.is_interface()
    }

    pub fn has_annotations(&self) -> bool
    {
        self.annotations_off != 0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<Header, DexError>
    {
        if bytes.len() < HEADER_SIZE {
            fail!(MalformedContainer, "Not enough bytes for header: {} < {}", bytes.len(), HEADER_SIZE);
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&read_x(bytes, ix, 8)?);
        Self::validate_magic(&magic)?;
        let checksum = read_u4(bytes, ix)?;
        let mut signature = [0u8; 20];
        signature.copy_from_slice(&read_x(bytes, ix, 20)?);
        let file_size = read_u4(bytes, ix)?;
        let header_size = read_u4(bytes, ix)?;
        let endian_tag = read_u4(bytes, ix)?;
        if endian_tag != ENDIAN_CONSTANT {
            fail!(MalformedContainer, "Invalid endian tag: 0x{:08x}", endian_tag);
        }

        Ok(Header {
            magic,
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size: read_u4(bytes, ix)?,
            link_off: read_u4(bytes, ix)?,
            map_off: read_u4(bytes, ix)?,
            string_ids_size: read_u4(bytes, ix)?,
            string_ids_off: read_u4(bytes, ix)?,
            type_ids_size: read_u4(bytes, ix)?,
            type_ids_off: read_u4(bytes, ix)?,
            proto_ids_size: read_u4(bytes, ix)?,
            proto_ids_off: read_u4(bytes, ix)?,
            field_ids_size: read_u4(bytes, ix)?,
            field_ids_off: read_u4(bytes, ix)?,
            method_ids_size: read_u4(bytes, ix)?,
            method_ids_off: read_u4(bytes, ix)?,
            class_defs_size: read_u4(bytes, ix)?,
            class_defs_off: read_u4(bytes, ix)?,
            data_size: read_u4(bytes, ix)?,
            data_off: read_u4(bytes, ix)?,
        })
    }

    // "dex\n" + three version digits + NUL
    fn validate_magic(magic: &[u8; 8]) -> Result<(), DexError>
    {
        let digits = &magic[4..7];
        if magic[..4] != DEX_FILE_MAGIC_PREFIX || magic[7] != 0 || !digits.iter().all(|d| d.is_ascii_digit()) {
            fail!(MalformedContainer, "Invalid magic value: {:02x?}", magic);
        }
        let version = digits.iter().fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32);
        if version < MIN_DEX_VERSION {
            fail!(MalformedContainer, "Unsupported dex version {:03}", version);
        }
        Ok(())
    }

    /// Numeric dex version from the magic, e.g. 35, 37, 38, 39.
    pub fn version(&self) -> u32
    {
        self.magic[4..7].iter().fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32)
    }
}

/// Read `count` fixed-size records starting at `offset`.
fn parse_table<T>(
    bytes: &[u8],
    offset: u32,
    count: u32,
    record_size: usize,
    read: impl Fn(&[u8], &mut usize) -> Result<T, DexError>,
) -> Result<Vec<T>, DexError>
{
    let needed = (count as usize).checked_mul(record_size).and_then(|n| n.checked_add(offset as usize));
    match needed {
        Some(end) if end <= bytes.len() => {}
        _ => fail!(MalformedContainer, "Table of {} x {} bytes at 0x{:x} runs past end of file", count, record_size, offset),
    }

    let mut items = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let mut ix = offset as usize + i * record_size;
        items.push(read(bytes, &mut ix)?);
    }
    Ok(items)
}

/// Decode a string_data_item payload: MUTF-8, with standard UTF-8 accepted as well.
fn decode_mutf8(raw: &[u8]) -> Result<String, DexError>
{
    if let Ok(s) = cesu8::from_java_cesu8(raw) {
        return Ok(s.into_owned());
    }
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => fail!(MalformedContainer, "Invalid MUTF-8 string data: {}", e),
    }
}

/// One parsed dex segment. Immutable after construction; the two lookup tables are
/// computed on first use.
#[derive(Debug)]
pub struct DexFile {
    pub header: Header,
    pub strings: Vec<StringIdItem>,
    pub types: Vec<TypeIdItem>,
    pub prototypes: Vec<PrototypeItem>,
    pub fields: Vec<FieldItem>,
    pub methods: Vec<MethodItem>,
    pub class_defs: Vec<ClassDefItem>,
    data: Vec<u8>,
    class_def_by_type: OnceCell<HashMap<TypeId, usize>>,
    inherited_annotation_type: OnceCell<Option<TypeId>>,
}

impl DexFile {

    fn read(bytes: &[u8], ix: &mut usize) -> Result<DexFile, DexError>
    {
        let header = Header::read(bytes, ix)?;

        let strings = parse_table(bytes, header.string_ids_off, header.string_ids_size, StringIdItem::SIZE, StringIdItem::read)?;
        let types = parse_table(bytes, header.type_ids_off, header.type_ids_size, TypeIdItem::SIZE, TypeIdItem::read)?;
        let prototypes = parse_table(bytes, header.proto_ids_off, header.proto_ids_size, PrototypeItem::SIZE, PrototypeItem::read)?;
        let fields = parse_table(bytes, header.field_ids_off, header.field_ids_size, FieldItem::SIZE, FieldItem::read)?;
        let methods = parse_table(bytes, header.method_ids_off, header.method_ids_size, MethodItem::SIZE, MethodItem::read)?;
        let class_defs = parse_table(bytes, header.class_defs_off, header.class_defs_size, ClassDefItem::SIZE, ClassDefItem::read)?;

        debug!(
            "dex {:03}: {} strings, {} types, {} fields, {} methods, {} classes",
            header.version(), strings.len(), types.len(), fields.len(), methods.len(), class_defs.len()
        );

        Ok(DexFile {
            header,
            strings,
            types,
            prototypes,
            fields,
            methods,
            class_defs,
            data: bytes.to_vec(),
            class_def_by_type: OnceCell::new(),
            inherited_annotation_type: OnceCell::new(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DexFile, DexError>
    {
        let mut ix = 0;
        DexFile::read(bytes, &mut ix)
    }

    /// The raw segment buffer; all offsets in the tables are positions into it.
    pub fn data(&self) -> &[u8]
    {
        &self.data
    }

    pub fn get_string(&self, id: StringId) -> Result<String, DexError>
    {
        let Some(string_id) = self.strings.get(id as usize) else {
            fail!(MalformedContainer, "String index {} out of range ({} strings)", id, self.strings.len());
        };
        let mut ix = string_id.string_data_off as usize;
        // utf16_size, not needed to find the terminator
        read_uleb128(&self.data, &mut ix)?;
        let raw = read_cstring_bytes(&self.data, &mut ix)?;
        decode_mutf8(&raw)
    }

    /// Raw descriptor of a type, e.g. `Lcom/example/Foo;`.
    pub fn type_descriptor(&self, id: TypeId) -> Result<String, DexError>
    {
        let Some(type_id) = self.types.get(id as usize) else {
            fail!(MalformedContainer, "Type index {} out of range ({} types)", id, self.types.len());
        };
        self.get_string(type_id.descriptor_idx)
    }

    pub fn class_descriptor(&self, class_def: &ClassDefItem) -> Result<String, DexError>
    {
        self.type_descriptor(class_def.class_idx)
    }

    /// `None` only for a class without a superclass (java.lang.Object).
    pub fn superclass_descriptor(&self, class_def: &ClassDefItem) -> Result<Option<String>, DexError>
    {
        if class_def.superclass_idx == NO_INDEX {
            return Ok(None);
        }
        self.type_descriptor(class_def.superclass_idx).map(Some)
    }

    pub fn field(&self, id: u32) -> Result<&FieldItem, DexError>
    {
        self.fields
            .get(id as usize)
            .ok_or_else(|| err!(MalformedContainer, "Field index {} out of range ({} fields)", id, self.fields.len()))
    }

    pub fn method(&self, id: u32) -> Result<&MethodItem, DexError>
    {
        self.methods
            .get(id as usize)
            .ok_or_else(|| err!(MalformedContainer, "Method index {} out of range ({} methods)", id, self.methods.len()))
    }

    pub fn method_name(&self, id: u32) -> Result<String, DexError>
    {
        self.get_string(self.method(id)?.name_idx)
    }

    /// Empty class data when the class has none (e.g. marker interfaces).
    pub fn class_data(&self, class_def: &ClassDefItem) -> Result<ClassDataItem, DexError>
    {
        if class_def.class_data_off == 0 {
            return Ok(ClassDataItem::default());
        }
        let mut ix = class_def.class_data_off as usize;
        ClassDataItem::read(&self.data, &mut ix)
    }

    /// Absolute method_ids indices of the class's virtual methods, in declaration order.
    pub fn virtual_method_indices(&self, class_def: &ClassDefItem) -> Result<Vec<u32>, DexError>
    {
        Ok(self.class_data(class_def)?.virtual_method_indices())
    }

    pub fn annotations_directory(&self, class_def: &ClassDefItem) -> Result<Option<AnnotationsDirectoryItem>, DexError>
    {
        if !class_def.has_annotations() {
            return Ok(None);
        }
        let mut ix = class_def.annotations_off as usize;
        AnnotationsDirectoryItem::read(&self.data, &mut ix).map(Some)
    }

    /// The class definition for a type, if that type is defined in this segment.
    pub fn class_def_for_type(&self, type_idx: TypeId) -> Option<&ClassDefItem>
    {
        let map = self.class_def_by_type.get_or_init(|| {
            self.class_defs
                .iter()
                .enumerate()
                .map(|(i, c)| (c.class_idx, i))
                .collect()
        });
        map.get(&type_idx).map(|&i| &self.class_defs[i])
    }

    /// Type index of `java.lang.annotation.Inherited`, if this segment references it at all.
    pub fn inherited_annotation_type(&self) -> Result<Option<TypeId>, DexError>
    {
        self.inherited_annotation_type
            .get_or_try_init(|| {
                for i in 0..self.types.len() as TypeId {
                    if self.type_descriptor(i)? == INHERITED_ANNOTATION_DESCRIPTOR {
                        return Ok(Some(i));
                    }
                }
                Ok(None)
            })
            .copied()
    }

    /// Whether the annotation type `type_idx` is itself annotated with `@Inherited`.
    ///
    /// Only a direct lookup on the type's own class annotations; an annotation type that is
    /// not defined in this segment is never considered inherited.
    pub fn is_inherited_annotation(&self, type_idx: TypeId) -> Result<bool, DexError>
    {
        let Some(inherited) = self.inherited_annotation_type()? else {
            return Ok(false);
        };
        let Some(class_def) = self.class_def_for_type(type_idx) else {
            return Ok(false);
        };
        let Some(directory) = self.annotations_directory(class_def)? else {
            return Ok(false);
        };
        let items = AnnotationSetItem::read_items(&self.data, directory.class_annotations_off)?;
        Ok(items.iter().any(|item| item.annotation.type_idx == inherited))
    }
}
