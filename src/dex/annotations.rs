//! DEX annotations-related structures
//!
//! Implements the binary annotation structures of the dex format that the test scanner needs:
//! - annotations_directory_item
//! - annotation_set_item
//! - annotation_item (wraps EncodedAnnotation)

use crate::dex::encoded_values::EncodedAnnotation;
use crate::dex::error::DexError;
use crate::dex::{read_u1, read_u4};

/// annotation_item
/// https://source.android.com/docs/core/runtime/dex-format#annotation-item
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationItem {
    /// Visibility: 0x00 = build, 0x01 = runtime, 0x02 = system
    pub visibility: u8,
    /// The encoded annotation payload
    pub annotation: EncodedAnnotation,
}

impl AnnotationItem {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<AnnotationItem, DexError> {
        let visibility = read_u1(bytes, ix)?;
        let annotation = EncodedAnnotation::read(bytes, ix)?;
        Ok(AnnotationItem {
            visibility,
            annotation,
        })
    }
}

/// annotation_set_item
/// A list of offsets to `annotation_item`s
/// https://source.android.com/docs/core/runtime/dex-format#annotation-set-item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSetItem {
    /// Offsets (from start of the file) to `annotation_item`s
    pub entries: Vec<u32>,
}

impl AnnotationSetItem {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<AnnotationSetItem, DexError> {
        let size = read_u4(bytes, ix)? as usize;
        let mut entries = Vec::with_capacity(size.min(256));
        for _ in 0..size {
            entries.push(read_u4(bytes, ix)?);
        }
        Ok(AnnotationSetItem { entries })
    }

    /// Read the set at `off` and every annotation it points at, in declaration order.
    pub fn read_items(bytes: &[u8], off: u32) -> Result<Vec<AnnotationItem>, DexError> {
        if off == 0 { return Ok(vec![]); }
        let mut ix = off as usize;
        let set = AnnotationSetItem::read(bytes, &mut ix)?;
        let mut items = Vec::with_capacity(set.entries.len());
        for entry_off in set.entries {
            if entry_off == 0 { continue; }
            let mut j = entry_off as usize;
            items.push(AnnotationItem::read(bytes, &mut j)?);
        }
        Ok(items)
    }
}

/// field_annotations_item
/// https://source.android.com/docs/core/runtime/dex-format#field-annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnnotations {
    /// index into field_ids
    pub field_idx: u32,
    /// offset to an `annotation_set_item`
    pub annotations_off: u32,
}

impl FieldAnnotations {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<FieldAnnotations, DexError> {
        Ok(FieldAnnotations {
            field_idx: read_u4(bytes, ix)?,
            annotations_off: read_u4(bytes, ix)?,
        })
    }
}

/// method_annotations_item
/// https://source.android.com/docs/core/runtime/dex-format#method-annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodAnnotations {
    /// index into method_ids
    pub method_idx: u32,
    /// offset to an `annotation_set_item`
    pub annotations_off: u32,
}

impl MethodAnnotations {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<MethodAnnotations, DexError> {
        Ok(MethodAnnotations {
            method_idx: read_u4(bytes, ix)?,
            annotations_off: read_u4(bytes, ix)?,
        })
    }
}

/// parameter_annotations_item
/// https://source.android.com/docs/core/runtime/dex-format#parameter-annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAnnotations {
    /// index into method_ids (method whose parameters are being annotated)
    pub method_idx: u32,
    /// offset to an `annotation_set_ref_list`
    pub annotations_off: u32,
}

impl ParameterAnnotations {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<ParameterAnnotations, DexError> {
        Ok(ParameterAnnotations {
            method_idx: read_u4(bytes, ix)?,
            annotations_off: read_u4(bytes, ix)?,
        })
    }
}

/// annotations_directory_item
/// https://source.android.com/docs/core/runtime/dex-format#annotations-directory-item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationsDirectoryItem {
    /// Offset to the class `annotation_set_item` (or 0 if none)
    pub class_annotations_off: u32,
    pub field_annotations: Vec<FieldAnnotations>,
    pub method_annotations: Vec<MethodAnnotations>,
    pub parameter_annotations: Vec<ParameterAnnotations>,
}

impl AnnotationsDirectoryItem {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<AnnotationsDirectoryItem, DexError> {
        let class_annotations_off = read_u4(bytes, ix)?;
        let fields_size = read_u4(bytes, ix)? as usize;
        let annotated_methods_size = read_u4(bytes, ix)? as usize;
        let annotated_parameters_size = read_u4(bytes, ix)? as usize;

        let mut field_annotations = Vec::with_capacity(fields_size.min(256));
        for _ in 0..fields_size {
            field_annotations.push(FieldAnnotations::read(bytes, ix)?);
        }

        let mut method_annotations = Vec::with_capacity(annotated_methods_size.min(256));
        for _ in 0..annotated_methods_size {
            method_annotations.push(MethodAnnotations::read(bytes, ix)?);
        }

        let mut parameter_annotations = Vec::with_capacity(annotated_parameters_size.min(256));
        for _ in 0..annotated_parameters_size {
            parameter_annotations.push(ParameterAnnotations::read(bytes, ix)?);
        }

        Ok(AnnotationsDirectoryItem {
            class_annotations_off,
            field_annotations,
            method_annotations,
            parameter_annotations,
        })
    }

    /// Offset of the annotation set attached to `method_idx`, if it has one.
    pub fn method_annotations_off(&self, method_idx: u32) -> Option<u32> {
        self.method_annotations
            .iter()
            .find(|ma| ma.method_idx == method_idx)
            .map(|ma| ma.annotations_off)
    }

    pub fn has_method_annotations(&self, method_idx: u32) -> bool {
        self.method_annotations.iter().any(|ma| ma.method_idx == method_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::encoded_values::{AnnotationElement, EncodedValue};

    fn le(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_annotations_directory_read() {
        // class set at 0x1000, one field, two methods, one parameter entry
        let buf = le(&[0x1000, 1, 2, 1, 1, 0x2000, 2, 0x3000, 7, 0x3100, 3, 0x4000]);
        let mut ix = 0;
        let dir = AnnotationsDirectoryItem::read(&buf, &mut ix).expect("read failed");
        assert_eq!(ix, buf.len());
        assert_eq!(dir.class_annotations_off, 0x1000);
        assert_eq!(dir.field_annotations, vec![FieldAnnotations { field_idx: 1, annotations_off: 0x2000 }]);
        assert_eq!(dir.method_annotations.len(), 2);
        assert_eq!(dir.parameter_annotations, vec![ParameterAnnotations { method_idx: 3, annotations_off: 0x4000 }]);

        assert_eq!(dir.method_annotations_off(7), Some(0x3100));
        assert_eq!(dir.method_annotations_off(3), None);
        assert!(dir.has_method_annotations(2));
        assert!(!dir.has_method_annotations(1));
    }

    #[test]
    fn test_annotation_set_items_in_order() {
        // set at 0: two entries pointing at items at 12 and 17
        let mut buf = le(&[2, 12, 17]);
        // item: runtime visibility, type 5, no elements
        buf.extend_from_slice(&[0x01, 0x05, 0x00]);
        buf.extend_from_slice(&[0x00, 0x00]);
        // item: build visibility, type 6, one element name 2 = true
        buf.extend_from_slice(&[0x00, 0x06, 0x01, 0x02, 0x3F]);

        let items = AnnotationSetItem::read_items(&buf, 0).unwrap();
        assert!(items.is_empty(), "offset 0 means no set");

        let mut shifted = vec![0u8; 4];
        let base = 4u32;
        shifted.extend(le(&[2, 12 + base, 17 + base]));
        shifted.extend_from_slice(&buf[12..]);
        let items = AnnotationSetItem::read_items(&shifted, base).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].visibility, 1);
        assert_eq!(items[0].annotation.type_idx, 5);
        assert_eq!(
            items[1].annotation.elements,
            vec![AnnotationElement { name_idx: 2, value: EncodedValue::Boolean(true) }]
        );
    }
}
