//! Resolve class and method annotation sets into [`TestAnnotation`]s.

use crate::dex::annotations::{AnnotationItem, AnnotationSetItem, AnnotationsDirectoryItem};
use crate::dex::error::DexError;
use crate::dex::DexFile;
use crate::parser::decoded_value::decode_elements;
use crate::parser::format::format_descriptor;
use crate::parser::test_method::TestAnnotation;

/// All class-level annotations, in declaration order.
pub fn get_class_annotations(dex: &DexFile, directory: Option<&AnnotationsDirectoryItem>) -> Result<Vec<TestAnnotation>, DexError>
{
    match directory {
        Some(d) if d.class_annotations_off != 0 => decode_annotation_set(dex, d.class_annotations_off),
        _ => Ok(vec![]),
    }
}

/// Annotations attached to the method at `method_idx` in the method_ids table.
pub fn get_method_annotations(
    dex: &DexFile,
    method_idx: u32,
    directory: Option<&AnnotationsDirectoryItem>,
) -> Result<Vec<TestAnnotation>, DexError>
{
    match directory.and_then(|d| d.method_annotations_off(method_idx)) {
        Some(off) => decode_annotation_set(dex, off),
        None => Ok(vec![]),
    }
}

fn decode_annotation_set(dex: &DexFile, off: u32) -> Result<Vec<TestAnnotation>, DexError>
{
    AnnotationSetItem::read_items(dex.data(), off)?
        .iter()
        .map(|item| decode_annotation(dex, item))
        .collect()
}

pub fn decode_annotation(dex: &DexFile, item: &AnnotationItem) -> Result<TestAnnotation, DexError>
{
    let type_idx = item.annotation.type_idx;
    Ok(TestAnnotation {
        name: format_descriptor(&dex.type_descriptor(type_idx)?)?,
        values: decode_elements(dex, &item.annotation.elements)?,
        inherited: dex.is_inherited_annotation(type_idx)?,
    })
}
