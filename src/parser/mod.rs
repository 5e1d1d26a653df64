//! Test discovery over parsed dex segments.
//!
//! [`find_test_methods`] runs JUnit3 and JUnit4 discovery over every segment of a package
//! and returns the combined list sorted by test name.

pub mod annotations;
pub mod decoded_value;
pub mod format;
pub mod junit3;
pub mod junit4;
pub mod test_method;

pub use crate::parser::decoded_value::DecodedValue;
pub use crate::parser::test_method::{TestAnnotation, TestMethod};

use crate::dex::error::DexError;
use crate::dex::DexFile;
use crate::parser::junit3::find_junit3_tests;
use crate::parser::junit4::find_junit4_tests;
use log::{debug, info};

/// Parse raw segment buffers, in order. Errors name the failing segment (1-based).
pub fn parse_segments<B: AsRef<[u8]>>(raw_segments: &[B]) -> Result<Vec<DexFile>, DexError>
{
    raw_segments
        .iter()
        .enumerate()
        .map(|(i, bytes)| {
            debug!("parsing dex segment #{} ({} bytes)", i + 1, bytes.as_ref().len());
            DexFile::from_bytes(bytes.as_ref()).map_err(|e| DexError::with_context(e, format!("dex segment #{}", i + 1)))
        })
        .collect()
}

/// All JUnit3 and JUnit4 test methods in `raw_segments`, sorted by test name.
///
/// `custom_annotations` are extra dotted annotation names that mark a method as a test.
pub fn find_test_methods<B: AsRef<[u8]>>(raw_segments: &[B], custom_annotations: &[String]) -> Result<Vec<TestMethod>, DexError>
{
    let segments = parse_segments(raw_segments)?;
    find_test_methods_in_segments(&segments, custom_annotations)
}

/// Sorted, deduplicated test names, e.g. `com.example.FooTest#testBar`.
pub fn find_test_names<B: AsRef<[u8]>>(raw_segments: &[B], custom_annotations: &[String]) -> Result<Vec<String>, DexError>
{
    Ok(test_names(&find_test_methods(raw_segments, custom_annotations)?))
}

pub fn find_test_methods_in_segments(segments: &[DexFile], custom_annotations: &[String]) -> Result<Vec<TestMethod>, DexError>
{
    let junit3 = find_junit3_tests(segments)?;
    let junit4 = find_junit4_tests(segments, custom_annotations)?;
    info!("found {} JUnit3 and {} JUnit4 test methods in {} dex segments", junit3.len(), junit4.len(), segments.len());

    let mut methods = junit3;
    methods.extend(junit4);
    // stable, so equal names keep JUnit3 before JUnit4
    methods.sort_by(TestMethod::cmp_by_name);
    Ok(methods)
}

/// Project sorted test methods to their names, dropping repeats.
pub fn test_names(methods: &[TestMethod]) -> Vec<String>
{
    let mut names: Vec<String> = methods.iter().map(|m| m.test_name.clone()).collect();
    names.dedup();
    names
}
