use crate::dex::dex_file::ClassDefItem;
use crate::dex::error::DexError;
use crate::dex::DexFile;
use crate::fail;

/// Separator between class and method in a test identifier, as `am instrument` expects it.
pub const TEST_NAME_SEPARATOR: char = '#';

/// Format a class descriptor as a dotted class name.
///
/// `"Lorg/junit/Test;"` becomes `"org.junit.Test"`. Anything that is not a reference
/// type descriptor is rejected.
pub fn format_descriptor(descriptor: &str) -> Result<String, DexError>
{
    match descriptor.strip_prefix('L').and_then(|d| d.strip_suffix(';')) {
        Some(path) => Ok(path.replace('/', ".")),
        None => fail!(MalformedContainer, "Not a class descriptor: {:?}", descriptor),
    }
}

/// Dotted class name with the trailing `#`, ready to have a method name appended.
pub fn format_class_name(dex: &DexFile, class_def: &ClassDefItem) -> Result<String, DexError>
{
    let mut name = format_descriptor(&dex.class_descriptor(class_def)?)?;
    name.push(TEST_NAME_SEPARATOR);
    Ok(name)
}

/// The part of a test name after the class separator.
pub(crate) fn method_part(test_name: &str) -> &str
{
    match test_name.find(TEST_NAME_SEPARATOR) {
        Some(i) => &test_name[i + 1..],
        None => test_name,
    }
}
