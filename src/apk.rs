//! Pull the dex segments out of an APK.

use crate::dex::error::DexError;
use crate::parser::{self, TestMethod};
use log::debug;

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;
use zip::read::ZipArchive;

/// Marker for secondary dex jars nested inside the package.
pub const SECONDARY_DEX_JARS: &str = "secondary-program-dex-jars";

/// Result alias for APK operations.
pub type ApkResult<T> = Result<T, ApkError>;

/// Errors surfaced while reading a package.
#[derive(Debug)]
pub enum ApkError {
    Io(io::Error),
    Zip(zip::result::ZipError),
    Dex(DexError),
    InvalidInput(String),
}

impl std::fmt::Display for ApkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkError::Io(err) => write!(f, "I/O error: {err}"),
            ApkError::Zip(err) => write!(f, "ZIP error: {err}"),
            ApkError::Dex(err) => write!(f, "{err}"),
            ApkError::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApkError::Io(err) => Some(err),
            ApkError::Zip(err) => Some(err),
            ApkError::Dex(err) => Some(err),
            ApkError::InvalidInput(_) => None,
        }
    }
}

impl From<io::Error> for ApkError {
    fn from(value: io::Error) -> Self {
        ApkError::Io(value)
    }
}

impl From<zip::result::ZipError> for ApkError {
    fn from(value: zip::result::ZipError) -> Self {
        ApkError::Zip(value)
    }
}

impl From<DexError> for ApkError {
    fn from(value: DexError) -> Self {
        ApkError::Dex(value)
    }
}

fn is_secondary_dex_jar(name: &str) -> bool {
    name.contains(SECONDARY_DEX_JARS) && name.ends_with(".jar")
}

/// Raw dex segments of the package at `path`, in archive order.
///
/// Every `*.dex` entry is a segment. A `*.jar` under `secondary-program-dex-jars`
/// contributes the first `*.dex` entry inside it.
pub fn read_dex_segments(path: impl AsRef<Path>) -> ApkResult<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let segments = read_dex_segments_from(file)?;
    debug!("{}: {} dex segments", path.display(), segments.len());
    Ok(segments)
}

/// Same as [`read_dex_segments`], over any seekable reader.
pub fn read_dex_segments_from<R: Read + Seek>(reader: R) -> ApkResult<Vec<Vec<u8>>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut segments = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        let name = entry.name().to_string();
        if !name.ends_with(".dex") && !is_secondary_dex_jar(&name) {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        if name.ends_with(".jar") {
            debug!("unwrapping secondary dex jar {}", name);
            data = first_dex_in_jar(data, &name)?;
        }
        segments.push(data);
    }
    Ok(segments)
}

fn first_dex_in_jar(jar: Vec<u8>, jar_name: &str) -> ApkResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(jar))?;
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        if entry.name().ends_with(".dex") {
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            return Ok(data);
        }
    }
    Err(ApkError::InvalidInput(format!("{jar_name} contains no dex file")))
}

/// All test methods in the package at `path`, sorted by test name.
pub fn find_test_methods_in_apk(path: impl AsRef<Path>, custom_annotations: &[String]) -> ApkResult<Vec<TestMethod>> {
    let segments = read_dex_segments(path)?;
    Ok(parser::find_test_methods(&segments, custom_annotations)?)
}

/// Sorted, deduplicated test names in the package at `path`.
pub fn find_test_names_in_apk(path: impl AsRef<Path>, custom_annotations: &[String]) -> ApkResult<Vec<String>> {
    Ok(parser::test_names(&find_test_methods_in_apk(path, custom_annotations)?))
}
