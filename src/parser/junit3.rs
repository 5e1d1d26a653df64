//! JUnit3 discovery: subclasses of `junit.framework.TestCase`, by method name.

use crate::dex::dex_file::ClassDefItem;
use crate::dex::error::DexError;
use crate::dex::DexFile;
use crate::parser::format::format_class_name;
use crate::parser::test_method::TestMethod;
use log::{debug, trace};

use std::collections::HashSet;

/// `TestCase` and its subclasses shipped in the Android SDK. They are referenced from a
/// test package but never defined in it, so they seed the search.
pub const JUNIT3_BASE_DESCRIPTORS: [&str; 15] = [
    "Ljunit/framework/TestCase;",
    "Landroid/test/ActivityInstrumentationTestCase;",
    "Landroid/test/ActivityInstrumentationTestCase2;",
    "Landroid/test/ActivityTestCase;",
    "Landroid/test/ActivityUnitTestCase;",
    "Landroid/test/AndroidTestCase;",
    "Landroid/test/ApplicationTestCase;",
    "Landroid/test/FailedToCreateTests;",
    "Landroid/test/InstrumentationTestCase;",
    "Landroid/test/LoaderTestCase;",
    "Landroid/test/ProviderTestCase;",
    "Landroid/test/ProviderTestCase2;",
    "Landroid/test/ServiceTestCase;",
    "Landroid/test/SingleLaunchActivityTestCase;",
    "Landroid/test/SyncBaseInstrumentation;",
];

pub const JUNIT3_TEST_PREFIX: &str = "test";

/// Placeholder name filtered out for compatibility. Exact match only.
pub const JUNIT3_EXCLUDED_NAME: &str = "testFoo";

pub fn is_junit3_test_name(name: &str) -> bool
{
    name.starts_with(JUNIT3_TEST_PREFIX) && name != JUNIT3_EXCLUDED_NAME
}

/// Find JUnit3 tests across all segments.
///
/// A class matches when its direct superclass is a known base. Every match becomes a known
/// base itself, and since a subclass may sit in an earlier segment than its parent, the
/// segments are rescanned until a pass adds no new base.
pub fn find_junit3_tests(segments: &[DexFile]) -> Result<Vec<TestMethod>, DexError>
{
    let mut bases: HashSet<String> = JUNIT3_BASE_DESCRIPTORS.iter().map(|d| d.to_string()).collect();
    let mut matched: HashSet<(usize, usize)> = HashSet::new();
    let mut seen: HashSet<TestMethod> = HashSet::new();
    let mut tests = vec![];

    let mut pass = 0;
    loop {
        pass += 1;
        let mut new_bases = 0;

        for (segment_ix, dex) in segments.iter().enumerate() {
            for (class_ix, class_def) in dex.class_defs.iter().enumerate() {
                if matched.contains(&(segment_ix, class_ix)) {
                    continue;
                }
                let Some(superclass) = dex.superclass_descriptor(class_def)? else {
                    continue;
                };
                if !bases.contains(&superclass) {
                    continue;
                }

                matched.insert((segment_ix, class_ix));
                let descriptor = dex.class_descriptor(class_def)?;
                trace!("JUnit3 class {} extends {}", descriptor, superclass);
                if bases.insert(descriptor.clone()) {
                    new_bases += 1;
                }

                let methods = class_test_methods(dex, class_def)
                    .map_err(|e| DexError::with_context(e, format!("class {}", descriptor)))
                    .map_err(|e| DexError::with_context(e, format!("dex segment #{}", segment_ix + 1)))?;
                for method in methods {
                    if seen.insert(method.clone()) {
                        tests.push(method);
                    }
                }
            }
        }

        debug!("JUnit3 pass {}: {} new base classes, {} tests so far", pass, new_bases, tests.len());
        if new_bases == 0 {
            break;
        }
    }

    Ok(tests)
}

fn class_test_methods(dex: &DexFile, class_def: &ClassDefItem) -> Result<Vec<TestMethod>, DexError>
{
    let class_name = format_class_name(dex, class_def)?;
    let mut methods = vec![];
    for method_idx in dex.virtual_method_indices(class_def)? {
        let name = dex.method_name(method_idx)?;
        if is_junit3_test_name(&name) {
            methods.push(TestMethod::new(format!("{}{}", class_name, name), vec![]));
        }
    }
    Ok(methods)
}
