//! JUnit4 discovery: methods annotated `@org.junit.Test` (or a custom marker), including
//! test methods inherited from superclasses in any segment.

use crate::dex::dex_file::ClassDefItem;
use crate::dex::error::DexError;
use crate::dex::DexFile;
use crate::fail;
use crate::parser::annotations::{get_class_annotations, get_method_annotations};
use crate::parser::format::{format_class_name, format_descriptor, method_part};
use crate::parser::test_method::{TestAnnotation, TestMethod};
use log::{debug, trace, warn};

use std::collections::{HashMap, HashSet};

pub const JUNIT_TEST_ANNOTATION_NAME: &str = "org.junit.Test";

/// What pass 1 learned about one class.
#[derive(Debug)]
struct ClassParsingResult {
    segment: usize,
    class_def: ClassDefItem,
    /// Dotted name with the trailing `#`
    class_prefix: String,
    superclass_name: Option<String>,
    class_annotations: Vec<TestAnnotation>,
    test_methods: Vec<TestMethod>,
    is_concrete: bool,
}

#[derive(Debug)]
enum Resolution {
    InProgress,
    Done(Vec<TestMethod>),
}

struct Resolver<'a> {
    classes: &'a [ClassParsingResult],
    by_name: &'a HashMap<String, usize>,
    resolved: Vec<Option<Resolution>>,
}

/// Find JUnit4 tests across all segments.
///
/// `custom_annotations` are dotted annotation names treated as test markers alongside
/// `org.junit.Test`; empty names are ignored.
pub fn find_junit4_tests(segments: &[DexFile], custom_annotations: &[String]) -> Result<Vec<TestMethod>, DexError>
{
    let mut markers: HashSet<&str> = custom_annotations.iter().map(String::as_str).filter(|a| !a.is_empty()).collect();
    markers.insert(JUNIT_TEST_ANNOTATION_NAME);

    // pass 1: every non-interface class, including ones without tests, since an
    // intermediate class may only pass tests through to its subclasses
    let mut classes: Vec<ClassParsingResult> = vec![];
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (segment_ix, dex) in segments.iter().enumerate() {
        for class_def in dex.class_defs.iter().filter(|c| !c.is_interface()) {
            let (name, result) = parse_class(dex, segment_ix, class_def, &markers)
                .map_err(|e| DexError::with_context(e, format!("dex segment #{}", segment_ix + 1)))?;
            match by_name.get(&name).copied() {
                Some(existing) => {
                    warn!(
                        "class {} defined in dex segments #{} and #{}, keeping the latter",
                        name, classes[existing].segment + 1, segment_ix + 1
                    );
                    classes[existing] = result;
                }
                None => {
                    by_name.insert(name, classes.len());
                    classes.push(result);
                }
            }
        }
    }
    debug!("JUnit4: {} classes parsed", classes.len());

    // pass 2: pull test methods down from superclasses
    let mut resolver = Resolver { classes: &classes, by_name: &by_name, resolved: (0..classes.len()).map(|_| None).collect() };
    let mut tests = vec![];
    for ix in 0..classes.len() {
        let methods = resolver.resolve(ix)?;
        if classes[ix].is_concrete {
            tests.extend(methods);
        }
    }
    Ok(tests)
}

fn parse_class(
    dex: &DexFile,
    segment: usize,
    class_def: &ClassDefItem,
    markers: &HashSet<&str>,
) -> Result<(String, ClassParsingResult), DexError>
{
    let descriptor = dex.class_descriptor(class_def)?;
    let context = |e: DexError| DexError::with_context(e, format!("class {}", descriptor));

    let name = format_descriptor(&descriptor).map_err(context)?;
    let class_prefix = format_class_name(dex, class_def).map_err(context)?;
    let superclass_name = match dex.superclass_descriptor(class_def).map_err(context)? {
        Some(d) => Some(format_descriptor(&d).map_err(context)?),
        None => None,
    };

    let directory = dex.annotations_directory(class_def).map_err(context)?;
    let class_annotations = get_class_annotations(dex, directory.as_ref()).map_err(context)?;

    let mut test_methods = vec![];
    if let Some(directory) = directory.as_ref() {
        for method_idx in dex.virtual_method_indices(class_def).map_err(context)? {
            // only methods with an annotation set can be tests
            if !directory.has_method_annotations(method_idx) {
                continue;
            }
            let method_annotations = get_method_annotations(dex, method_idx, Some(directory)).map_err(context)?;
            let mut annotations = class_annotations.clone();
            annotations.extend(method_annotations);
            if !annotations.iter().any(|a| markers.contains(a.name.as_str())) {
                continue;
            }
            let method_name = dex.method_name(method_idx).map_err(context)?;
            let method = TestMethod::new(format!("{}{}", class_prefix, method_name), annotations);
            if !test_methods.contains(&method) {
                test_methods.push(method);
            }
        }
    }
    if !test_methods.is_empty() {
        trace!("JUnit4 class {}: {} annotated test methods", name, test_methods.len());
    }

    Ok((name, ClassParsingResult {
        segment,
        class_def: *class_def,
        class_prefix,
        superclass_name,
        class_annotations,
        test_methods,
        is_concrete: class_def.is_concrete(),
    }))
}

impl<'a> Resolver<'a>
{
    /// Complete test set of class `ix`: its own methods plus everything inherited, re-homed
    /// onto it. Each class is resolved once.
    ///
    /// Walks up to the nearest resolved ancestor (or the root) first, then resolves back
    /// down, so hierarchy depth does not grow the call stack.
    fn resolve(&mut self, ix: usize) -> Result<Vec<TestMethod>, DexError>
    {
        let classes = self.classes;
        let mut chain = vec![];
        let mut inherited = vec![];
        let mut next = Some(ix);
        while let Some(current) = next {
            match &self.resolved[current] {
                Some(Resolution::Done(methods)) => {
                    inherited = methods.clone();
                    break;
                }
                Some(Resolution::InProgress) => {
                    let c = &classes[current];
                    fail!(CyclicHierarchy, "class {} is its own ancestor (class_idx {})", method_class(&c.class_prefix), c.class_def.class_idx);
                }
                None => {}
            }
            self.resolved[current] = Some(Resolution::InProgress);
            chain.push(current);
            next = classes[current].superclass_name.as_ref().and_then(|s| self.by_name.get(s)).copied();
        }

        for &current in chain.iter().rev() {
            let class = &classes[current];
            let mut methods = class.test_methods.clone();
            for method in &inherited {
                let method = rehome(method, class);
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
            self.resolved[current] = Some(Resolution::Done(methods.clone()));
            inherited = methods;
        }
        Ok(inherited)
    }
}

fn method_class(prefix: &str) -> &str
{
    prefix.trim_end_matches('#')
}

/// Move a superclass test method onto `child`.
///
/// Only `@Inherited` annotations survive the move, and an annotation the child class
/// declares itself replaces the parent's.
fn rehome(method: &TestMethod, child: &ClassParsingResult) -> TestMethod
{
    let mut annotations: Vec<TestAnnotation> = method
        .annotations
        .iter()
        .filter(|a| !child.class_annotations.iter().any(|c| c.name == a.name))
        .filter(|a| a.inherited)
        .cloned()
        .collect();
    annotations.extend(child.class_annotations.iter().cloned());

    TestMethod::new(format!("{}{}", child.class_prefix, method_part(&method.test_name)), annotations)
}
