use crate::parser::decoded_value::DecodedValue;
use serde::Serialize;

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// An annotation as it applies to a test method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestAnnotation {
    /// Dotted annotation class name, e.g. `org.junit.Test`
    pub name: String,
    pub values: BTreeMap<String, DecodedValue>,
    /// Whether the annotation type is itself annotated `@java.lang.annotation.Inherited`
    pub inherited: bool,
}

/// A test method, named `dotted.Class#method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestMethod {
    pub test_name: String,
    pub annotations: Vec<TestAnnotation>,
}

impl TestMethod
{
    pub fn new(test_name: String, annotations: Vec<TestAnnotation>) -> TestMethod
    {
        TestMethod { test_name, annotations }
    }

    /// Test methods are ordered by name alone; annotations do not take part.
    pub fn cmp_by_name(&self, other: &TestMethod) -> Ordering
    {
        self.test_name.cmp(&other.test_name)
    }

    pub fn annotation(&self, name: &str) -> Option<&TestAnnotation>
    {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool
    {
        self.annotation(name).is_some()
    }

    pub fn annotation_names(&self) -> Vec<&str>
    {
        self.annotations.iter().map(|a| a.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(test_name: &str, annotation: &str) -> TestMethod
    {
        TestMethod::new(
            test_name.to_string(),
            vec![TestAnnotation { name: annotation.to_string(), values: BTreeMap::new(), inherited: false }],
        )
    }

    #[test]
    fn ordering_ignores_annotations()
    {
        let a = marked("com.a.B#x", "org.junit.Test");
        let b = marked("com.a.B#x", "com.a.Flaky");
        assert_eq!(a.cmp_by_name(&b), Ordering::Equal);
        assert_ne!(a, b);

        let mut methods = vec![marked("com.a.C#y", "z"), b.clone(), marked("com.a.B#w", "z"), a.clone()];
        methods.sort_by(TestMethod::cmp_by_name);
        let names: Vec<&str> = methods.iter().map(|m| m.test_name.as_str()).collect();
        assert_eq!(names, vec!["com.a.B#w", "com.a.B#x", "com.a.B#x", "com.a.C#y"]);
        // stable: equal names keep their input order
        assert_eq!(methods[1], b);
        assert_eq!(methods[2], a);
    }
}
