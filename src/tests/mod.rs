mod annotation_values;
mod apk_scenarios;

use crate::parser::TestMethod;

fn names(methods: &[TestMethod]) -> Vec<&str> {
    methods.iter().map(|m| m.test_name.as_str()).collect()
}

fn method<'a>(methods: &'a [TestMethod], name: &str) -> &'a TestMethod {
    methods
        .iter()
        .find(|m| m.test_name == name)
        .unwrap_or_else(|| panic!("{} not found in {:?}", name, names(methods)))
}
