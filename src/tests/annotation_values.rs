use super::dex_fixture::*;
use super::method;
use crate::dex::DexFile;
use crate::parser::annotations::{get_class_annotations, get_method_annotations};
use crate::parser::{find_test_methods, DecodedValue};

use std::collections::BTreeMap;

const VALUES: &str = "Lcom/example/Values;";
const INNER: &str = "Lcom/example/Inner;";
const SIZE_ENUM: &str = "Lcom/example/Size;";
const HOLDER: &str = "Lcom/example/Holder;";

fn values_annotation() -> FixtureAnnotation {
    annotation(VALUES)
        .with("b", FixtureValue::Byte(-5))
        .with("s", FixtureValue::Short(300))
        .with("c", FixtureValue::Char('x' as u16))
        .with("i", FixtureValue::Int(-1))
        .with("big", FixtureValue::Int(i32::MIN))
        .with("l", FixtureValue::Long(1 << 40))
        .with("f", FixtureValue::Float(0.25))
        .with("d", FixtureValue::Double(-2.5))
        .with("str", FixtureValue::String("hello, world".into()))
        .with("t", FixtureValue::Type("Ljava/lang/IllegalStateException;".into()))
        .with("e", FixtureValue::Enum { enum_type: SIZE_ENUM.into(), name: "LARGE".into() })
        .with("arr", FixtureValue::Array(vec![FixtureValue::Int(1), FixtureValue::Int(200)]))
        .with("nested", FixtureValue::Annotation(annotation(INNER).with("name", FixtureValue::String("n".into()))))
        .with("nil", FixtureValue::Null)
        .with("flag", FixtureValue::Boolean(true))
        .with("off", FixtureValue::Boolean(false))
}

#[test]
fn every_value_kind_is_decoded() {
    let dex = DexBuilder::new()
        .class(ClassSpec::new(HOLDER).virtual_method(MethodSpec::new("t").annotated(test_annotation()).annotated(values_annotation())))
        .build();

    let methods = find_test_methods(&[dex], &[]).unwrap();
    let values = &method(&methods, "com.example.Holder#t").annotation("com.example.Values").unwrap().values;

    let expected: BTreeMap<String, DecodedValue> = [
        ("b", DecodedValue::Byte(-5)),
        ("s", DecodedValue::Short(300)),
        ("c", DecodedValue::Char('x' as u16)),
        ("i", DecodedValue::Int(-1)),
        ("big", DecodedValue::Int(i32::MIN)),
        ("l", DecodedValue::Long(1 << 40)),
        ("f", DecodedValue::Float(0.25)),
        ("d", DecodedValue::Double(-2.5)),
        ("str", DecodedValue::String("hello, world".into())),
        ("t", DecodedValue::Type("Ljava/lang/IllegalStateException;".into())),
        ("e", DecodedValue::Enum("LARGE".into())),
        ("arr", DecodedValue::Array(vec![DecodedValue::Int(1), DecodedValue::Int(200)])),
        (
            "nested",
            DecodedValue::Annotation {
                name: "com.example.Inner".into(),
                values: [("name".to_string(), DecodedValue::String("n".into()))].into_iter().collect(),
            },
        ),
        ("nil", DecodedValue::Null),
        ("flag", DecodedValue::Boolean(true)),
        ("off", DecodedValue::Boolean(false)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    assert_eq!(values, &expected);
}

#[test]
fn non_ascii_strings_survive() {
    let dex = DexBuilder::new()
        .class(
            ClassSpec::new(HOLDER).virtual_method(
                MethodSpec::new("t")
                    .annotated(test_annotation())
                    .annotated(annotation(VALUES).with("str", FixtureValue::String("caf\u{e9} \u{1F600}".into()))),
            ),
        )
        .build();

    let methods = find_test_methods(&[dex], &[]).unwrap();
    let values = &method(&methods, "com.example.Holder#t").annotation("com.example.Values").unwrap().values;
    assert_eq!(values.get("str"), Some(&DecodedValue::String("caf\u{e9} \u{1F600}".into())));
}

#[test]
fn inherited_flag_needs_the_marker_on_a_local_type() {
    let dex = DexBuilder::new()
        .class(ClassSpec::annotation_type("Lcom/example/Marked;", true))
        .class(ClassSpec::annotation_type("Lcom/example/Plain;", false))
        .class(
            ClassSpec::new(HOLDER)
                .annotated(annotation("Lcom/example/Marked;"))
                .annotated(annotation("Lcom/example/Plain;"))
                .annotated(annotation("Lcom/example/Elsewhere;")),
        )
        .build();

    let dex = DexFile::from_bytes(&dex).unwrap();
    let holder = dex.class_defs.iter().find(|c| dex.class_descriptor(c).unwrap() == HOLDER).unwrap();
    let directory = dex.annotations_directory(holder).unwrap();
    let annotations = get_class_annotations(&dex, directory.as_ref()).unwrap();

    let flags: Vec<(&str, bool)> = annotations.iter().map(|a| (a.name.as_str(), a.inherited)).collect();
    assert_eq!(
        flags,
        vec![("com.example.Marked", true), ("com.example.Plain", false), ("com.example.Elsewhere", false)]
    );
}

#[test]
fn segment_without_inherited_type_reports_nothing_inherited() {
    let dex = DexBuilder::new()
        .class(ClassSpec::annotation_type("Lcom/example/Plain;", false))
        .class(ClassSpec::new(HOLDER).annotated(annotation("Lcom/example/Plain;")))
        .build();

    let dex = DexFile::from_bytes(&dex).unwrap();
    assert_eq!(dex.inherited_annotation_type().unwrap(), None);
    let holder = dex.class_defs.iter().find(|c| dex.class_descriptor(c).unwrap() == HOLDER).unwrap();
    let directory = dex.annotations_directory(holder).unwrap();
    let annotations = get_class_annotations(&dex, directory.as_ref()).unwrap();
    assert_eq!(annotations.len(), 1);
    assert!(!annotations[0].inherited);
}

#[test]
fn method_annotations_are_looked_up_by_method_index() {
    let dex = DexBuilder::new()
        .class(
            ClassSpec::new(HOLDER)
                .virtual_method(MethodSpec::new("first").annotated(annotation("Lcom/example/One;")))
                .virtual_method(MethodSpec::new("second").annotated(annotation("Lcom/example/Two;")).annotated(annotation("Lcom/example/Three;")))
                .method("third"),
        )
        .build();

    let dex = DexFile::from_bytes(&dex).unwrap();
    let holder = &dex.class_defs[0];
    let directory = dex.annotations_directory(holder).unwrap();
    assert!(get_class_annotations(&dex, directory.as_ref()).unwrap().is_empty());

    let mut seen = vec![];
    for method_idx in dex.virtual_method_indices(holder).unwrap() {
        let names: Vec<String> = get_method_annotations(&dex, method_idx, directory.as_ref())
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        seen.push((dex.method_name(method_idx).unwrap(), names));
    }
    assert_eq!(
        seen,
        vec![
            ("first".to_string(), vec!["com.example.One".to_string()]),
            ("second".to_string(), vec!["com.example.Two".to_string(), "com.example.Three".to_string()]),
            ("third".to_string(), vec![]),
        ]
    );

    assert!(get_method_annotations(&dex, 0, None).unwrap().is_empty());
}
