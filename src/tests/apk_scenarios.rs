use super::dex_fixture::*;
use crate::apk::{find_test_methods_in_apk, find_test_names_in_apk, read_dex_segments, ApkError};
use crate::dex::error::DexErrorKind;

use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use zip::write::{FileOptions, ZipWriter};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_apk_path() -> PathBuf {
    let mut p = std::env::temp_dir();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    p.push(format!("dex-test-parser-{}-{}.apk", std::process::id(), n));
    p
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn write_apk(entries: &[(&str, &[u8])]) -> PathBuf {
    let path = temp_apk_path();
    fs::write(&path, zip_bytes(entries)).unwrap();
    path
}

#[test]
fn finds_tests_across_primary_and_secondary_dex() {
    let primary = DexBuilder::new()
        .class(ClassSpec::new("Lcom/example/Concrete;").extends("Lcom/example/Abstract;").test("concreteTest"))
        .build();
    let secondary = DexBuilder::new()
        .class(ClassSpec::new("Lcom/example/Abstract;").abstract_class().test("abstractTest"))
        .class(ClassSpec::new("Lcom/example/LegacyTest;").extends(TEST_CASE).method("testOld"))
        .build();
    let jar = zip_bytes(&[("classes.dex", &secondary)]);

    let path = write_apk(&[
        ("AndroidManifest.xml", b"<manifest/>"),
        ("classes.dex", &primary),
        ("assets/secondary-program-dex-jars/secondary-1.dex.jar", &jar),
    ]);

    let segments = read_dex_segments(&path).unwrap();
    assert_eq!(segments, vec![primary.clone(), secondary.clone()]);

    let names = find_test_names_in_apk(&path, &[]).unwrap();
    assert_eq!(
        names,
        vec!["com.example.Concrete#abstractTest", "com.example.Concrete#concreteTest", "com.example.LegacyTest#testOld"]
    );

    let methods = find_test_methods_in_apk(&path, &[]).unwrap();
    assert_eq!(methods.len(), 3);
    assert!(methods[2].annotations.is_empty());

    let _ = fs::remove_file(&path);
}

#[test]
fn malformed_dex_inside_apk_is_a_dex_error() {
    let path = write_apk(&[("classes.dex", b"not a dex file at all, just text padding it out past one hundred and twelve bytes so only the magic is wrong......")]);

    let e = find_test_names_in_apk(&path, &[]).unwrap_err();
    match e {
        ApkError::Dex(dex_error) => assert_eq!(dex_error.kind(), DexErrorKind::MalformedContainer),
        other => panic!("expected a dex error, got {other}"),
    }

    let _ = fs::remove_file(&path);
}
