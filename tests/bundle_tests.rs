use clog_tools::bundle::{load_bundle_from, BUNDLE_MAGIC};
use clog_tools::decoder::load_tables;
use clog_tools::{BundleError, ClogError, TableBundle, TableSource};
use std::fs;
use tempfile::tempdir;

static STRINGS: &str = "=== Log line symbols\nL,0x1000,38,D,\"exit\",main.cpp\n";
static MODULES: &str = "enum MyModules {\n  ModMain = 1,\n};\n";

#[test]
fn test_embedded_tables_load_from_bundled_binary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clog_decode_bundled");

    let mut host = vec![0x7f, b'E', b'L', b'F'];
    host.extend(std::iter::repeat(0u8).take(4096));
    TableBundle::new(STRINGS, MODULES).append_to(&mut host);
    fs::write(&path, &host).unwrap();

    let (symbols, modules) = load_tables(&TableSource::Embedded {
        bundle_override: Some(path),
    })
    .unwrap();
    assert_eq!(symbols.find("1000:38", 'D').unwrap().symbolic_name, "exit");
    assert_eq!(modules.find("01"), Some("ModMain"));
}

#[test]
fn test_binary_without_bundle_gives_empty_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain");
    fs::write(&path, b"\x7fELF no tables here").unwrap();

    let (symbols, modules) = load_bundle_from(&path).unwrap();
    assert!(symbols.is_empty());
    assert!(modules.is_empty());
}

#[test]
fn test_damaged_bundle_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("damaged");
    let mut bytes = b"host".to_vec();
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.extend_from_slice(BUNDLE_MAGIC);
    fs::write(&path, &bytes).unwrap();

    let err = load_bundle_from(&path).unwrap_err();
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn test_bundle_with_bad_symbol_table_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad_table");
    let mut host = b"host".to_vec();
    TableBundle::new("L,1,2\n", MODULES).append_to(&mut host);
    fs::write(&path, &host).unwrap();

    let err = load_bundle_from(&path).unwrap_err();
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_missing_bundle_file() {
    let dir = tempdir().unwrap();
    let err = load_bundle_from(&dir.path().join("nope")).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_last_appended_bundle_wins() {
    let mut host = b"host".to_vec();
    TableBundle::new(STRINGS, "Old=1,\n").append_to(&mut host);
    TableBundle::new(STRINGS, "New=1,\n").append_to(&mut host);

    let bundle = TableBundle::from_trailer(&host).unwrap().unwrap();
    assert_eq!(bundle.modules, "New=1,\n");
}

#[test]
fn test_bundle_after_large_host() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large_host");
    let mut host = vec![0xAAu8; 8 * 1024 * 1024];
    TableBundle::new(STRINGS, MODULES).append_to(&mut host);
    fs::write(&path, &host).unwrap();

    let (symbols, modules) = load_bundle_from(&path).unwrap();
    assert_eq!(symbols.find("1000:38", 'D').unwrap().symbolic_name, "exit");
    assert_eq!(modules.find("1"), Some("ModMain"));
}

#[test]
fn test_declared_length_past_start_of_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short");
    let mut bytes = vec![0u8; 32];
    bytes.extend_from_slice(&33u64.to_le_bytes());
    bytes.extend_from_slice(BUNDLE_MAGIC);
    fs::write(&path, &bytes).unwrap();

    let err = load_bundle_from(&path).unwrap_err();
    assert!(matches!(
        err,
        ClogError::Bundle {
            source: BundleError::Truncated {
                declared: 33,
                available: 32
            },
            ..
        }
    ));
    assert_eq!(err.exit_code(), 5);
}
