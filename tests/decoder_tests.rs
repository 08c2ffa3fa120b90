use chrono::FixedOffset;
use clog_tools::decoder::load_tables;
use clog_tools::timestamp::OffsetSource;
use clog_tools::{ClogError, DecodedLine, Decoder, ModuleTable, SymbolTable, TableSource};
use std::fs;
use tempfile::tempdir;

static STRINGS: &str = "=== files\nF,1b79d7299,src/main.cpp\n\n=== Log line symbols\nL,1b79d7299,42,I,\"Startup\",src/main.cpp\n";
static MODULES: &str = "NET=5,network module\n";

fn utc() -> OffsetSource {
    OffsetSource::Fixed(FixedOffset::east_opt(0).unwrap())
}

fn decode_all(symbols: &SymbolTable, modules: &ModuleTable, input: &[u8]) -> Vec<u8> {
    let decoder = Decoder::new(symbols, modules).with_offset(utc());
    let mut out = Vec::new();
    decoder.run(input, &mut out).unwrap();
    out
}

#[test]
fn test_end_to_end_line() {
    let symbols = SymbolTable::parse(STRINGS).unwrap();
    let modules = ModuleTable::parse(MODULES);
    let out = decode_all(
        &symbols,
        &modules,
        b"15045599201964060 I 05 1b79d7299:42 100 200 started ok\n",
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "2017-09-04 21:18:40.196406+0000 I NET 100 200 Startup started ok [main.cpp:42]\n"
    );
}

#[test]
fn test_offset_applied() {
    let symbols = SymbolTable::new();
    let modules = ModuleTable::new();
    let decoder = Decoder::new(&symbols, &modules)
        .with_offset(OffsetSource::Fixed(FixedOffset::west_opt(5 * 3600).unwrap()));
    let decoded = decoder.decode_line("15045599201964060 I 05 1b79d7299:42 100 200 x");
    assert_eq!(
        decoded,
        DecodedLine::Rehydrated(
            "2017-09-04 16:18:40.196406-0500 I 05 100 200 1b79d7299:42 x ".to_string()
        )
    );
}

#[test]
fn test_pass_through_is_byte_exact() {
    let symbols = SymbolTable::parse(STRINGS).unwrap();
    let modules = ModuleTable::parse(MODULES);
    let input: &[u8] =
        b"2017-09-04 old style line\r\n\xff\xfe binary junk\n\n 15 leading space\nno newline at end";
    let out = decode_all(&symbols, &modules, input);
    assert_eq!(out, input);
}

#[test]
fn test_empty_tables_fall_back_to_raw_ids() {
    let symbols = SymbolTable::new();
    let modules = ModuleTable::new();
    let decoder = Decoder::new(&symbols, &modules).with_offset(utc());

    let lines = [
        "15045599201964060 I 05 1b79d7299:42 100 200 started ok",
        "15045599209999990 E 02 abc:7 1 2 failed: disk full",
        "1504559920000000 W 00 0:0 3 4",
    ];
    for line in lines {
        let DecodedLine::Rehydrated(text) = decoder.decode_line(line) else {
            panic!("line should decode: {line}");
        };
        let site_key = line.split(' ').nth(3).unwrap();
        let module_id = line.split(' ').nth(2).unwrap();
        assert!(text.contains(&format!(" {module_id} ")));
        assert!(text.contains(&format!(" {site_key} ")));
        assert!(text.ends_with(' '), "extra should be empty: {text:?}");
        assert!(!text.contains('['));
    }
}

#[test]
fn test_message_spaces_preserved() {
    let symbols = SymbolTable::parse(STRINGS).unwrap();
    let modules = ModuleTable::parse(MODULES);
    let decoder = Decoder::new(&symbols, &modules).with_offset(utc());
    let decoded = decoder.decode_line("15045599201964060 I 05 1b79d7299:42 100 200 a  b   c");
    let DecodedLine::Rehydrated(text) = decoded else {
        panic!("expected rehydrated line");
    };
    assert!(text.ends_with(" Startup a  b   c [main.cpp:42]"));
}

#[test]
fn test_malformed_compact_lines_pass_through() {
    let symbols = SymbolTable::parse(STRINGS).unwrap();
    let modules = ModuleTable::parse(MODULES);
    let decoder = Decoder::new(&symbols, &modules).with_offset(utc());

    let input = "15045599201964060 I 05\n15xx I 05 a:1 1 2 m\n15045599201964060 I 05 1b79d7299:42 1 2 ok\n";
    let mut out = Vec::new();
    let stats = decoder.run(input.as_bytes(), &mut out).unwrap();

    assert_eq!(stats.lines, 3);
    assert_eq!(stats.malformed, 2);
    assert_eq!(stats.rehydrated, 1);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "15045599201964060 I 05");
    assert_eq!(lines[1], "15xx I 05 a:1 1 2 m");
    assert!(lines[2].ends_with("Startup ok [main.cpp:42]"));
}

#[test]
fn test_crlf_compact_line() {
    let symbols = SymbolTable::parse(STRINGS).unwrap();
    let modules = ModuleTable::parse(MODULES);
    let out = decode_all(
        &symbols,
        &modules,
        b"15045599201964060 I 05 1b79d7299:42 100 200 hi\r\n",
    );
    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with(" Startup hi [main.cpp:42]\n"));
}

#[test]
fn test_basename_without_directory() {
    let symbols = SymbolTable::parse("L,9,3,I,\"top\",top.cpp\n").unwrap();
    let modules = ModuleTable::new();
    let decoder = Decoder::new(&symbols, &modules).with_offset(utc());
    let DecodedLine::Rehydrated(text) = decoder.decode_line("15045599201964060 I 1 9:3 1 2 m")
    else {
        panic!("expected rehydrated line");
    };
    assert!(text.ends_with(" 1 1 2 top m [top.cpp:3]"));
}

#[test]
fn test_load_tables_from_files() {
    let dir = tempdir().unwrap();
    let strings = dir.path().join("strings.csv");
    let modules = dir.path().join("modules.h");
    fs::write(&strings, STRINGS).unwrap();
    fs::write(&modules, MODULES).unwrap();

    let (symbols, modules) = load_tables(&TableSource::Files {
        symbols: strings,
        modules,
    })
    .unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(modules.find("5"), Some("NET"));
}

#[test]
fn test_missing_table_file_is_fatal() {
    let dir = tempdir().unwrap();
    let modules = dir.path().join("modules.h");
    fs::write(&modules, MODULES).unwrap();

    let err = load_tables(&TableSource::Files {
        symbols: dir.path().join("absent.csv"),
        modules,
    })
    .unwrap_err();
    assert!(matches!(err, ClogError::Open { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_malformed_table_file_is_fatal() {
    let dir = tempdir().unwrap();
    let strings = dir.path().join("strings.csv");
    let modules = dir.path().join("modules.h");
    fs::write(&strings, "L,1,not-a-line,I,\"x\",a.cpp\n").unwrap();
    fs::write(&modules, MODULES).unwrap();

    let err = load_tables(&TableSource::Files {
        symbols: strings,
        modules,
    })
    .unwrap_err();
    assert_eq!(err.exit_code(), 4);
}
