//! Labelled fixtures on disk whose names encode the expected identity.

mod common;

use common::{docx, identifier, ole_file, segy, zip_archive};
use quince::{FormatId, Warning};
use std::path::Path;

/// `fmt-41-signature-id-1.jpg` -> `fmt/41`, `x-fmt-263-container-...` ->
/// `x-fmt/263`.
fn expected(path: &Path) -> FormatId {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap();
    let parts: Vec<&str> = name.split('-').collect();
    let id = match parts[..] {
        ["x", "fmt", code, ..] => format!("x-fmt/{code}"),
        [namespace, code, ..] => format!("{namespace}/{code}"),
        _ => panic!("unlabelled fixture {name}"),
    };
    FormatId::parse(&id).unwrap()
}

fn fixtures() -> Vec<(&'static str, Vec<u8>)> {
    let mut jfif = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00".to_vec();
    jfif.extend_from_slice(&[0x11; 300]);
    jfif.extend_from_slice(b"\xFF\xD9");

    let mut jpeg = b"\xFF\xD8\xFF\xDB\x00\x43".to_vec();
    jpeg.extend_from_slice(&[0x22; 300]);
    jpeg.extend_from_slice(b"\xFF\xD9");

    let mut pdf = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n".to_vec();
    pdf.extend_from_slice(b"trailer\n<<>>\n%%EOF\n");

    let mut mov = vec![0x00, 0x00, 0x00, 0x6C];
    mov.extend_from_slice(b"moov\x00\x00\x00\x64mvhd");
    mov.extend_from_slice(&[0; 100]);

    vec![
        ("fmt-41-signature-id-1.jpg", jpeg),
        ("fmt-43-signature-id-2.jpg", jfif),
        ("fmt-11-signature-id-3.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01".to_vec()),
        ("fmt-3-signature-id-4.gif", b"GIF87a\x01\x00\x01\x00".to_vec()),
        ("fmt-4-signature-id-5.gif", b"GIF89a\x01\x00\x01\x00".to_vec()),
        ("fmt-18-signature-id-6.pdf", pdf),
        ("fmt-96-signature-id-7.html", b"<!DOCTYPE html>\n<html><head></head></html>\n".to_vec()),
        ("fmt-101-signature-id-8.xml", b"<?xml version=\"1.0\"?>\n<root/>\n".to_vec()),
        ("fmt-363-signature-id-9.sgy", segy(3226)),
        ("fmt-669-signature-id-10.mrw", vec![0x00, b'M', b'R', b'M', 0x00, 0x00]),
        ("x-fmt-384-signature-id-11.mov", mov),
        ("x-fmt-263-container-signature-id-12.zip", zip_archive(&[("readme.txt", b"plain")])),
        ("fmt-412-container-signature-id-13.docx", docx()),
        ("fmt-111-container-signature-id-14.ole", ole_file(&[("Contents", b"plain")])),
        ("fmt-40-container-signature-id-15.doc", ole_file(&[("WordDocument", b"plain")])),
    ]
}

#[test]
fn test_fixture_suite_has_no_false_negatives() {
    let dir = tempfile::tempdir().unwrap();
    for (name, data) in fixtures() {
        std::fs::write(dir.path().join(name), data).unwrap();
    }

    let identifier = identifier();
    let mut paths: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    paths.sort();
    assert_eq!(paths.len(), 15);

    for path in paths {
        let report = identifier.identify_file(&path).unwrap();
        let top: Vec<&FormatId> = report.top_level().map(|r| r.id()).collect();
        assert_eq!(top, [&expected(&path)], "{}", path.display());
        // Latency is reported, not enforced
        if report.warnings.iter().any(|w| matches!(w, Warning::Slow { .. })) {
            eprintln!("{} exceeded the latency threshold", path.display());
        }
    }
}

#[test]
fn test_expected_identity_from_name() {
    assert_eq!(expected(Path::new("fmt-41-signature-id-1.jpg")).to_string(), "fmt/41");
    assert_eq!(
        expected(Path::new("x-fmt-263-container-signature-id-2.zip")).to_string(),
        "x-fmt/263"
    );
}
