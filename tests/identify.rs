mod common;

use common::{builder, id, identifier, segy, top_ids};
use quince::{Basis, Config, Error, Format, Identifier, ResolutionPolicy, Signature, Warning};
use std::collections::BTreeSet;
use std::io::Cursor;

const MRW: [u8; 5] = [0x00, b'M', b'R', b'M', 0x00];

fn keep_all() -> Identifier {
    identifier().with_config(Config::default().with_policy(ResolutionPolicy::KeepAll))
}

fn id_set(results: &[quince::MatchResult]) -> BTreeSet<String> {
    top_ids(results).into_iter().collect()
}

/// JPEG stream whose comment carries an HTML document.
fn jpeg_html() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43];
    data.extend_from_slice(&[0x10; 64]);
    data.extend_from_slice(b"<html><body>polyglot</body></html>");
    data.extend_from_slice(&[0x20; 32]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

/// JPEG stream whose first bytes after the marker read as a QuickTime movie
/// header.
fn jpeg_quicktime() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xDB];
    data.extend_from_slice(b"moov");
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x6C]);
    data.extend_from_slice(b"mvhd");
    data.extend_from_slice(&[0x00; 96]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

#[test]
fn test_priority_suppresses_generic_match() {
    // Independently constructed identifiers and readers agree
    for _ in 0..3 {
        let identifier = identifier();
        let results = identifier.identify(&mut Cursor::new(MRW.to_vec()), "test.mrw", None).unwrap();
        assert_eq!(top_ids(&results), ["fmt/669"]);
        assert_eq!(results[0].bases()[0], Basis::Signature { index: 0 });
        assert_eq!(results[0].bases()[1], Basis::Extension("mrw".into()));
    }
}

#[test]
fn test_keep_all_reports_both_mrw_definitions() {
    let results = keep_all().identify_bytes(&MRW, "test.mrw", None);
    assert_eq!(top_ids(&results), ["fmt/669", "fmt/668"]);
}

#[test]
fn test_segy_is_stable() {
    let identifier = identifier();
    for len in [3226, 3626] {
        let data = segy(len);
        for _ in 0..10_000 {
            let results = identifier.identify_bytes(&data, "", None);
            assert_eq!(top_ids(&results), ["fmt/363"]);
        }
        let extents = identifier.identify_bytes(&data, "", None)[0].extents().to_vec();
        assert_eq!(extents[0].offset, 0);
        assert_eq!(extents[1].end(), len as u64);
    }
}

#[test]
fn test_segy_without_trailer_is_unidentified() {
    let mut data = segy(3226);
    let last = data.len() - 1;
    data[last - 1] = 0x02;
    assert!(identifier().identify_bytes(&data, "", None).is_empty());
}

#[test]
fn test_jpeg_html_polyglot() {
    let data = jpeg_html();
    let results = keep_all().identify_bytes(&data, "", None);
    assert_eq!(id_set(&results), BTreeSet::from(["fmt/41".to_string(), "fmt/96".to_string()]));
    // Equal specificity: identity order decides
    assert_eq!(top_ids(&results), ["fmt/41", "fmt/96"]);
}

#[test]
fn test_jpeg_quicktime_polyglot() {
    let data = jpeg_quicktime();
    let results = keep_all().identify_bytes(&data, "", None);
    assert_eq!(id_set(&results), BTreeSet::from(["fmt/41".to_string(), "x-fmt/384".to_string()]));
}

/// JPEG that is also an HTML page, as reported against DROID.
const JPG_HTML: [u8; 60] = [
    0xFF, 0xD8, 0xFF, 0x3C, 0x68, 0x74, 0x6D, 0x6C, 0x3E, 0x54, 0x48, 0x49, 0x53, 0x20, 0x46,
    0x49, 0x4C, 0x45, 0x20, 0x53, 0x48, 0x4F, 0x55, 0x4C, 0x44, 0x20, 0x49, 0x44, 0x45, 0x4E,
    0x54, 0x49, 0x46, 0x59, 0x20, 0x41, 0x53, 0x20, 0x4A, 0x50, 0x45, 0x47, 0x20, 0x41, 0x4E,
    0x44, 0x20, 0x48, 0x54, 0x4D, 0x4C, 0x3C, 0x2F, 0x68, 0x74, 0x6D, 0x6C, 0x3E, 0xFF, 0xD9,
];

/// JPEG that is also a QuickTime movie, as reported against DROID.
const JPG_MOV: [u8; 69] = [
    0xFF, 0xD8, 0xFF, 0x00, 0x6D, 0x6F, 0x6F, 0x76, 0x00, 0x00, 0x00, 0x00, 0x6D, 0x76, 0x68,
    0x64, 0x54, 0x48, 0x49, 0x53, 0x20, 0x46, 0x49, 0x4C, 0x45, 0x20, 0x53, 0x48, 0x4F, 0x55,
    0x4C, 0x44, 0x20, 0x49, 0x44, 0x45, 0x4E, 0x54, 0x49, 0x46, 0x59, 0x20, 0x41, 0x53, 0x20,
    0x51, 0x55, 0x49, 0x43, 0x4B, 0x54, 0x49, 0x4D, 0x45, 0x20, 0x4D, 0x4F, 0x56, 0x20, 0x41,
    0x4E, 0x44, 0x20, 0x4A, 0x50, 0x45, 0x47, 0xFF, 0xD9,
];

#[test]
fn test_droid_polyglot_samples() {
    let results = keep_all().identify_bytes(&JPG_HTML, "test.jpg", None);
    assert_eq!(top_ids(&results), ["fmt/41", "fmt/96"]);
    let results = identifier().identify_bytes(&JPG_HTML, "test.jpg", None);
    assert_eq!(top_ids(&results), ["fmt/41", "fmt/96"]);

    let results = keep_all().identify_bytes(&JPG_MOV, "test.jpg", None);
    assert_eq!(top_ids(&results), ["x-fmt/384", "fmt/41"]);
    let results = identifier().identify_bytes(&JPG_MOV, "test.jpg", None);
    assert_eq!(id_set(&results), BTreeSet::from(["fmt/41".to_string(), "x-fmt/384".to_string()]));
}

#[test]
fn test_declared_relation_suppresses_polyglot_member() {
    let mut formats = common::formats();
    for format in &mut formats {
        if format.id() == &id("x-fmt/384") {
            *format = format.clone().with_priority_over(id("fmt/41"));
        }
    }
    let identifier = Identifier::builder("related").extend(formats).build().unwrap();
    let results = identifier.identify_bytes(&jpeg_quicktime(), "", None);
    assert_eq!(top_ids(&results), ["x-fmt/384"]);

    // Without the relation best-match keeps both
    let results = common::identifier().identify_bytes(&jpeg_quicktime(), "", None);
    assert_eq!(top_ids(&results), ["x-fmt/384", "fmt/41"]);
}

#[test]
fn test_jfif_replaces_raw_jpeg() {
    let mut data = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01".to_vec();
    data.extend_from_slice(&[0u8; 40]);
    data.extend_from_slice(b"\xFF\xD9");
    let results = identifier().identify_bytes(&data, "photo.jpg", Some("image/jpeg"));
    assert_eq!(top_ids(&results), ["fmt/43"]);
    assert_eq!(
        results[0].bases(),
        &[
            Basis::Signature { index: 0 },
            Basis::Extension("jpg".into()),
            Basis::Mime("image/jpeg".into()),
        ]
    );
}

#[test]
fn test_extension_breaks_specificity_tie() {
    let data = jpeg_html();
    let results = identifier().identify_bytes(&data, "page.html", None);
    assert_eq!(top_ids(&results), ["fmt/96", "fmt/41"]);
}

#[test]
fn test_extension_only_match() {
    let report = identifier().identify_bytes_report(b"not a gif", "image.GIF", None);
    assert_eq!(top_ids(&report.matches), ["fmt/3", "fmt/4"]);
    assert!(report.matches.iter().all(|r| r.is_hint_only()));
    assert_eq!(report.warnings, vec![Warning::ExtensionOnly]);
}

#[test]
fn test_hints_never_override_content() {
    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    let results = identifier().identify_bytes(png, "picture.jpg", Some("image/jpeg"));
    assert_eq!(top_ids(&results), ["fmt/11"]);
}

#[test]
fn test_pdf_trailer_may_float_near_end() {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.extend_from_slice(&[b' '; 200]);
    data.extend_from_slice(b"%%EOF\n");
    data.extend_from_slice(&[b'\n'; 100]);
    assert_eq!(top_ids(&identifier().identify_bytes(&data, "", None)), ["fmt/18"]);

    data.extend_from_slice(&[b'\n'; 1024]);
    assert!(identifier().identify_bytes(&data, "", None).is_empty());
}

#[test]
fn test_large_seekable_source_reads_windows() {
    let config = Config::default().with_window_caps(256, 256).with_max_var_scan(256);
    let identifier = identifier().with_config(config);
    let data = segy(1 << 20);
    let results = identifier.identify(&mut Cursor::new(&data), "big.sgy", None).unwrap();
    assert_eq!(top_ids(&results), ["fmt/363"]);
    let streamed = identifier.identify_stream(&mut &data[..], "big.sgy", None).unwrap();
    assert_eq!(results, streamed);
}

#[test]
fn test_floating_pattern_near_end_of_large_stream() {
    let config = Config::default().with_window_caps(256, 256).with_max_var_scan(256);
    let identifier = identifier().with_config(config);
    let mut data = vec![b' '; 1 << 16];
    data.extend_from_slice(b"<html></html>\n");

    let results = identifier.identify(&mut Cursor::new(&data), "page", None).unwrap();
    assert_eq!(top_ids(&results), ["fmt/96"]);
    assert_eq!(results[0].extents()[0].offset, 1 << 16);
    let streamed = identifier.identify_stream(&mut &data[..], "page", None).unwrap();
    assert_eq!(results, streamed);

    // The unbuffered middle of the stream is never searched
    let mut data = vec![b' '; 1 << 16];
    data[1 << 15..][..5].copy_from_slice(b"<html");
    assert!(identifier.identify_bytes(&data, "page", None).is_empty());
}

#[test]
fn test_io_failure_is_an_error() {
    struct Broken;

    impl std::io::Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("device gone"))
        }
    }

    let err = identifier().identify_stream(&mut Broken, "x", None).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_corpus_errors() {
    let err = builder()
        .add(Format::new(id("fmt/41"), "again"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateFormat(_)));

    assert!(matches!(Signature::bof("FFD"), Err(Error::InvalidPattern { .. })));
}
