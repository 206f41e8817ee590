//! Shared corpus and fixture builders for the integration tests.

#![allow(dead_code)]

use quince::{
    ContainerKind, ContainerSignature, Format, FormatId, Identifier, IdentifierBuilder, Pattern,
    Signature, SubSignature,
};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn id(s: &str) -> FormatId {
    FormatId::parse(s).unwrap()
}

fn bof(notation: &str) -> SubSignature {
    SubSignature::bof(Pattern::parse(notation).unwrap())
}

fn eof(notation: &str) -> SubSignature {
    SubSignature::eof(Pattern::parse(notation).unwrap())
}

fn var(notation: &str) -> SubSignature {
    SubSignature::var(Pattern::parse(notation).unwrap())
}

fn signature(subs: impl IntoIterator<Item = SubSignature>) -> Signature {
    Signature::new(subs).unwrap()
}

fn hex(text: &str) -> String {
    text.bytes().map(|b| format!("{b:02X}")).collect()
}

/// Formats of a small PRONOM-like corpus, without any priorities between
/// the JPEG, HTML and QuickTime definitions.
pub fn formats() -> Vec<Format> {
    vec![
        Format::new(id("fmt/668"), "Minolta RAW")
            .with_extension("mrw")
            .with_signature(signature([bof("004D52")])),
        Format::new(id("fmt/669"), "Minolta MRW")
            .with_extension("mrw")
            .with_signature(signature([bof("004D524D")]))
            .with_priority_over(id("fmt/668")),
        Format::new(id("fmt/363"), "SEG Y Data Format")
            .with_extension("sgy")
            .with_signature(signature([bof("40404040404040404040"), eof("010000000100000100")])),
        Format::new(id("fmt/41"), "Raw JPEG Stream")
            .with_extension("jpg")
            .with_extension("jpeg")
            .with_mime("image/jpeg")
            .with_signature(signature([bof("FFD8FF"), eof("FFD9")])),
        Format::new(id("fmt/43"), "JPEG File Interchange Format")
            .with_extension("jpg")
            .with_mime("image/jpeg")
            .with_signature(signature([bof("FFD8FFE0{2}4A464946"), eof("FFD9")]))
            .with_priority_over(id("fmt/41")),
        Format::new(id("fmt/96"), "Hypertext Markup Language")
            .with_extension("html")
            .with_extension("htm")
            .with_mime("text/html")
            .with_signature(signature([var("3C68746D6C")])),
        Format::new(id("x-fmt/384"), "Quicktime")
            .with_extension("mov")
            .with_mime("video/quicktime")
            .with_signature(signature([bof("6D6F6F76{0-16}6D766864").at(4)])),
        Format::new(id("fmt/11"), "Portable Network Graphics")
            .with_extension("png")
            .with_mime("image/png")
            .with_signature(signature([bof("89504E470D0A1A0A")])),
        Format::new(id("fmt/3"), "Graphics Interchange Format 87a")
            .with_extension("gif")
            .with_signature(signature([bof("474946383761")])),
        Format::new(id("fmt/4"), "Graphics Interchange Format 89a")
            .with_extension("gif")
            .with_signature(signature([bof("474946383961")])),
        Format::new(id("fmt/18"), "Portable Document Format 1.4")
            .with_extension("pdf")
            .with_mime("application/pdf")
            .with_signature(signature([bof("255044462D312E34"), eof("2525454F46").within(0, 1024)])),
        Format::new(id("fmt/101"), "Extensible Markup Language")
            .with_extension("xml")
            .with_signature(signature([bof("3C3F786D6C")])),
        Format::new(id("x-fmt/263"), "ZIP Format")
            .with_extension("zip")
            .with_mime("application/zip")
            .as_container(ContainerKind::Zip)
            .with_signature(signature([bof("504B0304")])),
        Format::new(id("fmt/412"), "Microsoft Word for Windows 2007 onwards")
            .with_extension("docx")
            .with_container_signature(
                ContainerSignature::new(ContainerKind::Zip)
                    .with_member_signature(
                        "[Content_Types].xml",
                        signature([var(&hex("wordprocessingml"))]),
                    )
                    .with_member("word/document.xml"),
            )
            .with_priority_over(id("x-fmt/263")),
        Format::new(id("fmt/111"), "OLE2 Compound Document Format")
            .as_container(ContainerKind::Ole2)
            .with_signature(signature([bof("D0CF11E0A1B11AE1")])),
        Format::new(id("fmt/40"), "Microsoft Word Document 97-2003")
            .with_extension("doc")
            .with_container_signature(ContainerSignature::new(ContainerKind::Ole2).with_member("WordDocument"))
            .with_priority_over(id("fmt/111")),
    ]
}

pub fn builder() -> IdentifierBuilder {
    Identifier::builder("pronom").extend(formats())
}

pub fn identifier() -> Identifier {
    builder().build().unwrap()
}

/// Top-level result identities in order.
pub fn top_ids(results: &[quince::MatchResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.context().is_none())
        .map(|r| r.id().to_string())
        .collect()
}

/// SEG-Y-like buffer: an EBCDIC-blank textual header start and the binary
/// trailer the signature expects.
pub fn segy(len: usize) -> Vec<u8> {
    const TRAILER: [u8; 9] = [0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00];
    let mut data = vec![0u8; len];
    data[..22].fill(0x40);
    data[len - TRAILER.len()..].copy_from_slice(&TRAILER);
    data
}

pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn docx() -> Vec<u8> {
    zip_archive(&[
        (
            "[Content_Types].xml",
            b"<?xml version=\"1.0\"?><Types><Override ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/></Types>",
        ),
        ("word/document.xml", b"<?xml version=\"1.0\"?><w:document/>"),
    ])
}

const SECTOR: usize = 512;
const FREESECT: u32 = 0xFFFF_FFFF;
const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FATSECT: u32 = 0xFFFF_FFFD;
const NOSTREAM: u32 = 0xFFFF_FFFF;

/// Minimal version 3 compound document holding `streams` at the root.
///
/// Sector 0 holds the FAT, the directory follows, then each stream in its
/// own run of regular sectors (the mini stream cutoff is zero). Streams are
/// chained as right siblings of the first one.
pub fn ole_file(streams: &[(&str, &[u8])]) -> Vec<u8> {
    let dir_sectors = (streams.len() + 1).div_ceil(4);
    let data_sectors: Vec<usize> = streams.iter().map(|(_, data)| data.len().div_ceil(SECTOR)).collect();
    let total = 1 + dir_sectors + data_sectors.iter().sum::<usize>();
    assert!(total <= SECTOR / 4, "fixture too large for one FAT sector");

    let mut fat = vec![FREESECT; SECTOR / 4];
    fat[0] = FATSECT;
    let mut next = 1;
    for i in 0..dir_sectors {
        fat[next + i] = if i + 1 == dir_sectors { ENDOFCHAIN } else { (next + i + 1) as u32 };
    }
    next += dir_sectors;
    let mut starts = Vec::new();
    for &count in &data_sectors {
        if count == 0 {
            starts.push(ENDOFCHAIN);
            continue;
        }
        starts.push(next as u32);
        for i in 0..count {
            fat[next + i] = if i + 1 == count { ENDOFCHAIN } else { (next + i + 1) as u32 };
        }
        next += count;
    }

    let mut out = Vec::with_capacity((total + 1) * SECTOR);
    out.extend_from_slice(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1");
    out.extend_from_slice(&[0; 16]);
    out.extend_from_slice(&0x3Eu16.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&9u16.to_le_bytes());
    out.extend_from_slice(&6u16.to_le_bytes());
    out.extend_from_slice(&[0; 6]);
    out.extend_from_slice(&0u32.to_le_bytes()); // directory sectors (v3)
    out.extend_from_slice(&1u32.to_le_bytes()); // FAT sectors
    out.extend_from_slice(&1u32.to_le_bytes()); // first directory sector
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // mini stream cutoff
    out.extend_from_slice(&ENDOFCHAIN.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&ENDOFCHAIN.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // DIFAT[0]: the FAT sector
    for _ in 1..109 {
        out.extend_from_slice(&FREESECT.to_le_bytes());
    }
    assert_eq!(out.len(), SECTOR);

    for entry in fat {
        out.extend_from_slice(&entry.to_le_bytes());
    }

    let mut directory = Vec::with_capacity(dir_sectors * SECTOR);
    let child = if streams.is_empty() { NOSTREAM } else { 1 };
    directory.extend(dir_entry("Root Entry", 5, NOSTREAM, child, ENDOFCHAIN, 0));
    for (i, (name, data)) in streams.iter().enumerate() {
        let right = if i + 1 == streams.len() { NOSTREAM } else { (i + 2) as u32 };
        directory.extend(dir_entry(name, 2, right, NOSTREAM, starts[i], data.len() as u64));
    }
    directory.resize(dir_sectors * SECTOR, 0);
    out.extend(directory);

    for (_, data) in streams {
        out.extend_from_slice(data);
        out.resize(out.len().div_ceil(SECTOR) * SECTOR, 0);
    }
    out
}

fn dir_entry(name: &str, kind: u8, right: u32, child: u32, start: u32, size: u64) -> Vec<u8> {
    let mut entry = vec![0u8; 128];
    let units: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in units.iter().enumerate() {
        entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    entry[64..66].copy_from_slice(&(((units.len() + 1) * 2) as u16).to_le_bytes());
    entry[66] = kind;
    entry[67] = 1;
    entry[68..72].copy_from_slice(&NOSTREAM.to_le_bytes());
    entry[72..76].copy_from_slice(&right.to_le_bytes());
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..128].copy_from_slice(&size.to_le_bytes());
    entry
}
