//! Template fixtures built in-process

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DOCUMENT_PART: &str = "word/document.xml";

/// Package with content types, the given body, a styles part and an image
pub fn template(body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    writer.start_file("[Content_Types].xml", deflated).unwrap();
    writer
        .write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    writer.start_file(DOCUMENT_PART, deflated).unwrap();
    writer.write_all(document(body).as_bytes()).unwrap();
    writer.start_file("word/styles.xml", deflated).unwrap();
    writer.write_all(br#"<w:styles xmlns:w="urn:w"><w:style w:styleId="Normal"/></w:styles>"#).unwrap();
    writer.start_file("word/media/logo.png", stored).unwrap();
    writer.write_all(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 7, 7, 7]).unwrap();

    writer.finish().unwrap().into_inner()
}

pub fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

/// Runs of one field: begin, instruction, separate, placeholder, end
pub fn field(keyword: &str, name: &str) -> String {
    format!(
        concat!(
            r#"<w:r><w:fldChar w:fldCharType="begin"/></w:r>"#,
            r#"<w:r><w:instrText xml:space="preserve"> {} {} \* MERGEFORMAT </w:instrText></w:r>"#,
            r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r>"#,
            r#"<w:r><w:t>«{}»</w:t></w:r>"#,
            r#"<w:r><w:fldChar w:fldCharType="end"/></w:r>"#
        ),
        keyword, name, name
    )
}

pub fn paragraph(content: &str) -> String {
    format!("<w:p>{content}</w:p>")
}

/// Decompressed contents of one part
pub fn part(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

pub fn document_text(bytes: &[u8]) -> String {
    String::from_utf8(part(bytes, DOCUMENT_PART)).unwrap()
}

/// Entry names in archive order
pub fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}
