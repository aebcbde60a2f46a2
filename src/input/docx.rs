//! Paragraph extraction from `.docx` files.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`.
//! Each `<w:p>` element is one paragraph and its visible text is the
//! concatenation of its `<w:t>` runs. Tabs are kept; line breaks inside a
//! paragraph become spaces so a paragraph is always a single line.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{DecodeError, DecodeResult};

/// Archive member holding the document body
pub const DOCUMENT_PART: &str = "word/document.xml";

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>").expect("valid regex"));

static RUN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>").expect("valid regex")
});

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(amp|lt|gt|quot|apos|#[0-9]+|#x[0-9a-fA-F]+);").expect("valid regex"));

/// Read the non-blank paragraphs of a `.docx` file, trimmed, in document order
pub fn read_paragraphs(path: &Path) -> DecodeResult<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => DecodeError::MissingPart(DOCUMENT_PART),
        other => DecodeError::Archive(other),
    })?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(paragraphs_from_xml(&xml))
}

/// Extract trimmed, non-blank paragraph text from a WordprocessingML body
pub fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|body| paragraph_text(body.as_str()))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

fn paragraph_text(body: &str) -> String {
    let mut text = String::new();
    for token in RUN_TOKEN.captures_iter(body) {
        match token.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None if token[0].starts_with("<w:tab") => text.push('\t'),
            None => text.push(' '),
        }
    }
    text
}

fn unescape_xml(raw: &str) -> String {
    ENTITY
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = match entity.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| caps[0].to_string())
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>test scenario </w:t></w:r><w:r><w:t xml:space="preserve">Checkout</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>   </w:t></w:r></w:p>
<w:p w:rsidR="00AB"><w:r><w:t>verify Fish &amp; Chips</w:t></w:r></w:p>
<w:p><w:r><w:t>click</w:t><w:tab/><w:t>Pay &#8364;5</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell text</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body>
</w:document>"#;

    #[test]
    fn test_line_breaks_stay_on_one_line() {
        let xml = "<w:p><w:r><w:t>click Go</w:t><w:br/><w:t>now</w:t><w:cr/><w:t>please</w:t></w:r></w:p>";
        assert_eq!(paragraphs_from_xml(xml), vec!["click Go now please"]);
    }

    #[test]
    fn test_paragraphs_from_xml() {
        let paragraphs = paragraphs_from_xml(BODY);
        assert_eq!(
            paragraphs,
            vec![
                "test scenario Checkout",
                "verify Fish & Chips",
                "click\tPay \u{20ac}5",
                "cell text",
            ]
        );
    }

    #[test]
    fn test_unescape_leaves_unknown_entities() {
        assert_eq!(unescape_xml("a &lt;b&gt; &#x41; &bogus;"), "a <b> A &bogus;");
    }

    #[test]
    fn test_read_paragraphs_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.docx");

        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(BODY.as_bytes()).unwrap();
        writer.finish().unwrap();

        let paragraphs = read_paragraphs(&path).unwrap();
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[0], "test scenario Checkout");
    }

    #[test]
    fn test_archive_without_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.docx");

        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("docProps/app.xml", options).unwrap();
        writer.write_all(b"<Properties/>").unwrap();
        writer.finish().unwrap();

        let err = read_paragraphs(&path).unwrap_err();
        assert!(matches!(err, DecodeError::MissingPart(DOCUMENT_PART)));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "plain text pretending").unwrap();

        let err = read_paragraphs(&path).unwrap_err();
        assert!(matches!(err, DecodeError::Archive(_)));
    }
}
