//! Raw text extraction from source documents.
//!
//! The format is chosen by file extension: PDF, DOCX, JSON and plain text are
//! recognized. Anything else extracts to an empty string.

use crate::types::Document;
use manualqa_core::{AppError, AppResult};
use quick_xml::events::Event;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Docx,
    Json,
    Text,
    Unsupported,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            Some("json") => Self::Json,
            Some("txt") => Self::Text,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Json => "json",
            Self::Text => "text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Extract plain text from a file.
///
/// # Errors
/// Returns `AppError::TextExtraction` when the file cannot be read or parsed.
pub fn extract_text(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);
    if !content_type.is_supported() {
        tracing::debug!("No extractor for {:?}, using empty text", path);
        return Ok(String::new());
    }

    let bytes = fs::read(path).map_err(|e| extraction_error(path, e))?;
    extract_bytes(path, &bytes, content_type)
}

/// Load a file as a [`Document`], extracting its text and fingerprinting its bytes.
pub fn load_document(path: &Path, id: impl Into<String>) -> AppResult<Document> {
    let content_type = ContentType::from_path(path);
    let bytes = fs::read(path).map_err(|e| extraction_error(path, e))?;

    let text = if content_type.is_supported() {
        extract_bytes(path, &bytes, content_type)?
    } else {
        tracing::debug!("No extractor for {:?}, using empty text", path);
        String::new()
    };

    Ok(Document {
        id: id.into(),
        path: path.to_path_buf(),
        text,
        sha256: sha256_hex(&bytes),
        size_bytes: bytes.len() as u64,
    })
}

/// Hex SHA-256 of a file's bytes.
pub fn file_sha256(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn extract_bytes(path: &Path, bytes: &[u8], content_type: ContentType) -> AppResult<String> {
    let text = match content_type {
        ContentType::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| extraction_error(path, e))?,
        ContentType::Docx => extract_docx(bytes).map_err(|reason| AppError::TextExtraction {
            path: path.to_path_buf(),
            reason,
        })?,
        ContentType::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(bytes).map_err(|e| extraction_error(path, e))?;
            serde_json::to_string_pretty(&value).map_err(|e| extraction_error(path, e))?
        }
        ContentType::Text => String::from_utf8(bytes.to_vec())
            .map_err(|e| extraction_error(path, e))?,
        ContentType::Unsupported => String::new(),
    };

    tracing::debug!(
        "Extracted {} chars of {} from {:?}",
        text.chars().count(),
        content_type.as_str(),
        path
    );
    Ok(text)
}

fn extraction_error(path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::TextExtraction {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let entry = archive
        .by_name(DOCX_BODY_ENTRY)
        .map_err(|_| format!("{} not found", DOCX_BODY_ENTRY))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| e.to_string())?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(format!("{} exceeds size limit", DOCX_BODY_ENTRY));
    }

    paragraphs_from_xml(&xml)
}

/// Collect `w:t` runs, ending every `w:p` paragraph with a newline.
fn paragraphs_from_xml(xml: &[u8]) -> Result<String, String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" | b"br" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_docx(path: &Path, body: &str) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(DOCX_BODY_ENTRY, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("a.pdf")), ContentType::Pdf);
        assert_eq!(ContentType::from_path(Path::new("a.PDF")), ContentType::Pdf);
        assert_eq!(ContentType::from_path(Path::new("a.docx")), ContentType::Docx);
        assert_eq!(ContentType::from_path(Path::new("a.json")), ContentType::Json);
        assert_eq!(ContentType::from_path(Path::new("a.txt")), ContentType::Text);
        assert_eq!(ContentType::from_path(Path::new("a.md")), ContentType::Unsupported);
        assert_eq!(ContentType::from_path(Path::new("README")), ContentType::Unsupported);
    }

    #[test]
    fn test_unsupported_extension_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# heading").unwrap();

        assert_eq!(extract_text(&path).unwrap(), "");
    }

    #[test]
    fn test_plain_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.txt");
        fs::write(&path, "Configure the MMI LED status.").unwrap();

        assert_eq!(extract_text(&path).unwrap(), "Configure the MMI LED status.");
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"led":{"mode":"blink"}}"#).unwrap();

        let text = extract_text(&path).unwrap();
        assert_eq!(text, "{\n  \"led\": {\n    \"mode\": \"blink\"\n  }\n}");
    }

    #[test]
    fn test_invalid_json_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        match extract_text(&path) {
            Err(AppError::TextExtraction { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected TextExtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manual.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        assert!(matches!(
            extract_text(&path),
            Err(AppError::TextExtraction { .. })
        ));
    }

    #[test]
    fn test_invalid_docx_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manual.docx");
        fs::write(&path, b"not a zip").unwrap();

        assert!(matches!(
            extract_text(&path),
            Err(AppError::TextExtraction { .. })
        ));
    }

    #[test]
    fn test_docx_paragraphs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manual.docx");
        write_docx(
            &path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>Reset the</w:t></w:r><w:r><w:t xml:space="preserve"> device &amp; wait.</w:t></w:r></w:p>
<w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
</w:body>
</w:document>"#,
        );

        let text = extract_text(&path).unwrap();
        assert_eq!(text, "Reset the device & wait.\nSecond paragraph\n");
    }

    #[test]
    fn test_docx_without_body_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.docx");
        let file = fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<x/>").unwrap();
        zip.finish().unwrap();

        match extract_text(&path) {
            Err(AppError::TextExtraction { reason, .. }) => {
                assert!(reason.contains("word/document.xml"))
            }
            other => panic!("expected TextExtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        assert!(matches!(
            extract_text(&path),
            Err(AppError::TextExtraction { .. })
        ));
    }

    #[test]
    fn test_load_document_fingerprint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();

        let doc = load_document(&path, "abc.txt").unwrap();
        assert_eq!(doc.id, "abc.txt");
        assert_eq!(doc.text, "abc");
        assert_eq!(doc.size_bytes, 3);
        assert_eq!(
            doc.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(file_sha256(&path).unwrap(), doc.sha256);
    }
}
