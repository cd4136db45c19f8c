use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

/// Archive member holding the body of a `.docx` document.
const DOCX_BODY: &str = "word/document.xml";

/// Placed between the text of consecutive PDF pages.
const PAGE_SEPARATOR: &str = "\n\n";

/// Document kinds accepted as reading material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
    /// Read as plain UTF-8; RTF control words are kept as-is.
    Rtf,
    /// Legacy Word binary; not parsed, only a placeholder is produced.
    Doc,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported document format: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to extract text from {path}: {reason}")]
    Failed { path: String, reason: String },
}

impl ExtractError {
    fn failed(path: &Path, reason: impl ToString) -> Self {
        Self::Failed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl DocumentFormat {
    /// Parse an extension such as `pdf`, `.PDF` or `Docx`.
    pub fn from_extension(ext: &str) -> Result<Self, ExtractError> {
        let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::PlainText),
            "rtf" => Ok(Self::Rtf),
            "doc" => Ok(Self::Doc),
            _ => Err(ExtractError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }
}

/// Extract text from the file at `path`, dispatching on `extension`.
/// `.doc` placeholders name the file by its on-disk name.
pub fn extract(path: &Path, extension: &str) -> Result<String, ExtractError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_as(path, extension, &name)
}

/// Like [`extract`], but `.doc` placeholders use `display_name`.
pub fn extract_as(path: &Path, extension: &str, display_name: &str) -> Result<String, ExtractError> {
    match DocumentFormat::from_extension(extension)? {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Docx => extract_docx(path),
        DocumentFormat::PlainText | DocumentFormat::Rtf => read_utf8(path),
        DocumentFormat::Doc => Ok(format!("Document file: {display_name}")),
    }
}

fn read_utf8(path: &Path) -> Result<String, ExtractError> {
    let data = std::fs::read(path).map_err(|e| ExtractError::failed(path, e))?;
    String::from_utf8(data).map_err(|e| ExtractError::failed(path, e))
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let data = std::fs::read(path).map_err(|e| ExtractError::failed(path, e))?;
    // pdf-extract panics on some malformed inputs instead of erroring.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&data))
        .map_err(|_| ExtractError::failed(path, "PDF parser panicked"))?
        .map_err(|e| ExtractError::failed(path, e))?;
    Ok(pages.join(PAGE_SEPARATOR))
}

fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let file = std::fs::File::open(path).map_err(|e| ExtractError::failed(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::failed(path, e))?;
    let mut body = archive
        .by_name(DOCX_BODY)
        .map_err(|e| ExtractError::failed(path, e))?;
    let mut xml = String::new();
    body.read_to_string(&mut xml)
        .map_err(|e| ExtractError::failed(path, e))?;
    Ok(docx_xml_to_text(&xml))
}

/// Text runs, tabs, breaks and paragraph ends in WordprocessingML.
static DOCX_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|(<w:tab\s*/>)|(<w:(?:br|cr)(?:\s[^>]*)?/>)|(</w:p>)")
        .expect("docx token regex")
});

/// Strip WordprocessingML down to its raw text; paragraphs end in a blank line.
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    for caps in DOCX_TOKEN_RE.captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            out.push_str(&decode_xml_entities(run.as_str()));
        } else if caps.get(2).is_some() {
            out.push('\t');
        } else if caps.get(3).is_some() {
            out.push('\n');
        } else {
            out.push_str("\n\n");
        }
    }
    out.trim_end().to_string()
}

fn decode_xml_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        match decode_entity(entity) {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("pdf").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_extension(".DOCX").unwrap(), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_extension("Txt").unwrap(), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_extension(".rtf").unwrap(), DocumentFormat::Rtf);
        assert_eq!(DocumentFormat::from_extension("doc").unwrap(), DocumentFormat::Doc);
        assert!(matches!(
            DocumentFormat::from_extension(".exe"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
        assert!(DocumentFormat::from_extension("").is_err());
    }

    #[test]
    fn txt_is_byte_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.txt");
        let content = "Line one\r\n  ünïcödé\ttabs\n\n";
        std::fs::write(&path, content).unwrap();
        assert_eq!(extract(&path, ".txt").unwrap(), content);
    }

    #[test]
    fn rtf_markup_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.rtf");
        let content = r"{\rtf1\ansi {\b Bold} text}";
        std::fs::write(&path, content).unwrap();
        assert_eq!(extract(&path, "rtf").unwrap(), content);
    }

    #[test]
    fn invalid_utf8_text_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(extract(&path, "txt"), Err(ExtractError::Failed { .. })));
    }

    #[test]
    fn doc_yields_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("123-abc.doc");
        std::fs::write(&path, b"\xd0\xcf\x11\xe0").unwrap();
        assert_eq!(extract(&path, "doc").unwrap(), "Document file: 123-abc.doc");
        assert_eq!(
            extract_as(&path, "doc", "Syllabus.doc").unwrap(),
            "Document file: Syllabus.doc"
        );
    }

    #[test]
    fn unsupported_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.png");
        std::fs::write(&path, b"png").unwrap();
        assert!(matches!(
            extract(&path, "png"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn docx_xml_strips_markup() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Cells &amp; </w:t></w:r><w:r><w:t xml:space="preserve">tissues</w:t></w:r></w:p>
            <w:tbl/>
            <w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t><w:br/><w:t>&lt;C&gt;&#233;</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(docx_xml_to_text(xml), "Cells & tissues\n\nA\tB\n<C>é");
    }

    #[test]
    fn docx_archive_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(DOCX_BODY, options).unwrap();
        zip.write_all(b"<w:document><w:body><w:p><w:r><w:t>Mitosis</w:t></w:r></w:p></w:body></w:document>")
            .unwrap();
        zip.finish().unwrap();

        assert_eq!(extract(&path, "docx").unwrap(), "Mitosis");
    }

    #[test]
    fn corrupt_docx_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.docx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(extract(&path, "docx"), Err(ExtractError::Failed { .. })));
    }

    #[test]
    fn pdf_pages_in_document_order() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/files/testdata/two_pages.pdf");
        let text = extract(&path, "pdf").unwrap();
        let first = text.find("Page one cells").unwrap();
        let second = text.find("Page two mitosis").unwrap();
        assert!(first < second);
        assert!(!text.contains("cellsPage"));
        assert!(text[first..second].contains(PAGE_SEPARATOR));
    }

    #[test]
    fn corrupt_pdf_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-garbage").unwrap();
        assert!(extract(&path, "pdf").is_err());
    }
}
