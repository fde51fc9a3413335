use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::io::{Cursor, Read};
use std::string::FromUtf8Error;
use tracing::{debug, info};

/// Supported upload formats. Detection is by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Doc,
    Docx,
    Txt,
    Xls,
    Xlsx,
}

impl DocumentFormat {
    /// Derive the format from the text after the last `.` of a file name,
    /// lower-cased. Returns `None` for unknown or missing extensions.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(&ext.to_lowercase())
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "xls" => Some(Self::Xls),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document and the text extracted from it.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub raw_bytes: Vec<u8>,
    pub format: DocumentFormat,
    pub extracted_text: Option<String>,
}

impl Document {
    pub fn size_kb(&self) -> f64 {
        self.raw_bytes.len() as f64 / 1024.0
    }

    pub fn text(&self) -> &str {
        self.extracted_text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: .{extension}")]
    UnsupportedFormat { extension: String },
    #[error("Error reading TXT: {source}")]
    Decode {
        #[from]
        source: FromUtf8Error,
    },
    #[error("Error reading {format}: {cause}")]
    Parse {
        format: DocumentFormat,
        cause: String,
    },
    #[error("Could not extract text from {format} document")]
    Empty { format: DocumentFormat },
}

fn parse_error(format: DocumentFormat, cause: impl fmt::Display) -> ExtractionError {
    ExtractionError::Parse {
        format,
        cause: cause.to_string(),
    }
}

/// Resolve the format of an uploaded file and extract its text.
///
/// Whitespace-only results are rejected, so a returned `Document` always has
/// usable `extracted_text`.
pub fn parse_upload(name: &str, raw_bytes: Vec<u8>) -> Result<Document, ExtractionError> {
    let format = DocumentFormat::from_file_name(name).ok_or_else(|| {
        ExtractionError::UnsupportedFormat {
            extension: name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .unwrap_or_default(),
        }
    })?;

    let text = extract(&raw_bytes, format)?;
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty { format });
    }

    info!(
        name,
        %format,
        bytes = raw_bytes.len(),
        chars = text.chars().count(),
        "document extracted"
    );

    Ok(Document {
        name: name.to_string(),
        raw_bytes,
        format,
        extracted_text: Some(text),
    })
}

/// Convert raw file bytes of a known format into plain text.
pub fn extract(raw_bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    debug!(%format, bytes = raw_bytes.len(), "extracting text");
    match format {
        DocumentFormat::Pdf => extract_pdf(raw_bytes),
        DocumentFormat::Doc | DocumentFormat::Docx => extract_docx(raw_bytes, format),
        DocumentFormat::Txt => Ok(String::from_utf8(raw_bytes.to_vec())?),
        DocumentFormat::Xls | DocumentFormat::Xlsx => extract_spreadsheet(raw_bytes, format),
    }
}

fn extract_pdf(raw_bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(raw_bytes)
        .map_err(|e| parse_error(DocumentFormat::Pdf, e))?;

    let mut text = String::new();
    // get_pages is keyed by page number, so iteration is in page order
    for page_number in doc.get_pages().keys() {
        let page_text = doc
            .extract_text(&[*page_number])
            .map_err(|e| parse_error(DocumentFormat::Pdf, e))?;
        text.push_str(page_text.trim_end());
        text.push('\n');
    }
    Ok(text)
}

fn extract_docx(raw_bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(raw_bytes)).map_err(|e| parse_error(format, e))?;

    let mut xml_content = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| parse_error(format, e))?
        .read_to_string(&mut xml_content)
        .map_err(|e| parse_error(format, e))?;

    Ok(docx_paragraphs(&xml_content))
}

/// Walk the WordprocessingML body and emit each `<w:p>` paragraph's text
/// followed by a newline.
fn docx_paragraphs(xml: &str) -> String {
    let mut result = String::new();
    // Paragraphs can nest (text boxes), so keep one buffer per open paragraph
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut in_run = false;
    let mut pos = 0;

    while pos < xml.len() {
        let Some(lt) = xml[pos..].find('<') else {
            break;
        };
        let tag_start = pos + lt;

        if in_text {
            if let Some(current) = open.last_mut() {
                current.push_str(&unescape_xml(&xml[pos..tag_start]));
            }
        }

        let Some(gt) = xml[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + gt;
        let tag = &xml[tag_start + 1..tag_end];
        pos = tag_end + 1;

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");

        match (name, closing, self_closing) {
            ("w:p", false, false) => open.push(String::new()),
            ("w:p", false, true) => result.push('\n'),
            ("w:p", true, _) => {
                if let Some(paragraph) = open.pop() {
                    result.push_str(&paragraph);
                    result.push('\n');
                }
            }
            ("w:r", false, false) => in_run = true,
            ("w:r", true, _) => in_run = false,
            ("w:t", false, false) => in_text = true,
            ("w:t", true, _) => in_text = false,
            // w:tab outside a run is a tab-stop definition
            ("w:tab", false, _) if in_run => {
                if let Some(current) = open.last_mut() {
                    current.push('\t');
                }
            }
            ("w:br" | "w:cr", false, _) if in_run => {
                if let Some(current) = open.last_mut() {
                    current.push('\n');
                }
            }
            _ => {}
        }
    }

    result
}

fn unescape_xml(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let Some(semi) = after.find(';') else {
            out.push_str(after);
            return out;
        };
        let entity = &after[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&after[..=semi]),
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    out
}

fn extract_spreadsheet(raw_bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(raw_bytes.to_vec()))
        .map_err(|e| parse_error(format, e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut text = String::new();

    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| parse_error(format, e))?;
        text.push_str(&format!("\n\n=== Sheet: {} ===\n", sheet_name));
        text.push_str(&render_sheet(&range));
    }

    Ok(text)
}

fn render_sheet(range: &Range<Data>) -> String {
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    render_rows(&rows)
}

/// Render rows as a right-aligned text table, two spaces between columns.
/// The first row is the header row; there is no row index column.
fn render_rows(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let cell = |row: &Vec<String>, i: usize| -> String {
        row.get(i).cloned().unwrap_or_else(|| "NaN".to_string())
    };

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(cell(row, i).chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            widths
                .iter()
                .enumerate()
                .map(|(i, width)| format!("{:>width$}", cell(row, i), width = *width))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a calamine cell to its display text; empty cells read as `NaN`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => "NaN".to_string(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // 1500.0 -> "1500"
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Data::Error(e) => format!("#ERR:{:?}", e),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(format_datetime)
            .unwrap_or_else(|| cell.to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Dates without a time of day print as `2024-01-01`.
fn format_datetime(value: NaiveDateTime) -> String {
    if value.hour() == 0 && value.minute() == 0 && value.second() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
