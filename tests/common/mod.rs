#![allow(dead_code)]

use async_trait::async_trait;
use doc_analyzer_lib::llm::{ApiKey, ChatBackend, ChatRequest, ChatResponse, LlmError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Backend double that records every request and answers with a fixed reply.
pub struct SpyBackend {
    reply: Mutex<Result<String, (u16, String)>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl SpyBackend {
    pub fn replying(content: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(content.to_string())),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            reply: Mutex::new(Err((status, message.to_string()))),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every later call with the given status.
    pub fn start_failing(&self, status: u16, message: &str) {
        *self.reply.lock().unwrap() = Err((status, message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatBackend for SpyBackend {
    async fn complete(
        &self,
        _api_key: &ApiKey,
        request: &ChatRequest,
    ) -> Result<ChatResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &*self.reply.lock().unwrap() {
            Ok(content) => Ok(ChatResponse {
                content: content.clone(),
                model: request.model.clone(),
            }),
            Err((status, message)) => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// A PDF with one line of Helvetica text per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn zip_files(files: &[(&str, String)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A minimal DOCX container with one run per paragraph.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    zip_files(&[("word/document.xml", document)])
}

/// A minimal XLSX workbook with a single sheet of inline-string and numeric cells.
pub fn xlsx_with_sheet(sheet_name: &str, rows: &[&[&str]]) -> Vec<u8> {
    let sheet_rows: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let cells: String = cells
                .iter()
                .enumerate()
                .map(|(c, value)| {
                    let cell_ref = format!("{}{}", COLUMNS[c], r + 1);
                    if value.parse::<f64>().is_ok() {
                        format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value)
                    } else {
                        inline_str_cell(&cell_ref, value)
                    }
                })
                .collect();
            format!(r#"<row r="{}">{}</row>"#, r + 1, cells)
        })
        .collect();
    xlsx_package(sheet_name, &sheet_rows, None)
}

/// A one-column XLSX sheet: a text header, then Excel date serials styled
/// with the built-in short date format (numFmtId 14).
pub fn xlsx_with_dates(sheet_name: &str, header: &str, serials: &[u32]) -> Vec<u8> {
    let mut sheet_rows = format!(r#"<row r="1">{}</row>"#, inline_str_cell("A1", header));
    for (i, serial) in serials.iter().enumerate() {
        let r = i + 2;
        sheet_rows.push_str(&format!(
            r#"<row r="{r}"><c r="A{r}" s="1"><v>{serial}</v></c></row>"#
        ));
    }
    let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
    xlsx_package(sheet_name, &sheet_rows, Some(styles))
}

const COLUMNS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn inline_str_cell(cell_ref: &str, value: &str) -> String {
    format!(
        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
        cell_ref, value
    )
}

fn xlsx_package(sheet_name: &str, sheet_rows: &str, styles: Option<&str>) -> Vec<u8> {
    let content_types = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>{}</Types>"#,
        if styles.is_some() { r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"# } else { "" }
    );
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        sheet_name
    );
    let workbook_rels = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>{}</Relationships>"#,
        if styles.is_some() { r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"# } else { "" }
    );
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        sheet_rows
    );

    let mut files = vec![
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", root_rels.to_string()),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", workbook_rels),
        ("xl/worksheets/sheet1.xml", sheet),
    ];
    if let Some(styles) = styles {
        files.push(("xl/styles.xml", styles.to_string()));
    }
    zip_files(&files)
}

/// A cell in a legacy BIFF8 worksheet.
pub enum XlsCell<'a> {
    Label(&'a str),
    Number(f64),
}

const CFB_FREE: u32 = 0xFFFF_FFFF;
const CFB_END_OF_CHAIN: u32 = 0xFFFF_FFFE;
const CFB_FAT_SECTOR: u32 = 0xFFFF_FFFD;
const CFB_SECTOR: usize = 512;
// Streams below 4096 bytes would live in the mini stream; stay above it.
const WORKBOOK_STREAM_LEN: usize = 4096;

fn biff_record(out: &mut Vec<u8>, typ: u16, data: &[u8]) {
    out.extend_from_slice(&typ.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn biff_bof(out: &mut Vec<u8>, substream: u16) {
    let mut data = Vec::new();
    data.extend_from_slice(&0x0600u16.to_le_bytes());
    data.extend_from_slice(&substream.to_le_bytes());
    data.extend_from_slice(&0x0DBBu16.to_le_bytes());
    data.extend_from_slice(&0x07CCu16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0x0006u32.to_le_bytes());
    biff_record(out, 0x0809, &data);
}

/// A legacy `.xls` workbook (BIFF8 inside an OLE compound file) with one
/// worksheet. Strings are stored as compressed Latin-1 labels.
pub fn xls_with_sheet(sheet_name: &str, rows: &[&[XlsCell]]) -> Vec<u8> {
    // Workbook globals: BOF, BoundSheet8, EOF. The sheet offset is patched in.
    let mut stream = Vec::new();
    biff_bof(&mut stream, 0x0005);
    let mut bound_sheet = Vec::new();
    bound_sheet.extend_from_slice(&0u32.to_le_bytes());
    bound_sheet.push(0); // visible
    bound_sheet.push(0); // worksheet
    bound_sheet.push(sheet_name.len() as u8);
    bound_sheet.push(0); // compressed chars
    bound_sheet.extend_from_slice(sheet_name.as_bytes());
    let bound_sheet_data = stream.len() + 4;
    biff_record(&mut stream, 0x0085, &bound_sheet);
    biff_record(&mut stream, 0x000A, &[]);

    let sheet_offset = stream.len() as u32;
    stream[bound_sheet_data..bound_sheet_data + 4].copy_from_slice(&sheet_offset.to_le_bytes());

    biff_bof(&mut stream, 0x0010);
    for (r, cells) in rows.iter().enumerate() {
        for (c, cell) in cells.iter().enumerate() {
            let mut data = Vec::new();
            data.extend_from_slice(&(r as u16).to_le_bytes());
            data.extend_from_slice(&(c as u16).to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            match cell {
                XlsCell::Label(text) => {
                    data.extend_from_slice(&(text.len() as u16).to_le_bytes());
                    data.push(0);
                    data.extend_from_slice(text.as_bytes());
                    biff_record(&mut stream, 0x0204, &data);
                }
                XlsCell::Number(value) => {
                    data.extend_from_slice(&value.to_le_bytes());
                    biff_record(&mut stream, 0x0203, &data);
                }
            }
        }
    }
    biff_record(&mut stream, 0x000A, &[]);
    assert!(stream.len() <= WORKBOOK_STREAM_LEN);
    stream.resize(WORKBOOK_STREAM_LEN, 0);

    compound_file("Workbook", &stream)
}

/// Wrap one stream in a version 3 compound file: header, one FAT sector,
/// one directory sector, then the stream sectors.
fn compound_file(stream_name: &str, stream: &[u8]) -> Vec<u8> {
    let stream_sectors = stream.len().div_ceil(CFB_SECTOR);
    let first_stream_sector = 2u32;

    let mut header = vec![0u8; CFB_SECTOR];
    header[0..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes()); // minor version
    header[26..28].copy_from_slice(&0x0003u16.to_le_bytes()); // major version
    header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes()); // byte order
    header[30..32].copy_from_slice(&0x0009u16.to_le_bytes()); // 512-byte sectors
    header[32..34].copy_from_slice(&0x0006u16.to_le_bytes()); // 64-byte mini sectors
    header[44..48].copy_from_slice(&1u32.to_le_bytes()); // FAT sectors
    header[48..52].copy_from_slice(&1u32.to_le_bytes()); // first directory sector
    header[56..60].copy_from_slice(&4096u32.to_le_bytes()); // mini stream cutoff
    header[60..64].copy_from_slice(&CFB_END_OF_CHAIN.to_le_bytes()); // no mini FAT
    header[68..72].copy_from_slice(&CFB_END_OF_CHAIN.to_le_bytes()); // no DIFAT sectors
    for slot in header[76..].chunks_mut(4) {
        slot.copy_from_slice(&CFB_FREE.to_le_bytes());
    }
    header[76..80].copy_from_slice(&0u32.to_le_bytes()); // FAT lives in sector 0

    let mut fat = vec![CFB_FREE; CFB_SECTOR / 4];
    fat[0] = CFB_FAT_SECTOR;
    fat[1] = CFB_END_OF_CHAIN;
    for i in 0..stream_sectors {
        let sector = first_stream_sector as usize + i;
        fat[sector] = if i + 1 == stream_sectors {
            CFB_END_OF_CHAIN
        } else {
            sector as u32 + 1
        };
    }

    let mut directory = vec![0u8; CFB_SECTOR];
    directory_entry(&mut directory[0..128], "Root Entry", 5, 1, CFB_END_OF_CHAIN, 0);
    directory_entry(
        &mut directory[128..256],
        stream_name,
        2,
        CFB_FREE,
        first_stream_sector,
        stream.len() as u32,
    );
    for unused in directory[256..].chunks_mut(128) {
        for sibling in unused[68..80].chunks_mut(4) {
            sibling.copy_from_slice(&CFB_FREE.to_le_bytes());
        }
    }

    let mut file = header;
    for entry in &fat {
        file.extend_from_slice(&entry.to_le_bytes());
    }
    file.extend_from_slice(&directory);
    file.extend_from_slice(stream);
    file.resize(CFB_SECTOR * (2 + 1 + stream_sectors), 0);
    file
}

fn directory_entry(entry: &mut [u8], name: &str, object_type: u8, child: u32, start: u32, len: u32) {
    let utf16: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in utf16.iter().enumerate() {
        entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    entry[64..66].copy_from_slice(&(((utf16.len() + 1) * 2) as u16).to_le_bytes());
    entry[66] = object_type;
    entry[67] = 1; // black
    entry[68..72].copy_from_slice(&CFB_FREE.to_le_bytes()); // left sibling
    entry[72..76].copy_from_slice(&CFB_FREE.to_le_bytes()); // right sibling
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..124].copy_from_slice(&len.to_le_bytes());
}
