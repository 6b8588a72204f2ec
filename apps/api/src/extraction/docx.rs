use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractError;

const DOCUMENT_XML: &str = "word/document.xml";
/// Upper bound on the decompressed main document part (zip-bomb protection).
const MAX_DOCUMENT_XML_BYTES: u64 = 50 * 1024 * 1024;

pub(super) fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::CorruptDocument(format!("DOCX container: {e}")))?;

    let entry = archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| ExtractError::CorruptDocument(format!("{DOCUMENT_XML}: {e}")))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_DOCUMENT_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::CorruptDocument(format!("{DOCUMENT_XML}: {e}")))?;
    if xml.len() as u64 >= MAX_DOCUMENT_XML_BYTES {
        return Err(ExtractError::CorruptDocument(format!(
            "{DOCUMENT_XML} exceeds {MAX_DOCUMENT_XML_BYTES} bytes"
        )));
    }

    document_text(&xml)
}

/// Accumulates body text: one line per top-level paragraph, one line per
/// table with its cells joined by a space.
#[derive(Default)]
struct BodyText {
    lines: Vec<String>,
    paragraph: String,
    cell: String,
    cells: Vec<String>,
    table_depth: usize,
    in_text: bool,
}

impl BodyText {
    fn end_paragraph(&mut self) {
        let paragraph = std::mem::take(&mut self.paragraph);
        if self.table_depth == 0 {
            self.lines.push(paragraph);
            return;
        }
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            return;
        }
        if !self.cell.is_empty() {
            self.cell.push(' ');
        }
        self.cell.push_str(paragraph);
    }

    fn end_cell(&mut self) {
        // Cells of nested tables stay inside the enclosing cell.
        if self.table_depth != 1 {
            return;
        }
        let cell = std::mem::take(&mut self.cell);
        let cell = cell.trim();
        if !cell.is_empty() {
            self.cells.push(cell.to_string());
        }
    }

    fn end_table(&mut self) {
        if self.table_depth == 1 {
            let cells = std::mem::take(&mut self.cells);
            self.lines.push(cells.join(" "));
        }
        self.table_depth = self.table_depth.saturating_sub(1);
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

fn document_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut body = BodyText::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => body.paragraph.clear(),
                b"t" => body.in_text = true,
                b"tbl" => body.table_depth += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" | b"br" => body.paragraph.push(' '),
                // A self-closing paragraph is an empty line.
                b"p" if body.table_depth == 0 => body.lines.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if body.in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::CorruptDocument(format!("{DOCUMENT_XML}: {e}")))?;
                body.paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => body.in_text = false,
                b"p" => body.end_paragraph(),
                b"tc" => body.end_cell(),
                b"tbl" => body.end_table(),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::CorruptDocument(format!("{DOCUMENT_XML}: {e}")));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(body.finish())
}
