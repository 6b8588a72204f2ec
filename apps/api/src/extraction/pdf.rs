use super::ExtractError;

/// Extracts page text in document order, one newline between pages.
pub(super) fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::CorruptDocument(format!("PDF: {e}")))?;

    let joined = pages
        .iter()
        .map(|page| page.trim_matches('\n'))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(clean_pdf_artifacts(&joined))
}

/// Normalizes characters that PDF text layers (LaTeX output in particular)
/// tend to produce: odd spaces, typographic quotes and dashes, repeated
/// blanks. Line structure is left alone.
pub(super) fn clean_pdf_artifacts(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;

    for c in text.chars() {
        let mapped = match c {
            '\u{00a0}' | '\u{2009}' | '\u{202f}' => Some(' '),
            '\u{200b}' | '\u{feff}' => None,
            '\u{201c}' | '\u{201d}' => Some('"'),
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{2013}' | '\u{2014}' => Some('-'),
            other => Some(other),
        };
        let Some(mapped) = mapped else { continue };

        if mapped == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(mapped);
    }

    out
}
