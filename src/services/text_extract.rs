use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type for '{filename}': {content_type}")]
    Unsupported {
        filename: String,
        content_type: String,
    },

    #[error("Failed to parse '{filename}': {reason}")]
    Malformed { filename: String, reason: String },

    #[error("Text extraction timed out after {secs}s for '{filename}'")]
    TimedOut { filename: String, secs: u64 },

    #[error("Text extraction task failed for '{filename}': {reason}")]
    Task { filename: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Pdf,
    Docx,
    Spreadsheet,
    Csv,
    PlainText,
}

impl Format {
    fn detect(content_type: &str, filename: &str) -> Option<Self> {
        let by_mime = match content_type {
            "application/pdf" => Some(Format::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Format::Docx)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Some(Format::Spreadsheet),
            "text/csv" => Some(Format::Csv),
            "text/plain" | "text/markdown" => Some(Format::PlainText),
            _ => None,
        };

        by_mime.or_else(|| match extension_from_filename(filename)?.as_str() {
            "pdf" => Some(Format::Pdf),
            "docx" => Some(Format::Docx),
            "xlsx" | "xls" => Some(Format::Spreadsheet),
            "csv" => Some(Format::Csv),
            "txt" | "md" => Some(Format::PlainText),
            _ => None,
        })
    }

    fn is_cpu_heavy(self) -> bool {
        matches!(self, Format::Pdf | Format::Docx | Format::Spreadsheet)
    }
}

/// Check if a file is supported by MIME type or extension.
pub fn is_supported(content_type: &str, filename: &str) -> bool {
    Format::detect(content_type, filename).is_some()
}

/// Extract the text of each page of a document.
///
/// PDFs yield one entry per page and spreadsheets one per sheet; every other
/// format is a single page. Pages without text come back as empty strings.
/// PDF, DOCX and spreadsheet parsing runs on the blocking pool, bounded by
/// `timeout`.
pub async fn extract_pages(
    bytes: &[u8],
    content_type: &str,
    filename: &str,
    timeout: Duration,
) -> Result<Vec<String>, ExtractError> {
    let format = Format::detect(content_type, filename).ok_or_else(|| ExtractError::Unsupported {
        filename: filename.to_string(),
        content_type: content_type.to_string(),
    })?;

    if !format.is_cpu_heavy() {
        return extract_pages_sync(bytes, format, filename);
    }

    let bytes = bytes.to_vec();
    let fname = filename.to_string();

    tracing::debug!("extract_pages: blocking extraction for '{fname}' ({format:?}, {} bytes)", bytes.len());

    let handle = tokio::task::spawn_blocking(move || extract_pages_sync(&bytes, format, &fname));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ExtractError::Task {
            filename: filename.to_string(),
            reason: join_err.to_string(),
        }),
        Err(_) => Err(ExtractError::TimedOut {
            filename: filename.to_string(),
            secs: timeout.as_secs(),
        }),
    }
}

fn extract_pages_sync(bytes: &[u8], format: Format, filename: &str) -> Result<Vec<String>, ExtractError> {
    let malformed = |reason: String| ExtractError::Malformed {
        filename: filename.to_string(),
        reason,
    };

    match format {
        Format::Pdf => extract_pdf(bytes).map_err(malformed),
        Format::Docx => extract_docx(bytes).map(|t| vec![t]).map_err(malformed),
        Format::Spreadsheet => extract_spreadsheet(bytes).map_err(malformed),
        Format::Csv => extract_csv(bytes).map(|t| vec![t]).map_err(malformed),
        Format::PlainText => String::from_utf8(bytes.to_vec())
            .map(|t| vec![t])
            .map_err(|_| malformed("file is not valid UTF-8 text".to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Vec<String>, String> {
    // pdftotext (poppler) is faster and copes with more layouts than pdf_extract
    match extract_pdf_pdftotext(bytes) {
        Ok(pages) if pages.iter().any(|p| !p.trim().is_empty()) => {
            tracing::debug!("PDF extracted via pdftotext ({} pages)", pages.len());
            return Ok(pages);
        }
        Ok(_) => tracing::warn!("pdftotext returned no text, falling back to pdf_extract"),
        Err(e) => tracing::warn!("pdftotext unavailable or failed ({e:#}), falling back to pdf_extract"),
    }

    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())
}

fn extract_pdf_pdftotext(bytes: &[u8]) -> anyhow::Result<Vec<String>> {
    use anyhow::Context;
    use std::io::Write;
    use std::process::Command;

    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write PDF to temp file")?;
    tmp.flush()?;

    let output = Command::new("pdftotext")
        .arg(tmp.path())
        .arg("-")
        .output()
        .context("Failed to run pdftotext")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pdftotext exited with {}: {stderr}", output.status);
    }

    let text = String::from_utf8(output.stdout).context("pdftotext output is not valid UTF-8")?;
    Ok(split_form_feeds(&text))
}

/// pdftotext ends every page with a form feed.
fn split_form_feeds(text: &str) -> Vec<String> {
    let body = text.strip_suffix('\u{c}').unwrap_or(text);
    if body.is_empty() {
        return Vec::new();
    }
    body.split('\u{c}').map(str::to_string).collect()
}

fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let doc = docx_rs::read_docx(bytes).map_err(|e| e.to_string())?;

    let mut text = String::new();
    for child in &doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(p) => {
                push_paragraph(p, &mut text);
                text.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    for cell in &tr.cells {
                        let docx_rs::TableRowChild::TableCell(tc) = cell;
                        for content in &tc.children {
                            if let docx_rs::TableCellContent::Paragraph(p) = content {
                                push_paragraph(p, &mut text);
                                text.push('\t');
                            }
                        }
                    }
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    Ok(text)
}

fn push_paragraph(p: &docx_rs::Paragraph, out: &mut String) {
    for child in &p.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let docx_rs::RunChild::Text(t) = rc {
                    out.push_str(&t.text);
                }
            }
        }
    }
}

fn extract_spreadsheet(bytes: &[u8]) -> Result<Vec<String>, String> {
    use calamine::{Reader, open_workbook_auto_from_rs};
    use std::io::Cursor;

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let mut pages = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let mut page = String::new();
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                for row in range.rows() {
                    let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
                    page.push_str(&cells.join("\t"));
                    page.push('\n');
                }
            }
            Err(e) => tracing::warn!("Skipping unreadable sheet '{name}': {e}"),
        }
        pages.push(page);
    }

    Ok(pages)
}

fn extract_csv(bytes: &[u8]) -> Result<String, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(bytes);

    let mut text = String::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        text.push_str(&record.iter().collect::<Vec<_>>().join(" "));
        text.push('\n');
    }

    Ok(text)
}

fn extension_from_filename(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase())
}
