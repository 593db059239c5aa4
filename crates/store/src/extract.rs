use std::path::Path;
use std::process::Command;

/// Best-effort text extraction result.
///
/// Extraction never fails the caller: a document that cannot be read yields
/// empty text plus a warning describing what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub warning: Option<String>,
}

impl ExtractedText {
    fn ok(text: String) -> Self {
        Self {
            text,
            warning: None,
        }
    }

    fn degraded(text: String, warning: impl Into<String>) -> Self {
        Self {
            text,
            warning: Some(warning.into()),
        }
    }
}

/// Extract plain text from raw document bytes.
///
/// PDFs are delegated to the external `pdftotext` binary; text-like formats
/// are decoded as UTF-8 (lossy). Unknown binary formats extract to empty
/// text with a warning rather than an error.
pub fn extract_text(filename: &str, bytes: &[u8]) -> ExtractedText {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => extract_pdf(filename, bytes),
        Some("txt" | "md" | "csv") | None => ExtractedText::ok(decode_utf8(bytes)),
        Some(other) => {
            // Heuristic: text-like payloads in unrecognized extensions still
            // get decoded; real binary content is skipped.
            if looks_like_text(bytes) {
                ExtractedText::ok(decode_utf8(bytes))
            } else {
                log::warn!("Cannot extract text from '{filename}' (.{other})");
                ExtractedText::degraded(
                    String::new(),
                    format!("unsupported format '.{other}', document skipped"),
                )
            }
        }
    }
}

fn extract_pdf(filename: &str, bytes: &[u8]) -> ExtractedText {
    let temp_file = std::env::temp_dir().join(format!(
        "dossier_extract_{}_{}.pdf",
        std::process::id(),
        sanitize_for_path(filename)
    ));

    if let Err(err) = std::fs::write(&temp_file, bytes) {
        return ExtractedText::degraded(String::new(), format!("failed to stage PDF: {err}"));
    }

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(&temp_file)
        .arg("-")
        .output();
    let _ = std::fs::remove_file(&temp_file);

    match output {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout).to_string();
            if text.trim().is_empty() {
                log::warn!("pdftotext produced no text for '{filename}'");
                ExtractedText::degraded(String::new(), "PDF contained no extractable text")
            } else {
                log::debug!("Extracted {} chars from '{filename}'", text.chars().count());
                ExtractedText::ok(text)
            }
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            log::warn!("pdftotext failed for '{filename}': {stderr}");
            // Partial stdout is still better than nothing.
            let partial = String::from_utf8_lossy(&output.stdout).to_string();
            ExtractedText::degraded(partial, format!("pdftotext failed: {stderr}"))
        }
        Err(err) => {
            log::warn!("failed to run pdftotext: {err}");
            ExtractedText::degraded(
                String::new(),
                format!("pdftotext not runnable: {err} (is poppler installed?)"),
            )
        }
    }
}

fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(512)];
    !sample.contains(&0u8)
}

fn sanitize_for_path(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
