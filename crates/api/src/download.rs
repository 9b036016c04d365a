//! Attachment responses for stored files.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::storage::{mime_for, FileStorage};

/// Build a `Content-Disposition: attachment` value carrying both an ASCII
/// fallback `filename` and the RFC 5987 `filename*` form.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        encode_rfc5987(file_name)
    )
}

/// Percent-encode everything outside RFC 5987 `attr-char`.
fn encode_rfc5987(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(
                byte,
                b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
            );
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Stream a stored file back as an attachment named `download_name`.
///
/// The content type is guessed from `download_name`, falling back to the
/// stored path's extension.
pub async fn attachment(
    storage: &FileStorage,
    relative_path: &str,
    download_name: &str,
    mime_type: Option<&str>,
) -> AppResult<Response> {
    let (file, size) = storage.open(relative_path).await?;
    let content_type = mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| match mime_for(download_name) {
            "application/octet-stream" => mime_for(relative_path),
            m => m,
        })
        .to_string();

    let stream = ReaderStream::new(file);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, content_disposition(download_name))
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(format!("Failed to build download response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_name_is_kept() {
        assert_eq!(
            content_disposition("plan v2.pdf"),
            "attachment; filename=\"plan v2.pdf\"; filename*=UTF-8''plan%20v2.pdf"
        );
    }

    #[test]
    fn non_ascii_name_is_encoded() {
        let value = content_disposition("合同.pdf");
        assert!(value.contains("filename=\"__.pdf\""), "{value}");
        assert!(value.ends_with("filename*=UTF-8''%E5%90%88%E5%90%8C.pdf"), "{value}");
    }

    #[test]
    fn quotes_cannot_break_the_header() {
        let value = content_disposition("a\"b.txt");
        assert!(value.starts_with("attachment; filename=\"a_b.txt\""));
        assert!(value.contains("a%22b.txt"));
    }
}
