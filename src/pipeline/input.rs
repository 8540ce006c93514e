//! Upload intake: decode the base64 `fileData` field and validate the PDF
//! signature.
//!
//! Uploads travel as base64 inside a JSON body. Decoding happens here, before
//! anything touches the PDF engine, so oversize or non-PDF payloads are
//! rejected with a meaningful error instead of an engine failure.

use crate::error::Pdf2CardsError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// The 4-byte signature every PDF starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// True iff `bytes` begins with `%PDF`.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Fail with [`Pdf2CardsError::InvalidFormat`] unless `bytes` is a PDF.
pub fn ensure_pdf(bytes: &[u8]) -> Result<(), Pdf2CardsError> {
    if is_pdf(bytes) {
        Ok(())
    } else {
        Err(Pdf2CardsError::InvalidFormat {
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}

/// Upper bound on the base64 length of a payload of `max_bytes`.
pub fn encoded_len_limit(max_bytes: usize) -> usize {
    max_bytes.div_ceil(3).saturating_mul(4)
}

/// Decode an uploaded file.
///
/// Accepts a bare base64 string or a `data:<mime>;base64,` URL as produced by
/// `FileReader.readAsDataURL`. Embedded whitespace and line breaks are
/// ignored.
pub fn decode_upload(file_data: &str, max_bytes: usize) -> Result<Vec<u8>, Pdf2CardsError> {
    let payload = strip_data_url(file_data.trim());

    // Cheap pre-check so a huge body is refused before allocating the decode.
    let significant = payload.bytes().filter(|b| !b.is_ascii_whitespace()).count();
    if significant > encoded_len_limit(max_bytes) {
        return Err(Pdf2CardsError::PayloadTooLarge {
            size: significant / 4 * 3,
            limit: max_bytes,
        });
    }

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Pdf2CardsError::InvalidEncoding {
            detail: e.to_string(),
        })?;

    if bytes.len() > max_bytes {
        return Err(Pdf2CardsError::PayloadTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    debug!("Decoded upload: {} bytes", bytes.len());
    Ok(bytes)
}

fn strip_data_url(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some(idx) = value.find(";base64,") {
            return &value[idx + ";base64,".len()..];
        }
    }
    value
}
