//! Collapse provider response bodies into canonical content.
//!
//! A [`ResponseBody`] is checked in a fixed order and the first matching
//! shape wins:
//!
//! 1. materialized binary: used as is
//! 2. byte stream: every chunk is collected
//! 3. text value: its UTF-8 bytes
//!
//! Anything else (a structured JSON value) is serialized and flagged
//! `lossy`, so a later binary parse failure can say where the bytes came from.

use futures::StreamExt;

use crate::error::NormalizeError;
use crate::models::{NormalizedContent, ResponseBody, ResponseEncoding};

/// Canonical byte sequence of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub bytes: Vec<u8>,
    /// Set when the bytes came from the serialization fallback.
    pub lossy: bool,
}

/// Collect a response body into a single byte buffer.
///
/// `limit`, when set, bounds the number of bytes accepted; streams are
/// abandoned as soon as they cross it.
pub async fn normalize(body: ResponseBody, limit: Option<u64>) -> Result<Normalized, NormalizeError> {
    let normalized = match body {
        ResponseBody::Binary(bytes) => {
            check_limit(bytes.len(), limit)?;
            Normalized {
                bytes: bytes.to_vec(),
                lossy: false,
            }
        }
        ResponseBody::Stream(mut stream) => {
            let mut buf = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                check_limit(buf.len() + chunk.len(), limit)?;
                buf.extend_from_slice(&chunk);
            }
            Normalized {
                bytes: buf,
                lossy: false,
            }
        }
        ResponseBody::Text(text) => {
            check_limit(text.len(), limit)?;
            Normalized {
                bytes: text.into_bytes(),
                lossy: false,
            }
        }
        ResponseBody::Value(value) => {
            let bytes = match value {
                serde_json::Value::String(s) => s.into_bytes(),
                other => serde_json::to_vec(&other)?,
            };
            check_limit(bytes.len(), limit)?;
            Normalized { bytes, lossy: true }
        }
    };
    Ok(normalized)
}

fn check_limit(len: usize, limit: Option<u64>) -> Result<(), NormalizeError> {
    match limit {
        Some(limit) if len as u64 > limit => Err(NormalizeError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Pick the representation an extractor receives for a given encoding.
///
/// Binary media stays as bytes; every text-shaped encoding is decoded as
/// UTF-8, replacing invalid sequences.
pub fn into_content(normalized: Normalized, encoding: ResponseEncoding) -> NormalizedContent {
    match encoding {
        ResponseEncoding::MediaBinary => NormalizedContent::Bytes(normalized.bytes),
        ResponseEncoding::ExportText
        | ResponseEncoding::ExportStructured
        | ResponseEncoding::MediaText => match String::from_utf8(normalized.bytes) {
            Ok(s) => NormalizedContent::Text(s),
            Err(e) => NormalizedContent::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        },
    }
}
