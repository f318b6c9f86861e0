use crate::model::Student;
use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::{write::GzEncoder, Compression};
use std::io::Write;

/// Encoded PUT body.
#[derive(Debug, Clone)]
pub struct UploadBody {
    pub bytes: Bytes,
    /// Value for the `Content-Encoding` header, if any.
    pub content_encoding: Option<&'static str>,
}

/// Serialize records to a JSON array, gzip-compressed when `gzip` is set.
pub fn encode_upload(students: &[Student], gzip: bool) -> Result<UploadBody> {
    let json = serde_json::to_vec(students).context("serialize roster")?;
    if !gzip {
        return Ok(UploadBody {
            bytes: Bytes::from(json),
            content_encoding: None,
        });
    }

    let mut encoder = GzEncoder::new(
        Vec::with_capacity((json.len() / 2).max(256)),
        Compression::default(),
    );
    encoder.write_all(&json).context("gzip encoding failed")?;
    let compressed = encoder.finish().context("gzip finalize failed")?;
    Ok(UploadBody {
        bytes: Bytes::from(compressed),
        content_encoding: Some("gzip"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn roster() -> Vec<Student> {
        vec![Student {
            id: "1".into(),
            first_name: "Amy".into(),
            last_name: "Brown".into(),
            email: "amy@example.com".into(),
            ip_address: "10.0.0.2".into(),
        }]
    }

    #[test]
    fn plain_body_is_json_array() {
        let body = encode_upload(&roster(), false).unwrap();
        assert!(body.content_encoding.is_none());
        let v: serde_json::Value = serde_json::from_slice(&body.bytes).unwrap();
        assert_eq!(v[0]["first_name"], "Amy");
    }

    #[test]
    fn gzip_body_decompresses_to_records() {
        let body = encode_upload(&roster(), true).unwrap();
        assert_eq!(body.content_encoding, Some("gzip"));
        let mut json = String::new();
        GzDecoder::new(&body.bytes[..])
            .read_to_string(&mut json)
            .unwrap();
        let back: Vec<Student> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, roster());
    }
}
