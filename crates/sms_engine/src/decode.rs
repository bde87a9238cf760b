use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSheet {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode raw sheet bytes into UTF-8 using: BOM -> strict UTF-8 -> chardetng fallback.
///
/// Spreadsheet exports are frequently Windows-1252 when saved from older
/// office suites, hence the detector fallback.
pub fn decode_sheet(bytes: &[u8]) -> Result<DecodedSheet, DecodeError> {
    // 1) BOM aware decode; the BOM itself is stripped.
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    // 2) Plain UTF-8
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(DecodedSheet {
            text: text.to_string(),
            encoding_label: UTF_8.name().to_string(),
        });
    }

    // 3) chardetng detection
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedSheet, DecodeError> {
    let (text, had_errors) = enc.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedSheet {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}
