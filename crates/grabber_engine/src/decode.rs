use std::sync::OnceLock;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use grabber_logging::grabber_warn;
use regex::bytes::Regex;

/// How far into the document a `<meta charset>` declaration is looked for.
const META_SNIFF_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode page bytes as {encoding}")]
    Malformed { encoding: String },
}

/// Decode a page body using: BOM -> Content-Type charset -> meta charset -> chardetng.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, DecodeError> {
    decode_with(bytes, pick_encoding(bytes, content_type))
}

/// Like [`decode_page`], but malformed input degrades to lossy UTF-8 instead of failing.
pub fn decode_page_lossy(bytes: &[u8], content_type: Option<&str>) -> DecodedPage {
    match decode_page(bytes, content_type) {
        Ok(page) => page,
        Err(err) => {
            grabber_warn!("{err}; falling back to lossy UTF-8");
            DecodedPage {
                html: String::from_utf8_lossy(bytes).into_owned(),
                encoding_label: "UTF-8".to_string(),
            }
        }
    }
}

fn pick_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if let Some(enc) = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return enc;
    }
    if let Some(enc) = sniff_meta_charset(bytes) {
        return enc;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches(&[' ', '"', '\''][..]).to_string())
    })
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    static META_CHARSET: OnceLock<Option<Regex>> = OnceLock::new();
    let re = META_CHARSET
        .get_or_init(|| Regex::new(r#"(?i-u)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_\-]+)"#).ok())
        .as_ref()?;
    let head = &bytes[..bytes.len().min(META_SNIFF_LIMIT)];
    let label = re.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedPage, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: enc.name().to_string(),
        });
    }
    Ok(DecodedPage {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}
