//! Base64 helpers for the share-link wire formats.
//!
//! Share links in the wild mix standard and URL-safe alphabets and are
//! sloppy about padding, so decoding is indifferent to padding and can
//! normalize either alphabet. Encoding is strict: URL-safe output never
//! carries padding, standard output always does.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

const LENIENT_CONFIG: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_CONFIG);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_CONFIG);
const URL_SAFE_NO_PAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_encode_padding(false),
);

/// Encodes with the standard alphabet, padded.
pub fn encode_standard(input: &str) -> String {
    STANDARD.encode(input)
}

/// Encodes with the URL-safe alphabet, unpadded.
pub fn encode_url_safe(input: &str) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes a standard-alphabet string, any padding accepted.
pub fn decode_standard(input: &str) -> Option<String> {
    let bytes = STANDARD_LENIENT.decode(input).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decodes a URL-safe string, any padding accepted.
pub fn decode_url_safe(input: &str) -> Option<String> {
    let bytes = URL_SAFE_LENIENT.decode(input).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decodes input in either alphabet by normalizing to the standard one
/// first. Subscription blobs are encoded inconsistently across clients,
/// this accepts both.
pub fn decode_any(input: &str) -> Option<String> {
    let normalized = input.replace('-', "+").replace('_', "/");
    decode_standard(&normalized)
}
