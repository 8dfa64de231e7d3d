//! Percent-encoding helpers.

/// Percent-encodes a string.
pub fn url_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Percent-decodes a string, returning the input unchanged if it is not
/// valid percent-encoding.
pub fn url_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let original = "Node #1 香港";
        assert_eq!(url_decode(&url_encode(original)), original);
    }

    #[test]
    fn decode_leaves_plain_text_alone() {
        assert_eq!(url_decode("node1"), "node1");
    }
}
