//! Batch decoding of multi-line share-link input and base64
//! subscription bodies.

use log::debug;

use crate::error::LinkError;
use crate::models::{BatchOutcome, ParseFailure};
use crate::utils::base64::decode_any;

use super::codec::CodecRegistry;

/// Options for one batch decode run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Strict mode records lines with an unknown prefix as failures;
    /// lenient mode skips them silently (they still count in `total`).
    pub strict: bool,
    /// Stop decoding once this many nodes were accepted.
    pub max_nodes: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            strict: true,
            max_nodes: None,
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

/// Decodes every non-blank, non-comment line of `text`, dispatching by
/// protocol prefix. Per-line failures are collected, never raised.
pub fn decode_batch(registry: &CodecRegistry, text: &str, options: &BatchOptions) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        if let Some(cap) = options.max_nodes {
            if outcome.nodes.len() >= cap {
                debug!("node cap {} reached, stopping batch decode", cap);
                break;
            }
        }
        outcome.total += 1;

        match registry.resolve(line) {
            Some(codec) => match codec.decode(line) {
                Ok(node) => {
                    outcome.success += 1;
                    outcome.nodes.push(node);
                }
                Err(error) => {
                    outcome.failed += 1;
                    outcome.failures.push(ParseFailure::new(error.to_string(), line));
                }
            },
            None if options.strict => {
                outcome.failed += 1;
                outcome
                    .failures
                    .push(ParseFailure::new("unsupported protocol", line));
            }
            None => {}
        }
    }

    debug!(
        "batch decode: {} lines, {} nodes, {} failed",
        outcome.total, outcome.success, outcome.failed
    );
    outcome
}

/// Decodes a base64-encoded subscription body, then batch-decodes the
/// contained link list. Whitespace inside the blob is tolerated.
pub fn parse_base64_subscription(
    registry: &CodecRegistry,
    blob: &str,
    options: &BatchOptions,
) -> Result<BatchOutcome, LinkError> {
    let compact: String = blob.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = decode_any(&compact).ok_or_else(|| {
        LinkError::MalformedLink("subscription body is not valid base64".to_string())
    })?;
    Ok(decode_batch(registry, &decoded, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::base64::{encode_standard, encode_url_safe};

    fn ssr_link(server: &str) -> String {
        let body = format!(
            "{}:8388:auth_aes128_md5:aes-256-cfb:tls1.2_ticket_auth:{}",
            server,
            encode_url_safe("secret")
        );
        format!("ssr://{}", encode_url_safe(&body))
    }

    #[test]
    fn valid_and_invalid_lines_are_reconciled() {
        let registry = CodecRegistry::with_defaults();
        let text = format!(
            "# comment\n\n{}\nwireguard://unsupported\n// another comment\n{}\nssr://%%%bad\n",
            ssr_link("a.example.com"),
            ssr_link("b.example.com")
        );
        let outcome = decode_batch(&registry, &text, &BatchOptions::default());
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.nodes.len(), 2);
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.success + outcome.failed <= outcome.total);
    }

    #[test]
    fn lenient_mode_skips_unsupported_lines_silently() {
        let registry = CodecRegistry::with_defaults();
        let text = format!("{}\nwireguard://unsupported\n", ssr_link("a.example.com"));
        let options = BatchOptions {
            strict: false,
            ..Default::default()
        };
        let outcome = decode_batch(&registry, &text, &options);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.success, 1);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn max_nodes_bounds_the_loop() {
        let registry = CodecRegistry::with_defaults();
        let text = format!(
            "{}\n{}\n{}\n",
            ssr_link("a.example.com"),
            ssr_link("b.example.com"),
            ssr_link("c.example.com")
        );
        let options = BatchOptions {
            max_nodes: Some(2),
            ..Default::default()
        };
        let outcome = decode_batch(&registry, &text, &options);
        assert_eq!(outcome.nodes.len(), 2);
        assert_eq!(outcome.success, 2);
    }

    #[test]
    fn base64_subscription_of_two_links_yields_two_nodes() {
        let registry = CodecRegistry::with_defaults();
        let plain = format!("{}\n{}", ssr_link("a.example.com"), ssr_link("b.example.com"));
        let blob = encode_standard(&plain);
        let outcome =
            parse_base64_subscription(&registry, &blob, &BatchOptions::default()).unwrap();
        assert_eq!(outcome.nodes.len(), 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.nodes[0].server, "a.example.com");
        assert_eq!(outcome.nodes[1].server, "b.example.com");
    }

    #[test]
    fn undecodable_blob_is_a_malformed_link_error() {
        let registry = CodecRegistry::with_defaults();
        let result =
            parse_base64_subscription(&registry, "!!! not base64 !!!", &BatchOptions::default());
        assert!(matches!(result, Err(LinkError::MalformedLink(_))));
    }
}
