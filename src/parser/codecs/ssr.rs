//! ShadowsocksR share links.
//!
//! Wire form: `ssr://` followed by a URL-safe base64 blob of
//! `server:port:protocol:cipher:obfs:b64(password)` and an optional
//! `/?key=value&...` query whose values are URL-safe base64 as well.

use crate::error::LinkError;
use crate::models::{ProxyDetail, ProxyNode, ProxyType, ShadowsocksRNode};
use crate::utils::base64::{decode_url_safe, encode_url_safe};
use crate::utils::url::url_decode;

use super::{malformed, parse_port, require};
use crate::parser::codec::ProtocolCodec;

pub struct ShadowsocksRCodec;

impl ProtocolCodec for ShadowsocksRCodec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["ssr://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::ShadowsocksR
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let encoded = link
            .strip_prefix("ssr://")
            .ok_or_else(|| malformed("not an ssr link"))?;
        let decoded =
            decode_url_safe(encoded).ok_or_else(|| malformed("undecodable ssr payload"))?;

        // Base info and query are separated by a literal "/?".
        let (base_info, query) = match decoded.split_once("/?") {
            Some((base, query)) => (base, Some(query)),
            None => (decoded.as_str(), None),
        };

        let fields: Vec<&str> = base_info.split(':').collect();
        if fields.len() != 6 {
            return Err(malformed(format!(
                "expected 6 colon-separated fields, got {}",
                fields.len()
            )));
        }
        let server = fields[0];
        let port = parse_port(fields[1])?;
        let protocol = fields[2];
        let cipher = fields[3];
        let obfs = fields[4];
        let password =
            decode_url_safe(fields[5]).ok_or_else(|| malformed("undecodable password"))?;

        let mut obfs_param = None;
        let mut protocol_param = None;
        let mut remarks = None;
        let mut group = None;
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let value = decode_query_value(value);
                match key {
                    "obfsparam" => obfs_param = Some(value),
                    "protoparam" => protocol_param = Some(value),
                    "remarks" => remarks = Some(value),
                    "group" => group = Some(value),
                    _ => {}
                }
            }
        }

        require(server, "server")?;
        require(cipher, "cipher")?;
        require(&password, "password")?;
        require(protocol, "protocol")?;
        require(obfs, "obfs")?;

        let name = match remarks.filter(|r| !r.is_empty()) {
            Some(remarks) => remarks,
            None => format!("{}-{}:{}", protocol, server, port),
        };

        Ok(ProxyNode {
            name,
            server: server.to_string(),
            port,
            detail: ProxyDetail::ShadowsocksR(ShadowsocksRNode {
                cipher: cipher.to_string(),
                password,
                protocol: protocol.to_string(),
                obfs: obfs.to_string(),
                protocol_param: protocol_param.filter(|p| !p.is_empty()),
                obfs_param: obfs_param.filter(|p| !p.is_empty()),
                group: group.filter(|g| !g.is_empty()),
                udp: Some(true),
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let ssr = match &node.detail {
            ProxyDetail::ShadowsocksR(ssr) => ssr,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let mut body = format!(
            "{}:{}:{}:{}:{}:{}",
            node.server,
            node.port,
            ssr.protocol,
            ssr.cipher,
            ssr.obfs,
            encode_url_safe(&ssr.password)
        );

        let mut params = Vec::new();
        if let Some(obfs_param) = &ssr.obfs_param {
            params.push(format!("obfsparam={}", encode_url_safe(obfs_param)));
        }
        if let Some(protocol_param) = &ssr.protocol_param {
            params.push(format!("protoparam={}", encode_url_safe(protocol_param)));
        }
        params.push(format!("remarks={}", encode_url_safe(&node.name)));
        if let Some(group) = &ssr.group {
            params.push(format!("group={}", encode_url_safe(group)));
        }
        if !params.is_empty() {
            body.push_str("/?");
            body.push_str(&params.join("&"));
        }

        Ok(format!("ssr://{}", encode_url_safe(&body)))
    }
}

/// Query values are URL-safe base64; fall back to percent-decoding,
/// then to the raw text.
fn decode_query_value(value: &str) -> String {
    decode_url_safe(value).unwrap_or_else(|| url_decode(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::base64::encode_standard;

    fn codec() -> ShadowsocksRCodec {
        ShadowsocksRCodec
    }

    fn sample_node() -> ProxyNode {
        ProxyNode {
            name: "Test SSR".to_string(),
            server: "example.com".to_string(),
            port: 8388,
            detail: ProxyDetail::ShadowsocksR(ShadowsocksRNode {
                cipher: "aes-256-cfb".to_string(),
                password: "p@ss:word".to_string(),
                protocol: "auth_aes128_md5".to_string(),
                obfs: "tls1.2_ticket_auth".to_string(),
                protocol_param: Some("32".to_string()),
                obfs_param: Some("cdn.example.com".to_string()),
                group: Some("Test Group".to_string()),
                udp: Some(true),
            }),
        }
    }

    #[test]
    fn decode_encode_round_trip_is_field_equal() {
        let node = sample_node();
        let link = codec().encode(&node).unwrap();
        assert!(link.starts_with("ssr://"));
        let decoded = codec().decode(&link).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn decode_without_query_synthesizes_name() {
        let body = format!(
            "example.com:8388:origin:aes-256-cfb:plain:{}",
            encode_url_safe("secret")
        );
        let link = format!("ssr://{}", encode_url_safe(&body));
        let node = codec().decode(&link).unwrap();
        assert_eq!(node.name, "origin-example.com:8388");
        assert_eq!(node.server, "example.com");
        match &node.detail {
            ProxyDetail::ShadowsocksR(ssr) => {
                assert_eq!(ssr.password, "secret");
                assert_eq!(ssr.udp, Some(true));
                assert_eq!(ssr.obfs_param, None);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        // 5 fields: no password.
        let body = "example.com:8388:origin:aes-256-cfb:plain";
        let link = format!("ssr://{}", encode_url_safe(body));
        assert!(matches!(
            codec().decode(&link),
            Err(LinkError::MalformedLink(_))
        ));

        // 7 fields.
        let body = format!(
            "example.com:8388:origin:aes-256-cfb:plain:{}:extra",
            encode_url_safe("secret")
        );
        let link = format!("ssr://{}", encode_url_safe(&body));
        assert!(matches!(
            codec().decode(&link),
            Err(LinkError::MalformedLink(_))
        ));
    }

    #[test]
    fn invalid_port_is_rejected() {
        for port in ["0", "65536", "none"] {
            let body = format!(
                "example.com:{}:origin:aes-256-cfb:plain:{}",
                port,
                encode_url_safe("secret")
            );
            let link = format!("ssr://{}", encode_url_safe(&body));
            assert!(
                matches!(codec().decode(&link), Err(LinkError::MalformedLink(_))),
                "port {} should be rejected",
                port
            );
        }
    }

    #[test]
    fn undecodable_outer_base64_is_rejected() {
        assert!(matches!(
            codec().decode("ssr://!!!not-base64!!!"),
            Err(LinkError::MalformedLink(_))
        ));
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let body = format!(
            "example.com:8388::aes-256-cfb:plain:{}",
            encode_url_safe("secret")
        );
        let link = format!("ssr://{}", encode_url_safe(&body));
        assert!(matches!(
            codec().decode(&link),
            Err(LinkError::MalformedLink(_))
        ));
    }

    #[test]
    fn query_value_falls_back_to_percent_decoding() {
        // "%21%21" is not url-safe base64 of anything readable but is
        // valid percent-encoding.
        let body = format!(
            "example.com:8388:origin:aes-256-cfb:plain:{}/?remarks=name%20one",
            encode_url_safe("secret")
        );
        let link = format!("ssr://{}", encode_url_safe(&body));
        let node = codec().decode(&link).unwrap();
        assert_eq!(node.name, "name one");
    }

    #[test]
    fn padded_password_field_is_accepted() {
        // Some generators keep the trailing '=' padding.
        let padded = encode_standard("hello");
        assert!(padded.ends_with('='));
        let body = format!("example.com:8388:origin:aes-256-cfb:plain:{}", padded);
        let link = format!("ssr://{}", encode_url_safe(&body));
        let node = codec().decode(&link).unwrap();
        match &node.detail {
            ProxyDetail::ShadowsocksR(ssr) => assert_eq!(ssr.password, "hello"),
            other => panic!("wrong variant: {:?}", other),
        }
    }
}
