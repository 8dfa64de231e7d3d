//! Trojan share links.
//!
//! Wire form: `trojan://password@server:port?sni=...&alpn=h2,http/1.1
//! &type=ws&path=...&host=...#name`. Trojan always runs over TLS.

use url::Url;

use crate::error::LinkError;
use crate::models::{ProxyDetail, ProxyNode, ProxyType, TrojanNode, WsOptions};
use crate::utils::url::{url_decode, url_encode};

use super::{malformed, require};
use crate::parser::codec::ProtocolCodec;

pub struct TrojanCodec;

impl ProtocolCodec for TrojanCodec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["trojan://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::Trojan
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let url = Url::parse(link).map_err(|e| malformed(format!("invalid trojan url: {}", e)))?;

        let password = url_decode(url.username());
        require(&password, "password")?;
        let server = url
            .host_str()
            .ok_or_else(|| malformed("missing server"))?
            .to_string();
        let port = url.port().ok_or_else(|| malformed("missing port"))?;
        if port == 0 {
            return Err(malformed("port out of range: 0"));
        }

        let mut sni = None;
        let mut alpn = Vec::new();
        let mut network = "tcp".to_string();
        let mut host = None;
        let mut path = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                // Older generators use "peer" for the SNI.
                "sni" | "peer" if !value.is_empty() => sni = Some(value.to_string()),
                "alpn" if !value.is_empty() => {
                    alpn = value.split(',').map(|s| s.to_string()).collect()
                }
                "type" if !value.is_empty() => network = value.to_string(),
                "host" if !value.is_empty() => host = Some(value.to_string()),
                "path" if !value.is_empty() => path = Some(value.to_string()),
                _ => {}
            }
        }

        let ws_opts = (network == "ws").then(|| WsOptions { path, host });

        let name = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => url_decode(fragment),
            _ => format!("{} ({})", server, port),
        };

        Ok(ProxyNode {
            name,
            server,
            port,
            detail: ProxyDetail::Trojan(TrojanNode {
                password,
                tls: true,
                sni,
                alpn,
                ws_opts,
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let trojan = match &node.detail {
            ProxyDetail::Trojan(trojan) => trojan,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let mut params = Vec::new();
        if let Some(sni) = &trojan.sni {
            params.push(format!("sni={}", url_encode(sni)));
        }
        if !trojan.alpn.is_empty() {
            params.push(format!("alpn={}", url_encode(&trojan.alpn.join(","))));
        }
        if let Some(ws) = &trojan.ws_opts {
            params.push("type=ws".to_string());
            if let Some(host) = &ws.host {
                params.push(format!("host={}", url_encode(host)));
            }
            if let Some(path) = &ws.path {
                params.push(format!("path={}", url_encode(path)));
            }
        }

        let mut link = format!(
            "trojan://{}@{}:{}",
            url_encode(&trojan.password),
            node.server,
            node.port
        );
        if !params.is_empty() {
            link.push('?');
            link.push_str(&params.join("&"));
        }
        link.push('#');
        link.push_str(&url_encode(&node.name));
        Ok(link)
    }
}
