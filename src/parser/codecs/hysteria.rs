//! Hysteria v1 and v2 share links.
//!
//! v1: `hysteria://server:port?auth=...&upmbps=...&downmbps=...&peer=sni#name`
//! v2: `hysteria2://password@server:port?up=...&down=...&sni=...&obfs=...#name`
//! (`hy2://` is a common alias for v2).

use url::Url;

use crate::error::LinkError;
use crate::models::{Hysteria2Node, HysteriaNode, ProxyDetail, ProxyNode, ProxyType};
use crate::utils::url::{url_decode, url_encode};

use super::{malformed, require};
use crate::parser::codec::ProtocolCodec;

pub struct HysteriaCodec;

impl ProtocolCodec for HysteriaCodec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["hysteria://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::Hysteria
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let url =
            Url::parse(link).map_err(|e| malformed(format!("invalid hysteria url: {}", e)))?;
        let server = url
            .host_str()
            .ok_or_else(|| malformed("missing server"))?
            .to_string();
        let port = url.port().ok_or_else(|| malformed("missing port"))?;
        if port == 0 {
            return Err(malformed("port out of range: 0"));
        }

        let mut auth = None;
        let mut up = None;
        let mut down = None;
        let mut sni = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "auth" if !value.is_empty() => auth = Some(value.to_string()),
                "upmbps" if !value.is_empty() => up = Some(value.to_string()),
                "downmbps" if !value.is_empty() => down = Some(value.to_string()),
                "peer" | "sni" if !value.is_empty() => sni = Some(value.to_string()),
                _ => {}
            }
        }

        let name = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => url_decode(fragment),
            _ => format!("{} ({})", server, port),
        };

        Ok(ProxyNode {
            name,
            server,
            port,
            detail: ProxyDetail::Hysteria(HysteriaNode {
                auth,
                up,
                down,
                sni,
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let hysteria = match &node.detail {
            ProxyDetail::Hysteria(hysteria) => hysteria,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let mut params = Vec::new();
        if let Some(auth) = &hysteria.auth {
            params.push(format!("auth={}", url_encode(auth)));
        }
        if let Some(up) = &hysteria.up {
            params.push(format!("upmbps={}", url_encode(up)));
        }
        if let Some(down) = &hysteria.down {
            params.push(format!("downmbps={}", url_encode(down)));
        }
        if let Some(sni) = &hysteria.sni {
            params.push(format!("peer={}", url_encode(sni)));
        }

        let mut link = format!("hysteria://{}:{}", node.server, node.port);
        if !params.is_empty() {
            link.push('?');
            link.push_str(&params.join("&"));
        }
        link.push('#');
        link.push_str(&url_encode(&node.name));
        Ok(link)
    }
}

pub struct Hysteria2Codec;

impl ProtocolCodec for Hysteria2Codec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["hysteria2://", "hy2://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::Hysteria2
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let url =
            Url::parse(link).map_err(|e| malformed(format!("invalid hysteria2 url: {}", e)))?;
        let password = url_decode(url.username());
        require(&password, "password")?;
        let server = url
            .host_str()
            .ok_or_else(|| malformed("missing server"))?
            .to_string();
        // Hysteria2 defaults to 443 when the link omits the port.
        let port = url.port().unwrap_or(443);

        let mut up = None;
        let mut down = None;
        let mut sni = None;
        let mut obfs = None;
        let mut obfs_password = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "up" if !value.is_empty() => up = Some(value.to_string()),
                "down" if !value.is_empty() => down = Some(value.to_string()),
                "sni" if !value.is_empty() => sni = Some(value.to_string()),
                "obfs" if !value.is_empty() => obfs = Some(value.to_string()),
                "obfs-password" if !value.is_empty() => obfs_password = Some(value.to_string()),
                _ => {}
            }
        }

        let name = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => url_decode(fragment),
            _ => format!("{} ({})", server, port),
        };

        Ok(ProxyNode {
            name,
            server,
            port,
            detail: ProxyDetail::Hysteria2(Hysteria2Node {
                password,
                up,
                down,
                sni,
                obfs,
                obfs_password,
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let hysteria2 = match &node.detail {
            ProxyDetail::Hysteria2(hysteria2) => hysteria2,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let mut params = Vec::new();
        if let Some(up) = &hysteria2.up {
            params.push(format!("up={}", url_encode(up)));
        }
        if let Some(down) = &hysteria2.down {
            params.push(format!("down={}", url_encode(down)));
        }
        if let Some(sni) = &hysteria2.sni {
            params.push(format!("sni={}", url_encode(sni)));
        }
        if let Some(obfs) = &hysteria2.obfs {
            params.push(format!("obfs={}", url_encode(obfs)));
        }
        if let Some(obfs_password) = &hysteria2.obfs_password {
            params.push(format!("obfs-password={}", url_encode(obfs_password)));
        }

        let mut link = format!(
            "hysteria2://{}@{}:{}",
            url_encode(&hysteria2.password),
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
