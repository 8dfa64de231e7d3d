//! Shadowsocks share links.
//!
//! Decodes both SIP002 (`ss://b64(method:password)@server:port`) and
//! the legacy fully-base64 form (`ss://b64(method:password@server:port)`).
//! Encoding always emits SIP002.

use crate::error::LinkError;
use crate::models::{ProxyDetail, ProxyNode, ProxyType, ShadowsocksNode};
use crate::utils::base64::{decode_url_safe, encode_url_safe};
use crate::utils::url::{url_decode, url_encode};

use super::{malformed, parse_port, require};
use crate::parser::codec::ProtocolCodec;

pub struct ShadowsocksCodec;

impl ProtocolCodec for ShadowsocksCodec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["ss://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::Shadowsocks
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let mut content = link
            .strip_prefix("ss://")
            .ok_or_else(|| malformed("not an ss link"))?
            .replace("/?", "?");

        let mut name = String::new();
        if let Some(hash_pos) = content.find('#') {
            name = url_decode(&content[hash_pos + 1..]);
            content.truncate(hash_pos);
        }

        let mut plugin = None;
        let mut plugin_opts = None;
        if let Some(query_pos) = content.find('?') {
            let query = content[query_pos + 1..].to_string();
            content.truncate(query_pos);
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                if key == "plugin" && !value.is_empty() {
                    match value.split_once(';') {
                        Some((head, rest)) => {
                            plugin = Some(head.to_string());
                            plugin_opts = Some(rest.to_string());
                        }
                        None => plugin = Some(value.to_string()),
                    }
                }
            }
        }

        let (method, password, server, port) = if let Some((userinfo, host_part)) =
            content.split_once('@')
        {
            // SIP002: base64 userinfo, with a plain-text fallback some
            // generators use.
            let secret = decode_url_safe(userinfo)
                .unwrap_or_else(|| url_decode(userinfo));
            let (method, password) = secret
                .split_once(':')
                .ok_or_else(|| malformed("userinfo is not method:password"))?;
            let (server, port_str) = host_part
                .rsplit_once(':')
                .ok_or_else(|| malformed("missing port"))?;
            (
                method.to_string(),
                password.to_string(),
                server.to_string(),
                parse_port(port_str)?,
            )
        } else {
            // Legacy: the whole body is base64.
            let decoded =
                decode_url_safe(&content).ok_or_else(|| malformed("undecodable ss payload"))?;
            let (secret, host_part) = decoded
                .split_once('@')
                .ok_or_else(|| malformed("legacy payload missing @"))?;
            let (method, password) = secret
                .split_once(':')
                .ok_or_else(|| malformed("payload is not method:password"))?;
            let (server, port_str) = host_part
                .rsplit_once(':')
                .ok_or_else(|| malformed("missing port"))?;
            (
                method.to_string(),
                password.to_string(),
                server.to_string(),
                parse_port(port_str)?,
            )
        };

        require(&server, "server")?;
        require(&method, "cipher")?;
        require(&password, "password")?;

        if name.is_empty() {
            name = format!("{} ({})", server, port);
        }

        Ok(ProxyNode {
            name,
            server,
            port,
            detail: ProxyDetail::Shadowsocks(ShadowsocksNode {
                cipher: method,
                password,
                udp: None,
                plugin,
                plugin_opts,
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let ss = match &node.detail {
            ProxyDetail::Shadowsocks(ss) => ss,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let userinfo = encode_url_safe(&format!("{}:{}", ss.cipher, ss.password));
        let mut link = format!("ss://{}@{}:{}", userinfo, node.server, node.port);

        if let Some(plugin) = &ss.plugin {
            let plugin_value = match &ss.plugin_opts {
                Some(opts) => format!("{};{}", plugin, opts),
                None => plugin.clone(),
            };
            link.push_str(&format!("/?plugin={}", url_encode(&plugin_value)));
        }

        link.push('#');
        link.push_str(&url_encode(&node.name));
        Ok(link)
    }
}
