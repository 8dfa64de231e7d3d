//! VMess share links: `vmess://` + base64 of a JSON object.
//!
//! The ecosystem serializes `port` and `aid` as strings even though
//! they are numbers; encoding keeps that quirk so re-encoded links stay
//! byte-compatible with common clients. Decoding accepts either form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LinkError;
use crate::models::{
    GrpcOptions, H2Options, ProxyDetail, ProxyNode, ProxyType, VMessNode, WsOptions,
};
use crate::utils::base64::{decode_any, encode_standard};

use super::{malformed, parse_port};
use crate::parser::codec::ProtocolCodec;

/// The JSON payload of a `vmess://` link, fields in the order clients
/// emit them.
#[derive(Debug, Serialize, Deserialize)]
struct VmessShareLink {
    #[serde(default)]
    v: serde_json::Value,
    #[serde(default)]
    ps: String,
    add: String,
    port: serde_json::Value,
    id: String,
    #[serde(default)]
    aid: serde_json::Value,
    #[serde(default, alias = "security")]
    scy: Option<String>,
    #[serde(default)]
    net: Option<String>,
    #[serde(default, rename = "type")]
    header_type: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    tls: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sni: Option<String>,
}

/// Reads a JSON field that may be a number or a numeric string.
fn value_as_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

pub struct VmessCodec;

impl ProtocolCodec for VmessCodec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["vmess://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::VMess
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let encoded = link
            .strip_prefix("vmess://")
            .ok_or_else(|| malformed("not a vmess link"))?;
        let decoded =
            decode_any(encoded).ok_or_else(|| malformed("undecodable vmess payload"))?;
        let payload: VmessShareLink = serde_json::from_str(&decoded)
            .map_err(|e| malformed(format!("vmess payload is not valid JSON: {}", e)))?;

        let port = parse_port(&value_as_string(&payload.port))?;
        let alter_id = value_as_string(&payload.aid).parse::<u16>().unwrap_or(0);

        if payload.add.is_empty() {
            return Err(malformed("missing server"));
        }
        Uuid::parse_str(&payload.id).map_err(|_| malformed("invalid uuid"))?;

        let network = payload
            .net
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "tcp".to_string());
        let host = payload.host.filter(|h| !h.is_empty());
        let path = payload.path.filter(|p| !p.is_empty());

        let mut ws_opts = None;
        let mut h2_opts = None;
        let mut grpc_opts = None;
        match network.as_str() {
            "ws" => {
                ws_opts = Some(WsOptions {
                    path: path.clone(),
                    host: host.clone(),
                })
            }
            "h2" => {
                h2_opts = Some(H2Options {
                    path: path.clone(),
                    host: host.clone(),
                })
            }
            "grpc" => {
                grpc_opts = Some(GrpcOptions {
                    service_name: path.clone(),
                })
            }
            _ => {}
        }

        let name = if payload.ps.is_empty() {
            format!("{} ({})", payload.add, port)
        } else {
            payload.ps
        };

        Ok(ProxyNode {
            name,
            server: payload.add,
            port,
            detail: ProxyDetail::VMess(VMessNode {
                uuid: payload.id,
                alter_id,
                cipher: payload.scy.filter(|s| !s.is_empty()).unwrap_or_else(|| "auto".to_string()),
                network,
                tls: payload.tls.as_deref() == Some("tls"),
                sni: payload.sni.filter(|s| !s.is_empty()),
                ws_opts,
                h2_opts,
                grpc_opts,
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let vmess = match &node.detail {
            ProxyDetail::VMess(vmess) => vmess,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let (host, path) = match vmess.network.as_str() {
            "ws" => match &vmess.ws_opts {
                Some(ws) => (ws.host.clone(), ws.path.clone()),
                None => (None, None),
            },
            "h2" => match &vmess.h2_opts {
                Some(h2) => (h2.host.clone(), h2.path.clone()),
                None => (None, None),
            },
            "grpc" => match &vmess.grpc_opts {
                Some(grpc) => (None, grpc.service_name.clone()),
                None => (None, None),
            },
            _ => (None, None),
        };

        let payload = VmessShareLink {
            v: serde_json::Value::String("2".to_string()),
            ps: node.name.clone(),
            add: node.server.clone(),
            port: serde_json::Value::String(node.port.to_string()),
            id: vmess.uuid.clone(),
            aid: serde_json::Value::String(vmess.alter_id.to_string()),
            scy: Some(vmess.cipher.clone()),
            net: Some(vmess.network.clone()),
            header_type: Some("none".to_string()),
            host: Some(host.unwrap_or_default()),
            path: Some(path.unwrap_or_default()),
            tls: Some(if vmess.tls { "tls".to_string() } else { String::new() }),
            sni: vmess.sni.clone(),
        };

        let json = serde_json::to_string(&payload)
            .map_err(|e| malformed(format!("vmess serialization failed: {}", e)))?;
        Ok(format!("vmess://{}", encode_standard(&json)))
    }
}
