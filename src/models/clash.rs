//! Clash proxy entry records.
//!
//! One explicit record type per protocol, with the exact field names
//! Clash uses on the wire. The same records serve both directions:
//! the converter serializes them into a `proxies` list and the
//! extractor deserializes document entries back out of one.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::LinkError;
use crate::models::proxy::{
    GrpcOptions, H2Options, Hysteria2Node, HysteriaNode, ProxyDetail, ProxyNode, ShadowsocksNode,
    ShadowsocksRNode, TrojanNode, VMessNode, VlessNode, WsOptions,
};

/// Deserializes a field that sloppy generators emit as either a number
/// or a string (bandwidth hints, alter ids).
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumberVisitor;

    impl<'de> Visitor<'de> for StringOrNumberVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

fn default_vmess_cipher() -> String {
    "auto".to_string()
}

/// One proxy entry of a Clash document, tagged by its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClashProxy {
    #[serde(rename = "ss")]
    Shadowsocks(ClashShadowsocks),
    #[serde(rename = "ssr")]
    ShadowsocksR(ClashShadowsocksR),
    #[serde(rename = "vmess")]
    VMess(ClashVMess),
    #[serde(rename = "vless")]
    Vless(ClashVless),
    #[serde(rename = "trojan")]
    Trojan(ClashTrojan),
    #[serde(rename = "hysteria")]
    Hysteria(ClashHysteria),
    #[serde(rename = "hysteria2")]
    Hysteria2(ClashHysteria2),
}

/// Wire names of the `type` values [`ClashProxy`] can represent.
pub const SUPPORTED_CLASH_TYPES: &[&str] =
    &["ss", "ssr", "vmess", "vless", "trojan", "hysteria", "hysteria2"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashShadowsocks {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub cipher: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(rename = "plugin-opts", default, skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashShadowsocksR {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub cipher: String,
    pub password: String,
    pub protocol: String,
    pub obfs: String,
    #[serde(rename = "protocol-param", default, skip_serializing_if = "Option::is_none")]
    pub protocol_param: Option<String>,
    #[serde(rename = "obfs-param", default, skip_serializing_if = "Option::is_none")]
    pub obfs_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashVMess {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub uuid: String,
    #[serde(rename = "alterId", default)]
    pub alter_id: u16,
    #[serde(default = "default_vmess_cipher")]
    pub cipher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<ClashWsOpts>,
    #[serde(rename = "h2-opts", default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<ClashH2Opts>,
    #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<ClashGrpcOpts>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashVless {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<ClashWsOpts>,
    #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<ClashGrpcOpts>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashTrojan {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<ClashWsOpts>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashHysteria {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(
        rename = "auth-str",
        alias = "auth_str",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_str: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClashHysteria2 {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub password: String,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(rename = "obfs-password", default, skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClashWsOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClashH2Opts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClashGrpcOpts {
    #[serde(
        rename = "grpc-service-name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub grpc_service_name: Option<String>,
}

/// Splits a share-link plugin option string (`k1=v1;k2=v2`) into the
/// map form Clash uses. A bare key becomes `true`.
fn plugin_opts_to_map(opts: &str) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    for pair in opts.split(';').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) => {
                map.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => {
                map.insert(pair.to_string(), Value::Bool(true));
            }
        }
    }
    map
}

/// Inverse of [`plugin_opts_to_map`].
fn plugin_opts_from_map(map: &BTreeMap<String, Value>) -> String {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::String(s) => parts.push(format!("{}={}", key, s)),
            Value::Bool(true) => parts.push(key.clone()),
            Value::Bool(false) => {}
            Value::Number(n) => parts.push(format!("{}={}", key, n)),
            _ => {}
        }
    }
    parts.join(";")
}

fn ws_opts_to_clash(opts: &WsOptions) -> ClashWsOpts {
    ClashWsOpts {
        path: opts.path.clone(),
        headers: opts.host.as_ref().map(|host| {
            let mut headers = BTreeMap::new();
            headers.insert("Host".to_string(), host.clone());
            headers
        }),
    }
}

fn ws_opts_from_clash(opts: &ClashWsOpts) -> WsOptions {
    WsOptions {
        path: opts.path.clone(),
        host: opts
            .headers
            .as_ref()
            .and_then(|headers| headers.get("Host").cloned()),
    }
}

impl ClashProxy {
    /// Maps a node to its Clash record. Every node variant has a
    /// mapping; a converter that cannot represent a type must refuse
    /// it explicitly instead of silently dropping the node.
    pub fn from_node(node: &ProxyNode) -> Result<ClashProxy, LinkError> {
        match &node.detail {
            ProxyDetail::Shadowsocks(ss) => Ok(ClashProxy::Shadowsocks(ClashShadowsocks {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                cipher: ss.cipher.clone(),
                password: ss.password.clone(),
                udp: ss.udp,
                plugin: ss.plugin.clone(),
                plugin_opts: ss.plugin_opts.as_deref().map(plugin_opts_to_map),
            })),
            ProxyDetail::ShadowsocksR(ssr) => Ok(ClashProxy::ShadowsocksR(ClashShadowsocksR {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                cipher: ssr.cipher.clone(),
                password: ssr.password.clone(),
                protocol: ssr.protocol.clone(),
                obfs: ssr.obfs.clone(),
                protocol_param: ssr.protocol_param.clone(),
                obfs_param: ssr.obfs_param.clone(),
                udp: ssr.udp,
            })),
            ProxyDetail::VMess(vmess) => Ok(ClashProxy::VMess(ClashVMess {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                uuid: vmess.uuid.clone(),
                alter_id: vmess.alter_id,
                cipher: vmess.cipher.clone(),
                udp: None,
                tls: if vmess.tls { Some(true) } else { None },
                servername: vmess.sni.clone(),
                network: if vmess.network == "tcp" {
                    None
                } else {
                    Some(vmess.network.clone())
                },
                ws_opts: vmess.ws_opts.as_ref().map(ws_opts_to_clash),
                h2_opts: vmess.h2_opts.as_ref().map(|h2| ClashH2Opts {
                    host: h2.host.as_ref().map(|h| vec![h.clone()]),
                    path: h2.path.clone(),
                }),
                grpc_opts: vmess.grpc_opts.as_ref().map(|grpc| ClashGrpcOpts {
                    grpc_service_name: grpc.service_name.clone(),
                }),
            })),
            ProxyDetail::Vless(vless) => Ok(ClashProxy::Vless(ClashVless {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                uuid: vless.uuid.clone(),
                flow: vless.flow.clone(),
                tls: if vless.tls { Some(true) } else { None },
                servername: vless.sni.clone(),
                network: if vless.network == "tcp" {
                    None
                } else {
                    Some(vless.network.clone())
                },
                ws_opts: vless.ws_opts.as_ref().map(ws_opts_to_clash),
                grpc_opts: vless.grpc_opts.as_ref().map(|grpc| ClashGrpcOpts {
                    grpc_service_name: grpc.service_name.clone(),
                }),
            })),
            ProxyDetail::Trojan(trojan) => Ok(ClashProxy::Trojan(ClashTrojan {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                password: trojan.password.clone(),
                sni: trojan.sni.clone(),
                alpn: if trojan.alpn.is_empty() {
                    None
                } else {
                    Some(trojan.alpn.clone())
                },
                network: trojan.ws_opts.as_ref().map(|_| "ws".to_string()),
                ws_opts: trojan.ws_opts.as_ref().map(ws_opts_to_clash),
            })),
            ProxyDetail::Hysteria(hysteria) => Ok(ClashProxy::Hysteria(ClashHysteria {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                auth_str: hysteria.auth.clone(),
                up: hysteria.up.clone(),
                down: hysteria.down.clone(),
                sni: hysteria.sni.clone(),
            })),
            ProxyDetail::Hysteria2(hysteria2) => Ok(ClashProxy::Hysteria2(ClashHysteria2 {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                password: hysteria2.password.clone(),
                up: hysteria2.up.clone(),
                down: hysteria2.down.clone(),
                sni: hysteria2.sni.clone(),
                obfs: hysteria2.obfs.clone(),
                obfs_password: hysteria2.obfs_password.clone(),
            })),
        }
    }

    /// Rebuilds a node from a document entry, using the document's own
    /// field names. Missing required fields surface as `MalformedLink`.
    pub fn into_node(self) -> Result<ProxyNode, LinkError> {
        let node = match self {
            ClashProxy::Shadowsocks(ss) => {
                require(&ss.cipher, "cipher")?;
                require(&ss.password, "password")?;
                ProxyNode {
                    name: ss.name,
                    server: ss.server,
                    port: ss.port,
                    detail: ProxyDetail::Shadowsocks(ShadowsocksNode {
                        cipher: ss.cipher,
                        password: ss.password,
                        udp: ss.udp,
                        plugin: ss.plugin,
                        plugin_opts: ss
                            .plugin_opts
                            .as_ref()
                            .map(plugin_opts_from_map)
                            .filter(|opts| !opts.is_empty()),
                    }),
                }
            }
            ClashProxy::ShadowsocksR(ssr) => {
                require(&ssr.cipher, "cipher")?;
                require(&ssr.password, "password")?;
                require(&ssr.protocol, "protocol")?;
                require(&ssr.obfs, "obfs")?;
                ProxyNode {
                    name: ssr.name,
                    server: ssr.server,
                    port: ssr.port,
                    detail: ProxyDetail::ShadowsocksR(ShadowsocksRNode {
                        cipher: ssr.cipher,
                        password: ssr.password,
                        protocol: ssr.protocol,
                        obfs: ssr.obfs,
                        protocol_param: ssr.protocol_param,
                        obfs_param: ssr.obfs_param,
                        group: None,
                        udp: ssr.udp,
                    }),
                }
            }
            ClashProxy::VMess(vmess) => {
                require(&vmess.uuid, "uuid")?;
                let network = vmess.network.unwrap_or_else(|| "tcp".to_string());
                ProxyNode {
                    name: vmess.name,
                    server: vmess.server,
                    port: vmess.port,
                    detail: ProxyDetail::VMess(VMessNode {
                        uuid: vmess.uuid,
                        alter_id: vmess.alter_id,
                        cipher: vmess.cipher,
                        network,
                        tls: vmess.tls.unwrap_or(false),
                        sni: vmess.servername,
                        ws_opts: vmess.ws_opts.as_ref().map(ws_opts_from_clash),
                        h2_opts: vmess.h2_opts.map(|h2| H2Options {
                            host: h2.host.and_then(|mut hosts| {
                                if hosts.is_empty() {
                                    None
                                } else {
                                    Some(hosts.remove(0))
                                }
                            }),
                            path: h2.path,
                        }),
                        grpc_opts: vmess.grpc_opts.map(|grpc| GrpcOptions {
                            service_name: grpc.grpc_service_name,
                        }),
                    }),
                }
            }
            ClashProxy::Vless(vless) => {
                require(&vless.uuid, "uuid")?;
                let network = vless.network.unwrap_or_else(|| "tcp".to_string());
                ProxyNode {
                    name: vless.name,
                    server: vless.server,
                    port: vless.port,
                    detail: ProxyDetail::Vless(VlessNode {
                        uuid: vless.uuid,
                        encryption: "none".to_string(),
                        flow: vless.flow,
                        network,
                        tls: vless.tls.unwrap_or(false),
                        sni: vless.servername,
                        ws_opts: vless.ws_opts.as_ref().map(ws_opts_from_clash),
                        grpc_opts: vless.grpc_opts.map(|grpc| GrpcOptions {
                            service_name: grpc.grpc_service_name,
                        }),
                    }),
                }
            }
            ClashProxy::Trojan(trojan) => {
                require(&trojan.password, "password")?;
                ProxyNode {
                    name: trojan.name,
                    server: trojan.server,
                    port: trojan.port,
                    detail: ProxyDetail::Trojan(TrojanNode {
                        password: trojan.password,
                        tls: true,
                        sni: trojan.sni,
                        alpn: trojan.alpn.unwrap_or_default(),
                        ws_opts: trojan.ws_opts.as_ref().map(ws_opts_from_clash),
                    }),
                }
            }
            ClashProxy::Hysteria(hysteria) => ProxyNode {
                name: hysteria.name,
                server: hysteria.server,
                port: hysteria.port,
                detail: ProxyDetail::Hysteria(HysteriaNode {
                    auth: hysteria.auth_str,
                    up: hysteria.up,
                    down: hysteria.down,
                    sni: hysteria.sni,
                }),
            },
            ClashProxy::Hysteria2(hysteria2) => {
                require(&hysteria2.password, "password")?;
                ProxyNode {
                    name: hysteria2.name,
                    server: hysteria2.server,
                    port: hysteria2.port,
                    detail: ProxyDetail::Hysteria2(Hysteria2Node {
                        password: hysteria2.password,
                        up: hysteria2.up,
                        down: hysteria2.down,
                        sni: hysteria2.sni,
                        obfs: hysteria2.obfs,
                        obfs_password: hysteria2.obfs_password,
                    }),
                }
            }
        };

        if node.server.is_empty() {
            return Err(LinkError::MalformedLink("missing server".to_string()));
        }
        if node.port == 0 {
            return Err(LinkError::MalformedLink("port out of range".to_string()));
        }
        Ok(node)
    }
}

fn require(value: &str, field: &str) -> Result<(), LinkError> {
    if value.is_empty() {
        Err(LinkError::MalformedLink(format!("missing {}", field)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowsocks_entry_round_trips_through_yaml() {
        let yaml = r#"
type: ss
name: node1
server: example.com
port: 8388
cipher: aes-256-gcm
password: secret
udp: true
"#;
        let entry: ClashProxy = serde_yaml::from_str(yaml).unwrap();
        let node = entry.clone().into_node().unwrap();
        assert_eq!(node.name, "node1");
        assert_eq!(ClashProxy::from_node(&node).unwrap(), entry);
    }

    #[test]
    fn hysteria2_accepts_numeric_bandwidth() {
        let yaml = r#"
type: hysteria2
name: hy
server: example.com
port: 443
password: pw
up: 100
down: "200 Mbps"
"#;
        let entry: ClashProxy = serde_yaml::from_str(yaml).unwrap();
        match entry {
            ClashProxy::Hysteria2(h) => {
                assert_eq!(h.up.as_deref(), Some("100"));
                assert_eq!(h.down.as_deref(), Some("200 Mbps"));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let yaml = r#"
type: trojan
name: t
server: example.com
port: 443
password: ""
"#;
        let entry: ClashProxy = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            entry.into_node(),
            Err(LinkError::MalformedLink(_))
        ));
    }

    #[test]
    fn plugin_opts_string_and_map_forms_are_inverse() {
        let map = plugin_opts_to_map("obfs=http;obfs-host=cdn.example.com;fast-open");
        assert_eq!(map.get("obfs"), Some(&Value::String("http".to_string())));
        assert_eq!(map.get("fast-open"), Some(&Value::Bool(true)));
        let restored = plugin_opts_from_map(&map);
        // BTreeMap ordering is alphabetical, membership is what matters.
        assert!(restored.contains("obfs=http"));
        assert!(restored.contains("obfs-host=cdn.example.com"));
        assert!(restored.contains("fast-open"));
    }

    #[test]
    fn vmess_tcp_network_is_omitted_from_output() {
        let node = ProxyNode {
            name: "v".to_string(),
            server: "example.com".to_string(),
            port: 443,
            detail: ProxyDetail::VMess(VMessNode {
                uuid: "29e0cdd8-aaaa-bbbb-cccc-4a8d9e6eabc1".to_string(),
                alter_id: 0,
                cipher: "auto".to_string(),
                network: "tcp".to_string(),
                tls: false,
                sni: None,
                ws_opts: None,
                h2_opts: None,
                grpc_opts: None,
            }),
        };
        let yaml = serde_yaml::to_string(&ClashProxy::from_node(&node).unwrap()).unwrap();
        assert!(!yaml.contains("network"));
        assert!(!yaml.contains("tls"));
    }
}
