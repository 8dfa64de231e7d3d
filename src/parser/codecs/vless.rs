//! VLESS share links.
//!
//! Wire form: `vless://uuid@server:port?encryption=none&security=tls
//! &sni=...&type=ws&host=...&path=...#name`.

use url::Url;
use uuid::Uuid;

use crate::error::LinkError;
use crate::models::{GrpcOptions, ProxyDetail, ProxyNode, ProxyType, VlessNode, WsOptions};
use crate::utils::url::{url_decode, url_encode};

use super::malformed;
use crate::parser::codec::ProtocolCodec;

pub struct VlessCodec;

impl ProtocolCodec for VlessCodec {
    fn prefixes(&self) -> &'static [&'static str] {
        &["vless://"]
    }

    fn handles(&self, kind: ProxyType) -> bool {
        kind == ProxyType::Vless
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        let url = Url::parse(link).map_err(|e| malformed(format!("invalid vless url: {}", e)))?;

        let uuid = url_decode(url.username());
        Uuid::parse_str(&uuid).map_err(|_| malformed("invalid uuid"))?;
        let server = url
            .host_str()
            .ok_or_else(|| malformed("missing server"))?
            .to_string();
        let port = url.port().ok_or_else(|| malformed("missing port"))?;
        if port == 0 {
            return Err(malformed("port out of range: 0"));
        }

        let mut encryption = "none".to_string();
        let mut flow = None;
        let mut security = String::new();
        let mut sni = None;
        let mut network = "tcp".to_string();
        let mut host = None;
        let mut path = None;
        let mut service_name = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "encryption" if !value.is_empty() => encryption = value.to_string(),
                "flow" if !value.is_empty() => flow = Some(value.to_string()),
                "security" => security = value.to_string(),
                "sni" if !value.is_empty() => sni = Some(value.to_string()),
                "type" if !value.is_empty() => network = value.to_string(),
                "host" if !value.is_empty() => host = Some(value.to_string()),
                "path" if !value.is_empty() => path = Some(value.to_string()),
                "serviceName" if !value.is_empty() => service_name = Some(value.to_string()),
                _ => {}
            }
        }

        let ws_opts = (network == "ws").then(|| WsOptions { path, host });
        let grpc_opts = (network == "grpc").then(|| GrpcOptions {
            service_name,
        });

        let name = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => url_decode(fragment),
            _ => format!("{} ({})", server, port),
        };

        Ok(ProxyNode {
            name,
            server,
            port,
            detail: ProxyDetail::Vless(VlessNode {
                uuid,
                encryption,
                flow,
                network,
                tls: !security.is_empty() && security != "none",
                sni,
                ws_opts,
                grpc_opts,
            }),
        })
    }

    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let vless = match &node.detail {
            ProxyDetail::Vless(vless) => vless,
            _ => {
                return Err(LinkError::UnsupportedProtocol(
                    node.proxy_type().as_str().to_string(),
                ))
            }
        };

        let mut params = vec![format!("encryption={}", url_encode(&vless.encryption))];
        if let Some(flow) = &vless.flow {
            params.push(format!("flow={}", url_encode(flow)));
        }
        params.push(format!(
            "security={}",
            if vless.tls { "tls" } else { "none" }
        ));
        if let Some(sni) = &vless.sni {
            params.push(format!("sni={}", url_encode(sni)));
        }
        params.push(format!("type={}", url_encode(&vless.network)));
        if let Some(ws) = &vless.ws_opts {
            if let Some(host) = &ws.host {
                params.push(format!("host={}", url_encode(host)));
            }
            if let Some(path) = &ws.path {
                params.push(format!("path={}", url_encode(path)));
            }
        }
        if let Some(grpc) = &vless.grpc_opts {
            if let Some(service_name) = &grpc.service_name {
                params.push(format!("serviceName={}", url_encode(service_name)));
            }
        }

        Ok(format!(
            "vless://{}@{}:{}?{}#{}",
            vless.uuid,
            node.server,
            node.port,
            params.join("&"),
            url_encode(&node.name)
        ))
    }
}
