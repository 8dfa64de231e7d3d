//! Proxy node model.
//!
//! `ProxyNode` is the wire-format-independent representation of one
//! proxy endpoint. Each variant carries exactly the fields its protocol
//! needs; codecs validate before construction, so a constructed node is
//! always complete.

/// Canonical protocol identifier, used for stats, filters and dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProxyType {
    Shadowsocks,
    ShadowsocksR,
    VMess,
    Vless,
    Trojan,
    Hysteria,
    Hysteria2,
}

impl ProxyType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyType::Shadowsocks => "SS",
            ProxyType::ShadowsocksR => "SSR",
            ProxyType::VMess => "VMess",
            ProxyType::Vless => "Vless",
            ProxyType::Trojan => "Trojan",
            ProxyType::Hysteria => "Hysteria",
            ProxyType::Hysteria2 => "Hysteria2",
        }
    }
}

/// One proxy endpoint, independent of any wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyNode {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub detail: ProxyDetail,
}

impl ProxyNode {
    pub fn proxy_type(&self) -> ProxyType {
        match self.detail {
            ProxyDetail::Shadowsocks(_) => ProxyType::Shadowsocks,
            ProxyDetail::ShadowsocksR(_) => ProxyType::ShadowsocksR,
            ProxyDetail::VMess(_) => ProxyType::VMess,
            ProxyDetail::Vless(_) => ProxyType::Vless,
            ProxyDetail::Trojan(_) => ProxyType::Trojan,
            ProxyDetail::Hysteria(_) => ProxyType::Hysteria,
            ProxyDetail::Hysteria2(_) => ProxyType::Hysteria2,
        }
    }

    /// Identity used for deduplication: two nodes pointing at the same
    /// endpoint with the same protocol are considered the same node.
    pub fn dedup_key(&self) -> (&str, u16, ProxyType) {
        (self.server.as_str(), self.port, self.proxy_type())
    }
}

/// Per-protocol payload of a [`ProxyNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyDetail {
    Shadowsocks(ShadowsocksNode),
    ShadowsocksR(ShadowsocksRNode),
    VMess(VMessNode),
    Vless(VlessNode),
    Trojan(TrojanNode),
    Hysteria(HysteriaNode),
    Hysteria2(Hysteria2Node),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowsocksNode {
    pub cipher: String,
    pub password: String,
    pub udp: Option<bool>,
    pub plugin: Option<String>,
    /// Plugin options in the `key1=value1;key2=value2` wire form.
    pub plugin_opts: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowsocksRNode {
    pub cipher: String,
    pub password: String,
    pub protocol: String,
    pub obfs: String,
    pub protocol_param: Option<String>,
    pub obfs_param: Option<String>,
    pub group: Option<String>,
    pub udp: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VMessNode {
    pub uuid: String,
    pub alter_id: u16,
    pub cipher: String,
    pub network: String,
    pub tls: bool,
    pub sni: Option<String>,
    pub ws_opts: Option<WsOptions>,
    pub h2_opts: Option<H2Options>,
    pub grpc_opts: Option<GrpcOptions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VlessNode {
    pub uuid: String,
    pub encryption: String,
    pub flow: Option<String>,
    pub network: String,
    pub tls: bool,
    pub sni: Option<String>,
    pub ws_opts: Option<WsOptions>,
    pub grpc_opts: Option<GrpcOptions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrojanNode {
    pub password: String,
    pub tls: bool,
    pub sni: Option<String>,
    pub alpn: Vec<String>,
    pub ws_opts: Option<WsOptions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HysteriaNode {
    pub auth: Option<String>,
    /// Upload bandwidth, kept as the upstream's literal string.
    pub up: Option<String>,
    /// Download bandwidth, kept as the upstream's literal string.
    pub down: Option<String>,
    pub sni: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hysteria2Node {
    pub password: String,
    pub up: Option<String>,
    pub down: Option<String>,
    pub sni: Option<String>,
    pub obfs: Option<String>,
    pub obfs_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WsOptions {
    pub path: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct H2Options {
    pub path: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrpcOptions {
    pub service_name: Option<String>,
}
