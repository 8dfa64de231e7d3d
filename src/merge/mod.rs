//! Subscription merge orchestration.
//!
//! One re-hosting operation: fetch the upstream subscription, extract
//! its nodes as share links, persist the re-encoded list behind a
//! deterministic key, and rewrite a config template so the client
//! fetches that list from this system. The upstream's
//! `subscription-userinfo` header is carried through verbatim and never
//! parsed.

use std::collections::HashMap;
use std::future::Future;

use log::{debug, info};
use serde_yaml::Value;
use url::Url;

use crate::error::{FetchError, MergeError, StoreError};
use crate::extractor::extract_links;
use crate::parser::CodecRegistry;
use crate::utils::base64::encode_standard;
use crate::utils::string::sanitize_key_part;

/// Client identification sent upstream. Some providers only attach the
/// traffic-accounting header for user agents they recognize.
pub const SUB_USER_AGENT: &str = "clash.meta";

/// Namespace prefix of every stored link blob key.
pub const STORE_NAMESPACE: &str = "sublinks";

const USERINFO_HEADER: &str = "subscription-userinfo";

/// A fetched HTTP resource.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Retrieves remote resources. Implemented over `reqwest` in
/// [`crate::utils::http`]; tests substitute an in-memory fake.
pub trait SubscriptionFetch {
    fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> impl Future<Output = Result<FetchResponse, FetchError>> + Send;
}

/// External key-value store for re-encoded link blobs. Writes are
/// unconditional overwrites; retention is the store's concern.
pub trait LinkStore {
    fn put(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Inputs of one merge operation.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Upstream subscription URL.
    pub subscription_url: String,
    /// URL serving the rule/config template to rewrite.
    pub template_url: String,
    /// Origin of this system, e.g. `https://sub.example.com`.
    pub callback_origin: String,
    /// Path of the link-serving endpoint under the origin.
    pub callback_endpoint: String,
    /// Caller identity embedded in the callback URL.
    pub user_id: String,
    /// Caller credential embedded in the callback URL.
    pub token: String,
}

/// Result of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// The rewritten template document.
    pub config: String,
    /// Verbatim `subscription-userinfo` header value, if the upstream
    /// sent one.
    pub traffic_info: Option<String>,
    /// Key under which the link blob is stored.
    pub storage_key: String,
}

/// Deterministic storage key for an upstream URL:
/// `<namespace>-<host><sanitized-path>`.
pub fn storage_key(subscription_url: &str) -> Result<String, MergeError> {
    let url = Url::parse(subscription_url)?;
    let host = url.host_str().unwrap_or_default();
    Ok(format!(
        "{}-{}{}",
        STORE_NAMESPACE,
        sanitize_key_part(host),
        sanitize_key_part(url.path())
    ))
}

fn callback_url(request: &MergeRequest, key: &str) -> String {
    format!(
        "{}/{}?key={}&uid={}&token={}",
        request.callback_origin.trim_end_matches('/'),
        request.callback_endpoint.trim_start_matches('/'),
        key,
        request.user_id,
        request.token
    )
}

/// Rewrites every `proxy-providers` entry of the template to fetch from
/// the callback URL.
fn rewrite_template(template: &str, callback: &str) -> Result<String, MergeError> {
    let mut root: Value = serde_yaml::from_str(template)
        .map_err(|e| MergeError::TemplateRewrite(format!("template parse error: {}", e)))?;

    let providers = root
        .get_mut("proxy-providers")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| {
            MergeError::TemplateRewrite("template has no proxy-providers section".to_string())
        })?;
    if providers.is_empty() {
        return Err(MergeError::TemplateRewrite(
            "proxy-providers section is empty".to_string(),
        ));
    }
    for (_, provider) in providers.iter_mut() {
        if let Some(provider) = provider.as_mapping_mut() {
            provider.insert(
                Value::String("url".to_string()),
                Value::String(callback.to_string()),
            );
        }
    }

    serde_yaml::to_string(&root)
        .map_err(|e| MergeError::TemplateRewrite(format!("template serialize error: {}", e)))
}

/// Runs the merge stages in order, aborting on the first failure. No
/// partial result is cached; callers re-invoke the whole operation.
pub async fn merge_subscription<F, S>(
    request: &MergeRequest,
    fetcher: &F,
    store: &S,
    codecs: &CodecRegistry,
) -> Result<MergeOutput, MergeError>
where
    F: SubscriptionFetch,
    S: LinkStore,
{
    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), SUB_USER_AGENT.to_string());

    // Stage 1: upstream subscription.
    let subscription = fetcher
        .fetch(&request.subscription_url, &headers)
        .await
        .map_err(MergeError::SubscriptionFetch)?;
    if !subscription.is_success() {
        return Err(MergeError::SubscriptionFetch(FetchError::Status(
            subscription.status,
        )));
    }
    let traffic_info = subscription.header(USERINFO_HEADER).map(str::to_string);
    debug!(
        "fetched subscription ({} bytes, traffic info: {})",
        subscription.body.len(),
        traffic_info.is_some()
    );

    // Stage 2: config template.
    let template = fetcher
        .fetch(&request.template_url, &headers)
        .await
        .map_err(MergeError::TemplateFetch)?;
    if !template.is_success() {
        return Err(MergeError::TemplateFetch(FetchError::Status(
            template.status,
        )));
    }

    // Stage 3: extract, re-encode, persist. Last write wins.
    let extraction = extract_links(codecs, &subscription.body)?;
    let key = storage_key(&request.subscription_url)?;
    store.put(&key, &encode_standard(&extraction.to_blob())).await?;
    info!(
        "stored {} re-encoded links under {}",
        extraction.supported, key
    );

    // Stage 4: point the template at this system.
    let config = rewrite_template(&template.body, &callback_url(request, &key))?;

    Ok(MergeOutput {
        config,
        traffic_info,
        storage_key: key,
    })
}
