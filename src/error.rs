//! Error types for link parsing, document extraction and subscription merging.

use thiserror::Error;

/// Failure to decode or encode a single share link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link's prefix does not match any registered codec, or the
    /// target type has no encoder.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Recognized protocol, but the link body is broken: wrong field
    /// count, undecodable base64, out-of-range or missing values.
    #[error("malformed link: {0}")]
    MalformedLink(String),
}

/// Failure to extract proxy entries from a serialized config document.
///
/// `InvalidStructure` and `EmptyNodeSet` are deliberately separate
/// variants: callers need to tell a broken document apart from a valid
/// one that simply carries no nodes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid document structure: {0}")]
    InvalidStructure(String),

    #[error("document contains no proxy entries")]
    EmptyNodeSet,
}

/// Failure to retrieve a remote resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status code {0}")]
    Status(u16),
}

/// Failure to persist a value in the external key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage write failed: {0}")]
    WriteFailed(String),
}

/// A stage-identified failure of the subscription merge operation.
///
/// Each variant names the stage that failed; the orchestrator aborts
/// the remaining stages as soon as one is raised.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("invalid subscription url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("subscription fetch failed: {0}")]
    SubscriptionFetch(FetchError),

    #[error("template fetch failed: {0}")]
    TemplateFetch(FetchError),

    #[error("node extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("link blob storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("template rewrite failed: {0}")]
    TemplateRewrite(String),
}
