//! Conversion façade.
//!
//! [`Subrelay`] bundles a codec registry and a converter registry into
//! one caller-constructed context; there is no process-global
//! instance, so parallel tests each build their own.

use crate::error::{LinkError, MergeError};
use crate::generator::{ConvertOptions, ConverterRegistry, TargetFormat};
use crate::merge::{self, LinkStore, MergeOutput, MergeRequest, SubscriptionFetch};
use crate::models::{BatchOutcome, ConversionOutcome, ConversionStats};
use crate::parser::{decode_batch, parse_base64_subscription, BatchOptions, CodecRegistry};

pub struct Subrelay {
    codecs: CodecRegistry,
    converters: ConverterRegistry,
}

impl Subrelay {
    /// Context with every built-in codec and converter registered.
    pub fn new() -> Self {
        Subrelay {
            codecs: CodecRegistry::with_defaults(),
            converters: ConverterRegistry::with_defaults(),
        }
    }

    /// Context over custom registries, for callers extending either.
    pub fn with_registries(codecs: CodecRegistry, converters: ConverterRegistry) -> Self {
        Subrelay { codecs, converters }
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Batch-decodes a plain multi-line share-link text.
    pub fn parse_links(&self, text: &str, options: &BatchOptions) -> BatchOutcome {
        decode_batch(&self.codecs, text, options)
    }

    /// Batch-decodes a base64 subscription body.
    pub fn parse_base64_subscription(
        &self,
        blob: &str,
        options: &BatchOptions,
    ) -> Result<BatchOutcome, LinkError> {
        parse_base64_subscription(&self.codecs, blob, options)
    }

    /// Parses raw share-link text and converts the nodes in one step.
    pub fn convert_links(
        &self,
        text: &str,
        target: TargetFormat,
        batch_options: &BatchOptions,
        convert_options: &ConvertOptions,
    ) -> ConversionOutcome {
        let batch = self.parse_links(text, batch_options);
        self.convert_batch(batch, target, convert_options)
    }

    /// Decodes a base64 subscription body and converts the nodes in
    /// one step.
    pub fn convert_base64_subscription(
        &self,
        blob: &str,
        target: TargetFormat,
        batch_options: &BatchOptions,
        convert_options: &ConvertOptions,
    ) -> ConversionOutcome {
        match self.parse_base64_subscription(blob, batch_options) {
            Ok(batch) => self.convert_batch(batch, target, convert_options),
            Err(error) => {
                ConversionOutcome::failure(error.to_string(), Vec::new(), ConversionStats::default())
            }
        }
    }

    /// Runs one subscription re-hosting operation against the given
    /// collaborators.
    pub async fn merge_subscription<F, S>(
        &self,
        request: &MergeRequest,
        fetcher: &F,
        store: &S,
    ) -> Result<MergeOutput, MergeError>
    where
        F: SubscriptionFetch,
        S: LinkStore,
    {
        merge::merge_subscription(request, fetcher, store, &self.codecs).await
    }

    fn convert_batch(
        &self,
        batch: BatchOutcome,
        target: TargetFormat,
        convert_options: &ConvertOptions,
    ) -> ConversionOutcome {
        let converter = match self.converters.resolve(target) {
            Some(converter) => converter,
            None => {
                return ConversionOutcome::failure(
                    format!("no converter for target {}", target.as_str()),
                    Vec::new(),
                    ConversionStats::default(),
                )
            }
        };
        let mut outcome = converter.convert(&batch.nodes, convert_options);
        // Surface parse failures alongside conversion warnings.
        for failure in &batch.failures {
            outcome
                .warnings
                .push(format!("{}: {}", failure.message, failure.source));
        }
        outcome
    }
}

impl Default for Subrelay {
    fn default() -> Self {
        Subrelay::new()
    }
}
