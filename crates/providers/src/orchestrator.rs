//! Synthesis orchestrator
//!
//! Turns an ordered list of chapter texts into one continuous MP3 buffer.
//! The export is all-or-nothing: any chunk failure aborts the whole job and
//! no partial result reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use readtome_codec::finalize_post_concat;
use readtome_config::TtsConfigDefaults;
use readtome_core::{ProviderChoice, SynthesisError, TtsConfig};

use crate::edge::EdgeClient;
use crate::sapi::SapiClient;
use crate::session::Clock;

/// Provider selection and post-processing for one export job.
pub struct Synthesizer {
    edge: EdgeClient,
    sapi: SapiClient,
}

impl Synthesizer {
    /// Synthesizer backed by the real provider transports.
    pub fn new(settings: &TtsConfigDefaults) -> Self {
        Self {
            edge: EdgeClient::new(settings.edge_endpoint.clone(), settings.edge_concurrency),
            sapi: SapiClient::new(
                settings.sapi_base_url.clone(),
                Duration::from_secs(settings.session_ttl_secs),
                Duration::from_secs(settings.request_timeout_secs),
            ),
        }
    }

    /// Synthesizer with injected transports, for tests.
    pub fn with_transports(
        edge_transport: Arc<dyn crate::edge::SpeechTransport>,
        sapi_http: Arc<dyn crate::sapi::SapiHttp>,
        clock: Arc<dyn Clock>,
        settings: &TtsConfigDefaults,
    ) -> Self {
        Self {
            edge: EdgeClient::with_transport(edge_transport, settings.edge_concurrency),
            sapi: SapiClient::with_transport(
                sapi_http,
                Duration::from_secs(settings.session_ttl_secs),
                clock,
            ),
        }
    }

    /// Synthesize a whole book range into one final MP3 buffer.
    ///
    /// Output byte order always matches input chapter order, regardless of
    /// the provider's internal completion order.
    pub async fn synthesize_book(
        &self,
        texts: &[String],
        config: &TtsConfig,
        provider: ProviderChoice,
    ) -> Result<Vec<u8>, SynthesisError> {
        tracing::info!(
            chapters = texts.len(),
            voice = %config.voice,
            ?provider,
            "starting book synthesis"
        );

        let concatenated = match provider {
            ProviderChoice::Edge => self.edge.synthesize_chapters(texts, config).await?,
            ProviderChoice::Sapi => self.sapi.synthesize_chapters(texts, config).await?,
        };

        let finalized = finalize_post_concat(concatenated);
        tracing::info!(bytes = finalized.len(), "book synthesis complete");
        Ok(finalized)
    }
}
