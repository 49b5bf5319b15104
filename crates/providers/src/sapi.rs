//! Installed-voice TTS via a public web front-end
//!
//! Flow per synthesis:
//!   1. Scrape the front page for the anti-forgery token + cookies (cached,
//!      see [`crate::session`])
//!   2. POST the text → `{ id, file }` envelope
//!   3. GET the rendered file → MP3 bytes (still tagged; sanitized by the
//!      batch helper)
//!
//! The front-end accepts one in-flight request per session, so the batch
//! helper is strictly sequential. An HTTP 400 means the session expired:
//! the cache is dropped, the client backs off briefly and retries once with
//! a forced refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use readtome_codec::strip_chunk;
use readtome_core::{SessionError, SynthesisError, TtsConfig};

use crate::session::{Clock, SessionStore, SystemClock};

const MAX_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Front-page response used for session scraping.
pub struct PageResponse {
    pub status: u16,
    pub body: String,
    /// Raw `Set-Cookie` header values, one per header
    pub set_cookies: Vec<String>,
}

/// Generic provider API response.
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// HTTP calls the client makes against the front-end. Injectable for tests.
#[async_trait]
pub trait SapiHttp: Send + Sync {
    /// GET the front page.
    async fn fetch_page(&self) -> Result<PageResponse, SessionError>;

    /// POST a synthesis request with the session's token and cookie.
    async fn synthesize(
        &self,
        body: serde_json::Value,
        token: &str,
        cookie: &str,
    ) -> Result<ApiResponse, SynthesisError>;

    /// GET the rendered file with the session's cookie.
    async fn download(
        &self,
        id: &str,
        file: &str,
        cookie: &str,
    ) -> Result<ApiResponse, SynthesisError>;
}

/// Real transport over reqwest.
pub struct ReqwestSapiHttp {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestSapiHttp {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SapiHttp for ReqwestSapiHttp {
    async fn fetch_page(&self) -> Result<PageResponse, SessionError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(PageResponse {
            status,
            body,
            set_cookies,
        })
    }

    async fn synthesize(
        &self,
        body: serde_json::Value,
        token: &str,
        cookie: &str,
    ) -> Result<ApiResponse, SynthesisError> {
        let response = self
            .client
            .post(format!("{}/Index?handler=Test", self.base_url))
            .header("Content-Type", "application/json, charset=utf-8")
            .header("Accept", "application/json")
            .header("XSRF-TOKEN", token)
            .header("Cookie", cookie)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?
            .to_vec();

        Ok(ApiResponse { status, body })
    }

    async fn download(
        &self,
        id: &str,
        file: &str,
        cookie: &str,
    ) -> Result<ApiResponse, SynthesisError> {
        let response = self
            .client
            .get(format!("{}/Index", self.base_url))
            .query(&[("handler", "Download"), ("id", id), ("file", file)])
            .header("Cookie", cookie)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?
            .to_vec();

        Ok(ApiResponse { status, body })
    }
}

/// Synthesis envelope returned by the front-end.
#[derive(Debug, Deserialize)]
struct SynthEnvelope {
    id: Option<String>,
    file: Option<String>,
}

/// Map a rate multiplier (0.5–2.0) to the site's -10..+10 scale.
///
/// 1.0 → 0, 0.5 → -10, 2.0 → +10. The two segments deliberately have
/// different slopes; this matches the provider front-end's observed
/// behavior and must not be "fixed" to a symmetric mapping.
fn rate_to_site_scale(rate: f64) -> String {
    let clamped = rate.clamp(0.5, 2.0);
    let val = if clamped <= 1.0 {
        (clamped - 1.0) * 20.0
    } else {
        (clamped - 1.0) * 10.0
    };
    format!("{}", val.round() as i64)
}

/// SAPI proxy client.
pub struct SapiClient {
    http: Arc<dyn SapiHttp>,
    sessions: SessionStore,
    token_pattern: Regex,
}

impl SapiClient {
    /// Client backed by the real reqwest transport.
    pub fn new(base_url: impl Into<String>, session_ttl: Duration, timeout: Duration) -> Self {
        Self::with_transport(
            Arc::new(ReqwestSapiHttp::new(base_url, timeout)),
            session_ttl,
            Arc::new(SystemClock),
        )
    }

    pub fn with_transport(
        http: Arc<dyn SapiHttp>,
        session_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            sessions: SessionStore::new(session_ttl, clock),
            // The token sits in a hidden input; attribute order can vary.
            token_pattern: Regex::new(
                r#"name="__RequestVerificationToken".*?value="([^"]+)""#,
            )
            .expect("token pattern is valid"),
        }
    }

    /// Get a usable session, scraping a fresh one when forced or expired.
    async fn session(&self, force_refresh: bool) -> Result<crate::session::Session, SessionError> {
        if !force_refresh {
            if let Some(session) = self.sessions.get() {
                return Ok(session);
            }
        }

        let page = self.http.fetch_page().await?;
        if !(200..300).contains(&page.status) {
            return Err(SessionError::PageFetch(page.status));
        }

        let token = self
            .token_pattern
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or(SessionError::TokenMissing)?;

        let cookie = page
            .set_cookies
            .iter()
            .filter_map(|c| c.split(';').next())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        if cookie.is_empty() {
            return Err(SessionError::CookiesMissing);
        }

        tracing::debug!("scraped fresh front-end session");
        Ok(self.sessions.put(token, cookie))
    }

    /// Synthesize a single text into a still-tagged MP3 buffer.
    ///
    /// Handles session refresh on 400 with one bounded retry.
    pub async fn synthesize(
        &self,
        text: &str,
        config: &TtsConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        let rate_val = rate_to_site_scale(config.rate.unwrap_or(1.0));
        let volume_val = config.volume.unwrap_or(100).to_string();

        for attempt in 1..=MAX_ATTEMPTS {
            // Force a fresh scrape on retry.
            let session = self.session(attempt > 1).await?;

            let body = json!({
                "Text": text,
                "Voice": config.voice,
                "Rate": rate_val,
                "Volume": volume_val,
            });
            let response = self
                .http
                .synthesize(body, &session.token, &session.cookie)
                .await?;

            if response.status == 400 && attempt < MAX_ATTEMPTS {
                tracing::warn!("synthesis returned 400, refreshing session and retrying");
                self.sessions.invalidate();
                tokio::time::sleep(RETRY_BACKOFF).await;
                continue;
            }

            if !(200..300).contains(&response.status) {
                return Err(SynthesisError::HttpStatus(response.status));
            }

            let envelope: SynthEnvelope = serde_json::from_slice(&response.body)
                .map_err(|e| SynthesisError::response(format!("synthesis envelope: {e}")))?;
            let (Some(id), Some(file)) = (envelope.id, envelope.file) else {
                return Err(SynthesisError::response("missing id/file in envelope"));
            };

            let download = self.http.download(&id, &file, &session.cookie).await?;
            if !(200..300).contains(&download.status) {
                return Err(SynthesisError::HttpStatus(download.status));
            }

            return Ok(download.body);
        }

        Err(SynthesisError::RetriesExhausted)
    }

    /// Synthesize chapters strictly sequentially, sanitizing each chunk as
    /// it arrives, and concatenate in input order.
    ///
    /// The front-end's session is single-flight; interleaving requests
    /// would corrupt it.
    pub async fn synthesize_chapters(
        &self,
        texts: &[String],
        config: &TtsConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut out = Vec::new();
        for (index, text) in texts.iter().enumerate() {
            tracing::info!(
                chapter = index + 1,
                total = texts.len(),
                chars = text.len(),
                "synthesizing chapter"
            );
            let chunk = self.synthesize(text, config).await?;
            out.extend_from_slice(&strip_chunk(&chunk));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_rate_mapping_piecewise() {
        assert_eq!(rate_to_site_scale(1.0), "0");
        assert_eq!(rate_to_site_scale(0.5), "-10");
        assert_eq!(rate_to_site_scale(2.0), "10");
        assert_eq!(rate_to_site_scale(0.75), "-5");
        assert_eq!(rate_to_site_scale(1.5), "5");
        // Clamped outside 0.5–2.0
        assert_eq!(rate_to_site_scale(0.1), "-10");
        assert_eq!(rate_to_site_scale(3.0), "10");
    }

    const PAGE_HTML: &str = r#"<html><body><form>
        <input name="__RequestVerificationToken" type="hidden" value="tok-123" />
        </form></body></html>"#;

    /// Scripted transport: a queue of synthesis statuses, counting calls.
    struct FakeSapiHttp {
        page_fetches: AtomicUsize,
        synth_calls: AtomicUsize,
        download_calls: AtomicUsize,
        synth_statuses: Mutex<Vec<u16>>,
        page_html: String,
        cookies: Vec<String>,
    }

    impl FakeSapiHttp {
        fn new(synth_statuses: Vec<u16>) -> Self {
            Self {
                page_fetches: AtomicUsize::new(0),
                synth_calls: AtomicUsize::new(0),
                download_calls: AtomicUsize::new(0),
                synth_statuses: Mutex::new(synth_statuses),
                page_html: PAGE_HTML.to_string(),
                cookies: vec![
                    ".AspNetCore.Antiforgery=abc; path=/; samesite=strict".to_string(),
                    "session=xyz; path=/".to_string(),
                ],
            }
        }
    }

    #[async_trait]
    impl SapiHttp for FakeSapiHttp {
        async fn fetch_page(&self) -> Result<PageResponse, SessionError> {
            self.page_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(PageResponse {
                status: 200,
                body: self.page_html.clone(),
                set_cookies: self.cookies.clone(),
            })
        }

        async fn synthesize(
            &self,
            _body: serde_json::Value,
            token: &str,
            cookie: &str,
        ) -> Result<ApiResponse, SynthesisError> {
            self.synth_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(token, "tok-123");
            assert_eq!(cookie, ".AspNetCore.Antiforgery=abc; session=xyz");

            let status = self.synth_statuses.lock().remove(0);
            let body = if status == 200 {
                br#"{"id":"job-1","file":"out.mp3"}"#.to_vec()
            } else {
                Vec::new()
            };
            Ok(ApiResponse { status, body })
        }

        async fn download(
            &self,
            id: &str,
            file: &str,
            _cookie: &str,
        ) -> Result<ApiResponse, SynthesisError> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(id, "job-1");
            assert_eq!(file, "out.mp3");
            Ok(ApiResponse {
                status: 200,
                body: b"mp3-bytes".to_vec(),
            })
        }
    }

    fn client_with(http: Arc<FakeSapiHttp>) -> SapiClient {
        SapiClient::with_transport(http, Duration::from_secs(1800), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_happy_path_scrapes_once() {
        let http = Arc::new(FakeSapiHttp::new(vec![200, 200]));
        let client = client_with(http.clone());
        let config = TtsConfig::new("Microsoft Zira Desktop");

        let buf = client.synthesize("hello", &config).await.unwrap();
        assert_eq!(buf, b"mp3-bytes");

        // Session is cached across calls.
        client.synthesize("again", &config).await.unwrap();
        assert_eq!(http.page_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_400_triggers_refresh_and_retry() {
        let http = Arc::new(FakeSapiHttp::new(vec![400, 200]));
        let client = client_with(http.clone());
        let config = TtsConfig::new("Microsoft Zira Desktop");

        let buf = client.synthesize("hello", &config).await.unwrap();
        assert_eq!(buf, b"mp3-bytes");
        // One initial scrape plus exactly one forced refresh.
        assert_eq!(http.page_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(http.synth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_400_exhausts_retries() {
        let http = Arc::new(FakeSapiHttp::new(vec![400, 400]));
        let client = client_with(http.clone());
        let config = TtsConfig::new("Microsoft Zira Desktop");

        let result = client.synthesize("hello", &config).await;
        assert!(matches!(result, Err(SynthesisError::HttpStatus(400))));
        assert_eq!(http.download_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_status_is_hard_failure() {
        let http = Arc::new(FakeSapiHttp::new(vec![503]));
        let client = client_with(http.clone());
        let config = TtsConfig::new("Microsoft Zira Desktop");

        let result = client.synthesize("hello", &config).await;
        assert!(matches!(result, Err(SynthesisError::HttpStatus(503))));
        // No retry for non-400 failures.
        assert_eq!(http.synth_calls.load(Ordering::SeqCst), 1);
    }

    /// Transport whose envelope is missing the file reference.
    struct BadEnvelopeHttp;

    #[async_trait]
    impl SapiHttp for BadEnvelopeHttp {
        async fn fetch_page(&self) -> Result<PageResponse, SessionError> {
            Ok(PageResponse {
                status: 200,
                body: PAGE_HTML.to_string(),
                set_cookies: vec!["s=1".to_string()],
            })
        }

        async fn synthesize(
            &self,
            _body: serde_json::Value,
            _token: &str,
            _cookie: &str,
        ) -> Result<ApiResponse, SynthesisError> {
            Ok(ApiResponse {
                status: 200,
                body: br#"{"id":"job-1"}"#.to_vec(),
            })
        }

        async fn download(
            &self,
            _id: &str,
            _file: &str,
            _cookie: &str,
        ) -> Result<ApiResponse, SynthesisError> {
            unreachable!("download must not be called for a bad envelope")
        }
    }

    #[tokio::test]
    async fn test_missing_envelope_fields_not_retried() {
        let client = SapiClient::with_transport(
            Arc::new(BadEnvelopeHttp),
            Duration::from_secs(1800),
            Arc::new(SystemClock),
        );
        let config = TtsConfig::new("Microsoft Zira Desktop");

        let result = client.synthesize("hello", &config).await;
        assert!(matches!(result, Err(SynthesisError::Response(_))));
    }

    #[tokio::test]
    async fn test_token_missing_is_session_error() {
        struct NoTokenHttp;

        #[async_trait]
        impl SapiHttp for NoTokenHttp {
            async fn fetch_page(&self) -> Result<PageResponse, SessionError> {
                Ok(PageResponse {
                    status: 200,
                    body: "<html>no form here</html>".to_string(),
                    set_cookies: vec!["s=1".to_string()],
                })
            }
            async fn synthesize(
                &self,
                _body: serde_json::Value,
                _token: &str,
                _cookie: &str,
            ) -> Result<ApiResponse, SynthesisError> {
                unreachable!()
            }
            async fn download(
                &self,
                _id: &str,
                _file: &str,
                _cookie: &str,
            ) -> Result<ApiResponse, SynthesisError> {
                unreachable!()
            }
        }

        let client = SapiClient::with_transport(
            Arc::new(NoTokenHttp),
            Duration::from_secs(1800),
            Arc::new(SystemClock),
        );
        let config = TtsConfig::new("Microsoft Zira Desktop");

        let result = client.synthesize("hello", &config).await;
        assert!(matches!(
            result,
            Err(SynthesisError::Session(SessionError::TokenMissing))
        ));
    }
}
