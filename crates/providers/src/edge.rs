//! Edge neural TTS client
//!
//! Every synthesis call opens its own streaming socket, so calls are
//! parallel-safe with no shared session state. Audio arrives as binary
//! frames (big-endian u16 header length, then a `Path:audio` header block,
//! then raw MP3 bytes) and is buffered fully before returning.
//!
//! The batch helper fans chapters out in fixed-size waves: a wave is fully
//! settled before the next starts, which keeps open sockets bounded. Results
//! land in slots indexed by original position, never by completion order.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use readtome_codec::strip_chunk;
use readtome_core::{SynthesisError, TtsConfig};

const EDGE_VOICES_URL: &str =
    "https://speech.platform.bing.com/consumer/speech/synthesize/readaloud/voices/list";

/// Public token used by the Edge read-aloud endpoint.
const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";

const OUTPUT_FORMAT: &str = "audio-24khz-96kbitrate-mono-mp3";

/// One streaming synthesis connection per call.
#[async_trait]
pub trait SpeechTransport: Send + Sync {
    /// Open a fresh socket, stream the SSML request, and return the fully
    /// buffered MP3 bytes.
    async fn stream_audio(&self, ssml: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Real websocket transport against the Edge read-aloud endpoint.
pub struct WsSpeechTransport {
    endpoint: String,
}

impl WsSpeechTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

fn transport_err(e: impl std::fmt::Display) -> SynthesisError {
    SynthesisError::Transport(e.to_string())
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

#[async_trait]
impl SpeechTransport for WsSpeechTransport {
    async fn stream_audio(&self, ssml: &str) -> Result<Vec<u8>, SynthesisError> {
        let url = format!(
            "{}?TrustedClientToken={}&ConnectionId={}",
            self.endpoint,
            TRUSTED_CLIENT_TOKEN,
            Uuid::new_v4().simple()
        );

        let (mut ws, _) = connect_async(&url).await.map_err(transport_err)?;

        let ts = timestamp();
        let config_msg = format!(
            "X-Timestamp:{ts}\r\nContent-Type:application/json; charset=utf-8\r\nPath:speech.config\r\n\r\n\
             {{\"context\":{{\"synthesis\":{{\"audio\":{{\"metadataoptions\":\
             {{\"sentenceBoundaryEnabled\":\"false\",\"wordBoundaryEnabled\":\"false\"}},\
             \"outputFormat\":\"{OUTPUT_FORMAT}\"}}}}}}}}"
        );
        ws.send(Message::Text(config_msg)).await.map_err(transport_err)?;

        let request_id = Uuid::new_v4().simple().to_string();
        let ssml_msg = format!(
            "X-RequestId:{request_id}\r\nContent-Type:application/ssml+xml\r\n\
             X-Timestamp:{ts}\r\nPath:ssml\r\n\r\n{ssml}"
        );
        ws.send(Message::Text(ssml_msg)).await.map_err(transport_err)?;

        let mut audio = Vec::new();
        while let Some(msg) = ws.next().await {
            match msg.map_err(transport_err)? {
                Message::Text(text) => {
                    if text.contains("Path:turn.end") {
                        break;
                    }
                }
                Message::Binary(data) => {
                    if data.len() < 2 {
                        continue;
                    }
                    let header_len = u16::from_be_bytes([data[0], data[1]]) as usize;
                    if data.len() < 2 + header_len {
                        continue;
                    }
                    let header = &data[2..2 + header_len];
                    if header.windows(10).any(|w| w == b"Path:audio") {
                        audio.extend_from_slice(&data[2 + header_len..]);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        let _ = ws.close(None).await;

        if audio.is_empty() {
            return Err(SynthesisError::response("no audio frames received"));
        }
        Ok(audio)
    }
}

/// Escape text for embedding in SSML.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the SSML document for one chunk.
///
/// Prosody attributes appear only when the caller set the matching config
/// field; with nothing set, the text goes in bare and the voice's own
/// defaults apply.
fn build_ssml(text: &str, config: &TtsConfig) -> String {
    let body = escape_xml(text);

    let mut prosody_attrs = String::new();
    if let Some(rate) = config.rate {
        let pct = ((rate - 1.0) * 100.0).round() as i64;
        prosody_attrs.push_str(&format!(" rate='{pct:+}%'"));
    }
    if let Some(pitch) = &config.pitch {
        prosody_attrs.push_str(&format!(" pitch='{}'", escape_xml(pitch)));
    }
    if let Some(volume) = config.volume {
        let pct = volume as i64 - 100;
        prosody_attrs.push_str(&format!(" volume='{pct:+}%'"));
    }

    let inner = if prosody_attrs.is_empty() {
        body
    } else {
        format!("<prosody{prosody_attrs}>{body}</prosody>")
    };

    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>\
         <voice name='{}'>{inner}</voice></speak>",
        escape_xml(&config.voice)
    )
}

/// Edge TTS client.
pub struct EdgeClient {
    transport: Arc<dyn SpeechTransport>,
    concurrency: usize,
}

impl EdgeClient {
    /// Client backed by the real websocket transport.
    pub fn new(endpoint: impl Into<String>, concurrency: usize) -> Self {
        Self::with_transport(Arc::new(WsSpeechTransport::new(endpoint)), concurrency)
    }

    pub fn with_transport(transport: Arc<dyn SpeechTransport>, concurrency: usize) -> Self {
        Self {
            transport,
            concurrency: concurrency.max(1),
        }
    }

    /// Synthesize a single chunk of text into a still-tagged MP3 buffer.
    pub async fn synthesize(
        &self,
        text: &str,
        config: &TtsConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        let ssml = build_ssml(text, config);
        self.transport.stream_audio(&ssml).await
    }

    /// Synthesize chapters in concurrency-bounded waves, sanitize each chunk,
    /// and concatenate in original input order.
    pub async fn synthesize_chapters(
        &self,
        texts: &[String],
        config: &TtsConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut slots: Vec<Vec<u8>> = vec![Vec::new(); texts.len()];

        for (wave_index, wave) in texts.chunks(self.concurrency).enumerate() {
            let wave_start = wave_index * self.concurrency;
            tracing::debug!(
                wave = wave_index,
                size = wave.len(),
                "starting synthesis wave"
            );

            let tasks = wave.iter().map(|text| self.synthesize(text, config));
            // Every task in the wave settles before results are inspected, so
            // a failure never leaves sockets of the same wave dangling.
            let results = futures::future::join_all(tasks).await;

            for (offset, result) in results.into_iter().enumerate() {
                slots[wave_start + offset] = strip_chunk(&result?);
            }
        }

        Ok(slots.concat())
    }
}

/// One entry from the provider's voice catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ShortName")]
    pub short_name: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Locale")]
    pub locale: String,
    #[serde(rename = "FriendlyName", default)]
    pub friendly_name: String,
}

/// Fetch the voice catalog and keep only en-US voices.
pub async fn list_en_us_voices() -> Result<Vec<Voice>, SynthesisError> {
    let client = reqwest::Client::new();
    let response = client
        .get(EDGE_VOICES_URL)
        .query(&[("trustedclienttoken", TRUSTED_CLIENT_TOKEN)])
        .send()
        .await
        .map_err(transport_err)?;

    if !response.status().is_success() {
        return Err(SynthesisError::HttpStatus(response.status().as_u16()));
    }

    let all: Vec<Voice> = response
        .json()
        .await
        .map_err(|e| SynthesisError::response(format!("voice list: {e}")))?;

    Ok(all.into_iter().filter(|v| v.locale == "en-US").collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_ssml_escapes_text() {
        let config = TtsConfig::new("en-US-AriaNeural");
        let ssml = build_ssml("Tom & Jerry <3 \"cheese\"", &config);
        assert!(ssml.contains("Tom &amp; Jerry &lt;3 &quot;cheese&quot;"));
        assert!(!ssml.contains("<3"));
    }

    #[test]
    fn test_ssml_omits_prosody_when_unset() {
        let config = TtsConfig::new("en-US-AriaNeural");
        let ssml = build_ssml("hello", &config);
        assert!(!ssml.contains("<prosody"));
        assert!(ssml.contains("<voice name='en-US-AriaNeural'>hello</voice>"));
    }

    #[test]
    fn test_ssml_prosody_attributes() {
        let config = TtsConfig::new("en-US-AriaNeural")
            .with_rate(1.5)
            .with_pitch("+2Hz")
            .with_volume(80);
        let ssml = build_ssml("hello", &config);
        assert!(ssml.contains("rate='+50%'"));
        assert!(ssml.contains("pitch='+2Hz'"));
        assert!(ssml.contains("volume='-20%'"));
    }

    #[test]
    fn test_ssml_rate_only() {
        let config = TtsConfig::new("en-US-AriaNeural").with_rate(0.8);
        let ssml = build_ssml("hello", &config);
        assert!(ssml.contains("<prosody rate='-20%'>"));
        assert!(!ssml.contains("pitch"));
        assert!(!ssml.contains("volume"));
    }

    /// Transport that sleeps a per-text delay and echoes the text back as
    /// fake audio. Also tracks the in-flight high-water mark.
    struct DelayTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl DelayTransport {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn delay_for(ssml: &str) -> Duration {
            // Later chapters finish first to exercise out-of-order completion.
            if ssml.contains("one") {
                Duration::from_millis(50)
            } else if ssml.contains("two") {
                Duration::from_millis(10)
            } else {
                Duration::from_millis(30)
            }
        }
    }

    #[async_trait]
    impl SpeechTransport for DelayTransport {
        async fn stream_audio(&self, ssml: &str) -> Result<Vec<u8>, SynthesisError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Self::delay_for(ssml)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            // Extract the text between the voice tags.
            let open = "<voice name='en-US-AriaNeural'>";
            let start = ssml.find(open).unwrap() + open.len();
            let end = ssml[start..].find("</voice>").unwrap() + start;
            Ok(format!("[{}]", &ssml[start..end]).into_bytes())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wave_output_matches_input_order() {
        let transport = Arc::new(DelayTransport::new());
        let client = EdgeClient::with_transport(transport.clone(), 2);

        let texts: Vec<String> = ["one", "two", "three"].iter().map(|s| s.to_string()).collect();
        let config = TtsConfig::new("en-US-AriaNeural");

        let buf = client.synthesize_chapters(&texts, &config).await.unwrap();
        // Fake chunks carry no frame sync, so the sanitizer leaves them as-is
        // and ordering is directly observable.
        assert_eq!(String::from_utf8(buf).unwrap(), "[one][two][three]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wave_bounds_concurrency() {
        let transport = Arc::new(DelayTransport::new());
        let client = EdgeClient::with_transport(transport.clone(), 2);

        let texts: Vec<String> = (0..7).map(|i| format!("chapter {i}")).collect();
        let config = TtsConfig::new("en-US-AriaNeural");

        client.synthesize_chapters(&texts, &config).await.unwrap();
        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    /// Transport that fails for one specific chapter.
    struct FailingTransport;

    #[async_trait]
    impl SpeechTransport for FailingTransport {
        async fn stream_audio(&self, ssml: &str) -> Result<Vec<u8>, SynthesisError> {
            if ssml.contains("bad") {
                Err(SynthesisError::Transport("connection reset".into()))
            } else {
                Ok(b"ok".to_vec())
            }
        }
    }

    #[tokio::test]
    async fn test_one_failed_chunk_aborts_batch() {
        let client = EdgeClient::with_transport(Arc::new(FailingTransport), 3);
        let texts: Vec<String> = ["good", "bad", "good"].iter().map(|s| s.to_string()).collect();
        let config = TtsConfig::new("en-US-AriaNeural");

        let result = client.synthesize_chapters(&texts, &config).await;
        assert!(matches!(result, Err(SynthesisError::Transport(_))));
    }
}
