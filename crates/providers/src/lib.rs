//! TTS provider clients and synthesis orchestration
//!
//! Two independent backends fulfil the same contract:
//! - [`edge`]: cloud neural TTS; one streaming socket per chunk,
//!   concurrency-bounded wave fan-out.
//! - [`sapi`]: installed-voice catalog behind a public web front-end;
//!   scraped anti-forgery session, strictly serialized requests.
//!
//! The [`orchestrator`] selects a backend per request, preserves chapter
//! order through whatever concurrency the backend uses, and runs the final
//! container repair pass over the concatenated result.

pub mod edge;
pub mod orchestrator;
pub mod sapi;
pub mod session;

pub use edge::{EdgeClient, SpeechTransport, Voice, WsSpeechTransport};
pub use orchestrator::Synthesizer;
pub use sapi::{ReqwestSapiHttp, SapiClient, SapiHttp};
pub use session::{Clock, Session, SessionStore, SystemClock};
