//! Read To Me Server
//!
//! HTTP endpoints for the audio-export pipeline.

pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;
