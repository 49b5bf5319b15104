//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use readtome_config::Settings;
use readtome_providers::Synthesizer;
use readtome_storage::{BookStore, MemoryBookStore};

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Book/chapter storage collaborator
    pub store: Arc<dyn BookStore>,
    /// Synthesis orchestrator
    pub synthesizer: Arc<Synthesizer>,
}

impl AppState {
    /// State backed by the real provider transports and an empty in-memory
    /// store.
    pub fn new(config: Settings) -> Self {
        let synthesizer = Arc::new(Synthesizer::new(&config.tts));
        Self {
            config: Arc::new(config),
            store: Arc::new(MemoryBookStore::new()),
            synthesizer,
        }
    }

    /// State with injected collaborators, for tests and custom wiring.
    pub fn with_parts(
        config: Settings,
        store: Arc<dyn BookStore>,
        synthesizer: Arc<Synthesizer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            synthesizer,
        }
    }
}
