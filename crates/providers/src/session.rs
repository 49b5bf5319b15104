//! Scraped-session cache for the installed-voice front-end
//!
//! One session (anti-forgery token + cookie jar) is shared by every
//! synthesis call the process makes. It is created lazily, dropped on an
//! auth failure or TTL expiry, and recreated transparently on next use.
//! Never persisted; lost on restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Time source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One scraped front-end session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Anti-forgery token scraped from the hidden form input
    pub token: String,
    /// Joined `Set-Cookie` values
    pub cookie: String,
    created_at: Instant,
}

/// Process-wide session cache with TTL.
pub struct SessionStore {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            current: Mutex::new(None),
        }
    }

    /// Return the cached session if it is still within its TTL.
    pub fn get(&self) -> Option<Session> {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some(session) if !self.is_expired(session) => Some(session.clone()),
            Some(_) => {
                *current = None;
                None
            }
            None => None,
        }
    }

    /// Cache a freshly scraped session.
    pub fn put(&self, token: String, cookie: String) -> Session {
        let session = Session {
            token,
            cookie,
            created_at: self.clock.now(),
        };
        *self.current.lock() = Some(session.clone());
        session
    }

    /// Drop the cached session (auth failure recovery).
    pub fn invalidate(&self) {
        *self.current.lock() = None;
    }

    pub fn is_expired(&self, session: &Session) -> bool {
        self.clock.now().duration_since(session.created_at) >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Manually advanced clock.
    pub(crate) struct FakeClock {
        now: Mutex<Instant>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    #[test]
    fn test_empty_store() {
        let store = SessionStore::new(Duration::from_secs(1800), Arc::new(SystemClock));
        assert!(store.get().is_none());
    }

    #[test]
    fn test_session_reused_within_ttl() {
        let clock = Arc::new(FakeClock::new());
        let store = SessionStore::new(Duration::from_secs(1800), clock.clone());

        store.put("tok".into(), "a=1".into());
        clock.advance(Duration::from_secs(1799));
        assert_eq!(store.get().unwrap().token, "tok");
    }

    #[test]
    fn test_session_expires_after_ttl() {
        let clock = Arc::new(FakeClock::new());
        let store = SessionStore::new(Duration::from_secs(1800), clock.clone());

        store.put("tok".into(), "a=1".into());
        clock.advance(Duration::from_secs(1800));
        assert!(store.get().is_none());
    }

    #[test]
    fn test_invalidate_drops_session() {
        let store = SessionStore::new(Duration::from_secs(1800), Arc::new(SystemClock));
        store.put("tok".into(), "a=1".into());
        store.invalidate();
        assert!(store.get().is_none());
    }
}
