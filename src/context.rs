//! Per-session HTTP context.

use crate::error::{Result, SwarmError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies one synthetic session as `wave-ordinal`, e.g. `3-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub wave: u64,
    /// 1-based position within the wave.
    pub ordinal: usize,
}

impl SessionId {
    pub fn new(wave: u64, ordinal: usize) -> Self {
        Self { wave, ordinal }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wave, self.ordinal)
    }
}

/// HTTP state owned by exactly one session.
///
/// Each context has its own client and therefore its own cookie jar and
/// connection pool. Contexts are never cloned or handed to another session;
/// dropping one discards its cookies.
pub struct SessionContext {
    id: SessionId,
    client: reqwest::Client,
}

impl SessionContext {
    /// Build a fresh context with an empty cookie jar.
    ///
    /// `timeout` bounds every request issued through this context.
    pub fn new(id: SessionId, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(SwarmError::Client)?;
        Ok(Self { id, client })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext").field("id", &self.id).finish()
    }
}
