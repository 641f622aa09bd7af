use std::fmt;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::protocol::registry::Revision;
use super::{Error, Result};

/// Identifier of a device in the mesh
///
/// Unique within a mesh at a point in time; devices reuse their uid across
/// power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(pub u8);

impl Uid {
    /// Address every peripheral answers a `Scan` on
    pub const BROADCAST: Uid = Uid(0xFF);

    /// Creates a new uid
    pub fn new(raw: u8) -> Self {
        Uid(raw)
    }

    /// Returns the raw wire value
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// Returns whether this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Uid::BROADCAST
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for a mesh segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Protocol revision spoken on this segment
    pub revision: Revision,
    /// How long the gateway waits for a response before giving up
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub response_timeout: Duration,
    /// Maximum number of requests outstanding at once
    pub max_pending: usize,
}

impl Config {
    /// Checks the configuration for values the gateway cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.response_timeout.is_zero() {
            return Err(Error::config("response_timeout must be greater than zero"));
        }
        if self.max_pending == 0 {
            return Err(Error::config("max_pending must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            revision: Revision::LATEST,
            response_timeout: Duration::from_millis(super::DEFAULT_RESPONSE_TIMEOUT_MS),
            max_pending: super::DEFAULT_MAX_PENDING,
        }
    }
}
