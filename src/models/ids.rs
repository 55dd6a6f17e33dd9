//! Player identifiers.
//!
//! The remote service issues opaque ids. Records seeded before their id was
//! known carry a ghost identity that remembers the username they were seen
//! under.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix used by older imports to mark records without a remote id.
const LEGACY_GHOST_PREFIX: &str = "NOTSET";

/// A canonical id issued by the remote stats service.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a raw input looks like a remote id (24 hex digits).
    pub fn looks_like_id(input: &str) -> bool {
        input.len() == 24 && input.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity state of a cached player.
///
/// Every player-owned row (ratings, character aggregates, rating log) is keyed
/// by the owner's identity, so ghost records can hold history before they are
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PlayerIdentity {
    Resolved { id: PlayerId },
    Ghost { observed_username: String },
}

impl PlayerIdentity {
    pub fn resolved(id: impl Into<PlayerId>) -> Self {
        PlayerIdentity::Resolved { id: id.into() }
    }

    /// Ghost usernames are stored lowercased.
    pub fn ghost(username: &str) -> Self {
        PlayerIdentity::Ghost {
            observed_username: username.to_lowercase(),
        }
    }

    /// Interpret an id column from an older import, where ghosts were written
    /// as `NOTSET...` strings.
    pub fn from_legacy(raw_id: &str, username: &str) -> Self {
        if raw_id.starts_with(LEGACY_GHOST_PREFIX) {
            Self::ghost(username)
        } else {
            Self::resolved(raw_id)
        }
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self, PlayerIdentity::Ghost { .. })
    }

    /// The canonical id, if resolved.
    pub fn id(&self) -> Option<&PlayerId> {
        match self {
            PlayerIdentity::Resolved { id } => Some(id),
            PlayerIdentity::Ghost { .. } => None,
        }
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerIdentity::Resolved { id } => write!(f, "{}", id),
            PlayerIdentity::Ghost { observed_username } => {
                write!(f, "ghost({})", observed_username)
            }
        }
    }
}

impl From<PlayerId> for PlayerIdentity {
    fn from(id: PlayerId) -> Self {
        PlayerIdentity::Resolved { id }
    }
}
