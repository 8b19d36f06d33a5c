//! Identity and conversation keying types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Character joining the two identities of a [`ConversationKey`] in its
/// string form.
pub const KEY_SEPARATOR: char = '-';

/// The name of a peer.
///
/// Opaque to peerchat: uniqueness is the directory's job, not ours.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The local name of this identity.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty name, which no peer can be addressed by.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Canonical, unordered pair of identities indexing one conversation.
///
/// The pair is stored lexicographically ordered, so `new(a, b) == new(b, a)`.
/// The string form is `low-high`. Two different pairs can share a string form
/// when an identity contains [`KEY_SEPARATOR`]; the struct itself never
/// collides.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    low: Identity,
    high: Identity,
}

impl ConversationKey {
    /// Build the canonical key for a pair of identities.
    pub fn new(a: &Identity, b: &Identity) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    /// The lexicographically smaller identity.
    pub fn low(&self) -> &Identity {
        &self.low
    }

    /// The lexicographically larger identity.
    pub fn high(&self) -> &Identity {
        &self.high
    }

    /// Whether `id` is one of the two participants.
    pub fn contains(&self, id: &Identity) -> bool {
        &self.low == id || &self.high == id
    }

    /// The participant that is not `me`, if `me` takes part at all.
    pub fn peer_of(&self, me: &Identity) -> Option<&Identity> {
        if &self.low == me {
            Some(&self.high)
        } else if &self.high == me {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.low, KEY_SEPARATOR, self.high)
    }
}

impl fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConversationKey({})", self)
    }
}
