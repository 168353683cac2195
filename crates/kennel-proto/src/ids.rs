//! Identifier newtypes.
//!
//! The backend hands out opaque string identifiers. Wrapping them keeps a
//! thread id from being passed where a user id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a registered user (owner or caretaker).
    UserId
);

string_id!(
    /// Identifier of a two-party conversation.
    ThreadId
);

string_id!(
    /// Identifier of a single chat message.
    ///
    /// Server-assigned ids are opaque. Provisional ids minted by the client
    /// carry the [`MessageId::PROVISIONAL_PREFIX`].
    MessageId
);

impl ThreadId {
    /// Thread id for a conversation between two users.
    ///
    /// The pair is ordered before joining so both participants derive the
    /// same id regardless of who starts the conversation.
    pub fn for_pair(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{lo}_{hi}"))
    }

    /// Other participant of a pair thread, if `me` is one of its two ends.
    pub fn counterpart(&self, me: &UserId) -> Option<UserId> {
        let me = me.as_str();
        let other = self
            .0
            .strip_prefix(me)
            .and_then(|rest| rest.strip_prefix('_'))
            .or_else(|| self.0.strip_suffix(me).and_then(|rest| rest.strip_suffix('_')))?;
        (!other.is_empty()).then(|| UserId::new(other))
    }
}

impl MessageId {
    /// Prefix for ids of messages the server has not confirmed yet.
    pub const PROVISIONAL_PREFIX: &'static str = "temp-";

    /// Provisional id for the send correlated by `client_ref`.
    pub fn provisional(client_ref: u64) -> Self {
        Self(format!("{}{client_ref}", Self::PROVISIONAL_PREFIX))
    }

    /// True for ids minted locally by [`MessageId::provisional`].
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(Self::PROVISIONAL_PREFIX)
    }
}

/// Bearer credential for the realtime and REST endpoints.
///
/// Supplied explicitly by the session owner. `Debug` output is redacted so
/// the token never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw bearer token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token, for building handshakes and headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_is_order_independent() {
        let owner = UserId::new("u-owner");
        let sitter = UserId::new("u-sitter");

        assert_eq!(ThreadId::for_pair(&owner, &sitter), ThreadId::for_pair(&sitter, &owner));
        assert_eq!(ThreadId::for_pair(&owner, &sitter).as_str(), "u-owner_u-sitter");
    }

    #[test]
    fn counterpart_from_either_end() {
        let thread = ThreadId::new("u-owner_u-sitter");
        assert_eq!(thread.counterpart(&UserId::new("u-owner")), Some(UserId::new("u-sitter")));
        assert_eq!(thread.counterpart(&UserId::new("u-sitter")), Some(UserId::new("u-owner")));
        assert_eq!(thread.counterpart(&UserId::new("u-other")), None);
        assert_eq!(ThreadId::new("u-owner_").counterpart(&UserId::new("u-owner")), None);
    }

    #[test]
    fn provisional_ids_are_recognized() {
        let id = MessageId::provisional(7);
        assert_eq!(id.as_str(), "temp-7");
        assert!(id.is_provisional());
        assert!(!MessageId::new("64f0c2").is_provisional());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::new("secret-bearer");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert_eq!(token.expose(), "secret-bearer");
    }
}
