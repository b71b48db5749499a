#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Best-effort replication of the host's scene to read-only guests.
//!
//! The host owns a [`HostSession`] that pushes full [`SceneSnapshot`]
//! envelopes to every open [`PeerLink`]. Guests hold a [`GuestReplica`] that
//! only ever moves forward: a snapshot is applied when the replica is empty
//! or the incoming identifier is strictly greater than the one it holds.
//! Transport notifications never call back into the editor; they are queued
//! on typed mailboxes that the owner drains when convenient.
//!
//! [`SceneSnapshot`]: battlemap_core::SceneSnapshot

use std::fmt;

use rand::Rng;

mod guest;
mod host;
mod link;
mod loopback;
mod session;

pub use guest::{GuestReplica, GuestSession, GuestStatus, ReplicaUpdate};
pub use host::HostSession;
pub use link::{
    ConnectivityState, GuestTransportEvent, HostTransportEvent, PeerId, PeerLink, PeerMetadata,
    TransportError,
};
pub use loopback::{ChannelLink, GuestEndpoint, LoopbackNetwork};
pub use session::{session_id_for, MemorySessionIds, SessionIdStore};

const SESSION_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SESSION_SUFFIX_LEN: usize = 13;

/// Identifier guests use to reach a host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing session identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates `<map name>-<random base36 suffix>`.
    pub fn generate<R: Rng + ?Sized>(map_name: &str, rng: &mut R) -> Self {
        let suffix: String = (0..SESSION_SUFFIX_LEN)
            .map(|_| {
                let index = rng.gen_range(0..SESSION_SUFFIX_ALPHABET.len());
                char::from(SESSION_SUFFIX_ALPHABET[index])
            })
            .collect();
        Self(format!("{map_name}-{suffix}"))
    }

    /// Borrows the textual identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the link a host shares with guests.
#[must_use]
pub fn invite_link(origin: &str, session_id: &SessionId, map_name: &str) -> String {
    format!(
        "{}/map-view?connectionId={session_id}&mapName={map_name}",
        origin.trim_end_matches('/')
    )
}

/// Short description of the host's connectivity for a toolbar badge.
#[must_use]
pub fn host_status_label(signalling_online: bool, peer_count: usize) -> String {
    if !signalling_online {
        "Reconnecting...".to_owned()
    } else if peer_count == 0 {
        "No peers connected".to_owned()
    } else {
        format!("{peer_count} peer(s) connected")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generated_session_ids_are_prefixed_with_map_name() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let id = SessionId::generate("crypt", &mut rng);
        let (prefix, suffix) = id.as_str().split_once('-').expect("dash separator");
        assert_eq!(prefix, "crypt");
        assert_eq!(suffix.len(), SESSION_SUFFIX_LEN);
        assert!(suffix
            .bytes()
            .all(|byte| SESSION_SUFFIX_ALPHABET.contains(&byte)));
    }

    #[test]
    fn status_label_reflects_peer_count() {
        assert_eq!(host_status_label(true, 0), "No peers connected");
        assert_eq!(host_status_label(true, 2), "2 peer(s) connected");
        assert_eq!(host_status_label(false, 2), "Reconnecting...");
    }

    #[test]
    fn invite_link_embeds_session_and_map() {
        let link = invite_link("https://maps.example/", &SessionId::new("crypt-abc"), "crypt");
        assert_eq!(
            link,
            "https://maps.example/map-view?connectionId=crypt-abc&mapName=crypt"
        );
    }
}
