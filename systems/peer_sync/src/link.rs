use std::fmt;

/// Identifier of the remote end of a link, as seen by the host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps a transport-assigned peer identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the textual identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata a guest attaches when connecting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerMetadata {
    /// Name the guest chose for itself.
    pub username: Option<String>,
}

impl PeerMetadata {
    /// Metadata carrying a display name.
    #[must_use]
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }

    /// Display name, falling back to `"Unknown"`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Unknown")
    }
}

/// Outbound half of a connection to a single peer.
pub trait PeerLink: fmt::Debug {
    /// Identifier of the remote peer.
    fn peer(&self) -> &PeerId;

    /// Whether the link currently accepts messages.
    fn is_open(&self) -> bool;

    /// Queues a text payload for delivery. Delivery is not acknowledged.
    fn send(&self, payload: &str) -> Result<(), TransportError>;
}

/// Failures reported by a transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The link was closed before the payload could be queued.
    #[error("link to peer {0} is closed")]
    Closed(PeerId),
    /// No host is listening on the requested session.
    #[error("no host is listening on session {0}")]
    UnknownSession(String),
    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// Connectivity states reported by the underlying transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    /// Negotiation has not started.
    New,
    /// Candidates are being checked.
    Checking,
    /// The transport reports a live connection.
    Connected,
    /// The transport lost the connection, possibly temporarily.
    Disconnected,
    /// The transport gave up.
    Failed,
    /// The transport was shut down.
    Closed,
}

/// Notifications delivered to the host's mailbox.
#[derive(Debug)]
pub enum HostTransportEvent {
    /// A guest finished connecting.
    Connected {
        /// Outbound link to the guest.
        link: Box<dyn PeerLink>,
        /// Metadata supplied by the guest.
        metadata: PeerMetadata,
    },
    /// A guest sent a payload.
    Data {
        /// Sender of the payload.
        peer: PeerId,
        /// Raw payload text.
        payload: String,
    },
    /// A guest closed its connection.
    Closed {
        /// Peer that left.
        peer: PeerId,
    },
    /// The connection to a guest reported an error.
    Errored {
        /// Peer whose connection failed.
        peer: PeerId,
        /// Failure reported by the transport.
        error: TransportError,
    },
    /// The transport-level connectivity of a guest link changed.
    ConnectivityChanged {
        /// Peer whose connectivity changed.
        peer: PeerId,
        /// State reported by the transport.
        state: ConnectivityState,
    },
    /// The host's own connection to the signalling service changed.
    Signalling {
        /// Whether new guests can currently reach the host.
        online: bool,
    },
}

/// Notifications delivered to a guest's mailbox.
#[derive(Debug)]
pub enum GuestTransportEvent {
    /// The connection to the host is open.
    Opened,
    /// The host sent a payload.
    Data(String),
    /// The connection to the host closed.
    Closed,
    /// The connection to the host failed.
    Errored(TransportError),
}
