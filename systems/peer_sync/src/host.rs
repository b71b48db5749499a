use battlemap_core::{wire::PeerMessage, SceneSnapshot};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

use crate::{
    link::{ConnectivityState, HostTransportEvent, PeerId, PeerLink, PeerMetadata},
    SessionId,
};

#[derive(Debug)]
struct Connection {
    link: Box<dyn PeerLink>,
    metadata: PeerMetadata,
    healthy: bool,
}

/// Host side of a peer session.
///
/// Keeps the set of connected guests and fans full snapshots out to them.
/// Every failure is logged and absorbed; nothing here ever aborts a
/// broadcast or reaches the editor as an error.
#[derive(Debug)]
pub struct HostSession {
    session_id: SessionId,
    mailbox: UnboundedReceiver<HostTransportEvent>,
    connections: Vec<Connection>,
    latest: Option<SceneSnapshot>,
    signalling_online: bool,
}

impl HostSession {
    /// Creates a host listening on `mailbox` under `session_id`.
    #[must_use]
    pub fn new(session_id: SessionId, mailbox: UnboundedReceiver<HostTransportEvent>) -> Self {
        tracing::info!(session = %session_id, "hosting peer session");
        Self {
            session_id,
            mailbox,
            connections: Vec::new(),
            latest: None,
            signalling_online: true,
        }
    }

    /// Identifier guests use to reach this host.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Drains every queued transport notification and drops dead links.
    ///
    /// Returns the number of notifications handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.mailbox.try_recv() {
                Ok(event) => {
                    self.handle(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.signalling_online {
                        tracing::warn!(session = %self.session_id, "host mailbox disconnected");
                        self.signalling_online = false;
                    }
                    break;
                }
            }
        }
        self.prune();
        handled
    }

    /// Reacts to a single transport notification.
    pub fn handle(&mut self, event: HostTransportEvent) {
        match event {
            HostTransportEvent::Connected { link, metadata } => {
                tracing::info!(
                    peer = %link.peer(),
                    name = metadata.display_name(),
                    "guest connected"
                );
                let mut connection = Connection {
                    link,
                    metadata,
                    healthy: true,
                };
                if let Some(latest) = &self.latest {
                    match PeerMessage::snapshot(latest.clone()).encode() {
                        Ok(payload) => {
                            let _ = deliver(&mut connection, &payload);
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "failed to encode snapshot");
                        }
                    }
                }
                self.connections.push(connection);
            }
            HostTransportEvent::Data { peer, payload } => {
                tracing::debug!(peer = %peer, bytes = payload.len(), "ignoring guest payload");
            }
            HostTransportEvent::Closed { peer } => {
                tracing::info!(peer = %peer, "guest connection closed");
                self.remove(&peer);
            }
            HostTransportEvent::Errored { peer, error } => {
                tracing::warn!(peer = %peer, error = %error, "guest connection error");
                self.remove(&peer);
            }
            HostTransportEvent::ConnectivityChanged { peer, state } => match state {
                // A link is only registered once it is open, so a further
                // `Connected` report is the transport's teardown signal.
                ConnectivityState::Connected
                | ConnectivityState::Disconnected
                | ConnectivityState::Failed
                | ConnectivityState::Closed => {
                    tracing::info!(peer = %peer, state = ?state, "guest connection is not open");
                    self.remove(&peer);
                }
                ConnectivityState::New | ConnectivityState::Checking => {
                    tracing::debug!(peer = %peer, state = ?state, "guest connection is open or starting");
                }
            },
            HostTransportEvent::Signalling { online } => {
                if online != self.signalling_online {
                    tracing::info!(online, "signalling connectivity changed");
                }
                self.signalling_online = online;
            }
        }
    }

    /// Sends a full snapshot to every open link.
    ///
    /// Closed links are skipped. Links whose send fails are logged and
    /// dropped on the next [`HostSession::pump`]. Returns the number of
    /// guests the snapshot was queued for.
    pub fn broadcast(&mut self, snapshot: &SceneSnapshot) -> usize {
        self.latest = Some(snapshot.clone());
        let payload = match PeerMessage::snapshot(snapshot.clone()).encode() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "failed to encode snapshot");
                return 0;
            }
        };

        let mut delivered = 0;
        for connection in &mut self.connections {
            if !connection.link.is_open() {
                continue;
            }
            if deliver(connection, &payload) {
                delivered += 1;
            }
        }
        tracing::debug!(snapshot = %snapshot.id, delivered, "broadcast snapshot");
        delivered
    }

    /// Number of guests currently tracked.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|connection| connection.healthy)
            .count()
    }

    /// Display names of the tracked guests.
    #[must_use]
    pub fn peer_names(&self) -> Vec<&str> {
        self.connections
            .iter()
            .filter(|connection| connection.healthy)
            .map(|connection| connection.metadata.display_name())
            .collect()
    }

    /// Whether new guests can currently reach the host.
    #[must_use]
    pub fn signalling_online(&self) -> bool {
        self.signalling_online
    }

    fn remove(&mut self, peer: &PeerId) {
        self.connections
            .retain(|connection| connection.link.peer() != peer);
    }

    fn prune(&mut self) {
        self.connections.retain(|connection| connection.healthy);
    }
}

fn deliver(connection: &mut Connection, payload: &str) -> bool {
    match connection.link.send(payload) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(
                peer = %connection.link.peer(),
                error = %error,
                "failed to send snapshot"
            );
            connection.healthy = false;
            false
        }
    }
}
