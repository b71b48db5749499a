use battlemap_core::{wire::PeerMessage, SceneSnapshot, SnapshotId};
use tokio::sync::mpsc::error::TryRecvError;

use crate::{
    link::{GuestTransportEvent, PeerMetadata, TransportError},
    loopback::{GuestEndpoint, LoopbackNetwork},
    SessionId,
};

/// Outcome of offering a payload to a replica.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicaUpdate {
    /// The snapshot replaced the replica's scene.
    Applied(SnapshotId),
    /// The snapshot was not newer than the one held and was discarded.
    Stale {
        /// Identifier of the discarded snapshot.
        incoming: SnapshotId,
        /// Identifier of the snapshot still held.
        held: SnapshotId,
    },
    /// The payload was not a message this replica understands.
    Ignored,
}

/// Read-only copy of the host's scene that only moves forward.
#[derive(Clone, Debug, Default)]
pub struct GuestReplica {
    snapshot: Option<SceneSnapshot>,
}

impl GuestReplica {
    /// Scene currently displayed, if any snapshot arrived yet.
    #[must_use]
    pub fn snapshot(&self) -> Option<&SceneSnapshot> {
        self.snapshot.as_ref()
    }

    /// Applies the snapshot if the replica is empty or it is strictly newer.
    pub fn apply(&mut self, snapshot: SceneSnapshot) -> ReplicaUpdate {
        if let Some(held) = &self.snapshot {
            if snapshot.id <= held.id {
                tracing::debug!(incoming = %snapshot.id, held = %held.id, "discarding stale snapshot");
                return ReplicaUpdate::Stale {
                    incoming: snapshot.id,
                    held: held.id,
                };
            }
        }
        let id = snapshot.id;
        self.snapshot = Some(snapshot);
        ReplicaUpdate::Applied(id)
    }

    /// Decodes a raw payload and applies it when it carries a snapshot.
    ///
    /// Malformed payloads are logged and ignored.
    pub fn receive(&mut self, payload: &str) -> ReplicaUpdate {
        match PeerMessage::decode(payload) {
            Ok(Some(PeerMessage::Snapshot { snapshot })) => self.apply(snapshot),
            Ok(None) => {
                tracing::debug!("ignoring unsupported peer message");
                ReplicaUpdate::Ignored
            }
            Err(error) => {
                tracing::warn!(error = %error, "dropping malformed peer message");
                ReplicaUpdate::Ignored
            }
        }
    }
}

/// Connection status shown to a guest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuestStatus {
    /// Waiting for the connection to open.
    Connecting,
    /// Receiving updates.
    Connected,
    /// The connection closed or failed.
    Disconnected,
}

/// Guest side of a peer session: a replica fed by a mailbox.
#[derive(Debug)]
pub struct GuestSession {
    endpoint: GuestEndpoint,
    metadata: PeerMetadata,
    status: GuestStatus,
    replica: GuestReplica,
}

impl GuestSession {
    /// Connects to the host listening on `session_id`.
    pub fn join(
        network: &LoopbackNetwork,
        session_id: &SessionId,
        metadata: PeerMetadata,
    ) -> Result<Self, TransportError> {
        let endpoint = network.connect(session_id, metadata.clone())?;
        Ok(Self {
            endpoint,
            metadata,
            status: GuestStatus::Connecting,
            replica: GuestReplica::default(),
        })
    }

    /// Drains every queued notification and returns the replica updates they caused.
    pub fn pump(&mut self) -> Vec<ReplicaUpdate> {
        let mut updates = Vec::new();
        loop {
            match self.endpoint.try_recv() {
                Ok(event) => {
                    if let Some(update) = self.handle(event) {
                        updates.push(update);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.status = GuestStatus::Disconnected;
                    break;
                }
            }
        }
        updates
    }

    fn handle(&mut self, event: GuestTransportEvent) -> Option<ReplicaUpdate> {
        match event {
            GuestTransportEvent::Opened => {
                tracing::info!(name = self.metadata.display_name(), "connected to host");
                self.status = GuestStatus::Connected;
                None
            }
            GuestTransportEvent::Data(payload) => Some(self.replica.receive(&payload)),
            GuestTransportEvent::Closed => {
                tracing::info!("host connection closed");
                self.status = GuestStatus::Disconnected;
                None
            }
            GuestTransportEvent::Errored(error) => {
                tracing::warn!(error = %error, "host connection error");
                self.status = GuestStatus::Disconnected;
                None
            }
        }
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> GuestStatus {
        self.status
    }

    /// Whether updates are being received.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == GuestStatus::Connected
    }

    /// Replicated scene.
    #[must_use]
    pub fn replica(&self) -> &GuestReplica {
        &self.replica
    }

    /// Closes the connection and tells the host.
    pub fn leave(&mut self) {
        self.endpoint.disconnect();
        self.status = GuestStatus::Disconnected;
    }

    /// Endpoint used to simulate transport-level notifications.
    #[must_use]
    pub fn endpoint(&self) -> &GuestEndpoint {
        &self.endpoint
    }
}
