//! In-process transport wiring hosts and guests over unbounded channels.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use tokio::sync::mpsc::{
    error::TryRecvError, unbounded_channel, UnboundedReceiver, UnboundedSender,
};

use crate::{
    link::{
        ConnectivityState, GuestTransportEvent, HostTransportEvent, PeerId, PeerLink,
        PeerMetadata, TransportError,
    },
    SessionId,
};

/// Registry of hosts reachable in the current process.
#[derive(Clone, Debug, Default)]
pub struct LoopbackNetwork {
    hosts: Rc<RefCell<HashMap<SessionId, UnboundedSender<HostTransportEvent>>>>,
    next_peer: Rc<Cell<u64>>,
}

impl LoopbackNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a host and returns the mailbox its notifications arrive on.
    ///
    /// Registering the same session again replaces the previous host.
    #[must_use]
    pub fn listen(&self, session_id: &SessionId) -> UnboundedReceiver<HostTransportEvent> {
        let (sender, receiver) = unbounded_channel();
        if self
            .hosts
            .borrow_mut()
            .insert(session_id.clone(), sender)
            .is_some()
        {
            tracing::debug!(session = %session_id, "replacing loopback host");
        }
        receiver
    }

    /// Opens a connection from a new guest to the host on `session_id`.
    pub fn connect(
        &self,
        session_id: &SessionId,
        metadata: PeerMetadata,
    ) -> Result<GuestEndpoint, TransportError> {
        let host = self
            .hosts
            .borrow()
            .get(session_id)
            .cloned()
            .ok_or_else(|| TransportError::UnknownSession(session_id.to_string()))?;

        let serial = self.next_peer.get() + 1;
        self.next_peer.set(serial);
        let peer = PeerId::new(format!("guest-{serial}"));
        let open = Rc::new(Cell::new(true));
        let (sender, events) = unbounded_channel();

        let link = ChannelLink {
            peer: peer.clone(),
            sender: sender.clone(),
            open: Rc::clone(&open),
        };
        host.send(HostTransportEvent::Connected {
            link: Box::new(link),
            metadata,
        })
        .map_err(|_| TransportError::UnknownSession(session_id.to_string()))?;
        sender
            .send(GuestTransportEvent::Opened)
            .map_err(|_| TransportError::Closed(peer.clone()))?;

        Ok(GuestEndpoint {
            peer,
            events,
            host,
            open,
        })
    }
}

/// Host-side link that writes into a guest's mailbox.
#[derive(Debug)]
pub struct ChannelLink {
    peer: PeerId,
    sender: UnboundedSender<GuestTransportEvent>,
    open: Rc<Cell<bool>>,
}

impl PeerLink for ChannelLink {
    fn peer(&self) -> &PeerId {
        &self.peer
    }

    fn is_open(&self) -> bool {
        self.open.get() && !self.sender.is_closed()
    }

    fn send(&self, payload: &str) -> Result<(), TransportError> {
        self.sender
            .send(GuestTransportEvent::Data(payload.to_owned()))
            .map_err(|_| TransportError::Closed(self.peer.clone()))
    }
}

/// Guest-side end of a loopback connection.
#[derive(Debug)]
pub struct GuestEndpoint {
    peer: PeerId,
    events: UnboundedReceiver<GuestTransportEvent>,
    host: UnboundedSender<HostTransportEvent>,
    open: Rc<Cell<bool>>,
}

impl GuestEndpoint {
    /// Identifier the host knows this guest by.
    #[must_use]
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Pulls the next queued notification without blocking.
    pub fn try_recv(&mut self) -> Result<GuestTransportEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Closes the connection and notifies the host.
    pub fn disconnect(&mut self) {
        if !self.open.replace(false) {
            return;
        }
        self.events.close();
        self.notify_host(HostTransportEvent::Closed {
            peer: self.peer.clone(),
        });
    }

    /// Reports a transport connectivity change to the host.
    pub fn report_connectivity(&self, state: ConnectivityState) {
        self.notify_host(HostTransportEvent::ConnectivityChanged {
            peer: self.peer.clone(),
            state,
        });
    }

    /// Reports a transport failure to the host.
    pub fn report_error(&self, error: TransportError) {
        self.notify_host(HostTransportEvent::Errored {
            peer: self.peer.clone(),
            error,
        });
    }

    fn notify_host(&self, event: HostTransportEvent) {
        if self.host.send(event).is_err() {
            tracing::debug!(peer = %self.peer, "host is no longer listening");
        }
    }
}
