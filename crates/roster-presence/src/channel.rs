//! The shared presence connection.
//!
//! State machine: `Disconnected → Connecting → Connected → Disconnected`.
//! Only [`PresenceChannel::connect`] leaves `Disconnected`; an explicit
//! [`PresenceChannel::disconnect`] or a transport failure returns there.
//! There is no automatic reconnection.
//!
//! Subscriptions are keyed by event name and hold an ordered list of
//! `(token, handler)` pairs, so unsubscribing removes only the caller's own
//! handler.

use std::{
  collections::HashMap,
  fmt,
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::{
  Result,
  protocol::{ControlMessage, Identity, InboundEvent, decode_inbound},
  transport::Transport,
};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Disconnected,
  Connecting,
  Connected,
}

/// Handle returned by [`PresenceChannel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

// ─── Internal state ──────────────────────────────────────────────────────────

struct Inner {
  state:         ConnectionState,
  transport:     Box<dyn Transport>,
  identity:      Option<Identity>,
  connection_id: Option<String>,
  handlers:      HashMap<String, Vec<(SubscriptionId, Handler)>>,
  next_token:    u64,
  /// Bumped every time a connection ends; presence observed under an older
  /// epoch is stale.
  epoch:         u64,
}

impl Inner {
  fn send(&mut self, message: &ControlMessage) -> Result<()> {
    let frame = message.encode()?;
    self.transport.send(frame)?;
    Ok(())
  }

  /// Send if connected. Messages emitted while disconnected are dropped.
  fn emit(&mut self, message: ControlMessage) -> bool {
    if self.state != ConnectionState::Connected {
      debug!(
        event = message.name(),
        "presence channel not connected; dropping control message"
      );
      return false;
    }
    match self.send(&message) {
      Ok(()) => true,
      Err(e) => {
        warn!(error = %e, event = message.name(), "presence send failed");
        self.reset();
        false
      }
    }
  }

  fn reset(&mut self) {
    self.transport.close();
    self.state = ConnectionState::Disconnected;
    self.identity = None;
    self.connection_id = None;
    self.epoch += 1;
  }
}

// ─── Channel ─────────────────────────────────────────────────────────────────

/// One presence connection shared by every component of a client session.
///
/// Cloning is cheap and yields another handle to the same connection.
#[derive(Clone)]
pub struct PresenceChannel {
  inner: Arc<Mutex<Inner>>,
}

/// A non-owning handle, used by views so their handlers do not keep the
/// channel alive.
#[derive(Clone)]
pub(crate) struct WeakChannel(Weak<Mutex<Inner>>);

impl WeakChannel {
  pub(crate) fn upgrade(&self) -> Option<PresenceChannel> {
    self.0.upgrade().map(|inner| PresenceChannel { inner })
  }
}

impl fmt::Debug for PresenceChannel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = self.lock();
    f.debug_struct("PresenceChannel")
      .field("state", &inner.state)
      .field("connection_id", &inner.connection_id)
      .finish_non_exhaustive()
  }
}

impl PresenceChannel {
  pub fn new(transport: impl Transport) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        state:         ConnectionState::Disconnected,
        transport:     Box::new(transport),
        identity:      None,
        connection_id: None,
        handlers:      HashMap::new(),
        next_token:    0,
        epoch:         0,
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub(crate) fn downgrade(&self) -> WeakChannel {
    WeakChannel(Arc::downgrade(&self.inner))
  }

  // ── Connection lifecycle ──────────────────────────────────────────────

  /// Open the connection and announce `identity`.
  ///
  /// A no-op if a connection already exists. A failure to connect is logged
  /// and leaves the channel `Disconnected`; it is not an error for the
  /// caller.
  pub fn connect(&self, identity: Identity) -> ConnectionState {
    let mut inner = self.lock();
    if inner.state != ConnectionState::Disconnected {
      debug!(state = ?inner.state, "presence channel already connected");
      return inner.state;
    }

    inner.state = ConnectionState::Connecting;
    match inner.transport.open() {
      Ok(connection_id) => {
        debug!(%connection_id, user_id = %identity.user_id, "presence connected");
        inner.state = ConnectionState::Connected;
        inner.connection_id = Some(connection_id);
        inner.identity = Some(identity.clone());
        inner.emit(ControlMessage::JoinRoom(identity));
      }
      Err(e) => {
        warn!(error = %e, "presence connection failed; continuing without presence");
        inner.state = ConnectionState::Disconnected;
      }
    }
    inner.state
  }

  /// Close the connection. Subscriptions survive; they belong to the
  /// components that made them.
  pub fn disconnect(&self) {
    let mut inner = self.lock();
    if inner.state == ConnectionState::Disconnected {
      return;
    }
    inner.reset();
    debug!("presence disconnected");
  }

  /// Record an unrecoverable transport error reported by the embedder.
  pub fn transport_failed(&self, reason: &str) {
    let mut inner = self.lock();
    if inner.state == ConnectionState::Disconnected {
      return;
    }
    warn!(reason, "presence transport failed");
    inner.reset();
  }

  pub fn state(&self) -> ConnectionState { self.lock().state }

  pub fn is_connected(&self) -> bool {
    self.state() == ConnectionState::Connected
  }

  pub fn connection_id(&self) -> Option<String> {
    self.lock().connection_id.clone()
  }

  pub fn identity(&self) -> Option<Identity> { self.lock().identity.clone() }

  /// The current connection epoch, or `None` while not connected.
  pub(crate) fn live_epoch(&self) -> Option<u64> {
    let inner = self.lock();
    (inner.state == ConnectionState::Connected).then_some(inner.epoch)
  }

  // ── Resource membership ───────────────────────────────────────────────

  /// Announce presence on `resource_id`. Returns whether the message was
  /// handed to the transport.
  pub fn join_resource(&self, resource_id: &str) -> bool {
    self.lock().emit(ControlMessage::join(resource_id))
  }

  /// Announce departure from `resource_id`.
  pub fn leave_resource(&self, resource_id: &str) -> bool {
    self.lock().emit(ControlMessage::leave(resource_id))
  }

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Register `handler` for inbound events named `event`.
  ///
  /// Handlers for the same name run in registration order. The channel does
  /// not filter by resource; handlers do that themselves.
  pub fn subscribe<F>(&self, event: impl Into<String>, handler: F) -> SubscriptionId
  where
    F: Fn(&InboundEvent) + Send + Sync + 'static,
  {
    let mut inner = self.lock();
    let id = SubscriptionId(inner.next_token);
    inner.next_token += 1;
    inner
      .handlers
      .entry(event.into())
      .or_default()
      .push((id, Arc::new(handler)));
    id
  }

  /// Remove exactly the handler registered under `id`. Returns `false` if it
  /// was already gone.
  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    let mut inner = self.lock();
    let mut removed = false;
    inner.handlers.retain(|_, list| {
      let before = list.len();
      list.retain(|(token, _)| *token != id);
      removed |= list.len() != before;
      !list.is_empty()
    });
    removed
  }

  pub fn subscriber_count(&self, event: &str) -> usize {
    self.lock().handlers.get(event).map_or(0, Vec::len)
  }

  // ── Inbound ───────────────────────────────────────────────────────────

  /// Deliver `event` to its subscribers in registration order.
  ///
  /// Handlers run without the channel lock held, so they may subscribe,
  /// unsubscribe or query the channel.
  pub fn dispatch(&self, event: &InboundEvent) {
    let handlers: Vec<Handler> = {
      let inner = self.lock();
      if inner.state != ConnectionState::Connected {
        debug!(event = event.name(), "presence channel not connected; dropping event");
        return;
      }
      inner
        .handlers
        .get(event.name())
        .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
        .unwrap_or_default()
    };

    for handler in handlers {
      handler(event);
    }
  }

  /// Decode and dispatch one raw frame. Undecodable frames are logged and
  /// dropped.
  pub fn receive_frame(&self, frame: &str) {
    match decode_inbound(frame) {
      Ok(event) => self.dispatch(&event),
      Err(e) => warn!(error = %e, "dropping undecodable presence frame"),
    }
  }

  /// Feed inbound frames from `frames` into the channel until the sender
  /// side closes. Frames are dispatched in the order they arrive.
  pub async fn pump(&self, mut frames: UnboundedReceiver<String>) {
    while let Some(frame) = frames.recv().await {
      self.receive_frame(&frame);
    }
    debug!("presence frame stream ended");
  }
}
