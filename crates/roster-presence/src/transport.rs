//! The connection underneath a [`PresenceChannel`](crate::PresenceChannel).
//!
//! The wire transport (WebSocket, Socket.IO, ...) is supplied by the
//! embedder. Reconnect and timeout policy live there too.

use std::sync::{
  Arc,
  atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use uuid::Uuid;

use crate::{
  error::TransportError,
  protocol::{PresenceUpdate, encode_update},
};

/// A bidirectional frame connection.
///
/// Inbound frames are not read through this trait; the embedder feeds them
/// to [`PresenceChannel::receive_frame`](crate::PresenceChannel::receive_frame)
/// or [`PresenceChannel::pump`](crate::PresenceChannel::pump).
pub trait Transport: Send + 'static {
  /// Establish the connection and return its connection id.
  fn open(&mut self) -> Result<String, TransportError>;

  fn send(&mut self, frame: String) -> Result<(), TransportError>;

  fn close(&mut self);
}

// ─── In-memory transport ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Shared {
  refuse: AtomicBool,
  open:   AtomicBool,
  opens:  AtomicUsize,
}

/// Client half of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
  outbound: UnboundedSender<String>,
  shared:   Arc<Shared>,
}

/// Server half of an in-memory connection: sees what the client sent and
/// injects what the client receives.
#[derive(Debug)]
pub struct MemoryPeer {
  outbound: UnboundedReceiver<String>,
  inbound:  UnboundedSender<String>,
  shared:   Arc<Shared>,
}

impl MemoryTransport {
  /// Create a connected pair plus the receiver of inbound frames, which is
  /// what [`PresenceChannel::pump`](crate::PresenceChannel::pump) consumes.
  pub fn pair() -> (Self, MemoryPeer, UnboundedReceiver<String>) {
    let (out_tx, out_rx) = unbounded_channel();
    let (in_tx, in_rx) = unbounded_channel();
    let shared = Arc::new(Shared::default());
    let transport = Self {
      outbound: out_tx,
      shared:   shared.clone(),
    };
    let peer = MemoryPeer {
      outbound: out_rx,
      inbound: in_tx,
      shared,
    };
    (transport, peer, in_rx)
  }
}

impl Transport for MemoryTransport {
  fn open(&mut self) -> Result<String, TransportError> {
    if self.shared.refuse.load(Ordering::SeqCst) {
      return Err(TransportError::Refused("peer refused connection".into()));
    }
    self.shared.open.store(true, Ordering::SeqCst);
    self.shared.opens.fetch_add(1, Ordering::SeqCst);
    Ok(format!("mem-{}", Uuid::new_v4().simple()))
  }

  fn send(&mut self, frame: String) -> Result<(), TransportError> {
    if !self.shared.open.load(Ordering::SeqCst) {
      return Err(TransportError::NotOpen);
    }
    self.outbound.send(frame).map_err(|_| TransportError::Closed)
  }

  fn close(&mut self) { self.shared.open.store(false, Ordering::SeqCst); }
}

impl MemoryPeer {
  /// Make subsequent `open` calls fail.
  pub fn refuse_connections(&self, refuse: bool) {
    self.shared.refuse.store(refuse, Ordering::SeqCst);
  }

  pub fn is_open(&self) -> bool { self.shared.open.load(Ordering::SeqCst) }

  /// How many times the client has successfully opened the connection.
  pub fn open_count(&self) -> usize { self.shared.opens.load(Ordering::SeqCst) }

  /// Every frame the client has sent since the last drain.
  pub fn drain(&mut self) -> Vec<String> {
    let mut frames = Vec::new();
    while let Ok(frame) = self.outbound.try_recv() {
      frames.push(frame);
    }
    frames
  }

  /// Like [`MemoryPeer::drain`], parsed as JSON.
  pub fn drain_json(&mut self) -> Vec<serde_json::Value> {
    self
      .drain()
      .iter()
      .filter_map(|f| serde_json::from_str(f).ok())
      .collect()
  }

  /// Queue a raw inbound frame. Returns `false` once the receiving side is
  /// gone.
  pub fn push(&self, frame: impl Into<String>) -> bool {
    self.inbound.send(frame.into()).is_ok()
  }

  pub fn push_update(&self, update: &PresenceUpdate) -> bool {
    match encode_update(update) {
      Ok(frame) => self.push(frame),
      Err(_) => false,
    }
  }
}
