//! Real-time presence for Roster: who is currently looking at a resource.
//!
//! A single [`PresenceChannel`] owns the connection for the whole client
//! session. It is constructed explicitly and cloned into whatever needs it;
//! there is no process-wide singleton. Components observe a resource through
//! a [`PresenceView`], which joins on creation and leaves on drop.
//!
//! Presence is advisory. Connection failures degrade to "nobody shown" and
//! are never surfaced as errors to the hosting page. Control messages are
//! fire-and-forget: nothing is acknowledged or retried.

pub mod channel;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod view;

pub use channel::{ConnectionState, PresenceChannel, SubscriptionId};
pub use error::{Error, Result, TransportError};
pub use protocol::{
  ControlMessage, Identity, InboundEvent, PresenceAction, PresenceUpdate,
};
pub use transport::{MemoryPeer, MemoryTransport, Transport};
pub use view::{PresenceParticipant, PresenceView, SelfFilter};
