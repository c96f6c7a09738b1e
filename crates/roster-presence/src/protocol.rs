//! Presence wire protocol.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//!
//! | Direction | Event                 | Payload |
//! |-----------|-----------------------|---------|
//! | out       | `join_room`           | [`Identity`] |
//! | out       | `join_collaboration`  | `{"resourceId": ...}` |
//! | out       | `leave_collaboration` | `{"resourceId": ...}` |
//! | in        | `presence_update`     | [`PresenceUpdate`] |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

pub const JOIN_ROOM: &str = "join_room";
pub const JOIN_COLLABORATION: &str = "join_collaboration";
pub const LEAVE_COLLABORATION: &str = "leave_collaboration";
pub const PRESENCE_UPDATE: &str = "presence_update";

// ─── Outbound ────────────────────────────────────────────────────────────────

/// Who this connection belongs to; announced once after connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  pub user_id:         String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organization_id: Option<String>,
}

impl Identity {
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id:         user_id.into(),
      name:            None,
      organization_id: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
  pub resource_id: String,
}

/// A control message sent over the shared connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ControlMessage {
  JoinRoom(Identity),
  JoinCollaboration(ResourceRef),
  LeaveCollaboration(ResourceRef),
}

impl ControlMessage {
  pub fn join(resource_id: impl Into<String>) -> Self {
    Self::JoinCollaboration(ResourceRef {
      resource_id: resource_id.into(),
    })
  }

  pub fn leave(resource_id: impl Into<String>) -> Self {
    Self::LeaveCollaboration(ResourceRef {
      resource_id: resource_id.into(),
    })
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::JoinRoom(_) => JOIN_ROOM,
      Self::JoinCollaboration(_) => JOIN_COLLABORATION,
      Self::LeaveCollaboration(_) => LEAVE_COLLABORATION,
    }
  }

  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

// ─── Inbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
  Join,
  Leave,
}

/// A participant arriving at or leaving a resource.
///
/// `user_id` is not always populated upstream; `connection_id` always is and
/// is the key participants are tracked by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
  pub resource_id:   String,
  pub action:        PresenceAction,
  #[serde(default)]
  pub user_id:       Option<String>,
  pub connection_id: String,
}

/// An event received from the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
  PresenceUpdate(PresenceUpdate),
  /// Any event this crate does not interpret, passed through untouched.
  Other { name: String, data: Value },
}

impl InboundEvent {
  pub fn name(&self) -> &str {
    match self {
      Self::PresenceUpdate(_) => PRESENCE_UPDATE,
      Self::Other { name, .. } => name,
    }
  }
}

#[derive(Deserialize)]
struct Frame {
  event: String,
  #[serde(default)]
  data:  Value,
}

/// Decode one inbound frame.
pub fn decode_inbound(frame: &str) -> Result<InboundEvent> {
  let Frame { event, data } = serde_json::from_str(frame)?;
  if event == PRESENCE_UPDATE {
    Ok(InboundEvent::PresenceUpdate(serde_json::from_value(data)?))
  } else {
    Ok(InboundEvent::Other { name: event, data })
  }
}

/// Encode a presence update the way the server would send it.
pub fn encode_update(update: &PresenceUpdate) -> Result<String> {
  Ok(serde_json::to_string(&serde_json::json!({
    "event": PRESENCE_UPDATE,
    "data": update,
  }))?)
}
