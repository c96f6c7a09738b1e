//! Per-resource presence, scoped to the lifetime of the observer.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  channel::{PresenceChannel, SubscriptionId, WeakChannel},
  protocol::{InboundEvent, PRESENCE_UPDATE, PresenceAction, PresenceUpdate},
};

/// Someone currently viewing a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceParticipant {
  pub resource_id:   String,
  pub user_id:       Option<String>,
  pub connection_id: String,
  /// When this client observed the join.
  pub joined_at:     DateTime<Utc>,
}

/// Whether a view shows the local user's own presence.
///
/// Upstream payloads do not reliably mark "this is you", so the choice is
/// left to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelfFilter {
  /// Show every participant, including this client.
  #[default]
  Keep,
  /// Hide entries whose connection id is this channel's.
  ThisConnection,
  /// Hide entries whose user id is the connected identity's, across every
  /// tab and session of that user.
  ThisUser,
}

impl SelfFilter {
  fn hides(self, update: &PresenceUpdate, channel: &PresenceChannel) -> bool {
    match self {
      Self::Keep => false,
      Self::ThisConnection => {
        channel.connection_id().as_deref() == Some(update.connection_id.as_str())
      }
      Self::ThisUser => match (&update.user_id, channel.identity()) {
        (Some(user), Some(identity)) => *user == identity.user_id,
        _ => false,
      },
    }
  }
}

/// A participant tagged with the connection epoch it was observed under.
#[derive(Debug)]
struct Entry {
  epoch:       u64,
  participant: PresenceParticipant,
}

type Participants = Arc<Mutex<BTreeMap<String, Entry>>>;

fn lock(p: &Participants) -> MutexGuard<'_, BTreeMap<String, Entry>> {
  p.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observes one resource for as long as it is alive.
///
/// Creating a view joins the resource and subscribes to presence updates.
/// Dropping it leaves the resource and removes its own subscription, on
/// every exit path.
#[derive(Debug)]
pub struct PresenceView {
  channel:      PresenceChannel,
  resource_id:  String,
  subscription: SubscriptionId,
  participants: Participants,
}

impl PresenceView {
  pub fn open(
    channel: &PresenceChannel,
    resource_id: impl Into<String>,
    filter: SelfFilter,
  ) -> Self {
    let resource_id = resource_id.into();
    let participants: Participants = Arc::default();

    let subscription = channel.subscribe(
      PRESENCE_UPDATE,
      observer(resource_id.clone(), participants.clone(), filter, channel.downgrade()),
    );
    channel.join_resource(&resource_id);

    Self {
      channel: channel.clone(),
      resource_id,
      subscription,
      participants,
    }
  }

  pub fn resource_id(&self) -> &str { &self.resource_id }

  /// Current participants ordered by connection id.
  ///
  /// Only joins seen on the current connection count: the list is empty
  /// while the channel is not connected, and anything observed before the
  /// last disconnect stays hidden after a reconnect.
  pub fn participants(&self) -> Vec<PresenceParticipant> {
    let Some(epoch) = self.channel.live_epoch() else {
      return Vec::new();
    };
    lock(&self.participants)
      .values()
      .filter(|entry| entry.epoch == epoch)
      .map(|entry| entry.participant.clone())
      .collect()
  }

  pub fn len(&self) -> usize { self.participants().len() }

  pub fn is_empty(&self) -> bool { self.participants().is_empty() }

  pub fn contains_connection(&self, connection_id: &str) -> bool {
    self
      .participants()
      .iter()
      .any(|p| p.connection_id == connection_id)
  }

  /// Distinct known user ids among the participants.
  pub fn viewers(&self) -> BTreeSet<String> {
    self
      .participants()
      .into_iter()
      .filter_map(|p| p.user_id)
      .collect()
  }
}

impl Drop for PresenceView {
  fn drop(&mut self) {
    self.channel.leave_resource(&self.resource_id);
    self.channel.unsubscribe(self.subscription);
  }
}

fn observer(
  resource_id: String,
  participants: Participants,
  filter: SelfFilter,
  channel: WeakChannel,
) -> impl Fn(&InboundEvent) + Send + Sync + 'static {
  move |event| {
    let InboundEvent::PresenceUpdate(update) = event else {
      return;
    };
    if update.resource_id != resource_id {
      return;
    }
    let Some(channel) = channel.upgrade() else {
      return;
    };
    let Some(epoch) = channel.live_epoch() else {
      return;
    };
    if filter.hides(update, &channel) {
      return;
    }

    let mut map = lock(&participants);
    map.retain(|_, entry| entry.epoch == epoch);
    match update.action {
      PresenceAction::Join => {
        map
          .entry(update.connection_id.clone())
          .and_modify(|entry| {
            if update.user_id.is_some() {
              entry.participant.user_id = update.user_id.clone();
            }
          })
          .or_insert_with(|| Entry {
            epoch,
            participant: PresenceParticipant {
              resource_id:   update.resource_id.clone(),
              user_id:       update.user_id.clone(),
              connection_id: update.connection_id.clone(),
              joined_at:     Utc::now(),
            },
          });
      }
      PresenceAction::Leave => {
        map.remove(&update.connection_id);
      }
    }
  }
}
