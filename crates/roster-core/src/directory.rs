//! The `Directory` trait: where organization snapshots and requester
//! profiles come from.
//!
//! Implementations wrap whatever the upstream source is (a REST API, a file,
//! memory). Callers fetch a fresh snapshot per assignment dialog; staleness
//! and refresh policy belong to the implementation.

use std::{
  convert::Infallible,
  future::Future,
  sync::{PoisonError, RwLock},
};

use crate::{
  member::{MemberId, Requester},
  snapshot::OrgSnapshot,
};

/// Organization snapshot provider and current-user profile provider.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the caller's organization as a validated snapshot.
  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<OrgSnapshot, Self::Error>> + Send + '_;

  /// Look up the requester profile for `id`. Returns `None` if the id is not
  /// a member of the organization.
  fn requester<'a>(
    &'a self,
    id: &'a MemberId,
  ) -> impl Future<Output = Result<Option<Requester>, Self::Error>> + Send + 'a
  {
    async move {
      let snapshot = self.snapshot().await?;
      Ok(snapshot.get(id).map(Requester::from))
    }
  }
}

/// An in-memory directory whose snapshot can be swapped at runtime.
#[derive(Debug)]
pub struct MemoryDirectory {
  snapshot: RwLock<OrgSnapshot>,
}

impl MemoryDirectory {
  pub fn new(snapshot: OrgSnapshot) -> Self {
    Self {
      snapshot: RwLock::new(snapshot),
    }
  }

  /// Replace the current snapshot; subsequent fetches see the new one.
  pub fn replace(&self, snapshot: OrgSnapshot) {
    *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
  }
}

impl Directory for MemoryDirectory {
  type Error = Infallible;

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<OrgSnapshot, Self::Error>> + Send + '_ {
    let snapshot = self
      .snapshot
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    async move { Ok(snapshot) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::member::{OrgMember, Role};

  fn directory() -> MemoryDirectory {
    MemoryDirectory::new(
      OrgSnapshot::new(vec![
        OrgMember::new("a", Role::Manager),
        OrgMember::new("b", Role::Member).reporting_to("a"),
      ])
      .unwrap(),
    )
  }

  #[tokio::test]
  async fn requester_is_looked_up_from_the_snapshot() {
    let dir = directory();
    let id = MemberId::from("b");
    let requester = dir.requester(&id).await.unwrap();
    assert_eq!(requester, Some(Requester::new("b", Role::Member)));

    let unknown = MemberId::from("zz");
    assert_eq!(dir.requester(&unknown).await.unwrap(), None);
  }

  #[tokio::test]
  async fn replace_swaps_the_snapshot() {
    let dir = directory();
    dir.replace(OrgSnapshot::new(vec![OrgMember::new("c", Role::Admin)]).unwrap());
    let snap = dir.snapshot().await.unwrap();
    assert_eq!(snap.len(), 1);
    assert!(snap.contains(&"c".into()));
  }
}
