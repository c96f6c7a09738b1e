//! A validated, point-in-time copy of an organization's members.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
  Error, Result,
  member::{MemberId, OrgMember},
};

/// The shape returned by the organization snapshot provider.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
  users: Vec<OrgMember>,
}

/// Organization members with unique, non-empty ids.
///
/// Construction fails fast on malformed input: a snapshot that fails to load
/// must stay distinguishable from an organization where nobody is
/// assignable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgSnapshot {
  users: Vec<OrgMember>,
}

impl<'de> Deserialize<'de> for OrgSnapshot {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let raw = RawSnapshot::deserialize(d)?;
    Self::new(raw.users).map_err(serde::de::Error::custom)
  }
}

impl OrgSnapshot {
  /// Validate `users` and wrap them.
  ///
  /// A `reports_to` naming a member outside the snapshot is accepted; that
  /// member is simply a root of the hierarchy.
  pub fn new(users: Vec<OrgMember>) -> Result<Self> {
    let mut seen = HashSet::with_capacity(users.len());
    for (index, member) in users.iter().enumerate() {
      if member.id.is_blank() {
        return Err(Error::EmptyMemberId { index });
      }
      if !seen.insert(&member.id) {
        return Err(Error::DuplicateMember(member.id.clone()));
      }
    }

    for member in &users {
      if let Some(manager) = &member.reports_to
        && !seen.contains(manager)
      {
        tracing::warn!(
          member = %member.id,
          manager = %manager,
          "member reports to an id outside the snapshot; treating as root"
        );
      }
    }

    Ok(Self { users })
  }

  /// Parse and validate a `{"users": [...]}` document.
  pub fn from_json(json: &str) -> Result<Self> {
    let raw: RawSnapshot = serde_json::from_str(json)?;
    Self::new(raw.users)
  }

  pub fn from_slice(bytes: &[u8]) -> Result<Self> {
    let raw: RawSnapshot = serde_json::from_slice(bytes)?;
    Self::new(raw.users)
  }

  pub fn members(&self) -> &[OrgMember] { &self.users }

  pub fn into_members(self) -> Vec<OrgMember> { self.users }

  pub fn get(&self, id: &MemberId) -> Option<&OrgMember> {
    self.users.iter().find(|m| &m.id == id)
  }

  pub fn contains(&self, id: &MemberId) -> bool { self.get(id).is_some() }

  pub fn iter(&self) -> std::slice::Iter<'_, OrgMember> { self.users.iter() }

  pub fn len(&self) -> usize { self.users.len() }

  pub fn is_empty(&self) -> bool { self.users.is_empty() }
}

impl<'a> IntoIterator for &'a OrgSnapshot {
  type Item = &'a OrgMember;
  type IntoIter = std::slice::Iter<'a, OrgMember>;

  fn into_iter(self) -> Self::IntoIter { self.users.iter() }
}
