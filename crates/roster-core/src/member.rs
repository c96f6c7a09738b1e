//! Organization members and the references between them.
//!
//! Upstream payloads are loosely shaped: a manager or assignee reference may
//! arrive as a bare id string, as `{"id": ...}`, or as `{"_id": ...}`. All of
//! these are normalised into a [`MemberId`] at deserialisation time so the
//! resolver never has to care.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Deserializer, Serialize};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Opaque identifier of an organization member.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// `true` if the id is empty or whitespace only.
  pub fn is_blank(&self) -> bool { self.0.trim().is_empty() }
}

impl fmt::Display for MemberId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Borrow<str> for MemberId {
  fn borrow(&self) -> &str { &self.0 }
}

impl From<&str> for MemberId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for MemberId {
  fn from(s: String) -> Self { Self(s) }
}

/// A reference to a member in any of the shapes the upstream API uses.
///
/// Deserialises from `"abc"`, `{"id":"abc"}` or `{"_id":"abc"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef(pub MemberId);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMemberRef {
  Id(String),
  Object {
    #[serde(alias = "_id")]
    id: String,
  },
}

impl<'de> Deserialize<'de> for MemberRef {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let id = match RawMemberRef::deserialize(d)? {
      RawMemberRef::Id(id) | RawMemberRef::Object { id } => id,
    };
    Ok(MemberRef(MemberId(id)))
  }
}

impl From<MemberRef> for MemberId {
  fn from(r: MemberRef) -> Self { r.0 }
}

/// Deserialise an optional reference. `null`, a missing field and an empty
/// string all mean "no reference".
fn optional_ref<'de, D>(d: D) -> Result<Option<MemberId>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(
    Option::<MemberRef>::deserialize(d)?
      .map(MemberId::from)
      .filter(|id| !id.is_blank()),
  )
}

// ─── Roles ───────────────────────────────────────────────────────────────────

/// Privilege level of a member.
///
/// The set is defined upstream; unknown values deserialise to
/// [`Role::Other`] and are treated like any other non-privileged role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[serde(alias = "user")]
  Member,
  Manager,
  Admin,
  SuperAdmin,
  #[serde(other)]
  Other,
}

impl Role {
  /// Admins and super admins may assign to anyone in the organization.
  pub fn is_privileged(self) -> bool {
    matches!(self, Self::Admin | Self::SuperAdmin)
  }
}

// ─── Members ─────────────────────────────────────────────────────────────────

/// One entry of an organization snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgMember {
  pub id:         MemberId,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:      Option<String>,
  pub role:       Role,
  /// The member's direct manager. `None` marks a root of the hierarchy.
  #[serde(
    rename = "reportsToId",
    alias = "reportsTo",
    default,
    deserialize_with = "optional_ref"
  )]
  pub reports_to: Option<MemberId>,
}

impl OrgMember {
  pub fn new(id: impl Into<MemberId>, role: Role) -> Self {
    Self {
      id: id.into(),
      first_name: String::new(),
      last_name: String::new(),
      email: None,
      role,
      reports_to: None,
    }
  }

  pub fn with_name(
    mut self,
    first: impl Into<String>,
    last: impl Into<String>,
  ) -> Self {
    self.first_name = first.into();
    self.last_name = last.into();
    self
  }

  pub fn reporting_to(mut self, manager: impl Into<MemberId>) -> Self {
    self.reports_to = Some(manager.into());
    self
  }

  /// `"First Last"`, or the id when both name parts are empty.
  pub fn display_name(&self) -> String {
    let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
    let full = full.trim();
    if full.is_empty() {
      self.id.to_string()
    } else {
      full.to_owned()
    }
  }
}

/// The user attempting an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
  pub id:   MemberId,
  pub role: Role,
}

impl Requester {
  pub fn new(id: impl Into<MemberId>, role: Role) -> Self {
    Self { id: id.into(), role }
  }
}

impl From<&OrgMember> for Requester {
  fn from(m: &OrgMember) -> Self {
    Self {
      id:   m.id.clone(),
      role: m.role,
    }
  }
}
