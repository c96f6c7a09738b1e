//! Assignment eligibility derived from the reporting hierarchy.
//!
//! A privileged requester (admin, super admin) may assign to anyone in the
//! organization. Everyone else may assign to themselves and to every member
//! that reports to them, directly or through intermediate managers.
//!
//! Resolution is a pure function of the snapshot and the requester. The
//! reporting graph is inverted once into a [`ReportingIndex`] and walked
//! breadth-first from the requester. The visited set is checked before a
//! node is enqueued, so bad upstream data (cycles, a member reporting to
//! itself) cannot make the walk run forever.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::{
  Error, Result,
  member::{MemberId, OrgMember, Requester},
  snapshot::OrgSnapshot,
};

// ─── Reporting index ─────────────────────────────────────────────────────────

/// Inverse adjacency of a snapshot: manager id → direct report ids.
#[derive(Debug, Default)]
pub struct ReportingIndex<'a> {
  reports: HashMap<&'a MemberId, Vec<&'a MemberId>>,
}

impl<'a> ReportingIndex<'a> {
  pub fn build(snapshot: &'a OrgSnapshot) -> Self {
    let mut reports: HashMap<&MemberId, Vec<&MemberId>> = HashMap::new();
    for member in snapshot {
      if let Some(manager) = &member.reports_to {
        reports.entry(manager).or_default().push(&member.id);
      }
    }
    Self { reports }
  }

  /// Members whose `reports_to` is `manager`, in snapshot order.
  pub fn direct_reports(&self, manager: &MemberId) -> &[&'a MemberId] {
    self.reports.get(manager).map(Vec::as_slice).unwrap_or_default()
  }

  /// `root` plus every id reachable beneath it.
  pub fn reachable_from<'r>(&self, root: &'r MemberId) -> HashSet<&'r MemberId>
  where
    'a: 'r,
  {
    let mut visited: HashSet<&MemberId> = HashSet::new();
    let mut queue: VecDeque<&MemberId> = VecDeque::new();

    visited.insert(root);
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
      for &report in self.direct_reports(current) {
        if visited.insert(report) {
          queue.push_back(report);
        }
      }
    }

    visited
  }
}

// ─── Result type ─────────────────────────────────────────────────────────────

/// The members a requester may assign a resource to.
///
/// Members keep their snapshot order; use [`AssignableSet::sorted_by_name`]
/// for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssignableSet {
  members: Vec<OrgMember>,
}

impl AssignableSet {
  pub fn contains(&self, id: &MemberId) -> bool {
    self.members.iter().any(|m| &m.id == id)
  }

  pub fn ids(&self) -> HashSet<&MemberId> {
    self.members.iter().map(|m| &m.id).collect()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, OrgMember> { self.members.iter() }

  pub fn len(&self) -> usize { self.members.len() }

  pub fn is_empty(&self) -> bool { self.members.is_empty() }

  pub fn into_members(self) -> Vec<OrgMember> { self.members }

  /// Order by display name, then id, for stable presentation.
  pub fn sorted_by_name(mut self) -> Self {
    self.members.sort_by_cached_key(|m| {
      (m.display_name().to_lowercase(), m.id.clone())
    });
    self
  }
}

impl<'a> IntoIterator for &'a AssignableSet {
  type Item = &'a OrgMember;
  type IntoIter = std::slice::Iter<'a, OrgMember>;

  fn into_iter(self) -> Self::IntoIter { self.members.iter() }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Compute who `requester` may assign work to within `snapshot`.
///
/// Returns [`Error::EmptyRequesterId`] instead of an empty set when the
/// requester has no identity.
pub fn resolve(
  snapshot: &OrgSnapshot,
  requester: &Requester,
) -> Result<AssignableSet> {
  if requester.id.is_blank() {
    return Err(Error::EmptyRequesterId);
  }

  if requester.role.is_privileged() {
    return Ok(AssignableSet {
      members: snapshot.members().to_vec(),
    });
  }

  let index = ReportingIndex::build(snapshot);
  let reachable = index.reachable_from(&requester.id);

  let members = snapshot
    .iter()
    .filter(|m| reachable.contains(&m.id))
    .cloned()
    .collect();

  Ok(AssignableSet { members })
}

/// Whether `requester` may assign to `assignee`.
///
/// The assignee must be a member of the snapshot.
pub fn can_assign(
  snapshot: &OrgSnapshot,
  requester: &Requester,
  assignee: &MemberId,
) -> Result<bool> {
  if requester.id.is_blank() {
    return Err(Error::EmptyRequesterId);
  }
  if !snapshot.contains(assignee) {
    return Ok(false);
  }
  if requester.role.is_privileged() || &requester.id == assignee {
    return Ok(true);
  }

  let index = ReportingIndex::build(snapshot);
  Ok(index.reachable_from(&requester.id).contains(assignee))
}

/// Every transitive report of `manager`, excluding `manager`, in snapshot
/// order.
pub fn subordinates<'s>(
  snapshot: &'s OrgSnapshot,
  manager: &MemberId,
) -> Vec<&'s OrgMember> {
  let index = ReportingIndex::build(snapshot);
  let reachable = index.reachable_from(manager);
  snapshot
    .iter()
    .filter(|m| &m.id != manager && reachable.contains(&m.id))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::member::Role;

  fn member(id: &str, role: Role, reports_to: Option<&str>) -> OrgMember {
    let m = OrgMember::new(id, role);
    match reports_to {
      Some(manager) => m.reporting_to(manager),
      None => m,
    }
  }

  /// A(manager) ← B ← C, and an unrelated root D.
  fn sample() -> OrgSnapshot {
    OrgSnapshot::new(vec![
      member("A", Role::Manager, None),
      member("B", Role::Member, Some("A")),
      member("C", Role::Member, Some("B")),
      member("D", Role::Member, None),
    ])
    .unwrap()
  }

  fn ids(set: &AssignableSet) -> Vec<&str> {
    let mut v: Vec<&str> = set.iter().map(|m| m.id.as_str()).collect();
    v.sort_unstable();
    v
  }

  #[test]
  fn manager_gets_self_and_transitive_reports() {
    let set = resolve(&sample(), &Requester::new("A", Role::Manager)).unwrap();
    assert_eq!(ids(&set), ["A", "B", "C"]);
  }

  #[test]
  fn middle_manager_sees_only_their_branch() {
    let set = resolve(&sample(), &Requester::new("B", Role::Member)).unwrap();
    assert_eq!(ids(&set), ["B", "C"]);
  }

  #[test]
  fn leaf_member_can_only_assign_to_self() {
    let set = resolve(&sample(), &Requester::new("C", Role::Member)).unwrap();
    assert_eq!(ids(&set), ["C"]);
  }

  #[test]
  fn privileged_roles_get_the_whole_snapshot() {
    let snap = sample();
    for role in [Role::Admin, Role::SuperAdmin] {
      let set = resolve(&snap, &Requester::new("D", role)).unwrap();
      assert_eq!(set.into_members(), snap.members());
    }
  }

  #[test]
  fn privileged_requester_outside_snapshot_still_gets_everything() {
    let snap = sample();
    let set = resolve(&snap, &Requester::new("ghost", Role::Admin)).unwrap();
    assert_eq!(set.len(), snap.len());
  }

  #[test]
  fn requester_missing_from_snapshot_gets_empty_set() {
    let set =
      resolve(&sample(), &Requester::new("ghost", Role::Manager)).unwrap();
    assert!(set.is_empty());
  }

  #[test]
  fn blank_requester_is_an_error_not_an_empty_set() {
    let err = resolve(&sample(), &Requester::new("", Role::Manager)).unwrap_err();
    assert!(matches!(err, Error::EmptyRequesterId));
  }

  #[test]
  fn two_node_cycle_terminates() {
    let snap = OrgSnapshot::new(vec![
      member("A", Role::Member, Some("B")),
      member("B", Role::Member, Some("A")),
      member("X", Role::Member, None),
    ])
    .unwrap();
    let set = resolve(&snap, &Requester::new("A", Role::Member)).unwrap();
    assert_eq!(ids(&set), ["A", "B"]);
    assert!(set.len() <= snap.len());
  }

  #[test]
  fn self_reporting_member_terminates() {
    let snap =
      OrgSnapshot::new(vec![member("A", Role::Manager, Some("A"))]).unwrap();
    let set = resolve(&snap, &Requester::new("A", Role::Manager)).unwrap();
    assert_eq!(ids(&set), ["A"]);
  }

  #[test]
  fn longer_cycle_hanging_off_the_requester_terminates() {
    // R ← A ← B ← C ← A (C's report A closes a loop below R)
    let snap = OrgSnapshot::new(vec![
      member("R", Role::Manager, None),
      member("A", Role::Member, Some("C")),
      member("B", Role::Member, Some("A")),
      member("C", Role::Member, Some("B")),
      member("E", Role::Member, Some("R")),
    ])
    .unwrap();
    let set = resolve(&snap, &Requester::new("B", Role::Member)).unwrap();
    assert_eq!(ids(&set), ["A", "B", "C"]);
  }

  #[test]
  fn resolution_is_idempotent() {
    let snap = sample();
    let requester = Requester::new("A", Role::Manager);
    let first = resolve(&snap, &requester).unwrap();
    let second = resolve(&snap, &requester).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn every_member_appears_at_most_once() {
    let snap = sample();
    let set = resolve(&snap, &Requester::new("A", Role::Manager)).unwrap();
    assert_eq!(set.ids().len(), set.len());
  }

  #[test]
  fn can_assign_follows_the_hierarchy() {
    let snap = sample();
    let a = Requester::new("A", Role::Manager);
    assert!(can_assign(&snap, &a, &"A".into()).unwrap());
    assert!(can_assign(&snap, &a, &"C".into()).unwrap());
    assert!(!can_assign(&snap, &a, &"D".into()).unwrap());
    assert!(!can_assign(&snap, &a, &"nobody".into()).unwrap());

    let admin = Requester::new("D", Role::Admin);
    assert!(can_assign(&snap, &admin, &"C".into()).unwrap());
    assert!(!can_assign(&snap, &admin, &"nobody".into()).unwrap());
  }

  #[test]
  fn subordinates_exclude_the_manager() {
    let snap = sample();
    let subs: Vec<&str> = subordinates(&snap, &"A".into())
      .into_iter()
      .map(|m| m.id.as_str())
      .collect();
    assert_eq!(subs, ["B", "C"]);
    assert!(subordinates(&snap, &"D".into()).is_empty());
  }

  #[test]
  fn direct_reports_preserve_snapshot_order() {
    let snap = OrgSnapshot::new(vec![
      member("M", Role::Manager, None),
      member("Z", Role::Member, Some("M")),
      member("Y", Role::Member, Some("M")),
    ])
    .unwrap();
    let index = ReportingIndex::build(&snap);
    let reports: Vec<&str> =
      index.direct_reports(&"M".into()).iter().map(|id| id.as_str()).collect();
    assert_eq!(reports, ["Z", "Y"]);
    assert!(index.direct_reports(&"Z".into()).is_empty());
  }

  #[test]
  fn sorted_by_name_orders_for_display() {
    let snap = OrgSnapshot::new(vec![
      OrgMember::new("1", Role::Manager).with_name("Zoe", "Ng"),
      OrgMember::new("2", Role::Member)
        .with_name("adam", "Smith")
        .reporting_to("1"),
    ])
    .unwrap();
    let set = resolve(&snap, &Requester::new("1", Role::Manager))
      .unwrap()
      .sorted_by_name();
    let names: Vec<String> = set.iter().map(OrgMember::display_name).collect();
    assert_eq!(names, ["adam Smith", "Zoe Ng"]);
  }
}
