//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::{
  future::Future,
  io,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use axum::{
  body::{Body, to_bytes},
  http::{Request, StatusCode},
};
use roster_core::{
  OrgMember, OrgSnapshot, Role,
  directory::{Directory, MemoryDirectory},
};
use serde_json::Value;
use tower::ServiceExt as _;

use crate::api_router;

fn directory() -> Arc<MemoryDirectory> {
  Arc::new(MemoryDirectory::new(
    OrgSnapshot::new(vec![
      OrgMember::new("A", Role::Manager).with_name("Ann", "Avery"),
      OrgMember::new("B", Role::Member)
        .with_name("Bob", "Baker")
        .reporting_to("A"),
      OrgMember::new("C", Role::Member)
        .with_name("Cy", "Cole")
        .reporting_to("B"),
      OrgMember::new("D", Role::Member).with_name("Dee", "Dunn"),
      OrgMember::new("Z", Role::Admin).with_name("Zed", "Zane"),
    ])
    .unwrap(),
  ))
}

async fn get<D: Directory + 'static>(dir: Arc<D>, uri: &str) -> (StatusCode, Value) {
  let resp = api_router(dir)
    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

fn ids(v: &Value) -> Vec<&str> {
  v.as_array()
    .unwrap()
    .iter()
    .map(|m| m["id"].as_str().unwrap())
    .collect()
}

#[tokio::test]
async fn lists_members() {
  let (status, body) = get(directory(), "/members").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(ids(&body), ["A", "B", "C", "D", "Z"]);
}

#[tokio::test]
async fn gets_one_member() {
  let (status, body) = get(directory(), "/members/B").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["reportsToId"], "A");

  let (status, body) = get(directory(), "/members/nobody").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn manager_assignable_set_is_sorted_by_name() {
  let (status, body) = get(directory(), "/members/A/assignable").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(ids(&body), ["A", "B", "C"]);
}

#[tokio::test]
async fn admin_can_assign_to_everyone() {
  let (status, body) = get(directory(), "/members/Z/assignable").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn unknown_requester_is_not_found_rather_than_empty() {
  let (status, _) = get(directory(), "/members/ghost/assignable").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subordinates_exclude_self() {
  let (status, body) = get(directory(), "/members/A/subordinates").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(ids(&body), ["B", "C"]);

  let (status, _) = get(directory(), "/members/ghost/subordinates").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_assign_checks_the_hierarchy() {
  let (_, body) = get(directory(), "/members/A/can-assign/C").await;
  assert_eq!(body["assignable"], true);

  let (_, body) = get(directory(), "/members/A/can-assign/D").await;
  assert_eq!(body["assignable"], false);

  let (_, body) = get(directory(), "/members/Z/can-assign/D").await;
  assert_eq!(body["assignable"], true);
}

// ─── Failing directories ─────────────────────────────────────────────────────

struct InvalidSnapshotDirectory;

impl Directory for InvalidSnapshotDirectory {
  type Error = roster_core::Error;

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<OrgSnapshot, Self::Error>> + Send + '_ {
    async { OrgSnapshot::from_json(r#"{"users":{"oops":true}}"#) }
  }
}

struct UnreachableDirectory;

impl Directory for UnreachableDirectory {
  type Error = io::Error;

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<OrgSnapshot, Self::Error>> + Send + '_ {
    async { Err(io::Error::new(io::ErrorKind::ConnectionRefused, "upstream down")) }
  }
}

#[tokio::test]
async fn invalid_snapshot_is_unprocessable() {
  let (status, body) =
    get(Arc::new(InvalidSnapshotDirectory), "/members/A/assignable").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].as_str().unwrap().contains("invalid organization snapshot"));
}

#[tokio::test]
async fn directory_failure_is_a_server_error() {
  let (status, _) = get(Arc::new(UnreachableDirectory), "/members").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ─── Snapshot consistency ────────────────────────────────────────────────────

/// Serves a different organization on every fetch and counts the fetches.
/// The first snapshot has `A` managing `B`; later ones no longer contain `A`.
#[derive(Default)]
struct ShiftingDirectory {
  fetches: AtomicUsize,
}

impl Directory for ShiftingDirectory {
  type Error = roster_core::Error;

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<OrgSnapshot, Self::Error>> + Send + '_ {
    let fetch = self.fetches.fetch_add(1, Ordering::SeqCst);
    async move {
      if fetch == 0 {
        OrgSnapshot::new(vec![
          OrgMember::new("A", Role::Manager).with_name("Ann", "Avery"),
          OrgMember::new("B", Role::Member)
            .with_name("Bob", "Baker")
            .reporting_to("A"),
        ])
      } else {
        OrgSnapshot::new(vec![OrgMember::new("B", Role::Member)])
      }
    }
  }
}

#[tokio::test]
async fn assignable_reads_one_snapshot_per_request() {
  let dir = Arc::new(ShiftingDirectory::default());
  let (status, body) = get(dir.clone(), "/members/A/assignable").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(ids(&body), ["A", "B"]);
  assert_eq!(dir.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn can_assign_reads_one_snapshot_per_request() {
  let dir = Arc::new(ShiftingDirectory::default());
  let (status, body) = get(dir.clone(), "/members/A/can-assign/B").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["assignable"], true);
  assert_eq!(dir.fetches.load(Ordering::SeqCst), 1);
}
