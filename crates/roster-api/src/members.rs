//! Handlers for `/members` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/members` | Every member of the organization |
//! | `GET`  | `/members/:id` | 404 if not found |
//! | `GET`  | `/members/:id/assignable` | Who `:id` may assign to, sorted by name |
//! | `GET`  | `/members/:id/subordinates` | Transitive reports of `:id` |
//! | `GET`  | `/members/:id/can-assign/:assignee` | `{"assignable": bool}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use roster_core::{
  AssignableSet, MemberId, OrgMember, OrgSnapshot, Requester, directory::Directory,
  hierarchy,
};
use serde::Serialize;

use crate::error::ApiError;

/// The requester and the hierarchy come from the same snapshot.
fn requester(snapshot: &OrgSnapshot, id: &MemberId) -> Result<Requester, ApiError> {
  snapshot
    .get(id)
    .map(Requester::from)
    .ok_or_else(|| ApiError::NotFound(format!("member {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /members`
pub async fn list<D: Directory>(
  State(directory): State<Arc<D>>,
) -> Result<Json<Vec<OrgMember>>, ApiError> {
  let snapshot = directory.snapshot().await.map_err(ApiError::directory)?;
  Ok(Json(snapshot.into_members()))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /members/:id`
pub async fn get_one<D: Directory>(
  State(directory): State<Arc<D>>,
  Path(id): Path<MemberId>,
) -> Result<Json<OrgMember>, ApiError> {
  let snapshot = directory.snapshot().await.map_err(ApiError::directory)?;
  snapshot
    .get(&id)
    .cloned()
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("member {id} not found")))
}

// ─── Assignable ───────────────────────────────────────────────────────────────

/// `GET /members/:id/assignable`
///
/// Fetches a fresh snapshot on every call.
pub async fn assignable<D: Directory>(
  State(directory): State<Arc<D>>,
  Path(id): Path<MemberId>,
) -> Result<Json<AssignableSet>, ApiError> {
  let snapshot = directory.snapshot().await.map_err(ApiError::directory)?;
  let requester = requester(&snapshot, &id)?;
  let set = hierarchy::resolve(&snapshot, &requester)?.sorted_by_name();
  tracing::debug!(
    requester = %id,
    role = ?requester.role,
    assignable = set.len(),
    "resolved assignable members"
  );
  Ok(Json(set))
}

// ─── Subordinates ─────────────────────────────────────────────────────────────

/// `GET /members/:id/subordinates`
pub async fn subordinates<D: Directory>(
  State(directory): State<Arc<D>>,
  Path(id): Path<MemberId>,
) -> Result<Json<Vec<OrgMember>>, ApiError> {
  let snapshot = directory.snapshot().await.map_err(ApiError::directory)?;
  if !snapshot.contains(&id) {
    return Err(ApiError::NotFound(format!("member {id} not found")));
  }
  let reports = hierarchy::subordinates(&snapshot, &id)
    .into_iter()
    .cloned()
    .collect();
  Ok(Json(reports))
}

// ─── Can assign ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CanAssign {
  pub assignable: bool,
}

/// `GET /members/:id/can-assign/:assignee`
pub async fn can_assign<D: Directory>(
  State(directory): State<Arc<D>>,
  Path((id, assignee)): Path<(MemberId, MemberId)>,
) -> Result<Json<CanAssign>, ApiError> {
  let snapshot = directory.snapshot().await.map_err(ApiError::directory)?;
  let requester = requester(&snapshot, &id)?;
  let assignable = hierarchy::can_assign(&snapshot, &requester, &assignee)?;
  Ok(Json(CanAssign { assignable }))
}
