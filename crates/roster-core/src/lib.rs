//! Core types for Roster: organization members, the hierarchy resolver that
//! decides who a requester may assign work to, and the directory abstraction
//! that supplies organization snapshots.
//!
//! This crate performs no I/O. The HTTP surface (`roster-api`) and the
//! presence channel (`roster-presence`) build on it.

pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod member;
pub mod snapshot;

pub use error::{Error, Result};
pub use hierarchy::{AssignableSet, ReportingIndex, can_assign, resolve, subordinates};
pub use member::{MemberId, MemberRef, OrgMember, Requester, Role};
pub use snapshot::OrgSnapshot;
