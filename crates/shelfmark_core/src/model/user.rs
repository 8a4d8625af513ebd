//! User profile read model.
//!
//! Authentication lives outside this crate; operations receive an
//! already-resolved `UserId` and never consult ambient session state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a user.
pub type UserId = Uuid;

/// Public profile of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    /// Unique URL handle, normalized at registration.
    pub slug: String,
    pub firstname: String,
    pub picture_url: Option<String>,
    pub biography: Option<String>,
    pub website: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Registration draft; the id and timestamps are assigned at persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Requested handle; normalized to a slug before persistence.
    pub slug: String,
    pub firstname: String,
    pub picture_url: Option<String>,
}
