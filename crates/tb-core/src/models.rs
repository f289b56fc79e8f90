//! # Domain Models
//!
//! These structs represent the entities the thread engine works with.
//! Ids are opaque strings assigned by the comment service; a board id and a
//! comment id share one parent-id address space.

use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Owner id reserved for comments posted without an identity.
pub const ANONYMOUS_USER_ID: &str = "-1";

/// A named discussion area; root of a comment forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    /// The URL slug (e.g., "general")
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// A single post, attached either to the board root or to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub text: String,
    pub user_id: String,
    /// Only present when the comment service reports creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }
}

/// Submission payload; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub parent_id: String,
    pub user_id: String,
    pub title: String,
    pub text: String,
}

/// Public profile returned by the user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
}

/// Decoded assertion about the current user.
///
/// Produced by the identity provider and trusted as given: neither the
/// signature nor the expiry is checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    #[serde(rename = "id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Unix seconds
    #[serde(rename = "iat", default)]
    pub issued_at: i64,
    /// Unix seconds
    #[serde(rename = "exp", default)]
    pub expires_at: i64,
}

impl IdentityClaim {
    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.issued_at, 0).single()
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }
}

/// An identity claim together with the opaque bearer token it came with.
///
/// The token is only ever passed verbatim to mutating calls.
#[derive(Debug)]
pub struct Session {
    pub claim: IdentityClaim,
    pub token: SecretString,
}

impl Session {
    pub fn new(claim: IdentityClaim, token: impl Into<String>) -> Self {
        Self {
            claim,
            token: SecretString::from(token.into()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.claim.user_id
    }
}

/// Result of a delete request as reported by the comment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The comment was already gone server-side.
    NotFound,
    /// The service refused the caller.
    Unauthorized,
}
