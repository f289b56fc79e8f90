//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be wired into the engine.
//! Adapters report failures as `anyhow::Error`; the engine decides how each
//! one surfaces to the user.

use async_trait::async_trait;

use crate::models::{Board, Comment, DeleteOutcome, NewComment, Session, UserProfile};

/// Comment service boundary: board lookup plus comment fetch/create/delete.
///
/// The service is the authority for delete authorization; a client-side
/// check never replaces it.
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Returns the board for `slug`, if any.
    async fn board_by_slug(&self, slug: &str) -> anyhow::Result<Option<Board>>;

    /// Returns every comment whose `parent_id` equals `parent_id`.
    async fn children(&self, parent_id: &str) -> anyhow::Result<Vec<Comment>>;

    /// Creates a comment. `token` is forwarded verbatim as a bearer credential.
    async fn create_comment(
        &self,
        comment: NewComment,
        token: Option<&str>,
    ) -> anyhow::Result<Comment>;

    async fn delete_comment(&self, comment_id: &str, token: &str)
        -> anyhow::Result<DeleteOutcome>;
}

/// User lookup contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Ok(None) means the user does not exist.
    async fn user(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>>;
}

/// Produces the session established by the external identity provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionSource: Send + Sync {
    /// Ok(None) is the normal anonymous case.
    fn load_session(&self) -> anyhow::Result<Option<Session>>;
}
