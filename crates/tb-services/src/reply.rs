//! # ReplyContext
//!
//! Tracks the single reply target of the current composition session and
//! drives submission of the form draft.

use tb_core::{AppError, Comment, Result};
use tracing::debug;

use crate::identity::IdentityContext;
use crate::store::CommentStore;

/// Form contents. Kept by the caller so a failed submission can be retried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub title: String,
    pub text: String,
}

impl CommentDraft {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required.".into()));
        }
        if self.text.trim().is_empty() {
            return Err(AppError::Validation("Text is required.".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReplyContext {
    #[default]
    Idle,
    Replying { comment_id: String, title: String },
}

impl ReplyContext {
    /// Targets `comment`. Replaces any pending target.
    pub fn reply_to(&mut self, comment: &Comment) {
        debug!(comment_id = %comment.id, "reply target set");
        *self = Self::Replying {
            comment_id: comment.id.clone(),
            title: comment.title.clone(),
        };
    }

    pub fn cancel(&mut self) {
        *self = Self::Idle;
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Replying { comment_id, .. } => Some(comment_id),
        }
    }

    /// Parent for the next submission: the target, else the board root.
    pub fn parent_id<'a>(&'a self, board_id: &'a str) -> &'a str {
        self.target().unwrap_or(board_id)
    }

    /// Banner text for the composition form.
    pub fn banner(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Replying { title, .. } => Some(format!("Replying to: {title}")),
        }
    }

    /// Validates and posts `draft`. Returns to Idle only on success;
    /// on failure the target and the caller's draft are untouched.
    pub async fn submit(
        &mut self,
        store: &CommentStore,
        draft: &CommentDraft,
        identity: &IdentityContext,
    ) -> Result<Comment> {
        draft.validate()?;
        let board_id = store
            .board_id()
            .ok_or_else(|| AppError::Submission("no board is open".into()))?;
        let parent_id = self.parent_id(&board_id).to_string();

        let created = store
            .submit(&parent_id, &draft.title, &draft.text, identity.session())
            .await?;
        self.cancel();
        Ok(created)
    }
}
