//! # AuthorizationGuard
//!
//! Decides whether the delete action should be offered for a comment.
//! This is a UX filter only: the comment service re-checks ownership and
//! its answer is final.

use tb_core::{AppError, Comment, IdentityClaim, Result};

use crate::identity::IdentityContext;

pub struct AuthorizationGuard;

impl AuthorizationGuard {
    /// True iff an identity is present and owns the comment.
    /// Anonymous comments are never deletable.
    pub fn can_delete(comment: &Comment, identity: Option<&IdentityClaim>) -> bool {
        match identity {
            Some(claim) => !comment.is_anonymous() && claim.user_id == comment.user_id,
            None => false,
        }
    }

    pub fn check_delete(comment: &Comment, identity: Option<&IdentityClaim>) -> Result<()> {
        if Self::can_delete(comment, identity) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "caller may not delete comment {}",
                comment.id
            )))
        }
    }

    /// Whether to show the delete affordance at all.
    pub fn offers_delete(comment: &Comment, ctx: &IdentityContext) -> bool {
        ctx.session().is_some() && Self::can_delete(comment, ctx.current_identity())
    }
}
