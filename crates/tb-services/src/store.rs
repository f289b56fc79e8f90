//! # CommentStore
//!
//! Holds the comments known for the open board and issues fetch, create and
//! delete exchanges against the comment service.
//!
//! State is keyed two ways: comment id to comment, and parent id to the
//! ordered child ids last returned for that parent. Loads for different
//! parents touch disjoint entries; a repeated load for the same parent
//! replaces its entry wholesale, so overlapping calls never duplicate a child.
//!
//! Every board open or close bumps a generation counter. A result is applied
//! only if the generation it was issued under is still current.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use secrecy::ExposeSecret;
use tb_core::{
    AppError, Board, Comment, CommentService, DeleteOutcome, NewComment, Result, Session,
    ANONYMOUS_USER_ID,
};
use tracing::{debug, info, warn};

use crate::guard::AuthorizationGuard;

pub struct CommentStore {
    service: Arc<dyn CommentService>,
    timeout: Duration,
    generation: AtomicU64,
    board: RwLock<Option<Board>>,
    comments: DashMap<String, Comment>,
    children: DashMap<String, Vec<String>>,
}

impl CommentStore {
    pub fn new(service: Arc<dyn CommentService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            generation: AtomicU64::new(0),
            board: RwLock::new(None),
            comments: DashMap::new(),
            children: DashMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn board(&self) -> Option<Board> {
        self.board
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn board_id(&self) -> Option<String> {
        self.board().map(|b| b.id)
    }

    /// Tears down the current view and loads the board for `slug`.
    pub async fn open_board(&self, slug: &str) -> Result<Board> {
        let generation = self.reset();

        let board = self
            .exchange(self.service.board_by_slug(slug))
            .await
            .map_err(AppError::transport)?
            .ok_or_else(|| AppError::NotFound("Board".into(), slug.into()))?;

        self.ensure_current(generation)?;
        *self.board.write().unwrap_or_else(PoisonError::into_inner) = Some(board.clone());
        info!(board = %board.slug, generation, "board opened");
        Ok(board)
    }

    /// Discards everything; results still in flight will be dropped.
    pub fn close(&self) {
        let generation = self.reset();
        debug!(generation, "board view closed");
    }

    fn reset(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.board.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.comments.clear();
        self.children.clear();
        generation
    }

    fn ensure_current(&self, issued: u64) -> Result<()> {
        if self.generation() == issued {
            Ok(())
        } else {
            debug!(issued, current = self.generation(), "dropping stale result");
            Err(AppError::Stale(issued))
        }
    }

    async fn exchange<T>(&self, call: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("timed out after {:?}", self.timeout)),
        }
    }

    /// Fetches the children of `parent_id` and records them.
    ///
    /// Safe to call repeatedly; an empty sequence is a normal result.
    pub async fn load_children(&self, parent_id: &str) -> Result<Vec<Comment>> {
        let generation = self.generation();

        let fetched = self
            .exchange(self.service.children(parent_id))
            .await
            .map_err(AppError::transport)?;

        self.ensure_current(generation)?;

        let mut ids: Vec<String> = Vec::with_capacity(fetched.len());
        let mut kept = Vec::with_capacity(fetched.len());
        for comment in fetched {
            if comment.parent_id != parent_id {
                warn!(id = %comment.id, parent_id, "service returned a comment for another parent");
                continue;
            }
            if ids.contains(&comment.id) {
                continue;
            }
            ids.push(comment.id.clone());
            self.comments.insert(comment.id.clone(), comment.clone());
            kept.push(comment);
        }

        debug!(parent_id, count = ids.len(), "children loaded");
        self.children.insert(parent_id.to_string(), ids);
        Ok(kept)
    }

    pub fn is_loaded(&self, parent_id: &str) -> bool {
        self.children.contains_key(parent_id)
    }

    pub fn comment(&self, comment_id: &str) -> Option<Comment> {
        self.comments.get(comment_id).map(|c| c.clone())
    }

    /// Known children of `parent_id`, or None when never loaded.
    pub fn children_of(&self, parent_id: &str) -> Option<Vec<Comment>> {
        let ids = self.children.get(parent_id)?.clone();
        Some(ids.iter().filter_map(|id| self.comment(id)).collect())
    }

    /// Posts a new comment under `parent_id` as `identity`, or anonymously.
    ///
    /// Title and text are expected to be validated by the caller.
    pub async fn submit(
        &self,
        parent_id: &str,
        title: &str,
        text: &str,
        identity: Option<&Session>,
    ) -> Result<Comment> {
        let generation = self.generation();
        let new = NewComment {
            parent_id: parent_id.to_string(),
            user_id: identity
                .map(|s| s.user_id().to_string())
                .unwrap_or_else(|| ANONYMOUS_USER_ID.to_string()),
            title: title.to_string(),
            text: text.to_string(),
        };
        let token = identity.map(|s| s.token.expose_secret());

        let created = self
            .exchange(self.service.create_comment(new, token))
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;

        info!(id = %created.id, parent_id, "comment submitted");
        if self.generation() == generation {
            self.comments.insert(created.id.clone(), created.clone());
            if let Some(mut siblings) = self.children.get_mut(&created.parent_id) {
                if !siblings.contains(&created.id) {
                    siblings.push(created.id.clone());
                }
            }
        }
        Ok(created)
    }

    /// Deletes a comment owned by `identity`.
    ///
    /// Only the comment itself leaves local state; its children keep their
    /// `parent_id` and stay addressable through [`Self::children_of`].
    pub async fn remove(&self, comment_id: &str, identity: Option<&Session>) -> Result<()> {
        let comment = self
            .comment(comment_id)
            .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.into()))?;

        AuthorizationGuard::check_delete(&comment, identity.map(|s| &s.claim))?;
        let session = identity.ok_or_else(|| AppError::Authorization("no identity".into()))?;

        let generation = self.generation();
        let outcome = self
            .exchange(
                self.service
                    .delete_comment(comment_id, session.token.expose_secret()),
            )
            .await
            .map_err(AppError::transport)?;

        match outcome {
            DeleteOutcome::Deleted => info!(comment_id, "comment deleted"),
            DeleteOutcome::NotFound => debug!(comment_id, "comment already gone"),
            DeleteOutcome::Unauthorized => {
                warn!(comment_id, "service refused delete");
                return Err(AppError::Authorization(format!(
                    "service refused delete of {comment_id}"
                )));
            }
        }

        self.ensure_current(generation)?;
        self.comments.remove(comment_id);
        if let Some(mut siblings) = self.children.get_mut(&comment.parent_id) {
            siblings.retain(|id| id != comment_id);
        }
        Ok(())
    }
}
