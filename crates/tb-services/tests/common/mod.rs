//! In-memory comment service used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tb_core::{Board, Comment, CommentService, DeleteOutcome, IdentityClaim, NewComment, Session};
use tb_services::{CommentStore, IdentityContext, SiblingOrder, ThreadBuilder};
use tokio::sync::Notify;

#[derive(Default)]
pub struct FakeCommentService {
    boards: Mutex<Vec<Board>>,
    by_parent: Mutex<HashMap<String, Vec<Comment>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<HashSet<String>>,
    reject_create: Mutex<bool>,
    next_id: AtomicUsize,
    pub children_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeCommentService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_board(&self, id: &str, slug: &str) {
        self.boards.lock().unwrap().push(Board {
            id: id.into(),
            name: slug.to_uppercase(),
            slug: slug.into(),
            description: String::new(),
        });
    }

    pub fn add_comment(&self, id: &str, parent_id: &str, user_id: &str, title: &str) {
        self.by_parent
            .lock()
            .unwrap()
            .entry(parent_id.to_string())
            .or_default()
            .push(comment(id, parent_id, user_id, title));
    }

    pub fn push_raw(&self, comment: Comment) {
        self.by_parent
            .lock()
            .unwrap()
            .entry(comment.parent_id.clone())
            .or_default()
            .push(comment);
    }

    /// Holds `children(parent_id)` until the returned gate is notified.
    pub fn hold(&self, parent_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(parent_id.to_string(), gate.clone());
        gate
    }

    pub fn fail_children_of(&self, parent_id: &str) {
        self.failing.lock().unwrap().insert(parent_id.to_string());
    }

    pub fn reject_creates(&self, reject: bool) {
        *self.reject_create.lock().unwrap() = reject;
    }

    pub fn server_has(&self, id: &str) -> bool {
        self.by_parent
            .lock()
            .unwrap()
            .values()
            .flatten()
            .any(|c| c.id == id)
    }
}

/// Tokens are "tok-<user id>"; the service trusts nothing else.
pub fn session(user_id: &str) -> Session {
    Session::new(
        IdentityClaim {
            user_id: user_id.into(),
            username: format!("name-{user_id}"),
            email: format!("{user_id}@example.com"),
            issued_at: 1_700_000_000,
            expires_at: 1_700_003_600,
        },
        format!("tok-{user_id}"),
    )
}

pub fn identity(user_id: &str) -> IdentityContext {
    IdentityContext::new(Some(session(user_id)))
}

pub fn comment(id: &str, parent_id: &str, user_id: &str, title: &str) -> Comment {
    Comment {
        id: id.into(),
        parent_id: parent_id.into(),
        title: title.into(),
        text: format!("text of {id}"),
        user_id: user_id.into(),
        created_at: None,
    }
}

pub fn builder(service: Arc<FakeCommentService>, max_depth: usize) -> ThreadBuilder {
    let store = Arc::new(CommentStore::new(service, Duration::from_secs(2)));
    ThreadBuilder::new(store, max_depth, SiblingOrder::AsReturned)
}

#[async_trait]
impl CommentService for FakeCommentService {
    async fn board_by_slug(&self, slug: &str) -> anyhow::Result<Option<Board>> {
        Ok(self
            .boards
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.slug == slug)
            .cloned())
    }

    async fn children(&self, parent_id: &str) -> anyhow::Result<Vec<Comment>> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(parent_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().unwrap().contains(parent_id) {
            anyhow::bail!("503 Service Unavailable");
        }
        Ok(self
            .by_parent
            .lock()
            .unwrap()
            .get(parent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_comment(
        &self,
        new: NewComment,
        token: Option<&str>,
    ) -> anyhow::Result<Comment> {
        if *self.reject_create.lock().unwrap() {
            anyhow::bail!("500 Internal Server Error");
        }
        if let Some(token) = token {
            anyhow::ensure!(token == format!("tok-{}", new.user_id), "401 Unauthorized");
        }
        let id = format!("n{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let created = Comment {
            id,
            parent_id: new.parent_id,
            title: new.title,
            text: new.text,
            user_id: new.user_id,
            created_at: None,
        };
        self.by_parent
            .lock()
            .unwrap()
            .entry(created.parent_id.clone())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_comment(&self, comment_id: &str, token: &str) -> anyhow::Result<DeleteOutcome> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut by_parent = self.by_parent.lock().unwrap();
        for siblings in by_parent.values_mut() {
            if let Some(pos) = siblings.iter().position(|c| c.id == comment_id) {
                if token != format!("tok-{}", siblings[pos].user_id) {
                    return Ok(DeleteOutcome::Unauthorized);
                }
                siblings.remove(pos);
                return Ok(DeleteOutcome::Deleted);
            }
        }
        Ok(DeleteOutcome::NotFound)
    }
}
