//! # ThreadBuilder
//!
//! Projects the store's flat comment collection into a tree rooted at the
//! board. Children are fetched per node on first expansion, never for the
//! whole board at once.
//!
//! All traversals use explicit work lists, so thread depth is bounded by
//! memory rather than by the call stack.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde::Deserialize;
use tb_core::{AppError, Board, Comment, Result};
use tracing::{debug, warn};

use crate::store::CommentStore;

/// Expansion state of a node (or of the board root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// Children not requested yet.
    Collapsed,
    Loading,
    Loaded,
    /// Last fetch failed; carries the user-facing message.
    Failed(String),
    /// At the depth guard; rendered as a "show more" affordance with any
    /// loaded descendants listed flat beneath it.
    MaxDepthExceeded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingOrder {
    /// Keep whatever order the comment service returned.
    #[default]
    AsReturned,
    /// Oldest first by `created_at`; undated comments go last.
    CreatedAt,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ThreadNode {
    pub comment: Comment,
    pub state: NodeState,
    pub children: Vec<ThreadNode>,
}

// The derived drop would recurse once per level.
impl Drop for ThreadNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// One line of a flattened thread, in display order.
#[derive(Debug, Clone, Copy)]
pub struct ThreadRow<'a> {
    pub depth: usize,
    pub comment: &'a Comment,
    pub state: &'a NodeState,
}

/// Snapshot of the visible tree for one board.
#[derive(Debug)]
pub struct Thread {
    pub board: Board,
    pub state: NodeState,
    pub roots: Vec<ThreadNode>,
}

impl Thread {
    /// Pre-order rows with their depth, roots at depth 0.
    pub fn rows(&self) -> Vec<ThreadRow<'_>> {
        let mut rows = Vec::new();
        let mut stack: Vec<(usize, &ThreadNode)> =
            self.roots.iter().rev().map(|n| (0, n)).collect();
        while let Some((depth, node)) = stack.pop() {
            rows.push(ThreadRow {
                depth,
                comment: &node.comment,
                state: &node.state,
            });
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        }
        rows
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub struct ThreadBuilder {
    store: Arc<CommentStore>,
    max_depth: usize,
    order: SiblingOrder,
    /// Loading and Failed marks; Loaded is read from the store.
    marks: DashMap<String, NodeState>,
}

impl ThreadBuilder {
    pub fn new(store: Arc<CommentStore>, max_depth: usize, order: SiblingOrder) -> Self {
        Self {
            store,
            max_depth: max_depth.max(1),
            order,
            marks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<CommentStore> {
        &self.store
    }

    /// Opens the board and loads its top-level comments.
    ///
    /// A failed top-level fetch leaves the root in [`NodeState::Failed`];
    /// only a failed board lookup is an error.
    pub async fn open(&self, slug: &str) -> Result<Board> {
        self.marks.clear();
        let board = self.store.open_board(slug).await?;
        if let Err(err) = self.expand(&board.id).await {
            warn!(board = %board.slug, error = %err, "top-level comments unavailable");
        }
        Ok(board)
    }

    pub fn close(&self) {
        self.marks.clear();
        self.store.close();
    }

    /// Loads the children of `node_id` unless they are already known.
    pub async fn expand(&self, node_id: &str) -> Result<()> {
        if self.store.is_loaded(node_id) {
            return Ok(());
        }
        self.refresh(node_id).await
    }

    /// Re-fetches the children of `node_id` even if already known.
    pub async fn refresh(&self, node_id: &str) -> Result<()> {
        let generation = self.store.generation();
        self.marks.insert(node_id.to_string(), NodeState::Loading);

        match self.store.load_children(node_id).await {
            Ok(children) => {
                debug!(node_id, count = children.len(), "node expanded");
                self.marks.remove(node_id);
                Ok(())
            }
            // The marks now belong to another view; leave them alone.
            Err(err @ AppError::Stale(_)) => Err(err),
            Err(err) => {
                if self.store.generation() == generation {
                    self.marks
                        .insert(node_id.to_string(), NodeState::Failed(err.user_message()));
                }
                Err(err)
            }
        }
    }

    /// Expands breadth-first from the board root down to the depth guard.
    /// Each level is fetched concurrently. Failures are recorded per node.
    pub async fn expand_all(&self) -> Result<()> {
        let root = self
            .store
            .board_id()
            .ok_or_else(|| AppError::NotFound("Board".into(), String::new()))?;
        let generation = self.store.generation();

        let mut seen = HashSet::from([root.clone()]);
        let mut level = vec![root];
        // level 0 is the board itself; level n holds comments at depth n - 1
        let mut depth = 0usize;
        while !level.is_empty() && depth <= self.max_depth {
            let results = join_all(level.iter().map(|id| self.expand(id))).await;
            if results.iter().any(|r| matches!(r, Err(AppError::Stale(_)))) {
                return Err(AppError::Stale(generation));
            }

            let mut next = Vec::new();
            for id in &level {
                for child in self.store.children_of(id).unwrap_or_default() {
                    if seen.insert(child.id.clone()) {
                        next.push(child.id);
                    }
                }
            }
            level = next;
            depth += 1;
        }
        Ok(())
    }

    /// Current expansion state of `node_id` (a comment or the board root).
    pub fn state_of(&self, node_id: &str) -> NodeState {
        if let Some(mark) = self.marks.get(node_id) {
            return mark.clone();
        }
        if self.store.is_loaded(node_id) {
            NodeState::Loaded
        } else {
            NodeState::Collapsed
        }
    }

    fn ordered_children(&self, node_id: &str) -> Vec<Comment> {
        let mut children = self.store.children_of(node_id).unwrap_or_default();
        if self.order == SiblingOrder::CreatedAt {
            // stable: undated comments keep their relative order at the end
            children.sort_by_key(|c| (c.created_at.is_none(), c.created_at));
        }
        children
    }

    /// Builds the current tree from what has been loaded so far.
    ///
    /// Returns None when no board is open.
    pub fn project(&self) -> Option<Thread> {
        let board = self.store.board()?;
        let root_state = self.state_of(&board.id);

        struct Slot {
            comment: Comment,
            state: NodeState,
            children: Vec<usize>,
        }

        let mut slots: Vec<Slot> = Vec::new();
        let mut root_slots = Vec::new();
        let mut seen = HashSet::from([board.id.clone()]);
        // (parent slot, depth, comment); parent None means top level
        let mut queue: VecDeque<(Option<usize>, usize, Comment)> = self
            .ordered_children(&board.id)
            .into_iter()
            .map(|c| (None, 0, c))
            .collect();

        while let Some((parent, depth, comment)) = queue.pop_front() {
            if !seen.insert(comment.id.clone()) {
                warn!(id = %comment.id, "comment reachable twice, skipping");
                continue;
            }
            let idx = slots.len();
            // Past the guard, loaded descendants hang flat under the guard node.
            let (state, children_go_to) = match depth.cmp(&self.max_depth) {
                CmpOrdering::Less => {
                    let state = self.state_of(&comment.id);
                    let open = state == NodeState::Loaded;
                    (state, open.then_some((Some(idx), depth + 1)))
                }
                CmpOrdering::Equal => (
                    NodeState::MaxDepthExceeded,
                    self.store
                        .is_loaded(&comment.id)
                        .then_some((Some(idx), depth + 1)),
                ),
                CmpOrdering::Greater => {
                    let state = self.state_of(&comment.id);
                    let open = state == NodeState::Loaded;
                    (state, open.then_some((parent, depth)))
                }
            };
            if let Some((target, child_depth)) = children_go_to {
                queue.extend(
                    self.ordered_children(&comment.id)
                        .into_iter()
                        .map(|c| (target, child_depth, c)),
                );
            }
            match parent {
                Some(p) => slots[p].children.push(idx),
                None => root_slots.push(idx),
            }
            slots.push(Slot {
                comment,
                state,
                children: Vec::new(),
            });
        }

        // Breadth-first indices: every child sits after its parent, so a
        // reverse sweep finishes children before the parent claims them.
        let mut built: Vec<Option<ThreadNode>> = Vec::with_capacity(slots.len());
        built.resize_with(slots.len(), || None);
        for (idx, slot) in slots.into_iter().enumerate().rev() {
            let children = slot
                .children
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[idx] = Some(ThreadNode {
                comment: slot.comment,
                state: slot.state,
                children,
            });
        }
        let roots = root_slots
            .iter()
            .filter_map(|&r| built[r].take())
            .collect();

        Some(Thread {
            board,
            state: root_state,
            roots,
        })
    }
}
