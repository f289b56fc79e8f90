//! # tb-ui
//!
//! Plain-text rendering of a projected thread.

use askama::Template;
use tb_core::Board;
use tb_services::{
    AuthorizationGuard, IdentityContext, NodeState, ReplyContext, Thread, UsernameResolver,
};

/// One display line of the thread, already resolved for the template.
pub struct RowView {
    pub id: String,
    pub indent: String,
    pub title: String,
    pub text: String,
    pub author: String,
    pub can_delete: bool,
    /// Affordance or status shown under the comment, if any.
    pub marker: Option<String>,
}

#[derive(Template)]
#[template(path = "thread.txt")]
pub struct ThreadTemplate<'a> {
    pub board: &'a Board,
    pub banner: Option<String>,
    pub notice: Option<String>,
    pub rows: Vec<RowView>,
}

fn marker(state: &NodeState, names: &UsernameResolver) -> Option<String> {
    match state {
        NodeState::Loaded => None,
        NodeState::Collapsed => Some("[+] show replies".to_string()),
        NodeState::Loading => Some(names.labels().loading.clone()),
        NodeState::Failed(msg) => Some(format!("[!] {msg}")),
        NodeState::MaxDepthExceeded => Some("[...] show more".to_string()),
    }
}

impl<'a> ThreadTemplate<'a> {
    /// Names come from the resolver's cache; unresolved ones show the
    /// loading label.
    pub fn new(
        thread: &'a Thread,
        names: &UsernameResolver,
        identity: &IdentityContext,
        reply: &ReplyContext,
    ) -> Self {
        let rows: Vec<RowView> = thread
            .rows()
            .into_iter()
            .map(|row| RowView {
                id: row.comment.id.clone(),
                indent: "  ".repeat(row.depth),
                title: row.comment.title.clone(),
                text: row.comment.text.clone(),
                author: names.display_name(&row.comment.user_id),
                can_delete: AuthorizationGuard::offers_delete(row.comment, identity),
                marker: marker(row.state, names),
            })
            .collect();

        let notice = match &thread.state {
            NodeState::Failed(msg) => Some(msg.clone()),
            NodeState::Loading => Some(names.labels().loading.clone()),
            _ if rows.is_empty() => Some("No comments yet.".to_string()),
            _ => None,
        };

        Self {
            board: &thread.board,
            banner: reply.banner(),
            notice,
            rows,
        }
    }
}
