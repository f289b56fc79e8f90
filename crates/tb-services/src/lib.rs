//! # tb-services
//!
//! The comment-thread engine: identity, display names, the comment store,
//! lazy thread projection, reply state and the delete guard.

pub mod guard;
pub mod identity;
pub mod reply;
pub mod store;
pub mod thread;
pub mod usernames;

pub use guard::AuthorizationGuard;
pub use identity::IdentityContext;
pub use reply::{CommentDraft, ReplyContext};
pub use store::CommentStore;
pub use thread::{NodeState, SiblingOrder, Thread, ThreadBuilder, ThreadNode, ThreadRow};
pub use usernames::{DisplayLabels, UsernameResolver};
