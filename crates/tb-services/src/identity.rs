//! # IdentityContext
//!
//! The caller's identity for one session, established once from the
//! external session artifact and then passed by reference to every
//! component that needs it.

use std::sync::Arc;

use tb_core::{IdentityClaim, Session, SessionSource};
use tracing::{debug, warn};

/// Current caller identity. `None` is the anonymous visitor, not an error.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    session: Option<Arc<Session>>,
}

impl IdentityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: session.map(Arc::new),
        }
    }

    /// Reads the session once. Unreadable artifacts degrade to anonymous.
    pub fn from_source(source: &dyn SessionSource) -> Self {
        match source.load_session() {
            Ok(Some(session)) => {
                debug!(user_id = %session.user_id(), "session established");
                Self::new(Some(session))
            }
            Ok(None) => Self::anonymous(),
            Err(err) => {
                warn!(error = %err, "session artifact unreadable, continuing anonymously");
                Self::anonymous()
            }
        }
    }

    pub fn current_identity(&self) -> Option<&IdentityClaim> {
        self.session.as_deref().map(|s| &s.claim)
    }

    /// The claim together with its bearer token, for mutating calls.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.session.is_none()
    }
}
