//! threadboard/crates/tb-core/src/lib.rs
//!
//! The domain models, error taxonomy and port definitions for Threadboard.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn comment_uses_camel_case_wire_names() {
        let json = serde_json::json!({
            "id": "c1",
            "parentId": "general",
            "title": "Hi",
            "text": "hello",
            "userId": "u1",
        });
        let comment: Comment = serde_json::from_value(json).unwrap();
        assert_eq!(comment.parent_id, "general");
        assert_eq!(comment.user_id, "u1");
        assert!(comment.created_at.is_none());
        assert!(!comment.is_anonymous());
    }

    #[test]
    fn identity_claim_reads_token_field_names() {
        let json = serde_json::json!({
            "id": "u1",
            "email": "u1@example.com",
            "username": "alice",
            "iat": 1_700_000_000,
            "exp": 1_700_003_600,
        });
        let claim: IdentityClaim = serde_json::from_value(json).unwrap();
        assert_eq!(claim.user_id, "u1");
        assert_eq!(claim.expires_at - claim.issued_at, 3600);
        assert_eq!(claim.issued_at_utc().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn new_comment_serializes_for_the_service() {
        let new = NewComment {
            parent_id: "general".into(),
            user_id: ANONYMOUS_USER_ID.into(),
            title: "t".into(),
            text: "x".into(),
        };
        let value = serde_json::to_value(&new).unwrap();
        assert_eq!(value["parentId"], "general");
        assert_eq!(value["userId"], "-1");
    }
}
