//! # tb-http
//!
//! REST implementation of `CommentService` and `UserDirectory`.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET  boards?slug=<slug>`        → `[Board]` (first match wins)
//! - `GET  comments?parentId=<id>`    → `[Comment]`
//! - `GET  user/<id>`                 → `User` or 404
//! - `POST comment`                   → created `Comment` (bearer token)
//! - `DELETE comment/<id>`            → 2xx / 401 / 403 / 404 (bearer token)

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tb_core::{Board, Comment, CommentService, DeleteOutcome, NewComment, UserDirectory, UserProfile};
use tracing::{debug, instrument};

pub struct HttpCommentService {
    client: Client,
    base_url: Url,
}

impl HttpCommentService {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // Joining relative paths needs a trailing slash on the base.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("invalid comment API base URL {base_url}"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// `base/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn delete_outcome(status: StatusCode) -> anyhow::Result<DeleteOutcome> {
    match status {
        s if s.is_success() => Ok(DeleteOutcome::Deleted),
        StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(DeleteOutcome::Unauthorized),
        s => Err(anyhow!("delete failed with status {s}")),
    }
}

#[async_trait]
impl CommentService for HttpCommentService {
    #[instrument(skip(self))]
    async fn board_by_slug(&self, slug: &str) -> anyhow::Result<Option<Board>> {
        let boards: Vec<Board> = self
            .client
            .get(self.endpoint(&["boards"])?)
            .query(&[("slug", slug)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(boards.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn children(&self, parent_id: &str) -> anyhow::Result<Vec<Comment>> {
        let comments: Vec<Comment> = self
            .client
            .get(self.endpoint(&["comments"])?)
            .query(&[("parentId", parent_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(count = comments.len(), "children fetched");
        Ok(comments)
    }

    #[instrument(skip(self, comment, token), fields(parent_id = %comment.parent_id))]
    async fn create_comment(
        &self,
        comment: NewComment,
        token: Option<&str>,
    ) -> anyhow::Result<Comment> {
        let mut request = self.client.post(self.endpoint(&["comment"])?).json(&comment);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let created = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created)
    }

    #[instrument(skip(self, token))]
    async fn delete_comment(&self, comment_id: &str, token: &str) -> anyhow::Result<DeleteOutcome> {
        let response = self
            .client
            .delete(self.endpoint(&["comment", comment_id])?)
            .bearer_auth(token)
            .send()
            .await?;
        delete_outcome(response.status())
    }
}

#[async_trait]
impl UserDirectory for HttpCommentService {
    #[instrument(skip(self))]
    async fn user(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>> {
        let response = self
            .client
            .get(self.endpoint(&["user", user_id])?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let profile = response.error_for_status()?.json().await?;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpCommentService {
        HttpCommentService::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoints_extend_the_base_path() {
        let svc = service("http://localhost:3002/api");
        assert_eq!(
            svc.endpoint(&["comments"]).unwrap().as_str(),
            "http://localhost:3002/api/comments"
        );
        let svc = service("http://localhost:3002/api/");
        assert_eq!(
            svc.endpoint(&["comment", "c1"]).unwrap().as_str(),
            "http://localhost:3002/api/comment/c1"
        );
    }

    #[test]
    fn ids_are_encoded_as_one_segment() {
        let svc = service("http://localhost:3002/api");
        assert_eq!(
            svc.endpoint(&["user", "a/b c"]).unwrap().as_str(),
            "http://localhost:3002/api/user/a%2Fb%20c"
        );
    }

    #[test]
    fn delete_statuses_map_to_outcomes() {
        assert_eq!(delete_outcome(StatusCode::NO_CONTENT).unwrap(), DeleteOutcome::Deleted);
        assert_eq!(delete_outcome(StatusCode::NOT_FOUND).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(delete_outcome(StatusCode::FORBIDDEN).unwrap(), DeleteOutcome::Unauthorized);
        assert!(delete_outcome(StatusCode::BAD_GATEWAY).is_err());
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(HttpCommentService::new("not a url", Duration::from_secs(1)).is_err());
    }
}
