//! Notes and comments
//!
//! Both kinds share one code path. A note hangs off a course module, a
//! comment off a note. Writes are gated by the authorization policy before
//! any repository mutation; votes go through the ledger.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::Claims;
use crate::db::repository::{ContentFilter, ContentRepository, CourseRepository};
use crate::db::schemas::{ContentDoc, ContentKind};
use crate::ledger::{FlagTransition, VoteDirection, VoteLedger};
use crate::policy;
use crate::types::{NotewardenError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentRequest {
    pub content: Option<String>,
}

impl ContentRequest {
    fn validate(self, kind: ContentKind) -> Result<String> {
        self.content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                NotewardenError::ValidationFailed(format!(
                    "{} content is required",
                    capitalized(kind)
                ))
            })
    }
}

/// Vote body; `voteType` is kept untyped so any bad value is an invalid vote type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: Option<serde_json::Value>,
}

impl VoteRequest {
    pub fn direction(&self) -> Result<VoteDirection> {
        match &self.vote_type {
            Some(serde_json::Value::String(vote_type)) => vote_type.parse(),
            None | Some(serde_json::Value::Null) => {
                Err(NotewardenError::InvalidVoteType("missing".into()))
            }
            Some(other) => Err(NotewardenError::InvalidVoteType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentView {
    pub id: String,
    pub kind: ContentKind,
    pub parent_id: String,
    pub author_id: String,
    pub content: String,
    pub score: i64,
    pub flagged: bool,
    pub voter_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<ContentDoc> for ContentView {
    fn from(item: ContentDoc) -> Self {
        Self {
            created_at: item.metadata.created_rfc3339(),
            voter_count: item.voted_by.len(),
            id: item.id,
            kind: item.kind,
            parent_id: item.parent_id,
            author_id: item.author_id,
            content: item.body,
            score: item.score,
            flagged: item.flagged,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    #[serde(flatten)]
    pub item: ContentView,
    /// True when this vote moved the item into the flagged state
    pub newly_flagged: bool,
}

fn capitalized(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Note => "Note",
        ContentKind::Comment => "Comment",
    }
}

fn not_found(kind: ContentKind) -> NotewardenError {
    NotewardenError::NotFound(format!("{} not found", capitalized(kind)))
}

pub struct ContentService {
    content: Arc<dyn ContentRepository>,
    courses: Arc<dyn CourseRepository>,
    ledger: Arc<VoteLedger>,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentRepository>,
        courses: Arc<dyn CourseRepository>,
        ledger: Arc<VoteLedger>,
    ) -> Self {
        Self {
            content,
            courses,
            ledger,
        }
    }

    /// Load an item the caller is allowed to see
    ///
    /// Flagged items look missing to non-admins.
    async fn visible_item(
        &self,
        identity: &Claims,
        kind: ContentKind,
        id: &str,
    ) -> Result<ContentDoc> {
        match self.content.find_by_id(kind, id).await? {
            Some(item) if policy::visible_to(identity, &item) => Ok(item),
            _ => Err(not_found(kind)),
        }
    }

    async fn require_parent(
        &self,
        identity: &Claims,
        kind: ContentKind,
        parent_id: &str,
    ) -> Result<()> {
        match kind {
            ContentKind::Note => {
                if self.courses.find_module(parent_id).await?.is_none() {
                    return Err(NotewardenError::NotFound("Module not found".into()));
                }
            }
            ContentKind::Comment => {
                self.visible_item(identity, ContentKind::Note, parent_id)
                    .await?;
            }
        }
        Ok(())
    }

    /// Post a note under a module or a comment under a note
    pub async fn create(
        &self,
        identity: &Claims,
        kind: ContentKind,
        parent_id: &str,
        request: ContentRequest,
    ) -> Result<ContentView> {
        if !policy::can_create_votable(identity) {
            return Err(NotewardenError::PermissionDenied);
        }
        let body = request.validate(kind)?;
        self.require_parent(identity, kind, parent_id).await?;

        let item = self
            .content
            .insert(ContentDoc::new(
                kind,
                parent_id.to_string(),
                identity.sub.clone(),
                body,
            ))
            .await?;
        info!("{} {} created by {}", kind, item.id, identity.sub);
        Ok(item.into())
    }

    /// Children of one module or note, flagged items hidden from non-admins
    pub async fn list_children(
        &self,
        identity: &Claims,
        kind: ContentKind,
        parent_id: &str,
    ) -> Result<Vec<ContentView>> {
        if kind == ContentKind::Comment {
            self.visible_item(identity, ContentKind::Note, parent_id)
                .await?;
        }
        self.list(identity, ContentFilter::children_of(kind, parent_id))
            .await
    }

    /// Every item of a kind the caller may see
    pub async fn list_all(
        &self,
        identity: &Claims,
        kind: ContentKind,
    ) -> Result<Vec<ContentView>> {
        self.list(identity, ContentFilter::all(kind)).await
    }

    async fn list(
        &self,
        identity: &Claims,
        mut filter: ContentFilter,
    ) -> Result<Vec<ContentView>> {
        if !identity.is_admin() {
            filter = filter.unflagged_only();
        }
        let items = self.content.find(&filter).await?;
        debug!(
            "Listed {} {} items for {}",
            items.len(),
            filter.kind,
            identity.sub
        );
        Ok(policy::filter_visible(identity, items)
            .into_iter()
            .map(ContentView::from)
            .collect())
    }

    /// Replace the body; author or admin only
    pub async fn update_body(
        &self,
        identity: &Claims,
        kind: ContentKind,
        id: &str,
        request: ContentRequest,
    ) -> Result<ContentView> {
        let body = request.validate(kind)?;
        let item = self.visible_item(identity, kind, id).await?;
        policy::require_modify(identity, &item)?;

        self.content
            .update_body(kind, id, &body)
            .await?
            .map(ContentView::from)
            .ok_or_else(|| not_found(kind))
    }

    /// Remove an item; author or admin only
    pub async fn delete(&self, identity: &Claims, kind: ContentKind, id: &str) -> Result<()> {
        let item = self
            .content
            .find_by_id(kind, id)
            .await?
            .ok_or_else(|| not_found(kind))?;
        policy::require_modify(identity, &item)?;

        if !self.content.delete_by_id(kind, id).await? {
            return Err(not_found(kind));
        }
        info!("{} {} deleted by {}", kind, id, identity.sub);
        Ok(())
    }

    /// Cast the caller's single vote on an item
    ///
    /// The vote type is checked before anything is read or written. Items
    /// hidden from the caller are `NotFound`, as on every other read.
    pub async fn vote(
        &self,
        identity: &Claims,
        kind: ContentKind,
        id: &str,
        request: VoteRequest,
    ) -> Result<VoteView> {
        let direction = request.direction()?;
        self.visible_item(identity, kind, id).await?;
        let receipt = self
            .ledger
            .apply_vote(kind, id, &identity.sub, direction)
            .await?;

        Ok(VoteView {
            newly_flagged: receipt.transition == FlagTransition::Flagged,
            item: receipt.item.into(),
        })
    }

    /// Administrative flag, bypassing the score rule and sending nothing
    pub async fn flag(
        &self,
        identity: &Claims,
        kind: ContentKind,
        id: &str,
    ) -> Result<ContentView> {
        if !identity.is_admin() {
            return Err(NotewardenError::Forbidden(
                "Only admins can flag content".into(),
            ));
        }
        let item = self
            .content
            .set_flagged(kind, id, true)
            .await?
            .ok_or_else(|| not_found(kind))?;
        info!("{} {} flagged by admin {}", kind, id, identity.sub);
        Ok(item.into())
    }
}
