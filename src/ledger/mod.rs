//! Vote ledger
//!
//! One vote per account per item, net score, and a single flag
//! notification when an item crosses into the flagged state.
//!
//! The repository applies the vote as one conditional update. The
//! notification goes out only after that update has returned, and its
//! failure never fails the vote.

pub mod state;

use std::sync::Arc;
use tracing::{debug, info, warn};

pub use state::{apply_vote, FlagTransition, VoteDirection, FLAG_THRESHOLD};

use crate::db::repository::{AccountRepository, ConditionalUpdate, ContentRepository, VoteMutation};
use crate::db::schemas::{ContentDoc, ContentKind};
use crate::notify::Notifier;
use crate::types::{NotewardenError, Result};

/// Message owed to the author of a newly flagged item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub to: String,
    pub content: String,
}

/// Result of an accepted vote
#[derive(Debug, Clone)]
pub struct VoteReceipt {
    /// Item as persisted after the vote
    pub item: ContentDoc,
    pub transition: FlagTransition,
    /// Set when this vote flagged the item and the author has an address
    pub notification: Option<NotificationRequest>,
}

pub struct VoteLedger {
    content: Arc<dyn ContentRepository>,
    accounts: Arc<dyn AccountRepository>,
    notifier: Arc<dyn Notifier>,
}

impl VoteLedger {
    pub fn new(
        content: Arc<dyn ContentRepository>,
        accounts: Arc<dyn AccountRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            content,
            accounts,
            notifier,
        }
    }

    /// Record a vote and notify the author on the flag transition
    pub async fn apply_vote(
        &self,
        kind: ContentKind,
        item_id: &str,
        voter_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteReceipt> {
        let mutation = VoteMutation {
            voter_id,
            direction,
        };

        let (before, after) = match self
            .content
            .update_conditional(kind, item_id, mutation)
            .await?
        {
            ConditionalUpdate::Applied { before, after } => (before, after),
            ConditionalUpdate::PredicateFailed => {
                debug!("Duplicate vote by {} on {} {}", voter_id, kind, item_id);
                return Err(NotewardenError::DuplicateVote(kind.to_string()));
            }
            ConditionalUpdate::Missing => {
                return Err(NotewardenError::NotFound(format!("{} not found", kind)));
            }
        };

        let transition = FlagTransition::between(&before, &after);
        let notification = match transition {
            FlagTransition::Flagged => {
                info!(
                    "{} {} flagged at score {} by vote from {}",
                    kind, item_id, after.score, voter_id
                );
                self.notification_for(&after).await
            }
            FlagTransition::Unchanged => None,
        };

        if let Some(request) = &notification {
            self.dispatch(request).await;
        }

        Ok(VoteReceipt {
            item: after,
            transition,
            notification,
        })
    }

    async fn notification_for(&self, item: &ContentDoc) -> Option<NotificationRequest> {
        let author = match self.accounts.find_by_id(&item.author_id).await {
            Ok(Some(author)) => author,
            Ok(None) => {
                warn!(
                    "Author {} of flagged {} {} not found, skipping notification",
                    item.author_id, item.kind, item.id
                );
                return None;
            }
            Err(e) => {
                warn!(
                    "Author lookup for flagged {} {} failed: {}",
                    item.kind, item.id, e
                );
                return None;
            }
        };

        if author.email.trim().is_empty() {
            warn!(
                "Author {} has no email, skipping notification for {} {}",
                author.id, item.kind, item.id
            );
            return None;
        }

        Some(NotificationRequest {
            to: author.email,
            content: item.body.clone(),
        })
    }

    async fn dispatch(&self, request: &NotificationRequest) {
        match self.notifier.notify(&request.to, &request.content).await {
            Ok(()) => debug!("Flag notification sent to {}", request.to),
            Err(e) => warn!("Flag notification to {} failed: {}", request.to, e),
        }
    }
}
