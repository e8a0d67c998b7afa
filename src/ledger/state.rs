//! Vote state machine
//!
//! ```text
//! Unflagged --(new voter, score <= -1)--> Flagged
//! Flagged   --(further votes)-----------> Flagged (no notification)
//! ```
//!
//! Both repository backends run every vote through [`apply_vote`], so the
//! in-memory and MongoDB paths agree on score, voters and flag state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::schemas::ContentDoc;
use crate::types::NotewardenError;

/// Score at or below which content is flagged
pub const FLAG_THRESHOLD: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    #[serde(rename = "upvote")]
    Up,
    #[serde(rename = "downvote")]
    Down,
}

impl VoteDirection {
    pub fn delta(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl FromStr for VoteDirection {
    type Err = NotewardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteDirection::Up),
            "downvote" => Ok(VoteDirection::Down),
            other => Err(NotewardenError::InvalidVoteType(other.to_string())),
        }
    }
}

/// Flag state change caused by one vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagTransition {
    /// Flag state did not change
    Unchanged,
    /// This vote moved the item from unflagged to flagged
    Flagged,
}

impl FlagTransition {
    pub fn between(before: &ContentDoc, after: &ContentDoc) -> Self {
        if !before.flagged && after.flagged {
            FlagTransition::Flagged
        } else {
            FlagTransition::Unchanged
        }
    }
}

/// Apply one vote to an item in place
///
/// Fails with `DuplicateVote` and leaves the item untouched when the voter
/// is already recorded.
pub fn apply_vote(
    item: &mut ContentDoc,
    voter_id: &str,
    direction: VoteDirection,
) -> Result<FlagTransition, NotewardenError> {
    if item.has_voted(voter_id) {
        return Err(NotewardenError::DuplicateVote(item.kind.to_string()));
    }

    item.score += direction.delta();
    item.voted_by.push(voter_id.to_string());

    if !item.flagged && item.score <= FLAG_THRESHOLD {
        item.flagged = true;
        return Ok(FlagTransition::Flagged);
    }

    Ok(FlagTransition::Unchanged)
}
