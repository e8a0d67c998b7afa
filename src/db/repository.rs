//! Repository traits
//!
//! Persistence sits behind these traits so the in-memory backend (dev mode,
//! tests) and the MongoDB backend are interchangeable.

use crate::db::schemas::{AccountDoc, ContentDoc, ContentKind, CourseDoc, CourseFields, ModuleDoc};
use crate::ledger::VoteDirection;
use crate::types::Result;

/// Listing filter for votable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFilter {
    pub kind: ContentKind,
    /// Restrict to a module (notes) or note (comments)
    pub parent_id: Option<String>,
    /// When false, flagged items are left out by the store
    pub include_flagged: bool,
}

impl ContentFilter {
    pub fn all(kind: ContentKind) -> Self {
        Self {
            kind,
            parent_id: None,
            include_flagged: true,
        }
    }

    pub fn children_of(kind: ContentKind, parent_id: &str) -> Self {
        Self {
            kind,
            parent_id: Some(parent_id.to_string()),
            include_flagged: true,
        }
    }

    pub fn unflagged_only(mut self) -> Self {
        self.include_flagged = false;
        self
    }

    pub fn matches(&self, item: &ContentDoc) -> bool {
        item.kind == self.kind
            && self
                .parent_id
                .as_deref()
                .map_or(true, |parent| item.parent_id == parent)
            && (self.include_flagged || !item.flagged)
    }
}

/// The conditional mutation behind a vote: applied only while the voter is
/// absent from `voted_by`
#[derive(Debug, Clone, Copy)]
pub struct VoteMutation<'a> {
    pub voter_id: &'a str,
    pub direction: VoteDirection,
}

/// Outcome of [`ContentRepository::update_conditional`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalUpdate {
    /// Predicate held; both images of the item are returned
    Applied {
        before: ContentDoc,
        after: ContentDoc,
    },
    /// Item exists but the voter had already voted; nothing changed
    PredicateFailed,
    /// No such item
    Missing,
}

#[async_trait::async_trait]
pub trait ContentRepository: Send + Sync {
    async fn find_by_id(&self, kind: ContentKind, id: &str) -> Result<Option<ContentDoc>>;

    async fn insert(&self, item: ContentDoc) -> Result<ContentDoc>;

    async fn find(&self, filter: &ContentFilter) -> Result<Vec<ContentDoc>>;

    /// Replace the body, leaving author, score and votes untouched
    async fn update_body(&self, kind: ContentKind, id: &str, body: &str)
        -> Result<Option<ContentDoc>>;

    /// Atomically check voter absence and apply the vote
    async fn update_conditional(
        &self,
        kind: ContentKind,
        id: &str,
        mutation: VoteMutation<'_>,
    ) -> Result<ConditionalUpdate>;

    /// Administrative flag change, bypassing the score rule
    async fn set_flagged(&self, kind: ContentKind, id: &str, flagged: bool)
        -> Result<Option<ContentDoc>>;

    /// Returns false when nothing was deleted
    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<AccountDoc>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<AccountDoc>>;

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<AccountDoc>>;

    /// Fails with `ValidationFailed` when email or username is taken
    async fn insert(&self, account: AccountDoc) -> Result<AccountDoc>;
}

#[async_trait::async_trait]
pub trait CourseRepository: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<CourseDoc>>;

    async fn find_course(&self, id: &str) -> Result<Option<CourseDoc>>;

    async fn insert_course(&self, course: CourseDoc) -> Result<CourseDoc>;

    async fn update_course(&self, id: &str, fields: CourseFields) -> Result<Option<CourseDoc>>;

    async fn delete_course(&self, id: &str) -> Result<bool>;

    /// All modules, or those of one course
    async fn list_modules(&self, course_id: Option<&str>) -> Result<Vec<ModuleDoc>>;

    async fn find_module(&self, id: &str) -> Result<Option<ModuleDoc>>;

    async fn insert_module(&self, module: ModuleDoc) -> Result<ModuleDoc>;

    async fn rename_module(&self, id: &str, name: &str) -> Result<Option<ModuleDoc>>;

    async fn delete_module(&self, id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: ContentKind, parent: &str, flagged: bool) -> ContentDoc {
        let mut doc = ContentDoc::new(kind, parent.into(), "author".into(), "body".into());
        doc.flagged = flagged;
        doc
    }

    #[test]
    fn test_filter_matches() {
        let filter = ContentFilter::children_of(ContentKind::Note, "m1");
        assert!(filter.matches(&item(ContentKind::Note, "m1", true)));
        assert!(!filter.matches(&item(ContentKind::Note, "m2", false)));
        assert!(!filter.matches(&item(ContentKind::Comment, "m1", false)));

        let unflagged = filter.unflagged_only();
        assert!(!unflagged.matches(&item(ContentKind::Note, "m1", true)));
        assert!(unflagged.matches(&item(ContentKind::Note, "m1", false)));

        let all = ContentFilter::all(ContentKind::Comment);
        assert!(all.matches(&item(ContentKind::Comment, "n7", true)));
    }
}
