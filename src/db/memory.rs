//! In-memory storage
//!
//! DashMap-backed implementation of every repository trait. Used in dev mode
//! and by tests. A vote runs entirely under the shard lock of its item, so
//! the voter check and the mutation cannot interleave with another vote on
//! the same item.

use dashmap::DashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::db::repository::{
    AccountRepository, ConditionalUpdate, ContentFilter, ContentRepository, CourseRepository,
    VoteMutation,
};
use crate::db::schemas::{AccountDoc, ContentDoc, ContentKind, CourseDoc, CourseFields, ModuleDoc};
use crate::ledger::apply_vote;
use crate::types::{NotewardenError, Result};

#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<String, AccountDoc>,
    /// Serializes account inserts so the two uniqueness checks hold together
    account_insert: Mutex<()>,
    courses: DashMap<String, CourseDoc>,
    modules: DashMap<String, ModuleDoc>,
    notes: DashMap<String, ContentDoc>,
    comments: DashMap<String, ContentDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ContentKind) -> &DashMap<String, ContentDoc> {
        match kind {
            ContentKind::Note => &self.notes,
            ContentKind::Comment => &self.comments,
        }
    }
}

/// Stable listing order: creation time, then id
fn sorted<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (Option<bson::DateTime>, String),
{
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait::async_trait]
impl ContentRepository for MemoryStore {
    async fn find_by_id(&self, kind: ContentKind, id: &str) -> Result<Option<ContentDoc>> {
        Ok(self.table(kind).get(id).map(|entry| entry.clone()))
    }

    async fn insert(&self, item: ContentDoc) -> Result<ContentDoc> {
        debug!("Inserting {} {}", item.kind, item.id);
        self.table(item.kind).insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn find(&self, filter: &ContentFilter) -> Result<Vec<ContentDoc>> {
        let items = self
            .table(filter.kind)
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(sorted(items, |c: &ContentDoc| {
            (c.metadata.created_at, c.id.clone())
        }))
    }

    async fn update_body(
        &self,
        kind: ContentKind,
        id: &str,
        body: &str,
    ) -> Result<Option<ContentDoc>> {
        Ok(self.table(kind).get_mut(id).map(|mut entry| {
            entry.body = body.to_string();
            entry.metadata.touch();
            entry.clone()
        }))
    }

    async fn update_conditional(
        &self,
        kind: ContentKind,
        id: &str,
        mutation: VoteMutation<'_>,
    ) -> Result<ConditionalUpdate> {
        let Some(mut entry) = self.table(kind).get_mut(id) else {
            return Ok(ConditionalUpdate::Missing);
        };

        let before = entry.clone();
        match apply_vote(&mut entry, mutation.voter_id, mutation.direction) {
            Ok(_) => {
                entry.metadata.touch();
                Ok(ConditionalUpdate::Applied {
                    before,
                    after: entry.clone(),
                })
            }
            Err(NotewardenError::DuplicateVote(_)) => Ok(ConditionalUpdate::PredicateFailed),
            Err(e) => Err(e),
        }
    }

    async fn set_flagged(
        &self,
        kind: ContentKind,
        id: &str,
        flagged: bool,
    ) -> Result<Option<ContentDoc>> {
        Ok(self.table(kind).get_mut(id).map(|mut entry| {
            entry.flagged = flagged;
            entry.metadata.touch();
            entry.clone()
        }))
    }

    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<bool> {
        Ok(self.table(kind).remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl AccountRepository for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AccountDoc>> {
        Ok(self.accounts.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AccountDoc>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<AccountDoc>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.email == email || entry.username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, account: AccountDoc) -> Result<AccountDoc> {
        let _guard = self
            .account_insert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let taken = self
            .accounts
            .iter()
            .any(|entry| entry.email == account.email || entry.username == account.username);
        if taken {
            return Err(NotewardenError::ValidationFailed(
                "Email or username already exists".into(),
            ));
        }

        self.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }
}

#[async_trait::async_trait]
impl CourseRepository for MemoryStore {
    async fn list_courses(&self) -> Result<Vec<CourseDoc>> {
        let items = self.courses.iter().map(|e| e.value().clone()).collect();
        Ok(sorted(items, |c: &CourseDoc| {
            (c.metadata.created_at, c.id.clone())
        }))
    }

    async fn find_course(&self, id: &str) -> Result<Option<CourseDoc>> {
        Ok(self.courses.get(id).map(|e| e.clone()))
    }

    async fn insert_course(&self, course: CourseDoc) -> Result<CourseDoc> {
        self.courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: &str, fields: CourseFields) -> Result<Option<CourseDoc>> {
        Ok(self.courses.get_mut(id).map(|mut entry| {
            entry.apply(fields);
            entry.metadata.touch();
            entry.clone()
        }))
    }

    async fn delete_course(&self, id: &str) -> Result<bool> {
        Ok(self.courses.remove(id).is_some())
    }

    async fn list_modules(&self, course_id: Option<&str>) -> Result<Vec<ModuleDoc>> {
        let items = self
            .modules
            .iter()
            .filter(|e| course_id.map_or(true, |c| e.course_id == c))
            .map(|e| e.value().clone())
            .collect();
        Ok(sorted(items, |m: &ModuleDoc| {
            (m.metadata.created_at, m.id.clone())
        }))
    }

    async fn find_module(&self, id: &str) -> Result<Option<ModuleDoc>> {
        Ok(self.modules.get(id).map(|e| e.clone()))
    }

    async fn insert_module(&self, module: ModuleDoc) -> Result<ModuleDoc> {
        self.modules.insert(module.id.clone(), module.clone());
        Ok(module)
    }

    async fn rename_module(&self, id: &str, name: &str) -> Result<Option<ModuleDoc>> {
        Ok(self.modules.get_mut(id).map(|mut entry| {
            entry.name = name.to_string();
            entry.metadata.touch();
            entry.clone()
        }))
    }

    async fn delete_module(&self, id: &str) -> Result<bool> {
        Ok(self.modules.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::ledger::VoteDirection;
    use std::sync::Arc;

    fn note(parent: &str) -> ContentDoc {
        ContentDoc::new(
            ContentKind::Note,
            parent.into(),
            "author".into(),
            "body".into(),
        )
    }

    #[tokio::test]
    async fn test_conditional_update_rejects_second_vote() {
        let store = MemoryStore::new();
        let item = ContentRepository::insert(&store, note("m1")).await.unwrap();

        let mutation = VoteMutation {
            voter_id: "u1",
            direction: VoteDirection::Down,
        };
        let first = store
            .update_conditional(ContentKind::Note, &item.id, mutation)
            .await
            .unwrap();
        match first {
            ConditionalUpdate::Applied { before, after } => {
                assert!(!before.flagged);
                assert!(after.flagged);
                assert_eq!(after.score, -1);
            }
            other => panic!("expected Applied, got {other:?}"),
        }

        let second = store
            .update_conditional(ContentKind::Note, &item.id, mutation)
            .await
            .unwrap();
        assert_eq!(second, ConditionalUpdate::PredicateFailed);

        let stored = ContentRepository::find_by_id(&store, ContentKind::Note, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.score, -1);
        assert_eq!(stored.voted_by.len(), 1);
    }

    #[tokio::test]
    async fn test_conditional_update_missing_item() {
        let store = MemoryStore::new();
        let outcome = store
            .update_conditional(
                ContentKind::Comment,
                "nope",
                VoteMutation {
                    voter_id: "u1",
                    direction: VoteDirection::Up,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, ConditionalUpdate::Missing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_voter_votes_apply_once() {
        let store = Arc::new(MemoryStore::new());
        let item = ContentRepository::insert(store.as_ref(), note("m1"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let id = item.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_conditional(
                        ContentKind::Note,
                        &id,
                        VoteMutation {
                            voter_id: "same-voter",
                            direction: VoteDirection::Down,
                        },
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ConditionalUpdate::Applied { .. }) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        let stored = ContentRepository::find_by_id(store.as_ref(), ContentKind::Note, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.score, -1);
        assert_eq!(stored.voted_by, vec!["same-voter".to_string()]);
    }

    #[tokio::test]
    async fn test_find_respects_kind_parent_and_flag() {
        let store = MemoryStore::new();
        let visible = ContentRepository::insert(&store, note("m1")).await.unwrap();
        let mut hidden = note("m1");
        hidden.flagged = true;
        ContentRepository::insert(&store, hidden).await.unwrap();
        ContentRepository::insert(&store, note("m2")).await.unwrap();

        let all_m1 = store
            .find(&ContentFilter::children_of(ContentKind::Note, "m1"))
            .await
            .unwrap();
        assert_eq!(all_m1.len(), 2);

        let unflagged = store
            .find(&ContentFilter::children_of(ContentKind::Note, "m1").unflagged_only())
            .await
            .unwrap();
        assert_eq!(unflagged.len(), 1);
        assert_eq!(unflagged[0].id, visible.id);

        let comments = store
            .find(&ContentFilter::all(ContentKind::Comment))
            .await
            .unwrap();
        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn test_update_body_keeps_votes_and_author() {
        let store = MemoryStore::new();
        let item = ContentRepository::insert(&store, note("m1")).await.unwrap();
        store
            .update_conditional(
                ContentKind::Note,
                &item.id,
                VoteMutation {
                    voter_id: "u1",
                    direction: VoteDirection::Up,
                },
            )
            .await
            .unwrap();

        let updated = store
            .update_body(ContentKind::Note, &item.id, "edited")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.body, "edited");
        assert_eq!(updated.author_id, "author");
        assert_eq!(updated.score, 1);
    }

    #[tokio::test]
    async fn test_account_uniqueness() {
        let store = MemoryStore::new();
        let first = AccountDoc::new("a@x.io".into(), "alice".into(), "h".into(), Role::User);
        AccountRepository::insert(&store, first).await.unwrap();

        let same_email = AccountDoc::new("a@x.io".into(), "alice2".into(), "h".into(), Role::User);
        let err = AccountRepository::insert(&store, same_email).await.unwrap_err();
        assert!(matches!(err, NotewardenError::ValidationFailed(_)));

        let same_name = AccountDoc::new("b@x.io".into(), "alice".into(), "h".into(), Role::User);
        assert!(AccountRepository::insert(&store, same_name).await.is_err());

        assert!(store.find_by_username("alice").await.unwrap().is_some());
        assert!(store
            .find_by_email_or_username("zzz", "alice")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_course_and_module_crud() {
        let store = MemoryStore::new();
        let course = store
            .insert_course(CourseDoc::new(CourseFields {
                name: "Compilers".into(),
                description: "Front to back".into(),
                semester: "Fall".into(),
                year: 2026,
                format: crate::db::schemas::CourseFormat::Hybrid,
            }))
            .await
            .unwrap();

        let module = store
            .insert_module(ModuleDoc::new(course.id.clone(), "Parsing".into()))
            .await
            .unwrap();
        store
            .insert_module(ModuleDoc::new("other".into(), "Elsewhere".into()))
            .await
            .unwrap();

        assert_eq!(store.list_modules(Some(&course.id)).await.unwrap().len(), 1);
        assert_eq!(store.list_modules(None).await.unwrap().len(), 2);

        let renamed = store.rename_module(&module.id, "Lexing").await.unwrap();
        assert_eq!(renamed.unwrap().name, "Lexing");
        assert!(store.rename_module("missing", "x").await.unwrap().is_none());

        assert!(store.delete_course(&course.id).await.unwrap());
        assert!(!store.delete_course(&course.id).await.unwrap());
        assert!(store.list_courses().await.unwrap().is_empty());
    }
}
