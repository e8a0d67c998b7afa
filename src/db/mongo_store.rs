//! MongoDB implementation of the repository traits
//!
//! A vote is a single `findOneAndUpdate` whose filter requires the voter to
//! be absent from `voted_by` and whose pipeline update computes score,
//! voters and flag on the server. The returned before-image is replayed
//! through the vote state machine to produce the after-image, so the caller
//! sees exactly what the server wrote.

use bson::{doc, Document};
use mongodb::options::ReturnDocument;
use tracing::debug;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::repository::{
    AccountRepository, ConditionalUpdate, ContentFilter, ContentRepository, CourseRepository,
    VoteMutation,
};
use crate::db::schemas::{
    AccountDoc, ContentDoc, ContentKind, CourseDoc, CourseFields, ModuleDoc, ACCOUNT_COLLECTION,
    COMMENT_COLLECTION, COURSE_COLLECTION, MODULE_COLLECTION, NOTE_COLLECTION,
};
use crate::ledger::{apply_vote, FLAG_THRESHOLD};
use crate::types::{NotewardenError, Result};

pub struct MongoStore {
    accounts: MongoCollection<AccountDoc>,
    courses: MongoCollection<CourseDoc>,
    modules: MongoCollection<ModuleDoc>,
    notes: MongoCollection<ContentDoc>,
    comments: MongoCollection<ContentDoc>,
}

impl MongoStore {
    /// Open every collection and apply its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            accounts: mongo.collection(ACCOUNT_COLLECTION).await?,
            courses: mongo.collection(COURSE_COLLECTION).await?,
            modules: mongo.collection(MODULE_COLLECTION).await?,
            notes: mongo.collection(NOTE_COLLECTION).await?,
            comments: mongo.collection(COMMENT_COLLECTION).await?,
        })
    }

    fn content(&self, kind: ContentKind) -> &MongoCollection<ContentDoc> {
        match kind {
            ContentKind::Note => &self.notes,
            ContentKind::Comment => &self.comments,
        }
    }
}

fn by_id(id: &str) -> Document {
    doc! { "_id": id }
}

fn content_filter_doc(filter: &ContentFilter) -> Document {
    let mut query = Document::new();
    if let Some(parent) = &filter.parent_id {
        query.insert("parent_id", parent.as_str());
    }
    if !filter.include_flagged {
        query.insert("flagged", false);
    }
    query
}

/// Server-side pipeline equivalent of the vote state machine
pub(crate) fn vote_pipeline(voter_id: &str, delta: i64) -> Vec<Document> {
    let new_score = doc! { "$add": [ { "$ifNull": ["$score", 0_i64] }, delta ] };
    vec![doc! {
        "$set": {
            "score": new_score.clone(),
            "voted_by": {
                "$concatArrays": [ { "$ifNull": ["$voted_by", []] }, [ voter_id ] ]
            },
            "flagged": {
                "$or": [
                    { "$ifNull": ["$flagged", false] },
                    { "$lte": [ new_score, FLAG_THRESHOLD ] }
                ]
            },
            "metadata.updated_at": "$$NOW",
        }
    }]
}

#[async_trait::async_trait]
impl ContentRepository for MongoStore {
    async fn find_by_id(&self, kind: ContentKind, id: &str) -> Result<Option<ContentDoc>> {
        self.content(kind).find_one(by_id(id)).await
    }

    async fn insert(&self, item: ContentDoc) -> Result<ContentDoc> {
        self.content(item.kind).insert_one(item).await
    }

    async fn find(&self, filter: &ContentFilter) -> Result<Vec<ContentDoc>> {
        self.content(filter.kind)
            .find_many(content_filter_doc(filter))
            .await
    }

    async fn update_body(
        &self,
        kind: ContentKind,
        id: &str,
        body: &str,
    ) -> Result<Option<ContentDoc>> {
        self.content(kind)
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "body": body, "metadata.updated_at": bson::DateTime::now() } },
                ReturnDocument::After,
            )
            .await
    }

    async fn update_conditional(
        &self,
        kind: ContentKind,
        id: &str,
        mutation: VoteMutation<'_>,
    ) -> Result<ConditionalUpdate> {
        let collection = self.content(kind);
        let filter = doc! { "_id": id, "voted_by": { "$ne": mutation.voter_id } };
        let pipeline = vote_pipeline(mutation.voter_id, mutation.direction.delta());

        let before = collection
            .find_one_and_update(filter, pipeline, ReturnDocument::Before)
            .await?;

        let Some(before) = before else {
            // Predicate failed or the item does not exist; tell them apart
            return match collection.find_one(by_id(id)).await? {
                Some(_) => Ok(ConditionalUpdate::PredicateFailed),
                None => Ok(ConditionalUpdate::Missing),
            };
        };

        let mut after = before.clone();
        match apply_vote(&mut after, mutation.voter_id, mutation.direction) {
            Ok(_) => {
                debug!("Vote applied to {} {} (score {})", kind, id, after.score);
                Ok(ConditionalUpdate::Applied { before, after })
            }
            // The filter excluded existing voters, so the replay cannot see one
            Err(NotewardenError::DuplicateVote(_)) => Err(NotewardenError::Internal(format!(
                "Vote replay disagreed with server for {kind} {id}"
            ))),
            Err(e) => Err(e),
        }
    }

    async fn set_flagged(
        &self,
        kind: ContentKind,
        id: &str,
        flagged: bool,
    ) -> Result<Option<ContentDoc>> {
        self.content(kind)
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "flagged": flagged, "metadata.updated_at": bson::DateTime::now() } },
                ReturnDocument::After,
            )
            .await
    }

    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<bool> {
        let result = self.content(kind).soft_delete(by_id(id)).await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait::async_trait]
impl AccountRepository for MongoStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AccountDoc>> {
        self.accounts.find_one(by_id(id)).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AccountDoc>> {
        self.accounts.find_one(doc! { "username": username }).await
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<AccountDoc>> {
        self.accounts
            .find_one(doc! { "$or": [ { "email": email }, { "username": username } ] })
            .await
    }

    async fn insert(&self, account: AccountDoc) -> Result<AccountDoc> {
        self.accounts.insert_one(account).await
    }
}

#[async_trait::async_trait]
impl CourseRepository for MongoStore {
    async fn list_courses(&self) -> Result<Vec<CourseDoc>> {
        self.courses.find_many(Document::new()).await
    }

    async fn find_course(&self, id: &str) -> Result<Option<CourseDoc>> {
        self.courses.find_one(by_id(id)).await
    }

    async fn insert_course(&self, course: CourseDoc) -> Result<CourseDoc> {
        self.courses.insert_one(course).await
    }

    async fn update_course(&self, id: &str, fields: CourseFields) -> Result<Option<CourseDoc>> {
        let format = bson::to_bson(&fields.format)?;
        self.courses
            .find_one_and_update(
                by_id(id),
                doc! {
                    "$set": {
                        "name": fields.name,
                        "description": fields.description,
                        "semester": fields.semester,
                        "year": fields.year,
                        "format": format,
                        "metadata.updated_at": bson::DateTime::now(),
                    }
                },
                ReturnDocument::After,
            )
            .await
    }

    async fn delete_course(&self, id: &str) -> Result<bool> {
        Ok(self.courses.soft_delete(by_id(id)).await?.matched_count > 0)
    }

    async fn list_modules(&self, course_id: Option<&str>) -> Result<Vec<ModuleDoc>> {
        let filter = match course_id {
            Some(course) => doc! { "course_id": course },
            None => Document::new(),
        };
        self.modules.find_many(filter).await
    }

    async fn find_module(&self, id: &str) -> Result<Option<ModuleDoc>> {
        self.modules.find_one(by_id(id)).await
    }

    async fn insert_module(&self, module: ModuleDoc) -> Result<ModuleDoc> {
        self.modules.insert_one(module).await
    }

    async fn rename_module(&self, id: &str, name: &str) -> Result<Option<ModuleDoc>> {
        self.modules
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "name": name, "metadata.updated_at": bson::DateTime::now() } },
                ReturnDocument::After,
            )
            .await
    }

    async fn delete_module(&self, id: &str) -> Result<bool> {
        Ok(self.modules.soft_delete(by_id(id)).await?.matched_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn test_content_filter_doc() {
        let filter = ContentFilter::children_of(ContentKind::Note, "m1").unflagged_only();
        let query = content_filter_doc(&filter);
        assert_eq!(query.get_str("parent_id").unwrap(), "m1");
        assert!(!query.get_bool("flagged").unwrap());

        let query = content_filter_doc(&ContentFilter::all(ContentKind::Comment));
        assert!(query.is_empty());
    }

    #[test]
    fn test_vote_pipeline_shape() {
        let pipeline = vote_pipeline("u1", -1);
        assert_eq!(pipeline.len(), 1);

        let set = pipeline[0].get_document("$set").unwrap();
        assert!(set.contains_key("score"));
        assert!(set.contains_key("voted_by"));
        assert!(set.contains_key("flagged"));

        let flagged = set.get_document("flagged").unwrap();
        let branches = flagged.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);
        let threshold = branches[1].as_document().unwrap().get_array("$lte").unwrap();
        assert_eq!(threshold[1], Bson::Int64(FLAG_THRESHOLD));
    }
}
