//! Course and course module schemas

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{new_document_id, Metadata};
use crate::types::NotewardenError;

pub const COURSE_COLLECTION: &str = "courses";
pub const MODULE_COLLECTION: &str = "course_modules";

/// How a course is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CourseFormat {
    #[default]
    Online,
    InPerson,
    Hybrid,
}

impl FromStr for CourseFormat {
    type Err = NotewardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "in-person" => Ok(Self::InPerson),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(NotewardenError::ValidationFailed(
                "Invalid format type".into(),
            )),
        }
    }
}

/// Editable course fields, already validated
#[derive(Debug, Clone, PartialEq)]
pub struct CourseFields {
    pub name: String,
    pub description: String,
    pub semester: String,
    pub year: i32,
    pub format: CourseFormat,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CourseDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,
    pub description: String,
    pub semester: String,
    pub year: i32,
    pub format: CourseFormat,
}

impl CourseDoc {
    pub fn new(fields: CourseFields) -> Self {
        let mut doc = Self {
            id: new_document_id(),
            metadata: Metadata::new(),
            ..Default::default()
        };
        doc.apply(fields);
        doc
    }

    pub fn apply(&mut self, fields: CourseFields) {
        self.name = fields.name;
        self.description = fields.description;
        self.semester = fields.semester;
        self.year = fields.year;
        self.format = fields.format;
    }
}

impl IntoIndexes for CourseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![]
    }
}

impl MutMetadata for CourseDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ModuleDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub course_id: String,
    pub name: String,
}

impl ModuleDoc {
    pub fn new(course_id: String, name: String) -> Self {
        Self {
            id: new_document_id(),
            metadata: Metadata::new(),
            course_id,
            name,
        }
    }
}

impl IntoIndexes for ModuleDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "course_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("course_id_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ModuleDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
