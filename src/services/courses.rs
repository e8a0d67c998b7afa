//! Course and module management
//!
//! Reads are public. Every write needs an admin identity.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::Claims;
use crate::db::repository::CourseRepository;
use crate::db::schemas::{CourseDoc, CourseFields, CourseFormat, ModuleDoc};
use crate::policy;
use crate::types::{NotewardenError, Result};

/// Course body as sent by clients; every field is required
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i32>,
    pub format: Option<String>,
}

impl CourseRequest {
    pub fn validate(self) -> Result<CourseFields> {
        let missing = || NotewardenError::ValidationFailed("All fields are required".into());
        let required = |field: Option<String>| {
            field
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(missing)
        };

        let name = required(self.name)?;
        let description = required(self.description)?;
        let semester = required(self.semester)?;
        let year = self.year.filter(|year| *year != 0).ok_or_else(missing)?;
        let format: CourseFormat = required(self.format)?.parse()?;

        Ok(CourseFields {
            name,
            description,
            semester,
            year,
            format,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleRequest {
    pub name: Option<String>,
}

impl ModuleRequest {
    pub fn validate(self) -> Result<String> {
        self.name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| NotewardenError::ValidationFailed("Module name is required".into()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub semester: String,
    pub year: i32,
    pub format: CourseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<CourseDoc> for CourseView {
    fn from(course: CourseDoc) -> Self {
        Self {
            created_at: course.metadata.created_rfc3339(),
            id: course.id,
            name: course.name,
            description: course.description,
            semester: course.semester,
            year: course.year,
            format: course.format,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub id: String,
    pub course_id: String,
    pub name: String,
}

impl From<ModuleDoc> for ModuleView {
    fn from(module: ModuleDoc) -> Self {
        Self {
            id: module.id,
            course_id: module.course_id,
            name: module.name,
        }
    }
}

fn require_admin(identity: &Claims) -> Result<()> {
    if policy::can_create_course_content(identity) {
        Ok(())
    } else {
        Err(NotewardenError::Forbidden(
            "Course content is managed by admins".into(),
        ))
    }
}

pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
}

impl CourseService {
    pub fn new(courses: Arc<dyn CourseRepository>) -> Self {
        Self { courses }
    }

    pub async fn list_courses(&self) -> Result<Vec<CourseView>> {
        let courses = self.courses.list_courses().await?;
        Ok(courses.into_iter().map(CourseView::from).collect())
    }

    pub async fn create_course(
        &self,
        identity: &Claims,
        request: CourseRequest,
    ) -> Result<CourseView> {
        require_admin(identity)?;
        let fields = request.validate()?;
        let course = self.courses.insert_course(CourseDoc::new(fields)).await?;
        info!("Course {} created by {}", course.id, identity.sub);
        Ok(course.into())
    }

    pub async fn update_course(
        &self,
        identity: &Claims,
        course_id: &str,
        request: CourseRequest,
    ) -> Result<CourseView> {
        require_admin(identity)?;
        let fields = request.validate()?;
        self.courses
            .update_course(course_id, fields)
            .await?
            .map(CourseView::from)
            .ok_or_else(|| NotewardenError::NotFound("Course not found".into()))
    }

    pub async fn delete_course(&self, identity: &Claims, course_id: &str) -> Result<()> {
        require_admin(identity)?;
        if !self.courses.delete_course(course_id).await? {
            return Err(NotewardenError::NotFound("Course not found".into()));
        }
        info!("Course {} deleted by {}", course_id, identity.sub);
        Ok(())
    }

    /// All modules, or those of one course
    pub async fn list_modules(&self, course_id: Option<&str>) -> Result<Vec<ModuleView>> {
        let modules = self.courses.list_modules(course_id).await?;
        Ok(modules.into_iter().map(ModuleView::from).collect())
    }

    pub async fn create_module(
        &self,
        identity: &Claims,
        course_id: &str,
        request: ModuleRequest,
    ) -> Result<ModuleView> {
        require_admin(identity)?;
        let name = request.validate()?;

        if self.courses.find_course(course_id).await?.is_none() {
            return Err(NotewardenError::NotFound("Course not found".into()));
        }

        let module = self
            .courses
            .insert_module(ModuleDoc::new(course_id.to_string(), name))
            .await?;
        info!("Module {} added to course {}", module.id, course_id);
        Ok(module.into())
    }

    pub async fn rename_module(
        &self,
        identity: &Claims,
        module_id: &str,
        request: ModuleRequest,
    ) -> Result<ModuleView> {
        require_admin(identity)?;
        let name = request.validate()?;
        self.courses
            .rename_module(module_id, &name)
            .await?
            .map(ModuleView::from)
            .ok_or_else(|| NotewardenError::NotFound("Module not found".into()))
    }

    pub async fn delete_module(&self, identity: &Claims, module_id: &str) -> Result<()> {
        require_admin(identity)?;
        if !self.courses.delete_module(module_id).await? {
            return Err(NotewardenError::NotFound("Module not found".into()));
        }
        Ok(())
    }
}
