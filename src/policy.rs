//! Authorization policy
//!
//! Pure decisions over a verified identity and a stored item. Nothing here
//! touches a repository.

use crate::auth::Claims;
use crate::db::schemas::ContentDoc;
use crate::types::NotewardenError;

/// Author or admin may edit or delete an item
pub fn can_modify(identity: &Claims, item: &ContentDoc) -> bool {
    identity.is_admin() || identity.sub == item.author_id
}

/// Courses and modules are admin-managed
pub fn can_create_course_content(identity: &Claims) -> bool {
    identity.is_admin()
}

/// Any verified identity may post notes and comments
pub fn can_create_votable(_identity: &Claims) -> bool {
    true
}

/// Flagged items are hidden from everyone but admins, authors included
pub fn visible_to(identity: &Claims, item: &ContentDoc) -> bool {
    !item.flagged || identity.is_admin()
}

pub fn filter_visible(identity: &Claims, items: Vec<ContentDoc>) -> Vec<ContentDoc> {
    items
        .into_iter()
        .filter(|item| visible_to(identity, item))
        .collect()
}

pub fn require_modify(identity: &Claims, item: &ContentDoc) -> Result<(), NotewardenError> {
    if can_modify(identity, item) {
        Ok(())
    } else {
        Err(NotewardenError::PermissionDenied)
    }
}
