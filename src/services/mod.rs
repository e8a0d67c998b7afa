//! Notewarden services
//!
//! Each service takes a verified identity and typed input, applies the
//! authorization policy and talks to the repositories. HTTP handlers stay
//! thin wrappers around them.

pub mod accounts;
pub mod content;
pub mod courses;

pub use accounts::{
    AccountService, AccountView, BootstrapAdmin, LoginRequest, LoginResponse, RegisterRequest,
};
pub use content::{ContentRequest, ContentService, ContentView, VoteRequest, VoteView};
pub use courses::{CourseRequest, CourseService, CourseView, ModuleRequest, ModuleView};
