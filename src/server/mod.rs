//! HTTP server for Notewarden

pub mod http;

pub use http::{run, AppState, Repositories};
