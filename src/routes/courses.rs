//! Course and module routes
//!
//! - GET    /courses                - List courses
//! - POST   /courses                - Create a course (admin)
//! - PUT    /courses/{id}           - Replace a course's fields (admin)
//! - DELETE /courses/{id}           - Delete a course (admin)
//! - GET    /courses/{id}/modules   - Modules of a course
//! - POST   /courses/{id}/modules   - Add a module (admin)
//! - GET    /modules                - All modules
//! - PUT    /modules/{id}           - Rename a module (admin)
//! - DELETE /modules/{id}           - Delete a module (admin)

use hyper::{Method, Response, StatusCode};

use super::{json_response, message_response, method_not_allowed, ApiRequest, BoxBody};
use crate::auth::ADMIN_ONLY;
use crate::server::AppState;
use crate::services::{CourseRequest, ModuleRequest};
use crate::types::Result;

async fn list_courses(state: &AppState) -> Result<Response<BoxBody>> {
    let courses = state.courses.list_courses().await?;
    Ok(json_response(StatusCode::OK, &courses))
}

async fn create_course(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    let body: CourseRequest = req.json()?;
    let course = state.courses.create_course(&claims, body).await?;
    Ok(json_response(StatusCode::CREATED, &course))
}

async fn update_course(
    state: &AppState,
    req: &ApiRequest,
    course_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    let body: CourseRequest = req.json()?;
    let course = state.courses.update_course(&claims, course_id, body).await?;
    Ok(json_response(StatusCode::OK, &course))
}

async fn delete_course(
    state: &AppState,
    req: &ApiRequest,
    course_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    state.courses.delete_course(&claims, course_id).await?;
    Ok(message_response(StatusCode::OK, "Course deleted successfully"))
}

async fn list_modules(state: &AppState, course_id: Option<&str>) -> Result<Response<BoxBody>> {
    let modules = state.courses.list_modules(course_id).await?;
    Ok(json_response(StatusCode::OK, &modules))
}

async fn create_module(
    state: &AppState,
    req: &ApiRequest,
    course_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    let body: ModuleRequest = req.json()?;
    let module = state.courses.create_module(&claims, course_id, body).await?;
    Ok(json_response(StatusCode::CREATED, &module))
}

async fn rename_module(
    state: &AppState,
    req: &ApiRequest,
    module_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    let body: ModuleRequest = req.json()?;
    let module = state.courses.rename_module(&claims, module_id, body).await?;
    Ok(json_response(StatusCode::OK, &module))
}

async fn delete_module(
    state: &AppState,
    req: &ApiRequest,
    module_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    state.courses.delete_module(&claims, module_id).await?;
    Ok(message_response(StatusCode::OK, "Module deleted successfully"))
}

/// Handle `/courses/*` and `/modules[/{id}]`; `None` for any other path
pub async fn handle_course_request(
    state: &AppState,
    req: &ApiRequest,
) -> Option<Result<Response<BoxBody>>> {
    let segments = req.segments();

    let result = match (&req.method, segments.as_slice()) {
        (&Method::GET, ["courses"]) => list_courses(state).await,
        (&Method::POST, ["courses"]) => create_course(state, req).await,
        (&Method::PUT, ["courses", id]) => update_course(state, req, id).await,
        (&Method::DELETE, ["courses", id]) => delete_course(state, req, id).await,
        (&Method::GET, ["courses", id, "modules"]) => list_modules(state, Some(*id)).await,
        (&Method::POST, ["courses", id, "modules"]) => create_module(state, req, id).await,

        (&Method::GET, ["modules"]) => list_modules(state, None).await,
        (&Method::PUT, ["modules", id]) => rename_module(state, req, id).await,
        (&Method::DELETE, ["modules", id]) => delete_module(state, req, id).await,

        (_, ["courses"])
        | (_, ["courses", _])
        | (_, ["courses", _, "modules"])
        | (_, ["modules"])
        | (_, ["modules", _]) => Ok(method_not_allowed()),

        _ => return None,
    };

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::routes::respond;
    use serde_json::json;

    fn course_body() -> serde_json::Value {
        json!({
            "name": "Compilers",
            "description": "Parsing to codegen",
            "semester": "Spring",
            "year": 2027,
            "format": "online",
        })
    }

    fn bearer(state: &AppState, sub: &str, role: Role) -> String {
        format!("Bearer {}", state.guard.codec().issue(sub, role).unwrap().token)
    }

    async fn call(state: &AppState, req: ApiRequest) -> Response<BoxBody> {
        respond(handle_course_request(state, &req).await.unwrap())
    }

    #[tokio::test]
    async fn test_course_writes_are_admin_gated() {
        let state = AppState::for_tests();

        let response = call(
            &state,
            ApiRequest::new(Method::POST, "/courses").with_json(&course_body()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(
            &state,
            ApiRequest::new(Method::POST, "/courses")
                .with_auth(bearer(&state, "u1", Role::User))
                .with_json(&course_body()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = call(
            &state,
            ApiRequest::new(Method::POST, "/courses")
                .with_auth(bearer(&state, "a1", Role::Admin))
                .with_json(&course_body()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = call(&state, ApiRequest::new(Method::GET, "/courses")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_format_is_400() {
        let state = AppState::for_tests();
        let mut body = course_body();
        body["format"] = json!("carrier-pigeon");

        let response = call(
            &state,
            ApiRequest::new(Method::POST, "/courses")
                .with_auth(bearer(&state, "a1", Role::Admin))
                .with_json(&body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_module_on_missing_course_is_404() {
        let state = AppState::for_tests();
        let response = call(
            &state,
            ApiRequest::new(Method::POST, "/courses/missing/modules")
                .with_auth(bearer(&state, "a1", Role::Admin))
                .with_json(&json!({ "name": "Lexing" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_routing() {
        let state = AppState::for_tests();
        let response = call(&state, ApiRequest::new(Method::PATCH, "/modules/m1")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let req = ApiRequest::new(Method::GET, "/modules/m1/notes");
        assert!(handle_course_request(&state, &req).await.is_none());
    }
}
