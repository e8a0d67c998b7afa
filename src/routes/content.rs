//! Note and comment routes
//!
//! Notes and comments share handlers; the first path segment picks the kind.
//!
//! - GET/POST   /modules/{id}/notes    - Notes of a module / post a note
//! - GET/POST   /notes/{id}/comments   - Comments of a note / post a comment
//! - GET        /notes, /comments      - Everything the caller may see
//! - PUT/DELETE /{kind}/{id}           - Edit or delete (author or admin)
//! - PUT        /{kind}/{id}/vote      - `{ "voteType": "upvote" | "downvote" }`
//! - PUT        /{kind}/{id}/flag      - Admin flag
//!
//! Every route needs a `user` or `admin` token; flagging needs `admin`.

use hyper::{Method, Response, StatusCode};

use super::{json_response, message_response, method_not_allowed, ApiRequest, BoxBody};
use crate::auth::{ADMIN_ONLY, MEMBERS};
use crate::db::schemas::ContentKind;
use crate::server::AppState;
use crate::services::{ContentRequest, VoteRequest};
use crate::types::Result;

fn kind_of(segment: &str) -> Option<ContentKind> {
    match segment {
        "notes" => Some(ContentKind::Note),
        "comments" => Some(ContentKind::Comment),
        _ => None,
    }
}

async fn list_children(
    state: &AppState,
    req: &ApiRequest,
    kind: ContentKind,
    parent_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(MEMBERS, req.auth())?;
    let items = state
        .content
        .list_children(&claims, kind, parent_id)
        .await?;
    Ok(json_response(StatusCode::OK, &items))
}

async fn create(
    state: &AppState,
    req: &ApiRequest,
    kind: ContentKind,
    parent_id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(MEMBERS, req.auth())?;
    let body: ContentRequest = req.json()?;
    let item = state
        .content
        .create(&claims, kind, parent_id, body)
        .await?;
    Ok(json_response(StatusCode::CREATED, &item))
}

async fn list_all(state: &AppState, req: &ApiRequest, kind: ContentKind) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(MEMBERS, req.auth())?;
    let items = state.content.list_all(&claims, kind).await?;
    Ok(json_response(StatusCode::OK, &items))
}

async fn update(
    state: &AppState,
    req: &ApiRequest,
    kind: ContentKind,
    id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(MEMBERS, req.auth())?;
    let body: ContentRequest = req.json()?;
    let item = state.content.update_body(&claims, kind, id, body).await?;
    Ok(json_response(StatusCode::OK, &item))
}

async fn delete(
    state: &AppState,
    req: &ApiRequest,
    kind: ContentKind,
    id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(MEMBERS, req.auth())?;
    state.content.delete(&claims, kind, id).await?;
    let message = match kind {
        ContentKind::Note => "Note deleted successfully",
        ContentKind::Comment => "Comment deleted successfully",
    };
    Ok(message_response(StatusCode::OK, message))
}

async fn vote(
    state: &AppState,
    req: &ApiRequest,
    kind: ContentKind,
    id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(MEMBERS, req.auth())?;
    let body: VoteRequest = req.json()?;
    let result = state.content.vote(&claims, kind, id, body).await?;
    Ok(json_response(StatusCode::OK, &result))
}

async fn flag(
    state: &AppState,
    req: &ApiRequest,
    kind: ContentKind,
    id: &str,
) -> Result<Response<BoxBody>> {
    let claims = state.guard.authorize(ADMIN_ONLY, req.auth())?;
    let item = state.content.flag(&claims, kind, id).await?;
    Ok(json_response(StatusCode::OK, &item))
}

/// Handle note and comment paths; `None` for any other path
pub async fn handle_content_request(
    state: &AppState,
    req: &ApiRequest,
) -> Option<Result<Response<BoxBody>>> {
    let segments = req.segments();
    let method = &req.method;

    let result = match segments.as_slice() {
        ["modules", module_id, "notes"] => match *method {
            Method::GET => list_children(state, req, ContentKind::Note, module_id).await,
            Method::POST => create(state, req, ContentKind::Note, module_id).await,
            _ => Ok(method_not_allowed()),
        },
        ["notes", note_id, "comments"] => match *method {
            Method::GET => list_children(state, req, ContentKind::Comment, note_id).await,
            Method::POST => create(state, req, ContentKind::Comment, note_id).await,
            _ => Ok(method_not_allowed()),
        },
        [collection] => {
            let kind = kind_of(collection)?;
            match *method {
                Method::GET => list_all(state, req, kind).await,
                _ => Ok(method_not_allowed()),
            }
        }
        [collection, id] => {
            let kind = kind_of(collection)?;
            match *method {
                Method::PUT => update(state, req, kind, id).await,
                Method::DELETE => delete(state, req, kind, id).await,
                _ => Ok(method_not_allowed()),
            }
        }
        [collection, id, action @ ("vote" | "flag")] => {
            let kind = kind_of(collection)?;
            match (method, *action) {
                (&Method::PUT, "vote") => vote(state, req, kind, id).await,
                (&Method::PUT, "flag") => flag(state, req, kind, id).await,
                _ => Ok(method_not_allowed()),
            }
        }
        _ => return None,
    };

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::repository::CourseRepository;
    use crate::db::schemas::ModuleDoc;
    use crate::routes::respond;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    fn bearer(state: &AppState, sub: &str, role: Role) -> String {
        format!("Bearer {}", state.guard.codec().issue(sub, role).unwrap().token)
    }

    async fn call(state: &AppState, req: ApiRequest) -> (StatusCode, Value) {
        let response = respond(handle_content_request(state, &req).await.unwrap());
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn module(state: &AppState) -> String {
        state
            .repositories
            .courses
            .insert_module(ModuleDoc::new("c1".into(), "Week 1".into()))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_bad_token_on_admin_route_is_401() {
        let state = AppState::for_tests();
        let (status, body) = call(
            &state,
            ApiRequest::new(Method::PUT, "/notes/n1/flag").with_auth("Bearer garbage"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = call(
            &state,
            ApiRequest::new(Method::PUT, "/notes/n1/flag")
                .with_auth(bearer(&state, "u1", Role::User)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    async fn post_note(state: &AppState, module_id: &str, author: &str, text: &str) -> String {
        let (status, note) = call(
            state,
            ApiRequest::new(Method::POST, format!("/modules/{module_id}/notes"))
                .with_auth(author)
                .with_json(&json!({ "content": text })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        note["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_note_vote_flow() {
        let state = AppState::for_tests();
        let module_id = module(&state).await;
        let author = bearer(&state, "author", Role::User);
        let voter = bearer(&state, "voter", Role::User);
        let note_id = post_note(&state, &module_id, &author, "Lecture notes").await;

        let (status, voted) = call(
            &state,
            ApiRequest::new(Method::PUT, format!("/notes/{note_id}/vote"))
                .with_auth(voter.clone())
                .with_json(&json!({ "voteType": "upvote" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(voted["score"], 1);
        assert_eq!(voted["newlyFlagged"], false);

        let (status, body) = call(
            &state,
            ApiRequest::new(Method::PUT, format!("/notes/{note_id}/vote"))
                .with_auth(voter.clone())
                .with_json(&json!({ "voteType": "downvote" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DUPLICATE_VOTE");
        assert_eq!(body["error"], "User has already voted on this note");

        for critic in ["c1", "c2"] {
            let (status, _) = call(
                &state,
                ApiRequest::new(Method::PUT, format!("/notes/{note_id}/vote"))
                    .with_auth(bearer(&state, critic, Role::User))
                    .with_json(&json!({ "voteType": "downvote" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, listed) = call(
            &state,
            ApiRequest::new(Method::GET, format!("/modules/{module_id}/notes")).with_auth(voter),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_flagged_note_not_readable_through_vote() {
        let state = AppState::for_tests();
        let module_id = module(&state).await;
        let note_id = post_note(
            &state,
            &module_id,
            &bearer(&state, "author", Role::User),
            "SECRET BODY",
        )
        .await;

        let (status, voted) = call(
            &state,
            ApiRequest::new(Method::PUT, format!("/notes/{note_id}/vote"))
                .with_auth(bearer(&state, "u1", Role::User))
                .with_json(&json!({ "voteType": "downvote" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(voted["newlyFlagged"], true);

        let (status, body) = call(
            &state,
            ApiRequest::new(Method::PUT, format!("/notes/{note_id}/vote"))
                .with_auth(bearer(&state, "u2", Role::User))
                .with_json(&json!({ "voteType": "upvote" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("content").is_none());
        assert!(!body.to_string().contains("SECRET BODY"));
    }

    #[tokio::test]
    async fn test_comment_delete_by_author_only() {
        let state = AppState::for_tests();
        let module_id = module(&state).await;
        let note_id = post_note(&state, &module_id, &bearer(&state, "X", Role::User), "n").await;

        let (status, comment) = call(
            &state,
            ApiRequest::new(Method::POST, format!("/notes/{note_id}/comments"))
                .with_auth(bearer(&state, "X", Role::User))
                .with_json(&json!({ "content": "mine" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let comment_id = comment["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &state,
            ApiRequest::new(Method::DELETE, format!("/comments/{comment_id}"))
                .with_auth(bearer(&state, "Y", Role::User)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");

        let (status, body) = call(
            &state,
            ApiRequest::new(Method::DELETE, format!("/comments/{comment_id}"))
                .with_auth(bearer(&state, "X", Role::User)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Comment deleted successfully");
    }

    #[tokio::test]
    async fn test_invalid_vote_type_is_400() {
        let state = AppState::for_tests();
        let (status, body) = call(
            &state,
            ApiRequest::new(Method::PUT, "/comments/c1/vote")
                .with_auth(bearer(&state, "u1", Role::User))
                .with_json(&json!({ "voteType": "meh" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_VOTE_TYPE");

        for bad in [json!({ "voteType": 5 }), json!({ "voteType": null })] {
            let (status, body) = call(
                &state,
                ApiRequest::new(Method::PUT, "/comments/c1/vote")
                    .with_auth(bearer(&state, "u1", Role::User))
                    .with_json(&bad),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "INVALID_VOTE_TYPE");
        }
    }

    #[tokio::test]
    async fn test_non_author_edit_is_403() {
        let state = AppState::for_tests();
        let module_id = module(&state).await;

        let (_, note) = call(
            &state,
            ApiRequest::new(Method::POST, format!("/modules/{module_id}/notes"))
                .with_auth(bearer(&state, "X", Role::User))
                .with_json(&json!({ "content": "mine" })),
        )
        .await;
        let note_id = note["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &state,
            ApiRequest::new(Method::PUT, format!("/notes/{note_id}"))
                .with_auth(bearer(&state, "Y", Role::User))
                .with_json(&json!({ "content": "yours now" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_listing_requires_token() {
        let state = AppState::for_tests();
        let (status, _) = call(&state, ApiRequest::new(Method::GET, "/comments")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_routing() {
        let state = AppState::for_tests();
        let req = ApiRequest::new(Method::GET, "/courses");
        assert!(handle_content_request(&state, &req).await.is_none());

        let req = ApiRequest::new(Method::GET, "/notes/n1/vote");
        let response = respond(handle_content_request(&state, &req).await.unwrap());
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
