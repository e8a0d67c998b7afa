//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each connection gets
//! its own task; each request is read in full (capped) and then offered to
//! the route handlers in turn.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{AccessGuard, Argon2Verifier, TokenCodec};
use crate::config::Args;
use crate::db::{AccountRepository, ContentRepository, CourseRepository, MemoryStore};
use crate::ledger::VoteLedger;
use crate::notify::{LogNotifier, Notifier};
use crate::routes::{self, ApiRequest, BoxBody};
use crate::services::{AccountService, ContentService, CourseService};
use crate::types::Result;

/// The three repository seams, usually backed by one store
#[derive(Clone)]
pub struct Repositories {
    pub content: Arc<dyn ContentRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub courses: Arc<dyn CourseRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ContentRepository + AccountRepository + CourseRepository + 'static,
    {
        Self {
            content: store.clone(),
            accounts: store.clone(),
            courses: store,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub guard: AccessGuard,
    pub repositories: Repositories,
    pub accounts: AccountService,
    pub courses: CourseService,
    pub content: ContentService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        codec: TokenCodec,
        repositories: Repositories,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ledger = Arc::new(VoteLedger::new(
            repositories.content.clone(),
            repositories.accounts.clone(),
            notifier,
        ));

        Self {
            guard: AccessGuard::new(codec.clone()),
            accounts: AccountService::new(
                repositories.accounts.clone(),
                codec,
                Arc::new(Argon2Verifier),
            ),
            courses: CourseService::new(repositories.courses.clone()),
            content: ContentService::new(
                repositories.content.clone(),
                repositories.courses.clone(),
                ledger,
            ),
            repositories,
            args,
            started_at: Instant::now(),
        }
    }

    /// State over a fresh in-memory store with log-only notifications
    pub fn in_memory(args: Args, codec: TokenCodec) -> Self {
        Self::new(
            args,
            codec,
            Repositories::from_store(Arc::new(MemoryStore::new())),
            Arc::new(LogNotifier),
        )
    }

    /// Seed the configured bootstrap admin, if any
    pub async fn bootstrap(&self) -> Result<()> {
        if let Some(admin) = self.args.bootstrap_admin() {
            self.accounts.ensure_admin(admin).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        use clap::Parser;

        let args = Args::parse_from(["notewarden", "--dev-mode"]);
        Self::in_memory(args, TokenCodec::new_dev())
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Notewarden listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - fixed token secret unless JWT_SECRET is set");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    if req.method() == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    let request = match ApiRequest::read(req).await {
        Ok(request) => request,
        Err(e) => return Ok(routes::error_response(&e)),
    };

    Ok(route(&state, &request).await)
}

/// Dispatch a read request to the first handler that claims its path
pub async fn route(state: &AppState, req: &ApiRequest) -> Response<BoxBody> {
    if req.method == Method::GET && req.path == "/health" {
        return routes::health_check(state);
    }

    if let Some(result) = routes::handle_auth_request(state, req).await {
        return routes::respond(result);
    }
    if let Some(result) = routes::handle_course_request(state, req).await {
        return routes::respond(result);
    }
    if let Some(result) = routes::handle_content_request(state, req).await {
        return routes::respond(result);
    }

    debug!("No route for {} {}", req.method, req.path);
    routes::not_found_response(&req.path)
}
