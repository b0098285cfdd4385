//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Routing is match-based
//! dispatch on (Method, path); the /api/clans subtree is handed to the clans
//! route module whole.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::clans::ClanRegistry;
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::types::{ArtelError, Result as ArtelResult};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// None only in dev mode when MongoDB is unreachable
    pub mongo: Option<MongoClient>,
    registry: Option<ClanRegistry>,
    pub jwt: JwtValidator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, mongo: Option<MongoClient>, registry: Option<ClanRegistry>) -> Self {
        let jwt = match &args.jwt_secret {
            Some(secret) => JwtValidator::new(secret, args.jwt_expiry_seconds),
            None => JwtValidator::new_dev(),
        };

        Self {
            args,
            mongo,
            registry,
            jwt,
            started_at: Instant::now(),
        }
    }

    /// The clan registry, or a database error if MongoDB never came up
    pub fn registry(&self) -> ArtelResult<&ClanRegistry> {
        self.registry
            .as_ref()
            .ok_or_else(|| ArtelError::Database("MongoDB is not available".into()))
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> ArtelResult<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Artel listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - using the built-in JWT secret");
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

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // The clan API consumes the request (body parsing happens inside)
    if path == "/api/clans" || path.starts_with("/api/clans/") {
        if method == Method::OPTIONS {
            return Ok(to_boxed(preflight_response()));
        }
        return Ok(routes::handle_clans_request(req, Arc::clone(&state), &path).await);
    }

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)).await)
        }

        // Readiness probe - 200 only if MongoDB answers (or dev mode)
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)).await)
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // Not found
        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response in the API envelope
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "success": false,
        "code": "not_found",
        "message": format!("No route for {}", path),
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
