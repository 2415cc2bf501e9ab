//! HTTP API server for rolodex.
//!
//! Exposes the contact/group/tag repositories over REST, enforces
//! cookie-session authentication, parses multipart contact forms, and
//! serves stored avatar images at `/images/`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use rolodex_core::{
    validate_contact_fields, AccountRepository, ContactFields, ContactRepository,
    CreateContactRequest, Credentials, GroupRepository, SessionRepository, TagRepository,
    UpdateContactRequest,
};
use rolodex_db::{Database, ImageStore};

/// Name of the auth cookie carrying the opaque session secret.
const SESSION_COOKIE: &str = "rolodex_session";

/// Maximum multipart request size (avatar image plus form fields).
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    /// Filesystem store behind the public /images/ prefix.
    images: Arc<ImageStore>,
    /// Lifetime of a freshly minted session.
    session_ttl: Duration,
}

/// The authenticated caller, injected by the session middleware.
#[derive(Debug, Clone, Copy)]
struct AuthUser {
    account_id: Uuid,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   RUST_LOG   - standard env filter (default: "rolodex_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rolodex_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/rolodex".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let image_path = std::env::var("IMAGE_STORAGE_PATH")
        .unwrap_or_else(|_| "/var/lib/rolodex/images".to_string());
    let session_ttl_hours: i64 = std::env::var("SESSION_TTL_HOURS")
        .unwrap_or_else(|_| "168".to_string())
        .parse()
        .unwrap_or(168);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize image storage and prove it works before taking traffic
    let images = Arc::new(ImageStore::new(&image_path));
    if let Err(e) = images.validate().await {
        anyhow::bail!("image storage at {} failed validation: {}", image_path, e);
    }
    info!("Image storage initialized at {}", image_path);

    let state = AppState {
        db: db.clone(),
        images,
        session_ttl: Duration::hours(session_ttl_hours),
    };

    // Periodically drop expired sessions
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match db.sessions.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(purged = n, "Expired sessions removed"),
                Err(e) => warn!(error = %e, "Session purge failed"),
            }
        }
    });

    // Routes behind the session cookie
    let protected = Router::new()
        .route(
            "/api/v1/contacts",
            get(list_contacts).post(create_contact),
        )
        .route(
            "/api/v1/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/api/v1/contacts/:id/tags", post(add_contact_tag))
        .route("/api/v1/groups", get(list_groups))
        .route("/api/v1/groups/:id", get(get_group))
        .route("/api/v1/tags", get(list_tags))
        .route("/api/v1/tags/:id", axum::routing::delete(delete_tag))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .merge(protected)
        .nest_service("/images", ServeDir::new(&image_path))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer({
            let allowed_origins = parse_allowed_origins();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse allowed origins from a comma-separated environment variable.
///
/// Cookies require credentialed CORS, so a wildcard origin is never used;
/// unset or empty `ALLOWED_ORIGINS` falls back to the local dev servers.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string());

    if origins_str.trim().is_empty() {
        return vec![
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://localhost:3000"),
        ];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// SESSION MIDDLEWARE & COOKIE HELPERS
// =============================================================================

/// Resolve the session cookie to an account id and inject it as
/// [`AuthUser`]. The owner id flows to every handler as an explicit
/// extension, never through ambient state.
async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let secret = cookie_value(req.headers(), SESSION_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("missing session cookie".to_string()))?;
    let account_id = state.db.sessions.resolve(&secret).await?;
    req.extensions_mut().insert(AuthUser { account_id });
    Ok(next.run(req).await)
}

/// Extract a cookie value by name from the Cookie header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

/// Set-Cookie value for a freshly minted session.
fn session_cookie(secret: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, secret, max_age_secs
    )
}

/// Set-Cookie value that clears the session cookie.
fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

fn set_cookie(mut response: Response, cookie: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::Database(rolodex_core::Error::Internal(e.to_string())))?;
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}

// =============================================================================
// AUTH HANDLERS
// =============================================================================

async fn register(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .db
        .accounts
        .create(&creds.email, &creds.password)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Response, ApiError> {
    let account = state
        .db
        .accounts
        .verify(&creds.email, &creds.password)
        .await?;
    let session = state
        .db
        .sessions
        .create(account.id, state.session_ttl)
        .await?;

    info!(account_id = %account.id, "Login");
    let response = Json(account).into_response();
    set_cookie(
        response,
        &session_cookie(&session.secret, state.session_ttl.num_seconds()),
    )
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(secret) = cookie_value(&headers, SESSION_COOKIE) {
        state.db.sessions.revoke(&secret).await?;
    }
    let response = StatusCode::NO_CONTENT.into_response();
    set_cookie(response, &clear_session_cookie())
}

async fn whoami(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.db.accounts.get(user.account_id).await?;
    Ok(Json(account))
}

// =============================================================================
// CONTACT HANDLERS
// =============================================================================

/// A parsed multipart contact form (shared by create and update).
struct ContactForm {
    fields: ContactFields,
    note: Option<String>,
    /// Original filename and bytes of the uploaded avatar, when present.
    image: Option<(String, Vec<u8>)>,
}

/// Read the multipart fields of a contact create/update submission.
///
/// Missing text fields surface as blank strings so the required-field
/// validation produces one consistent message; unknown fields are ignored.
async fn parse_contact_form(mut multipart: Multipart) -> Result<ContactForm, ApiError> {
    let mut name = String::new();
    let mut email = String::new();
    let mut phone = String::new();
    let mut address = String::new();
    let mut group_id: Option<i32> = None;
    let mut note: Option<String> = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "name" => name = text_field(field).await?,
            "email" => email = text_field(field).await?,
            "phone" => phone = text_field(field).await?,
            "address" => address = text_field(field).await?,
            "group_id" => {
                let raw = text_field(field).await?;
                let parsed = raw.trim().parse::<i32>().map_err(|_| {
                    ApiError::BadRequest(format!("group_id must be an integer, got {:?}", raw))
                })?;
                group_id = Some(parsed);
            }
            "note" => note = Some(text_field(field).await?),
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read image field: {}", e))
                })?;
                // An empty file input submits a zero-byte part; treat as absent.
                if !data.is_empty() {
                    image = Some((file_name, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    let group_id =
        group_id.ok_or_else(|| ApiError::BadRequest("group_id is required".to_string()))?;

    Ok(ContactForm {
        fields: ContactFields {
            name,
            email,
            phone,
            address,
            group_id,
        },
        note,
        image,
    })
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read form field: {}", e)))
}

async fn list_contacts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.db.contacts.list(user.account_id).await?;
    Ok(Json(contacts))
}

async fn get_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.db.contacts.get(user.account_id, id).await?;
    Ok(Json(contact))
}

async fn create_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_contact_form(multipart).await?;

    // Reject bad input before touching the disk.
    validate_contact_fields(&form.fields).map_err(ApiError::BadRequest)?;

    let image = match &form.image {
        Some((file_name, data)) => state.images.store(file_name, data).await?,
        None => String::new(),
    };

    let req = CreateContactRequest {
        fields: form.fields,
        note: form.note,
        image: image.clone(),
    };
    let id = match state.db.contacts.create(user.account_id, req).await {
        Ok(id) => id,
        Err(e) => {
            // Compensating cleanup: no contact row, no orphan file.
            if !image.is_empty() {
                state.images.delete_best_effort(&image).await;
            }
            return Err(e.into());
        }
    };

    let contact = state.db.contacts.get(user.account_id, id).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn update_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_contact_form(multipart).await?;
    validate_contact_fields(&form.fields).map_err(ApiError::BadRequest)?;

    let new_image = match &form.image {
        Some((file_name, data)) => Some(state.images.store(file_name, data).await?),
        None => None,
    };

    let req = UpdateContactRequest {
        fields: form.fields,
        note: form.note,
        new_image: new_image.clone(),
    };
    let previous_image = match state.db.contacts.update(user.account_id, id, req).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Some(path) = &new_image {
                state.images.delete_best_effort(path).await;
            }
            return Err(e.into());
        }
    };

    // The row now points at the new file; drop the superseded one.
    if new_image.is_some() && !previous_image.is_empty() {
        state.images.delete_best_effort(&previous_image).await;
    }

    let contact = state.db.contacts.get(user.account_id, id).await?;
    Ok(Json(contact))
}

async fn delete_contact(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state.db.contacts.delete(user.account_id, id).await?;
    if !image.is_empty() {
        state.images.delete_best_effort(&image).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn add_contact_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut name: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("name") {
            name = Some(text_field(field).await?);
        }
    }
    let name = name.ok_or_else(|| ApiError::BadRequest("Tag name is required".to_string()))?;

    let tag = state.db.contacts.add_tag(user.account_id, id, &name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

// =============================================================================
// GROUP & TAG HANDLERS
// =============================================================================

async fn list_groups(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let groups = state.db.groups.list().await?;
    Ok(Json(groups))
}

async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.db.groups.get(id).await?;
    Ok(Json(group))
}

async fn list_tags(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags.list(user.account_id).await?;
    Ok(Json(tags))
}

async fn delete_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.tags.delete(user.account_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// SYSTEM
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rolodex-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(rolodex_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<rolodex_core::Error> for ApiError {
    fn from(err: rolodex_core::Error) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict("an account with this email already exists".to_string());
        }
        match &err {
            rolodex_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            rolodex_core::Error::ContactNotFound(id) => {
                ApiError::NotFound(format!("Contact {} not found", id))
            }
            rolodex_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            rolodex_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; rolodex_session=abc123; other=1"),
        );
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE),
            Some("abc123".to_string())
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(cookie_value(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("s3cret", 3600);
        assert!(cookie.starts_with("rolodex_session=s3cret;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_clear_session_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("rolodex_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_error_mapping_statuses() {
        let not_found: ApiError = rolodex_core::Error::ContactNotFound(Uuid::nil()).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let bad: ApiError = rolodex_core::Error::InvalidInput("x".into()).into();
        assert!(matches!(bad, ApiError::BadRequest(_)));

        let unauth: ApiError = rolodex_core::Error::Unauthorized("x".into()).into();
        assert!(matches!(unauth, ApiError::Unauthorized(_)));

        let internal: ApiError = rolodex_core::Error::Internal("x".into()).into();
        assert!(matches!(internal, ApiError::Database(_)));
    }
}
