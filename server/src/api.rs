//! HTTP handlers

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use dioscuri_addressbar::{AddressInput, FormFields, SubmitOutcome};
use dioscuri_core::{CoreError, GeminiUrl, KnownHost, Page};

use crate::AppState;

/// Form field carrying the answer to a Gemini input prompt
pub const INPUT_FIELD: &str = "input";

type QueryPairs = Vec<(String, String)>;

/// A rendered [`Page`] as an HTTP response
pub struct PageResponse(pub Page);

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        match self.0 {
            Page::Html { status, html } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, Html(html)).into_response()
            }
            Page::Raw { mime, body } => ([(header::CONTENT_TYPE, mime)], body).into_response(),
            Page::Redirect {
                location,
                permanent: true,
            } => Redirect::permanent(&location).into_response(),
            Page::Redirect {
                location,
                permanent: false,
            } => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        }
    }
}

/// JSON error for the `/api` routes
pub struct ApiError(CoreError);

impl<E: Into<CoreError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "API request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Homepage, or the no-JS address bar submission
pub async fn home(State(state): State<AppState>, Query(fields): Query<QueryPairs>) -> Response {
    match state.address_bar.resolve(&fields) {
        SubmitOutcome::Navigate(destination) => Redirect::to(&destination).into_response(),
        SubmitOutcome::Stay => Html(state.browser.homepage()).into_response(),
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn list_known_hosts(
    State(state): State<AppState>,
) -> Result<Json<Vec<KnownHost>>, ApiError> {
    Ok(Json(state.browser.known_hosts().list()?))
}

pub async fn forget_known_host(
    State(state): State<AppState>,
    Path(host): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.browser.known_hosts().forget(&host)? {
        tracing::info!(%host, "Forgot pinned certificate");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// Fetch the capsule named by the request path
pub async fn proxy(State(state): State<AppState>, uri: Uri) -> PageResponse {
    match target_url(&uri) {
        Ok(url) => visit(&state, &url).await,
        Err(message) => bad_address(&state, &uri, &message),
    }
}

/// Answer an input prompt: the form field becomes the capsule's query
pub async fn answer(
    State(state): State<AppState>,
    uri: Uri,
    Form(fields): Form<QueryPairs>,
) -> PageResponse {
    match target_url(&uri) {
        Ok(url) => {
            let input = fields.field(INPUT_FIELD).unwrap_or_default();
            visit(&state, &url.with_input(&input)).await
        }
        Err(message) => bad_address(&state, &uri, &message),
    }
}

async fn visit(state: &AppState, url: &GeminiUrl) -> PageResponse {
    tracing::debug!(%url, "Proxying");
    PageResponse(state.browser.visit(url).await)
}

fn bad_address(state: &AppState, uri: &Uri, message: &str) -> PageResponse {
    tracing::debug!(path = %uri.path(), %message, "Rejected address");
    PageResponse(state.browser.error_page(400, "Bad address", message))
}

/// Map a proxy request back to the Gemini URL it stands for. The raw
/// HTTP query is the capsule's query, untouched.
pub fn target_url(uri: &Uri) -> Result<GeminiUrl, String> {
    let address = AddressInput::from_destination(uri.path()).map_err(|e| e.to_string())?;
    let url = GeminiUrl::from_address(address.as_str()).map_err(|e| e.to_string())?;
    Ok(match uri.query() {
        Some(query) => url.with_raw_query(Some(query)),
        None => url,
    })
}
