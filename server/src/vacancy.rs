//! Vacancy routes: classification of (route, method, id presence) into one
//! action, and the four CRUD operations behind it.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use entity::vacancy;
use platform_api::{ApiError, ApiResult};
use platform_db::DbError;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::http::AppState;

pub const COLLECTION_PATH: &str = "/vacancy";
pub const ITEM_PREFIX: &str = "/vacancy/";
pub const ITEM_PATH: &str = "/vacancy/{*id}";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/vacancy`
    Collection,
    /// `/vacancy/` with an optional id suffix.
    Item,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List,
    GetOne,
    Upsert,
    Delete,
    /// PUT with an id in the path; ids travel in the body.
    RejectPathId,
    Unsupported,
}

/// The whole routing table. Pure so it can be checked exhaustively.
pub fn classify(route: Route, method: &Method, has_id: bool) -> Action {
    match (route, method, has_id) {
        (Route::Collection, &Method::GET, _) => Action::List,
        (Route::Collection, &Method::PUT, _) => Action::Upsert,
        (Route::Collection, _, _) => Action::Unsupported,
        (Route::Item, &Method::GET, false) => Action::List,
        (Route::Item, &Method::GET, true) => Action::GetOne,
        (Route::Item, &Method::DELETE, _) => Action::Delete,
        (Route::Item, &Method::PUT, true) => Action::RejectPathId,
        (Route::Item, &Method::PUT, false) => Action::Upsert,
        (Route::Item, _, _) => Action::Unsupported,
    }
}

pub async fn collection(State(state): State<AppState>, request: Request) -> Response {
    dispatch(&state, Route::Collection, "", request).await
}

/// Serves `/vacancy/` and everything below it. The id is cut from the raw
/// path here rather than by an extractor, so undecodable input still goes
/// through [`classify`].
pub async fn item(State(state): State<AppState>, request: Request) -> Response {
    let param = item_param(request.uri().path());
    dispatch(&state, Route::Item, &param, request).await
}

/// Percent-decoded text after `/vacancy/`. Invalid UTF-8 is replaced rather
/// than rejected; such an id is present but never parses.
fn item_param(path: &str) -> String {
    let raw = path.strip_prefix(ITEM_PREFIX).unwrap_or_default();
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

async fn dispatch(state: &AppState, route: Route, param: &str, request: Request) -> Response {
    let method = request.method().clone();
    let result = match classify(route, &method, !param.is_empty()) {
        Action::List => list(state).await,
        Action::GetOne => get_one(state, param).await,
        Action::Upsert => upsert(state, request.into_body()).await,
        Action::Delete => delete(state, param).await,
        Action::RejectPathId => {
            warn!(param, "PUT with an id in the path");
            Err(ApiError::bad_request("id must be sent in the request body"))
        }
        Action::Unsupported => {
            warn!(%method, ?route, "unsupported method");
            Err(ApiError::NotImplemented)
        }
    };
    result.into_response()
}

async fn list(state: &AppState) -> ApiResult<Response> {
    let vacancies = state.store.list().await.map_err(|err| {
        error!(error = %err, "listing vacancies failed");
        ApiError::internal(err.into())
    })?;
    json_response(&vacancies)
}

async fn get_one(state: &AppState, param: &str) -> ApiResult<Response> {
    let id = parse_id(param)?;
    match state.store.get(id).await {
        Ok(vacancy) => json_response(&vacancy),
        Err(DbError::NotFound) => Err(ApiError::NotFound),
        Err(err) => {
            error!(id, error = %err, "loading vacancy failed");
            Err(ApiError::internal(err.into()))
        }
    }
}

async fn delete(state: &AppState, param: &str) -> ApiResult<Response> {
    let id = parse_id(param)?;
    state.store.delete(id).await.map_err(|err| {
        error!(id, error = %err, "deleting vacancy failed");
        ApiError::internal(err.into())
    })?;
    info!(id, "vacancy deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn upsert(state: &AppState, body: Body) -> ApiResult<Response> {
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|err| {
        warn!(error = %err, "reading request body failed");
        ApiError::bad_request("unreadable request body")
    })?;
    let vacancy: vacancy::Model = serde_json::from_slice(&bytes).map_err(|err| {
        warn!(error = %err, "malformed vacancy payload");
        ApiError::bad_request("malformed vacancy payload")
    })?;
    validate(&vacancy)?;

    let id = vacancy.id;
    state.store.upsert(vacancy).await.map_err(|err| {
        error!(id, error = %err, "saving vacancy failed");
        ApiError::internal(err.into())
    })?;
    info!(id, "vacancy saved");
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn validate(vacancy: &vacancy::Model) -> ApiResult<()> {
    if vacancy.salary <= 0 {
        warn!(id = vacancy.id, salary = vacancy.salary, "non-positive salary rejected");
        return Err(ApiError::bad_request("Salary must be positive"));
    }
    Ok(())
}

fn parse_id(param: &str) -> ApiResult<i64> {
    param.parse().map_err(|_| {
        warn!(param, "invalid vacancy id");
        ApiError::bad_request("invalid vacancy id")
    })
}

fn json_response<T: Serialize>(value: &T) -> ApiResult<Response> {
    let body = serde_json::to_vec(value).map_err(|err| {
        error!(error = %err, "encoding response failed");
        ApiError::internal(err.into())
    })?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
        body,
    )
        .into_response())
}
