//! Per-request authorization gate for the vacancy routes.
//!
//! Every request carries HTTP Basic credentials. The gate looks up the methods
//! granted to that pair and either forwards the request untouched or answers
//! 401/403 itself. Nothing is cached between requests.

use std::{collections::HashSet, fmt};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use platform_api::{ApiError, ApiResult};
use platform_db::{DbResult, VacancyStore};
use tracing::{debug, error, info, warn};

use crate::http::AppState;

/// Login and password taken from an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of resolving a credential pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// No grants at all. Treated exactly like missing credentials.
    Unauthenticated,
    Authorized(HashSet<String>),
}

impl Access {
    pub fn from_methods<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let methods: HashSet<String> = methods.into_iter().map(Into::into).collect();
        if methods.is_empty() {
            Access::Unauthenticated
        } else {
            Access::Authorized(methods)
        }
    }

    /// Method names compare exactly, the way they are stored.
    pub fn permits(&self, method: &Method) -> bool {
        match self {
            Access::Unauthenticated => false,
            Access::Authorized(methods) => methods.contains(method.as_str()),
        }
    }
}

/// Parse Basic credentials. Anything malformed counts as absent.
pub fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some(Credentials {
        login: login.to_string(),
        password: password.to_string(),
    })
}

pub async fn resolve_access(store: &dyn VacancyStore, credentials: &Credentials) -> DbResult<Access> {
    let methods = store
        .permissions(&credentials.login, &credentials.password)
        .await?;
    Ok(Access::from_methods(methods))
}

/// Middleware guarding the vacancy routes.
pub async fn require_permission(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(credentials) = basic_credentials(request.headers()) else {
        info!("access attempt without credentials");
        return Err(ApiError::Unauthenticated);
    };

    let access = resolve_access(state.store.as_ref(), &credentials)
        .await
        .map_err(|err| {
            error!(login = %credentials.login, error = %err, "permission lookup failed");
            ApiError::internal(err.into())
        })?;

    match access {
        Access::Unauthenticated => {
            warn!(login = %credentials.login, "access attempt with unrecognized credentials");
            Err(ApiError::Unauthenticated)
        }
        access if access.permits(request.method()) => {
            debug!(login = %credentials.login, method = %request.method(), "request authorized");
            Ok(next.run(request).await)
        }
        Access::Authorized(_) => {
            warn!(
                login = %credentials.login,
                method = %request.method(),
                "access attempt with a method that is not granted"
            );
            Err(ApiError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        Router,
        body::Body,
        http::{HeaderValue, StatusCode},
        middleware,
        routing::any,
    };
    use platform_db::MemoryStore;
    use tower::ServiceExt;

    use super::*;

    fn basic(login: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{login}:{password}")))
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn demo_store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_grant("vi", "pass_vi", &["GET"])
                .with_grant("ed", "pass_ed", &["GET", "PUT", "DELETE"]),
        )
    }

    /// A gated router whose inner handler only counts invocations.
    fn gated(store: Arc<MemoryStore>, hits: Arc<AtomicUsize>) -> Router {
        let state = AppState::new(store);
        Router::new()
            .route(
                "/vacancy/{*id}",
                any(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        StatusCode::OK
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_permission,
            ))
            .with_state(state)
    }

    async fn call(router: Router, method: Method, auth: Option<String>) -> StatusCode {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri("/vacancy/1");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[test]
    fn parses_basic_header() {
        let creds = basic_credentials(&headers_with(&basic("vi", "pass:with:colons"))).unwrap();
        assert_eq!(creds.login, "vi");
        assert_eq!(creds.password, "pass:with:colons");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = basic("vi", "pass_vi").replacen("Basic", "basic", 1);
        assert!(basic_credentials(&headers_with(&value)).is_some());
    }

    #[test]
    fn malformed_headers_count_as_absent() {
        assert!(basic_credentials(&HeaderMap::new()).is_none());
        assert!(basic_credentials(&headers_with("Bearer abc")).is_none());
        assert!(basic_credentials(&headers_with("Basic !!!not-base64")).is_none());
        let no_colon = format!("Basic {}", STANDARD.encode("justlogin"));
        assert!(basic_credentials(&headers_with(&no_colon)).is_none());
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials {
            login: "vi".into(),
            password: "pass_vi".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("vi"));
        assert!(!rendered.contains("pass_vi"));
    }

    #[test]
    fn empty_grant_list_is_unauthenticated() {
        assert_eq!(Access::from_methods(Vec::<String>::new()), Access::Unauthenticated);
        assert!(!Access::Unauthenticated.permits(&Method::GET));
    }

    #[test]
    fn method_match_is_exact() {
        let access = Access::from_methods(["GET"]);
        assert!(access.permits(&Method::GET));
        assert!(!access.permits(&Method::DELETE));
        assert!(!Access::from_methods(["get"]).permits(&Method::GET));
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_lookup() {
        let store = demo_store();
        let hits = Arc::new(AtomicUsize::new(0));
        let status = call(gated(store.clone(), hits.clone()), Method::GET, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(store.permission_calls(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_or_wrong_credentials_are_unauthenticated() {
        for (login, password) in [("nobody", "x"), ("vi", "wrong"), ("", "")] {
            for method in [Method::GET, Method::PUT, Method::DELETE, Method::POST] {
                let hits = Arc::new(AtomicUsize::new(0));
                let status = call(
                    gated(demo_store(), hits.clone()),
                    method,
                    Some(basic(login, password)),
                )
                .await;
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(hits.load(Ordering::SeqCst), 0);
            }
        }
    }

    #[tokio::test]
    async fn viewer_may_read_but_not_delete() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = gated(demo_store(), hits.clone());
        let status = call(router.clone(), Method::GET, Some(basic("vi", "pass_vi"))).await;
        assert_eq!(status, StatusCode::OK);
        let status = call(router, Method::DELETE, Some(basic("vi", "pass_vi"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn editor_delete_reaches_handler_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let status = call(
            gated(demo_store(), hits.clone()),
            Method::DELETE,
            Some(basic("ed", "pass_ed")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_failure_is_internal_error() {
        let store = demo_store();
        store.set_unavailable(true);
        let hits = Arc::new(AtomicUsize::new(0));
        let status = call(
            gated(store, hits.clone()),
            Method::GET,
            Some(basic("vi", "pass_vi")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
