use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use headers::{Cookie, HeaderMapExt};
use http::header::{HeaderValue, SET_COOKIE};

use sesskit::{Engine, Session, new_session_id};

use crate::config::SessionConfig;
use crate::extract::CurrentSession;

/// Shared state for [`session_middleware`].
#[derive(Clone)]
pub struct SessionState {
    engine: Arc<dyn Engine>,
    config: Arc<SessionConfig>,
}

impl SessionState {
    pub fn new(engine: Arc<dyn Engine>, config: SessionConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}

/// Session middleware, for `axum::middleware::from_fn_with_state`.
///
/// Resolves the session named by the request cookie, minting a fresh one
/// on miss or load failure, publishes it to handlers as
/// [`CurrentSession`], saves it back after the handler returns and
/// refreshes the cookie. Storage failures never fail the request; the
/// worst case is a fresh session.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request,
    next: Next,
) -> Response {
    let config = Arc::clone(&state.config);
    // A missing or unreadable cookie just means no candidate id.
    let candidate = req
        .headers()
        .typed_get::<Cookie>()
        .and_then(|cookies| cookies.get(&config.cookie_name).map(str::to_string));

    let session = resolve_session(&state, candidate.as_deref()).await;
    let sid = session.id().to_string();

    req.extensions_mut()
        .insert(CurrentSession(Arc::clone(&session)));
    let mut response = next.run(req).await;

    // The response is already determined; a failed save only loses the
    // session data, so it is logged and nothing more.
    if let Err(err) = state.engine.save(session).await {
        tracing::warn!(%err, id = %sid, "failed to save session");
    }

    match HeaderValue::from_str(&set_cookie_value(&config, &sid)) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => tracing::error!(%err, "failed to encode session cookie"),
    }
    response
}

async fn resolve_session(state: &SessionState, candidate: Option<&str>) -> Arc<dyn Session> {
    let config = &state.config;
    if let Some(id) = candidate {
        if state.engine.exists(id).await {
            match state.engine.load(id).await {
                Ok(session) => return session,
                Err(err) => {
                    tracing::warn!(%err, id, "failed to load session, minting a fresh one");
                }
            }
        }
    }
    let expires = Utc::now() + config.default_duration;
    (config.builder)(new_session_id(), None, expires)
}

fn set_cookie_value(config: &SessionConfig, id: &str) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path={}",
        config.cookie_name,
        id,
        config.default_duration.as_secs(),
        config.cookie_path
    );
    if let Some(same_site) = config.cookie_same_site {
        cookie.push_str("; SameSite=");
        cookie.push_str(&same_site.to_string());
    }
    if let Some(domain) = &config.cookie_domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    if config.cookie_http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SameSite;
    use axum::{Router, body::Body, middleware::from_fn_with_state, routing::get};
    use http::{Request as HttpRequest, StatusCode, header::COOKIE};
    use sesskit::SessionError;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    async fn count_handler(CurrentSession(session): CurrentSession) -> String {
        let n = session.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
        session.set("count", json!(n + 1));
        format!("{n}")
    }

    async fn test_app() -> (Router, Arc<dyn Engine>) {
        let engine = sesskit::connect(
            CancellationToken::new(),
            "memory",
            sesskit::StartArgs::new(),
        )
        .await
        .expect("memory engine");
        let state = SessionState::new(Arc::clone(&engine), SessionConfig::default());
        let app = Router::new()
            .route("/count", get(count_handler))
            .layer(from_fn_with_state(state, session_middleware));
        (app, engine)
    }

    fn request(cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/count");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, format!("_session_={cookie}"));
        }
        builder.body(Body::empty()).expect("request")
    }

    fn cookie_id(response: &Response) -> String {
        let header = response
            .headers()
            .get(SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .expect("ascii cookie");
        let (pair, attrs) = header.split_once(';').expect("cookie attributes");
        assert!(attrs.contains("HttpOnly"));
        assert!(attrs.contains("Max-Age=1800"));
        assert!(attrs.contains("Path=/"));
        pair.strip_prefix("_session_=").expect("cookie name").to_string()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn test_first_request_mints_a_session() {
        let (app, engine) = test_app().await;

        let response = app.oneshot(request(None)).await.expect("response");

        let id = cookie_id(&response);
        assert_eq!(body_string(response).await, "0");
        // The handler's mutation was persisted after it returned.
        let saved = engine.load(&id).await.expect("saved session");
        assert_eq!(saved.get("count"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_counter_round_trips_across_requests() {
        let (app, _engine) = test_app().await;

        let first = app
            .clone()
            .oneshot(request(None))
            .await
            .expect("first response");
        let id = cookie_id(&first);
        assert_eq!(body_string(first).await, "0");

        let second = app
            .clone()
            .oneshot(request(Some(&id)))
            .await
            .expect("second response");
        assert_eq!(cookie_id(&second), id, "cookie is refreshed, not replaced");
        assert_eq!(body_string(second).await, "1");

        let third = app.oneshot(request(Some(&id))).await.expect("third response");
        assert_eq!(body_string(third).await, "2");
    }

    /// Claims every id exists but fails to load any of them, like a
    /// store whose rows have gone unreadable.
    struct UnreadableEngine;

    #[async_trait::async_trait]
    impl Engine for UnreadableEngine {
        async fn exists(&self, _id: &str) -> bool {
            true
        }

        async fn load(&self, _id: &str) -> Result<Arc<dyn Session>, SessionError> {
            Err(SessionError::Storage("backend read failed".to_string()))
        }

        async fn save(&self, _session: Arc<dyn Session>) -> Result<(), SessionError> {
            Ok(())
        }

        async fn count(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn test_load_failure_mints_fresh_session() {
        let state = SessionState::new(Arc::new(UnreadableEngine), SessionConfig::default());
        let app = Router::new()
            .route("/count", get(count_handler))
            .layer(from_fn_with_state(state, session_middleware));
        let stale = new_session_id();

        let response = app.oneshot(request(Some(&stale))).await.expect("response");

        // The failed load is swallowed; the request gets a fresh session.
        let id = cookie_id(&response);
        assert_ne!(id, stale);
        assert_eq!(body_string(response).await, "0");
    }

    #[tokio::test]
    async fn test_unknown_cookie_mints_fresh_id() {
        let (app, _engine) = test_app().await;
        let stale = new_session_id();

        let response = app.oneshot(request(Some(&stale))).await.expect("response");

        let id = cookie_id(&response);
        assert_ne!(id, stale);
        assert_eq!(body_string(response).await, "0");
    }

    #[tokio::test]
    async fn test_handler_without_middleware_rejects() {
        let app = Router::new().route("/count", get(count_handler));

        let response = app.oneshot(request(None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_optional_extractor_without_middleware() {
        async fn probe(session: Option<CurrentSession>) -> String {
            match session {
                Some(_) => "some".to_string(),
                None => "none".to_string(),
            }
        }
        let app = Router::new().route("/probe", get(probe));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/probe")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(body_string(response).await, "none");
    }

    #[test]
    fn test_cookie_attributes_follow_config() {
        let config = SessionConfig {
            cookie_domain: Some("example.com".to_string()),
            cookie_secure: true,
            cookie_http_only: false,
            cookie_same_site: Some(SameSite::Strict),
            ..SessionConfig::default()
        };

        let cookie = set_cookie_value(&config, "abc123");

        assert!(cookie.starts_with("_session_=abc123; "));
        assert!(cookie.contains("Domain=example.com"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Secure"));
        assert!(!cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_same_site_defaults_to_lax_and_can_be_omitted() {
        assert!(set_cookie_value(&SessionConfig::default(), "abc").contains("SameSite=Lax"));

        let config = SessionConfig {
            cookie_same_site: None,
            ..SessionConfig::default()
        };
        assert!(!set_cookie_value(&config, "abc").contains("SameSite"));
    }
}
