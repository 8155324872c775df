//! Cookie counter demo.
//!
//! `GET /with_session/count` increments a per-browser counter held in the
//! session; `GET /without_session/count` shows the extractor absent when
//! the middleware is not installed.

use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use sesskit::StartArgs;
use sesskit_axum::{CurrentSession, SessionConfig, SessionState, session_middleware};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let shutdown = CancellationToken::new();
    let engine = sesskit::connect(shutdown.clone(), "memory", StartArgs::new())
        .await
        .expect("failed to start session engine");

    let state = SessionState::new(engine, SessionConfig::default());
    let with_session = Router::new()
        .route("/count", get(count))
        .layer(middleware::from_fn_with_state(state, session_middleware));
    let without_session = Router::new().route("/count", get(count_anonymous));

    let app = Router::new()
        .nest("/with_session", with_session)
        .nest("/without_session", without_session);

    let addr = SocketAddr::from(([0, 0, 0, 0], 7766));
    tracing::info!("listening on http://{addr}");
    tokio::select! {
        served = axum_server::bind(addr).serve(app.into_make_service()) => {
            if let Err(err) = served {
                tracing::error!(%err, "server exited");
            }
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    // Stops the engine's background sweep.
    shutdown.cancel();
}

async fn count(CurrentSession(session): CurrentSession) -> String {
    let n = session.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
    session.set("count", json!(n + 1));
    format!("Count: {n}\n")
}

async fn count_anonymous(session: Option<CurrentSession>) -> String {
    match session {
        Some(CurrentSession(session)) => format!("Count: {:?}\n", session.get("count")),
        None => "Count: ?\n".to_string(),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "demo_counter=debug,sesskit=debug,sesskit_axum=debug,info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
