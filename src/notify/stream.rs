use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::mpsc;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use super::registry::SessionRegistry;
use crate::portal::{load_profile, profile_str};
use crate::startup::AppState;

/// Removes the registry entry when the SSE stream is dropped, i.e. when the
/// browser closes the connection. Removal only takes effect while this
/// connection still owns the entry.
struct RegistryGuard {
    registry: SessionRegistry,
    ucid: String,
    handle_id: Uuid,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let ucid = std::mem::take(&mut self.ucid);
        let handle_id = self.handle_id;
        tokio::spawn(async move {
            registry.unregister(&ucid, handle_id).await;
            info!("user {ucid} disconnected");
        });
    }
}

/// Live notification channel for the logged-in user.
///
/// Connecting registers the session's ucid in the registry so the broadcaster
/// can route messages here; tearing the stream down unregisters it. Without a
/// logged-in session the stream stays open but nothing is ever routed to it.
pub async fn notifications_sse(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // ucid comes from the authenticated session, never from the request
    let ucid = match load_profile(&session).await {
        Ok(Some(profile)) => profile_str(&profile, "ucid"),
        _ => None,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    // an unregistered stream must still stay open; holding this sender keeps
    // rx.recv() pending instead of ending the response on connect
    let keepalive = tx.clone();
    let mut guard = None;
    if let Some(ucid) = ucid {
        let handle_id = app_state.registry.register(&ucid, tx).await;
        info!("user {ucid} connected to the notification stream");
        guard = Some(RegistryGuard {
            registry: app_state.registry.clone(),
            ucid,
            handle_id,
        });
    }

    let stream = async_stream::stream! {
        let _guard = guard;
        let _keepalive = keepalive;
        while let Some(message) = rx.recv().await {
            yield Ok(Event::default()
                .event("new_notification")
                .data(json!({ "message": message }).to_string()));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    fn test_app() -> Router {
        let config = Config {
            bank_service_url: "http://127.0.0.1:1/cloudbank".to_string(),
            poll_interval: Duration::from_secs(15),
            request_timeout: Duration::from_millis(100),
            port: 0,
        };
        let app_state = AppState::new(&config).unwrap();
        Router::new()
            .route("/notifications", get(notifications_sse))
            .layer(Extension(app_state))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn anonymous_stream_stays_open() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // without a logged-in session nothing is ever routed here, but the
        // stream must stay open rather than complete on connect
        let body = to_bytes(response.into_body(), usize::MAX);
        let outcome = tokio::time::timeout(Duration::from_millis(500), body).await;
        assert!(outcome.is_err(), "stream ended for an anonymous session");
    }
}
