use crate::config::Config;
use crate::notify::Broadcaster;
use crate::startup::AppState;
use axum::{
    Router,
    extract::Extension,
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};

#[macro_use]
extern crate tracing;

mod bank;
mod config;
mod error;
mod notify;
mod portal;
mod startup;

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let app_state = AppState::new(&config).expect("Unable to build banking service client");

    let session_store = MemoryStore::default();

    // the notification relay outlives every request; it is stopped only by
    // the shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let broadcaster = Broadcaster::new(
        app_state.bank.clone(),
        app_state.registry.clone(),
        config.poll_interval,
    );
    let relay = tokio::spawn(broadcaster.run(shutdown_rx));

    let app = Router::new()
        .route("/login", post(portal::login))
        .route("/logout", get(portal::logout))
        .route("/dashboard", get(portal::dashboard))
        .route("/refresh-dashboard", post(portal::refresh_dashboard))
        .route("/createNewAccount", post(portal::create_new_account))
        .route("/create_bank_account", post(portal::create_bank_account))
        .route("/transfer", post(portal::transfer))
        .route("/account-details", get(portal::account_details))
        .route("/notifications", get(notify::notifications_sse))
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    axum::http::Method::POST,
                    axum::http::Method::GET,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .layer(
            SessionManagerLayer::new(session_store)
                .with_name("bankportal")
                .with_same_site(SameSite::Lax)
                .with_secure(false) // TODO: change this to true when running on an HTTPS/production server instead of locally
                .with_expiry(Expiry::OnInactivity(Duration::seconds(360))),
        )
        .fallback(handler_404);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    let _ = shutdown_tx.send(true);
    let _ = relay.await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Unable to listen for the shutdown signal");
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
