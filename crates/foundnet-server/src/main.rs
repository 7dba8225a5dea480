use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use foundnet_api::auth::{self, AppState, AppStateInner};
use foundnet_api::middleware::require_auth;
use foundnet_api::{chat, companies, matchmaking, users};
use foundnet_gateway::connection;
use foundnet_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foundnet=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("FOUNDNET_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("FOUNDNET_DB_PATH").unwrap_or_else(|_| "foundnet.db".into());
    let host = std::env::var("FOUNDNET_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FOUNDNET_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = foundnet_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state: the chat dispatcher is a constructor-injected
    // capability, handlers reach it through the state.
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        dispatcher,
    });

    // Routes
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/users/profile", get(users::get_profile))
        .route("/api/users/profile", put(users::update_profile))
        .route("/api/users/search", get(users::search_users))
        .route("/api/users/connections", get(users::get_connections))
        .route("/api/users/{user_id}", get(users::get_user))
        .route("/api/companies/add", post(companies::add_company))
        .route("/api/companies/{company_id}", get(companies::get_company))
        .route("/api/companies/{company_id}", put(companies::update_company))
        .route(
            "/api/companies/{company_id}/funding",
            post(companies::add_funding_round),
        )
        .route("/api/matchmaking/matches", get(matchmaking::get_matches))
        .route("/api/matchmaking/connect", post(matchmaking::connect))
        .route(
            "/api/matchmaking/matches/{match_id}/status",
            put(matchmaking::update_match_status),
        )
        .route("/api/chat/history/{user_id}", get(chat::get_history))
        .route("/api/chat/send", post(chat::send_message))
        .route("/api/chat/read/{message_id}", put(chat::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_route = Router::new().route("/ws", get(ws_upgrade)).with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("FoundNet server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}
