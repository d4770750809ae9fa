use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{disputes, transactions};
use engine::{Engine, users};

/// Failed logins allowed per account before the window locks.
const AUTH_ATTEMPT_LIMIT: i32 = 5;
/// Lockout window in seconds (15 minutes).
const AUTH_WINDOW_SECS: i64 = 900;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Counted before the credential check so failed guesses burn attempts.
    let attempt_key = format!("auth:{}", auth_header.username());
    let decision = state
        .engine
        .register_attempt(&attempt_key, AUTH_ATTEMPT_LIMIT, AUTH_WINDOW_SECS, Utc::now())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if decision.is_limited() {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let user: Option<users::Model> = users::Entity::find()
        .filter(users::Column::Email.eq(auth_header.username()))
        .filter(users::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = if let Some(user) = user {
        user
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !user.is_active {
        return Err(StatusCode::FORBIDDEN);
    }

    if let Err(err) = state.engine.clear_attempts(&attempt_key).await {
        tracing::warn!("failed to clear login attempts: {err}");
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/{id}", get(transactions::get))
        .route("/transactions/{id}/status", put(transactions::update_status))
        .route(
            "/transactions/{id}/tracking",
            put(transactions::update_tracking),
        )
        .route("/disputes", post(disputes::create).get(disputes::list))
        .route("/disputes/{id}", get(disputes::get))
        .route("/disputes/{id}/messages", post(disputes::add_message))
        .route("/disputes/{id}/assign", put(disputes::assign))
        .route("/disputes/{id}/resolve", put(disputes::resolve))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, bind: &str) {
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

/// Builds the full router without binding a listener; used by in-process
/// tests driving the service directly.
pub fn app(engine: Engine, db: DatabaseConnection) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
        db,
    })
}
