use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{accounts, advice, allocations, budget, expenses, insights, user};
use engine::Engine;

/// Upstream settings for the advice proxy. When absent, `/advice` answers
/// 502 without attempting a call.
#[derive(Clone, Debug)]
pub struct AdviceConfig {
    pub api_url: String,
    pub api_key: String,
    pub max_retries: u32,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub advice: Option<Arc<AdviceConfig>>,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(auth_header) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route("/accounts/{id}/balance", put(accounts::update_balance))
        .route("/allocations/{id}", patch(allocations::update))
        .route("/budget", get(budget::today))
        .route("/expenses", post(expenses::create).get(expenses::list))
        .route("/expenses/export", get(expenses::export))
        .route(
            "/monthlyExpenses",
            post(expenses::monthly_create).get(expenses::monthly_list),
        )
        .route("/monthlyExpenses/{id}", delete(expenses::monthly_remove))
        .route("/goals", post(insights::goal_create).get(insights::goals))
        .route("/badges", get(insights::badges))
        .route("/streak", get(insights::streak))
        .route("/advice", post(advice::generate))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, advice: Option<AdviceConfig>) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, advice, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    advice: Option<AdviceConfig>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
        advice: advice.map(Arc::new),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    advice: Option<AdviceConfig>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, advice, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
