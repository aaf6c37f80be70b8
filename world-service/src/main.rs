// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

mod config;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use frontier_common::{
    BUILD_MESSAGE, BotAction, BotId, BuildBotResponse, FactoryId, INIT_MESSAGE, InitResponse,
    MapResponse, StdRandom, World, WorldError,
};
use lambda_http::run as lambda_run;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    world: Arc<Mutex<World>>,
}

impl AppState {
    fn new(world: World) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "world_service=debug,tower_http=info".to_string()),
        )
        .init();

    let config = config::load_service_config()?;
    let rng = match config.seed {
        Some(seed) => {
            info!(seed, "using seeded random source");
            StdRandom::seeded(seed)
        }
        None => StdRandom::from_os(),
    };
    let world = World::new(config.world, Box::new(rng));
    info!(map_size = world.map_size(), "world created");

    let app = build_router(AppState::new(world));

    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        info!("AWS Lambda runtime detected; running world-service in lambda mode");
        lambda_run(app)
            .await
            .map_err(|e| anyhow::Error::msg(format!("lambda runtime error: {e}")))?;
        return Ok(());
    }

    let bind_addr = parse_bind_addr("WORLD_SERVICE_BIND", "0.0.0.0:5000")?;
    info!(%bind_addr, "world-service listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/init", post(init_handler))
        .route("/map", get(get_map_handler))
        .route("/agent/{agent_id}/build", post(build_bot_handler))
        .route("/agent/{agent_id}/action", get(bot_action_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn parse_bind_addr(var_name: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let value = std::env::var(var_name)
        .ok()
        .unwrap_or_else(|| default.to_string());
    value.parse().context(format!("invalid {var_name}"))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let world = state.world.lock().await;
    Json(serde_json::json!({
        "ok": true,
        "service": "world-service",
        "initialized_at": world.initialized_at(),
    }))
}

async fn init_handler(State(state): State<AppState>) -> Json<InitResponse> {
    let mut world = state.world.lock().await;
    let map_size = world.initialize();
    info!(
        map_size,
        factory_count = world.factories().count(),
        initialized_at = ?world.initialized_at(),
        "world initialized"
    );

    Json(InitResponse {
        message: INIT_MESSAGE.to_string(),
        map_size,
    })
}

async fn build_bot_handler(
    State(state): State<AppState>,
    Path(factory_id): Path<FactoryId>,
) -> Result<Json<BuildBotResponse>, ApiError> {
    let mut world = state.world.lock().await;
    let bot_id = world.build_bot(factory_id)?;
    if let Some(bot) = world.bot(bot_id) {
        info!(factory_id, bot_id, location = ?bot.location, "engineer bot built");
    }

    Ok(Json(BuildBotResponse {
        message: BUILD_MESSAGE.to_string(),
        bot_id,
    }))
}

async fn bot_action_handler(
    State(state): State<AppState>,
    Path(bot_id): Path<BotId>,
) -> Result<Json<BotAction>, ApiError> {
    let action = state.world.lock().await.decide_action(bot_id)?;
    info!(bot_id, action = ?action, "bot action decided");
    Ok(Json(action))
}

async fn get_map_handler(State(state): State<AppState>) -> Json<MapResponse> {
    let world = state.world.lock().await;
    Json(MapResponse {
        map: world.grid().clone(),
    })
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<WorldError> for ApiError {
    fn from(error: WorldError) -> Self {
        match error {
            WorldError::FactoryNotFound(_) | WorldError::BotNotFound(_) => {
                Self::not_found(error.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "request failed");
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
