use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use game_api::{create_game, end_game, get_game, join_game, list_games, make_move};
use shared::{
    domain::{ClientId, Game, GameId},
    error::{ApiError, ErrorCode, GameError},
    protocol::{ClientRequest, CreateGameRequest, GameEndedResponse},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod gateway;

use app_state::AppState;
use config::load_settings;

const MAX_REQUEST_BYTES: usize = 16 * 1024;

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let state = Arc::new(AppState::new(settings.opponent()));
    let app = build_router(state, &settings.allowed_origins);

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/games", get(http_list_games).post(http_create_game))
        .route(
            "/api/games/:game_id",
            get(http_get_game).delete(http_end_game),
        )
        .route("/ws", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%origin, %error, "skipping invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

fn http_error(error: GameError) -> HttpError {
    let api = ApiError::from(error);
    let status = match api.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::InvalidMove => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(api))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_create_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<Game>, HttpError> {
    let game = create_game(&state.ctx, req.player_name())
        .await
        .map_err(http_error)?;
    Ok(Json(game))
}

async fn http_list_games(State(state): State<Arc<AppState>>) -> Json<Vec<Game>> {
    Json(list_games(&state.ctx).await)
}

async fn http_get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<Game>, HttpError> {
    let game = get_game(&state.ctx, &GameId(game_id))
        .await
        .map_err(http_error)?;
    Ok(Json(game))
}

async fn http_end_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameEndedResponse>, HttpError> {
    let game_id = GameId(game_id);
    end_game(&state.ctx, &game_id).await.map_err(http_error)?;
    Ok(Json(GameEndedResponse { game_id }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    use futures::{SinkExt, StreamExt};
    use tokio_stream::wrappers::UnboundedReceiverStream;

    let (client_id, outbox) = state.gateway.connect();
    state.gateway.subscribe_to_lobby(client_id);
    info!(%client_id, lobby = state.gateway.lobby_size(), "client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = UnboundedReceiverStream::new(outbox);

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(error) => {
                    warn!(%error, "failed to encode server event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => dispatch_frame(&state, client_id, &text),
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.gateway.disconnect(client_id);
    send_task.abort();
    info!(%client_id, "client disconnected");
}

/// Parses one client frame and runs it on its own task so a move waiting on
/// the computer does not hold up the socket.
fn dispatch_frame(state: &Arc<AppState>, client_id: ClientId, text: &str) {
    let request = match serde_json::from_str::<ClientRequest>(text) {
        Ok(request) => request,
        Err(error) => {
            state.gateway.notify_client_error(
                client_id,
                ApiError::new(ErrorCode::Validation, format!("invalid request: {error}")),
            );
            return;
        }
    };
    let state = state.clone();
    tokio::spawn(async move { handle_client_request(&state, client_id, request).await });
}

async fn handle_client_request(state: &AppState, client_id: ClientId, request: ClientRequest) {
    let result = match request {
        ClientRequest::JoinGame { game_id } => join_game(&state.ctx, &game_id, |game| {
            state.gateway.subscribe_to_game(client_id, game)
        })
        .await
        .map(|_| ()),
        ClientRequest::LeaveGame { game_id } => {
            state.gateway.unsubscribe_from_game(client_id, &game_id);
            Ok(())
        }
        ClientRequest::MakeMove { game_id, index } => make_move(&state.ctx, &game_id, index)
            .await
            .map(|_| ()),
        ClientRequest::EndGame { game_id } => end_game(&state.ctx, &game_id).await,
    };

    if let Err(error) = result {
        warn!(%client_id, %error, "client request rejected");
        state.gateway.notify_client_error(client_id, error.into());
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
