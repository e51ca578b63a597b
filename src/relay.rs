//! The relay server.
//!
//! The relay understands no chess at all. It pairs two sockets into a game,
//! assigns colors at random, and forwards move/board payloads opaquely; the
//! only field it computes is the `turn` hint on a forwarded move, flipped
//! from the mover's color to the receiver's. State is process memory only,
//! discarded on game-over or disconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::mpsc::{self, UnboundedSender};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::board::{Board, Color, PlainMove};
use crate::protocol::{ClientMessage, ServerMessage, StateFlags};

pub type ConnId = u64;

fn generate_game_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One side of a paired (or waiting) game: its connection and the channel
/// its writer task drains.
struct Player {
    conn: ConnId,
    color: Color,
    tx: UnboundedSender<ServerMessage>,
}

struct ActiveGame {
    players: [Player; 2],
}

impl ActiveGame {
    fn peer_of(&self, conn: ConnId) -> Option<&Player> {
        self.players.iter().find(|p| p.conn != conn)
    }
}

#[derive(Default)]
struct RelayMaps {
    waiting: HashMap<String, Player>,
    games: HashMap<String, ActiveGame>,
}

#[derive(Clone)]
pub struct RelayState {
    maps: Arc<RwLock<RelayMaps>>,
    conn_counter: Arc<AtomicU64>,
}

impl RelayState {
    pub fn new() -> RelayState {
        RelayState {
            maps: Arc::new(RwLock::new(RelayMaps::default())),
            conn_counter: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_conn(&self) -> ConnId {
        self.conn_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn dispatch(&self, conn: ConnId, tx: &UnboundedSender<ServerMessage>, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinGame => self.handle_join(conn, tx),
            ClientMessage::RegisterPlayer {
                game_id,
                player_color,
            } => self.handle_register(conn, tx, game_id, player_color),
            ClientMessage::Move {
                game_id,
                mv,
                board,
                game_state,
            } => self.handle_move(conn, game_id, mv, board, game_state),
            ClientMessage::SyncBoard {
                game_id,
                board,
                turn,
                game_state,
            } => self.handle_sync(conn, game_id, board, turn, game_state),
            ClientMessage::GameOver {
                game_id, result, ..
            } => self.handle_game_over(conn, game_id, result),
        }
    }

    /// Pair with the first waiting player, or become the waiting player with
    /// a fresh game id and a randomly drawn color.
    fn handle_join(&self, conn: ConnId, tx: &UnboundedSender<ServerMessage>) {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());

        if let Some(game_id) = maps.waiting.keys().next().cloned() {
            let opponent = maps
                .waiting
                .remove(&game_id)
                .expect("waiting entry vanished under the lock");
            let player = Player {
                conn,
                color: opponent.color.other(),
                tx: tx.clone(),
            };
            for (you, other) in [(&opponent, &player), (&player, &opponent)] {
                you.tx
                    .send(ServerMessage::GameStarted {
                        your_color: you.color,
                        opponent_color: other.color,
                        game_id: game_id.clone(),
                    })
                    .ok();
            }
            info!(%game_id, "game started");
            maps.games.insert(game_id, ActiveGame {
                players: [opponent, player],
            });
        } else {
            let game_id = generate_game_id();
            let color = if rand::thread_rng().gen_bool(0.5) {
                Color::White
            } else {
                Color::Black
            };
            tx.send(ServerMessage::WaitingForOpponent {
                your_color: color,
                game_id: game_id.clone(),
            })
            .ok();
            info!(%game_id, color = color.to_human(), "player waiting");
            maps.waiting.insert(
                game_id,
                Player {
                    conn,
                    color,
                    tx: tx.clone(),
                },
            );
        }
    }

    /// Rebind a connection to its color slot in an already paired game.
    fn handle_register(
        &self,
        conn: ConnId,
        tx: &UnboundedSender<ServerMessage>,
        game_id: String,
        player_color: Color,
    ) {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());
        let Some(game) = maps.games.get_mut(&game_id) else {
            warn!(%game_id, "register for unknown game");
            return;
        };
        let Some(slot) = game.players.iter_mut().find(|p| p.color == player_color) else {
            return;
        };
        slot.conn = conn;
        slot.tx = tx.clone();
        info!(%game_id, color = player_color.to_human(), "player registered");
    }

    /// Forward a move to the sender's peer, flipping the turn into the
    /// receiver's hint. The payload itself is never inspected.
    fn handle_move(
        &self,
        conn: ConnId,
        game_id: String,
        mv: PlainMove,
        board: Board,
        game_state: StateFlags,
    ) {
        let maps = self.maps.read().unwrap_or_else(|e| e.into_inner());
        let Some(game) = maps.games.get(&game_id) else {
            warn!(%game_id, "move for unknown game");
            return;
        };
        let Some(peer) = game.peer_of(conn) else {
            return;
        };
        let turn = game_state.turn.other();
        peer.tx
            .send(ServerMessage::OpponentMove {
                mv,
                board,
                game_state,
                turn,
            })
            .ok();
    }

    /// Forward a full-state resync verbatim. The sync turn is already
    /// absolute (the side to move), so no flip here.
    fn handle_sync(
        &self,
        conn: ConnId,
        game_id: String,
        board: Board,
        turn: Color,
        game_state: Option<StateFlags>,
    ) {
        let maps = self.maps.read().unwrap_or_else(|e| e.into_inner());
        let Some(game) = maps.games.get(&game_id) else {
            warn!(%game_id, "sync for unknown game");
            return;
        };
        if let Some(peer) = game.peer_of(conn) {
            peer.tx
                .send(ServerMessage::BoardSync {
                    board,
                    turn,
                    game_state,
                })
                .ok();
        }
    }

    /// Notify the peer and discard the paired-game record.
    fn handle_game_over(&self, conn: ConnId, game_id: String, result: String) {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());
        if let Some(game) = maps.games.remove(&game_id) {
            if let Some(peer) = game.peer_of(conn) {
                peer.tx.send(ServerMessage::GameOver { result }).ok();
            }
            info!(%game_id, "game over, record discarded");
        }
    }

    /// Socket closed: drop any waiting entry, notify the peer of any active
    /// game and discard it.
    fn handle_disconnect(&self, conn: ConnId) {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());
        maps.waiting.retain(|_, p| p.conn != conn);

        let abandoned: Vec<String> = maps
            .games
            .iter()
            .filter(|(_, game)| game.players.iter().any(|p| p.conn == conn))
            .map(|(id, _)| id.clone())
            .collect();
        for game_id in abandoned {
            if let Some(game) = maps.games.remove(&game_id) {
                if let Some(peer) = game.peer_of(conn) {
                    peer.tx.send(ServerMessage::OpponentDisconnected).ok();
                }
                info!(%game_id, "game discarded after disconnect");
            }
        }
    }
}

impl Default for RelayState {
    fn default() -> Self {
        RelayState::new()
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per connection reading client messages, plus a writer task
/// draining the per-connection channel. FIFO per connection, no retry.
async fn handle_socket(socket: WebSocket, state: RelayState) {
    let conn = state.next_conn();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "unserializable relay message dropped");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    info!(conn, "connection opened");
    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => state.dispatch(conn, &tx, msg),
                Err(e) => warn!(conn, error = %e, "malformed message skipped"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.handle_disconnect(conn);
    info!(conn, "connection closed");
    writer.abort();
}

/// The relay's HTTP surface: the WebSocket endpoint plus a static directory
/// for the browser client, behind permissive CORS.
pub fn router(state: RelayState, web_dir: &str) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(web_dir))
        .layer(CorsLayer::new())
        .with_state(state)
}

pub async fn serve(port: u16, web_dir: &str) -> color_eyre::eyre::Result<()> {
    let state = RelayState::new();
    let app = router(state, web_dir);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
