//! WebSocket client side of the relay protocol.
//!
//! A `RelayClient` owns two background tasks: a writer draining typed
//! outgoing messages into the socket and a reader surfacing relay messages
//! as an event stream. The event channel closing means the connection is
//! gone; the session is abandoned, there is no retry or reconnect.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

use crate::board::Color;
use crate::game::{AppliedMove, Snapshot};
use crate::protocol::{ClientMessage, ServerMessage, StateFlags};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed")]
    ConnectionClosed,
}

pub struct RelayClient {
    outgoing: UnboundedSender<ClientMessage>,
    events: UnboundedReceiver<ServerMessage>,
}

impl RelayClient {
    /// Connect to a relay at `url` (e.g. `ws://localhost:8080/ws`).
    pub async fn connect(url: &str) -> Result<RelayClient, ClientError> {
        let (socket, _) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ClientMessage>();
        tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "unserializable client message dropped");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let (events_tx, events) = mpsc::unbounded_channel::<ServerMessage>();
        tokio::spawn(async move {
            // dropping events_tx on exit closes the event stream, which the
            // session layer reads as a lost connection
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            if events_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "malformed relay message skipped"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        Ok(RelayClient { outgoing, events })
    }

    /// Next relay message, or None once the connection is gone.
    pub async fn next_event(&mut self) -> Option<ServerMessage> {
        self.events.recv().await
    }

    pub fn join_game(&self) -> Result<(), ClientError> {
        self.send(ClientMessage::JoinGame)
    }

    pub fn register_player(&self, game_id: &str, color: Color) -> Result<(), ClientError> {
        self.send(ClientMessage::RegisterPlayer {
            game_id: game_id.to_string(),
            player_color: color,
        })
    }

    pub fn send_move(&self, game_id: &str, applied: &AppliedMove) -> Result<(), ClientError> {
        self.send(move_message(game_id, applied))
    }

    pub fn sync_board(&self, game_id: &str, snapshot: &Snapshot, turn: Color) -> Result<(), ClientError> {
        self.send(ClientMessage::SyncBoard {
            game_id: game_id.to_string(),
            board: snapshot.board.clone(),
            turn,
            game_state: Some(StateFlags::of(snapshot)),
        })
    }

    pub fn game_over(
        &self,
        game_id: &str,
        result: &str,
        initiated_by: Option<Color>,
    ) -> Result<(), ClientError> {
        self.send(ClientMessage::GameOver {
            game_id: game_id.to_string(),
            result: result.to_string(),
            initiated_by,
        })
    }

    fn send(&self, msg: ClientMessage) -> Result<(), ClientError> {
        self.outgoing
            .send(msg)
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

/// The wire form of a locally applied move.
fn move_message(game_id: &str, applied: &AppliedMove) -> ClientMessage {
    ClientMessage::Move {
        game_id: game_id.to_string(),
        mv: applied.mv,
        board: applied.snapshot.board.clone(),
        game_state: StateFlags::of(&applied.snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coord;
    use crate::game::{Action, GameState};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_move_message_carries_the_mover_snapshot() {
        let mut game = GameState::new();
        assert!(game.select(Coord::from_algebraic("e2")));
        let Action::Applied(applied) = game.choose_destination(Coord::from_algebraic("e4")) else {
            panic!("move not applied");
        };

        let ClientMessage::Move {
            game_id,
            mv,
            board,
            game_state,
        } = move_message("abcd", &applied)
        else {
            panic!("wrong message type");
        };
        assert_eq!(game_id, "abcd");
        assert_eq!(mv, applied.mv);
        assert_eq!(board, game.board);
        // the wire turn is the mover's color, pre-flip
        assert_eq!(game_state.turn, Color::White);
        assert_eq!(
            game_state.last_double_step,
            Some(Coord::from_algebraic("e4"))
        );
    }
}
