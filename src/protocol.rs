//! Relay wire protocol.
//!
//! Every message is a JSON object whose `type` field discriminates the
//! payload. The relay reads only `type`, `gameId` and the `turn` inside
//! `gameState`; everything else is forwarded opaquely to the peer.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Coord, PlainMove};
use crate::game::Snapshot;
use crate::special::CastlingFlags;

/// The non-board half of a snapshot as it travels on the wire, under the
/// `gameState` key. `turn` here is the mover's color; the relay flips it
/// into the receiver's hint.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFlags {
    pub turn: Color,
    pub castling: CastlingFlags,
    pub last_double_step: Option<Coord>,
}

impl StateFlags {
    pub fn of(snapshot: &Snapshot) -> StateFlags {
        StateFlags {
            turn: snapshot.turn,
            castling: snapshot.castling,
            last_double_step: snapshot.last_double_step,
        }
    }

    /// Reassemble the wholesale-overwrite snapshot around the wire board.
    pub fn into_snapshot(self, board: Board) -> Snapshot {
        Snapshot {
            board,
            turn: self.turn,
            castling: self.castling,
            last_double_step: self.last_double_step,
        }
    }
}

/// Messages a client sends to the relay.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Pair with a waiting peer, or become the waiting peer.
    JoinGame,
    /// Bind this connection to an already paired game.
    #[serde(rename_all = "camelCase")]
    RegisterPlayer { game_id: String, player_color: Color },
    /// A locally applied move, forwarded to the opponent.
    #[serde(rename_all = "camelCase")]
    Move {
        game_id: String,
        #[serde(rename = "move")]
        mv: PlainMove,
        board: Board,
        game_state: StateFlags,
    },
    /// Manual full-state resync.
    #[serde(rename_all = "camelCase")]
    SyncBoard {
        game_id: String,
        board: Board,
        turn: Color,
        game_state: Option<StateFlags>,
    },
    /// The game ended; the relay notifies the peer and discards the record.
    #[serde(rename_all = "camelCase")]
    GameOver {
        game_id: String,
        result: String,
        initiated_by: Option<Color>,
    },
}

/// Messages the relay sends to a client.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    WaitingForOpponent { your_color: Color, game_id: String },
    #[serde(rename_all = "camelCase")]
    GameStarted {
        your_color: Color,
        opponent_color: Color,
        game_id: String,
    },
    /// A forwarded peer move. `turn` is the relay's hint: the side now to
    /// move, i.e. the receiver.
    #[serde(rename_all = "camelCase")]
    OpponentMove {
        #[serde(rename = "move")]
        mv: PlainMove,
        board: Board,
        game_state: StateFlags,
        turn: Color,
    },
    #[serde(rename_all = "camelCase")]
    BoardSync {
        board: Board,
        turn: Color,
        game_state: Option<StateFlags>,
    },
    GameOver { result: String },
    OpponentDisconnected,
}
