//! The game state machine: one instance per client session.
//!
//! All mutation of the live board goes through here. The flow per turn is
//! select a piece, pick one of its legal destinations, then the machine
//! applies the move, recomputes check and terminal status for the opponent
//! and hands back a snapshot for the wire. Illegal interactions are silent
//! no-ops.
//!
//! The machine enforces turn order but not which side the local player is;
//! that lives in the session layer, so a single instance can be driven from
//! both sides in tests.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Coord, Piece, PieceKind, PlainMove};
use crate::rules::{all_legal_moves, is_in_check, legal_destinations, simulate, simulate_en_passant};
use crate::special::{
    can_castle, en_passant_destinations, en_passant_victim, execute_castle, is_promotion,
    CastlingFlags, Wing, PROMOTION_CHOICES,
};

/// How a finished game ended.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Terminal {
    None,
    Checkmate(Color),
    Stalemate,
}

/// Status of the side to move right after a move was applied.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
    Continue,
    Check,
    Checkmate(Color),
    Stalemate,
}

/// Where the machine is within the current turn.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Phase {
    AwaitingSelection,
    PieceSelected {
        origin: Coord,
        plain: Vec<Coord>,
        en_passant: Vec<Coord>,
        castles: Vec<(Wing, Coord)>,
    },
    /// A pawn reached the far rank; the move is suspended until a kind is
    /// chosen. No other mutation is accepted while pending.
    AwaitingPromotionChoice { from: Coord, to: Coord },
}

/// Everything the peer needs to overwrite its copy wholesale. `turn` is the
/// color that made the move; the relay flips it into a hint for the receiver.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub board: Board,
    pub turn: Color,
    pub castling: CastlingFlags,
    pub last_double_step: Option<Coord>,
}

/// A locally applied move, ready for transmission.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AppliedMove {
    pub mv: PlainMove,
    pub snapshot: Snapshot,
    pub outcome: Outcome,
}

/// Result of feeding an input event to the machine.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Action {
    /// Illegal interaction, nothing changed.
    Ignored,
    /// The move is held until `choose_promotion`.
    PromotionPending,
    Applied(AppliedMove),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
    pub castling: CastlingFlags,
    pub last_double_step: Option<Coord>,
    pub in_check: bool,
    pub terminal: Terminal,
    phase: Phase,
}

impl GameState {
    /// Fresh game: standard position, White to move, all flags clear.
    pub fn new() -> GameState {
        GameState {
            board: Board::new(),
            turn: Color::White,
            castling: CastlingFlags::default(),
            last_double_step: None,
            in_check: false,
            terminal: Terminal::None,
            phase: Phase::AwaitingSelection,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Select the piece on `origin` for the side to move. Computes its legal
    /// destinations, en-passant captures and (for the king) available
    /// castles. Ignored if the game is over, a promotion choice is pending,
    /// the square is empty, or the piece is out of turn. Re-selecting while
    /// already selected replaces the selection.
    pub fn select(&mut self, origin: Coord) -> bool {
        if self.terminal != Terminal::None {
            return false;
        }
        if matches!(self.phase, Phase::AwaitingPromotionChoice { .. }) {
            return false;
        }
        let Some(piece) = self.board.get(origin) else {
            return false;
        };
        if piece.color != self.turn {
            return false;
        }

        let plain = legal_destinations(&self.board, origin);
        let en_passant = self.en_passant_options(piece, origin);
        let castles = self.castle_options(piece, origin);
        if plain.is_empty() && en_passant.is_empty() && castles.is_empty() {
            self.phase = Phase::AwaitingSelection;
            return false;
        }
        self.phase = Phase::PieceSelected {
            origin,
            plain,
            en_passant,
            castles,
        };
        true
    }

    fn en_passant_options(&self, piece: Piece, origin: Coord) -> Vec<Coord> {
        en_passant_destinations(piece, origin, self.last_double_step)
            .into_iter()
            .filter(|&to| {
                let victim = en_passant_victim(to, piece.color);
                !is_in_check(
                    &simulate_en_passant(&self.board, origin, to, victim),
                    piece.color,
                )
            })
            .collect()
    }

    fn castle_options(&self, piece: Piece, origin: Coord) -> Vec<(Wing, Coord)> {
        if piece.kind != PieceKind::King || origin != Coord::new(piece.color.home_row(), 4) {
            return vec![];
        }
        [Wing::Queenside, Wing::Kingside]
            .into_iter()
            .filter(|&wing| can_castle(&self.board, piece.color, wing, &self.castling))
            .map(|wing| {
                (
                    wing,
                    Coord::new(piece.color.home_row(), wing.king_destination_col()),
                )
            })
            .collect()
    }

    /// Move the selected piece to `to`. Castling and en-passant resolve
    /// through their own paths; a pawn reaching the far rank suspends into
    /// `AwaitingPromotionChoice`. A destination outside the selection's
    /// legal sets is ignored and the selection stays.
    pub fn choose_destination(&mut self, to: Coord) -> Action {
        let Phase::PieceSelected {
            origin,
            ref plain,
            ref en_passant,
            ref castles,
        } = self.phase
        else {
            return Action::Ignored;
        };
        let piece = self
            .board
            .get(origin)
            .expect("selected square became empty");

        if let Some(&(wing, _)) = castles.iter().find(|(_, dest)| *dest == to) {
            self.board = execute_castle(&self.board, piece.color, wing);
            self.castling = self.castling.after_castle(piece.color, wing);
            self.last_double_step = None;
            return Action::Applied(self.finish_move(PlainMove::new(origin, to)));
        }

        if en_passant.contains(&to) {
            let victim = en_passant_victim(to, piece.color);
            self.board = simulate_en_passant(&self.board, origin, to, victim);
            self.last_double_step = None;
            return Action::Applied(self.finish_move(PlainMove::new(origin, to)));
        }

        if !plain.contains(&to) {
            return Action::Ignored;
        }

        if is_promotion(piece, to) {
            self.phase = Phase::AwaitingPromotionChoice { from: origin, to };
            return Action::PromotionPending;
        }

        self.castling = self.flags_after_plain_move(piece, origin);
        self.last_double_step =
            if piece.kind == PieceKind::Pawn && to.row.abs_diff(origin.row) == 2 {
                Some(to)
            } else {
                None
            };
        self.board = simulate(&self.board, origin, to);
        Action::Applied(self.finish_move(PlainMove::new(origin, to)))
    }

    /// Flags consumed by moving the directly selected piece. Only a king
    /// move or a rook move off its original corner square counts; nothing
    /// else ever touches the flags.
    fn flags_after_plain_move(&self, piece: Piece, origin: Coord) -> CastlingFlags {
        match piece.kind {
            PieceKind::King => self.castling.after_king_move(piece.color),
            PieceKind::Rook => {
                let home_row = piece.color.home_row();
                for wing in [Wing::Queenside, Wing::Kingside] {
                    if origin == Coord::new(home_row, wing.rook_home_col()) {
                        return self.castling.after_rook_move(piece.color, wing);
                    }
                }
                self.castling
            }
            _ => self.castling,
        }
    }

    /// Resolve a pending promotion by placing a piece of `kind` on the held
    /// destination. Ignored when no promotion is pending or the kind is not
    /// an allowed choice.
    pub fn choose_promotion(&mut self, kind: PieceKind) -> Action {
        let Phase::AwaitingPromotionChoice { from, to } = self.phase else {
            return Action::Ignored;
        };
        if !PROMOTION_CHOICES.contains(&kind) {
            return Action::Ignored;
        }
        self.board.set(from, None);
        self.board.set(to, Some(Piece::new(self.turn, kind)));
        self.last_double_step = None;
        Action::Applied(self.finish_move(PlainMove::new(from, to)))
    }

    /// Board is already mutated and flags already replaced. Build the wire
    /// snapshot (stamped with the mover's color), flip the turn, and declare
    /// check / checkmate / stalemate for the side now to move.
    fn finish_move(&mut self, mv: PlainMove) -> AppliedMove {
        let mover = self.turn;
        let snapshot = Snapshot {
            board: self.board.clone(),
            turn: mover,
            castling: self.castling,
            last_double_step: self.last_double_step,
        };

        let opponent = mover.other();
        self.turn = opponent;
        self.phase = Phase::AwaitingSelection;
        self.in_check = is_in_check(&self.board, opponent);
        let outcome = if all_legal_moves(&self.board, opponent, self.last_double_step).is_empty() {
            if self.in_check {
                self.terminal = Terminal::Checkmate(mover);
                Outcome::Checkmate(mover)
            } else {
                self.terminal = Terminal::Stalemate;
                Outcome::Stalemate
            }
        } else if self.in_check {
            Outcome::Check
        } else {
            Outcome::Continue
        };
        AppliedMove {
            mv,
            snapshot,
            outcome,
        }
    }

    /// Overwrite board and flags wholesale from the peer's snapshot, with no
    /// re-validation. `turn_hint` is the relay's flipped turn, i.e. the side
    /// now to move locally.
    pub fn apply_remote(&mut self, snapshot: Snapshot, turn_hint: Color) {
        self.board = snapshot.board;
        self.castling = snapshot.castling;
        self.last_double_step = snapshot.last_double_step;
        self.turn = turn_hint;
        self.phase = Phase::AwaitingSelection;
        self.in_check = is_in_check(&self.board, self.turn);
        if all_legal_moves(&self.board, self.turn, self.last_double_step).is_empty() {
            self.terminal = if self.in_check {
                Terminal::Checkmate(self.turn.other())
            } else {
                Terminal::Stalemate
            };
        }
    }

    /// Full-state resync: replace the board and turn, keep going.
    pub fn apply_sync(&mut self, board: Board, turn: Color) {
        self.board = board;
        self.turn = turn;
        self.phase = Phase::AwaitingSelection;
        self.in_check = is_in_check(&self.board, self.turn);
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}
