//! Check detection and the legality filter.
//!
//! Every hypothetical goes through `simulate`: copy the board, apply the
//! move, ask the check oracle. The live board is never mutated while
//! deciding legality, which is what keeps the two peers' engines in
//! lock-step — both run the identical pure functions over the same inputs.

use crate::board::{Board, Color, Coord, PieceKind, PlainMove};
use crate::movegen::pseudo_destinations;
use crate::special;

/// Where `color`'s king stands. A missing king means the game state was
/// mutated outside the state machine; that is a programming error, not a
/// runtime condition.
pub fn king_coord(board: &Board, color: Color) -> Coord {
    match board.king_of(color) {
        Some(coord) => coord,
        None => panic!("King not found for {}", color.to_human()),
    }
}

/// Is `color`'s king attacked by any enemy piece? Short-circuits on the
/// first attacker.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    let king = king_coord(board, color);
    board
        .pieces_of(color.other())
        .any(|(origin, piece)| pseudo_destinations(piece, origin, board).contains(&king))
}

/// Apply `from -> to` on a scratch copy: origin emptied, destination
/// overwritten with the moved piece (capturing whatever stood there).
pub fn simulate(board: &Board, from: Coord, to: Coord) -> Board {
    let mut next = board.clone();
    next.set(to, board.get(from));
    next.set(from, None);
    next
}

/// `simulate`, additionally clearing the en-passant victim's actual square.
pub fn simulate_en_passant(board: &Board, from: Coord, to: Coord, victim: Coord) -> Board {
    let mut next = simulate(board, from, to);
    next.set(victim, None);
    next
}

/// Destinations for the piece on `origin` that do not leave its own king in
/// check. Empty if the square is empty. Does not include en-passant or
/// castling; those are contributed by the special-move resolver.
pub fn legal_destinations(board: &Board, origin: Coord) -> Vec<Coord> {
    let Some(piece) = board.get(origin) else {
        return vec![];
    };
    pseudo_destinations(piece, origin, board)
        .into_iter()
        .filter(|&to| !is_in_check(&simulate(board, origin, to), piece.color))
        .collect()
}

/// Every legal `(origin, destination)` pair for `color`, en-passant
/// included. An empty result means the side to move is mated or stalemated.
///
/// Castling is deliberately absent: whenever castling is legal the king's
/// plain one-step toward the rook is legal too (the transit square is empty
/// and unattacked), so castling can never be the sole legal move.
pub fn all_legal_moves(
    board: &Board,
    color: Color,
    last_double_step: Option<Coord>,
) -> Vec<PlainMove> {
    let mut moves = vec![];
    for (origin, piece) in board.pieces_of(color) {
        for to in legal_destinations(board, origin) {
            moves.push(PlainMove::new(origin, to));
        }
        if piece.kind == PieceKind::Pawn {
            for to in special::en_passant_destinations(piece, origin, last_double_step) {
                let victim = last_double_step.expect("en-passant without a double step");
                if !is_in_check(&simulate_en_passant(board, origin, to, victim), color) {
                    moves.push(PlainMove::new(origin, to));
                }
            }
        }
    }
    moves
}
