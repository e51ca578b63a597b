//! Pseudo-legal move generation.
//!
//! `pseudo_destinations` is a pure function of (piece, origin, board): it
//! never looks at whose turn it is and never asks whether the mover's own
//! king ends up attacked, so the check oracle can run it for either color.
//! En-passant and castling are not produced here, they belong to the
//! special-move resolver.

use crate::board::{Board, Coord, Piece, PieceKind};

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];
const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// What a ray finds at a candidate square.
enum RayStep {
    /// Empty square: a destination, keep walking.
    Open,
    /// Enemy piece: a capture destination, stop here.
    Capture,
    /// Friendly piece: not a destination, stop before it.
    Blocked,
}

impl RayStep {
    fn at(piece: Piece, candidate: Coord, board: &Board) -> RayStep {
        match board.get(candidate) {
            None => RayStep::Open,
            Some(other) if other.color == piece.color => RayStep::Blocked,
            Some(_) => RayStep::Capture,
        }
    }
}

/// All destinations `piece` standing on `origin` could move to, ignoring
/// whether the move would leave its own king in check.
pub fn pseudo_destinations(piece: Piece, origin: Coord, board: &Board) -> Vec<Coord> {
    match piece.kind {
        PieceKind::Pawn => pawn_destinations(piece, origin, board),
        PieceKind::Knight => offset_destinations(piece, origin, board, &KNIGHT_OFFSETS),
        PieceKind::Bishop => ray_destinations(piece, origin, board, &BISHOP_DIRECTIONS),
        PieceKind::Rook => ray_destinations(piece, origin, board, &ROOK_DIRECTIONS),
        PieceKind::Queen => {
            let mut destinations = ray_destinations(piece, origin, board, &ROOK_DIRECTIONS);
            destinations.extend(ray_destinations(piece, origin, board, &BISHOP_DIRECTIONS));
            destinations
        }
        PieceKind::King => offset_destinations(piece, origin, board, &KING_OFFSETS),
    }
}

/// Pawn pushes and diagonal captures. The double step is only offered from
/// the pawn's starting row, and only when both squares ahead are empty.
fn pawn_destinations(piece: Piece, origin: Coord, board: &Board) -> Vec<Coord> {
    let mut destinations = vec![];
    let forward = piece.color.forward();

    if let Some(one_step) = origin.offset(forward, 0) {
        if board.get(one_step).is_none() {
            destinations.push(one_step);

            if origin.row == piece.color.pawn_row() {
                if let Some(two_step) = origin.offset(2 * forward, 0) {
                    if board.get(two_step).is_none() {
                        destinations.push(two_step);
                    }
                }
            }
        }
    }

    for col_delta in [-1, 1] {
        if let Some(diagonal) = origin.offset(forward, col_delta) {
            if board.get(diagonal).is_some_and(|p| p.color != piece.color) {
                destinations.push(diagonal);
            }
        }
    }
    destinations
}

/// Single-step destinations for knight and king offsets, excluding squares
/// held by a friendly piece.
fn offset_destinations(
    piece: Piece,
    origin: Coord,
    board: &Board,
    offsets: &[(i8, i8)],
) -> Vec<Coord> {
    offsets
        .iter()
        .filter_map(|&(row_delta, col_delta)| origin.offset(row_delta, col_delta))
        .filter(|&candidate| {
            board
                .get(candidate)
                .map(|other| other.color != piece.color)
                .unwrap_or(true)
        })
        .collect()
}

/// Walk each direction until the board edge or the first occupied square.
/// The occupied square is included iff it holds an enemy piece.
fn ray_destinations(
    piece: Piece,
    origin: Coord,
    board: &Board,
    directions: &[(i8, i8)],
) -> Vec<Coord> {
    let mut destinations = vec![];
    for &(row_delta, col_delta) in directions {
        let mut current = origin;
        while let Some(candidate) = current.offset(row_delta, col_delta) {
            match RayStep::at(piece, candidate, board) {
                RayStep::Open => {
                    destinations.push(candidate);
                    current = candidate;
                }
                RayStep::Capture => {
                    destinations.push(candidate);
                    break;
                }
                RayStep::Blocked => break,
            }
        }
    }
    destinations
}
