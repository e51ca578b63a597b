//! The special-move resolver: en-passant, castling and promotion.
//!
//! These three sit outside the plain generator/filter pipeline. En-passant
//! needs the previous move, castling needs the moved flags and its own
//! attack conditions, and promotion suspends the move until a piece kind is
//! chosen.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Coord, Piece, PieceKind};
use crate::rules::{is_in_check, simulate};

/// Kinds a pawn may promote to. Pawn is permitted, reproducing the behavior
/// this engine is paired against.
pub const PROMOTION_CHOICES: [PieceKind; 5] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Pawn,
];

/// Which rook a castle uses. Queenside is the a-file corner (column 0),
/// kingside the h-file corner (column 7).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Wing {
    Queenside,
    Kingside,
}

impl Wing {
    pub fn rook_home_col(&self) -> u8 {
        match self {
            Wing::Queenside => 0,
            Wing::Kingside => 7,
        }
    }

    pub fn king_destination_col(&self) -> u8 {
        match self {
            Wing::Queenside => 2,
            Wing::Kingside => 6,
        }
    }

    pub fn rook_destination_col(&self) -> u8 {
        match self {
            Wing::Queenside => 3,
            Wing::Kingside => 5,
        }
    }

    /// The square the king passes through, one step toward the rook.
    fn transit_col(&self) -> u8 {
        match self {
            Wing::Queenside => 3,
            Wing::Kingside => 5,
        }
    }
}

/// King- and rook-moved flags. Each flag is monotonic: once true it never
/// resets, so castling rights only ever shrink. Transitions return a new
/// value instead of patching fields in place.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastlingFlags {
    pub white_king_moved: bool,
    pub black_king_moved: bool,
    pub white_queenside_rook_moved: bool,
    pub white_kingside_rook_moved: bool,
    pub black_queenside_rook_moved: bool,
    pub black_kingside_rook_moved: bool,
}

impl CastlingFlags {
    pub fn king_moved(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_king_moved,
            Color::Black => self.black_king_moved,
        }
    }

    pub fn rook_moved(&self, color: Color, wing: Wing) -> bool {
        match (color, wing) {
            (Color::White, Wing::Queenside) => self.white_queenside_rook_moved,
            (Color::White, Wing::Kingside) => self.white_kingside_rook_moved,
            (Color::Black, Wing::Queenside) => self.black_queenside_rook_moved,
            (Color::Black, Wing::Kingside) => self.black_kingside_rook_moved,
        }
    }

    pub fn after_king_move(self, color: Color) -> CastlingFlags {
        match color {
            Color::White => CastlingFlags {
                white_king_moved: true,
                ..self
            },
            Color::Black => CastlingFlags {
                black_king_moved: true,
                ..self
            },
        }
    }

    pub fn after_rook_move(self, color: Color, wing: Wing) -> CastlingFlags {
        match (color, wing) {
            (Color::White, Wing::Queenside) => CastlingFlags {
                white_queenside_rook_moved: true,
                ..self
            },
            (Color::White, Wing::Kingside) => CastlingFlags {
                white_kingside_rook_moved: true,
                ..self
            },
            (Color::Black, Wing::Queenside) => CastlingFlags {
                black_queenside_rook_moved: true,
                ..self
            },
            (Color::Black, Wing::Kingside) => CastlingFlags {
                black_kingside_rook_moved: true,
                ..self
            },
        }
    }

    /// Castling consumes both the king flag and the used rook's flag in one
    /// transition.
    pub fn after_castle(self, color: Color, wing: Wing) -> CastlingFlags {
        self.after_king_move(color).after_rook_move(color, wing)
    }
}

/// Squares a pawn on `origin` may capture en-passant onto. Eligible iff the
/// opposing pawn's most recent move was a double-step landing right next to
/// `origin` on the same row; the destination is the square it vacated
/// through.
pub fn en_passant_destinations(
    piece: Piece,
    origin: Coord,
    last_double_step: Option<Coord>,
) -> Vec<Coord> {
    if piece.kind != PieceKind::Pawn {
        return vec![];
    }
    let Some(victim) = last_double_step else {
        return vec![];
    };
    if victim.row != origin.row {
        return vec![];
    }
    let mut destinations = vec![];
    for col_delta in [-1i8, 1] {
        if origin.offset(0, col_delta) == Some(victim) {
            if let Some(to) = origin.offset(piece.color.forward(), col_delta) {
                destinations.push(to);
            }
        }
    }
    destinations
}

/// Does moving a pawn of `color` onto `to` trigger promotion?
pub fn is_promotion(piece: Piece, to: Coord) -> bool {
    piece.kind == PieceKind::Pawn && to.row == piece.color.promotion_row()
}

/// May `color` castle on `wing` right now?
///
/// All conditions from the rulebook subset this engine implements: king and
/// rook on their original squares with both flags clear, the squares
/// strictly between them empty, the king not currently in check, and the
/// king's transit square not attacked.
pub fn can_castle(board: &Board, color: Color, wing: Wing, flags: &CastlingFlags) -> bool {
    let row = color.home_row();
    let king_from = Coord::new(row, 4);
    let rook_from = Coord::new(row, wing.rook_home_col());

    if board.get(king_from) != Some(Piece::new(color, PieceKind::King)) {
        return false;
    }
    if board.get(rook_from) != Some(Piece::new(color, PieceKind::Rook)) {
        return false;
    }
    if flags.king_moved(color) || flags.rook_moved(color, wing) {
        return false;
    }

    let (low, high) = if wing.rook_home_col() < 4 {
        (wing.rook_home_col() + 1, 4)
    } else {
        (5, wing.rook_home_col())
    };
    for col in low..high {
        if board.get(Coord::new(row, col)).is_some() {
            return false;
        }
    }

    if is_in_check(board, color) {
        return false;
    }
    let transit = Coord::new(row, wing.transit_col());
    if is_in_check(&simulate(board, king_from, transit), color) {
        return false;
    }
    true
}

/// Move king and rook to their castled squares in one atomic board update.
/// Callers must have verified `can_castle`.
pub fn execute_castle(board: &Board, color: Color, wing: Wing) -> Board {
    let row = color.home_row();
    let mut next = board.clone();
    next.set(Coord::new(row, 4), None);
    next.set(Coord::new(row, wing.rook_home_col()), None);
    next.set(
        Coord::new(row, wing.king_destination_col()),
        Some(Piece::new(color, PieceKind::King)),
    );
    next.set(
        Coord::new(row, wing.rook_destination_col()),
        Some(Piece::new(color, PieceKind::Rook)),
    );
    next
}

/// Where the captured pawn actually stands for an en-passant landing square:
/// one row behind the destination, from the mover's point of view.
pub fn en_passant_victim(to: Coord, mover: Color) -> Coord {
    Coord::new((to.row as i8 - mover.forward()) as u8, to.col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn white_pawn() -> Piece {
        Piece::new(Color::White, PieceKind::Pawn)
    }

    #[test]
    fn test_en_passant_requires_adjacent_double_step() {
        // white pawn on d5, black pawn just double-stepped e7 -> e5
        let origin = Coord::from_algebraic("d5");
        let victim = Coord::from_algebraic("e5");
        assert_eq!(
            en_passant_destinations(white_pawn(), origin, Some(victim)),
            vec![Coord::from_algebraic("e6")]
        );
        // no double step recorded: nothing
        assert_eq!(en_passant_destinations(white_pawn(), origin, None), vec![]);
        // double step on a different row: nothing
        assert_eq!(
            en_passant_destinations(white_pawn(), origin, Some(Coord::from_algebraic("e4"))),
            vec![]
        );
        // double step two files away: nothing
        assert_eq!(
            en_passant_destinations(white_pawn(), origin, Some(Coord::from_algebraic("f5"))),
            vec![]
        );
    }

    #[test]
    fn test_en_passant_is_pawn_only() {
        let origin = Coord::from_algebraic("d5");
        let victim = Coord::from_algebraic("e5");
        let rook = Piece::new(Color::White, PieceKind::Rook);
        assert_eq!(en_passant_destinations(rook, origin, Some(victim)), vec![]);
    }

    #[test]
    fn test_en_passant_victim_square() {
        assert_eq!(
            en_passant_victim(Coord::from_algebraic("e6"), Color::White),
            Coord::from_algebraic("e5")
        );
        assert_eq!(
            en_passant_victim(Coord::from_algebraic("d3"), Color::Black),
            Coord::from_algebraic("d4")
        );
    }

    #[test]
    fn test_promotion_trigger() {
        assert!(is_promotion(white_pawn(), Coord::from_algebraic("e8")));
        assert!(!is_promotion(white_pawn(), Coord::from_algebraic("e7")));
        let black_pawn = Piece::new(Color::Black, PieceKind::Pawn);
        assert!(is_promotion(black_pawn, Coord::from_algebraic("a1")));
        let queen = Piece::new(Color::White, PieceKind::Queen);
        assert!(!is_promotion(queen, Coord::from_algebraic("e8")));
    }

    #[test]
    fn test_promotion_choices_include_pawn() {
        assert!(PROMOTION_CHOICES.contains(&PieceKind::Pawn));
        assert!(!PROMOTION_CHOICES.contains(&PieceKind::King));
    }

    #[test]
    fn test_kingside_castle_allowed_on_clear_board() {
        // . . . . ♚ . . .
        // ...
        // ♖ . . . ♔ . . ♖
        let board = Board::from_placement("4k3/8/8/8/8/8/8/R3K2R");
        let flags = CastlingFlags::default();
        assert!(can_castle(&board, Color::White, Wing::Kingside, &flags));
        assert!(can_castle(&board, Color::White, Wing::Queenside, &flags));
    }

    #[test]
    fn test_castle_refused_when_king_has_moved() {
        let board = Board::from_placement("4k3/8/8/8/8/8/8/R3K2R");
        let flags = CastlingFlags::default().after_king_move(Color::White);
        assert!(!can_castle(&board, Color::White, Wing::Kingside, &flags));
        assert!(!can_castle(&board, Color::White, Wing::Queenside, &flags));
    }

    #[test]
    fn test_castle_refused_when_that_rook_has_moved() {
        let board = Board::from_placement("4k3/8/8/8/8/8/8/R3K2R");
        let flags = CastlingFlags::default().after_rook_move(Color::White, Wing::Kingside);
        assert!(!can_castle(&board, Color::White, Wing::Kingside, &flags));
        // the other wing is untouched
        assert!(can_castle(&board, Color::White, Wing::Queenside, &flags));
    }

    #[test]
    fn test_castle_refused_when_path_is_occupied() {
        // bishop still on f1
        let board = Board::from_placement("4k3/8/8/8/8/8/8/R3KB1R");
        let flags = CastlingFlags::default();
        assert!(!can_castle(&board, Color::White, Wing::Kingside, &flags));
        // knight still on b1 blocks the queenside path
        let board = Board::from_placement("4k3/8/8/8/8/8/8/RN2K2R");
        assert!(!can_castle(&board, Color::White, Wing::Queenside, &flags));
    }

    #[test]
    fn test_castle_refused_while_in_check() {
        // black rook on e8 checks the king on e1
        let board = Board::from_placement("4r3/8/8/8/8/8/8/R3K2R");
        let flags = CastlingFlags::default();
        assert!(!can_castle(&board, Color::White, Wing::Kingside, &flags));
        assert!(!can_castle(&board, Color::White, Wing::Queenside, &flags));
    }

    #[test]
    fn test_castle_refused_through_attacked_transit_square() {
        // black rook on f8 attacks f1, the kingside transit square
        let board = Board::from_placement("5r2/8/8/8/8/8/8/R3K2R");
        let flags = CastlingFlags::default();
        assert!(!can_castle(&board, Color::White, Wing::Kingside, &flags));
        // the queenside transit square d1 is untouched by that rook
        assert!(can_castle(&board, Color::White, Wing::Queenside, &flags));
    }

    #[test]
    fn test_execute_kingside_castle() {
        let board = Board::from_placement("4k3/8/8/8/8/8/8/R3K2R");
        let next = execute_castle(&board, Color::White, Wing::Kingside);
        assert_eq!(
            next.get(Coord::from_algebraic("g1")),
            Some(Piece::new(Color::White, PieceKind::King))
        );
        assert_eq!(
            next.get(Coord::from_algebraic("f1")),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
        assert_eq!(next.get(Coord::from_algebraic("e1")), None);
        assert_eq!(next.get(Coord::from_algebraic("h1")), None);
        // the queenside rook is untouched
        assert_eq!(
            next.get(Coord::from_algebraic("a1")),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
    }

    #[test]
    fn test_execute_queenside_castle_black() {
        let board = Board::from_placement("r3k2r/8/8/8/8/8/8/4K3");
        let next = execute_castle(&board, Color::Black, Wing::Queenside);
        assert_eq!(
            next.get(Coord::from_algebraic("c8")),
            Some(Piece::new(Color::Black, PieceKind::King))
        );
        assert_eq!(
            next.get(Coord::from_algebraic("d8")),
            Some(Piece::new(Color::Black, PieceKind::Rook))
        );
        assert_eq!(next.get(Coord::from_algebraic("a8")), None);
        assert_eq!(next.get(Coord::from_algebraic("e8")), None);
    }

    #[test]
    fn test_flag_transitions_are_monotonic() {
        let flags = CastlingFlags::default()
            .after_rook_move(Color::Black, Wing::Queenside)
            .after_rook_move(Color::Black, Wing::Queenside);
        assert!(flags.rook_moved(Color::Black, Wing::Queenside));
        assert!(!flags.rook_moved(Color::Black, Wing::Kingside));
        assert!(!flags.king_moved(Color::Black));

        let after = flags.after_castle(Color::White, Wing::Kingside);
        assert!(after.king_moved(Color::White));
        assert!(after.rook_moved(Color::White, Wing::Kingside));
        // earlier flags survive the replacement
        assert!(after.rook_moved(Color::Black, Wing::Queenside));
    }
}
