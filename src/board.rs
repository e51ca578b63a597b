use serde::{Deserialize, Serialize};

/// Piece placement of the standard starting position, black's back rank first.
pub const STARTING_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    fn from_case(c: char) -> Color {
        if c.is_uppercase() {
            Color::White
        } else if c.is_lowercase() {
            Color::Black
        } else {
            panic!("Color char must be either upper or lowercase.")
        }
    }

    pub fn other(&self) -> Color {
        if *self == Color::White {
            Color::Black
        } else {
            Color::White
        }
    }

    /// Row of this side's back rank (king and rooks at game start).
    pub fn home_row(&self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Row this side's pawns start on.
    pub fn pawn_row(&self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// Row on which this side's pawns promote.
    pub fn promotion_row(&self) -> u8 {
        self.other().home_row()
    }

    /// Row delta of a single pawn step for this side.
    pub fn forward(&self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn to_human(&self) -> &str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    fn from_char(c: char) -> PieceKind {
        match c.to_lowercase().next().unwrap() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            other => panic!("Unrecognized piece kind {other}."),
        }
    }

    pub fn to_human(&self) -> &str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: Color, kind: PieceKind) -> Piece {
        Piece { color, kind }
    }

    fn from_placement_char(c: char) -> Piece {
        Piece {
            color: Color::from_case(c),
            kind: PieceKind::from_char(c),
        }
    }

    pub fn to_symbol(&self) -> &str {
        let is_white = self.color == Color::White;
        match self.kind {
            PieceKind::Pawn => {
                if is_white {
                    "♙"
                } else {
                    "♟︎"
                }
            }
            PieceKind::Knight => {
                if is_white {
                    "♘"
                } else {
                    "♞"
                }
            }
            PieceKind::Bishop => {
                if is_white {
                    "♗"
                } else {
                    "♝"
                }
            }
            PieceKind::Rook => {
                if is_white {
                    "♖"
                } else {
                    "♜"
                }
            }
            PieceKind::Queen => {
                if is_white {
                    "♕"
                } else {
                    "♛"
                }
            }
            PieceKind::King => {
                if is_white {
                    "♔"
                } else {
                    "♚"
                }
            }
        }
    }
}

/// A board cell: empty or occupied.
pub type Square = Option<Piece>;

/// Board coordinate. Row 0 is white's home rank, column 0 is the a-file.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub fn new(row: u8, col: u8) -> Coord {
        assert!(row < 8 && col < 8, "Coordinate off the board: {row},{col}");
        Coord { row, col }
    }

    pub fn from_algebraic(s: &str) -> Coord {
        if s.len() != 2 {
            panic!("Algebraic notation must be of length 2.")
        }

        let mut char_iter = s.chars();
        let file_char = char_iter.next().unwrap();
        let rank_char = char_iter.next().unwrap();

        let col = file_char as u8 - b'a';
        let row = rank_char as u8 - b'1';
        Coord::new(row, col)
    }

    pub fn to_algebraic(&self) -> String {
        format!("{}{}", (self.col + b'a') as char, (self.row + b'1') as char)
    }

    /// Coordinate offset by `(row_delta, col_delta)`, or None if that falls
    /// off the board.
    pub fn offset(&self, row_delta: i8, col_delta: i8) -> Option<Coord> {
        let row = self.row as i8 + row_delta;
        let col = self.col as i8 + col_delta;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Coord {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }
}

/// A move as it travels between the two clients: just the endpoints. Whether
/// it was ordinary, a special pawn move or a castle is re-derived by each
/// engine from its own state.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct PlainMove {
    pub from: Coord,
    pub to: Coord,
}

impl PlainMove {
    pub fn new(from: Coord, to: Coord) -> PlainMove {
        PlainMove { from, to }
    }

    pub fn to_human(&self) -> String {
        format!("{} to {}", self.from.to_algebraic(), self.to.to_algebraic())
    }
}

/// The 8x8 grid of squares. Pure data: nothing here enforces turn order or
/// king safety, that is the rules layer's job.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Board {
    squares: [[Square; 8]; 8],
}

impl Board {
    /// Standard initial position.
    pub fn new() -> Board {
        Board::from_placement(STARTING_PLACEMENT)
    }

    pub fn empty() -> Board {
        Board {
            squares: [[None; 8]; 8],
        }
    }

    /// Build a board from the piece-placement field of a FEN string
    /// (ranks from black's side down, `/`-separated, digits for gaps).
    /// Test and setup plumbing; panics on malformed input.
    pub fn from_placement(placement: &str) -> Board {
        let mut board = Board::empty();
        let mut row: i8 = 7;
        let mut col: u8 = 0;
        for c in placement.chars() {
            if c.is_alphabetic() {
                board.squares[row as usize][col as usize] = Some(Piece::from_placement_char(c));
                col += 1;
            } else if c.is_numeric() {
                col += c as u8 - b'0';
            } else if c == '/' {
                row -= 1;
                col = 0;
            } else {
                panic!("Unexpected char {c} in placement string.");
            }
        }
        board
    }

    pub fn get(&self, coord: Coord) -> Square {
        self.squares[coord.row as usize][coord.col as usize]
    }

    pub fn set(&mut self, coord: Coord, square: Square) {
        self.squares[coord.row as usize][coord.col as usize] = square;
    }

    /// Iterate over every occupied square.
    pub fn pieces(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        itertools::iproduct!(0..8u8, 0..8u8).filter_map(move |(row, col)| {
            let coord = Coord { row, col };
            self.get(coord).map(|piece| (coord, piece))
        })
    }

    /// Iterate over every occupied square holding a piece of `color`.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    /// The square `color`'s king stands on, if it is on the board at all.
    pub fn king_of(&self, color: Color) -> Option<Coord> {
        self.pieces_of(color)
            .find(|(_, p)| p.kind == PieceKind::King)
            .map(|(coord, _)| coord)
    }

    pub fn draw_board(&self) -> String {
        let mut string = String::new();
        for row in (0..8u8).rev() {
            for col in 0..8u8 {
                let square = self.get(Coord { row, col });
                string = format!(
                    "{} {}",
                    string,
                    match &square {
                        Some(p) => p.to_symbol(),
                        None => ".",
                    }
                );
            }
            string = format!("{}\n", string);
        }
        string
    }

    pub fn draw_to_terminal(&self) {
        println!("{}", self.draw_board());
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}
