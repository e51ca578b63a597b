//! End-to-end games played between two independent engine instances, with
//! every move crossing the wire format exactly as the relay would carry it.

use chess_duel::board::{Board, Color, Coord, Piece, PieceKind};
use chess_duel::game::{Action, AppliedMove, GameState, Outcome, Terminal};
use chess_duel::protocol::{ClientMessage, ServerMessage, StateFlags};
use chess_duel::special::Wing;
use pretty_assertions::assert_eq;

fn coord(s: &str) -> Coord {
    Coord::from_algebraic(s)
}

fn apply_local(game: &mut GameState, from: &str, to: &str) -> AppliedMove {
    assert!(game.select(coord(from)), "selection of {from} was ignored");
    match game.choose_destination(coord(to)) {
        Action::Applied(applied) => applied,
        other => panic!("move {from}-{to} not applied: {other:?}"),
    }
}

/// Push an applied move through the client wire format, the relay's turn
/// flip, and the receiving side's wholesale overwrite.
fn forward(applied: &AppliedMove, receiver: &mut GameState) {
    let outbound = ClientMessage::Move {
        game_id: "test-game".into(),
        mv: applied.mv,
        board: applied.snapshot.board.clone(),
        game_state: StateFlags::of(&applied.snapshot),
    };
    let json = serde_json::to_string(&outbound).unwrap();
    let ClientMessage::Move {
        mv,
        board,
        game_state,
        ..
    } = serde_json::from_str(&json).unwrap()
    else {
        panic!("wire type changed in flight");
    };

    let turn = game_state.turn.other();
    let inbound = ServerMessage::OpponentMove {
        mv,
        board,
        game_state,
        turn,
    };
    let json = serde_json::to_string(&inbound).unwrap();
    let ServerMessage::OpponentMove {
        board,
        game_state,
        turn,
        ..
    } = serde_json::from_str(&json).unwrap()
    else {
        panic!("wire type changed in flight");
    };
    receiver.apply_remote(game_state.into_snapshot(board), turn);
}

fn exchange(mover: &mut GameState, receiver: &mut GameState, from: &str, to: &str) -> AppliedMove {
    let applied = apply_local(mover, from, to);
    forward(&applied, receiver);
    applied
}

/// The two copies must agree on everything that travels the wire.
fn assert_in_lock_step(white: &GameState, black: &GameState) {
    assert_eq!(white.board, black.board);
    assert_eq!(white.turn, black.turn);
    assert_eq!(white.castling, black.castling);
    assert_eq!(white.last_double_step, black.last_double_step);
    assert_eq!(white.terminal, black.terminal);
}

#[test]
fn fools_mate_reaches_checkmate_on_both_sides() {
    let mut white = GameState::new();
    let mut black = GameState::new();

    exchange(&mut white, &mut black, "f2", "f4");
    assert_in_lock_step(&white, &black);
    exchange(&mut black, &mut white, "e7", "e5");
    assert_in_lock_step(&white, &black);
    exchange(&mut white, &mut black, "g2", "g4");
    assert_in_lock_step(&white, &black);

    let applied = exchange(&mut black, &mut white, "d8", "h4");
    assert_eq!(applied.outcome, Outcome::Checkmate(Color::Black));
    assert_eq!(black.terminal, Terminal::Checkmate(Color::Black));
    // the mover declared it; the receiver rediscovered it from the snapshot
    assert_eq!(white.terminal, Terminal::Checkmate(Color::Black));
    assert_in_lock_step(&white, &black);
}

#[test]
fn castling_travels_as_one_atomic_update() {
    let board = Board::from_placement("r3k2r/8/8/8/8/8/8/R3K2R");
    let mut white = GameState::new();
    let mut black = GameState::new();
    white.board = board.clone();
    black.board = board;

    exchange(&mut white, &mut black, "e1", "g1");
    for game in [&white, &black] {
        assert_eq!(
            game.board.get(coord("g1")),
            Some(Piece::new(Color::White, PieceKind::King))
        );
        assert_eq!(
            game.board.get(coord("f1")),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
        assert_eq!(game.board.get(coord("e1")), None);
        assert_eq!(game.board.get(coord("h1")), None);
    }
    assert_in_lock_step(&white, &black);

    // black still has both wings; queenside castle goes the other way
    exchange(&mut black, &mut white, "e8", "c8");
    for game in [&white, &black] {
        assert_eq!(
            game.board.get(coord("c8")),
            Some(Piece::new(Color::Black, PieceKind::King))
        );
        assert_eq!(
            game.board.get(coord("d8")),
            Some(Piece::new(Color::Black, PieceKind::Rook))
        );
    }
    assert!(white.castling.king_moved(Color::Black));
    assert!(white.castling.rook_moved(Color::Black, Wing::Queenside));
    assert_in_lock_step(&white, &black);
}

#[test]
fn en_passant_capture_crosses_the_wire() {
    let mut white = GameState::new();
    let mut black = GameState::new();

    exchange(&mut white, &mut black, "e2", "e4");
    exchange(&mut black, &mut white, "a7", "a6");
    exchange(&mut white, &mut black, "e4", "e5");
    exchange(&mut black, &mut white, "d7", "d5");
    assert_eq!(white.last_double_step, Some(coord("d5")));

    // the white pawn takes in passing; the victim leaves its actual square
    exchange(&mut white, &mut black, "e5", "d6");
    for game in [&white, &black] {
        assert_eq!(
            game.board.get(coord("d6")),
            Some(Piece::new(Color::White, PieceKind::Pawn))
        );
        assert_eq!(game.board.get(coord("d5")), None);
        assert_eq!(game.board.get(coord("e5")), None);
    }
    assert_in_lock_step(&white, &black);
}

#[test]
fn promotion_is_suspended_until_the_choice_arrives() {
    let board = Board::from_placement("8/4P3/8/8/8/8/k7/4K3");
    let mut white = GameState::new();
    let mut black = GameState::new();
    white.board = board.clone();
    black.board = board;

    assert!(white.select(coord("e7")));
    assert_eq!(
        white.choose_destination(coord("e8")),
        Action::PromotionPending
    );
    // nothing has moved yet, and nothing is on the wire yet
    assert_eq!(
        white.board.get(coord("e7")),
        Some(Piece::new(Color::White, PieceKind::Pawn))
    );
    assert_eq!(white.turn, Color::White);

    let Action::Applied(applied) = white.choose_promotion(PieceKind::Queen) else {
        panic!("promotion choice not applied");
    };
    forward(&applied, &mut black);
    for game in [&white, &black] {
        assert_eq!(
            game.board.get(coord("e8")),
            Some(Piece::new(Color::White, PieceKind::Queen))
        );
        assert_eq!(game.board.get(coord("e7")), None);
    }
    assert_in_lock_step(&white, &black);
}
