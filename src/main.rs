//! Command-line entry point: run a relay, or play a game in the terminal.
//!
//! Usage:
//!   chess_duel serve --port 8080 --web-dir web
//!   chess_duel play --url ws://localhost:8080/ws

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use tracing_subscriber::EnvFilter;

use chess_duel::board::{Color, Coord, PieceKind};
use chess_duel::client::RelayClient;
use chess_duel::game::{Action, GameState, Outcome, Terminal};
use chess_duel::protocol::ServerMessage;
use chess_duel::relay;

#[derive(Parser, Debug)]
#[command(name = "chess_duel")]
#[command(about = "Two-player chess over a rule-agnostic relay")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run the relay server
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Directory of static files for the browser client
        #[arg(long, default_value = "web")]
        web_dir: String,
    },
    /// Play a game in the terminal against a remote opponent
    Play {
        #[arg(long, default_value = "ws://localhost:8080/ws")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Serve { port, web_dir } => relay::serve(port, &web_dir).await,
        CliCommand::Play { url } => play(&url).await,
    }
}

async fn play(url: &str) -> Result<()> {
    let mut client = RelayClient::connect(url).await?;
    client.join_game()?;

    let (my_color, game_id) = loop {
        match client.next_event().await {
            Some(ServerMessage::WaitingForOpponent { your_color, .. }) => {
                println!(
                    "Waiting for an opponent... you will play {}.",
                    your_color.to_human()
                );
            }
            Some(ServerMessage::GameStarted {
                your_color,
                opponent_color,
                game_id,
            }) => {
                println!(
                    "Game started. You are {}, your opponent is {}.",
                    your_color.to_human(),
                    opponent_color.to_human()
                );
                break (your_color, game_id);
            }
            Some(_) => {}
            None => return Err(eyre!("connection lost before a game started")),
        }
    };
    client.register_player(&game_id, my_color)?;

    let mut game = GameState::new();
    while game.terminal == Terminal::None {
        game.board.draw_to_terminal();
        if game.turn == my_color {
            if !my_turn(&client, &game_id, &mut game, my_color)? {
                break;
            }
        } else {
            println!("Waiting for {}...", game.turn.to_human());
            if !opponent_turn(&mut client, &mut game).await? {
                break;
            }
        }
    }
    Ok(())
}

/// Prompt for and apply one local move. Returns false once the game ended
/// or the player quit.
fn my_turn(
    client: &RelayClient,
    game_id: &str,
    game: &mut GameState,
    my_color: Color,
) -> Result<bool> {
    if game.in_check {
        println!("You are in check.");
    }
    let line = prompt("Your move (e.g. `e2 e4`, or `quit`): ")?;
    if line == "quit" {
        client.game_over(game_id, "resigned", Some(my_color))?;
        return Ok(false);
    }
    let Some((from, to)) = parse_move(&line) else {
        println!("Could not read that, use two squares like `e2 e4`.");
        return Ok(true);
    };

    if !game.select(from) {
        println!("No legal moves from {}.", from.to_algebraic());
        return Ok(true);
    }
    let applied = match game.choose_destination(to) {
        Action::Ignored => {
            println!("{} is not a legal destination.", to.to_algebraic());
            return Ok(true);
        }
        Action::PromotionPending => loop {
            let choice = prompt("Promote to [q]ueen, [r]ook, [b]ishop, k[n]ight or [p]awn: ")?;
            let Some(kind) = parse_promotion(&choice) else {
                continue;
            };
            match game.choose_promotion(kind) {
                Action::Applied(applied) => break applied,
                _ => continue,
            }
        },
        Action::Applied(applied) => applied,
    };

    client.send_move(game_id, &applied)?;
    match applied.outcome {
        Outcome::Checkmate(winner) => {
            println!("Checkmate! {} wins.", winner.to_human());
            client.game_over(game_id, "checkmate", Some(my_color))?;
            Ok(false)
        }
        Outcome::Stalemate => {
            println!("Stalemate. It's a draw.");
            client.game_over(game_id, "stalemate", Some(my_color))?;
            Ok(false)
        }
        Outcome::Check => {
            println!("Check!");
            Ok(true)
        }
        Outcome::Continue => Ok(true),
    }
}

/// Wait for the peer's move (or the end of the game). Returns false once
/// the session is over.
async fn opponent_turn(client: &mut RelayClient, game: &mut GameState) -> Result<bool> {
    loop {
        match client.next_event().await {
            Some(ServerMessage::OpponentMove {
                mv,
                board,
                game_state,
                turn,
            }) => {
                println!("Opponent played {}.", mv.to_human());
                game.apply_remote(game_state.into_snapshot(board), turn);
                match game.terminal {
                    Terminal::Checkmate(winner) => {
                        game.board.draw_to_terminal();
                        println!("Checkmate! {} wins.", winner.to_human());
                        return Ok(false);
                    }
                    Terminal::Stalemate => {
                        game.board.draw_to_terminal();
                        println!("Stalemate. It's a draw.");
                        return Ok(false);
                    }
                    Terminal::None => return Ok(true),
                }
            }
            Some(ServerMessage::BoardSync {
                board,
                turn,
                game_state,
            }) => {
                match game_state {
                    Some(flags) => game.apply_remote(flags.into_snapshot(board), turn),
                    None => game.apply_sync(board, turn),
                }
                println!("Board resynced.");
                return Ok(true);
            }
            Some(ServerMessage::GameOver { result }) => {
                println!("Game over: {result}.");
                return Ok(false);
            }
            Some(ServerMessage::OpponentDisconnected) => {
                println!("Your opponent disconnected.");
                return Ok(false);
            }
            Some(_) => {}
            None => {
                println!("Connection to the relay was lost.");
                return Ok(false);
            }
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    use std::io::Write;
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_lowercase())
}

/// Parse `e2 e4` into a coordinate pair without panicking on garbage.
fn parse_move(line: &str) -> Option<(Coord, Coord)> {
    let mut squares = line.split_whitespace();
    let from = parse_square(squares.next()?)?;
    let to = parse_square(squares.next()?)?;
    if squares.next().is_some() {
        return None;
    }
    Some((from, to))
}

fn parse_square(s: &str) -> Option<Coord> {
    let mut chars = s.chars();
    let file = chars.next()?;
    let rank = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    Some(Coord::new(rank as u8 - b'1', file as u8 - b'a'))
}

fn parse_promotion(choice: &str) -> Option<PieceKind> {
    match choice {
        "q" => Some(PieceKind::Queen),
        "r" => Some(PieceKind::Rook),
        "b" => Some(PieceKind::Bishop),
        "n" => Some(PieceKind::Knight),
        "p" => Some(PieceKind::Pawn),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_square() {
        assert_eq!(parse_square("a1"), Some(Coord::new(0, 0)));
        assert_eq!(parse_square("h8"), Some(Coord::new(7, 7)));
        assert_eq!(parse_square("i1"), None);
        assert_eq!(parse_square("a9"), None);
        assert_eq!(parse_square("a"), None);
        assert_eq!(parse_square("a1x"), None);
    }

    #[test]
    fn test_parse_move() {
        assert_eq!(
            parse_move("e2 e4"),
            Some((Coord::from_algebraic("e2"), Coord::from_algebraic("e4")))
        );
        assert_eq!(parse_move("e2"), None);
        assert_eq!(parse_move("e2 e4 e5"), None);
        assert_eq!(parse_move("castle"), None);
    }

    #[test]
    fn test_parse_promotion() {
        assert_eq!(parse_promotion("q"), Some(PieceKind::Queen));
        assert_eq!(parse_promotion("p"), Some(PieceKind::Pawn));
        assert_eq!(parse_promotion("k"), None);
    }
}
