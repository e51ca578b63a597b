//! Two-player networked chess: a full rule engine on each client and a
//! chess-ignorant relay in the middle. Both peers run the identical
//! deterministic engine over the same move sequence; the relay only pairs
//! sockets and forwards payloads.

pub mod board;
pub mod client;
pub mod game;
pub mod movegen;
pub mod protocol;
pub mod relay;
pub mod rules;
pub mod special;
