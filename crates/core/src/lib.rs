//! Voice Chess Core Library
//!
//! Turns spoken move phrases into legal moves and keeps a local board in
//! step with a remote game.

use shakmaty::Chess;

pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod lichess;
pub mod notation;
pub mod session;
pub mod speech;
pub mod voice;

pub use board::{resolve_move, BoardLike, MoveToken, ValidationError};
pub use config::Config;
pub use error::{Error, Result, Stage};
pub use game::{
    AppliedMove, GameEvent, GameState, GameStatus, GameUpdate, Mover, Outcome, RemoteStatus,
    StateUpdate, TerminalKind, TerminalResult,
};
pub use lichess::{GameService, LichessClient};
pub use session::{GameDriver, MovePrompter, PromptOutcome, SessionEnd};
pub use speech::{SpeechIn, SpeechOut};
pub use voice::{ParseError, ParsedCommand, VoiceParser};

/// Parses one transcript with the standard vocabulary.
pub fn parse_voice_command(transcript: &str) -> std::result::Result<ParsedCommand, ParseError> {
    VoiceParser::default().parse_transcript(transcript)
}

/// Feeds a remote event into `state`.
pub fn apply_remote_event<B: BoardLike>(
    state: &mut GameState<B>,
    event: &GameEvent,
) -> Result<Option<GameUpdate>> {
    state.apply_event(event)
}

/// Creates the standard starting position
pub fn starting_position() -> Chess {
    Chess::default()
}
