//! Error types for voice-chess-core

use std::fmt;

use thiserror::Error;

use crate::board::ValidationError;
use crate::voice::ParseError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lichess API error: {0}")]
    Lichess(String),

    #[error("move {token} rejected by server: {reason}")]
    MoveRejected { token: String, reason: String },

    #[error("could not parse voice command: {0}")]
    Parse(#[from] ParseError),

    #[error("could not validate move: {0}")]
    Validation(#[from] ValidationError),

    /// A move confirmed by the server could not be replayed locally.
    #[error("board replica out of sync at ply {ply} ({token}): {reason}")]
    Desync {
        ply: usize,
        token: String,
        reason: String,
    },

    #[error("game state received before the game started")]
    NotStarted,

    #[error("challenge was declined")]
    ChallengeDeclined,

    #[error("event stream closed")]
    StreamClosed,

    #[error("speech service failure: {0}")]
    Speech(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pipeline stage an error came from, used to pick a targeted prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Parse,
    Assembly,
    Validation,
    Remote,
    Sync,
    Setup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcription => "transcription",
            Stage::Parse => "parse",
            Stage::Assembly => "assembly",
            Stage::Validation => "validation",
            Stage::Remote => "remote",
            Stage::Sync => "sync",
            Stage::Setup => "setup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Speech(_) => Stage::Transcription,
            Error::Parse(e) => e.stage(),
            Error::Validation(_) => Stage::Validation,
            Error::MoveRejected { .. }
            | Error::Http(_)
            | Error::Json(_)
            | Error::Lichess(_)
            | Error::ChallengeDeclined
            | Error::StreamClosed => Stage::Remote,
            Error::Desync { .. } | Error::NotStarted => Stage::Sync,
            Error::Config(_) | Error::Io(_) => Stage::Setup,
        }
    }

    /// Recoverable errors are answered by re-prompting the player.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Speech(_) | Error::Parse(_) | Error::Validation(_) | Error::MoveRejected { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
