//! Parsed voice commands

use shakmaty::{File, Rank, Role, Square};

use crate::notation;

/// The pieces of an algebraic move recovered from speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSkeleton {
    /// `Role::Pawn` when no piece was named.
    pub piece: Role,
    pub from_file: Option<File>,
    pub from_rank: Option<Rank>,
    pub capture: bool,
    pub target: Square,
    pub promotion: Option<Role>,
    /// First square of a two-square phrase ("g1 to f3"). Not part of the
    /// SAN; only used as a coordinate fallback during validation.
    pub origin: Option<Square>,
}

impl MoveSkeleton {
    pub fn new(piece: Role, target: Square) -> Self {
        Self {
            piece,
            from_file: None,
            from_rank: None,
            capture: false,
            target,
            promotion: None,
            origin: None,
        }
    }

    pub fn san(&self) -> String {
        notation::assemble(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    Kingside,
    Queenside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Exit,
    Resign,
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
}

impl SessionCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionCommand::Exit => "exit",
            SessionCommand::Resign => "resign",
            SessionCommand::OfferDraw => "offer draw",
            SessionCommand::AcceptDraw => "accept draw",
            SessionCommand::DeclineDraw => "decline draw",
        }
    }
}

/// Result of parsing one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedCommand {
    Move(MoveSkeleton),
    Castle(CastleSide),
    Session(SessionCommand),
}

impl ParsedCommand {
    /// SAN for moves and castling, `None` for session commands.
    pub fn san(&self) -> Option<String> {
        match self {
            ParsedCommand::Move(skeleton) => Some(skeleton.san()),
            ParsedCommand::Castle(side) => Some(notation::castle_san(*side).to_string()),
            ParsedCommand::Session(_) => None,
        }
    }
}
