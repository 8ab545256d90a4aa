//! Spoken move recognition: transcript -> tokens -> command

mod command;
mod lexer;
mod parser;
pub mod vocab;

pub use command::{CastleSide, MoveSkeleton, ParsedCommand, SessionCommand};
pub use lexer::{normalize, Token};
pub use parser::{ParseError, ParseTrace, VoiceParser};
pub use vocab::{Keyword, Vocabulary};
