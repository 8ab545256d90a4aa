//! Move-phrase parser
//!
//! Not a grammar: one left-to-right scan over the tokens where precedence
//! comes from the order of the checks made at each position. Words that
//! mean nothing to chess are skipped, so filler never aborts a parse.

use shakmaty::{File, Rank, Role, Square};
use thiserror::Error;
use tracing::debug;

use super::command::{CastleSide, MoveSkeleton, ParsedCommand, SessionCommand};
use super::lexer::{normalize, Token};
use super::vocab::{Keyword, Vocabulary};
use crate::error::Stage;

/// Pure filler between piece and square; also a homophone of "2", which
/// only applies right after a file word.
const FILLER: &str = "to";
const FROM: &str = "from";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("nothing was heard")]
    Empty,

    #[error("no chess words recognized")]
    Unrecognized,

    #[error("no target square found")]
    NoTargetSquare,

    #[error("pawn capture is missing the file the pawn comes from")]
    MissingPawnSource,
}

impl ParseError {
    pub fn stage(&self) -> Stage {
        match self {
            ParseError::Empty => Stage::Transcription,
            ParseError::Unrecognized | ParseError::NoTargetSquare => Stage::Parse,
            ParseError::MissingPawnSource => Stage::Assembly,
        }
    }

    /// What to tell the player before listening again.
    pub fn hint(&self) -> &'static str {
        match self {
            ParseError::Empty => "I didn't hear anything. Please say your move.",
            ParseError::Unrecognized => {
                "I didn't understand that. Try something like knight to f3."
            }
            ParseError::NoTargetSquare => "Which square? Say the destination, like pawn to e4.",
            ParseError::MissingPawnSource => {
                "Which pawn? Say the file it captures from, like pawn from e takes d5."
            }
        }
    }
}

/// Every intermediate stage of one parse.
#[derive(Debug, Clone)]
pub struct ParseTrace {
    pub transcript: String,
    pub tokens: Vec<Token>,
    pub result: Result<ParsedCommand, ParseError>,
}

impl ParseTrace {
    pub fn san(&self) -> Option<String> {
        self.result.as_ref().ok().and_then(ParsedCommand::san)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VoiceParser<'v> {
    vocab: &'v Vocabulary,
}

impl Default for VoiceParser<'static> {
    fn default() -> Self {
        Self::new(Vocabulary::shared())
    }
}

impl<'v> VoiceParser<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn parse_transcript(&self, transcript: &str) -> Result<ParsedCommand, ParseError> {
        self.trace(transcript).result
    }

    pub fn trace(&self, transcript: &str) -> ParseTrace {
        let tokens = normalize(transcript);
        debug!(stage = "normalize", transcript, ?tokens);

        let result = self.parse(&tokens);
        match &result {
            Ok(command) => debug!(stage = "parse", ?command, san = ?command.san()),
            Err(err) => debug!(stage = "parse", error = %err, "no command"),
        }

        ParseTrace {
            transcript: transcript.to_string(),
            tokens,
            result,
        }
    }

    pub fn parse(&self, tokens: &[Token]) -> Result<ParsedCommand, ParseError> {
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        if let Some(side) = self.castle(tokens) {
            return Ok(ParsedCommand::Castle(side));
        }
        if let Some(command) = self.session(tokens) {
            return Ok(ParsedCommand::Session(command));
        }
        if let Some(result) = self.pawn_capture(tokens) {
            return result.map(ParsedCommand::Move);
        }
        self.scan(tokens).map(ParsedCommand::Move)
    }

    fn any(&self, tokens: &[Token], keyword: Keyword) -> bool {
        tokens.iter().any(|t| self.vocab.is(keyword, t.as_str()))
    }

    fn castle(&self, tokens: &[Token]) -> Option<CastleSide> {
        // "O-O" read out letter by letter arrives as separate "o" tokens.
        let letters = tokens
            .iter()
            .filter(|t| matches!(t.as_str(), "o" | "0"))
            .count();
        if letters < 2 && !self.any(tokens, Keyword::Castle) {
            return None;
        }
        // A spoken side beats counted letters; queenside beats kingside.
        if self.any(tokens, Keyword::Queenside) {
            Some(CastleSide::Queenside)
        } else if self.any(tokens, Keyword::Kingside) || letters < 3 {
            Some(CastleSide::Kingside)
        } else {
            Some(CastleSide::Queenside)
        }
    }

    fn session(&self, tokens: &[Token]) -> Option<SessionCommand> {
        if self.any(tokens, Keyword::Exit) {
            Some(SessionCommand::Exit)
        } else if self.any(tokens, Keyword::Resign) {
            Some(SessionCommand::Resign)
        } else if self.any(tokens, Keyword::Draw) {
            if self.any(tokens, Keyword::Accept) {
                Some(SessionCommand::AcceptDraw)
            } else if self.any(tokens, Keyword::Decline) {
                Some(SessionCommand::DeclineDraw)
            } else {
                Some(SessionCommand::OfferDraw)
            }
        } else {
            None
        }
    }

    /// Pawn captures get their own search because the general scan loses
    /// the source file once "pawn" has been consumed as the piece. `None`
    /// means the phrase is not a resolvable pawn capture and the general
    /// scan should try.
    fn pawn_capture(&self, tokens: &[Token]) -> Option<Result<MoveSkeleton, ParseError>> {
        let pawn_at = tokens.iter().position(|t| self.vocab.is_pawn(t.as_str()))?;
        let capture_at = tokens
            .iter()
            .position(|t| self.vocab.is(Keyword::Capture, t.as_str()))?;
        // "knight takes pawn": the pawn is what gets captured.
        let other_piece = tokens[..capture_at]
            .iter()
            .any(|t| self.vocab.piece(t.as_str()).is_some_and(|role| role != Role::Pawn));
        if other_piece {
            return None;
        }

        let target = self.first_square(&tokens[capture_at + 1..])?;
        let Some(from_file) = self.pawn_source(tokens, pawn_at, capture_at) else {
            debug!(stage = "parse", %target, "pawn capture without a source file");
            return Some(Err(ParseError::MissingPawnSource));
        };

        Some(Ok(MoveSkeleton {
            piece: Role::Pawn,
            from_file: Some(from_file),
            from_rank: None,
            capture: true,
            target,
            promotion: self.promotion(tokens),
            origin: None,
        }))
    }

    fn pawn_source(&self, tokens: &[Token], pawn_at: usize, capture_at: usize) -> Option<File> {
        let explicit = tokens
            .iter()
            .position(|t| *t == FROM)
            .and_then(|at| tokens.get(at + 1))
            .and_then(|t| self.vocab.file(t.as_str()));
        if explicit.is_some() {
            return explicit;
        }

        // "g pawn takes", but not "takes a pawn on d5".
        let before_pawn = pawn_at
            .checked_sub(1)
            .filter(|_| pawn_at < capture_at)
            .and_then(|at| self.vocab.file(tokens[at].as_str()));
        if before_pawn.is_some() {
            return before_pawn;
        }

        let before_capture = &tokens[..capture_at];
        before_capture
            .iter()
            .find_map(|t| self.vocab.file(t.as_str()))
            .or_else(|| {
                before_capture
                    .iter()
                    .find_map(|t| self.vocab.square(t.as_str()))
                    .map(|square| square.file())
            })
    }

    /// First file+rank pair, spoken as one word ("g5") or two ("g", "5").
    fn first_square(&self, tokens: &[Token]) -> Option<Square> {
        tokens.iter().enumerate().find_map(|(i, t)| {
            let word = t.as_str();
            if let Some(file) = self.vocab.file(word) {
                if let Some(rank) = tokens.get(i + 1).and_then(|n| self.vocab.rank(n.as_str())) {
                    return Some(Square::from_coords(file, rank));
                }
            }
            self.vocab.square(word)
        })
    }

    fn promotion(&self, tokens: &[Token]) -> Option<Role> {
        let at = tokens
            .iter()
            .position(|t| self.vocab.is(Keyword::Promote, t.as_str()))?;
        tokens[at + 1..]
            .iter()
            .find(|t| **t != FILLER)
            .and_then(|t| self.vocab.promotion(t.as_str()))
    }

    fn scan(&self, tokens: &[Token]) -> Result<MoveSkeleton, ParseError> {
        let mut scan = Scan::default();
        let mut i = 0;

        while i < tokens.len() {
            let word = tokens[i].as_str();
            let next = tokens.get(i + 1).map(Token::as_str);

            if scan.piece.is_none() {
                if let Some(role) = self.vocab.piece(word) {
                    scan.piece = Some(role);
                    scan.recognized = true;
                    i += 1;
                    continue;
                }
            }

            if self.vocab.is(Keyword::Capture, word) {
                scan.capture = true;
                scan.recognized = true;
                i += 1;
                continue;
            }

            if word == FILLER {
                i += 1;
                continue;
            }

            if self.vocab.is(Keyword::Promote, word) {
                scan.recognized = true;
                let mut j = i + 1;
                while tokens.get(j).is_some_and(|t| *t == FILLER) {
                    j += 1;
                }
                match tokens.get(j).and_then(|t| self.vocab.promotion(t.as_str())) {
                    Some(role) => {
                        scan.promotion.get_or_insert(role);
                        i = j + 1;
                    }
                    None => i += 1,
                }
                continue;
            }

            if word == FROM {
                if let Some(next) = next {
                    if let Some(file) = self.vocab.file(next) {
                        scan.from_file = Some(file);
                    } else if let Some(rank) = self.vocab.rank(next) {
                        scan.from_rank = Some(rank);
                    } else if let Some(square) = self.vocab.square(next) {
                        scan.from_file = Some(square.file());
                        scan.from_rank = Some(square.rank());
                        scan.origin.get_or_insert(square);
                    }
                    i += 2;
                    continue;
                }
                i += 1;
                continue;
            }

            if let Some(file) = self.vocab.file(word) {
                if let Some(rank) = next.and_then(|n| self.vocab.rank(n)) {
                    scan.set_target(Square::from_coords(file, rank));
                    i += 2;
                    continue;
                }
            }

            if let Some(square) = self.vocab.square(word) {
                scan.set_target(square);
                i += 1;
                continue;
            }

            if let Some((from, to)) = self.vocab.square_pair(word) {
                scan.origin.get_or_insert(from);
                scan.set_target(to);
                i += 1;
                continue;
            }

            i += 1;
        }

        scan.finish()
    }
}

#[derive(Debug, Default)]
struct Scan {
    piece: Option<Role>,
    from_file: Option<File>,
    from_rank: Option<Rank>,
    capture: bool,
    target: Option<Square>,
    promotion: Option<Role>,
    origin: Option<Square>,
    recognized: bool,
}

impl Scan {
    /// A later square replaces the target; the earlier one becomes the origin.
    fn set_target(&mut self, square: Square) {
        self.recognized = true;
        if let Some(previous) = self.target.replace(square) {
            self.origin.get_or_insert(previous);
        }
    }

    fn finish(self) -> Result<MoveSkeleton, ParseError> {
        let Some(target) = self.target else {
            return Err(if self.recognized {
                ParseError::NoTargetSquare
            } else {
                ParseError::Unrecognized
            });
        };

        let piece = self.piece.unwrap_or(Role::Pawn);
        let mut from_file = self.from_file;
        if piece == Role::Pawn && self.capture && from_file.is_none() {
            from_file = self.origin.map(|square| square.file());
            if from_file.is_none() {
                return Err(ParseError::MissingPawnSource);
            }
        }

        Ok(MoveSkeleton {
            piece,
            from_file,
            from_rank: self.from_rank,
            capture: self.capture,
            target,
            promotion: self.promotion,
            origin: self.origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(transcript: &str) -> Result<ParsedCommand, ParseError> {
        VoiceParser::default().parse_transcript(transcript)
    }

    fn san(transcript: &str) -> Option<String> {
        parse(transcript).ok().and_then(|c| c.san())
    }

    #[test]
    fn test_square_to_square() {
        let Ok(ParsedCommand::Move(skeleton)) = parse("e2 to e4") else {
            panic!("expected a move");
        };
        assert_eq!(skeleton.target, Square::E4);
        assert_eq!(skeleton.piece, Role::Pawn);
        assert!(!skeleton.capture);
        assert_eq!(skeleton.origin, Some(Square::E2));
        assert_eq!(skeleton.san(), "e4");
    }

    #[test]
    fn test_piece_moves() {
        assert_eq!(san("knight to f3").as_deref(), Some("Nf3"));
        assert_eq!(san("Night to F3.").as_deref(), Some("Nf3"));
        assert_eq!(san("bishop to be 5").as_deref(), Some("Bb5"));
        assert_eq!(san("queen to d for").as_deref(), Some("Qd4"));
        assert_eq!(san("rook takes a ate").as_deref(), Some("Rxa8"));
        assert_eq!(san("king to echo two").as_deref(), Some("Ke2"));
    }

    #[test]
    fn test_first_piece_wins() {
        assert_eq!(san("knight takes bishop on c6").as_deref(), Some("Nxc6"));
    }

    #[test]
    fn test_disambiguation() {
        assert_eq!(san("knight from b to d2").as_deref(), Some("Nbd2"));
        assert_eq!(san("rook from 1 to a3").as_deref(), Some("R1a3"));
        assert_eq!(san("queen from h4 to e1").as_deref(), Some("Qh4e1"));
    }

    #[test]
    fn test_pawn_captures() {
        assert_eq!(san("pawn from g takes h5").as_deref(), Some("gxh5"));
        assert_eq!(san("g pawn takes h5").as_deref(), Some("gxh5"));
        assert_eq!(san("pawn on g takes h 5").as_deref(), Some("gxh5"));
        assert_eq!(san("pawn on g4 takes h5").as_deref(), Some("gxh5"));
        assert_eq!(san("e4 takes d5").as_deref(), Some("exd5"));
    }

    #[test]
    fn test_captured_pawn_is_not_the_mover() {
        assert_eq!(san("knight takes pawn on e5").as_deref(), Some("Nxe5"));
        assert_eq!(san("bishop takes a pawn on c6").as_deref(), Some("Bxc6"));
        assert_eq!(san("queen captures pawn d5").as_deref(), Some("Qxd5"));
        assert_eq!(san("e takes a pawn on d5").as_deref(), Some("exd5"));
        assert_eq!(parse("takes a pawn on d5"), Err(ParseError::MissingPawnSource));
    }

    #[test]
    fn test_pawn_capture_without_source_fails() {
        assert_eq!(parse("pawn takes h5"), Err(ParseError::MissingPawnSource));
        assert_eq!(parse("takes h5"), Err(ParseError::MissingPawnSource));
    }

    #[test]
    fn test_promotion() {
        assert_eq!(san("e7 to e8 promote to queen").as_deref(), Some("e8=Q"));
        assert_eq!(san("pawn to e8 promotes to night").as_deref(), Some("e8=N"));
        assert_eq!(
            san("pawn from d takes e8 promote to rook").as_deref(),
            Some("dxe8=R")
        );
    }

    #[test]
    fn test_only_first_promotion_counts() {
        assert_eq!(
            san("pawn to e8 promote to queen promote to rook").as_deref(),
            Some("e8=Q")
        );
    }

    #[test]
    fn test_castling_dominates() {
        assert_eq!(
            parse("castle queenside"),
            Ok(ParsedCommand::Castle(CastleSide::Queenside))
        );
        assert_eq!(
            parse("castles long please knight to f3"),
            Ok(ParsedCommand::Castle(CastleSide::Queenside))
        );
        assert_eq!(
            parse("castle kingside"),
            Ok(ParsedCommand::Castle(CastleSide::Kingside))
        );
        assert_eq!(parse("castle"), Ok(ParsedCommand::Castle(CastleSide::Kingside)));
        assert_eq!(parse("o o"), Ok(ParsedCommand::Castle(CastleSide::Kingside)));
        assert_eq!(parse("O-O-O"), Ok(ParsedCommand::Castle(CastleSide::Queenside)));
        assert_eq!(parse("o o o"), Ok(ParsedCommand::Castle(CastleSide::Queenside)));
        assert_eq!(parse("0-0"), Ok(ParsedCommand::Castle(CastleSide::Kingside)));
        assert_eq!(parse("castle and resign"), Ok(ParsedCommand::Castle(CastleSide::Kingside)));
        assert_eq!(
            parse("short castle o o o"),
            Ok(ParsedCommand::Castle(CastleSide::Kingside))
        );
        assert_eq!(
            parse("castle short no long"),
            Ok(ParsedCommand::Castle(CastleSide::Queenside))
        );
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(parse("exit"), Ok(ParsedCommand::Session(SessionCommand::Exit)));
        assert_eq!(parse("I quit!"), Ok(ParsedCommand::Session(SessionCommand::Exit)));
        assert_eq!(parse("I resign"), Ok(ParsedCommand::Session(SessionCommand::Resign)));
        assert_eq!(
            parse("accept draw"),
            Ok(ParsedCommand::Session(SessionCommand::AcceptDraw))
        );
        assert_eq!(
            parse("decline the draw"),
            Ok(ParsedCommand::Session(SessionCommand::DeclineDraw))
        );
        assert_eq!(
            parse("offer a draw"),
            Ok(ParsedCommand::Session(SessionCommand::OfferDraw))
        );
    }

    #[test]
    fn test_failures() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("hello there"), Err(ParseError::Unrecognized));
        assert_eq!(parse("knight"), Err(ParseError::NoTargetSquare));
        assert_eq!(parse("bishop to"), Err(ParseError::NoTargetSquare));
    }

    #[test]
    fn test_run_together_squares() {
        let Ok(ParsedCommand::Move(skeleton)) = parse("g1f3") else {
            panic!("expected a move");
        };
        assert_eq!(skeleton.origin, Some(Square::G1));
        assert_eq!(skeleton.target, Square::F3);
    }

    #[test]
    fn test_trace_exposes_stages() {
        let trace = VoiceParser::default().trace("Knight, to F3!");
        assert_eq!(trace.tokens, vec!["knight", "to", "f3"]);
        assert_eq!(trace.san().as_deref(), Some("Nf3"));
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut vocab = Vocabulary::standard();
        vocab.add_piece("horse", Role::Knight);
        let parser = VoiceParser::new(&vocab);
        let command = parser.parse_transcript("horse to f3").ok().and_then(|c| c.san());
        assert_eq!(command.as_deref(), Some("Nf3"));
    }
}
