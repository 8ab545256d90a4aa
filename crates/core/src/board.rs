//! Board capability and move validation
//!
//! Everything that needs full chess rules goes through [`BoardLike`]. The
//! rest of the crate only ever sees [`MoveToken`]s and SAN strings.

use std::fmt;
use std::str::FromStr;

use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, Move, Position, Role, Square};
use thiserror::Error;
use tracing::debug;

use crate::notation::castle_san;
use crate::voice::{ParsedCommand, SessionCommand};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid SAN {san:?}: {reason}")]
    InvalidSan { san: String, reason: String },

    #[error("illegal move {notation}: {reason}")]
    IllegalMove { notation: String, reason: String },

    #[error("invalid UCI move {0:?}")]
    InvalidUci(String),

    #[error("{} is not a move", .0.as_str())]
    NotAMove(SessionCommand),
}

/// Coordinate move identifier as used by UCI and the Lichess API:
/// origin, destination and an optional promotion piece (`e7e8q`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveToken {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl MoveToken {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Castling is written king-to-destination (`e1g1`), never king takes rook.
    pub fn from_move(mv: Move) -> Option<Self> {
        Self::from_uci(UciMove::from_standard(mv))
    }

    fn from_uci(uci: UciMove) -> Option<Self> {
        match uci {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => Some(Self {
                from,
                to,
                promotion,
            }),
            UciMove::Put { .. } | UciMove::Null => None,
        }
    }

    pub fn to_uci(self) -> UciMove {
        UciMove::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }

    /// The legal move this token names in `pos`. King takes rook is read
    /// as castling.
    pub fn to_move<P: Position>(self, pos: &P) -> Result<Move, ValidationError> {
        self.to_uci()
            .to_move(pos)
            .map_err(|e| ValidationError::IllegalMove {
                notation: self.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl FromStr for MoveToken {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidUci(s.to_string());
        let uci: UciMove = s.parse().map_err(|_| invalid())?;
        let token = Self::from_uci(uci).ok_or_else(invalid)?;
        if matches!(token.promotion, Some(Role::Pawn | Role::King)) {
            return Err(invalid());
        }
        Ok(token)
    }
}

/// What the validator and the game state need from a rules engine.
pub trait BoardLike {
    fn side_to_move(&self) -> Color;

    fn legal_tokens(&self) -> Vec<MoveToken>;

    /// Resolves SAN to a legal move without touching the position.
    fn san_to_token(&self, san: &str) -> Result<MoveToken, ValidationError>;

    /// SAN for a legal move, with `+` or `#` appended.
    fn token_to_san(&self, token: &MoveToken) -> Result<String, ValidationError>;

    fn apply_token(&mut self, token: &MoveToken) -> Result<(), ValidationError>;

    fn in_check(&self) -> bool;

    fn in_checkmate(&self) -> bool;

    fn in_stalemate(&self) -> bool;

    fn is_legal_token(&self, token: &MoveToken) -> bool {
        self.legal_tokens().contains(token)
    }
}

impl BoardLike for Chess {
    fn side_to_move(&self) -> Color {
        self.turn()
    }

    fn legal_tokens(&self) -> Vec<MoveToken> {
        self.legal_moves()
            .iter()
            .filter_map(|mv| MoveToken::from_move(*mv))
            .collect()
    }

    fn san_to_token(&self, san: &str) -> Result<MoveToken, ValidationError> {
        let parsed: San = san.parse().map_err(|e| ValidationError::InvalidSan {
            san: san.to_string(),
            reason: format!("{e}"),
        })?;
        let mv = parsed
            .to_move(self)
            .map_err(|e| ValidationError::IllegalMove {
                notation: san.to_string(),
                reason: format!("{e}"),
            })?;
        MoveToken::from_move(mv).ok_or_else(|| ValidationError::IllegalMove {
            notation: san.to_string(),
            reason: "drops are not supported".to_string(),
        })
    }

    fn token_to_san(&self, token: &MoveToken) -> Result<String, ValidationError> {
        let mv = token.to_move(self)?;
        Ok(SanPlus::from_move(self.clone(), mv).to_string())
    }

    fn apply_token(&mut self, token: &MoveToken) -> Result<(), ValidationError> {
        let mv = token.to_move(self)?;
        *self = self
            .clone()
            .play(mv)
            .map_err(|e| ValidationError::IllegalMove {
                notation: token.to_string(),
                reason: format!("{e}"),
            })?;
        Ok(())
    }

    fn in_check(&self) -> bool {
        self.is_check()
    }

    fn in_checkmate(&self) -> bool {
        self.is_checkmate()
    }

    fn in_stalemate(&self) -> bool {
        self.is_stalemate()
    }

    fn is_legal_token(&self, token: &MoveToken) -> bool {
        token.to_move(self).is_ok()
    }
}

/// Resolves a parsed command to a legal move on `board` without mutating it.
///
/// Moves go through their assembled SAN. When the phrase also named an
/// origin square and the SAN fails, or lands on a move starting elsewhere,
/// the origin/target pair is tried as a coordinate move instead.
pub fn resolve_move<B: BoardLike + ?Sized>(
    command: &ParsedCommand,
    board: &B,
) -> Result<MoveToken, ValidationError> {
    let result = match command {
        ParsedCommand::Session(cmd) => Err(ValidationError::NotAMove(*cmd)),
        ParsedCommand::Castle(side) => board.san_to_token(castle_san(*side)),
        ParsedCommand::Move(skeleton) => {
            let san = skeleton.san();
            let by_san = board.san_to_token(&san);
            match (skeleton.origin, by_san) {
                (None, by_san) => by_san,
                (Some(origin), Ok(token)) if token.from == origin => Ok(token),
                (Some(origin), by_san) => {
                    let mut token = MoveToken::new(origin, skeleton.target);
                    token.promotion = skeleton.promotion;
                    if board.is_legal_token(&token) {
                        debug!(stage = "validate", %san, %token, "coordinate fallback");
                        Ok(token)
                    } else {
                        match by_san {
                            Ok(other) => Err(ValidationError::IllegalMove {
                                notation: token.to_string(),
                                reason: format!("{san} would play {other}, not from {origin}"),
                            }),
                            Err(err) => Err(err),
                        }
                    }
                }
            }
        }
    };
    match &result {
        Ok(token) => debug!(stage = "validate", ?command, %token, "resolved"),
        Err(err) => debug!(stage = "validate", ?command, error = %err, "rejected"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{CastleSide, MoveSkeleton, VoiceParser};
    use shakmaty::fen::Fen;
    use shakmaty::CastlingMode;

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    fn play_all(tokens: &[&str]) -> Chess {
        let mut board = Chess::default();
        for token in tokens {
            board.apply_token(&token.parse().unwrap()).unwrap();
        }
        board
    }

    fn resolve(transcript: &str, board: &Chess) -> Result<MoveToken, ValidationError> {
        let command = VoiceParser::default().parse_transcript(transcript).unwrap();
        resolve_move(&command, board)
    }

    #[test]
    fn test_token_display_and_parse() {
        let token: MoveToken = "e7e8q".parse().unwrap();
        assert_eq!(token.from, Square::E7);
        assert_eq!(token.to, Square::E8);
        assert_eq!(token.promotion, Some(Role::Queen));
        assert_eq!(token.to_string(), "e7e8q");
        assert_eq!(MoveToken::new(Square::G1, Square::F3).to_string(), "g1f3");
    }

    #[test]
    fn test_token_parse_rejects_garbage() {
        for bad in ["", "e2", "e2e9", "i2e4", "e7e8k", "e2e4qq", "é2e4", "0000", "Q@f7"] {
            assert!(bad.parse::<MoveToken>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_resolve_simple_moves() {
        let board = Chess::default();
        assert_eq!(resolve("knight to f3", &board).unwrap().to_string(), "g1f3");
        assert_eq!(resolve("e2 to e4", &board).unwrap().to_string(), "e2e4");
        assert_eq!(resolve("pawn to d for", &board).unwrap().to_string(), "d2d4");
    }

    #[test]
    fn test_resolve_pawn_capture() {
        let board = play_all(&["e2e4", "d7d5"]);
        assert_eq!(
            resolve("pawn from e takes d5", &board).unwrap().to_string(),
            "e4d5"
        );
    }

    #[test]
    fn test_resolve_castling() {
        let board = play_all(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"]);
        let token = resolve_move(&ParsedCommand::Castle(CastleSide::Kingside), &board).unwrap();
        assert_eq!(token.to_string(), "e1g1");

        let err = resolve_move(&ParsedCommand::Castle(CastleSide::Queenside), &board);
        assert!(matches!(err, Err(ValidationError::IllegalMove { .. })));
    }

    #[test]
    fn test_resolve_promotion() {
        let board = position("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        assert_eq!(
            resolve("e7 to e8 promote to queen", &board).unwrap().to_string(),
            "e7e8q"
        );
        assert_eq!(
            resolve("pawn to e8 promote to night", &board).unwrap().to_string(),
            "e7e8n"
        );
    }

    #[test]
    fn test_illegal_and_invalid_are_distinct() {
        let board = Chess::default();
        assert!(matches!(
            resolve("knight to f6", &board),
            Err(ValidationError::IllegalMove { .. })
        ));
        assert!(matches!(
            board.san_to_token("Zz9"),
            Err(ValidationError::InvalidSan { .. })
        ));
        assert!(matches!(
            resolve_move(&ParsedCommand::Session(SessionCommand::Resign), &board),
            Err(ValidationError::NotAMove(SessionCommand::Resign))
        ));
    }

    #[test]
    fn test_origin_fallback() {
        // Misheard piece name: the origin square still pins down the move.
        let board = play_all(&["e2e4", "e7e5"]);
        let mut skeleton = MoveSkeleton::new(Role::Bishop, Square::H5);
        skeleton.origin = Some(Square::D1);
        let token = resolve_move(&ParsedCommand::Move(skeleton), &board).unwrap();
        assert_eq!(token.to_string(), "d1h5");

        skeleton.origin = Some(Square::D2);
        assert!(matches!(
            resolve_move(&ParsedCommand::Move(skeleton), &board),
            Err(ValidationError::IllegalMove { .. })
        ));
    }

    #[test]
    fn test_spoken_origin_wins_over_bare_san() {
        // "g1f3" assembles to "f3", which alone would be the f-pawn.
        let board = Chess::default();
        assert_eq!(resolve("g1f3", &board).unwrap().to_string(), "g1f3");
        assert_eq!(resolve("g1 to f3", &board).unwrap().to_string(), "g1f3");
        assert!(matches!(
            resolve("h1 to f3", &board),
            Err(ValidationError::IllegalMove { .. })
        ));

        let board = play_all(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"]);
        assert_eq!(resolve("e1 to g1", &board).unwrap().to_string(), "e1g1");
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let board = Chess::default();
        let before = board.clone();
        for _ in 0..2 {
            assert_eq!(resolve("knight to f3", &board).unwrap().to_string(), "g1f3");
        }
        assert_eq!(board.board(), before.board());
        assert_eq!(board.turn(), before.turn());
    }

    #[test]
    fn test_token_to_san() {
        let board = Chess::default();
        assert_eq!(board.token_to_san(&"g1f3".parse().unwrap()).unwrap(), "Nf3");

        let board = play_all(&["e2e4", "d7d5"]);
        assert_eq!(board.token_to_san(&"e4d5".parse().unwrap()).unwrap(), "exd5");

        let board = play_all(&["f2f3", "e7e5", "g2g4"]);
        assert_eq!(board.token_to_san(&"d8h4".parse().unwrap()).unwrap(), "Qh4#");

        let board = position("4k3/8/8/8/8/8/8/4K2R w K - 0 1");
        assert_eq!(board.token_to_san(&"h1h8".parse().unwrap()).unwrap(), "Rh8+");
    }

    #[test]
    fn test_token_to_san_disambiguates() {
        let board = position("1k6/8/8/8/8/8/4K3/R6R w - - 0 1");
        assert_eq!(board.token_to_san(&"a1d1".parse().unwrap()).unwrap(), "Rad1");

        let board = position("1k6/8/8/R7/8/8/4K3/R7 w - - 0 1");
        assert_eq!(board.token_to_san(&"a1a3".parse().unwrap()).unwrap(), "R1a3");

        let board = position("1k6/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert_eq!(board.token_to_san(&"e1g1".parse().unwrap()).unwrap(), "O-O");
        assert_eq!(board.token_to_san(&"e1c1".parse().unwrap()).unwrap(), "O-O-O");
    }

    #[test]
    fn test_legal_tokens_write_castling_as_king_move() {
        let board = position("1k6/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let tokens = board.legal_tokens();
        assert!(tokens.contains(&MoveToken::new(Square::E1, Square::G1)));
        assert!(tokens.contains(&MoveToken::new(Square::E1, Square::C1)));
        assert!(!tokens.contains(&MoveToken::new(Square::E1, Square::H1)));
        assert!(board.is_legal_token(&MoveToken::new(Square::E1, Square::H1)));
    }

    #[test]
    fn test_castle_as_king_takes_rook() {
        let mut board = position("1k6/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        board.apply_token(&"e1h1".parse().unwrap()).unwrap();
        assert_eq!(board.board().king_of(Color::White), Some(Square::G1));
        assert_eq!(board.side_to_move(), Color::Black);
    }

    #[test]
    fn test_check_queries() {
        let board = play_all(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert!(board.in_check());
        assert!(board.in_checkmate());
        assert!(!board.in_stalemate());
        assert_eq!(board.side_to_move(), Color::White);
    }
}
