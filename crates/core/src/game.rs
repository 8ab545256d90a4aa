//! Game state synchronized with a remote move feed
//!
//! The remote side reports the whole move list on every state event. The
//! replica only ever extends its own list with the tail it has not seen yet,
//! so `moves().len()` is always the number of plies applied to the board.

use shakmaty::{Chess, Color};
use tracing::{debug, error, info, warn};

use crate::board::{BoardLike, MoveToken, ValidationError};
use crate::error::{Error, Result};

/// Game status as reported by the remote feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Created,
    Started,
    Mate,
    Resign,
    Draw,
    Stalemate,
    Timeout,
    OutOfTime,
    Aborted,
    NoStart,
    Unknown(String),
}

impl RemoteStatus {
    pub fn from_lichess(status: &str) -> Self {
        match status {
            "created" => RemoteStatus::Created,
            "started" => RemoteStatus::Started,
            "mate" => RemoteStatus::Mate,
            "resign" => RemoteStatus::Resign,
            "draw" => RemoteStatus::Draw,
            "stalemate" => RemoteStatus::Stalemate,
            "timeout" => RemoteStatus::Timeout,
            "outoftime" => RemoteStatus::OutOfTime,
            "aborted" => RemoteStatus::Aborted,
            "noStart" => RemoteStatus::NoStart,
            other => RemoteStatus::Unknown(other.to_string()),
        }
    }

    pub fn terminal_kind(&self) -> Option<TerminalKind> {
        match self {
            RemoteStatus::Mate => Some(TerminalKind::Checkmate),
            RemoteStatus::Resign => Some(TerminalKind::Resignation),
            RemoteStatus::Draw | RemoteStatus::Stalemate => Some(TerminalKind::Draw),
            RemoteStatus::Timeout | RemoteStatus::OutOfTime => Some(TerminalKind::Timeout),
            RemoteStatus::Aborted | RemoteStatus::NoStart => Some(TerminalKind::Aborted),
            RemoteStatus::Created | RemoteStatus::Started | RemoteStatus::Unknown(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_kind().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    /// Every move of the game so far, as UCI tokens.
    pub moves: Vec<String>,
    pub status: RemoteStatus,
    pub winner: Option<Color>,
    pub white_offers_draw: bool,
    pub black_offers_draw: bool,
}

impl StateUpdate {
    /// An in-progress update from a space separated move list.
    pub fn started(moves: &str) -> Self {
        Self {
            moves: moves.split_whitespace().map(String::from).collect(),
            status: RemoteStatus::Started,
            winner: None,
            white_offers_draw: false,
            black_offers_draw: false,
        }
    }

    pub fn with_status(mut self, status: RemoteStatus, winner: Option<Color>) -> Self {
        self.status = status;
        self.winner = winner;
        self
    }

    fn draw_offered_by(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_offers_draw,
            Color::Black => self.black_offers_draw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted { game_id: String, color: Color },
    State(StateUpdate),
    ChallengeDeclined { game_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Checkmate,
    Resignation,
    Draw,
    Timeout,
    Aborted,
}

impl TerminalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalKind::Checkmate => "checkmate",
            TerminalKind::Resignation => "resignation",
            TerminalKind::Draw => "draw",
            TerminalKind::Timeout => "timeout",
            TerminalKind::Aborted => "aborted",
        }
    }
}

/// The result from the local player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Drawn,
    NoResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalResult {
    pub kind: TerminalKind,
    pub winner: Option<Color>,
    pub outcome: Outcome,
}

impl TerminalResult {
    pub fn new(kind: TerminalKind, winner: Option<Color>, me: Color) -> Self {
        let outcome = match (winner, kind) {
            (Some(color), _) if color == me => Outcome::Won,
            (Some(_), _) => Outcome::Lost,
            (None, TerminalKind::Aborted) => Outcome::NoResult,
            (None, _) => Outcome::Drawn,
        };
        Self {
            kind,
            winner,
            outcome,
        }
    }

    /// Short sentence for announcing the result.
    pub fn describe(&self) -> String {
        let verdict = match self.outcome {
            Outcome::Won => "you won",
            Outcome::Lost => "you lost",
            Outcome::Drawn => "it is a draw",
            Outcome::NoResult => "no result",
        };
        format!("Game over by {}, {}", self.kind.as_str(), verdict)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    AwaitingStart,
    InProgress,
    Finished(TerminalResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    Me,
    Opponent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub token: MoveToken,
    pub san: String,
    pub mover: Mover,
    /// The side to move is in check after this move.
    pub check: bool,
    /// 1-based half-move number.
    pub ply: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameUpdate {
    MoveApplied(AppliedMove),
    DrawOffered { by: Color },
    Finished(TerminalResult),
}

/// Local replica of a remote game.
#[derive(Debug, Clone)]
pub struct GameState<B: BoardLike = Chess> {
    game_id: Option<String>,
    my_color: Option<Color>,
    board: B,
    moves: Vec<MoveToken>,
    sans: Vec<String>,
    my_turn: bool,
    status: GameStatus,
    opponent_draw_offer: bool,
}

impl GameState<Chess> {
    pub fn new() -> Self {
        Self::with_board(Chess::default())
    }
}

impl Default for GameState<Chess> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BoardLike> GameState<B> {
    /// `board` must be the starting position of the game.
    pub fn with_board(board: B) -> Self {
        Self {
            game_id: None,
            my_color: None,
            board,
            moves: Vec::new(),
            sans: Vec::new(),
            my_turn: false,
            status: GameStatus::AwaitingStart,
            opponent_draw_offer: false,
        }
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    pub fn my_color(&self) -> Option<Color> {
        self.my_color
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn moves(&self) -> &[MoveToken] {
        &self.moves
    }

    /// SAN of every applied move, in order, with check suffixes.
    pub fn history_san(&self) -> &[String] {
        &self.sans
    }

    pub fn is_my_turn(&self) -> bool {
        self.my_turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The opponent has a draw offer on the table.
    pub fn opponent_offers_draw(&self) -> bool {
        self.opponent_draw_offer
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, GameStatus::Finished(_))
    }

    /// Feeds one remote event into the replica.
    ///
    /// Returns the single notable thing the event caused, if any. An error
    /// here means the replica can no longer be trusted.
    pub fn apply_event(&mut self, event: &GameEvent) -> Result<Option<GameUpdate>> {
        match event {
            GameEvent::GameStarted { game_id, color } => {
                self.start(game_id, *color);
                Ok(None)
            }
            GameEvent::ChallengeDeclined { game_id } => {
                warn!(game_id, "challenge declined");
                Err(Error::ChallengeDeclined)
            }
            GameEvent::State(update) => self.apply_state(update),
        }
    }

    fn start(&mut self, game_id: &str, color: Color) {
        if let Some(existing) = self.my_color {
            warn!(game_id, ?existing, "duplicate game start ignored");
            return;
        }
        self.game_id = Some(game_id.to_string());
        self.my_color = Some(color);
        self.status = GameStatus::InProgress;
        self.refresh_turn(color);
        info!(game_id, ?color, "game started");
    }

    fn apply_state(&mut self, update: &StateUpdate) -> Result<Option<GameUpdate>> {
        if let GameStatus::Finished(result) = self.status {
            debug!(?result, "state after game end ignored");
            return Ok(None);
        }
        let me = self.my_color.ok_or(Error::NotStarted)?;

        // The final move arrives with the final status, so it is replayed
        // first; a replica that cannot follow is fatal even then.
        let synced = self.sync_moves(&update.moves)?;
        self.refresh_turn(me);

        if let Some(kind) = update.status.terminal_kind() {
            let winner = update.winner.or_else(|| {
                (kind == TerminalKind::Checkmate && self.board.in_checkmate())
                    .then(|| !self.board.side_to_move())
            });
            let result = TerminalResult::new(kind, winner, me);
            self.status = GameStatus::Finished(result);
            info!(kind = kind.as_str(), ?winner, outcome = ?result.outcome, "game finished");
            return Ok(Some(GameUpdate::Finished(result)));
        }
        if let RemoteStatus::Unknown(status) = &update.status {
            warn!(status, "unknown game status, treating as in progress");
        }

        if let Some(applied) = synced {
            self.opponent_draw_offer = false;
            return Ok(Some(GameUpdate::MoveApplied(applied)));
        }

        let opponent = !me;
        let offered = update.draw_offered_by(opponent);
        let fresh = offered && !self.opponent_draw_offer;
        self.opponent_draw_offer = offered;
        if fresh {
            info!(by = ?opponent, "draw offered");
            return Ok(Some(GameUpdate::DrawOffered { by: opponent }));
        }
        Ok(None)
    }

    /// Applies the unseen tail of `remote`, returning the last applied move.
    fn sync_moves(&mut self, remote: &[String]) -> Result<Option<AppliedMove>> {
        let seen = self.moves.len();
        if remote.len() <= seen {
            if remote.len() < seen {
                warn!(remote = remote.len(), local = seen, "shorter move list ignored");
            }
            return Ok(None);
        }

        for (ply, (local, reported)) in self.moves.iter().zip(remote).enumerate() {
            if local.to_string() != *reported {
                return Err(self.desync(ply + 1, reported, "move list was rewritten".to_string()));
            }
        }

        let mut last = None;
        for (index, reported) in remote.iter().enumerate().skip(seen) {
            let ply = index + 1;
            let token: MoveToken = reported
                .parse()
                .map_err(|e: ValidationError| self.desync(ply, reported, e.to_string()))?;
            let san = self
                .board
                .token_to_san(&token)
                .map_err(|e| self.desync(ply, reported, e.to_string()))?;
            self.board
                .apply_token(&token)
                .map_err(|e| self.desync(ply, reported, e.to_string()))?;
            self.moves.push(token);
            self.sans.push(san.clone());
            debug!(ply, %token, %san, "replica advanced");
            last = Some((token, san, ply));
        }

        let Some((token, san, ply)) = last else {
            return Ok(None);
        };
        let me = self.my_color.ok_or(Error::NotStarted)?;
        self.refresh_turn(me);
        // Whoever is to move now did not make the last move.
        let mover = if self.my_turn {
            Mover::Opponent
        } else {
            Mover::Me
        };
        info!(ply, %token, %san, ?mover, "move applied");
        Ok(Some(AppliedMove {
            token,
            san,
            mover,
            check: self.board.in_check(),
            ply,
        }))
    }

    fn refresh_turn(&mut self, me: Color) {
        self.my_turn = (self.moves.len() % 2 == 0) == (me == Color::White);
    }

    fn desync(&self, ply: usize, token: &str, reason: String) -> Error {
        error!(ply, token, %reason, "board replica out of sync");
        Error::Desync {
            ply,
            token: token.to_string(),
            reason,
        }
    }
}
