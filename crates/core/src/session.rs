//! Playing a game by voice
//!
//! [`MovePrompter`] turns speech into one legal move with retries.
//! [`GameDriver`] runs a whole game: every remote event goes through one
//! loop that owns the [`GameState`], so the board is never validated against
//! while it is being updated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shakmaty::Color;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::board::{resolve_move, BoardLike, MoveToken};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::game::{GameEvent, GameState, GameUpdate, Mover, TerminalResult};
use crate::lichess::{EventReceiver, GameService};
use crate::notation::spoken;
use crate::speech::{SpeechIn, SpeechOut};
use crate::voice::{ParsedCommand, SessionCommand, VoiceParser, Vocabulary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Move {
        token: MoveToken,
        command: ParsedCommand,
    },
    Session(SessionCommand),
    GaveUp,
    Cancelled,
}

pub struct MovePrompter<'v> {
    parser: VoiceParser<'v>,
    listen_timeout: Duration,
    max_attempts: u32,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'v> MovePrompter<'v> {
    pub fn new(parser: VoiceParser<'v>, listen_timeout: Duration, max_attempts: u32) -> Self {
        Self {
            parser,
            listen_timeout,
            max_attempts: max_attempts.max(1),
            cancel: None,
        }
    }

    /// Checked before every listen; once set the prompt returns `Cancelled`.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Asks for a move until one validates on `board`, a session command is
    /// heard, or the attempts run out.
    pub async fn prompt<B, I, O>(
        &self,
        board: &B,
        input: &mut I,
        output: &mut O,
    ) -> Result<PromptOutcome>
    where
        B: BoardLike + ?Sized,
        I: SpeechIn + ?Sized,
        O: SpeechOut + ?Sized,
    {
        say(output, "Your move.").await;

        for attempt in 1..=self.max_attempts {
            if self.cancelled() {
                debug!(attempt, "prompt cancelled");
                return Ok(PromptOutcome::Cancelled);
            }

            let heard = match input.listen(self.listen_timeout).await {
                Ok(heard) => heard,
                Err(err) if err.is_recoverable() => {
                    warn!(attempt, error = %err, "speech input failed");
                    say(output, "Sorry, I couldn't hear you. Please say your move again.").await;
                    continue;
                }
                Err(err) => return Err(err),
            };
            if self.cancelled() {
                debug!(attempt, "prompt cancelled");
                return Ok(PromptOutcome::Cancelled);
            }
            let Some(transcript) = heard else {
                debug!(attempt, "silence");
                say(output, "I didn't hear anything. Please say your move.").await;
                continue;
            };

            let trace = self.parser.trace(&transcript);
            let command = match trace.result {
                Ok(ParsedCommand::Session(cmd)) => {
                    info!(command = cmd.as_str(), "session command");
                    return Ok(PromptOutcome::Session(cmd));
                }
                Ok(command) => command,
                Err(err) => {
                    debug!(attempt, stage = %err.stage(), error = %err, "no move heard");
                    say(output, err.hint()).await;
                    continue;
                }
            };

            match resolve_move(&command, board) {
                Ok(token) => {
                    info!(%token, san = ?command.san(), "move recognized");
                    return Ok(PromptOutcome::Move { token, command });
                }
                Err(err) => {
                    debug!(attempt, error = %err, "move not legal");
                    let phrase = command
                        .san()
                        .and_then(|san| spoken(&san))
                        .unwrap_or_else(|| "That".to_string());
                    say(output, &format!("{} is not legal here. Please try again.", phrase)).await;
                }
            }
        }

        warn!(attempts = self.max_attempts, "no valid move");
        Ok(PromptOutcome::GaveUp)
    }
}

/// Speech output is fire and forget.
async fn say<O: SpeechOut + ?Sized>(output: &mut O, text: &str) {
    if let Err(err) = output.say(text).await {
        warn!(error = %err, text, "speech output failed");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Finished(TerminalResult),
    Exited,
    Declined,
    /// The player never produced a valid move.
    Abandoned,
}

pub struct GameDriver<S: ?Sized, I, O> {
    service: Arc<S>,
    input: I,
    output: O,
    vocab: &'static Vocabulary,
    listen_timeout: Duration,
    max_attempts: u32,
}

impl<S, I, O> GameDriver<S, I, O>
where
    S: GameService + ?Sized + 'static,
    I: SpeechIn,
    O: SpeechOut,
{
    pub fn new(service: Arc<S>, input: I, output: O) -> Self {
        let defaults = Config::default();
        Self {
            service,
            input,
            output,
            vocab: Vocabulary::shared(),
            listen_timeout: defaults.listen_timeout,
            max_attempts: defaults.max_attempts,
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.listen_timeout = config.listen_timeout;
        self.max_attempts = config.max_attempts;
        self
    }

    /// Waits for a game to start, then plays it. With `game_id` set, only
    /// that game (or a declined challenge with that id) counts.
    pub async fn play(&mut self, game_id: Option<&str>) -> Result<SessionEnd> {
        match self.wait_for_start(game_id).await? {
            Some((id, color)) => self.run_game(&id, color).await,
            None => {
                say(&mut self.output, "The challenge was declined.").await;
                Ok(SessionEnd::Declined)
            }
        }
    }

    async fn wait_for_start(&mut self, wanted: Option<&str>) -> Result<Option<(String, Color)>> {
        let mut events = self.service.incoming_events().await?;
        while let Some(event) = events.recv().await {
            match event? {
                GameEvent::GameStarted { game_id, color }
                    if wanted.map_or(true, |w| w == game_id) =>
                {
                    return Ok(Some((game_id, color)));
                }
                GameEvent::ChallengeDeclined { game_id } if wanted == Some(game_id.as_str()) => {
                    return Ok(None);
                }
                other => debug!(?other, "waiting for game start"),
            }
        }
        Err(Error::StreamClosed)
    }

    pub async fn run_game(&mut self, game_id: &str, color: Color) -> Result<SessionEnd> {
        let mut game = GameState::new();
        game.apply_event(&GameEvent::GameStarted {
            game_id: game_id.to_string(),
            color,
        })?;
        let side = match color {
            Color::White => "white",
            Color::Black => "black",
        };
        say(&mut self.output, &format!("Game started. You play {}.", side)).await;

        let stream = self.service.game_events(game_id).await?;
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, mut events) = mpsc::channel(64);
        let forwarder = tokio::spawn(forward(stream, tx, Arc::clone(&cancel)));

        let prompter = MovePrompter::new(
            VoiceParser::new(self.vocab),
            self.listen_timeout,
            self.max_attempts,
        )
        .with_cancel(Arc::clone(&cancel));

        let result = self
            .event_loop(game_id, &mut game, &mut events, &prompter, &cancel)
            .await;
        forwarder.abort();

        if !game.history_san().is_empty() {
            info!(game_id, moves = %game.history_san().join(" "), "game record");
        }
        result
    }

    async fn event_loop(
        &mut self,
        game_id: &str,
        game: &mut GameState,
        events: &mut EventReceiver,
        prompter: &MovePrompter<'_>,
        cancel: &AtomicBool,
    ) -> Result<SessionEnd> {
        // Ply of the move we sent, until the server's move list reaches it.
        // The echo may arrive together with the opponent's reply.
        let mut pending_ply: Option<usize> = None;
        // A resignation or accepted draw was sent; only the result is left.
        let mut awaiting_result = false;
        // No prompting before the first full state has been replayed.
        let mut synced = false;

        loop {
            let can_move = synced
                && game.is_my_turn()
                && pending_ply.is_none()
                && !awaiting_result
                && !cancel.load(Ordering::SeqCst);
            let next = if can_move {
                match events.try_recv() {
                    Ok(event) => Some(event),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => return Err(Error::StreamClosed),
                }
            } else {
                Some(events.recv().await.ok_or(Error::StreamClosed)?)
            };

            if let Some(event) = next {
                let event = event?;
                synced |= matches!(event, GameEvent::State(_));
                let update = game.apply_event(&event)?;
                if pending_ply.is_some_and(|ply| game.moves().len() >= ply) {
                    pending_ply = None;
                }
                match update {
                    Some(GameUpdate::MoveApplied(applied)) => {
                        if applied.mover == Mover::Opponent {
                            let phrase = spoken(&applied.san).unwrap_or(applied.san);
                            say(&mut self.output, &format!("Opponent played {}.", phrase)).await;
                        }
                    }
                    Some(GameUpdate::DrawOffered { .. }) => {
                        say(
                            &mut self.output,
                            "Your opponent offers a draw. Say accept draw or decline draw.",
                        )
                        .await;
                    }
                    Some(GameUpdate::Finished(result)) => {
                        say(&mut self.output, &format!("{}.", result.describe())).await;
                        return Ok(SessionEnd::Finished(result));
                    }
                    None => {}
                }
                continue;
            }

            let outcome = prompter
                .prompt(game.board(), &mut self.input, &mut self.output)
                .await?;
            match outcome {
                PromptOutcome::Move { token, .. } => {
                    match self.service.submit_move(game_id, &token).await {
                        Ok(()) => pending_ply = Some(game.moves().len() + 1),
                        Err(err) if err.is_recoverable() => {
                            warn!(%token, error = %err, "move refused by server");
                            say(&mut self.output, "The server refused that move. Please try again.")
                                .await;
                        }
                        Err(err) => return Err(err),
                    }
                }
                PromptOutcome::Session(SessionCommand::Exit) => {
                    // Lichess only allows aborting before both sides have moved.
                    if game.moves().len() < 2 {
                        match self.service.abort(game_id).await {
                            Ok(()) => info!(game_id, "game aborted on exit"),
                            Err(err) => warn!(game_id, error = %err, "abort failed"),
                        }
                    }
                    say(&mut self.output, "Goodbye.").await;
                    return Ok(SessionEnd::Exited);
                }
                PromptOutcome::Session(SessionCommand::Resign) => {
                    self.service.resign(game_id).await?;
                    awaiting_result = true;
                }
                PromptOutcome::Session(SessionCommand::OfferDraw) => {
                    self.service.answer_draw(game_id, true).await?;
                    say(&mut self.output, "Draw offered. Now say your move.").await;
                }
                PromptOutcome::Session(SessionCommand::AcceptDraw) => {
                    self.service.answer_draw(game_id, true).await?;
                    if game.opponent_offers_draw() {
                        awaiting_result = true;
                    } else {
                        say(&mut self.output, "Draw offered. Now say your move.").await;
                    }
                }
                PromptOutcome::Session(SessionCommand::DeclineDraw) => {
                    self.service.answer_draw(game_id, false).await?;
                    say(&mut self.output, "Draw declined.").await;
                }
                PromptOutcome::GaveUp => {
                    say(&mut self.output, "Let's stop here.").await;
                    return Ok(SessionEnd::Abandoned);
                }
                PromptOutcome::Cancelled => {}
            }
        }
    }
}

/// Relays remote events to the driver loop and raises `cancel` as soon as a
/// game-ending status arrives, so a pending prompt stops retrying.
async fn forward(
    mut stream: EventReceiver,
    tx: mpsc::Sender<Result<GameEvent>>,
    cancel: Arc<AtomicBool>,
) {
    while let Some(event) = stream.recv().await {
        if let Ok(GameEvent::State(update)) = &event {
            if update.status.is_terminal() {
                cancel.store(true, Ordering::SeqCst);
            }
        }
        if tx.send(event).await.is_err() {
            return;
        }
    }
}
