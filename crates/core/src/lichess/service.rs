//! Remote game service contract

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::board::MoveToken;
use crate::error::Result;
use crate::game::GameEvent;

/// Ordered events from one remote stream. The channel closing means the
/// stream ended.
pub type EventReceiver = mpsc::Receiver<Result<GameEvent>>;

#[async_trait]
pub trait GameService: Send + Sync {
    /// Account-wide events: game starts and declined challenges.
    async fn incoming_events(&self) -> Result<EventReceiver>;

    /// Full state first, then one state update per change.
    async fn game_events(&self, game_id: &str) -> Result<EventReceiver>;

    /// Fails with [`crate::Error::MoveRejected`] when the server refuses the move.
    async fn submit_move(&self, game_id: &str, token: &MoveToken) -> Result<()>;

    async fn resign(&self, game_id: &str) -> Result<()>;

    /// Accepting with no pending offer makes an offer.
    async fn answer_draw(&self, game_id: &str, accept: bool) -> Result<()>;

    async fn abort(&self, game_id: &str) -> Result<()>;
}
