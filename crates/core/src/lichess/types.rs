//! Lichess Board API data types

use serde::Deserialize;
use shakmaty::Color;
use tracing::warn;

use crate::game::{GameEvent, RemoteStatus, StateUpdate};

/// One line of an ndjson event or game stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LichessEvent {
    GameStart {
        game: GameInfo,
    },
    GameFinish {
        game: GameInfo,
    },
    ChallengeDeclined {
        challenge: ChallengeInfo,
    },
    GameFull {
        id: String,
        state: GameStateEvent,
    },
    GameState(GameStateEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl GameInfo {
    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeInfo {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameStateEvent {
    #[serde(default)]
    pub moves: String,
    pub status: String,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub wdraw: bool,
    #[serde(default)]
    pub bdraw: bool,
}

pub fn parse_color(name: &str) -> Option<Color> {
    match name {
        "white" => Some(Color::White),
        "black" => Some(Color::Black),
        _ => None,
    }
}

impl From<GameStateEvent> for StateUpdate {
    fn from(event: GameStateEvent) -> Self {
        StateUpdate {
            moves: event.moves.split_whitespace().map(String::from).collect(),
            status: RemoteStatus::from_lichess(&event.status),
            winner: event.winner.as_deref().and_then(parse_color),
            white_offers_draw: event.wdraw,
            black_offers_draw: event.bdraw,
        }
    }
}

impl LichessEvent {
    /// The part of a Lichess event the game state cares about.
    pub fn into_game_event(self) -> Option<GameEvent> {
        match self {
            LichessEvent::GameStart { game } => {
                let Some(game_id) = game.game_id() else {
                    warn!(?game, "gameStart without a game id");
                    return None;
                };
                let Some(color) = game.color.as_deref().and_then(parse_color) else {
                    warn!(game_id, "gameStart without a usable color");
                    return None;
                };
                Some(GameEvent::GameStarted {
                    game_id: game_id.to_string(),
                    color,
                })
            }
            LichessEvent::ChallengeDeclined { challenge } => Some(GameEvent::ChallengeDeclined {
                game_id: challenge.id,
            }),
            LichessEvent::GameFull { state, .. } | LichessEvent::GameState(state) => {
                Some(GameEvent::State(state.into()))
            }
            LichessEvent::GameFinish { .. } | LichessEvent::Other => None,
        }
    }
}

/// Error body returned by the API, e.g. `{"error":"Not your turn"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_start() {
        let line = r#"{"type":"gameStart","game":{"gameId":"rCRw1AuO","fullId":"rCRw1AuOvonq","color":"black","fen":"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1","isMyTurn":false}}"#;
        let event: LichessEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event.into_game_event(),
            Some(GameEvent::GameStarted {
                game_id: "rCRw1AuO".to_string(),
                color: Color::Black,
            })
        );
    }

    #[test]
    fn test_game_full_and_state() {
        let full = r#"{"type":"gameFull","id":"rCRw1AuO","white":{"id":"bob","name":"bob"},"black":{"id":"alice","name":"alice"},"initialFen":"startpos","state":{"type":"gameState","moves":"e2e4 e7e5","wtime":300000,"btime":300000,"winc":0,"binc":0,"status":"started"}}"#;
        let event: LichessEvent = serde_json::from_str(full).unwrap();
        match event.into_game_event() {
            Some(GameEvent::State(update)) => {
                assert_eq!(update.moves, ["e2e4", "e7e5"]);
                assert_eq!(update.status, RemoteStatus::Started);
            }
            other => panic!("unexpected {other:?}"),
        }

        let state = r#"{"type":"gameState","moves":"e2e4 e7e5 d1h5","status":"resign","winner":"black","bdraw":true}"#;
        let event: LichessEvent = serde_json::from_str(state).unwrap();
        match event.into_game_event() {
            Some(GameEvent::State(update)) => {
                assert_eq!(update.moves.len(), 3);
                assert_eq!(update.status, RemoteStatus::Resign);
                assert_eq!(update.winner, Some(Color::Black));
                assert!(update.black_offers_draw);
                assert!(!update.white_offers_draw);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_challenge_declined() {
        let line = r#"{"type":"challengeDeclined","challenge":{"id":"H9fIRZUk","status":"declined"}}"#;
        let event: LichessEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event.into_game_event(),
            Some(GameEvent::ChallengeDeclined {
                game_id: "H9fIRZUk".to_string(),
            })
        );
    }

    #[test]
    fn test_ignored_events() {
        for line in [
            r#"{"type":"chatLine","room":"player","username":"bob","text":"hi"}"#,
            r#"{"type":"challenge","challenge":{"id":"x"}}"#,
            r#"{"type":"gameFinish","game":{"gameId":"rCRw1AuO"}}"#,
        ] {
            let event: LichessEvent = serde_json::from_str(line).unwrap();
            assert_eq!(event.into_game_event(), None, "{line}");
        }
    }

    #[test]
    fn test_game_start_without_color_is_dropped() {
        let line = r#"{"type":"gameStart","game":{"id":"rCRw1AuO"}}"#;
        let event: LichessEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.into_game_event(), None);
    }
}
