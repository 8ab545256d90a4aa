//! Lichess Board API client
//!
//! Streams are newline-delimited JSON and stay open for the whole game, so
//! the HTTP client only has a connect timeout; one-shot requests carry their
//! own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::service::{EventReceiver, GameService};
use super::types::*;
use crate::board::MoveToken;
use crate::config::Config;
use crate::error::{Error, Result};

pub const LICHESS_API_BASE: &str = "https://lichess.org/api";

const EVENT_CHANNEL_SIZE: usize = 64;

pub struct LichessClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    request_timeout: Duration,
}

impl LichessClient {
    pub fn new() -> Result<Self> {
        Self::build(LICHESS_API_BASE, None, Duration::from_secs(30))
    }

    pub fn with_token(token: String) -> Result<Self> {
        Self::build(LICHESS_API_BASE, Some(token), Duration::from_secs(30))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(
            &config.api_base,
            config.api_token.clone(),
            config.http_timeout,
        )
    }

    fn build(base_url: &str, token: Option<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("voice-chess/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            request_timeout,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/x-ndjson"));

        if let Some(ref token) = self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Opens an ndjson stream and forwards every recognized event.
    async fn stream(&self, path: &str) -> Result<EventReceiver> {
        let url = self.url(path);
        let response = self.client.get(&url).headers(self.headers()).send().await?;
        let mut response = check_status(response).await?;
        info!(%url, "stream opened");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        tokio::spawn(async move {
            let mut buffer = NdjsonBuffer::default();
            loop {
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        for line in buffer.push(&bytes) {
                            let Some(event) =
                                parse_event_line(&line).and_then(LichessEvent::into_game_event)
                            else {
                                continue;
                            };
                            if tx.send(Ok(event)).await.is_err() {
                                debug!(%url, "stream receiver dropped");
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        debug!(%url, "stream ended");
                        return;
                    }
                    Err(e) => {
                        warn!(%url, error = %e, "stream failed");
                        let _ = tx.send(Err(Error::from(e))).await;
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }

    async fn post(&self, path: &str) -> Result<Response> {
        let response = self
            .client
            .post(self.url(path))
            .headers(self.headers())
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(response)
    }

    /// Challenges `username` to a casual game and returns the challenge id,
    /// which becomes the game id once accepted.
    pub async fn challenge(&self, username: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url(&format!("/challenge/{}", username)))
            .headers(self.headers())
            .timeout(self.request_timeout)
            .form(&[("rated", "false"), ("color", "random")])
            .send()
            .await?;
        let body: serde_json::Value = check_status(response).await?.json().await?;
        let id = body
            .get("challenge")
            .unwrap_or(&body)
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Lichess("challenge response without an id".to_string()))?;
        info!(username, challenge = id, "challenge sent");
        Ok(id.to_string())
    }
}

#[async_trait]
impl GameService for LichessClient {
    async fn incoming_events(&self) -> Result<EventReceiver> {
        self.stream("/stream/event").await
    }

    async fn game_events(&self, game_id: &str) -> Result<EventReceiver> {
        self.stream(&format!("/board/game/stream/{}", game_id)).await
    }

    async fn submit_move(&self, game_id: &str, token: &MoveToken) -> Result<()> {
        let response = self
            .post(&format!("/board/game/{}/move/{}", game_id, token))
            .await?;
        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            warn!(game_id, %token, %reason, "move rejected");
            return Err(Error::MoveRejected {
                token: token.to_string(),
                reason,
            });
        }
        check_status(response).await?;
        debug!(game_id, %token, "move submitted");
        Ok(())
    }

    async fn resign(&self, game_id: &str) -> Result<()> {
        check_status(self.post(&format!("/board/game/{}/resign", game_id)).await?).await?;
        info!(game_id, "resigned");
        Ok(())
    }

    async fn answer_draw(&self, game_id: &str, accept: bool) -> Result<()> {
        let answer = if accept { "yes" } else { "no" };
        check_status(
            self.post(&format!("/board/game/{}/draw/{}", game_id, answer))
                .await?,
        )
        .await?;
        info!(game_id, accept, "draw answered");
        Ok(())
    }

    async fn abort(&self, game_id: &str) -> Result<()> {
        check_status(self.post(&format!("/board/game/{}/abort", game_id)).await?).await?;
        info!(game_id, "aborted");
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(Error::Lichess(format!(
        "API error: {} - {}",
        status,
        response.text().await.unwrap_or_default()
    )))
}

/// Splits a byte stream into complete ndjson lines. Blank keep-alive lines
/// are dropped.
#[derive(Debug, Default)]
pub struct NdjsonBuffer {
    pending: Vec<u8>,
}

impl NdjsonBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// Malformed lines are logged and skipped rather than ending the stream.
pub fn parse_event_line(line: &str) -> Option<LichessEvent> {
    match serde_json::from_str::<LichessEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, line, "Failed to parse stream line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameEvent;

    #[test]
    fn test_buffer_joins_split_lines() {
        let mut buffer = NdjsonBuffer::default();
        assert!(buffer.push(b"{\"type\":\"gameSt").is_empty());
        let lines = buffer.push(b"ate\"}\n\n{\"a\":1}\n{\"b\"");
        assert_eq!(lines, ["{\"type\":\"gameState\"}", "{\"a\":1}"]);
        assert_eq!(buffer.push(b":2}\r\n"), ["{\"b\":2}"]);
    }

    #[test]
    fn test_keep_alive_lines_dropped() {
        let mut buffer = NdjsonBuffer::default();
        assert!(buffer.push(b"\n\n\n").is_empty());
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        assert!(parse_event_line("not json").is_none());
        assert!(parse_event_line(r#"{"no_type":true}"#).is_none());
        let event = parse_event_line(r#"{"type":"gameState","moves":"e2e4","status":"started"}"#);
        assert!(matches!(
            event.and_then(LichessEvent::into_game_event),
            Some(GameEvent::State(_))
        ));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            LichessClient::build("http://localhost:8080/api/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.url("/stream/event"),
            "http://localhost:8080/api/stream/event"
        );
    }

    #[test]
    fn test_headers_carry_token() {
        let client = LichessClient::with_token("lip_abc".to_string()).unwrap();
        let headers = client.headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer lip_abc");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/x-ndjson");

        let anonymous = LichessClient::new().unwrap();
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());
    }
}
