//! Play a Lichess game by voice, with the console standing in for the
//! microphone and the speaker.
//!
//! Usage: voice_game [game_id]
//!
//! Without a game id, challenges `LICHESS_OPPONENT` if set, otherwise plays
//! the next game that starts on the account.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use voice_chess_core::speech::{SpeechIn, SpeechOut};
use voice_chess_core::{Config, Error, GameDriver, LichessClient, Result};

struct ConsoleIn {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleIn {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl SpeechIn for ConsoleIn {
    async fn listen(&mut self, timeout: Duration) -> Result<Option<String>> {
        match tokio::time::timeout(timeout, self.lines.next_line()).await {
            Err(_) => Ok(None),
            Ok(Ok(Some(line))) => Ok(Some(line.to_lowercase())),
            Ok(Ok(None)) => Err(Error::Speech("console input closed".to_string())),
            Ok(Err(e)) => Err(Error::Io(e)),
        }
    }
}

struct ConsoleOut;

#[async_trait]
impl SpeechOut for ConsoleOut {
    async fn say(&mut self, text: &str) -> Result<()> {
        println!("> {}", text);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error [{}]: {}", e.stage(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    config.require_token()?;
    let client = Arc::new(LichessClient::from_config(&config)?);

    let game_id = match (std::env::args().nth(1), &config.opponent) {
        (Some(id), _) => Some(id),
        (None, Some(opponent)) => Some(client.challenge(opponent).await?),
        (None, None) => None,
    };
    match &game_id {
        Some(id) => println!("Waiting for game {}...", id),
        None => println!("Waiting for a game to start..."),
    }

    let mut driver = GameDriver::new(client, ConsoleIn::new(), ConsoleOut).with_config(&config);
    let end = driver.play(game_id.as_deref()).await?;
    println!("Session ended: {:?}", end);
    Ok(())
}
