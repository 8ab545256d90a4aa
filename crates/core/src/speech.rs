//! Speech collaborators
//!
//! The core never talks to audio hardware. Whatever recognizes and speaks
//! text plugs in through these two traits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait SpeechIn: Send {
    /// Waits at most `timeout` for one utterance. Silence is `Ok(None)`;
    /// errors are reserved for device or service failures.
    async fn listen(&mut self, timeout: Duration) -> Result<Option<String>>;
}

#[async_trait]
pub trait SpeechOut: Send {
    async fn say(&mut self, text: &str) -> Result<()>;
}

/// Replays fixed transcripts in order, then stays silent.
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    script: VecDeque<Option<String>>,
}

impl ScriptedSpeech {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines.into_iter().map(|line| Some(line.into())).collect(),
        }
    }

    pub fn then_silence(mut self) -> Self {
        self.script.push_back(None);
        self
    }

    pub fn then(mut self, line: &str) -> Self {
        self.script.push_back(Some(line.to_string()));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[async_trait]
impl SpeechIn for ScriptedSpeech {
    async fn listen(&mut self, _timeout: Duration) -> Result<Option<String>> {
        Ok(self.script.pop_front().flatten())
    }
}

/// Keeps everything said. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct SpokenLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl SpokenLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.lines().iter().any(|line| line.contains(fragment))
    }
}

#[async_trait]
impl SpeechOut for SpokenLog {
    async fn say(&mut self, text: &str) -> Result<()> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
        Ok(())
    }
}
