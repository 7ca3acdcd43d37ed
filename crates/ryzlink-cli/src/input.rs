//! Line input from stdin
//!
//! Stdin is read on its own thread so a pending read never holds up runtime
//! shutdown once the session has ended.

use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

/// Prompted line reader
pub struct Input {
    lines: mpsc::UnboundedReceiver<String>,
}

impl Input {
    /// Start reading stdin
    pub fn stdin() -> Self {
        let (tx, lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines }
    }

    /// Input fed from a channel instead of stdin
    #[cfg(test)]
    pub fn from_channel(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self { lines }
    }

    /// Show `prompt` and wait for the next line; `None` at end of input
    pub async fn prompt(&mut self, prompt: &str) -> Option<String> {
        Self::show(prompt);
        self.next_line().await
    }

    /// Print `prompt` without waiting
    pub fn show(prompt: &str) {
        print!("{}", prompt);
        let _ = io::stdout().flush();
    }

    /// Next line without a prompt. Cancel safe, so it can sit in a `select!`.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}
