//! Terminal transport for the interview: questions on stdout, answers from
//! stdin, one line per answer.

use anyhow::Context;
use async_trait::async_trait;
use grantflow_core::interview::{Notifier, QuestionAsker};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

pub struct StdinAsker {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinAsker {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

#[async_trait]
impl QuestionAsker for StdinAsker {
    async fn ask(&self, question: &str) -> anyhow::Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("\n❓ {}\n> ", question).as_bytes())
            .await?;
        stdout.flush().await?;

        let mut lines = self.lines.lock().await;
        let answer = lines
            .next_line()
            .await
            .context("Failed to read answer")?
            .ok_or_else(|| anyhow::anyhow!("Input closed before the interview finished"))?;
        Ok(answer.trim().to_string())
    }
}

pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, message: &str) {
        println!("\n✅ {}", message);
    }
}
