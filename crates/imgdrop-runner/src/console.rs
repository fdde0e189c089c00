//! Interactive console (allows scripted answers in tests)

use async_trait::async_trait;
use imgdrop_core::{DropError, Result};
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// The one place the run waits on a human
#[async_trait]
pub trait Console: Send {
    /// Show `message` and block until a line is read; the line is returned trimmed
    async fn prompt(&mut self, message: &str) -> Result<String>;

    /// Print one line
    fn say(&mut self, line: &str);
}

/// Console over the process's stdin and stdout
pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn prompt(&mut self, message: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(message.as_bytes()).await?;
        stdout.flush().await?;

        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(DropError::Fatal("stdin closed while waiting for input".to_string())),
        }
    }

    fn say(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Console answering prompts from a fixed script
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Lines printed so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn prompt(&mut self, message: &str) -> Result<String> {
        self.prompts.push(message.to_string());
        self.answers
            .pop_front()
            .map(|answer| answer.trim().to_string())
            .ok_or_else(|| DropError::Fatal(format!("no scripted answer for prompt: {}", message)))
    }

    fn say(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_answers_in_order() {
        let mut console = ScriptedConsole::new(["3", "  a.jpg "]);

        assert_eq!(console.prompt("choice: ").await.unwrap(), "3");
        assert_eq!(console.prompt("file: ").await.unwrap(), "a.jpg");
        assert_eq!(console.prompts(), &["choice: ", "file: "]);
        assert_eq!(console.remaining(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_fatal() {
        let mut console = ScriptedConsole::default();
        let err = console.prompt("press enter").await.unwrap_err();
        assert!(matches!(err, DropError::Fatal(_)));
    }

    #[test]
    fn test_say_is_recorded() {
        let mut console = ScriptedConsole::default();
        console.say("1. Retry all failed uploads");
        assert_eq!(console.output().len(), 1);
    }
}
