//! Interactive prompts.
//!
//! The engine asks the user for input in exactly two situations: a feature
//! branch without a known parent, and a squash merge whose commits have
//! several authors. Both go through the [`UserDialog`] trait so commands
//! can be tested without a terminal.

use async_trait::async_trait;
use std::io::Write;

use crate::error::EngineError;

#[async_trait]
pub trait UserDialog: Send + Sync {
    /// Ask which of the candidate branches is the parent of `branch`.
    async fn select_parent_branch(
        &self,
        branch: &str,
        candidates: &[String],
    ) -> Result<String, EngineError>;

    /// Ask which author to attribute a squash commit to.
    async fn select_squash_author(
        &self,
        branch: &str,
        authors: &[String],
    ) -> Result<String, EngineError>;
}

/// Numbered-list prompt on stdin/stdout.
pub struct TerminalDialog;

impl TerminalDialog {
    fn choose(prompt: &str, options: &[String]) -> Result<String, EngineError> {
        loop {
            println!("{prompt}");
            for (index, option) in options.iter().enumerate() {
                println!("  {}: {option}", index + 1);
            }
            print!("> ");
            std::io::stdout().flush()?;
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            let input = input.trim();
            if input.is_empty() {
                return Err(EngineError::DialogAborted(
                    "no selection made".to_string(),
                ));
            }
            match input.parse::<usize>() {
                Ok(index) if index >= 1 && index <= options.len() => {
                    return Ok(options[index - 1].clone());
                }
                _ => {
                    if let Some(option) = options.iter().find(|option| option.as_str() == input) {
                        return Ok(option.clone());
                    }
                    println!("invalid selection: {input:?}");
                }
            }
        }
    }
}

#[async_trait]
impl UserDialog for TerminalDialog {
    async fn select_parent_branch(
        &self,
        branch: &str,
        candidates: &[String],
    ) -> Result<String, EngineError> {
        let prompt = format!("Please specify the parent branch of {branch:?}:");
        Self::choose(&prompt, candidates)
    }

    async fn select_squash_author(
        &self,
        branch: &str,
        authors: &[String],
    ) -> Result<String, EngineError> {
        let prompt = format!("Please choose an author for the squash commit of {branch:?}:");
        Self::choose(&prompt, authors)
    }
}

/// Canned answers for tests and non-interactive use.
pub struct StaticDialog {
    pub parent_branch: Option<String>,
    pub squash_author: Option<String>,
}

impl StaticDialog {
    pub fn none() -> Self {
        Self {
            parent_branch: None,
            squash_author: None,
        }
    }
}

#[async_trait]
impl UserDialog for StaticDialog {
    async fn select_parent_branch(
        &self,
        branch: &str,
        _candidates: &[String],
    ) -> Result<String, EngineError> {
        self.parent_branch.clone().ok_or_else(|| {
            EngineError::DialogAborted(format!("no parent branch configured for {branch:?}"))
        })
    }

    async fn select_squash_author(
        &self,
        branch: &str,
        _authors: &[String],
    ) -> Result<String, EngineError> {
        self.squash_author.clone().ok_or_else(|| {
            EngineError::DialogAborted(format!("no squash author configured for {branch:?}"))
        })
    }
}
