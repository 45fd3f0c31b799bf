use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

use crate::models::chat::ChatMessage;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful health assistant for a university health center. \
You provide general health information, answer questions about appointments, and guide students \
on health center services. Always advise users to consult with healthcare professionals for \
serious medical concerns. Be empathetic, clear, and professional.";

/// Number of stored messages replayed to the model on each turn.
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

#[derive(Debug)]
pub enum PromptError {
    MissingSystemPrompt(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::MissingSystemPrompt(path) =>
                write!(f, "Prompts file '{}' has no system_prompt", path),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

#[derive(Deserialize)]
struct PromptFile {
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    context_window: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub context_window: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl PromptConfig {
    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Builds the outbound message list: the system instruction, the most recent
    /// `context_window` history entries in their stored order, then the new user turn.
    pub fn assemble(&self, history: &[ChatMessage], user_message: &str) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(self.context_window);
        let window = &history[start..];

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(window.iter().cloned());
        messages.push(ChatMessage::user(user_message));
        messages
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let path = path.as_ref();
    let file_content = fs::read_to_string(path)?;
    let file: PromptFile = serde_json::from_str(&file_content)?;

    let system_prompt = file.system_prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| PromptError::MissingSystemPrompt(path.display().to_string()))?;

    let config = PromptConfig {
        system_prompt,
        context_window: file.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW),
    };
    info!(
        "Loaded system prompt from {} (context window: {})",
        path.display(),
        config.context_window
    );
    Ok(Arc::new(config))
}
