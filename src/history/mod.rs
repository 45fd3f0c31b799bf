mod memory;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::models::chat::{ ChatMessage, Role };

pub use memory::MemoryHistoryStore;

/// Most recent messages retained per conversation.
pub const DEFAULT_MAX_MESSAGES: usize = 50;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one message, creating the conversation on first use.
    async fn add_message(&self, conversation_id: &str, role: Role, content: &str);

    /// Returns the stored messages oldest-first; unknown ids yield an empty list.
    async fn get_messages(&self, conversation_id: &str) -> Vec<ChatMessage>;

    async fn clear_conversation(&self, conversation_id: &str);
}

pub fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    if args.history_max_messages == 0 {
        return Err("HISTORY_MAX_MESSAGES must be at least 1".into());
    }
    let store = MemoryHistoryStore::new(args.history_max_messages);
    info!("Chat history kept in memory, {} messages per conversation", store.max_messages());
    Ok(Arc::new(store))
}
