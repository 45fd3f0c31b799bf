use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ HistoryStore, DEFAULT_MAX_MESSAGES };
use crate::models::chat::{ ChatMessage, Role };

pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
    max_messages: usize,
}

impl MemoryHistoryStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_messages: max_messages.max(1),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn add_message(&self, conversation_id: &str, role: Role, content: &str) {
        let mut conversations = self.conversations.write().await;
        let messages = conversations.entry(conversation_id.to_string()).or_default();
        messages.push(ChatMessage::new(role, content));

        if messages.len() > self.max_messages {
            let excess = messages.len() - self.max_messages;
            messages.drain(..excess);
        }
        debug!(
            "Conversation {} now holds {} messages",
            conversation_id,
            messages.len()
        );
    }

    async fn get_messages(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.conversations.read().await.get(conversation_id).cloned().unwrap_or_default()
    }

    async fn clear_conversation(&self, conversation_id: &str) {
        if self.conversations.write().await.remove(conversation_id).is_some() {
            debug!("Cleared conversation {}", conversation_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nth_role(i: usize) -> Role {
        if i % 2 == 0 { Role::User } else { Role::Assistant }
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let store = MemoryHistoryStore::default();
        assert!(store.get_messages("unknown").await.is_empty());
    }

    #[tokio::test]
    async fn appends_in_order() {
        let store = MemoryHistoryStore::default();
        store.add_message("c1", Role::User, "hello").await;
        store.add_message("c1", Role::Assistant, "hi there").await;

        let messages = store.get_messages("c1").await;
        assert_eq!(messages, vec![ChatMessage::user("hello"), ChatMessage::assistant("hi there")]);
        assert!(store.get_messages("c2").await.is_empty());
    }

    #[tokio::test]
    async fn retains_last_messages_up_to_cap() {
        for n in [1, 49, 50, 51, 120] {
            let store = MemoryHistoryStore::default();
            for i in 0..n {
                store.add_message("c", nth_role(i), &format!("m{}", i)).await;
            }

            let messages = store.get_messages("c").await;
            let kept = n.min(50);
            assert_eq!(messages.len(), kept, "after {} appends", n);

            let expected: Vec<ChatMessage> = (n - kept..n)
                .map(|i| ChatMessage::new(nth_role(i), format!("m{}", i)))
                .collect();
            assert_eq!(messages, expected);
        }
    }

    #[tokio::test]
    async fn fifty_five_alternating_messages_keep_the_last_fifty() {
        let store = MemoryHistoryStore::default();
        for i in 1..=55 {
            store.add_message("c1", nth_role(i - 1), &format!("message {}", i)).await;
        }

        let messages = store.get_messages("c1").await;
        assert_eq!(messages.len(), 50);
        assert_eq!(messages[0], ChatMessage::assistant("message 6"));
        assert_eq!(messages[49], ChatMessage::user("message 55"));
    }

    #[tokio::test]
    async fn clear_removes_conversation() {
        let store = MemoryHistoryStore::default();
        store.add_message("c1", Role::User, "hello").await;
        store.add_message("c2", Role::User, "other").await;

        store.clear_conversation("c1").await;
        assert!(store.get_messages("c1").await.is_empty());
        assert_eq!(store.get_messages("c2").await.len(), 1);

        store.clear_conversation("never-seen").await;
    }

    #[tokio::test]
    async fn custom_cap() {
        let store = MemoryHistoryStore::new(3);
        for i in 0..5 {
            store.add_message("c", Role::User, &i.to_string()).await;
        }
        let contents: Vec<String> = store
            .get_messages("c").await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
        assert_eq!(MemoryHistoryStore::new(0).max_messages(), 1);
    }
}
