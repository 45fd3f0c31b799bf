use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::history::{ initialize_history_store, HistoryStore };
use crate::llm::{ LlmConfig, LlmType };
use crate::llm::chat::{ ChatClient, CompletionRequest, new_client as new_chat_client };
use crate::models::chat::{ ChatMessage, Role };

use log::{ info, warn, error };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, I'm having trouble processing your request. Please try again or contact the health center directly.";

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Outcome of one chat turn. `error` carries gateway diagnostics for logs only.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: LlmType::OpenAI.default_model().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn HistoryStore>,
    prompt_config: Arc<PromptConfig>,
    settings: GenerationSettings,
}

fn resolve_conversation_id(user_id: &str, conversation_id: Option<&str>) -> String {
    match conversation_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => user_id.to_string(),
    }
}

impl ChatAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        history_store: Arc<dyn HistoryStore>,
        prompt_config: Arc<PromptConfig>,
        settings: GenerationSettings
    ) -> Self {
        Self { chat_client, history_store, prompt_config, settings }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_type: LlmType = args.chat_llm_type.parse()?;
        let chat_config = LlmConfig {
            llm_type,
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
            timeout: Some(args.chat_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };
        if chat_config.api_key.is_none() {
            warn!("No completion API key configured; every chat turn will fall back.");
        }
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, URL={}",
            llm_type,
            chat_config.model(),
            chat_client.get_base_url().unwrap_or_default()
        );

        let prompt_config = match &args.prompts_path {
            Some(path) if !path.trim().is_empty() => {
                let loaded = prompt::load_prompts(path)?;
                match args.context_window {
                    Some(window) => Arc::new((*loaded).clone().with_context_window(window)),
                    None => loaded,
                }
            }
            _ => {
                info!("Using built-in system prompt");
                let window = args.context_window.unwrap_or(prompt::DEFAULT_CONTEXT_WINDOW);
                Arc::new(PromptConfig::default().with_context_window(window))
            }
        };

        let history_store = initialize_history_store(args)?;
        let settings = GenerationSettings {
            model: chat_config.model(),
            max_tokens: args.chat_max_tokens,
            temperature: args.chat_temperature,
        };

        Ok(Self::new(chat_client, history_store, prompt_config, settings))
    }

    /// Runs one chat turn. Gateway failures never propagate: the caller gets the
    /// fallback text and the history is left as it was.
    pub async fn respond(
        &self,
        message: &str,
        user_id: &str,
        conversation_id: Option<&str>
    ) -> ChatReply {
        let conversation_id = resolve_conversation_id(user_id, conversation_id);
        let history = self.history_store.get_messages(&conversation_id).await;
        let messages = self.prompt_config.assemble(&history, message);

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        match self.chat_client.complete(&request).await {
            Ok(completion) => {
                self.history_store.add_message(&conversation_id, Role::User, message).await;
                self.history_store
                    .add_message(&conversation_id, Role::Assistant, &completion.response).await;
                ChatReply {
                    response: completion.response,
                    conversation_id,
                    error: None,
                }
            }
            Err(e) => {
                error!("Completion failed for conversation {}: {}", conversation_id, e);
                ChatReply {
                    response: FALLBACK_RESPONSE.to_string(),
                    conversation_id,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn get_history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.history_store.get_messages(conversation_id).await
    }

    pub async fn clear_history(&self, conversation_id: &str) {
        self.history_store.clear_conversation(conversation_id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use crate::llm::chat::{ CompletionResponse, GatewayError };
    use crate::llm::chat::openai::OpenAIChatClient;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed text and records every request.
    pub(crate) struct EchoClient {
        pub reply: String,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl EchoClient {
        pub(crate) fn new(reply: &str) -> Self {
            Self { reply: reply.to_string(), requests: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ChatClient for EchoClient {
        async fn complete(
            &self,
            request: &CompletionRequest
        ) -> Result<CompletionResponse, GatewayError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(CompletionResponse { response: self.reply.clone() })
        }
    }

    pub(crate) struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        async fn complete(
            &self,
            _request: &CompletionRequest
        ) -> Result<CompletionResponse, GatewayError> {
            Err(GatewayError::Api { status: 429, body: "quota exceeded".to_string() })
        }
    }

    struct MalformedClient;

    #[async_trait]
    impl ChatClient for MalformedClient {
        async fn complete(
            &self,
            _request: &CompletionRequest
        ) -> Result<CompletionResponse, GatewayError> {
            Err(GatewayError::Malformed("response has no choices".to_string()))
        }
    }

    pub(crate) fn agent_with(
        client: Arc<dyn ChatClient>,
        store: Arc<MemoryHistoryStore>
    ) -> ChatAgent {
        ChatAgent::new(
            client,
            store,
            Arc::new(PromptConfig::default()),
            GenerationSettings::default()
        )
    }

    #[test]
    fn conversation_id_prefers_explicit_key() {
        assert_eq!(resolve_conversation_id("u1", Some("c9")), "c9");
        assert_eq!(resolve_conversation_id("u1", Some("")), "u1");
        assert_eq!(resolve_conversation_id("u1", None), "u1");
    }

    #[tokio::test]
    async fn success_persists_both_turns() {
        let client = Arc::new(EchoClient::new("Rest and hydrate."));
        let store = Arc::new(MemoryHistoryStore::default());
        let agent = agent_with(client.clone(), store.clone());

        store.add_message("c1", Role::User, "earlier").await;
        let before = agent.get_history("c1").await;

        let reply = agent.respond("I have a cold", "u1", Some("c1")).await;
        assert_eq!(reply.response, "Rest and hydrate.");
        assert_eq!(reply.conversation_id, "c1");
        assert!(reply.error.is_none());

        let after = agent.get_history("c1").await;
        assert_eq!(after.len(), before.len() + 2);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after[before.len()], ChatMessage::user("I have a cold"));
        assert_eq!(after[before.len() + 1], ChatMessage::assistant("Rest and hydrate."));
        assert!(agent.get_history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn request_carries_prompt_and_generation_settings() {
        let client = Arc::new(EchoClient::new("ok"));
        let store = Arc::new(MemoryHistoryStore::default());
        let agent = agent_with(client.clone(), store.clone());

        for i in 0..14 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.add_message("u1", role, &format!("h{}", i)).await;
        }
        agent.respond("latest", "u1", None).await;

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gpt-4-turbo-preview");
        assert_eq!(request.max_tokens, 500);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 12);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "h4");
        assert_eq!(request.messages[10].content, "h13");
        assert_eq!(request.messages[11], ChatMessage::user("latest"));
    }

    #[tokio::test]
    async fn failure_returns_fallback_and_leaves_history() {
        let store = Arc::new(MemoryHistoryStore::default());
        let agent = agent_with(Arc::new(FailingClient), store.clone());

        let reply = agent.respond("hi", "u1", None).await;
        assert_eq!(reply.response, FALLBACK_RESPONSE);
        assert_eq!(reply.conversation_id, "u1");
        assert!(reply.error.as_deref().unwrap_or_default().contains("quota exceeded"));
        assert!(agent.get_history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn failure_does_not_touch_existing_history() {
        let store = Arc::new(MemoryHistoryStore::default());
        store.add_message("c1", Role::User, "first").await;
        store.add_message("c1", Role::Assistant, "reply").await;
        let agent = agent_with(Arc::new(FailingClient), store.clone());

        let before = agent.get_history("c1").await;
        agent.respond("again", "u1", Some("c1")).await;
        assert_eq!(agent.get_history("c1").await, before);
    }

    #[tokio::test]
    async fn malformed_completion_falls_back() {
        let store = Arc::new(MemoryHistoryStore::default());
        store.add_message("c1", Role::User, "first").await;
        let agent = agent_with(Arc::new(MalformedClient), store.clone());

        let reply = agent.respond("again", "u1", Some("c1")).await;
        assert_eq!(reply.response, FALLBACK_RESPONSE);
        assert_eq!(reply.conversation_id, "c1");
        assert!(reply.error.as_deref().unwrap_or_default().contains("malformed"));
        assert_eq!(agent.get_history("c1").await, vec![ChatMessage::user("first")]);
    }

    #[tokio::test]
    async fn silent_gateway_times_out_to_fallback() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = OpenAIChatClient::new(
            Some("test-key".to_string()),
            format!("http://{}", addr),
            Some(1)
        ).unwrap();
        let store = Arc::new(MemoryHistoryStore::default());
        let agent = agent_with(Arc::new(client), store.clone());

        let reply = agent.respond("hi", "u1", None).await;
        assert_eq!(reply.response, FALLBACK_RESPONSE);
        assert_eq!(reply.conversation_id, "u1");
        assert!(reply.error.as_deref().unwrap_or_default().contains("did not answer"));
        assert!(agent.get_history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn clear_history_empties_conversation() {
        let store = Arc::new(MemoryHistoryStore::default());
        let agent = agent_with(Arc::new(EchoClient::new("ok")), store);

        agent.respond("hello", "u1", None).await;
        assert_eq!(agent.get_history("u1").await.len(), 2);

        agent.clear_history("u1").await;
        assert!(agent.get_history("u1").await.is_empty());
    }
}
