use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::data::DataAttachment;

mod gemini;

pub use gemini::Gemini;

const KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub args: serde_json::Value,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

/// Raised by a provider asked to call out without an API key.
#[derive(Debug, Clone, Error)]
#[error("API key is not configured (set {env})")]
pub struct MissingCredential {
    pub env: String,
}

impl MissingCredential {
    pub fn new() -> Self {
        Self {
            env: KEY_ENV_VARS.join(" or "),
        }
    }
}

impl Default for MissingCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone)]
pub enum MessagePart {
    Text(String),
    Data(DataAttachment),
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            parts: vec![MessagePart::Text(content)],
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![MessagePart::Text(content)],
        }
    }

    pub fn user_data(data: DataAttachment) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![MessagePart::Data(data)],
        }
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

/// Builder-style request against a model that answers through one forced
/// tool call.
pub trait Provider: Clone + Send + Sync {
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn append_user_data(self, data: DataAttachment) -> Self;
    fn register_tool(self, tool: ToolSpec) -> Self;
    fn call_tool(self, tool_name: &str) -> ProviderFuture;
}

/// Key from `--key`, else the first non-empty env var. `None` is not an
/// error here; the provider reports it on first use.
pub fn resolve_key(override_key: Option<&str>) -> Option<String> {
    if let Some(key) = override_key.filter(|value| !value.trim().is_empty()) {
        return Some(key.to_string());
    }
    KEY_ENV_VARS.iter().find_map(|name| get_env(name))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    pub(crate) enum Reply {
        Args(serde_json::Value),
        Error(String),
        MissingKey,
    }

    /// What one `call_tool` carried.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordedCall {
        pub(crate) tool_name: String,
        pub(crate) system: Vec<String>,
        pub(crate) user: Vec<String>,
        pub(crate) data: Vec<DataAttachment>,
        pub(crate) tools: Vec<ToolSpec>,
    }

    /// Provider double that counts calls, records each request and answers
    /// with a fixed reply, optionally after a delay.
    #[derive(Clone)]
    pub(crate) struct MockProvider {
        reply: Arc<Mutex<Reply>>,
        calls: Arc<AtomicUsize>,
        recorded: Arc<Mutex<Vec<RecordedCall>>>,
        latency: Option<Duration>,
        pending: RecordedCall,
    }

    impl MockProvider {
        pub(crate) fn new(reply: Reply) -> Self {
            Self {
                reply: Arc::new(Mutex::new(reply)),
                calls: Arc::new(AtomicUsize::new(0)),
                recorded: Arc::new(Mutex::new(Vec::new())),
                latency: None,
                pending: RecordedCall::default(),
            }
        }

        pub(crate) fn with_args(args: serde_json::Value) -> Self {
            Self::new(Reply::Args(args))
        }

        pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = Some(latency);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn recorded(&self) -> Vec<RecordedCall> {
            self.recorded.lock().expect("recorded lock").clone()
        }

        pub(crate) fn set_reply(&self, reply: Reply) {
            *self.reply.lock().expect("reply lock") = reply;
        }
    }

    impl Provider for MockProvider {
        fn append_system_input(mut self, input: String) -> Self {
            self.pending.system.push(input);
            self
        }

        fn append_user_input(mut self, input: String) -> Self {
            self.pending.user.push(input);
            self
        }

        fn append_user_data(mut self, data: DataAttachment) -> Self {
            self.pending.data.push(data);
            self
        }

        fn register_tool(mut self, tool: ToolSpec) -> Self {
            self.pending.tools.push(tool);
            self
        }

        fn call_tool(self, tool_name: &str) -> ProviderFuture {
            let mut call = self.pending.clone();
            call.tool_name = tool_name.to_string();
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let reply = self.reply.lock().expect("reply lock").clone();
                let registered = call.tools.iter().any(|tool| tool.name == call.tool_name);
                let tool_name = call.tool_name.clone();
                self.recorded.lock().expect("recorded lock").push(call);
                if let Some(latency) = self.latency {
                    tokio::time::sleep(latency).await;
                }
                if !registered {
                    return Err(anyhow!("tool '{}' not registered", tool_name));
                }
                match reply {
                    Reply::Args(args) => Ok(ProviderResponse {
                        args,
                        model: Some("mock".to_string()),
                        usage: None,
                    }),
                    Reply::Error(message) => Err(anyhow!(message)),
                    Reply::MissingKey => Err(MissingCredential::new().into()),
                }
            })
        }
    }
}
