//! The external text-generation service.
//!
//! Summarising, restructuring and merging are delegated to a chat-completion endpoint. The
//! pipeline only depends on the [`Generator`] trait: prompt in, opaque text out. Requests are
//! issued one at a time and block until the reply arrives.

use crate::config::Config;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// What a generation request is for. Selects the system prompt and sampling settings.
pub enum TaskKind {
    /// Condensing a section into a short summary.
    Summarization,
    /// Fusing several original spans into one section.
    Merging,
    /// Proposing a new outline from headings and summaries.
    Structuring,
    /// Anything else.
    Default,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Per-task request settings.
pub struct TaskProfile {
    /// System message sent ahead of the prompt.
    pub system_prompt: &'static str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on reply length.
    pub max_tokens: u32,
}

impl TaskKind {
    #[must_use]
    /// Request settings for this kind of task.
    pub fn profile(self) -> TaskProfile {
        match self {
            Self::Summarization => TaskProfile {
                system_prompt: "你是一个专业的文本摘要助手。阅读用户提供的内容，提炼核心信息，\
                                生成准确、通顺、不含无关内容的摘要。",
                temperature: 0.3,
                max_tokens: 1024,
            },
            Self::Merging => TaskProfile {
                system_prompt: "你是一个专业的文本整合助手。将用户提供的多段文本合并为一段，\
                                尽量保留原文内容与表述风格，去除重复信息，保证逻辑连贯。",
                temperature: 0.5,
                max_tokens: 8192,
            },
            Self::Structuring => TaskProfile {
                system_prompt: "你是一个专业的文本大纲重组助手。分析用户提供的标题及摘要，\
                                重新组织出层次清晰、格式规范的大纲。",
                temperature: 0.2,
                max_tokens: 8192,
            },
            Self::Default => TaskProfile {
                system_prompt: "你是一个智能文档助手。",
                temperature: 0.7,
                max_tokens: 4096,
            },
        }
    }

    #[must_use]
    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarization => "summarization",
            Self::Merging => "merging",
            Self::Structuring => "structuring",
            Self::Default => "default",
        }
    }
}

/// Text in, text out.
pub trait Generator {
    /// Submit `prompt` for `task` and return the reply verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or gives no usable reply.
    fn generate(&self, prompt: &str, task: TaskKind) -> Result<String>;
}

impl<F> Generator for F
where
    F: Fn(&str, TaskKind) -> Result<String>,
{
    fn generate(&self, prompt: &str, task: TaskKind) -> Result<String> {
        self(prompt, task)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Client for `base_url` authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }

    /// Client configured from settings, reading the key from the configured variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the key variable is unset or the client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "environment variable {} must hold the generation API key",
                config.api_key_env
            ))
        })?;
        Self::new(
            &config.api_base_url,
            api_key,
            config.model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

impl Generator for ChatClient {
    fn generate(&self, prompt: &str, task: TaskKind) -> Result<String> {
        let profile = task.profile();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: profile.system_prompt,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
            stream: false,
        };
        debug!(task = task.as_str(), chars = prompt.chars().count(), "generation request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Generation(format!("{status}: {body}")));
        }
        let reply: ChatResponse = response.json()?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Generation("reply carried no message content".to_string()))
    }
}

#[cfg(test)]
#[path = "tests/generator.rs"]
mod tests;
