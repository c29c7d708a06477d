//! Prompt assembly and reply generation for the chat route.

use crate::error::ReplyError;
use async_trait::async_trait;

/// Instruction line opening every prompt.
pub const SYSTEM_LINE: &str = "System: You are emulating the persona described by the user. Speak kindly and empathetically, acknowledging emotions but not reinforcing negative loops.";

/// Persona used when the request names none.
pub const DEFAULT_PERSONA: &str = "default";

/// Generated reply text with an optional sentiment label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub sentiment: Option<String>,
}

#[async_trait]
/// Produces a persona reply for a fully assembled prompt.
pub trait ReplyGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<Reply, ReplyError>;
}

/// Offline generator echoing the last prompt line behind an empathetic opener.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoReplyGenerator;

impl EchoReplyGenerator {
    pub const OPENER: &'static str = "I hear you. It\u{2019}s okay to feel this way. ";
    /// Longest echoed tail, in characters, before it is cut with `...`.
    pub const MAX_TAIL_CHARS: usize = 160;
}

#[async_trait]
impl ReplyGenerator for EchoReplyGenerator {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<Reply, ReplyError> {
        let last_line = prompt.trim().rsplit('\n').next().unwrap_or_default();
        let mut tail: String = last_line.chars().take(Self::MAX_TAIL_CHARS).collect();
        if last_line.chars().count() > Self::MAX_TAIL_CHARS {
            tail.push_str("...");
        }
        Ok(Reply {
            text: format!("{}{}", Self::OPENER, tail),
            sentiment: Some("calm".to_string()),
        })
    }
}

/// Assemble the persona prompt.
///
/// Layout: system line, blank, `Context:`, one memory per line, blank,
/// `Persona: ..`, blank, `User: ..`, `AI:`.
pub fn build_prompt(persona: &str, memories: &[String], user_input: &str) -> String {
    [
        SYSTEM_LINE.to_string(),
        String::new(),
        "Context:".to_string(),
        memories.join("\n"),
        String::new(),
        format!("Persona: {persona}"),
        String::new(),
        format!("User: {user_input}"),
        "AI:".to_string(),
    ]
    .join("\n")
}
