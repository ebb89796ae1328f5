//! Request bodies accepted by the chat endpoint

use serde::Deserialize;

/// One turn of a widget conversation
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    /// `user`, `assistant` or `system`
    #[serde(default)]
    pub role: String,
    /// Turn text
    #[serde(default)]
    pub content: String,
}

/// Either a single message or a conversation; the last user turn is answered
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    /// Single question
    #[serde(default)]
    pub message: Option<String>,
    /// Conversation history
    #[serde(default)]
    pub messages: Option<Vec<ChatTurn>>,
}

/// Why no question could be taken from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMessage {
    /// `messages` was given without any user turn
    NoUserTurn,
    /// Neither field was given
    Absent,
}

impl MissingMessage {
    /// Caller-facing explanation
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingMessage::NoUserTurn => "No user message found in messages array",
            MissingMessage::Absent => "Message or messages is required",
        }
    }
}

impl ChatRequest {
    /// The question to answer
    ///
    /// `message` wins when present; otherwise the last `user` turn.
    pub fn question(&self) -> Result<&str, MissingMessage> {
        if let Some(message) = &self.message {
            return Ok(message.as_str());
        }
        match &self.messages {
            Some(turns) => turns
                .iter()
                .rev()
                .find(|t| t.role.eq_ignore_ascii_case("user"))
                .map(|t| t.content.as_str())
                .ok_or(MissingMessage::NoUserTurn),
            None => Err(MissingMessage::Absent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_single_message() {
        assert_eq!(parse(r#"{"message": "Hei"}"#).question(), Ok("Hei"));
    }

    #[test]
    fn test_last_user_turn_wins() {
        let req = parse(
            r#"{"messages": [
                {"role": "user", "content": "Første"},
                {"role": "assistant", "content": "Svar"},
                {"role": "user", "content": "Andre"},
                {"role": "assistant", "content": "Svar igjen"}
            ]}"#,
        );
        assert_eq!(req.question(), Ok("Andre"));
    }

    #[test]
    fn test_missing_message() {
        assert_eq!(
            parse(r#"{"messages": [{"role": "assistant", "content": "Hei"}]}"#).question(),
            Err(MissingMessage::NoUserTurn)
        );
        assert_eq!(parse("{}").question(), Err(MissingMessage::Absent));
    }
}
