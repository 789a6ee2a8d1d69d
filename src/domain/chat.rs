//! Conversation turns for follow-up questions about a contract.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One earlier message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Most recent question asked by the user, if any
pub fn last_question(history: &[Turn]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|t| t.role == Role::User && !t.content.trim().is_empty())
        .map(|t| t.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_wire_shape() {
        let json = serde_json::to_string(&Turn::assistant("Net 30.")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Net 30."}"#);

        let turns: Vec<Turn> =
            serde_json::from_str(r#"[{"role":"user","content":"Who pays?"},{"role":"assistant","content":"The Client."}]"#)
                .unwrap();
        assert_eq!(turns[0], Turn::user("Who pays?"));
    }

    #[test]
    fn test_last_question() {
        let history = vec![
            Turn::user("Can the client terminate?"),
            Turn::assistant("Yes, at any time."),
            Turn::user("  "),
        ];
        assert_eq!(last_question(&history), Some("Can the client terminate?"));
        assert_eq!(last_question(&[]), None);
    }
}
