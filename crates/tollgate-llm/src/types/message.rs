use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
}

impl Role {
    /// Parse a caller-supplied role; unrecognized roles are user turns
    pub fn from_inbound(role: &str) -> Self {
        match role {
            "system" | "developer" => Self::System,
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

/// Decoded inline image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

/// One part of a message's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text
    Text(String),
    /// Inline image
    Image(ImageData),
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Role of the author
    pub role: Role,
    /// Ordered content parts
    pub content: Vec<ContentPart>,
}

impl Message {
    /// Message with a single text part
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    /// Concatenated text parts, images skipped
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect()
    }
}
