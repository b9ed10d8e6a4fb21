use super::message::{Message, Role};

/// Provider-agnostic chat completion request
///
/// Optional parameters are only forwarded when meaningfully set: a zero or
/// negative value means "use the vendor default". The accessors apply that
/// rule so adapters never send zeros.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages, in caller order
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Whether the caller asked for a stream
    pub stream: bool,
}

impl ChatRequest {
    /// System prompt followed by a single user question
    pub fn from_prompt(model: impl Into<String>, system: &str, user: &str, temperature: f64) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::text(Role::System, system), Message::text(Role::User, user)],
            temperature: Some(temperature),
            ..Self::default()
        }
    }

    /// Temperature to forward, if set
    pub fn temperature(&self) -> Option<f64> {
        self.temperature.filter(|t| *t > 0.0)
    }

    /// Top-p to forward, if set
    pub fn top_p(&self) -> Option<f64> {
        self.top_p.filter(|p| *p > 0.0)
    }

    /// Output token cap to forward, if set
    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens.filter(|n| *n > 0)
    }

    /// Approximate prompt size in tokens
    pub fn approximate_prompt_tokens(&self) -> u32 {
        self.messages
            .iter()
            .map(|message| super::approximate_tokens(&message.text_content()))
            .fold(0, u32::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_parameters_mean_vendor_default() {
        let request = ChatRequest {
            temperature: Some(0.0),
            top_p: Some(0.0),
            max_tokens: Some(0),
            ..ChatRequest::default()
        };

        assert_eq!(request.temperature(), None);
        assert_eq!(request.top_p(), None);
        assert_eq!(request.max_tokens(), None);

        let request = ChatRequest {
            temperature: Some(0.7),
            max_tokens: Some(256),
            ..ChatRequest::default()
        };

        assert_eq!(request.temperature(), Some(0.7));
        assert_eq!(request.max_tokens(), Some(256));
    }

    #[test]
    fn prompt_tokens_count_words_across_messages() {
        let request = ChatRequest::from_prompt("m", "You are terse.", "What is  Rust?", 0.0);
        assert_eq!(request.approximate_prompt_tokens(), 6);
    }
}
