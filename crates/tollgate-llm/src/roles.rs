//! Canonical-to-vendor role tables
//!
//! Each vendor has an explicit, total mapping. Vendor roles that match no
//! entry map to the table's fallback role.

use crate::types::Role;

/// Role names used by one vendor
#[derive(Debug, Clone, Copy)]
pub struct RoleMapping {
    /// Vendor role for canonical system messages that stay inline
    pub system: &'static str,
    /// Vendor role for user messages
    pub user: &'static str,
    /// Vendor role for assistant messages
    pub assistant: &'static str,
    /// Canonical role for unknown vendor roles
    pub fallback: Role,
}

impl RoleMapping {
    pub const fn to_vendor(&self, role: Role) -> &'static str {
        match role {
            Role::System => self.system,
            Role::User => self.user,
            Role::Assistant => self.assistant,
        }
    }

    pub fn from_vendor(&self, role: &str) -> Role {
        if role == self.assistant {
            Role::Assistant
        } else if role == self.user {
            Role::User
        } else if role == self.system {
            Role::System
        } else {
            self.fallback
        }
    }
}

/// `OpenAI` accepts system messages inline
pub const OPENAI: RoleMapping = RoleMapping {
    system: "system",
    user: "user",
    assistant: "assistant",
    fallback: Role::System,
};

/// Claude takes one system prompt out of band; any further system messages become user turns
pub const CLAUDE: RoleMapping = RoleMapping {
    system: "user",
    user: "user",
    assistant: "assistant",
    fallback: Role::User,
};

/// Gemini names the assistant `model`
pub const GEMINI: RoleMapping = RoleMapping {
    system: "user",
    user: "user",
    assistant: "model",
    fallback: Role::User,
};

pub const MOCK: RoleMapping = RoleMapping {
    system: "system",
    user: "user",
    assistant: "assistant",
    fallback: Role::User,
};
