pub mod types;

pub mod settings {
    use serde::{Deserialize, Serialize};

    use crate::types::{Platform, SubscriptionStatus};

    fn default_true() -> bool {
        true
    }

    /// Ambient application flags, consolidated from the scattered
    /// key-value entries they are persisted as.
    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct AppConfig {
        /// Whether the user has finished the onboarding wizard.
        #[serde(default)]
        pub onboarding_complete: bool,
        /// Free-text system description the user supplied during onboarding,
        /// replayed verbatim into every composed prompt.
        pub environment_profile: Option<String>,
        /// Last platform choice made outside any session. New sessions and
        /// legacy-session migration both fall back to this.
        pub platform: Option<Platform>,
        #[serde(default)]
        pub subscription: SubscriptionStatus,
        /// Unix millis at which the trial ends. Only meaningful while
        /// `subscription` is `Trial`.
        pub trial_end: Option<i64>,
    }

    /// Per-exchange toggles that shape the composed instruction text.
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct PromptOptions {
        /// Wrap destructive commands in confirmation prompts.
        #[serde(default = "default_true")]
        pub safety_mode: bool,
        /// Ask for inline comments on every logical block.
        #[serde(default)]
        pub verbose_comments: bool,
        /// Enable the web-search tool for this exchange.
        #[serde(default)]
        pub search_enabled: bool,
    }

    impl Default for PromptOptions {
        fn default() -> Self {
            Self {
                safety_mode: true,
                verbose_comments: false,
                search_enabled: false,
            }
        }
    }
}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    /// One prior conversation turn as sent to the generative service.
    /// Roles are "user" or "model".
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Turn {
        pub role: String,
        pub parts: Vec<TurnPart>,
    }

    impl Turn {
        pub fn user(text: impl Into<String>) -> Self {
            Self {
                role: "user".to_string(),
                parts: vec![TurnPart::Text(text.into())],
            }
        }

        pub fn model(text: impl Into<String>) -> Self {
            Self {
                role: "model".to_string(),
                parts: vec![TurnPart::Text(text.into())],
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum TurnPart {
        Text(String),
        /// Base64-encoded binary payload, e.g. an attached image.
        InlineData { mime_type: String, data: String },
    }

    /// Incremental output from a streaming exchange.
    #[derive(Debug, Clone)]
    pub enum StreamChunk {
        /// A fragment of assistant text, in arrival order.
        Text(String),
        /// A web source surfaced by the search tool. Entries missing either
        /// field never reach this enum; the provider drops them.
        Citation { uri: String, title: String },
        /// End of stream.
        Done,
    }
}
