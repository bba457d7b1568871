//! Core data model for chat sessions, saved scripts, and subscription state.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title every session starts with. Title derivation only ever runs while a
/// session still carries this exact value.
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// Fallback label when title derivation produces an empty string.
pub const UNTITLED_TITLE: &str = "Untitled Chat";

/// Target operating system for generated scripts. Fixed once per session,
/// because it decides the script dialect everywhere downstream.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
pub enum Platform {
    Windows,
    Linux,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Windows" => Some(Platform::Windows),
            "Linux" => Some(Platform::Linux),
            _ => None,
        }
    }

    pub fn script_language(&self) -> &'static str {
        match self {
            Platform::Windows => "PowerShell",
            Platform::Linux => "Bash",
        }
    }

    pub fn script_extension(&self) -> &'static str {
        match self {
            Platform::Windows => ".ps1",
            Platform::Linux => ".sh",
        }
    }

    /// Strict-mode preamble every generated script must start with.
    pub fn strict_mode(&self) -> &'static str {
        match self {
            Platform::Windows => "$ErrorActionPreference = \"Stop\";",
            Platform::Linux => "set -euo pipefail;",
        }
    }
}

/// A capability profile: a named specialist behavior bundle that shapes the
/// instruction text sent to the generative service.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Meta-profile that plans across all the others.
    Orchestrator,
    React,
    Vue,
    Node,
    Api,
    Database,
    Docker,
    Cicd,
    Python,
    Sql,
    Terraform,
    /// Linux-only GUI dialog scripting; unsupported on Windows.
    Zenity,
}

impl Profile {
    pub fn all() -> &'static [Profile] {
        &[
            Profile::Orchestrator,
            Profile::React,
            Profile::Vue,
            Profile::Node,
            Profile::Api,
            Profile::Database,
            Profile::Docker,
            Profile::Cicd,
            Profile::Python,
            Profile::Sql,
            Profile::Terraform,
            Profile::Zenity,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Orchestrator => "orchestrator",
            Profile::React => "react",
            Profile::Vue => "vue",
            Profile::Node => "node",
            Profile::Api => "api",
            Profile::Database => "database",
            Profile::Docker => "docker",
            Profile::Cicd => "cicd",
            Profile::Python => "python",
            Profile::Sql => "sql",
            Profile::Terraform => "terraform",
            Profile::Zenity => "zenity",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Profile::Orchestrator => "Auto Engine",
            Profile::React => "React Automator",
            Profile::Vue => "Vue Automator",
            Profile::Node => "Node.js Automator",
            Profile::Api => "API Automator",
            Profile::Database => "Database Automator",
            Profile::Docker => "Docker Automator",
            Profile::Cicd => "CI/CD Automator",
            Profile::Python => "Python Scripter",
            Profile::Sql => "SQL Automator",
            Profile::Terraform => "Terraform Automator",
            Profile::Zenity => "Zenity Automator",
        }
    }

    /// Short user-facing blurb, shown in pickers and session greetings.
    pub fn description(&self) -> &'static str {
        match self {
            Profile::Orchestrator => {
                "The master agent. Describe your goal and Shellsmith will create a plan and use the other agents to build it."
            }
            Profile::React => "Generates scripts that build complete, functional React web applications.",
            Profile::Vue => "Builds functional Vue.js applications, including Pinia and Vue Router.",
            Profile::Node => "Generates a script to build and run a simple Node.js backend server.",
            Profile::Api => "Generates a script to build a complete Node.js/Express REST API with CRUD routes.",
            Profile::Database => "Generates a script to create a local PostgreSQL Docker environment.",
            Profile::Docker => "Crafts scripts to generate optimized Dockerfiles and docker-compose configs.",
            Profile::Cicd => "Generates scripts to create complete GitHub Actions workflows for CI/CD.",
            Profile::Python => "Generates scripts that create standalone, functional Python scripts for any task.",
            Profile::Sql => "Generates scripts that create .sql files for queries and migrations.",
            Profile::Terraform => "Generates scripts to create ready-to-apply Terraform (IaC) files.",
            Profile::Zenity => "Create user-friendly GUI scripts for Linux with zenity dialogs.",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Profile::all().iter().copied().find(|p| p.as_str() == s)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum MessageSender {
    User,
    Assistant,
}

/// A web source attached to an assistant message during streaming.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// A single message within a session. Assistant content is mutated
/// (append-only) while a stream is in flight; user content never changes
/// except through edit-and-resend, which replaces the message wholesale.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ChatMessage {
    pub id: String,
    pub sender: MessageSender,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender::User,
            content: content.into(),
            citations: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender::Assistant,
            content: content.into(),
            citations: Vec::new(),
        }
    }

    /// Empty assistant message awaiting streamed content.
    pub fn assistant_placeholder() -> Self {
        Self::assistant(String::new())
    }
}

/// A project starting point: a seed prompt the user can begin a session from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ProjectTemplate {
    pub name: String,
    pub description: String,
    pub seed_prompt: String,
}

/// A saved conversation. Ordering inside `messages` is chronological and
/// append-only; the collection itself is kept most-recent-first.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub platform: Platform,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<ProjectTemplate>,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(
        platform: Platform,
        profiles: Vec<Profile>,
        template: Option<ProjectTemplate>,
    ) -> Self {
        // template-seeded sessions take the template name; everyone else
        // starts on the placeholder until the first message titles them
        let title = template
            .as_ref()
            .map_or_else(|| PLACEHOLDER_TITLE.to_string(), |t| t.name.clone());
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            messages: Vec::new(),
            platform,
            profiles,
            template,
            created_at: Utc::now(),
        }
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Adds a profile, preserving insertion order and rejecting duplicates.
    pub fn add_profile(&mut self, profile: Profile) {
        if !self.profiles.contains(&profile) {
            self.profiles.push(profile);
        }
    }
}

/// A script the user kept from an assistant response. Lives in its own
/// library, independent of any session.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SavedScript {
    pub id: String,
    pub name: String,
    pub code: String,
    pub language: String,
    pub platform: Platform,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Trial,
    Subscribed,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Subscribed => "subscribed",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(SubscriptionStatus::None),
            "trial" => Some(SubscriptionStatus::Trial),
            "subscribed" => Some(SubscriptionStatus::Subscribed),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

/// Identity as supplied by the external sign-in provider.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct User {
    pub name: String,
    pub email: String,
    pub picture: String,
}

/// Decodes the payload segment of a signed identity token. The signature is
/// NOT verified here; trust comes from the provider handing us the token over
/// an authenticated channel.
pub fn decode_identity_token(token: &str) -> Option<User> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_dialect() {
        assert_eq!(Platform::Windows.script_language(), "PowerShell");
        assert_eq!(Platform::Linux.script_extension(), ".sh");
        assert_eq!(Platform::parse("Linux"), Some(Platform::Linux));
        assert_eq!(Platform::parse("macOS"), None);
    }

    #[test]
    fn test_add_profile_rejects_duplicates() {
        let mut session = ChatSession::new(Platform::Linux, vec![Profile::React], None);
        session.add_profile(Profile::Docker);
        session.add_profile(Profile::React);
        assert_eq!(session.profiles, vec![Profile::React, Profile::Docker]);
    }

    #[test]
    fn test_new_session_carries_placeholder_title() {
        let session = ChatSession::new(Platform::Windows, vec![], None);
        assert_eq!(session.title, PLACEHOLDER_TITLE);
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_decode_identity_token() {
        // header.payload.signature with payload {"name":"Ada","email":"ada@example.com","picture":"p"}
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"name":"Ada","email":"ada@example.com","picture":"p"}"#);
        let token = format!("eyJhbGciOiJub25lIn0.{}.sig", payload);
        let user = decode_identity_token(&token).expect("decodes");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_decode_identity_token_rejects_garbage() {
        assert!(decode_identity_token("not-a-token").is_none());
        assert!(decode_identity_token("a.!!!.c").is_none());
    }
}
