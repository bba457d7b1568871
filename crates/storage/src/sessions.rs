//! Session persistence with legacy-format migration.
//!
//! Sessions are stored as one JSON array under a single key. Older
//! releases wrote several shapes we still have to read: structured
//! message content, camelCase field names, a single global platform key
//! instead of one per session. Migration happens on load; the first
//! subsequent save rewrites everything in the current shape.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared::types::{ChatSession, Platform, Profile, UNTITLED_TITLE};

use crate::kv::KeyValueStore;

pub const SESSIONS_KEY: &str = "chat_sessions";
pub const LAST_SESSION_KEY: &str = "last_session_id";

/// Pre-per-session releases stored one platform choice for the whole app.
const LEGACY_PLATFORM_KEY: &str = "platform";

/// Inserted where a structured message body carries no usable text.
pub const UNSUPPORTED_CONTENT: &str = "[Unsupported message format]";

pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads all sessions, migrating legacy entries in place. A corrupted
    /// top-level document is cleared so the next save starts fresh;
    /// individual sessions that cannot be repaired are dropped.
    pub fn load(&mut self) -> Vec<ChatSession> {
        let Some(raw) = self.store.get(SESSIONS_KEY) else {
            return Vec::new();
        };
        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!("session data is not an array, clearing it");
                self.store.remove(SESSIONS_KEY);
                return Vec::new();
            }
            Err(err) => {
                warn!(%err, "session data is corrupted, clearing it");
                self.store.remove(SESSIONS_KEY);
                return Vec::new();
            }
        };

        let fallback_platform = self
            .store
            .get(LEGACY_PLATFORM_KEY)
            .and_then(|s| Platform::parse(&s));

        entries
            .into_iter()
            .filter_map(|entry| migrate_session(entry, fallback_platform))
            .collect()
    }

    /// Persists the full session list. An empty list is deliberately NOT
    /// written: startup races can observe an empty in-memory list before
    /// loading finishes, and writing it would wipe real data.
    pub fn save(&mut self, sessions: &[ChatSession]) -> Result<()> {
        if sessions.is_empty() {
            debug!("skipping save of empty session list");
            return Ok(());
        }
        let json = serde_json::to_string(sessions)?;
        self.store.set(SESSIONS_KEY, &json)
    }

    pub fn last_session_id(&self) -> Option<String> {
        self.store.get(LAST_SESSION_KEY)
    }

    pub fn set_last_session_id(&mut self, id: &str) -> Result<()> {
        self.store.set(LAST_SESSION_KEY, id)
    }

    pub fn clear_last_session_id(&mut self) {
        self.store.remove(LAST_SESSION_KEY);
    }
}

/// Repairs one stored session into the current shape, or drops it.
fn migrate_session(value: Value, fallback_platform: Option<Platform>) -> Option<ChatSession> {
    let Value::Object(mut obj) = value else {
        warn!("dropping non-object session entry");
        return None;
    };

    if !obj.get("id").is_some_and(Value::is_string) {
        obj.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    if !obj.get("title").is_some_and(Value::is_string) {
        obj.insert("title".into(), Value::String(UNTITLED_TITLE.to_string()));
    }

    // Per-session platform, falling back to the legacy global key. A
    // session we cannot pin to a platform would produce scripts in an
    // unknown dialect, so it is dropped.
    let platform = obj
        .get("platform")
        .or_else(|| obj.get("os"))
        .and_then(Value::as_str)
        .and_then(Platform::parse)
        .or(fallback_platform);
    let Some(platform) = platform else {
        warn!("dropping session without a resolvable platform");
        return None;
    };
    obj.remove("os");
    obj.insert("platform".into(), Value::String(platform.as_str().into()));

    // "agents" is the legacy name for "profiles". Unknown ids are dropped.
    let raw_profiles = obj
        .remove("profiles")
        .or_else(|| obj.remove("agents"))
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default();
    let profiles: Vec<Value> = raw_profiles
        .into_iter()
        .filter_map(|v| {
            let id = v.as_str()?;
            if Profile::parse(id).is_none() {
                warn!(id, "dropping unknown profile id");
                return None;
            }
            Some(Value::String(id.to_string()))
        })
        .collect();
    obj.insert("profiles".into(), Value::Array(profiles));

    // Legacy camelCase timestamp held unix millis.
    if obj.get("created_at").is_none() {
        if let Some(ms) = obj.remove("createdAt").and_then(|v| v.as_i64()) {
            if let Some(ts) = chrono::DateTime::from_timestamp_millis(ms) {
                obj.insert("created_at".into(), Value::String(ts.to_rfc3339()));
            }
        }
    }

    // A template missing its seed prompt cannot seed anything.
    if obj
        .get("template")
        .is_some_and(|t| !t.get("seed_prompt").is_some_and(Value::is_string))
    {
        obj.insert("template".into(), Value::Null);
    }

    if let Some(Value::Array(messages)) = obj.get_mut("messages") {
        messages.retain_mut(migrate_message);
    } else {
        obj.insert("messages".into(), Value::Array(Vec::new()));
    }

    match serde_json::from_value(Value::Object(obj)) {
        Ok(session) => Some(session),
        Err(err) => {
            warn!(%err, "dropping session that failed migration");
            None
        }
    }
}

/// Repairs one stored message in place; returns false to drop it.
fn migrate_message(value: &mut Value) -> bool {
    let Value::Object(obj) = value else {
        return false;
    };

    if !obj.get("id").is_some_and(Value::is_string) {
        obj.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }

    let sender = match obj.get("sender").and_then(Value::as_str) {
        Some("User") | Some("user") => "User",
        Some("Assistant") | Some("ai") | Some("model") => "Assistant",
        _ => return false,
    };
    obj.insert("sender".into(), Value::String(sender.into()));

    // Content used to be a structured object with a `text` field.
    let content = match obj.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(inner)) => inner
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| UNSUPPORTED_CONTENT.to_string()),
        _ => UNSUPPORTED_CONTENT.to_string(),
    };
    obj.insert("content".into(), Value::String(content));

    // Citations were once nested grounding objects: [{web: {uri, title}}].
    let citations = obj
        .remove("citations")
        .or_else(|| obj.remove("sources"))
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default();
    let citations: Vec<Value> = citations
        .into_iter()
        .filter_map(|item| {
            let source = item.get("web").unwrap_or(&item);
            let uri = source.get("uri").and_then(Value::as_str)?;
            let title = source
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(uri);
            Some(serde_json::json!({ "uri": uri, "title": title }))
        })
        .collect();
    obj.insert("citations".into(), Value::Array(citations));

    true
}
