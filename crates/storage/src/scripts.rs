//! Saved-script library persistence.

use anyhow::Result;
use serde_json::Value;
use tracing::warn;

use shared::types::SavedScript;

use crate::kv::KeyValueStore;

pub const SCRIPTS_KEY: &str = "saved_scripts";

pub struct ScriptStore<S> {
    store: S,
}

impl<S: KeyValueStore> ScriptStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the script library, upgrading entries written before scripts
    /// could belong to more than one profile.
    pub fn load(&mut self) -> Vec<SavedScript> {
        let Some(raw) = self.store.get(SCRIPTS_KEY) else {
            return Vec::new();
        };
        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) | Err(_) => {
                warn!("saved-script data is corrupted, clearing it");
                self.store.remove(SCRIPTS_KEY);
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .filter_map(|mut entry| {
                // Legacy entries carried a single `profile` string.
                if let Value::Object(obj) = &mut entry {
                    if let Some(single) = obj.remove("profile") {
                        obj.entry("profiles")
                            .or_insert_with(|| Value::Array(vec![single]));
                    }
                }
                match serde_json::from_value(entry) {
                    Ok(script) => Some(script),
                    Err(err) => {
                        warn!(%err, "dropping unreadable saved script");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn save(&mut self, scripts: &[SavedScript]) -> Result<()> {
        let json = serde_json::to_string(scripts)?;
        self.store.set(SCRIPTS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use shared::types::Profile;

    #[test]
    fn test_legacy_single_profile_becomes_list() {
        let mut kv = MemoryStore::new();
        kv.set(
            SCRIPTS_KEY,
            r#"[{
                "id": "x",
                "name": "deploy",
                "code": "echo hi",
                "language": "Bash",
                "platform": "Linux",
                "profile": "docker",
                "created_at": "2024-01-01T00:00:00Z"
            }]"#,
        )
        .unwrap();
        let scripts = ScriptStore::new(kv).load();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].profiles, vec![Profile::Docker]);
    }

    #[test]
    fn test_corrupted_library_is_cleared() {
        let mut kv = MemoryStore::new();
        kv.set(SCRIPTS_KEY, "[[[").unwrap();
        let mut store = ScriptStore::new(kv);
        assert!(store.load().is_empty());
        assert!(store.load().is_empty());
    }
}
