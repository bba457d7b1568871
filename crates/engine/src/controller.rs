//! Session lifecycle orchestration.
//!
//! Owns the in-memory session collection and is the only place that
//! mutates it. UI actions come in as method calls; every mutation is
//! followed by a store save so durable state tracks the in-memory
//! snapshot (last write wins on the full collection).

use thiserror::Error;
use tracing::{info, warn};

use shared::agent_api::{Turn, TurnPart};
use shared::settings::PromptOptions;
use shared::types::{
    ChatMessage, ChatSession, MessageSender, Platform, Profile, ProjectTemplate, SavedScript,
    PLACEHOLDER_TITLE,
};
use storage::kv::KeyValueStore;
use storage::scripts::ScriptStore;
use storage::sessions::SessionStore;

use crate::accumulator::Accumulator;
use crate::attachments::{self, Attachment};
use crate::exchange::ExchangeRequest;
use crate::{prompt, title};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no such session: {0}")]
    UnknownSession(String),
    #[error("no such message: {0}")]
    UnknownMessage(String),
    #[error("nothing to send")]
    EmptyMessage,
    #[error("an exchange is already in flight")]
    ExchangeInFlight,
    #[error("could not process an attached file: {0}")]
    Attachment(#[source] anyhow::Error),
}

/// Cross-cutting application state mirrored from the active session so
/// dependent surfaces reflect it without re-reading the session.
#[derive(Debug, Clone, Default)]
pub struct AmbientState {
    pub platform: Option<Platform>,
    pub profiles: Vec<Profile>,
    pub template: Option<ProjectTemplate>,
}

/// Handed to the caller after `prepare_exchange`; pairs the placeholder
/// message with the request the provider should run.
pub struct PreparedExchange {
    pub session_id: String,
    pub placeholder_id: String,
    pub request: ExchangeRequest,
}

pub struct SessionController<S> {
    sessions: Vec<ChatSession>,
    active: Option<String>,
    in_flight: bool,
    ambient: AmbientState,
    session_store: SessionStore<S>,
    script_store: ScriptStore<S>,
    scripts: Vec<SavedScript>,
}

impl<S: KeyValueStore> SessionController<S> {
    /// Loads persisted state and restores the last active session if it
    /// still exists.
    pub fn new(mut session_store: SessionStore<S>, mut script_store: ScriptStore<S>) -> Self {
        let sessions = session_store.load();
        let scripts = script_store.load();
        let active = session_store
            .last_session_id()
            .filter(|id| sessions.iter().any(|s| s.id == *id));
        let mut controller = Self {
            sessions,
            active,
            in_flight: false,
            ambient: AmbientState::default(),
            session_store,
            script_store,
            scripts,
        };
        controller.sync_ambient();
        controller
    }

    /// Most-recent-first session list.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        let id = self.active.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn ambient(&self) -> &AmbientState {
        &self.ambient
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn scripts(&self) -> &[SavedScript] {
        &self.scripts
    }

    pub fn create_session(
        &mut self,
        platform: Platform,
        profiles: Vec<Profile>,
        template: Option<ProjectTemplate>,
    ) -> String {
        let mut session = ChatSession::new(platform, profiles, template);
        session.messages.push(ChatMessage::assistant(prompt::greeting(
            session.platform,
            &session.profiles,
        )));
        let id = session.id.clone();
        info!(session = %id, "created session");
        self.sessions.insert(0, session);
        self.active = Some(id.clone());
        self.sync_ambient();
        self.persist_sessions();
        self.persist_active_id();
        id
    }

    pub fn select_session(&mut self, id: &str) -> Result<(), SendError> {
        if !self.sessions.iter().any(|s| s.id == id) {
            return Err(SendError::UnknownSession(id.to_string()));
        }
        self.active = Some(id.to_string());
        self.sync_ambient();
        self.persist_active_id();
        Ok(())
    }

    pub fn rename_session(&mut self, id: &str, new_title: &str) -> Result<(), SendError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SendError::UnknownSession(id.to_string()))?;
        session.title = new_title.to_string();
        self.persist_sessions();
        Ok(())
    }

    /// Adds a capability profile to a session; duplicates are ignored.
    pub fn add_profile(&mut self, session_id: &str, profile: Profile) -> Result<(), SendError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SendError::UnknownSession(session_id.to_string()))?;
        session.add_profile(profile);
        self.sync_ambient();
        self.persist_sessions();
        Ok(())
    }

    pub fn set_template(
        &mut self,
        session_id: &str,
        template: ProjectTemplate,
    ) -> Result<(), SendError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SendError::UnknownSession(session_id.to_string()))?;
        session.template = Some(template);
        self.sync_ambient();
        self.persist_sessions();
        Ok(())
    }

    /// Deletes a session. When the active session goes away the
    /// next-most-recent one takes over, or the selection clears.
    pub fn delete_session(&mut self, id: &str) -> Result<(), SendError> {
        let position = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SendError::UnknownSession(id.to_string()))?;
        self.sessions.remove(position);
        if self.active.as_deref() == Some(id) {
            self.active = self.sessions.first().map(|s| s.id.clone());
            self.sync_ambient();
            match &self.active {
                Some(_) => self.persist_active_id(),
                None => self.session_store.clear_last_session_id(),
            }
        }
        self.persist_sessions();
        Ok(())
    }

    /// Appends the user message plus an assistant placeholder and builds
    /// the provider request. The exchange is considered in flight until
    /// `finish_exchange` runs.
    pub fn prepare_exchange(
        &mut self,
        session_id: &str,
        text: &str,
        files: &[Attachment],
        options: &PromptOptions,
        environment_profile: Option<&str>,
    ) -> Result<PreparedExchange, SendError> {
        if self.in_flight {
            return Err(SendError::ExchangeInFlight);
        }
        if text.trim().is_empty() && files.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let prepared = attachments::prepare(files).map_err(SendError::Attachment)?;

        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SendError::UnknownSession(session_id.to_string()))?;

        let mut turns = history_turns(session);

        let mut parts = prepared.parts;
        parts.push(TurnPart::Text(format!("{text}{}", prepared.context)));
        turns.push(Turn {
            role: "user".to_string(),
            parts,
        });

        let content = match attachments::uploaded_files_header(files) {
            Some(header) => format!("{header}\n\n{text}"),
            None => text.to_string(),
        };
        session.messages.push(ChatMessage::user(content));
        let placeholder = ChatMessage::assistant_placeholder();
        let placeholder_id = placeholder.id.clone();
        session.messages.push(placeholder);

        let request = ExchangeRequest {
            system_instruction: prompt::compose(
                session.platform,
                &session.profiles,
                options,
                environment_profile,
            ),
            turns,
            search_enabled: options.search_enabled,
        };

        maybe_derive_title(session);
        self.in_flight = true;
        self.persist_sessions();

        Ok(PreparedExchange {
            session_id: session_id.to_string(),
            placeholder_id,
            request,
        })
    }

    /// Truncates history at the edited message and starts a fresh exchange
    /// from the rewritten prompt. Everything after the edited message is
    /// discarded; there is no branching.
    pub fn edit_and_resend(
        &mut self,
        session_id: &str,
        message_id: &str,
        new_text: &str,
        options: &PromptOptions,
        environment_profile: Option<&str>,
    ) -> Result<PreparedExchange, SendError> {
        if self.in_flight {
            return Err(SendError::ExchangeInFlight);
        }
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SendError::UnknownSession(session_id.to_string()))?;
        let index = session
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| SendError::UnknownMessage(message_id.to_string()))?;
        session.messages.truncate(index);
        self.prepare_exchange(session_id, new_text, &[], options, environment_profile)
    }

    /// Streaming update entry point: mirrors the accumulator into the
    /// placeholder message and persists the snapshot.
    pub fn apply_stream_update(
        &mut self,
        session_id: &str,
        message_id: &str,
        accumulator: &Accumulator,
    ) {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            return;
        };
        let Some(message) = session.message_mut(message_id) else {
            return;
        };
        message.content = accumulator.text().to_string();
        message.citations = accumulator.citations().to_vec();
        self.persist_sessions();
    }

    /// Commits the final exchange state (completed text or error text)
    /// and releases the in-flight guard.
    pub fn finish_exchange(
        &mut self,
        session_id: &str,
        message_id: &str,
        accumulator: &Accumulator,
    ) {
        self.apply_stream_update(session_id, message_id, accumulator);
        self.in_flight = false;
    }

    pub fn save_script(&mut self, name: &str, code: &str, session_id: &str) -> Result<(), SendError> {
        let session = self
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SendError::UnknownSession(session_id.to_string()))?;
        let script = SavedScript {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            code: code.to_string(),
            language: session.platform.script_language().to_string(),
            platform: session.platform,
            profiles: session.profiles.clone(),
            created_at: chrono::Utc::now(),
        };
        self.scripts.insert(0, script);
        if let Err(err) = self.script_store.save(&self.scripts) {
            warn!(%err, "failed to persist scripts");
        }
        Ok(())
    }

    pub fn delete_script(&mut self, id: &str) {
        self.scripts.retain(|s| s.id != id);
        if let Err(err) = self.script_store.save(&self.scripts) {
            warn!(%err, "failed to persist scripts");
        }
    }

    fn sync_ambient(&mut self) {
        self.ambient = match self.active_session() {
            Some(session) => AmbientState {
                platform: Some(session.platform),
                profiles: session.profiles.clone(),
                template: session.template.clone(),
            },
            None => AmbientState::default(),
        };
    }

    fn persist_sessions(&mut self) {
        if let Err(err) = self.session_store.save(&self.sessions) {
            warn!(%err, "failed to persist sessions");
        }
    }

    fn persist_active_id(&mut self) {
        if let Some(id) = self.active.clone() {
            if let Err(err) = self.session_store.set_last_session_id(&id) {
                warn!(%err, "failed to persist last session id");
            }
        }
    }
}

/// Prior conversation turns as alternating user/model text turns.
fn history_turns(session: &ChatSession) -> Vec<Turn> {
    session
        .messages
        .iter()
        .map(|message| match message.sender {
            MessageSender::User => Turn::user(message.content.clone()),
            MessageSender::Assistant => Turn::model(message.content.clone()),
        })
        .collect()
}

/// Derives the title exactly once: the first time the message list is
/// non-empty while the title still carries the placeholder.
fn maybe_derive_title(session: &mut ChatSession) {
    if session.title != PLACEHOLDER_TITLE || session.messages.is_empty() {
        return;
    }
    let Some(first_user) = session
        .messages
        .iter()
        .find(|m| m.sender == MessageSender::User)
    else {
        return;
    };
    session.title = title::derive(&first_user.content);
}
