//! Local persistence for sessions, saved scripts, and app configuration.
//!
//! Everything is stored through a small key-value abstraction so the
//! engine can run against an in-memory store in tests while the app
//! uses plain files under the platform config directory.

pub mod config;
pub mod kv;
pub mod scripts;
pub mod sessions;
