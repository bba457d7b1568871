//! Session lifecycle, prompt composition, and streaming accumulation.

pub mod accumulator;
pub mod attachments;
pub mod controller;
pub mod exchange;
pub mod export;
pub mod prompt;
pub mod title;
