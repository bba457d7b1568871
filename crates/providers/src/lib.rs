//! Clients for hosted generative services.

pub mod gemini;
pub mod sse;
