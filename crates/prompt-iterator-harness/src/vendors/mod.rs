//! Provider integrations.
pub mod demo;
pub mod openai;
