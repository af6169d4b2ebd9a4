//! # asro-providers
//!
//! Generative-language provider implementations for Asro.

pub mod gemini;

pub use gemini::GeminiProvider;
