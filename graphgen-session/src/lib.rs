//! # graphgen session
//!
//! The session drives one request at a time:
//! 1. The user enters a question and two axis units
//! 2. The classifier turns the question into points or an equation
//! 3. The renderer builds a figure from it
//! 4. The oracle explains how to plot it, memoised per question
//!
//! A failed plot never hides the explanation, and the other way round.

mod config;
mod session;

pub use config::{
    AppConfig, CacheSection, LogSection, OutputSection, ProviderSection, DEFAULT_API_KEY_ENV,
    DEFAULT_CONFIG_FILE,
};
pub use session::{SearchOutcome, SearchRequest, Session, SessionConfig, CACHE_CLEARED};
