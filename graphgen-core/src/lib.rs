//! # graphgen core
//!
//! Turns a plain-language graph request into a drawn figure.
//!
//! ## Core Concepts
//! - **Shape**: what to plot, explicit points or an equation in `x`
//! - **Classifier**: known physics relations, otherwise one oracle round trip
//! - **Evaluator**: parses an equation and samples it, all or nothing
//! - **Renderer**: builds a figure and draws it as SVG with `plotters`
//! - **Provider**: trait-based oracle communication (OpenAI, Anthropic, Gemini)
//! - **Cache**: host-owned memo of oracle results

pub mod cache;
pub mod classifier;
pub mod error;
pub mod evaluator;
pub mod explain;
pub mod provider;
pub mod renderer;
pub mod shape;

pub use cache::{CacheBackend, FileCache, MemoryCache, ResultCache};
pub use classifier::{classify, classify_reply, known_equation, KNOWN_EQUATIONS};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use evaluator::{evaluate, evaluate_with, linspace, Bindings, Expression};
pub use explain::explain;
pub use provider::{
    AnthropicProvider, AnyProvider, ChatMessage, CompletionRequest, CompletionResponse,
    FinishReason, GeminiProvider, LlmProvider, MockProvider, OpenAIProvider, ProviderConfig,
    ProviderError, ProviderType, Role, Usage, UsageTracker,
};
pub use renderer::{render, render_with, Figure, Series};
pub use shape::{AxisUnits, ShapeDescriptor};
