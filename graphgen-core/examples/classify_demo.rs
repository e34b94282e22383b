//! Example: classify a request with a real model and draw it
//!
//! Run with:
//!   # Use OpenAI:
//!   OPENAI_API_KEY=sk-xxx cargo run --example classify_demo -- --openai "points (1,2), (3,5)"
//!
//!   # Use Anthropic:
//!   ANTHROPIC_API_KEY=sk-xxx cargo run --example classify_demo -- --anthropic "y is three x squared"
//!
//!   # Use Gemini:
//!   GEMINI_API_KEY=xxx cargo run --example classify_demo -- --gemini "a sine wave"
//!
//!   # Use local Ollama (default):
//!   cargo run --example classify_demo -- "a straight line through the origin"
//!
//!   # Just output the prompt:
//!   cargo run --example classify_demo -- --prompt-only "a parabola"

use graphgen_core::classifier::classification_prompt;
use graphgen_core::{
    classify, render, AnyProvider, AxisUnits, LlmProvider, ProviderConfig, ProviderType,
};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();

    let provider_type = if args.iter().any(|a| a == "--openai") {
        ProviderType::OpenAI
    } else if args.iter().any(|a| a == "--anthropic") {
        ProviderType::Anthropic
    } else if args.iter().any(|a| a == "--gemini") {
        ProviderType::Gemini
    } else {
        ProviderType::Local
    };
    let prompt_only = args.iter().any(|a| a == "--prompt-only");

    let question = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.is_empty() {
        "points (1, 2), (2, 4), (3, 9)".to_string()
    } else {
        question
    };

    if prompt_only {
        println!("=== PROMPT ===\n{}", classification_prompt(&question));
        return Ok(());
    }

    let mut config = ProviderConfig::for_type(provider_type);
    if let Some(var) = provider_type.api_key_env() {
        match env::var(var) {
            Ok(key) => config = config.with_api_key(key),
            Err(_) => {
                eprintln!("Set {} to use {}", var, provider_type);
                return Ok(());
            }
        }
    }

    let provider = AnyProvider::from_config(config)?;
    println!("Provider: {}", provider.name());
    println!("Default model: {}", provider.default_model());
    println!("Question: {}\n", question);

    let shape = match classify(&question, &provider).await {
        Ok(shape) => shape,
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            eprintln!("  {}", e);
            return Ok(());
        }
    };
    println!("✓ Classified as {}", shape);

    match render(&shape, &AxisUnits::default()) {
        Ok(figure) if figure.is_empty() => println!("Nothing to plot"),
        Ok(figure) => {
            figure.save_svg("classify_demo.svg")?;
            println!("✓ Wrote classify_demo.svg");
        }
        Err(e) => eprintln!("✗ {}\n  {}", e.user_message(), e),
    }

    Ok(())
}
