//! Plain-language plotting explanations

use crate::error::{self, Result};
use crate::provider::LlmProvider;

pub fn explanation_prompt(question: &str) -> String {
    format!("Explain how to plot the graph for: {}", question)
}

/// Ask the oracle how to plot `question`
pub async fn explain<P: LlmProvider>(question: &str, provider: &P) -> Result<String> {
    let text = provider
        .prompt(&explanation_prompt(question))
        .await
        .map_err(|e| error::provider_failed(provider.name(), e).with_operation("explain"))?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use tokio_test::block_on;

    #[test]
    fn test_explain_sends_fixed_prompt() {
        let provider = MockProvider::new().with_reply("  Draw both axes, then the line.\n");
        let text = block_on(explain("y = 2x", &provider)).unwrap();

        assert_eq!(text, "Draw both axes, then the line.");
        assert_eq!(provider.prompts(), vec!["Explain how to plot the graph for: y = 2x"]);
    }
}
