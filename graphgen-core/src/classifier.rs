//! # Input Classifier
//!
//! Turns a free-text graph request into a [`ShapeDescriptor`].
//!
//! A handful of well-known physics relations are recognised locally. Anything
//! else goes to the oracle once, with a fixed instruction asking for either
//! `{"points": [[x1, y1], ...]}` or `{"equation": "..."}`.

use crate::error::{self, Result};
use crate::provider::LlmProvider;
use crate::shape::ShapeDescriptor;

/// Phrases recognised without consulting the oracle, checked in this order
pub const KNOWN_EQUATIONS: [(&str, &str); 3] = [
    ("first equation of motion", "u + a*x"),
    ("second equation of motion", "u*x + 0.5*a*x**2"),
    ("third equation of motion", "u**2 + 2*a*x"),
];

/// The instruction sent to the oracle for `text`
pub fn classification_prompt(text: &str) -> String {
    format!(
        "Please parse the following input and return a JSON object.\n\
         If it contains points, return as: {{\"points\": [[x1, y1], [x2, y2], ...]}}.\n\
         If it contains an equation, return as: {{\"equation\": \"equation_in_terms_of_x\"}}.\n\
         Input: {}",
        text
    )
}

/// Equation for the first known phrase contained in `text`, ignoring case
pub fn known_equation(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    KNOWN_EQUATIONS
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(_, equation)| *equation)
}

/// Classify `text`, asking `provider` only when no known phrase matches
pub async fn classify<P: LlmProvider>(text: &str, provider: &P) -> Result<ShapeDescriptor> {
    if let Some(equation) = known_equation(text) {
        log::debug!("matched known relation: {}", equation);
        return Ok(ShapeDescriptor::equation(equation));
    }

    let prompt = classification_prompt(text);
    let reply = provider
        .prompt(&prompt)
        .await
        .map_err(|e| error::provider_failed(provider.name(), e).with_operation("classifier::classify"))?;

    log::debug!("oracle reply: {}", reply);
    classify_reply(&reply)
}

/// Decode an oracle reply into a shape.
///
/// A reply that is not JSON is `ClassificationFailed`. A JSON object must
/// carry exactly one of `points` and `equation`; other keys are ignored.
/// Anything else is `UnrecognizedShape`.
pub fn classify_reply(reply: &str) -> Result<ShapeDescriptor> {
    let body = strip_code_fence(reply);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| error::reply_not_json(reply, e))?;

    let Some(object) = value.as_object() else {
        return Err(error::unrecognized_shape(&value, "reply is not a JSON object"));
    };

    let shape = match (object.get("points"), object.get("equation")) {
        (Some(points), None) => serde_json::from_value::<Vec<(f64, f64)>>(points.clone())
            .map(ShapeDescriptor::Points),
        (None, Some(equation)) => {
            serde_json::from_value::<String>(equation.clone()).map(ShapeDescriptor::Equation)
        }
        (Some(_), Some(_)) => {
            return Err(error::unrecognized_shape(&value, "reply has both 'points' and 'equation'"))
        }
        (None, None) => {
            return Err(error::unrecognized_shape(&value, "reply has neither 'points' nor 'equation'"))
        }
    };

    shape.map_err(|e| error::unrecognized_shape(&value, e.to_string()))
}

/// Unwrap a reply fenced as ```json ... ``` or ``` ... ```
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, ProviderError};
    use graphgen_error::ErrorKind;
    use tokio_test::block_on;

    #[test]
    fn test_known_phrases_skip_the_oracle() {
        let provider = MockProvider::new();
        let cases = [
            ("Plot the FIRST Equation Of Motion please", "u + a*x"),
            ("second equation of motion", "u*x + 0.5*a*x**2"),
            ("show me the third equation of motion for a car", "u**2 + 2*a*x"),
        ];
        for (text, expected) in cases {
            let shape = block_on(classify(text, &provider)).unwrap();
            assert_eq!(shape, ShapeDescriptor::equation(expected));
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_first_listed_phrase_wins() {
        let text = "compare the third equation of motion with the first equation of motion";
        assert_eq!(known_equation(text), Some("u + a*x"));
        assert_eq!(known_equation("equation of motion"), None);
    }

    #[test]
    fn test_oracle_points() {
        let provider = MockProvider::new().with_reply(r#"{"points": [[1, 2], [3, 4]]}"#);
        let shape = block_on(classify("points (1,2) and (3,4)", &provider)).unwrap();

        assert_eq!(shape, ShapeDescriptor::points([(1.0, 2.0), (3.0, 4.0)]));
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Please parse the following input"));
        assert!(prompts[0].ends_with("Input: points (1,2) and (3,4)"));
    }

    #[test]
    fn test_oracle_equation() {
        let provider = MockProvider::new().with_reply(r#"{"equation": "2*x + 3"}"#);
        let shape = block_on(classify("y equals two x plus three", &provider)).unwrap();
        assert_eq!(shape, ShapeDescriptor::equation("2*x + 3"));
    }

    #[test]
    fn test_non_json_reply() {
        let err = classify_reply("Sure! Here is your graph.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClassificationFailed);
        assert_eq!(
            err.user_message(),
            "Unable to parse the model's response. Please check the format."
        );
    }

    #[test]
    fn test_json_without_a_shape() {
        let err = classify_reply(r#"{"line": [1, 2]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedShape);

        let err = classify_reply(r#"{"points": "many"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedShape);

        let err = classify_reply("[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedShape);

        let err = classify_reply(r#"{"points": [[0, 0]], "equation": "x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedShape);
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let shape = classify_reply(r#"{"equation": "x**2", "type": "quadratic"}"#).unwrap();
        assert_eq!(shape, ShapeDescriptor::equation("x**2"));

        let shape =
            classify_reply(r#"{"points": [[1, 1], [2, 4]], "note": "two samples of x^2"}"#).unwrap();
        assert_eq!(shape, ShapeDescriptor::points([(1.0, 1.0), (2.0, 4.0)]));
    }

    #[test]
    fn test_fenced_reply() {
        let reply = "```json\n{\"equation\": \"sin(x)\"}\n```";
        assert_eq!(classify_reply(reply).unwrap(), ShapeDescriptor::equation("sin(x)"));

        let reply = "```\n{\"points\": []}\n```\n";
        assert_eq!(classify_reply(reply).unwrap(), ShapeDescriptor::Points(vec![]));
    }

    #[test]
    fn test_oracle_failure() {
        let provider = MockProvider::new().with_error(ProviderError::Network("refused".into()));
        let err = block_on(classify("a parabola", &provider)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert_eq!(err.operation(), "classifier::classify");
    }
}
