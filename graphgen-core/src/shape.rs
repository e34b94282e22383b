//! Shape descriptors and axis units

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user asked to plot.
///
/// Serializes as `{"points": [[x, y], ...]}` or `{"equation": "..."}`, the
/// same shapes the oracle is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeDescriptor {
    /// Explicit coordinates, in the order given
    Points(Vec<(f64, f64)>),
    /// An expression in `x`
    Equation(String),
}

impl ShapeDescriptor {
    pub fn points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        ShapeDescriptor::Points(points.into_iter().collect())
    }

    pub fn equation(equation: impl Into<String>) -> Self {
        ShapeDescriptor::Equation(equation.into())
    }

    pub fn as_equation(&self) -> Option<&str> {
        match self {
            ShapeDescriptor::Equation(eq) => Some(eq),
            ShapeDescriptor::Points(_) => None,
        }
    }

    pub fn as_points(&self) -> Option<&[(f64, f64)]> {
        match self {
            ShapeDescriptor::Points(points) => Some(points),
            ShapeDescriptor::Equation(_) => None,
        }
    }
}

impl fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeDescriptor::Points(points) => write!(f, "{} point(s)", points.len()),
            ShapeDescriptor::Equation(eq) => write!(f, "y = {}", eq),
        }
    }
}

/// Unit used when the user leaves a unit field blank
pub const DEFAULT_UNIT: &str = "units";

/// Free-text unit labels for the two axes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisUnits {
    pub x: String,
    pub y: String,
}

impl AxisUnits {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Like `new`, but blank labels fall back to `"units"`
    pub fn or_default(x: &str, y: &str) -> Self {
        let pick = |s: &str| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                DEFAULT_UNIT.to_string()
            } else {
                trimmed.to_string()
            }
        };
        Self::new(pick(x), pick(y))
    }

    pub fn x_label(&self) -> String {
        format!("X ({})", self.x)
    }

    pub fn y_label(&self) -> String {
        format!("Y ({})", self.y)
    }
}

impl Default for AxisUnits {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT, DEFAULT_UNIT)
    }
}
