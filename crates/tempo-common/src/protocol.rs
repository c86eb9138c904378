use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations a service can perform against the learning backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AddTime,
    ValidateLesson,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::AddTime => write!(f, "add_time"),
            Feature::ValidateLesson => write!(f, "validate_lesson"),
        }
    }
}

/// Product flavours of the learning application. Each one speaks its own wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Foundations,
    FluencyBuilder,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Foundations => write!(f, "foundations"),
            Product::FluencyBuilder => write!(f, "fluency_builder"),
        }
    }
}

/// Opaque handle to a browser tab, as returned by the active-tab lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabHandle(pub String);

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&Product::FluencyBuilder).unwrap(),
            "\"fluency_builder\""
        );
        let feature: Feature = serde_json::from_str("\"validate_lesson\"").unwrap();
        assert_eq!(feature, Feature::ValidateLesson);
        assert_eq!(Feature::AddTime.to_string(), "add_time");
    }
}
