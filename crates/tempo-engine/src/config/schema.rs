use serde::{Deserialize, Serialize};
use tempo_common::protocol::{Feature, Product};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempoConfig {
    #[serde(default)]
    pub keys: StoreKeys,
    #[serde(default)]
    pub foundations: FoundationsConfig,
    #[serde(default)]
    pub fluency: FluencyConfig,
    #[serde(default)]
    pub direct: DirectConfig,
    #[serde(default)]
    pub detect: DetectConfig,
}

/// Session store keys under which the capture layer files each template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreKeys {
    #[serde(default = "default_fluency_time")]
    pub fluency_time: String,
    #[serde(default = "default_fluency_validation")]
    pub fluency_validation: String,
    #[serde(default = "default_foundations_time")]
    pub foundations_time: String,
    #[serde(default = "default_foundations_validation")]
    pub foundations_validation: String,
}

impl StoreKeys {
    pub fn key(&self, product: Product, feature: Feature) -> &str {
        match (product, feature) {
            (Product::FluencyBuilder, Feature::AddTime) => &self.fluency_time,
            (Product::FluencyBuilder, Feature::ValidateLesson) => &self.fluency_validation,
            (Product::Foundations, Feature::AddTime) => &self.foundations_time,
            (Product::Foundations, Feature::ValidateLesson) => &self.foundations_validation,
        }
    }
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            fluency_time: default_fluency_time(),
            fluency_validation: default_fluency_validation(),
            foundations_time: default_foundations_time(),
            foundations_validation: default_foundations_validation(),
        }
    }
}

fn default_fluency_time() -> String {
    "fluency_builder.add_time".into()
}

fn default_fluency_validation() -> String {
    "fluency_builder.validate_lesson".into()
}

fn default_foundations_time() -> String {
    "foundations.add_time".into()
}

fn default_foundations_validation() -> String {
    "foundations.validate_lesson".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundationsConfig {
    /// Largest time increment the backend accepts in one request.
    #[serde(default = "default_max_chunk_ms")]
    pub max_chunk_ms: u64,
}

impl Default for FoundationsConfig {
    fn default() -> Self {
        Self {
            max_chunk_ms: default_max_chunk_ms(),
        }
    }
}

fn default_max_chunk_ms() -> u64 {
    8 * 60 * 1000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FluencyConfig {
    /// Skip re-sending a validation template that was already dispatched.
    #[serde(default)]
    pub guard_validation: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectConfig {
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectConfig {
    #[serde(default)]
    pub foundations_hosts: Vec<String>,
    #[serde(default)]
    pub fluency_hosts: Vec<String>,
}
