//! Pipeline stages

use serde::{Deserialize, Serialize};

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    /// Stage 1: Clean raw extracts into the silver layer
    Clean,
    /// Stage 2: Run quality checks over the silver layer
    Validate,
    /// Stage 3: Upsert dimensions
    LoadDimensions,
    /// Stage 4: Insert facts
    LoadFacts,
}

impl PipelineStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![
            Self::Clean,
            Self::Validate,
            Self::LoadDimensions,
            Self::LoadFacts,
        ]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Validate => "validate",
            Self::LoadDimensions => "load-dimensions",
            Self::LoadFacts => "load-facts",
        }
    }

    /// Get stage description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clean => "Clean raw extracts into the silver layer",
            Self::Validate => "Validate silver datasets and persist the quality report",
            Self::LoadDimensions => "Upsert warehouse dimensions",
            Self::LoadFacts => "Insert warehouse facts",
        }
    }

    /// Get stage index (1-based)
    pub fn index(&self) -> usize {
        match self {
            Self::Clean => 1,
            Self::Validate => 2,
            Self::LoadDimensions => 3,
            Self::LoadFacts => 4,
        }
    }

    /// Check if this stage writes to the warehouse
    pub fn uses_warehouse(&self) -> bool {
        matches!(self, Self::LoadDimensions | Self::LoadFacts)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "clean" | "1" => Ok(Self::Clean),
            "validate" | "2" => Ok(Self::Validate),
            "load-dimensions" | "dimensions" | "3" => Ok(Self::LoadDimensions),
            "load-facts" | "facts" | "4" => Ok(Self::LoadFacts),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}
