use serde::{Deserialize, Serialize};

/// Kind of asynchronous generation job tracked by the backend queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "3d")]
    Model3d,
    #[serde(rename = "2d")]
    Image,
}

impl JobKind {
    /// Kind name for display in the CLI
    pub fn name(&self) -> &str {
        match self {
            Self::Model3d => "3D model",
            Self::Image => "Image",
        }
    }

    /// Queue selector sent as the `type` query parameter
    pub fn id(&self) -> &str {
        match self {
            Self::Model3d => "3d",
            Self::Image => "2d",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Model3d => "3d-model-generation",
            Self::Image => "image-generation",
        }
    }

    /// Rough per-job processing time used for wait estimates
    pub fn estimated_time_secs(&self) -> u32 {
        match self {
            Self::Model3d => 30,
            Self::Image => 15,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.id() == id)
    }

    /// All available kinds
    pub fn all() -> [JobKind; 2] {
        [Self::Model3d, Self::Image]
    }
}

impl Default for JobKind {
    fn default() -> Self {
        Self::Model3d
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
