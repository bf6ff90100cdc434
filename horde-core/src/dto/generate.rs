//! Generation submission and result DTOs

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/v2/generate/async`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: GenerationParams,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub censor_nsfw: bool,
    /// Ask Horde to serve the image from object storage instead of inline base64
    #[serde(default)]
    pub r2: bool,
}

/// Sampler parameters of a generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub sampler_name: String,
    pub cfg_scale: f32,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    pub n: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            sampler_name: "k_euler_a".to_string(),
            cfg_scale: 7.0,
            steps: 25,
            width: 512,
            height: 512,
            seed: None,
            n: 1,
        }
    }
}

/// Response of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedJob {
    /// Job identifier used by every later call
    pub id: String,
    #[serde(default)]
    pub kudos: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body returned by `GET /api/v2/generate/status/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationStatus {
    pub done: bool,
    pub faulted: bool,
    pub generations: Vec<Generation>,
}

/// One generated image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generation {
    pub img: String,
    pub seed: Option<String>,
    pub model: Option<String>,
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
    pub censored: bool,
}
