// src/config.rs
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Generative AI API key
    pub gemini_api_key: String,

    /// Generative AI API base URL, without trailing slash
    #[serde(default = "default_api_base")]
    pub gemini_api_base: String,

    /// Model used for poster and model-image synthesis
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Model used for outfit analysis, captions and background enhancement
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// HTTP timeout for a single backend call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest accepted upload width or height in pixels
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,

    /// Multipart body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Idle sessions older than this are evicted
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,

    /// Language the ad copy is written in
    #[serde(default = "default_caption_language")]
    pub caption_language: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    180
}

fn default_max_image_dimension() -> u32 {
    4096
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_session_ttl_secs() -> i64 {
    86400
}

fn default_caption_language() -> String {
    "Vietnamese".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
