// src/services/mod.rs
pub mod backend;
pub mod generation_client;
pub mod image_processor;
pub mod session_store;
pub mod studio;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::GeminiBackend;
pub use generation_client::{GenerationClient, ModelSettings};
pub use image_processor::ImageProcessor;
pub use session_store::SessionStore;
