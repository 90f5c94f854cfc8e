// src/services/mod.rs
pub mod blender;
pub mod image_processor;
pub mod names;
pub mod pipeline;
pub mod prompt;
pub mod replicate;
pub mod retry;
pub mod vision;
pub mod vocabulary;

pub use image_processor::ImageProcessor;
pub use pipeline::PredictionPipeline;
pub use replicate::{ImageModel, ModelInvoker, ReplicateClient};
pub use vision::{FeatureExtractor, OpenAiVision, VisionModel};
