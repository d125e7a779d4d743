// src/services/mod.rs
pub mod image_processor;
pub mod providers;
pub mod redesign_service;
pub mod retry;
pub mod scratch;
pub mod style_catalog;

pub use image_processor::ImageProcessor;
pub use redesign_service::{PipelineOptions, RedesignService};
pub use retry::RetryPolicy;
pub use scratch::ScratchFile;
pub use style_catalog::StyleCatalog;
