pub mod detection;
pub mod pipeline;

pub use detection::derive_last_detection;
pub use pipeline::{AiSimulator, ProcessingState, RecognitionPipeline, SimulatorConfig};
