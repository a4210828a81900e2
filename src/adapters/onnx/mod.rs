pub mod learned;
pub mod yolo_engine;

pub use learned::LearnedDetector;
