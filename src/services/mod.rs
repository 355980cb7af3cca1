pub mod illustrator;
pub mod llm;
pub mod relay;
pub mod segmenter;
