pub mod matching;
pub mod plan;
pub mod settings;
pub mod upload;
