pub mod build;
pub mod matching;
