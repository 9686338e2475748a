pub mod admission;
pub mod api;
pub mod assembler;
pub mod completion;
pub mod config;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod search;
