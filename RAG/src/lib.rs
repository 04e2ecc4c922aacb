pub mod chunker;
pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod embedding;
pub mod extractor;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod sanitizer;
pub mod vector_index;
pub mod web_context;
