pub mod analysis;
pub mod chunker;
pub mod context;
pub mod generation;
pub mod llm_provider;
pub mod session_store;
pub mod text_extract;
