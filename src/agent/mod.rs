pub mod ai_model;
pub mod context;
pub mod dropdown;
pub mod error;
pub mod orchestrator;
pub mod page_context;
pub mod prompts;
pub mod resolver;
