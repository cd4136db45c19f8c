//! TeTo learning portal server.
//!
//! Uploads and serves lecture videos and reading materials, and answers
//! student questions with a generative model grounded in the uploaded
//! materials' text plus live web search snippets.

pub mod chat;
pub mod compose;
pub mod config;
pub mod corpus;
pub mod error;
pub mod files;
pub mod gateway;
pub mod generate;
pub mod search;

pub use chat::{ChatOrchestrator, ChatRequest, ChatResponse};
pub use config::Config;
pub use corpus::{CorpusStore, MaterialRecord};
pub use error::PortalError;
pub use gateway::{build_router, AppState, RouterOptions};
pub use search::SearchResult;
