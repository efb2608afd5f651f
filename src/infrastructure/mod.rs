//! Infrastructure adapters: config, logging, persistence, and the HTTP
//! implementations of the LLM/search ports.

pub mod config;
pub mod keystore;
pub mod llm;
pub mod logging;
pub mod snapshot;
pub mod web_search;

pub use config::ConfigLoader;
pub use keystore::SealedKeyStore;
