//! Memory service implementations for Palaver.

pub mod http;
pub mod in_memory;
pub mod noop;

pub use http::HttpMemoryService;
pub use in_memory::InMemoryService;
pub use noop::NoopMemory;

use palaver_config::MemoryConfig;
use palaver_core::error::MemoryError;
use palaver_core::memory::{MemoryFetchRequest, MemoryService};
use std::sync::Arc;
use std::time::Duration;

/// Build the memory service named by `config.backend`.
pub fn from_config(config: &MemoryConfig) -> Result<Arc<dyn MemoryService>, MemoryError> {
    match config.backend.as_str() {
        "http" => Ok(Arc::new(HttpMemoryService::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        "in_memory" => Ok(Arc::new(InMemoryService::new())),
        "none" => Ok(Arc::new(NoopMemory)),
        other => Err(MemoryError::Unavailable(format!("Unknown memory backend '{other}'"))),
    }
}

/// The fetch parameters configured in `[memory]`, for `query_text`.
pub fn fetch_request(config: &MemoryConfig, query_text: impl Into<String>) -> MemoryFetchRequest {
    MemoryFetchRequest {
        query_text: query_text.into(),
        result_limit: config.result_limit,
        vector_search_limit: config.vector_search_limit,
        vector_search_threshold: config.vector_search_threshold,
        long_term_threshold: config.long_term_threshold,
    }
}
