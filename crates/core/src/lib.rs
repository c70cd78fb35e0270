//! # Palaver Core
//!
//! Domain types, traits, and error definitions for the Palaver agent loop.
//! This crate defines the domain model that all other crates implement against.
//!
//! Every collaborator (completion service, memory service, tool) is a trait
//! here; implementations live in their respective crates, which keeps the
//! turn engine testable with stub implementations.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, ToolError};
pub use memory::{MemoryFetchRequest, MemoryService, RelatedContext, ScoredMemory};
pub use message::{Message, Role, ToolArguments, ToolCallRequest};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use tool::{FnTool, ParamType, ParameterSchema, Tool, ToolRegistry};
