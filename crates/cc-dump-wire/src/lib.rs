//! Typed Anthropic Messages API wire schema: requests, responses, and SSE
//! stream events, each forward-compatible via a flattened `unknown_fields`
//! bag or an `Unknown` fallback variant.

pub mod content;
pub mod error;
pub mod request;
pub mod response;
pub mod sse;
pub mod unknown_fields;

pub use content::{CacheControl, ContentBlock, SystemBlock, SystemPrompt, ToolResultContent};
pub use error::{ErrorDetail, ErrorResponse};
pub use request::{Message, MessageContent, Request, Role, ThinkingConfig, ToolDefinition};
pub use response::{ResponseMessage, Usage};
pub use sse::{Delta, MessageDelta, StreamEvent, StreamMessageStart, WireError};
pub use unknown_fields::UnknownFields;

#[cfg(test)]
mod tests;
