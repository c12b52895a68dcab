//! Generation provider clients and abstractions.

pub mod anthropic;
pub mod client;

pub use anthropic::AnthropicClient;
pub use client::GenerationProvider;
