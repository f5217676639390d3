//! textgen-client
//!
//! A unified client for AI text-generation providers: OpenAI-compatible
//! APIs, Anthropic's messages API, a locally hosted model server, and
//! arbitrary OpenAI-compatible custom endpoints, behind one
//! request/response contract with resilient delivery — bounded
//! exponential-backoff retry, timeout enforcement, a classified error
//! taxonomy, and streamed token delivery through callbacks.
//!
//! ```rust,ignore
//! use textgen_client::{GenClient, Provider, ProviderConfig};
//!
//! let config = ProviderConfig::new(Provider::OpenAi, "gpt-4o-mini")
//!     .with_api_key(std::env::var("OPENAI_API_KEY")?);
//! let client = GenClient::new(config);
//! let response = client.generate("Summarize this note", "You are concise.").await?;
//! println!("{}", response.text);
//! ```
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod platform;
pub mod retry;
pub mod types;

mod parse;
mod request;
mod stream;

pub use client::GenClient;
pub use error::{ErrorKind, GenError};
pub use platform::PlatformCapabilities;
pub use retry::RetryPolicy;
pub use types::{GenerationResponse, Provider, ProviderConfig, StreamFragment, Usage};
