//! mediaforge
//!
//! Generation-orchestration core for remote media providers: fan-out
//! candidate image generation against chat-style and image-API models,
//! submit-then-poll video jobs with live progress relayed over a
//! half-duplex SSE-framed stream, artifact extraction from unstructured
//! provider payloads, and exactly-once persistence of finished artifacts.
//!
//! Authentication and storage are external collaborators; the core
//! consumes them through the traits in [`traits`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mediaforge::{Orchestrator, ProviderConfig};
//! use mediaforge::types::GenerationRequest;
//! # use mediaforge::traits::ArtifactStore;
//! # async fn run(store: Arc<dyn ArtifactStore>) -> Result<(), mediaforge::GenError> {
//! let config = ProviderConfig::from_env()?;
//! let orchestrator = Orchestrator::new(config, store)?;
//!
//! let request = GenerationRequest::builder("a lighthouse at dusk", "nano-banana-pro")
//!     .candidate_count(4)
//!     .build()?;
//! let candidates = orchestrator.generate_candidates(&request).await?;
//! println!("got {} candidates", candidates.len());
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod fanout;
pub mod job;
pub mod models;
pub mod orchestrator;
pub mod relay;
pub mod server_adapters;
pub mod traits;
pub mod types;

pub use config::ProviderConfig;
pub use error::GenError;
pub use orchestrator::{Orchestrator, RelayStream};
