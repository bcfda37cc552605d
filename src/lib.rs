//! Base vs. LoRA image comparison client.
//!
//! Sends one prompt to a base image-generation endpoint and to a trained
//! (LoRA) endpoint at the same time and collects both images so they can be
//! viewed side by side.
//!
//! ```rust,ignore
//! use lora_compare::{ComparisonSession, CompareConfig, ImageClient, ParamUpdate};
//!
//! #[tokio::main]
//! async fn main() -> lora_compare::Result<()> {
//!     let config = CompareConfig::from_env()?;
//!     let session = ComparisonSession::new(ImageClient::new(config.clone())?, config.wire_format);
//!     session.update_param(ParamUpdate::LoraScale(0.8));
//!
//!     if let Some(pair) = session.submit("a red fox in the snow").await? {
//!         println!("base:    {}", pair.base.display_uri());
//!         println!("trained: {}", pair.trained.display_uri());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod output;
pub mod session;

pub use client::{ImageBackend, ImageClient};
pub use config::CompareConfig;
pub use error::{CompareError, Result};
pub use models::*;
pub use session::{ComparisonSession, ComparisonState, FailureNotifier, LogNotifier};
