//! # Leadflow
//!
//! Lead lifecycle core for a dealership CRM, usable both as a library and
//! through the `leadflow` CLI.
//!
//! The library talks to the CRM through the [`api::LeadApi`] trait, so every
//! controller can run against the bundled [`api::HttpApi`] or an in-memory
//! fake.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! leadflow = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadflow::api::HttpApi;
//! use leadflow::config::ClientConfig;
//! use leadflow::context::CrmContext;
//! use leadflow::stage::{StageController, StagePipeline};
//!
//! let config = ClientConfig::default();
//! let api = HttpApi::new("https://crm.example.com", "token", config.http_timeout())?;
//! let ctx = CrmContext::new(Arc::new(api), config)?;
//!
//! let lead = ctx.api.get_lead("lead-1").await?;
//! let pipeline = StagePipeline::from_server_or_config(ctx.api.as_ref(), &ctx.config).await;
//! let mut stages = StageController::new(ctx.clone(), pipeline);
//! let outcome = stages.commit(&lead, "lost", Some("Bought elsewhere".into())).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod export;
pub mod prompt;
pub mod schedule;
pub mod showroom;
pub mod stage;
pub mod sync;
pub mod types;
