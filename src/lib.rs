//! Clipforge: Media Generation Orchestration
//!
//! Orchestrates slow, externally-hosted media generation (short video clips
//! rendered from text prompts), tracks asynchronous completion via polling,
//! degrades to a text description when the primary provider fails, and caches
//! completed artifacts by content fingerprint so identical requests are never
//! regenerated.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod fingerprint;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod types;
