//! Integration tests for the clip generation and caching service

mod cache_flow;
mod config_integration;
mod sweeper_lifecycle;
mod test_utils;
