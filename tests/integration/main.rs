//! Integration tests for the walker
//!
//! These tests use wiremock to stand in for the MediaWiki API and run the
//! full claim, fetch and commit cycle against SQLite files.

mod common;
mod crawl_tests;
mod recovery_tests;
