//! Pressroom Kernel Library
//!
//! This library exposes kernel internals for integration testing.
//! The main entry point for running the server is the `pressroom` binary.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod services;
pub mod state;
