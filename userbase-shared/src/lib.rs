//! # Userbase Shared Library
//!
//! Persistence models for accounts, profiles, groups, permissions and
//! per-group role assignments, backed by PostgreSQL through sqlx.
//!
//! ## Module Organization
//!
//! - `config`: Configuration loaded from the environment
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their operations
//! - `auth`: Password hashing, activation codes, authorization checks
//! - `error`: Common error type

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

/// Current version of the userbase shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
