//! # Basecampy Shared Library
//!
//! This crate contains the data layer and the security primitives used by the
//! Basecampy API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and project-scoped authorization
//! - `cascade`: Project deletion across dependent tables
//! - `db`: Connection pool and migrations
//! - `mail`: Transactional email collaborator
//! - `storage`: Uploaded file storage collaborator

pub mod auth;
pub mod cascade;
pub mod db;
pub mod mail;
pub mod models;
pub mod storage;

/// Current version of the Basecampy shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
