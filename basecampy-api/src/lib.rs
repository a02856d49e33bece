//! # Basecampy API Server Library
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `cookies`: Auth cookie headers
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validating request extractors
//! - `middleware`: Authentication and security headers
//! - `response`: Success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
