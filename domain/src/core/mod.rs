//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelId`] — identifier of a backend model
//! - [`error::DomainError`] — domain-level errors
//! - [`string::truncate`] — UTF-8 safe truncation for log previews
//! - [`clock::now_millis`] — wall clock used for history timestamps

pub mod clock;
pub mod error;
pub mod model;
pub mod string;
