//! Common library for the FinSphere backend
//!
//! This crate provides shared functionality used by the FinSphere services,
//! including database connectivity and error handling.

pub mod database;
pub mod error;
