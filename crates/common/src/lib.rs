//! Common utilities shared across the gateway workspace.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (structural decoding, validation, constants)
pub mod jwt;
