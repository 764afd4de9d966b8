//! Request middleware.

pub mod context;
