//! Common types used across the AppNexus client library.

pub mod common;

pub use common::*;
