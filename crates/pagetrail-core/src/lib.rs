//! Core types and trait definitions for pagetrail.
//!
//! This crate is deliberately free of HTTP and filesystem dependencies. The
//! collector and the history view are written against the [`store`] and
//! [`source`] traits; concrete backends live in their own crates.

// Trait signatures spell out their `Send` futures; implementors write plain
// `async fn`.
#![allow(async_fn_in_trait)]

pub mod collect;
pub mod error;
pub mod history;
pub mod page;
pub mod source;
pub mod store;
pub mod version;

pub use error::{Error, Result};
