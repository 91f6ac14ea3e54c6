//! Core library components.
//!
//! This module contains the reusable business logic: configuration handling,
//! sealed-box encryption and the concurrent batch dispatcher.

pub mod config;
pub mod dispatch;
pub mod sealed_box;
