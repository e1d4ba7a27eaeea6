//! Core types for the Tickstream SDK.
//!
//! This module provides the value types shared by the streaming client and
//! its consumers.

pub mod quote;
pub mod symbol;

pub use quote::{QuoteData, QuoteRecord};
pub use symbol::{Symbol, MAX_SYMBOL_LEN};
