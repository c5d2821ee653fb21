//! HTTP command handlers
//!
//! Each handler resolves the caller, validates input, delegates to the
//! database layer or the compliance engine, and maps failures to `ApiError`.

pub mod account;
pub mod audit;
pub mod compliance;
pub mod control;
pub mod evidence;
pub mod webhook;
