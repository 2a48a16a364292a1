//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `TransactionProcessor`, the primary entry point
//! for authorizing payments. Submissions settle on background `tokio` tasks
//! whose completion handles the caller can await or ignore.

pub mod processor;
