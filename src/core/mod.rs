//! core
//!
//! Validated domain types shared by the reconciliation logic and the forge
//! layer. Construction-time validation keeps invalid desired state out of
//! the system before any remote call is made.

pub mod types;
