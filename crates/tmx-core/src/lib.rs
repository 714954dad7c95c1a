//! # tmx-core — Foundational Types for the Transaction Engine
//!
//! Leaf crate of the workspace. Defines the identifier newtypes, the UTC
//! timestamp, and the field-level validation vocabulary shared by every
//! other crate. Depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `TransactionId`,
//!    `DocumentRequestId`, `UserId`, `FileRef` are distinct types. A
//!    document id cannot be passed where a transaction id is expected.
//!
//! 2. **Typed fields for validation failures.** Every validation error names
//!    the offending [`Field`] structurally, so callers map rejections to
//!    form fields without inspecting message text.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] wraps `chrono::DateTime<Utc>`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tmx-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::{Field, FieldError, ValidationError};
pub use identity::{DocumentRequestId, FileRef, TransactionId, UserId};
pub use temporal::Timestamp;
