//! # API Route Modules
//!
//! - `stages` — the stage catalog per transaction side (reference data).
//! - `transactions` — open, read, edit, transition and delete transactions.
//! - `documents` — document requests of one transaction and their lifecycle.
//! - `participants` — membership, per-participant grants and permission checks.
//!
//! Handlers are thin: they parse identifiers, attach the caller's actor
//! context, and delegate to the engine facade.

pub mod documents;
pub mod participants;
pub mod stages;
pub mod transactions;
