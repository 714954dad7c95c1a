//! # tmx-cli — CLI Tool for the Brokerage Transaction Engine
//!
//! Provides the `tmx` command-line interface over the pure parts of the
//! engine: the stage catalog and the document request lifecycle.
//!
//! ## Subcommands
//!
//! - `tmx stages <side>` — Ordered stage catalog for a side.
//! - `tmx resolve --side <side> --current <value>` — Resolve a stored stage
//!   value (identifier or legacy ordinal) to its catalog position, as JSON.
//! - `tmx matrix` — Which document transitions apply from which status.
//!
//! ```bash
//! tmx stages sell-side
//! tmx resolve --side BUY_SIDE --current 3
//! tmx matrix --json
//! ```

pub mod matrix;
pub mod stages;
