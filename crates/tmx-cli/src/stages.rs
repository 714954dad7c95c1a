//! # Stage Catalog Subcommands
//!
//! `tmx stages` lists a side's ordered stages; `tmx resolve` maps a stored
//! stage value onto that list the same way the engine does when it reads
//! a transaction.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use tmx_state::{
    stages_for_side, ResolvedStage, StageId, StageRef, TransactionSide, TransactionStatus,
};

/// Arguments for `tmx stages`.
#[derive(Args, Debug)]
pub struct StagesArgs {
    /// Transaction side: `buy-side` or `sell-side` (any case, `-` or `_`).
    pub side: TransactionSide,

    /// Emit the catalog as JSON instead of a numbered list.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tmx resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Transaction side.
    #[arg(long)]
    pub side: TransactionSide,

    /// Stored stage value: a stage identifier or a 1-based legacy ordinal.
    #[arg(long)]
    pub current: String,

    /// Business status of the transaction (ACTIVE, CLOSED_SUCCESSFULLY,
    /// TERMINATED_EARLY).
    #[arg(long, default_value = "ACTIVE")]
    pub status: String,
}

#[derive(Debug, Serialize)]
struct CatalogEntry {
    position: usize,
    stage: StageId,
}

/// Execute `tmx stages`.
pub fn run_stages(args: &StagesArgs) -> Result<u8> {
    if args.json {
        println!("{}", render_catalog_json(args.side)?);
    } else {
        print!("{}", render_catalog(args.side));
    }
    Ok(0)
}

/// Execute `tmx resolve`.
pub fn run_resolve(args: &ResolveArgs) -> Result<u8> {
    let status = parse_status(&args.status)?;
    let current = parse_current(&args.current);
    let resolved = ResolvedStage::resolve(args.side, &current, status)
        .with_context(|| format!("cannot resolve {:?} for {}", args.current, args.side))?;
    tracing::info!(side = %args.side, index = resolved.index, "stage resolved");
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(0)
}

/// Numbered, one stage per line.
pub fn render_catalog(side: TransactionSide) -> String {
    stages_for_side(side)
        .iter()
        .enumerate()
        .map(|(i, stage)| format!("{:>2}. {stage}\n", i + 1))
        .collect()
}

pub fn render_catalog_json(side: TransactionSide) -> Result<String> {
    let entries: Vec<CatalogEntry> = stages_for_side(side)
        .iter()
        .enumerate()
        .map(|(i, &stage)| CatalogEntry {
            position: i + 1,
            stage,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "side": side,
        "stages": entries,
    }))?)
}

/// Integers become legacy ordinals; anything else is treated as a name.
pub fn parse_current(raw: &str) -> StageRef {
    match raw.trim().parse::<i64>() {
        Ok(n) => StageRef::Ordinal(n),
        Err(_) => StageRef::Named(raw.trim().to_string()),
    }
}

pub fn parse_status(raw: &str) -> Result<TransactionStatus> {
    let wire = raw.trim().to_ascii_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(wire))
        .with_context(|| format!("unknown transaction status {raw:?}"))
}
