//! # Lifecycle Matrix Subcommand
//!
//! Prints, for every document request status, the status each transition
//! kind leads to. `-` marks a kind that is not valid from that status.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tmx_state::{DocumentStatus, TransitionKind};

/// Arguments for `tmx matrix`.
#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Emit the matrix as JSON rows instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One valid `(from, kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub from: DocumentStatus,
    pub kind: TransitionKind,
    /// `None` for `DELETE`, which removes the request.
    pub to: Option<DocumentStatus>,
}

/// Execute `tmx matrix`.
pub fn run_matrix(args: &MatrixArgs) -> Result<u8> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&matrix_rows())?);
    } else {
        print!("{}", render_table());
    }
    Ok(0)
}

/// Every permitted transition, status-major.
pub fn matrix_rows() -> Vec<MatrixRow> {
    DocumentStatus::ALL
        .iter()
        .flat_map(|&from| {
            TransitionKind::ALL
                .iter()
                .filter(move |kind| from.permits(**kind))
                .map(move |&kind| MatrixRow {
                    from,
                    kind,
                    to: kind.resulting_status(from),
                })
        })
        .collect()
}

fn cell(from: DocumentStatus, kind: TransitionKind) -> String {
    if !from.permits(kind) {
        return "-".to_string();
    }
    match kind.resulting_status(from) {
        Some(to) => to.to_string(),
        None => "(removed)".to_string(),
    }
}

/// Fixed-width table: statuses down, transition kinds across.
pub fn render_table() -> String {
    let mut widths: Vec<usize> = TransitionKind::ALL
        .iter()
        .map(|k| k.as_str().len())
        .collect();
    for from in DocumentStatus::ALL {
        for (i, kind) in TransitionKind::ALL.iter().enumerate() {
            widths[i] = widths[i].max(cell(from, *kind).len());
        }
    }
    let first = DocumentStatus::ALL
        .iter()
        .map(|s| s.as_str().len())
        .max()
        .unwrap_or(0)
        .max("FROM".len());

    let mut out = format!("{:<first$}", "FROM");
    for (i, kind) in TransitionKind::ALL.iter().enumerate() {
        out.push_str(&format!("  {:<w$}", kind.as_str(), w = widths[i]));
    }
    out.push('\n');

    for from in DocumentStatus::ALL {
        out.push_str(&format!("{:<first$}", from.as_str()));
        for (i, kind) in TransitionKind::ALL.iter().enumerate() {
            out.push_str(&format!("  {:<w$}", cell(from, *kind), w = widths[i]));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_is_a_dead_end() {
        assert!(matrix_rows()
            .iter()
            .all(|row| row.from != DocumentStatus::Approved));
    }

    #[test]
    fn submitted_leads_to_review_outcomes_only() {
        let rows: Vec<MatrixRow> = matrix_rows()
            .into_iter()
            .filter(|r| r.from == DocumentStatus::Submitted)
            .collect();
        assert_eq!(
            rows,
            vec![
                MatrixRow {
                    from: DocumentStatus::Submitted,
                    kind: TransitionKind::Approve,
                    to: Some(DocumentStatus::Approved),
                },
                MatrixRow {
                    from: DocumentStatus::Submitted,
                    kind: TransitionKind::RequestRevision,
                    to: Some(DocumentStatus::NeedsRevision),
                },
            ]
        );
    }

    #[test]
    fn draft_delete_removes_the_request() {
        let row = matrix_rows()
            .into_iter()
            .find(|r| r.from == DocumentStatus::Draft && r.kind == TransitionKind::Delete)
            .unwrap();
        assert_eq!(row.to, None);
    }

    #[test]
    fn table_has_a_row_per_status() {
        let table = render_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), DocumentStatus::ALL.len() + 1);
        assert!(lines[0].starts_with("FROM"));
        assert!(lines[0].contains("REQUEST_REVISION"));
        let submitted = lines
            .iter()
            .find(|l| l.starts_with("SUBMITTED"))
            .unwrap();
        assert!(submitted.contains("APPROVED"));
        assert!(submitted.contains("NEEDS_REVISION"));
    }
}
