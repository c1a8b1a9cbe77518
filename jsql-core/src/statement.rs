//! Statement execution outcome and flat-text rendering.
//!
//! Rows render as a naive comma join: values containing commas are neither
//! quoted nor escaped. The output is for people reading a terminal, and
//! existing consumers rely on the unescaped form.

use crate::drivers::DatabaseSession;
use crate::error::JsqlError;
use crate::report::Report;
use crate::Result;
use std::io::Write;

/// Field separator for header and data lines.
pub const SEPARATOR: &str = ",";

/// Column names and rows of a row-producing statement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowSet {
    /// Column names in result order, never renamed or deduplicated
    pub columns: Vec<String>,
    /// Rows in the order the database returned them
    pub rows: Vec<Vec<String>>,
}

/// What executing one statement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The statement produced a result set
    RowSet(RowSet),
    /// The statement produced only an affected-row count
    UpdateCount(i64),
}

impl QueryOutcome {
    /// Builds an update-count outcome from a driver's affected-row count.
    ///
    /// Counts above `i64::MAX` saturate.
    pub fn update_count(rows_affected: u64) -> Self {
        Self::UpdateCount(i64::try_from(rows_affected).unwrap_or(i64::MAX))
    }

    /// Output lines for this outcome, excluding the surrounding section.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::UpdateCount(count) => vec![format!("Result: {}", count)],
            Self::RowSet(set) => std::iter::once(join_fields(&set.columns))
                .chain(set.rows.iter().map(|row| join_fields(row)))
                .collect(),
        }
    }
}

/// Joins values with [`SEPARATOR`], no quoting.
pub fn join_fields(values: &[String]) -> String {
    values.join(SEPARATOR)
}

/// Accumulates rows for a [`RowSet`], rejecting NULL cells.
#[derive(Debug)]
pub struct RowSetBuilder {
    set: RowSet,
}

impl RowSetBuilder {
    /// Starts a row set with the statement's column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            set: RowSet {
                columns,
                rows: Vec::new(),
            },
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.set.columns.len()
    }

    /// Appends one row of cell texts; `None` marks a NULL cell.
    ///
    /// # Errors
    /// Returns [`JsqlError::NullCell`] naming the 1-based row number and the
    /// column of the first NULL cell.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) -> Result<()> {
        let row_number = self.set.rows.len().saturating_add(1);
        let mut row = Vec::with_capacity(cells.len());
        for (index, cell) in cells.into_iter().enumerate() {
            match cell {
                Some(text) => row.push(text),
                None => {
                    return Err(JsqlError::NullCell {
                        row: row_number,
                        column: self.set.columns.get(index).cloned().unwrap_or_default(),
                    });
                }
            }
        }
        self.set.rows.push(row);
        Ok(())
    }

    /// Finishes the row set.
    pub fn finish(self) -> QueryOutcome {
        QueryOutcome::RowSet(self.set)
    }
}

/// Executes `sql` verbatim on the session.
pub async fn execute(session: &mut dyn DatabaseSession, sql: &str) -> Result<QueryOutcome> {
    tracing::info!("Executing statement ({} bytes)", sql.len());
    let outcome = session.execute(sql).await?;
    match &outcome {
        QueryOutcome::RowSet(set) => tracing::info!(
            "Statement returned {} columns, {} rows",
            set.columns.len(),
            set.rows.len()
        ),
        QueryOutcome::UpdateCount(count) => tracing::info!("Statement affected {} rows", count),
    }
    Ok(outcome)
}

/// Writes the statement section: the SQL echo, the outcome, a trailing blank.
pub async fn print_statement<W: Write>(
    session: &mut dyn DatabaseSession,
    sql: &str,
    out: &mut Report<W>,
) -> Result<QueryOutcome> {
    out.blank()?;
    out.line("SQL:")?;
    out.line(sql)?;
    out.blank()?;
    let outcome = execute(session, sql).await?;
    out.lines(outcome.lines())?;
    out.blank()?;
    Ok(outcome)
}
