//! Recipe executor
//!
//! Runs a recipe's steps against a table, one after another.

use serde::Serialize;

use super::longer::pivot_longer;
use super::recipe::{Recipe, Step};
use super::wider::pivot_wider;
use super::Reshaped;
use crate::diagnostics::Diagnostic;
use crate::error::{PipelineError, PipelineResult};
use crate::table::Table;

/// What one step did to the table
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub kind: &'static str,
    pub rows_in: usize,
    pub rows_out: usize,
    pub cols_in: usize,
    pub cols_out: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of executing a recipe
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Table produced by the last step
    pub table: Table,
    /// One report per step, in order
    pub steps: Vec<StepReport>,
}

impl ExecutionResult {
    /// All diagnostics, tagged with the step that produced them
    pub fn diagnostics(&self) -> impl Iterator<Item = (usize, &Diagnostic)> {
        self.steps
            .iter()
            .flat_map(|s| s.diagnostics.iter().map(move |d| (s.step, d)))
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics().filter(|(_, d)| d.is_warning()).count()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Reshaped: {} rows x {} columns after {} step(s), {} warning(s)",
            self.table.n_rows(),
            self.table.n_cols(),
            self.steps.len(),
            self.warning_count()
        )
    }
}

/// Run a single step.
pub fn run_step(table: &Table, step: &Step) -> crate::error::ReshapeResult<Reshaped> {
    match step {
        Step::PivotLonger(opts) => pivot_longer(table, opts),
        Step::PivotWider(opts) => pivot_wider(table, opts),
    }
}

/// Execute a recipe on a table
///
/// The input table is never modified. The first failing step aborts the
/// run with [`PipelineError::Step`].
pub fn execute(table: &Table, recipe: &Recipe) -> PipelineResult<ExecutionResult> {
    let mut current = table.clone();
    let mut steps = Vec::with_capacity(recipe.steps.len());

    for (i, step) in recipe.steps.iter().enumerate() {
        let _span = tracing::info_span!("step", index = i, kind = step.name()).entered();

        let Reshaped { table: next, diagnostics } =
            run_step(&current, step).map_err(|source| PipelineError::Step { step: i, source })?;

        tracing::info!(
            rows = next.n_rows(),
            cols = next.n_cols(),
            "{} done",
            step.name()
        );

        steps.push(StepReport {
            step: i,
            kind: step.name(),
            rows_in: current.n_rows(),
            rows_out: next.n_rows(),
            cols_in: current.n_cols(),
            cols_out: next.n_cols(),
            diagnostics,
        });
        current = next;
    }

    Ok(ExecutionResult {
        table: current,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReshapeError;
    use crate::reshape::recipe::example_recipe;
    use crate::reshape::{LongerOptions, WiderOptions};
    use crate::table::Value;

    fn families() -> Table {
        Table::from_rows(
            &["family", "dob_1", "dob_2", "name_1", "name_2"],
            vec![
                vec![1.into(), "1998".into(), "2000".into(), "Susan".into(), "Jose".into()],
                vec![2.into(), "1996".into(), Value::Null, "Mark".into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_execute_example() {
        let result = execute(&families(), &example_recipe()).unwrap();

        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].rows_out, 3);
        assert_eq!(
            result.table.column_names(),
            vec!["family", "child_1", "child_2"]
        );
        assert_eq!(result.table.get(0, "child_2"), Some(&Value::from("Jose")));
        assert_eq!(result.table.get(1, "child_2"), Some(&Value::Null));
        assert_eq!(result.warning_count(), 0);
        assert!(result.summary().contains("2 rows x 3 columns"));
    }

    #[test]
    fn test_step_error_reports_index() {
        let recipe = Recipe::new()
            .with_step(Step::PivotLonger(LongerOptions::new(["wk1"])))
            .with_step(Step::PivotWider(WiderOptions::new(["missing"], ["value"])));
        let t = Table::from_rows(&["id", "wk1"], vec![vec![1.into(), 2.into()]]).unwrap();

        match execute(&t, &recipe) {
            Err(PipelineError::Step { step: 1, source: ReshapeError::UnknownColumn(c) }) => {
                assert_eq!(c, "missing")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_diagnostics_are_tagged_by_step() {
        let recipe = Recipe::new()
            .with_step(Step::PivotLonger(LongerOptions::new(["wk1", "wk2"]).values_drop_na(true)))
            .with_step(Step::PivotWider(WiderOptions::new(["id"], ["value"]).id_cols(Vec::<String>::new())));
        let t = Table::from_rows(
            &["id", "wk1", "wk2"],
            vec![
                vec![1.into(), 5.into(), Value::Null],
                vec![1.into(), 3.into(), 4.into()],
            ],
        )
        .unwrap();

        let result = execute(&t, &recipe).unwrap();
        let tagged: Vec<(usize, &Diagnostic)> = result.diagnostics().collect();
        assert_eq!(tagged[0], (0, &Diagnostic::DroppedMissing { rows: 1 }));
        assert!(matches!(tagged[1], (1, Diagnostic::Collision { key_tuples: 1, .. })));
        assert_eq!(result.warning_count(), 1);
    }
}
