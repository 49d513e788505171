//! Reshape recipe definition
//!
//! A recipe is an ordered list of reshape steps, stored as JSON:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "description": "weekly ranks to long form",
//!   "steps": [
//!     { "type": "pivot_longer", "cols": ["wk1", "wk2"], "names_to": ["week"],
//!       "values_to": "rank", "values_drop_na": true }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::longer::LongerOptions;
use super::names::NameField;
use super::wider::WiderOptions;
use crate::error::{RecipeError, RecipeResult};

fn default_version() -> String {
    "1.0".to_string()
}

/// A complete recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Version of the recipe format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Steps, applied in order; each step sees the previous step's output.
    pub steps: Vec<Step>,
}

/// One reshape step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    PivotLonger(LongerOptions),
    PivotWider(WiderOptions),
}

impl Step {
    /// Short name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Step::PivotLonger(_) => "pivot_longer",
            Step::PivotWider(_) => "pivot_wider",
        }
    }

    /// Input columns this step references, in declaration order.
    pub fn referenced_columns(&self) -> Vec<String> {
        match self {
            Step::PivotLonger(opts) => opts.cols.clone(),
            Step::PivotWider(opts) => opts
                .id_cols
                .iter()
                .flatten()
                .chain(&opts.names_from)
                .chain(&opts.values_from)
                .cloned()
                .collect(),
        }
    }
}

impl Recipe {
    /// Create an empty recipe
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Parse a recipe from JSON string
    pub fn from_json(json: &str) -> RecipeResult<Self> {
        let recipe: Recipe = serde_json::from_str(json)?;
        if recipe.steps.is_empty() {
            return Err(RecipeError::Empty);
        }
        Ok(recipe)
    }

    /// Load a recipe from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RecipeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> RecipeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the first step only references columns present in `headers`.
    ///
    /// Later steps run on derived tables, so their columns are checked when
    /// the recipe executes.
    pub fn validate_headers<S: AsRef<str>>(&self, headers: &[S]) -> RecipeResult<()> {
        let Some(first) = self.steps.first() else {
            return Err(RecipeError::Empty);
        };

        let missing: Vec<String> = first
            .referenced_columns()
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h.as_ref() == col))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RecipeError::MissingColumns { step: 0, columns: missing })
        }
    }
}

impl Default for Recipe {
    fn default() -> Self {
        Self::new()
    }
}

/// Example recipe: split `dob_1, name_1, ...` style headers with `.value`,
/// then spread one of the resulting columns back out by child.
pub fn example_recipe() -> Recipe {
    let longer = LongerOptions::new(["dob_1", "dob_2", "name_1", "name_2"])
        .names_to([NameField::Value, NameField::from("child")])
        .names_sep("_")
        .values_drop_na(true);

    let wider = WiderOptions::new(["child"], ["name"])
        .id_cols(["family"])
        .names_prefix("child_");

    Recipe::new()
        .with_description("Family records: one row per child, then child names side by side")
        .with_step(Step::PivotLonger(longer))
        .with_step(Step::PivotWider(wider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::names::Separator;
    use crate::reshape::wider::ValuesFn;
    use crate::table::Value;

    #[test]
    fn test_parse_recipe() {
        let json = r#"{
            "description": "ranks",
            "steps": [
                {
                    "type": "pivot_longer",
                    "cols": ["wk1", "wk2"],
                    "names_to": ["week"],
                    "values_to": "rank",
                    "values_drop_na": true
                },
                {
                    "type": "pivot_wider",
                    "names_from": ["week"],
                    "values_from": ["rank"],
                    "values_fill": 0,
                    "values_fn": "first"
                }
            ]
        }"#;

        let recipe = Recipe::from_json(json).unwrap();
        assert_eq!(recipe.version, "1.0");
        assert_eq!(recipe.steps.len(), 2);

        match &recipe.steps[0] {
            Step::PivotLonger(opts) => {
                assert_eq!(opts.values_to.as_deref(), Some("rank"));
                assert!(opts.values_drop_na);
                assert_eq!(opts.names_sep, None);
            }
            other => panic!("unexpected step {:?}", other),
        }
        match &recipe.steps[1] {
            Step::PivotWider(opts) => {
                assert_eq!(opts.names_sep, "_");
                assert_eq!(opts.values_fill, Some(Value::Int(0)));
                assert_eq!(opts.values_fn, ValuesFn::First);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_value_sentinel_in_json() {
        let json = r#"{"steps": [{"type": "pivot_longer", "cols": ["a_1"],
            "names_to": [".value", "n"], "names_sep": "_"}]}"#;
        let recipe = Recipe::from_json(json).unwrap();
        let Step::PivotLonger(opts) = &recipe.steps[0] else {
            panic!("expected pivot_longer");
        };
        assert_eq!(opts.names_to[0], NameField::Value);
        assert_eq!(opts.names_sep, Some(Separator::Literal("_".into())));
    }

    #[test]
    fn test_empty_recipe_rejected() {
        assert!(matches!(Recipe::from_json(r#"{"steps": []}"#), Err(RecipeError::Empty)));
        assert!(matches!(Recipe::from_json("not json"), Err(RecipeError::Json(_))));
    }

    #[test]
    fn test_example_roundtrip() {
        let recipe = example_recipe();
        let json = recipe.to_json().unwrap();
        assert!(json.contains("\".value\""));
        assert_eq!(Recipe::from_json(&json).unwrap(), recipe);
    }

    #[test]
    fn test_validate_headers() {
        let recipe = example_recipe();
        let headers = ["family", "dob_1", "dob_2", "name_1", "name_2"];
        assert!(recipe.validate_headers(&headers).is_ok());

        let err = recipe.validate_headers(&["family", "dob_1"]).unwrap_err();
        match err {
            RecipeError::MissingColumns { step, columns } => {
                assert_eq!(step, 0);
                assert_eq!(columns, vec!["dob_2", "name_1", "name_2"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_referenced_columns_for_wider() {
        let step = Step::PivotWider(WiderOptions::new(["n"], ["v"]).id_cols(["id"]));
        assert_eq!(step.referenced_columns(), vec!["id", "n", "v"]);
        assert_eq!(step.name(), "pivot_wider");
    }
}
