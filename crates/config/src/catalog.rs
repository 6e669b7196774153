//! Variable catalog: suggestion labels plus the values tags resolve to.
//!
//! ```toml
//! suggestions = ["Sales", "Revenue", "Marketing Spend"]
//!
//! [variables]
//! Sales = 1000
//! "Marketing Spend" = 250.5
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tagcalc_engine::{Bindings, StaticSuggestions};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
}

impl Default for Catalog {
    /// Built-in demo catalog.
    fn default() -> Self {
        let suggestions = [
            "Sales",
            "Revenue",
            "Expenses",
            "Profit",
            "COGS",
            "Marketing Spend",
            "Salaries",
            "Rent",
            "Utilities",
            "Net Income",
            "Gross Profit",
            "Operating Expenses",
        ];
        let variables = [
            ("x", 10.0),
            ("y", 5.0),
            ("z", 20.0),
            ("Sales", 1000.0),
            ("Expenses", 300.0),
            ("Revenue", 1500.0),
            ("Profit", 700.0),
        ];
        Self {
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            variables: variables.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

impl Catalog {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let catalog: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in &self.variables {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation("variable name must not be blank".into()));
            }
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "variable '{name}' must be a finite number, got {value}"
                )));
            }
        }
        if self.suggestions.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation("suggestion labels must not be blank".into()));
        }
        Ok(())
    }

    pub fn bindings(&self) -> Bindings {
        self.variables.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }

    pub fn provider(&self) -> StaticSuggestions {
        StaticSuggestions::new(self.suggestions.iter().cloned())
    }
}
