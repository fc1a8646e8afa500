//! How the resolver decides between several configured backend types

use crate::config::{BackendCategory, ConfigError};
use dialoguer::Input;

/// Decides which backend type to use when more than one is configured
pub trait SelectionPolicy {
    /// Pick one of `candidates` (distinct type tags, in configuration order)
    fn choose(&self, category: BackendCategory, candidates: &[&'static str]) -> Result<String, ConfigError>;
}

/// Prompt the operator on the terminal
#[derive(Debug, Clone, Default)]
pub struct InteractiveSelection;

impl SelectionPolicy for InteractiveSelection {
    fn choose(&self, category: BackendCategory, candidates: &[&'static str]) -> Result<String, ConfigError> {
        println!("Available {} types:", category);
        for tag in candidates {
            println!("  {}", tag);
        }

        let answer: String = Input::new()
            .with_prompt(format!("Select a {} type", category))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| ConfigError::InvalidSelection {
                category,
                choice: format!("<no input: {}>", e),
            })?;

        Ok(answer.trim().to_string())
    }
}

/// Never prompt; several configured types is an error
#[derive(Debug, Clone, Default)]
pub struct DeclarativeSelection;

impl SelectionPolicy for DeclarativeSelection {
    fn choose(&self, category: BackendCategory, candidates: &[&'static str]) -> Result<String, ConfigError> {
        Err(ConfigError::InvalidSelection {
            category,
            choice: format!(
                "<ambiguous: set Selection.{} to one of {}>",
                match category {
                    BackendCategory::Database => "Database",
                    BackendCategory::Storage => "Storage",
                },
                candidates.join(", ")
            ),
        })
    }
}
