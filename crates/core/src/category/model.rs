//! Category model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type CategoryId = i64;

/// A user-defined label that can be attached to any number of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Opaque display token, e.g. `#ff8800` or `red`
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_color(&self.color)
    }
}

/// Partial update of a category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }
}

impl Category {
    pub fn apply(&mut self, update: CategoryUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    Ok(())
}

// Format is deliberately unchecked; only presence is required.
fn validate_color(color: &str) -> Result<()> {
    if color.trim().is_empty() {
        return Err(Error::validation("color", "Color is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_requires_name_and_color() {
        assert!(NewCategory::new("Urgent", "#ff0000").validate().is_ok());
        assert!(NewCategory::new("Urgent", "not-a-color").validate().is_ok());

        match NewCategory::new("  ", "red").validate() {
            Err(Error::Validation { field, .. }) => assert_eq!(field, "name"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
        match NewCategory::new("Urgent", "").validate() {
            Err(Error::Validation { field, .. }) => assert_eq!(field, "color"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_deserialize_to_empty() {
        let input: NewCategory = serde_json::from_str(r#"{"color": "blue"}"#).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_partial_update_validation() {
        assert!(CategoryUpdate::default().validate().is_ok());
        let update = CategoryUpdate {
            name: Some(String::new()),
            color: None,
        };
        assert!(update.validate().is_err());
    }
}
