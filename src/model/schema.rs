// src/model/schema.rs
//! Database schemas: the declared type of every property, as seen by the
//! query compiler.
//!
//! Notion reports a formula's result type only on page values, never on the
//! database itself, and reports a rollup's result type only indirectly
//! through its aggregation function. Such properties start out unresolved and
//! are filled in by [`Schema::refine_from_page`] from a sample row.

use super::{Database, FormulaValue, Page, PropertyValue, RollupValue};
use crate::types::PropertyName;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-only view of a schema used during compilation.
pub trait SchemaView {
    fn property_type(&self, name: &str) -> Option<&PropertyType>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Title,
    RichText,
    Url,
    Email,
    PhoneNumber,
    Number,
    Checkbox,
    Select,
    Status,
    MultiSelect,
    Date,
    CreatedTime,
    LastEditedTime,
    People,
    CreatedBy,
    LastEditedBy,
    Relation,
    Files,
    UniqueId,
    Formula { result: Option<FormulaType> },
    Rollup { result: Option<RollupType> },
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaType {
    String,
    Number,
    Boolean,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollupType {
    Number,
    Date,
    /// Each element has the type of the rolled-up property.
    Array(Box<PropertyType>),
}

impl PropertyType {
    /// Shorthand for an array rollup whose elements have type `element`.
    pub fn rollup_array(element: PropertyType) -> Self {
        PropertyType::Rollup {
            result: Some(RollupType::Array(Box::new(element))),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            PropertyType::Formula { result } => result.is_some(),
            PropertyType::Rollup { result } => result.is_some(),
            _ => true,
        }
    }

    /// Derives a fully resolved type from an observed page value.
    fn from_value(value: &PropertyValue) -> Option<Self> {
        let resolved = match value {
            PropertyValue::Title { .. } => PropertyType::Title,
            PropertyValue::RichText { .. } => PropertyType::RichText,
            PropertyValue::Url { .. } => PropertyType::Url,
            PropertyValue::Email { .. } => PropertyType::Email,
            PropertyValue::PhoneNumber { .. } => PropertyType::PhoneNumber,
            PropertyValue::Number { .. } => PropertyType::Number,
            PropertyValue::Checkbox { .. } => PropertyType::Checkbox,
            PropertyValue::Select { .. } => PropertyType::Select,
            PropertyValue::Status { .. } => PropertyType::Status,
            PropertyValue::MultiSelect { .. } => PropertyType::MultiSelect,
            PropertyValue::Date { .. } => PropertyType::Date,
            PropertyValue::CreatedTime { .. } => PropertyType::CreatedTime,
            PropertyValue::LastEditedTime { .. } => PropertyType::LastEditedTime,
            PropertyValue::People { .. } => PropertyType::People,
            PropertyValue::CreatedBy { .. } => PropertyType::CreatedBy,
            PropertyValue::LastEditedBy { .. } => PropertyType::LastEditedBy,
            PropertyValue::Relation { .. } => PropertyType::Relation,
            PropertyValue::Files { .. } => PropertyType::Files,
            PropertyValue::UniqueId { .. } => PropertyType::UniqueId,
            PropertyValue::Formula { formula } => PropertyType::Formula {
                result: Some(FormulaType::from_value(formula)?),
            },
            PropertyValue::Rollup { rollup } => PropertyType::Rollup {
                result: Some(RollupType::from_value(rollup)?),
            },
            PropertyValue::Unsupported => return None,
        };
        Some(resolved)
    }
}

impl FormulaType {
    fn from_value(value: &FormulaValue) -> Option<Self> {
        match value {
            FormulaValue::String { .. } => Some(FormulaType::String),
            FormulaValue::Number { .. } => Some(FormulaType::Number),
            FormulaValue::Boolean { .. } => Some(FormulaType::Boolean),
            FormulaValue::Date { .. } => Some(FormulaType::Date),
            FormulaValue::Unsupported => None,
        }
    }
}

impl RollupType {
    fn from_value(value: &RollupValue) -> Option<Self> {
        match value {
            RollupValue::Number { .. } => Some(RollupType::Number),
            RollupValue::Date { .. } => Some(RollupType::Date),
            RollupValue::Array { array } => {
                let element = PropertyType::from_value(array.first()?)?;
                Some(RollupType::Array(Box::new(element)))
            }
            RollupValue::Unsupported => None,
        }
    }

    /// Result type implied by a rollup aggregation function, if any.
    fn from_function(function: &str) -> Option<Self> {
        match function {
            "count" | "count_values" | "unique" | "empty" | "not_empty" | "sum" | "average"
            | "median" | "min" | "max" | "range" | "checked" | "unchecked" => {
                Some(RollupType::Number)
            }
            f if f.starts_with("count_") || f.starts_with("percent_") => Some(RollupType::Number),
            "earliest_date" | "latest_date" => Some(RollupType::Date),
            _ => None,
        }
    }
}

impl fmt::Display for FormulaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormulaType::String => "string",
            FormulaType::Number => "number",
            FormulaType::Boolean => "boolean",
            FormulaType::Date => "date",
        };
        f.write_str(name)
    }
}

impl fmt::Display for RollupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollupType::Number => f.write_str("number"),
            RollupType::Date => f.write_str("date"),
            RollupType::Array(element) => write!(f, "array({})", element),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Title => "title",
            PropertyType::RichText => "rich_text",
            PropertyType::Url => "url",
            PropertyType::Email => "email",
            PropertyType::PhoneNumber => "phone_number",
            PropertyType::Number => "number",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Select => "select",
            PropertyType::Status => "status",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Date => "date",
            PropertyType::CreatedTime => "created_time",
            PropertyType::LastEditedTime => "last_edited_time",
            PropertyType::People => "people",
            PropertyType::CreatedBy => "created_by",
            PropertyType::LastEditedBy => "last_edited_by",
            PropertyType::Relation => "relation",
            PropertyType::Files => "files",
            PropertyType::UniqueId => "unique_id",
            PropertyType::Formula { result: Some(r) } => return write!(f, "formula({})", r),
            PropertyType::Formula { result: None } => "formula(?)",
            PropertyType::Rollup { result: Some(r) } => return write!(f, "rollup({})", r),
            PropertyType::Rollup { result: None } => "rollup(?)",
            PropertyType::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// One entry of a database's `properties` object, dispatched on `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertySchema {
    Title,
    RichText,
    Url,
    Email,
    PhoneNumber,
    Number,
    Checkbox,
    Select,
    Status,
    MultiSelect,
    Date,
    CreatedTime,
    LastEditedTime,
    People,
    CreatedBy,
    LastEditedBy,
    Relation,
    Files,
    UniqueId,
    Formula { formula: FormulaConfig },
    Rollup { rollup: RollupConfig },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaConfig {
    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupConfig {
    #[serde(default)]
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_property_name: Option<String>,
}

impl From<&PropertySchema> for PropertyType {
    fn from(entry: &PropertySchema) -> Self {
        match entry {
            PropertySchema::Title => PropertyType::Title,
            PropertySchema::RichText => PropertyType::RichText,
            PropertySchema::Url => PropertyType::Url,
            PropertySchema::Email => PropertyType::Email,
            PropertySchema::PhoneNumber => PropertyType::PhoneNumber,
            PropertySchema::Number => PropertyType::Number,
            PropertySchema::Checkbox => PropertyType::Checkbox,
            PropertySchema::Select => PropertyType::Select,
            PropertySchema::Status => PropertyType::Status,
            PropertySchema::MultiSelect => PropertyType::MultiSelect,
            PropertySchema::Date => PropertyType::Date,
            PropertySchema::CreatedTime => PropertyType::CreatedTime,
            PropertySchema::LastEditedTime => PropertyType::LastEditedTime,
            PropertySchema::People => PropertyType::People,
            PropertySchema::CreatedBy => PropertyType::CreatedBy,
            PropertySchema::LastEditedBy => PropertyType::LastEditedBy,
            PropertySchema::Relation => PropertyType::Relation,
            PropertySchema::Files => PropertyType::Files,
            PropertySchema::UniqueId => PropertyType::UniqueId,
            PropertySchema::Formula { .. } => PropertyType::Formula { result: None },
            PropertySchema::Rollup { rollup } => PropertyType::Rollup {
                result: RollupType::from_function(&rollup.function),
            },
            PropertySchema::Unsupported => PropertyType::Unsupported,
        }
    }
}

/// Ordered map from property name to declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    properties: IndexMap<PropertyName, PropertyType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_database(database: &Database) -> Self {
        let schema: Schema = database
            .properties
            .iter()
            .map(|(name, entry)| {
                if matches!(entry, PropertySchema::Unsupported) {
                    warn!(
                        "Property '{}' of database {} has a type that cannot be queried",
                        name, database.id
                    );
                }
                (name.clone(), PropertyType::from(entry))
            })
            .collect();
        debug!(
            "Loaded schema with {} properties for database {}",
            schema.len(),
            database.id
        );
        schema
    }

    pub fn insert(&mut self, name: impl Into<PropertyName>, property_type: PropertyType) {
        self.properties.insert(name.into(), property_type);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &PropertyType)> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Names of formula and rollup properties whose result type is unknown.
    pub fn unresolved(&self) -> Vec<&PropertyName> {
        self.properties
            .iter()
            .filter(|(_, ty)| !ty.is_resolved())
            .map(|(name, _)| name)
            .collect()
    }

    /// Fills in unresolved result types from the values of a sample page.
    /// Returns how many properties were resolved.
    pub fn refine_from_page(&mut self, page: &Page) -> usize {
        let mut resolved = 0;
        for (name, property_type) in self.properties.iter_mut() {
            if property_type.is_resolved() {
                continue;
            }
            let observed = page.properties.get(name).and_then(PropertyType::from_value);
            match observed {
                Some(observed @ (PropertyType::Formula { .. } | PropertyType::Rollup { .. }))
                    if std::mem::discriminant(&observed) == std::mem::discriminant(property_type) =>
                {
                    debug!("Resolved property '{}' as {}", name, observed);
                    *property_type = observed;
                    resolved += 1;
                }
                _ => debug!("Sample page did not resolve property '{}'", name),
            }
        }
        resolved
    }
}

impl SchemaView for Schema {
    fn property_type(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name)
    }
}

impl<K: Into<PropertyName>> FromIterator<(K, PropertyType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, PropertyType)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn database() -> Database {
        serde_json::from_value(json!({
            "id": "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6",
            "title": [{"plain_text": "Articles"}],
            "url": "https://www.notion.so/a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6",
            "properties": {
                "Name": {"id": "title", "name": "Name", "type": "title", "title": {}},
                "Score": {"id": "s", "name": "Score", "type": "formula",
                          "formula": {"expression": "prop(\"x\") * 2"}},
                "Total": {"id": "t", "name": "Total", "type": "rollup",
                          "rollup": {"function": "sum", "rollup_property_name": "n",
                                     "relation_property_name": "r"}},
                "article_dates": {"id": "d", "name": "article_dates", "type": "rollup",
                          "rollup": {"function": "show_original"}},
                "Action": {"id": "b", "name": "Action", "type": "button", "button": {}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn builds_schema_in_declaration_order() {
        let schema = Schema::from_database(&database());
        let names: Vec<&str> = schema.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Name", "Score", "Total", "article_dates", "Action"]);

        assert_eq!(schema.get("Name"), Some(&PropertyType::Title));
        assert_eq!(
            schema.get("Total"),
            Some(&PropertyType::Rollup {
                result: Some(RollupType::Number)
            })
        );
        assert_eq!(schema.get("Action"), Some(&PropertyType::Unsupported));
        assert_eq!(schema.unresolved().len(), 2);
    }

    #[test]
    fn refines_formula_and_rollup_types_from_a_page() {
        let mut schema = Schema::from_database(&database());
        let page: Page = serde_json::from_value(json!({
            "id": "11111111111111111111111111111111",
            "properties": {
                "Score": {"id": "s", "type": "formula",
                          "formula": {"type": "number", "number": 4}},
                "article_dates": {"id": "d", "type": "rollup",
                          "rollup": {"type": "array", "function": "show_original",
                                     "array": [{"type": "date", "date": {"start": "2024-01-01"}}]}}
            }
        }))
        .unwrap();

        assert_eq!(schema.refine_from_page(&page), 2);
        assert_eq!(
            schema.get("Score"),
            Some(&PropertyType::Formula {
                result: Some(FormulaType::Number)
            })
        );
        assert_eq!(
            schema.get("article_dates"),
            Some(&PropertyType::rollup_array(PropertyType::Date))
        );
        assert!(schema.unresolved().is_empty());
    }

    #[test]
    fn display_names_include_result_types() {
        assert_eq!(
            PropertyType::rollup_array(PropertyType::Date).to_string(),
            "rollup(array(date))"
        );
        assert_eq!(PropertyType::Formula { result: None }.to_string(), "formula(?)");
    }
}
