// src/query/filter.rs
//! Wire representation of compiled filters and sorts.
//!
//! These types serialize to exactly the JSON the Notion query endpoints
//! accept. They are produced by the compiler and never built by hand.

use super::condition::{Operator, SortDirection};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A compiled filter: a property test, a timestamp test, or a combinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryFilter {
    Property(PropertyFilter),
    Timestamp(TimestampFilter),
    And { and: Vec<QueryFilter> },
    Or { or: Vec<QueryFilter> },
}

/// `{"property": name, <type_key>: {<operator>: <operand>}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyFilter {
    pub property: String,
    #[serde(flatten)]
    pub condition: TypedCondition,
}

/// A condition keyed by the property family it applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedCondition {
    RichText(Condition),
    Number(Condition),
    Checkbox(Condition),
    Select(Condition),
    Status(Condition),
    MultiSelect(Condition),
    Date(Condition),
    People(Condition),
    Relation(Condition),
    Files(Condition),
    UniqueId(Condition),
    Formula(FormulaCondition),
    Rollup(RollupCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaCondition {
    String(Condition),
    Number(Condition),
    Checkbox(Condition),
    Date(Condition),
}

/// Rollup conditions either test the aggregated value or quantify over the
/// elements of an array rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupCondition {
    Any(Box<TypedCondition>),
    Every(Box<TypedCondition>),
    None(Box<TypedCondition>),
    Number(Condition),
    Date(Condition),
}

/// `{"timestamp": "created_time", "created_time": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampFilter {
    pub timestamp: TimestampKind,
    #[serde(flatten)]
    pub condition: TimestampCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampKind {
    CreatedTime,
    LastEditedTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampCondition {
    CreatedTime(Condition),
    LastEditedTime(Condition),
}

impl TimestampFilter {
    pub fn new(kind: TimestampKind, condition: Condition) -> Self {
        let condition = match kind {
            TimestampKind::CreatedTime => TimestampCondition::CreatedTime(condition),
            TimestampKind::LastEditedTime => TimestampCondition::LastEditedTime(condition),
        };
        Self {
            timestamp: kind,
            condition,
        }
    }
}

/// A single `{<operator>: <value>}` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub value: Value,
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operator.as_str(), &self.value)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireSort {
    Property {
        property: String,
        direction: SortDirection,
    },
    Timestamp {
        timestamp: TimestampKind,
        direction: SortDirection,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn property_filter_flattens_its_type_key() {
        let filter = QueryFilter::Property(PropertyFilter {
            property: "Topic".to_string(),
            condition: TypedCondition::Select(Condition {
                operator: Operator::Equals,
                value: json!("Tech"),
            }),
        });
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"property": "Topic", "select": {"equals": "Tech"}})
        );
    }

    #[test]
    fn timestamp_filter_names_its_key_twice() {
        let filter = QueryFilter::Timestamp(TimestampFilter::new(
            TimestampKind::LastEditedTime,
            Condition {
                operator: Operator::PastWeek,
                value: json!({}),
            },
        ));
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"timestamp": "last_edited_time", "last_edited_time": {"past_week": {}}})
        );
    }

    #[test]
    fn rollup_quantifiers_wrap_element_conditions() {
        let condition = TypedCondition::Rollup(RollupCondition::Every(Box::new(
            TypedCondition::RichText(Condition {
                operator: Operator::Contains,
                value: json!("x"),
            }),
        )));
        let filter = QueryFilter::Property(PropertyFilter {
            property: "Names".to_string(),
            condition,
        });
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"property": "Names", "rollup": {"every": {"rich_text": {"contains": "x"}}}})
        );
    }

    #[test]
    fn sorts_serialize_by_kind() {
        let sorts = vec![
            WireSort::Property {
                property: "Released".to_string(),
                direction: SortDirection::Descending,
            },
            WireSort::Timestamp {
                timestamp: TimestampKind::LastEditedTime,
                direction: SortDirection::Ascending,
            },
        ];
        assert_eq!(
            serde_json::to_value(&sorts).unwrap(),
            json!([
                {"property": "Released", "direction": "descending"},
                {"timestamp": "last_edited_time", "direction": "ascending"}
            ])
        );
    }
}
