use crate::types::{PageId, Tristate, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value of one property on a page, dispatched on its `type` tag.
///
/// Types this client cannot interpret deserialize as `Unsupported` so a page
/// with exotic columns still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        title: Vec<RichTextItem>,
    },
    RichText {
        rich_text: Vec<RichTextItem>,
    },
    Url {
        url: Option<String>,
    },
    Email {
        email: Option<String>,
    },
    PhoneNumber {
        phone_number: Option<String>,
    },
    Number {
        number: Option<f64>,
    },
    Checkbox {
        checkbox: bool,
    },
    Select {
        select: Option<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Date {
        date: Option<DateValue>,
    },
    CreatedTime {
        created_time: DateTime<Utc>,
    },
    LastEditedTime {
        last_edited_time: DateTime<Utc>,
    },
    People {
        people: Vec<PartialUser>,
    },
    CreatedBy {
        created_by: PartialUser,
    },
    LastEditedBy {
        last_edited_by: PartialUser,
    },
    Relation {
        relation: Vec<RelationRef>,
    },
    Files {
        files: Vec<serde_json::Value>,
    },
    UniqueId {
        unique_id: UniqueIdData,
    },
    Formula {
        formula: FormulaValue,
    },
    Rollup {
        rollup: RollupValue,
    },
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    /// Returns the Notion API type name for this property value.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Title { .. } => "title",
            PropertyValue::RichText { .. } => "rich_text",
            PropertyValue::Url { .. } => "url",
            PropertyValue::Email { .. } => "email",
            PropertyValue::PhoneNumber { .. } => "phone_number",
            PropertyValue::Number { .. } => "number",
            PropertyValue::Checkbox { .. } => "checkbox",
            PropertyValue::Select { .. } => "select",
            PropertyValue::Status { .. } => "status",
            PropertyValue::MultiSelect { .. } => "multi_select",
            PropertyValue::Date { .. } => "date",
            PropertyValue::CreatedTime { .. } => "created_time",
            PropertyValue::LastEditedTime { .. } => "last_edited_time",
            PropertyValue::People { .. } => "people",
            PropertyValue::CreatedBy { .. } => "created_by",
            PropertyValue::LastEditedBy { .. } => "last_edited_by",
            PropertyValue::Relation { .. } => "relation",
            PropertyValue::Files { .. } => "files",
            PropertyValue::UniqueId { .. } => "unique_id",
            PropertyValue::Formula { .. } => "formula",
            PropertyValue::Rollup { .. } => "rollup",
            PropertyValue::Unsupported => "unsupported",
        }
    }

    /// Concatenated plain text of title and rich text values, or the rendered
    /// date for date values.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            PropertyValue::Title { title: items } | PropertyValue::RichText { rich_text: items } => {
                Some(items.iter().map(|item| item.plain_text.as_str()).collect())
            }
            PropertyValue::Date { date: Some(date) } => Some(date.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextItem {
    pub plain_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A date or date range. `end` and `time_zone` are frequently sent as `null`
/// and sometimes omitted entirely; both states are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub end: Tristate<String>,
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub time_zone: Tristate<String>,
}

impl DateValue {
    pub fn end(&self) -> Option<&str> {
        self.end.as_option().map(String::as_str)
    }

    /// True when the API sent `"end": null`, i.e. a single date rather than a
    /// range. An omitted `end` says nothing either way.
    pub fn is_single_date(&self) -> bool {
        self.end.is_null()
    }

    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_option().map(String::as_str)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "{} → {}", self.start, end),
            None => f.write_str(&self.start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialUser {
    pub id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRef {
    pub id: PageId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueIdData {
    pub number: Option<i64>,
    pub prefix: Option<String>,
}

/// Computed formula result, tagged with the formula's result type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: Option<bool> },
    Date { date: Option<DateValue> },
    #[serde(other)]
    Unsupported,
}

/// Aggregated rollup result. Array rollups carry the rolled-up property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollupValue {
    Number {
        number: Option<f64>,
    },
    Date {
        date: Option<DateValue>,
    },
    Array {
        array: Vec<PropertyValue>,
    },
    #[serde(other)]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_type_tag() {
        let value: PropertyValue = serde_json::from_value(json!({
            "id": "abc",
            "type": "select",
            "select": {"id": "1", "name": "Tech", "color": "blue"}
        }))
        .unwrap();

        match value {
            PropertyValue::Select { select: Some(option) } => assert_eq!(option.name, "Tech"),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn unknown_types_are_unsupported() {
        let value: PropertyValue = serde_json::from_value(json!({
            "id": "x",
            "type": "button",
            "button": {}
        }))
        .unwrap();
        assert_eq!(value, PropertyValue::Unsupported);
    }

    #[test]
    fn rollup_arrays_nest_property_values() {
        let value: PropertyValue = serde_json::from_value(json!({
            "id": "r",
            "type": "rollup",
            "rollup": {
                "type": "array",
                "function": "show_original",
                "array": [
                    {"type": "date", "date": {"start": "2024-05-01", "end": null}}
                ]
            }
        }))
        .unwrap();

        let PropertyValue::Rollup {
            rollup: RollupValue::Array { array },
        } = value
        else {
            panic!("expected array rollup");
        };
        let PropertyValue::Date { date: Some(date) } = &array[0] else {
            panic!("expected a date element");
        };
        assert_eq!(date.end, Tristate::Null);
        assert!(date.is_single_date());
        assert_eq!(date.time_zone, Tristate::Absent);
        assert_eq!(date.time_zone(), None);
    }

    #[test]
    fn date_ranges_render_both_ends() {
        let value: PropertyValue = serde_json::from_value(json!({
            "type": "date",
            "date": {"start": "2024-05-01", "end": "2024-05-03", "time_zone": "Europe/Berlin"}
        }))
        .unwrap();
        let PropertyValue::Date { date: Some(date) } = &value else {
            panic!("expected a date");
        };
        assert_eq!(date.end(), Some("2024-05-03"));
        assert!(!date.is_single_date());
        assert_eq!(date.time_zone(), Some("Europe/Berlin"));
        assert_eq!(value.plain_text().as_deref(), Some("2024-05-01 → 2024-05-03"));

        let open: DateValue = serde_json::from_value(json!({"start": "2024-05-01"})).unwrap();
        assert!(!open.is_single_date());
        assert_eq!(open.to_string(), "2024-05-01");
    }

    #[test]
    fn title_plain_text_is_concatenated() {
        let value: PropertyValue = serde_json::from_value(json!({
            "type": "title",
            "title": [{"plain_text": "Hello "}, {"plain_text": "world"}]
        }))
        .unwrap();
        assert_eq!(value.plain_text().as_deref(), Some("Hello world"));
    }
}
