//! Notion objects as returned by the REST API.
//!
//! Every object carries an `object` discriminator and every property value a
//! `type` discriminator; both are modelled as closed enums so dispatch is a
//! plain `match`. Unknown discriminators fall through to a catch-all variant
//! instead of failing the whole response.

mod property_value;
pub mod schema;

pub use property_value::{
    DateValue, FormulaValue, PartialUser, PropertyValue, RelationRef, RichTextItem, RollupValue,
    SelectOption, UniqueIdData,
};
pub use schema::{
    FormulaType, PropertySchema, PropertyType, RollupType, Schema, SchemaView,
};

use crate::types::{DatabaseId, NotionId, PageId, PropertyName, UserId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Any object the API can hand back from a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum NotionObject {
    Page(Page),
    Database(Database),
    User(User),
    #[serde(other)]
    Unknown,
}

impl NotionObject {
    pub fn id(&self) -> Option<NotionId> {
        match self {
            NotionObject::Page(page) => Some(NotionId::from(&page.id)),
            NotionObject::Database(database) => Some(NotionId::from(&database.id)),
            NotionObject::User(user) => Some(NotionId::from(&user.id)),
            NotionObject::Unknown => None,
        }
    }

    pub fn object_type_name(&self) -> &str {
        match self {
            NotionObject::Page(_) => "page",
            NotionObject::Database(_) => "database",
            NotionObject::User(_) => "user",
            NotionObject::Unknown => "unknown",
        }
    }

    /// Whether the object sits in the trash. Users and unknown objects never do.
    pub fn is_archived(&self) -> bool {
        match self {
            NotionObject::Page(page) => page.archived,
            NotionObject::Database(database) => database.archived,
            NotionObject::User(_) | NotionObject::Unknown => false,
        }
    }

    /// Returns a human-readable display title for this object.
    pub fn display_title(&self) -> String {
        match self {
            NotionObject::Page(page) => page.title().unwrap_or_else(|| "Untitled".to_string()),
            NotionObject::Database(db) => {
                let text = db.title();
                if text.is_empty() {
                    "Untitled Database".to_string()
                } else {
                    text
                }
            }
            NotionObject::User(user) => user.name.clone().unwrap_or_default(),
            NotionObject::Unknown => String::new(),
        }
    }
}

/// A Notion page, typically a row of a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: IndexMap<PropertyName, PropertyValue>,
}

impl Page {
    /// Plain text of the page's title property, if it has one.
    pub fn title(&self) -> Option<String> {
        self.properties
            .values()
            .find(|value| matches!(value, PropertyValue::Title { .. }))
            .and_then(PropertyValue::plain_text)
    }
}

/// A Notion database with its property schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: DatabaseId,
    #[serde(default)]
    pub title: Vec<RichTextItem>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: IndexMap<PropertyName, PropertySchema>,
}

impl Database {
    pub fn title(&self) -> String {
        self.title.iter().map(|item| item.plain_text.as_str()).collect()
    }

    pub fn schema(&self) -> Schema {
        Schema::from_database(self)
    }
}

/// A person or bot in the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Parent reference with typed IDs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Parent {
    #[serde(rename = "page_id")]
    Page { page_id: PageId },
    #[serde(rename = "database_id")]
    Database { database_id: DatabaseId },
    #[serde(rename = "workspace")]
    Workspace,
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_object_tag() {
        let objects: Vec<NotionObject> = serde_json::from_value(json!([
            {
                "object": "page",
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "parent": {"type": "database_id", "database_id": "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6"},
                "properties": {
                    "Name": {"id": "title", "type": "title", "title": [{"plain_text": "Row"}]}
                }
            },
            {
                "object": "database",
                "id": "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6",
                "title": [{"plain_text": "Tasks"}],
                "parent": {"type": "workspace", "workspace": true},
                "properties": {}
            },
            {"object": "user", "id": "0f0e0d0c0b0a09080706050403020100", "name": "Bot", "type": "bot"},
            {"object": "comment", "id": "whatever"}
        ]))
        .unwrap();

        assert_eq!(objects[0].object_type_name(), "page");
        assert_eq!(objects[0].display_title(), "Row");
        assert_eq!(objects[1].display_title(), "Tasks");
        assert_eq!(objects[2].display_title(), "Bot");
        assert_eq!(objects[3], NotionObject::Unknown);
        assert!(objects[3].id().is_none());
    }

    #[test]
    fn page_without_title_property_has_no_title() {
        let page: Page = serde_json::from_value(json!({
            "id": "550e8400e29b41d4a716446655440000",
            "properties": {"Count": {"type": "number", "number": 3}}
        }))
        .unwrap();
        assert_eq!(page.title(), None);
    }
}
