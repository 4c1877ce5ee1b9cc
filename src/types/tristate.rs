//! A field that can be missing, explicitly `null`, or carry a value.
//!
//! Notion distinguishes "the key is not there" from "the key is there and is
//! `null`" (for example a date without an end, or a cleared select). `Option`
//! collapses the two, so object fields that need the distinction use
//! `Tristate` with `#[serde(default, skip_serializing_if = "Tristate::is_absent")]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Tristate<T> {
    #[default]
    Absent,
    Null,
    Present(T),
}

impl<T> Tristate<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Tristate::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tristate::Null)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Tristate::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Tristate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Tristate::Present(v),
            None => Tristate::Null,
        }
    }
}

impl<T: Serialize> Serialize for Tristate<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            // Only reachable without skip_serializing_if; treat as null.
            Tristate::Absent | Tristate::Null => serializer.serialize_none(),
            Tristate::Present(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Tristate<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Missing keys never reach here; `#[serde(default)]` yields Absent.
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(default, skip_serializing_if = "Tristate::is_absent")]
        end: Tristate<String>,
    }

    #[test]
    fn distinguishes_absent_from_null() {
        let absent: Holder = serde_json::from_value(json!({})).unwrap();
        let null: Holder = serde_json::from_value(json!({"end": null})).unwrap();
        let present: Holder = serde_json::from_value(json!({"end": "2024-01-01"})).unwrap();

        assert_eq!(absent.end, Tristate::Absent);
        assert_eq!(null.end, Tristate::Null);
        assert_eq!(present.end, Tristate::Present("2024-01-01".to_string()));
    }

    #[test]
    fn serializes_each_state_faithfully() {
        let absent = Holder { end: Tristate::Absent };
        let null = Holder { end: Tristate::Null };

        assert_eq!(serde_json::to_value(&absent).unwrap(), json!({}));
        assert_eq!(serde_json::to_value(&null).unwrap(), json!({"end": null}));
    }
}
