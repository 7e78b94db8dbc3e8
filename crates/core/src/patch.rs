//! Per-field wrapper for partial updates
//!
//! A JSON body can omit a field, send it as `null`, or send a value. Plain
//! `Option<T>` collapses the first two, which loses the ability to clear a
//! nullable column. Use `#[serde(default)]` on every `Patch` field so an
//! omitted key deserializes to [`Patch::Absent`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Field not supplied; keep the stored value
    #[default]
    Absent,
    /// Field supplied as null; clear the stored value
    Null,
    /// Field supplied with a value
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Resolve a nullable column against its current value
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Absent => current,
            Self::Null => None,
            Self::Value(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

/// Serializes `Null` and `Absent` alike as `null`; pair with
/// `skip_serializing_if = "Patch::is_absent"` to omit absent fields.
impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        description: Patch<String>,
    }

    #[test]
    fn test_absent_null_and_value_are_distinct() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"description": null}"#).unwrap();
        let value: Body = serde_json::from_str(r#"{"description": "text"}"#).unwrap();

        assert_eq!(absent.description, Patch::Absent);
        assert_eq!(null.description, Patch::Null);
        assert_eq!(value.description, Patch::Value("text".to_string()));
    }

    #[test]
    fn test_apply() {
        let current = Some("old".to_string());
        assert_eq!(Patch::Absent.apply(current.clone()), current);
        assert_eq!(Patch::<String>::Null.apply(current.clone()), None);
        assert_eq!(
            Patch::Value("new".to_string()).apply(current),
            Some("new".to_string())
        );
    }

    #[test]
    fn test_serialize_skips_absent() {
        let json = serde_json::to_string(&Body {
            description: Patch::Absent,
        })
        .unwrap();
        assert_eq!(json, "{}");

        let json = serde_json::to_string(&Body {
            description: Patch::Null,
        })
        .unwrap();
        assert_eq!(json, r#"{"description":null}"#);
    }
}
