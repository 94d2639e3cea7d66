//! Values stored in reactive containers.
//!
//! A [`Value`] is one of three shapes: a JSON scalar, a [`Record`] or a
//! [`List`]. Records and lists are handles, so cloning a `Value` shares the
//! nested container rather than copying it.
//!
//! Writes take an [`Input`], which is either a plain `serde_json::Value` or an
//! existing `Value`. Plain objects and arrays are wrapped into fresh records
//! and lists, recursively, so every nested field is observable as soon as it
//! is stored.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use super::list::List;
use super::record::Record;
use super::tracker::Tracker;
use crate::error::{ReactiveError, Result};
use crate::graph::ContainerId;

#[derive(Clone, Debug)]
pub enum Value {
    /// `null`, a boolean, a number or a string.
    Scalar(Json),
    Record(Record),
    List(List),
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(Json::Null)
    }

    /// Name of the shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Scalar(Json::String(_)) => "string",
            Value::Scalar(_) => "scalar",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }

    pub fn as_scalar(&self) -> Option<&Json> {
        match self {
            Value::Scalar(json) => Some(json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Json::as_str)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Plain JSON copy of the value. Reads made here are not tracked.
    pub fn snapshot(&self) -> Json {
        match self {
            Value::Scalar(json) => json.clone(),
            Value::Record(record) => record.snapshot(),
            Value::List(list) => list.snapshot(),
        }
    }

    /// The equality that gates notifications.
    ///
    /// Scalars compare structurally. Containers compare by identity, or by
    /// snapshot when `deep` is set.
    pub(crate) fn same(&self, other: &Value, deep: bool) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => {
                a.ptr_eq(b) || (deep && a.snapshot() == b.snapshot())
            }
            (Value::List(a), Value::List(b)) => {
                a.ptr_eq(b) || (deep && a.snapshot() == b.snapshot())
            }
            _ => false,
        }
    }

    /// Whether `target` is this container or nested anywhere inside it.
    pub(crate) fn reaches(&self, target: ContainerId) -> bool {
        match self {
            Value::Scalar(_) => false,
            Value::Record(record) => record.reaches(target),
            Value::List(list) => list.reaches(target),
        }
    }

    /// Turn an input into a stored value, wrapping plain objects and arrays.
    pub(crate) fn wrap(input: Input, tracker: &Tracker) -> Result<Value> {
        match input {
            Input::Value(value) => Ok(value),
            Input::Plain(json) => Self::wrap_plain(json, tracker, 0),
        }
    }

    fn wrap_plain(json: Json, tracker: &Tracker, depth: usize) -> Result<Value> {
        let limit = tracker.config().max_depth;
        match json {
            Json::Object(map) => {
                if depth >= limit {
                    return Err(ReactiveError::DepthLimitExceeded { limit });
                }
                let mut fields = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    fields.insert(Rc::from(key), Self::wrap_plain(value, tracker, depth + 1)?);
                }
                Ok(Value::Record(Record::from_fields(tracker, fields)))
            }
            Json::Array(items) => {
                if depth >= limit {
                    return Err(ReactiveError::DepthLimitExceeded { limit });
                }
                let items = items
                    .into_iter()
                    .map(|item| Self::wrap_plain(item, tracker, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(List::from_items(tracker, items)))
            }
            scalar => Ok(Value::Scalar(scalar)),
        }
    }
}

/// Values compare the way writes do without `deep_compare`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other, false)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

/// Anything that can be written into a container.
#[derive(Clone, Debug)]
pub enum Input {
    /// Plain data; objects and arrays get wrapped on write.
    Plain(Json),
    /// An existing value, stored as is. Nested containers are shared.
    Value(Value),
}

impl From<Json> for Input {
    fn from(json: Json) -> Self {
        Input::Plain(json)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Input::Value(Value::Record(record))
    }
}

impl From<List> for Input {
    fn from(list: List) -> Self {
        Input::Value(Value::List(list))
    }
}

macro_rules! impl_plain_input {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Input {
                fn from(value: $ty) -> Self {
                    Input::Plain(Json::from(value))
                }
            }
        )*
    };
}

impl_plain_input!(&str, String, bool, i32, i64, u32, u64, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use serde_json::json;

    #[test]
    fn wraps_nested_plain_values() {
        let tracker = Tracker::default();
        let value = Value::wrap(
            json!({ "range": { "start": "" }, "tags": ["a", { "b": 1 }] }).into(),
            &tracker,
        )
        .unwrap();

        let record = value.as_record().unwrap();
        let range = record.record("range").unwrap();
        assert_eq!(range.get("start").unwrap().as_str(), Some(""));

        let tags = record.list("tags").unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.get(1).unwrap().as_record().is_some());
    }

    #[test]
    fn scalar_equality_is_structural() {
        assert_eq!(Value::Scalar(json!("x")), Value::Scalar(json!("x")));
        assert_ne!(Value::Scalar(json!("x")), Value::Scalar(json!("y")));
        assert_ne!(Value::Scalar(json!(1)), Value::null());
    }

    #[test]
    fn container_equality_is_identity_unless_deep() {
        let tracker = Tracker::default();
        let a = Value::wrap(json!({ "k": 1 }).into(), &tracker).unwrap();
        let b = Value::wrap(json!({ "k": 1 }).into(), &tracker).unwrap();

        assert_eq!(a, a.clone());
        assert!(!a.same(&b, false));
        assert!(a.same(&b, true));
    }

    #[test]
    fn depth_limit_rejects_deep_values() {
        let tracker = Tracker::new(TrackerConfig::default().with_max_depth(2));

        assert!(Value::wrap(json!({ "a": { "b": 1 } }).into(), &tracker).is_ok());

        let err = Value::wrap(json!({ "a": { "b": [1] } }).into(), &tracker).unwrap_err();
        assert!(matches!(err, ReactiveError::DepthLimitExceeded { limit: 2 }));
    }

    #[test]
    fn serializes_as_snapshot() {
        let tracker = Tracker::default();
        let value = Value::wrap(json!({ "a": [1, 2], "b": null }).into(), &tracker).unwrap();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"a":[1,2],"b":null}"#
        );
    }
}
