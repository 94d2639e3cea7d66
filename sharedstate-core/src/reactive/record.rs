//! Keyed records.
//!
//! A [`Record`] has a fixed set of named fields, declared when it is built.
//! Every field is observable on its own: reading `start` only makes a
//! computation depend on `start`, not on the record as a whole.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use tracing::trace;

use super::list::List;
use super::tracker::Tracker;
use super::value::{Input, Value};
use crate::error::{ReactiveError, Result};
use crate::graph::{ContainerId, Field};

/// Handle to a reactive keyed record. Clones share the same record.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

struct RecordInner {
    id: ContainerId,
    tracker: Tracker,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
}

impl Record {
    /// Build a record from a JSON object. Its keys become the declared shape.
    pub fn from_json(tracker: &Tracker, json: Json) -> Result<Self> {
        match Value::wrap(json.into(), tracker)? {
            Value::Record(record) => Ok(record),
            other => Err(shape_mismatch("<root>", "record", &other)),
        }
    }

    pub(crate) fn from_fields(tracker: &Tracker, fields: IndexMap<Rc<str>, Value>) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                id: ContainerId::new(),
                tracker: tracker.clone(),
                fields: RefCell::new(fields),
            }),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Declared field names, in declaration order.
    ///
    /// The shape never changes, so this is not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .fields
            .borrow()
            .keys()
            .map(|key| key.to_string())
            .collect()
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    /// Read a field, recording a dependency on it if a computation is active.
    pub fn get(&self, key: &str) -> Result<Value> {
        let (name, value) = {
            let fields = self.inner.fields.borrow();
            let (name, value) = fields
                .get_key_value(key)
                .ok_or_else(|| self.invalid_field(key))?;
            (Rc::clone(name), value.clone())
        };

        self.inner.tracker.record_read(Field::named(self.id(), name));
        Ok(value)
    }

    /// Replace a field's value.
    ///
    /// Nothing happens if the new value equals the current one. Otherwise the
    /// value is stored first and then every computation that read the field
    /// is scheduled, so re-runs observe the new value.
    pub fn set(&self, key: &str, value: impl Into<Input>) -> Result<()> {
        let tracker = &self.inner.tracker;
        let name = self
            .inner
            .fields
            .borrow()
            .get_key_value(key)
            .map(|(name, _)| Rc::clone(name))
            .ok_or_else(|| self.invalid_field(key))?;

        let value = Value::wrap(value.into(), tracker)?;
        if value.reaches(self.id()) {
            return Err(ReactiveError::CyclicValue(self.id()));
        }

        let deep = tracker.config().deep_compare;
        let previous = {
            let mut fields = self.inner.fields.borrow_mut();
            let slot = fields
                .get_mut(key)
                .ok_or_else(|| self.invalid_field(key))?;
            if slot.same(&value, deep) {
                None
            } else {
                Some(std::mem::replace(slot, value))
            }
        };

        let Some(previous) = previous else {
            trace!(container = %self.id(), field = key, "write skipped, value unchanged");
            return Ok(());
        };
        // Released outside the borrow.
        drop(previous);

        tracker.trigger([Field::named(self.id(), name)])
    }

    /// Read a field that must hold a nested record.
    pub fn record(&self, key: &str) -> Result<Record> {
        match self.get(key)? {
            Value::Record(record) => Ok(record),
            other => Err(shape_mismatch(key, "record", &other)),
        }
    }

    /// Read a field that must hold a nested list.
    pub fn list(&self, key: &str) -> Result<List> {
        match self.get(key)? {
            Value::List(list) => Ok(list),
            other => Err(shape_mismatch(key, "list", &other)),
        }
    }

    /// Read a field that must hold a string.
    pub fn str(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            Value::Scalar(Json::String(text)) => Ok(text),
            other => Err(shape_mismatch(key, "string", &other)),
        }
    }

    /// Plain JSON copy of the whole record. Not tracked.
    pub fn snapshot(&self) -> Json {
        let fields = self.inner.fields.borrow();
        let mut map = Map::with_capacity(fields.len());
        for (key, value) in fields.iter() {
            map.insert(key.to_string(), value.snapshot());
        }
        Json::Object(map)
    }

    pub(crate) fn reaches(&self, target: ContainerId) -> bool {
        self.id() == target
            || self
                .inner
                .fields
                .borrow()
                .values()
                .any(|value| value.reaches(target))
    }

    fn invalid_field(&self, key: &str) -> ReactiveError {
        ReactiveError::InvalidField {
            container: self.id(),
            field: key.to_string(),
        }
    }
}

fn shape_mismatch(key: &str, expected: &'static str, found: &Value) -> ReactiveError {
    ReactiveError::ShapeMismatch {
        field: key.to_string(),
        expected,
        found: found.shape(),
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id())
            .field("value", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn range(tracker: &Tracker) -> Record {
        Record::from_json(tracker, json!({ "start": "", "end": "" })).unwrap()
    }

    #[test]
    fn get_and_set() {
        let tracker = Tracker::default();
        let record = range(&tracker);

        assert_eq!(record.str("start").unwrap(), "");
        record.set("start", "2024-01-01").unwrap();
        assert_eq!(record.str("start").unwrap(), "2024-01-01");
        assert_eq!(record.keys(), vec!["start", "end"]);
    }

    #[test]
    fn undeclared_field_is_rejected() {
        let tracker = Tracker::default();
        let record = range(&tracker);

        assert!(matches!(
            record.get("middle"),
            Err(ReactiveError::InvalidField { ref field, .. }) if field == "middle"
        ));
        assert!(matches!(
            record.set("middle", "x"),
            Err(ReactiveError::InvalidField { .. })
        ));
        assert!(!record.has_field("middle"));
    }

    #[test]
    fn from_json_requires_object() {
        let tracker = Tracker::default();
        let err = Record::from_json(&tracker, json!([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            ReactiveError::ShapeMismatch { expected: "record", found: "list", .. }
        ));
    }

    #[test]
    fn typed_accessors_check_shape() {
        let tracker = Tracker::default();
        let record = Record::from_json(&tracker, json!({ "n": 1, "items": [] })).unwrap();

        assert!(matches!(
            record.record("items"),
            Err(ReactiveError::ShapeMismatch { expected: "record", found: "list", .. })
        ));
        assert!(matches!(
            record.str("n"),
            Err(ReactiveError::ShapeMismatch { expected: "string", found: "scalar", .. })
        ));
        assert!(record.list("items").is_ok());
    }

    #[test]
    fn field_write_reruns_only_its_readers() {
        let tracker = Tracker::default();
        let record = range(&tracker);
        let start_runs = Rc::new(Cell::new(0));
        let end_runs = Rc::new(Cell::new(0));

        for (key, runs) in [("start", &start_runs), ("end", &end_runs)] {
            let record = record.clone();
            let runs = Rc::clone(runs);
            tracker
                .effect(move || {
                    record.get(key)?;
                    runs.set(runs.get() + 1);
                    Ok(())
                })
                .unwrap();
        }

        record.set("start", "2024-01-01").unwrap();

        assert_eq!(start_runs.get(), 2);
        assert_eq!(end_runs.get(), 1);
    }

    #[test]
    fn equal_write_is_noop() {
        let tracker = Tracker::default();
        let record = range(&tracker);
        let runs = Rc::new(Cell::new(0));

        {
            let record = record.clone();
            let runs = Rc::clone(&runs);
            tracker
                .effect(move || {
                    record.get("start")?;
                    runs.set(runs.get() + 1);
                    Ok(())
                })
                .unwrap();
        }

        record.set("start", "").unwrap();
        assert_eq!(runs.get(), 1);

        record.set("start", "x").unwrap();
        record.set("start", "x").unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn deep_compare_keeps_equal_nested_records() {
        let tracker = Tracker::new(crate::config::TrackerConfig::default().with_deep_compare(true));
        let root = Record::from_json(&tracker, json!({ "range": { "start": "" } })).unwrap();
        let before = root.record("range").unwrap();

        root.set("range", json!({ "start": "" })).unwrap();
        assert!(root.record("range").unwrap().ptr_eq(&before));

        root.set("range", json!({ "start": "x" })).unwrap();
        assert!(!root.record("range").unwrap().ptr_eq(&before));
    }

    #[test]
    fn identity_compare_replaces_equal_nested_records() {
        let tracker = Tracker::default();
        let root = Record::from_json(&tracker, json!({ "range": { "start": "" } })).unwrap();
        let before = root.record("range").unwrap();

        root.set("range", json!({ "start": "" })).unwrap();
        assert!(!root.record("range").unwrap().ptr_eq(&before));
    }

    #[test]
    fn cyclic_assignment_is_rejected() {
        let tracker = Tracker::default();
        let root = Record::from_json(&tracker, json!({ "child": { "slot": null } })).unwrap();
        let child = root.record("child").unwrap();

        assert!(matches!(
            root.set("child", root.clone()),
            Err(ReactiveError::CyclicValue(id)) if id == root.id()
        ));
        assert!(matches!(
            child.set("slot", root.clone()),
            Err(ReactiveError::CyclicValue(_))
        ));

        // Sharing a container that does not contain the target is fine.
        let other = Record::from_json(&tracker, json!({ "x": 1 })).unwrap();
        child.set("slot", other.clone()).unwrap();
        assert!(child.record("slot").unwrap().ptr_eq(&other));
    }

    #[test]
    fn snapshot_is_untracked() {
        let tracker = Tracker::default();
        let record = range(&tracker);
        let id = {
            let record = record.clone();
            tracker
                .effect(move || {
                    record.snapshot();
                    Ok(())
                })
                .unwrap()
        };

        assert!(tracker.dependencies_of(id).is_empty());
        assert_eq!(record.snapshot(), json!({ "start": "", "end": "" }));
    }
}
