//! Ordered collections.
//!
//! A [`List`] exposes three kinds of field:
//!
//! - `Whole`: written by every structural change. Iteration and index reads
//!   depend on it.
//! - `Length`: written only when the size actually changes. [`List::len`]
//!   depends on it and nothing else, so size observers ignore in-place edits.
//! - `Index(i)`: written when position `i` gets a different value. Index reads
//!   depend on it in addition to `Whole`.
//!
//! All fields touched by one operation are triggered together, so an observer
//! depending on several of them re-runs once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;
use smallvec::SmallVec;
use tracing::trace;

use super::tracker::Tracker;
use super::value::{Input, Value};
use crate::error::{ReactiveError, Result};
use crate::graph::{ContainerId, Field};

/// Fields touched by a single list operation.
type Touched = SmallVec<[Field; 4]>;

/// Handle to a reactive list. Clones share the same list.
#[derive(Clone)]
pub struct List {
    inner: Rc<ListInner>,
}

struct ListInner {
    id: ContainerId,
    tracker: Tracker,
    items: RefCell<Vec<Value>>,
}

impl List {
    /// Create an empty list.
    pub fn new(tracker: &Tracker) -> Self {
        Self::from_items(tracker, Vec::new())
    }

    /// Build a list from a JSON array, wrapping nested objects and arrays.
    pub fn from_json(tracker: &Tracker, json: Json) -> Result<Self> {
        match Value::wrap(json.into(), tracker)? {
            Value::List(list) => Ok(list),
            other => Err(ReactiveError::ShapeMismatch {
                field: "<root>".to_string(),
                expected: "list",
                found: other.shape(),
            }),
        }
    }

    pub(crate) fn from_items(tracker: &Tracker, items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                id: ContainerId::new(),
                tracker: tracker.clone(),
                items: RefCell::new(items),
            }),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Number of items. Depends on the length field only.
    pub fn len(&self) -> usize {
        self.inner.tracker.record_read(Field::length(self.id()));
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, or `None` past the end.
    ///
    /// Depends on the whole list and on that index, so a later append makes a
    /// `None` read re-run.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.tracker.record_read(Field::whole(self.id()));
        self.inner.tracker.record_read(Field::index(self.id(), index));
        self.inner.items.borrow().get(index).cloned()
    }

    /// All items. Depends on the whole list.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.tracker.record_read(Field::whole(self.id()));
        self.inner.items.borrow().clone()
    }

    /// Position of the first item whose plain form equals `needle`.
    pub fn position_of(&self, needle: &Json) -> Option<usize> {
        self.inner.tracker.record_read(Field::whole(self.id()));
        self.inner.items.borrow().iter().position(|item| match item {
            Value::Scalar(json) => json == needle,
            container => container.snapshot() == *needle,
        })
    }

    pub fn contains(&self, needle: &Json) -> bool {
        self.position_of(needle).is_some()
    }

    /// Plain JSON copy of the list. Not tracked.
    pub fn snapshot(&self) -> Json {
        Json::Array(self.inner.items.borrow().iter().map(Value::snapshot).collect())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Replace the item at `index`; `index == len` appends.
    pub fn set(&self, index: usize, value: impl Into<Input>) -> Result<()> {
        let value = self.wrap(value.into())?;
        let deep = self.inner.tracker.config().deep_compare;

        let touched: Touched = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            match index {
                i if i < len => {
                    if items[i].same(&value, deep) {
                        Touched::new()
                    } else {
                        items[i] = value;
                        touched_fields([Field::whole(self.id()), Field::index(self.id(), i)])
                    }
                }
                i if i == len => {
                    items.push(value);
                    touched_fields([
                        Field::whole(self.id()),
                        Field::length(self.id()),
                        Field::index(self.id(), i),
                    ])
                }
                _ => return Err(ReactiveError::IndexOutOfBounds { index, len }),
            }
        };

        self.commit("set", touched)
    }

    /// Add an item at the end.
    pub fn append(&self, value: impl Into<Input>) -> Result<()> {
        let value = self.wrap(value.into())?;

        let touched = {
            let mut items = self.inner.items.borrow_mut();
            let index = items.len();
            items.push(value);
            touched_fields([
                Field::whole(self.id()),
                Field::length(self.id()),
                Field::index(self.id(), index),
            ])
        };

        self.commit("append", touched)
    }

    /// Remove and return the item at `index`, shifting later items down.
    pub fn remove_at(&self, index: usize) -> Result<Value> {
        let (removed, touched) = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            if index >= len {
                return Err(ReactiveError::IndexOutOfBounds { index, len });
            }
            let removed = items.remove(index);
            let mut touched = touched_fields([Field::whole(self.id()), Field::length(self.id())]);
            touched.extend((index..len).map(|i| Field::index(self.id(), i)));
            (removed, touched)
        };

        self.commit("remove_at", touched)?;
        Ok(removed)
    }

    /// Remove every item. Clearing an empty list is a no-op.
    pub fn clear(&self) -> Result<()> {
        let (removed, touched) = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            if len == 0 {
                return Ok(());
            }
            let removed = std::mem::take(&mut *items);
            let mut touched = touched_fields([Field::whole(self.id()), Field::length(self.id())]);
            touched.extend((0..len).map(|i| Field::index(self.id(), i)));
            (removed, touched)
        };
        drop(removed);

        self.commit("clear", touched)
    }

    /// Replace the entire contents.
    ///
    /// Only positions whose value differs are written, and the length field
    /// only if the size changes. Replacing with equal contents is a no-op.
    pub fn replace_all<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Input>,
    {
        let next = values
            .into_iter()
            .map(|value| self.wrap(value.into()))
            .collect::<Result<Vec<_>>>()?;
        let deep = self.inner.tracker.config().deep_compare;

        let (previous, touched) = {
            let mut items = self.inner.items.borrow_mut();
            let (old_len, new_len) = (items.len(), next.len());

            let mut touched = Touched::new();
            for i in 0..old_len.max(new_len) {
                let unchanged = match (items.get(i), next.get(i)) {
                    (Some(old), Some(new)) => old.same(new, deep),
                    _ => false,
                };
                if !unchanged {
                    touched.push(Field::index(self.id(), i));
                }
            }
            if touched.is_empty() {
                return Ok(());
            }

            touched.insert(0, Field::whole(self.id()));
            if old_len != new_len {
                touched.insert(1, Field::length(self.id()));
            }
            (std::mem::replace(&mut *items, next), touched)
        };
        drop(previous);

        self.commit("replace_all", touched)
    }

    pub(crate) fn reaches(&self, target: ContainerId) -> bool {
        self.id() == target
            || self
                .inner
                .items
                .borrow()
                .iter()
                .any(|item| item.reaches(target))
    }

    fn wrap(&self, input: Input) -> Result<Value> {
        let value = Value::wrap(input, &self.inner.tracker)?;
        if value.reaches(self.id()) {
            return Err(ReactiveError::CyclicValue(self.id()));
        }
        Ok(value)
    }

    fn commit(&self, op: &'static str, touched: Touched) -> Result<()> {
        if touched.is_empty() {
            trace!(container = %self.id(), op, "write skipped, value unchanged");
            return Ok(());
        }
        trace!(container = %self.id(), op, fields = touched.len(), "list changed");
        self.inner.tracker.trigger(touched)
    }
}

fn touched_fields<const N: usize>(fields: [Field; N]) -> Touched {
    fields.into_iter().collect()
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
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

    /// Effect counting its runs; `read` decides what it depends on.
    fn observe(list: &List, read: impl Fn(&List) + 'static) -> Rc<Cell<usize>> {
        let runs = Rc::new(Cell::new(0));
        let tracker = list.tracker().clone();
        let list = list.clone();
        let counter = Rc::clone(&runs);
        tracker
            .effect(move || {
                read(&list);
                counter.set(counter.get() + 1);
                Ok(())
            })
            .unwrap();
        runs
    }

    #[test]
    fn append_remove_and_clear() {
        let tracker = Tracker::default();
        let list = List::new(&tracker);

        list.append("A").unwrap();
        list.append("B").unwrap();
        let removed = list.remove_at(0).unwrap();

        assert_eq!(removed.as_str(), Some("A"));
        assert_eq!(list.snapshot(), json!(["B"]));

        list.clear().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn out_of_bounds_writes_are_rejected() {
        let tracker = Tracker::default();
        let list = List::from_json(&tracker, json!(["a"])).unwrap();

        assert!(matches!(
            list.remove_at(1),
            Err(ReactiveError::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(matches!(
            list.set(2, "c"),
            Err(ReactiveError::IndexOutOfBounds { index: 2, len: 1 })
        ));
        assert!(list.get(5).is_none());
    }

    #[test]
    fn set_at_len_appends() {
        let tracker = Tracker::default();
        let list = List::new(&tracker);
        let sizes = observe(&list, |list| {
            list.len();
        });

        list.set(0, "a").unwrap();
        list.set(0, "b").unwrap();

        assert_eq!(list.snapshot(), json!(["b"]));
        // Only the first write changed the size.
        assert_eq!(sizes.get(), 2);
    }

    #[test]
    fn size_observer_sees_only_size_changes() {
        let tracker = Tracker::default();
        let list = List::new(&tracker);
        let runs = observe(&list, |list| {
            list.len();
        });

        list.append("A").unwrap();
        list.append("B").unwrap();
        list.remove_at(0).unwrap();
        list.set(0, "C").unwrap();

        // Initial run plus 0->1, 1->2, 2->1; the in-place set is invisible.
        assert_eq!(runs.get(), 4);
        assert_eq!(list.snapshot(), json!(["C"]));
    }

    #[test]
    fn index_observer_sees_its_index() {
        let tracker = Tracker::default();
        let list = List::from_json(&tracker, json!(["a", "b", "c"])).unwrap();
        let runs = observe(&list, |list| {
            list.get(2);
        });

        list.set(0, "z").unwrap();
        assert_eq!(runs.get(), 2, "whole-list field changed");

        list.remove_at(0).unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn whole_observer_runs_once_per_operation() {
        let tracker = Tracker::default();
        let list = List::new(&tracker);
        let runs = observe(&list, |list| {
            list.len();
            list.to_vec();
            list.get(0);
        });

        list.append("a").unwrap();
        assert_eq!(runs.get(), 2);

        list.clear().unwrap();
        assert_eq!(runs.get(), 3);

        list.clear().unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn replace_all_writes_only_differences() {
        let tracker = Tracker::default();
        let list = List::from_json(&tracker, json!(["a", "b"])).unwrap();
        let first = observe(&list, |list| {
            list.get(0);
        });
        let size = observe(&list, |list| {
            list.len();
        });

        list.replace_all(["a", "b"]).unwrap();
        assert_eq!((first.get(), size.get()), (1, 1));

        list.replace_all(["a", "c"]).unwrap();
        assert_eq!((first.get(), size.get()), (2, 1));

        list.replace_all(["a", "c", "d"]).unwrap();
        assert_eq!((first.get(), size.get()), (3, 2));
        assert_eq!(list.snapshot(), json!(["a", "c", "d"]));
    }

    #[test]
    fn position_and_contains() {
        let tracker = Tracker::default();
        let list = List::from_json(&tracker, json!(["north", { "id": 7 }])).unwrap();

        assert_eq!(list.position_of(&json!("north")), Some(0));
        assert_eq!(list.position_of(&json!({ "id": 7 })), Some(1));
        assert!(!list.contains(&json!("south")));
    }

    #[test]
    fn list_cannot_contain_itself() {
        let tracker = Tracker::default();
        let list = List::new(&tracker);
        assert!(matches!(
            list.append(list.clone()),
            Err(ReactiveError::CyclicValue(_))
        ));
    }
}
