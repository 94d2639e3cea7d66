//! Shared application state.
//!
//! [`SharedState`] is the one root record the application creates at startup
//! and hands to every collaborator that needs it:
//!
//! ```text
//! {
//!   dateRange:     { start: "", end: "" },
//!   selectedAreas: []
//! }
//! ```
//!
//! Collaborators can go through the typed helpers here or work on
//! [`SharedState::root`] directly with `get`/`set`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::error::Result;
use crate::reactive::{List, Record, Tracker};

pub const DATE_RANGE: &str = "dateRange";
pub const SELECTED_AREAS: &str = "selectedAreas";
pub const START: &str = "start";
pub const END: &str = "end";

/// Handle to the shared root record. Clones share the same state.
#[derive(Clone, Debug)]
pub struct SharedState {
    root: Record,
}

/// Plain copy of the shared state, serialized with the same field names the
/// root record uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSnapshot {
    pub date_range: DateRange,
    pub selected_areas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl SharedState {
    /// Create the root record with empty dates and no selected areas.
    pub fn new(tracker: &Tracker) -> Result<Self> {
        let root = Record::from_json(
            tracker,
            json!({
                DATE_RANGE: { START: "", END: "" },
                SELECTED_AREAS: [],
            }),
        )?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Record {
        &self.root
    }

    pub fn tracker(&self) -> &Tracker {
        self.root.tracker()
    }

    // ------------------------------------------------------------------
    // Date range
    // ------------------------------------------------------------------

    /// The nested `dateRange` record. Depends on `dateRange` being replaced.
    pub fn date_range(&self) -> Result<Record> {
        self.root.record(DATE_RANGE)
    }

    pub fn start(&self) -> Result<String> {
        self.date_range()?.str(START)
    }

    pub fn end(&self) -> Result<String> {
        self.date_range()?.str(END)
    }

    /// Update both boundaries as one change.
    ///
    /// The existing `dateRange` record is kept, so only observers of a
    /// boundary that actually changed re-run, and each of them once.
    pub fn set_date_range(&self, start: &str, end: &str) -> Result<()> {
        let range = self.tracker().untrack(|| self.date_range())?;
        self.tracker().batch(|| -> Result<()> {
            range.set(START, start)?;
            range.set(END, end)
        })?
    }

    /// Replace the whole `dateRange` record with a new one.
    pub fn replace_date_range(&self, start: &str, end: &str) -> Result<()> {
        self.root.set(DATE_RANGE, json!({ START: start, END: end }))
    }

    // ------------------------------------------------------------------
    // Selected areas
    // ------------------------------------------------------------------

    pub fn selected_areas(&self) -> Result<List> {
        self.root.list(SELECTED_AREAS)
    }

    /// Append `area` unless it is already selected. Returns whether it was added.
    pub fn select_area(&self, area: &str) -> Result<bool> {
        let areas = self.tracker().untrack(|| self.selected_areas())?;
        let needle = Json::from(area);
        if self.tracker().untrack(|| areas.contains(&needle)) {
            return Ok(false);
        }
        areas.append(area)?;
        Ok(true)
    }

    /// Remove `area` if selected. Returns whether it was removed.
    pub fn deselect_area(&self, area: &str) -> Result<bool> {
        let areas = self.tracker().untrack(|| self.selected_areas())?;
        let needle = Json::from(area);
        match self.tracker().untrack(|| areas.position_of(&needle)) {
            Some(index) => {
                areas.remove_at(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.tracker().untrack(|| self.selected_areas())?.clear()
    }

    /// Untracked plain copy of the whole state.
    pub fn snapshot(&self) -> Result<SharedSnapshot> {
        Ok(serde_json::from_value(self.root.snapshot())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn starts_empty() {
        let tracker = Tracker::default();
        let state = SharedState::new(&tracker).unwrap();

        assert_eq!(state.snapshot().unwrap(), SharedSnapshot::default());
        assert_eq!(state.start().unwrap(), "");
        assert_eq!(state.root().keys(), vec![DATE_RANGE, SELECTED_AREAS]);
    }

    #[test]
    fn snapshot_uses_camel_case() {
        let tracker = Tracker::default();
        let state = SharedState::new(&tracker).unwrap();
        state.set_date_range("2024-01-01", "2024-01-31").unwrap();
        state.select_area("north").unwrap();

        let json = serde_json::to_value(state.snapshot().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({
                "dateRange": { "start": "2024-01-01", "end": "2024-01-31" },
                "selectedAreas": ["north"],
            })
        );
    }

    #[test]
    fn select_and_deselect_areas() {
        let tracker = Tracker::default();
        let state = SharedState::new(&tracker).unwrap();

        assert!(state.select_area("north").unwrap());
        assert!(!state.select_area("north").unwrap());
        assert!(state.select_area("south").unwrap());
        assert!(state.deselect_area("north").unwrap());
        assert!(!state.deselect_area("east").unwrap());

        assert_eq!(state.snapshot().unwrap().selected_areas, vec!["south"]);

        state.clear_selection().unwrap();
        assert!(state.snapshot().unwrap().selected_areas.is_empty());
    }

    #[test]
    fn set_date_range_reruns_observer_once() {
        let tracker = Tracker::default();
        let state = SharedState::new(&tracker).unwrap();
        let runs = Rc::new(Cell::new(0));

        {
            let state = state.clone();
            let runs = Rc::clone(&runs);
            tracker
                .effect(move || {
                    state.start()?;
                    state.end()?;
                    runs.set(runs.get() + 1);
                    Ok(())
                })
                .unwrap();
        }

        state.set_date_range("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(runs.get(), 2);

        state.set_date_range("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn replace_date_range_swaps_record() {
        let tracker = Tracker::new(TrackerConfig::default());
        let state = SharedState::new(&tracker).unwrap();
        let before = state.date_range().unwrap();

        state.replace_date_range("2024-03-01", "").unwrap();

        assert!(!state.date_range().unwrap().ptr_eq(&before));
        assert_eq!(state.start().unwrap(), "2024-03-01");
    }

    #[test]
    fn helpers_do_not_leak_dependencies_into_callers() {
        let tracker = Tracker::default();
        let state = SharedState::new(&tracker).unwrap();

        let id = {
            let state = state.clone();
            tracker
                .effect(move || {
                    state.select_area("north")?;
                    Ok(())
                })
                .unwrap()
        };

        assert!(tracker.dependencies_of(id).is_empty());
    }
}
