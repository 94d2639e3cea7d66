//! Dependency Graph
//!
//! Bipartite edge store between computations and the fields they read.
//!
//! # Invariant
//!
//! Both directions are kept in lockstep: a field appears in a computation's
//! dependency set iff the computation appears in that field's dependent set.
//! Empty sets are pruned so the maps never accumulate dead entries.
//!
//! Inner sets are `IndexSet`s so that notification order follows the order in
//! which edges were recorded, which keeps re-run order deterministic.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::field::Field;
use crate::reactive::ComputationId;

/// Forward and reverse dependency edges.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Field -> computations that read it.
    dependents: HashMap<Field, IndexSet<ComputationId>>,
    /// Computation -> fields it read during its latest run.
    dependencies: HashMap<ComputationId, IndexSet<Field>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge: `computation` depends on `field`.
    ///
    /// Returns `false` if the edge was already present; repeated reads of the
    /// same field collapse into one edge.
    pub fn add_edge(&mut self, computation: ComputationId, field: Field) -> bool {
        let inserted = self
            .dependencies
            .entry(computation)
            .or_default()
            .insert(field.clone());

        if inserted {
            self.dependents.entry(field).or_default().insert(computation);
        }

        inserted
    }

    /// Remove every edge of `computation` from both indices.
    ///
    /// Returns the number of edges removed.
    pub fn remove_computation(&mut self, computation: ComputationId) -> usize {
        let Some(fields) = self.dependencies.remove(&computation) else {
            return 0;
        };

        for field in &fields {
            if let Some(dependents) = self.dependents.get_mut(field) {
                dependents.shift_remove(&computation);
                if dependents.is_empty() {
                    self.dependents.remove(field);
                }
            }
        }

        fields.len()
    }

    /// Computations currently depending on `field`, in edge-recording order.
    pub fn dependents(&self, field: &Field) -> Vec<ComputationId> {
        self.dependents
            .get(field)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fields `computation` currently depends on, in read order.
    pub fn dependencies(&self, computation: ComputationId) -> Vec<Field> {
        self.dependencies
            .get(&computation)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_edge(&self, computation: ComputationId, field: &Field) -> bool {
        self.dependencies
            .get(&computation)
            .is_some_and(|set| set.contains(field))
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(IndexSet::len).sum()
    }

    /// Number of fields with at least one dependent.
    pub fn field_count(&self) -> usize {
        self.dependents.len()
    }

    /// Number of computations with at least one dependency.
    pub fn computation_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Check that the forward and reverse indices agree.
    pub fn is_consistent(&self) -> bool {
        let forward = self.dependencies.iter().all(|(computation, fields)| {
            !fields.is_empty()
                && fields.iter().all(|field| {
                    self.dependents
                        .get(field)
                        .is_some_and(|set| set.contains(computation))
                })
        });

        let reverse = self.dependents.iter().all(|(field, computations)| {
            !computations.is_empty()
                && computations.iter().all(|computation| {
                    self.dependencies
                        .get(computation)
                        .is_some_and(|set| set.contains(field))
                })
        });

        forward && reverse
    }
}
