//! Active-set maintenance
//!
//! The session's active argument set deduplicates by kind, except for
//! differentiable kinds (cut ranges, replace pairs) where every literal
//! occurrence carries distinct payload and survives. Removal is by exact
//! `(kind, token)` match for differentiable kinds and by kind otherwise.

use crate::core::model::{Argument, Query};

/// Merge incoming arguments into the active set.
///
/// Non-differentiable kinds are kept at most once, in first-occurrence
/// order; differentiable kinds keep every occurrence, exact duplicates
/// included.
pub fn add_args(active: &mut Vec<Argument>, incoming: &[Argument]) {
    for arg in incoming {
        if !arg.kind.is_differentiable() && active.iter().any(|a| a.kind == arg.kind) {
            continue;
        }
        active.push(arg.clone());
    }
}

/// Remove arguments from the active set.
///
/// Each removal entry takes out at most one instance: differentiable kinds
/// by exact `(kind, token)` match, everything else by kind alone.
pub fn diff_args(active: &mut Vec<Argument>, removals: &[Argument]) {
    for removal in removals {
        let position = if removal.kind.is_differentiable() {
            active
                .iter()
                .position(|a| a.kind == removal.kind && a.token == removal.token)
        } else {
            active.iter().position(|a| a.kind == removal.kind)
        };
        if let Some(idx) = position {
            active.remove(idx);
        }
    }
}

/// Append queries to the active set. Duplicates are kept; removal is
/// by value, one instance per removal entry.
pub fn add_queries(active: &mut Vec<Query>, incoming: &[Query]) {
    active.extend(incoming.iter().cloned());
}

/// Remove queries by value, one instance per removal entry.
pub fn diff_queries(active: &mut Vec<Query>, removals: &[Query]) {
    for removal in removals {
        if let Some(idx) = active.iter().position(|q| q == removal) {
            active.remove(idx);
        }
    }
}
