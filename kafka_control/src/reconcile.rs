//! Identity keyed diff between a desired and an existing resource list.

mod acls;
mod topics;

pub use acls::*;
pub use topics::*;

use std::collections::HashMap;
use std::hash::Hash;

/// What has to change for one desired resource whose identity already exists.
#[derive(Debug)]
pub struct Matched<T, A> {
    pub create: Option<T>,
    pub delete: Option<T>,
    pub alter: Option<A>,
}

impl<T, A> Matched<T, A> {
    pub fn unchanged() -> Self {
        Self {
            create: None,
            delete: None,
            alter: None,
        }
    }
}

pub trait Reconcilable: Clone {
    type Key: Eq + Hash;
    type Alteration;

    fn key(&self) -> Self::Key;

    /// Folds a later declaration with the same identity into this one.
    fn merge(&mut self, other: Self);

    fn reconcile(desired: &Self, existing: &Self) -> Matched<Self, Self::Alteration>;
}

#[derive(Debug)]
pub struct Reconciliation<T, A> {
    pub to_create: Vec<T>,
    pub to_delete: Vec<T>,
    pub to_alter: Vec<A>,
}

/// Collapses resources sharing an identity into the first one, keeping first-seen order.
pub fn coalesce<T: Reconcilable>(resources: &[T]) -> Vec<T> {
    let mut positions: HashMap<T::Key, usize> = HashMap::with_capacity(resources.len());
    let mut coalesced: Vec<T> = Vec::with_capacity(resources.len());
    for resource in resources {
        match positions.get(&resource.key()) {
            Some(&index) => coalesced[index].merge(resource.clone()),
            None => {
                positions.insert(resource.key(), coalesced.len());
                coalesced.push(resource.clone());
            }
        }
    }

    coalesced
}

/// Desired resources without an existing match are created, existing resources nobody
/// asked for are deleted and matched pairs are handed to [`Reconcilable::reconcile`].
/// Output follows the order of the inputs.
pub fn diff<T: Reconcilable>(desired: &[T], existing: &[T]) -> Reconciliation<T, T::Alteration> {
    let desired = coalesce(desired);
    let existing = coalesce(existing);
    let existing_positions: HashMap<T::Key, usize> = existing
        .iter()
        .enumerate()
        .map(|(index, resource)| (resource.key(), index))
        .collect();

    let mut matched = vec![false; existing.len()];
    let mut reconciliation = Reconciliation {
        to_create: vec![],
        to_delete: vec![],
        to_alter: vec![],
    };

    for resource in desired {
        let Some(&index) = existing_positions.get(&resource.key()) else {
            reconciliation.to_create.push(resource);
            continue;
        };

        matched[index] = true;
        let outcome = T::reconcile(&resource, &existing[index]);
        reconciliation.to_create.extend(outcome.create);
        reconciliation.to_delete.extend(outcome.delete);
        reconciliation.to_alter.extend(outcome.alter);
    }

    reconciliation.to_delete.extend(
        existing
            .into_iter()
            .zip(matched)
            .filter(|(_, matched)| !matched)
            .map(|(resource, _)| resource),
    );

    reconciliation
}
