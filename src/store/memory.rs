use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::model::RuleEntity;

use super::{RuleStore, StoreError};

/// In-memory store publishing snapshots through a `watch` channel.
///
/// Snapshots are kept sorted by `sort_order`; ties keep insertion order.
pub struct MemoryStore<E: RuleEntity> {
    rules: Mutex<Vec<E>>,
    sender: watch::Sender<Vec<E>>,
}

impl<E: RuleEntity> MemoryStore<E> {
    pub fn new() -> Self {
        Self::with_rules(Vec::new())
    }

    pub fn with_rules(mut rules: Vec<E>) -> Self {
        sort_rules(&mut rules);
        let (sender, _) = watch::channel(rules.clone());
        Self {
            rules: Mutex::new(rules),
            sender,
        }
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.rules.lock().clone()
    }

    /// Apply `mutate` to a copy, run `persist` on the result and only then
    /// publish it. A failing `persist` leaves the store untouched.
    pub(crate) fn commit<F, P>(&self, mutate: F, persist: P) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<E>),
        P: FnOnce(&[E]) -> Result<(), StoreError>,
    {
        let mut guard = self.rules.lock();
        let mut next = guard.clone();
        mutate(&mut next);
        sort_rules(&mut next);
        persist(&next)?;
        *guard = next.clone();
        self.sender.send_replace(next);
        Ok(())
    }

    /// Copy of the current rules with `mutate` applied, in display order.
    pub(crate) fn staged<F>(&self, mutate: F) -> Vec<E>
    where
        F: FnOnce(&mut Vec<E>),
    {
        let mut next = self.rules.lock().clone();
        mutate(&mut next);
        sort_rules(&mut next);
        next
    }

    /// Replace the rules with an already staged copy and notify observers.
    pub(crate) fn publish(&self, rules: Vec<E>) {
        *self.rules.lock() = rules.clone();
        self.sender.send_replace(rules);
    }

    pub(crate) fn find_sync(&self, key: &E::Key) -> Option<E> {
        self.rules.lock().iter().find(|r| &r.key() == key).cloned()
    }
}

impl<E: RuleEntity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: RuleEntity> RuleStore<E> for MemoryStore<E> {
    fn observe(&self) -> watch::Receiver<Vec<E>> {
        self.sender.subscribe()
    }

    async fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        Ok(self.find_sync(key))
    }

    async fn upsert_all(&self, rules: Vec<E>) -> Result<(), StoreError> {
        self.commit(|current| upsert_into(current, rules), |_| Ok(()))
    }

    async fn delete(&self, keys: &[E::Key]) -> Result<(), StoreError> {
        self.commit(|current| remove_keys(current, keys), |_| Ok(()))
    }
}

pub(crate) fn upsert_into<E: RuleEntity>(current: &mut Vec<E>, incoming: Vec<E>) {
    for rule in incoming {
        let key = rule.key();
        match current.iter_mut().find(|r| r.key() == key) {
            Some(slot) => *slot = rule,
            None => current.push(rule),
        }
    }
}

pub(crate) fn remove_keys<E: RuleEntity>(current: &mut Vec<E>, keys: &[E::Key]) {
    let keys: HashSet<&E::Key> = keys.iter().collect();
    current.retain(|r| !keys.contains(&r.key()));
}

fn sort_rules<E: RuleEntity>(rules: &mut [E]) {
    rules.sort_by_key(|r| r.sort_order());
}
