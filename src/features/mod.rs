//! Rule features shipped with the engine.

mod dict;
mod replace;
mod toc;

pub use dict::{DictRule, DictRuleFeature, DictRuleItem, DictRuleUiState};
pub use replace::{
    merge_groups, split_groups, ReplaceRule, ReplaceRuleFeature, ReplaceRuleItem,
    ReplaceRuleUiState,
};
pub use toc::{TocRuleFeature, TocRuleItem, TocRuleUiState, TxtTocRule};

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::RuleEntity;
use crate::store::RuleStore;

/// Fresh millisecond-timestamp id, strictly increasing within the process.
pub fn next_rule_id() -> i64 {
    static LAST: AtomicI64 = AtomicI64::new(0);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// First stored rule matching `predicate`, scanning the current snapshot.
pub(crate) fn find_in_snapshot<E: RuleEntity>(
    store: &dyn RuleStore<E>,
    predicate: impl Fn(&E) -> bool,
) -> Option<E> {
    store.observe().borrow().iter().find(|r| predicate(r)).cloned()
}

/// Case-insensitive substring match; an empty needle matches everything.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
