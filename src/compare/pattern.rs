//! Change-pattern detection across an ordered sequence of versions
//!
//! Highlights how an edit propagated: where a new translation first appeared, whether it
//! survived in every later version, and which later versions carried it on. This is display
//! metadata only; merging never looks at it.
//!
//! Only versions with a non-empty target take part. A version that lacks the source, or has
//! an empty target, neither starts nor breaks a chain: the comparison simply skips to the
//! next version that has something to say.

use crate::model::VersionSlot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one version's target relates to the versions before and after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangePattern {
    /// The target differs from the previous version and every later version keeps it
    Changed,
    /// The target differs from the previous version but a later version differs again
    Reverted,
    /// The target repeats the most recent change
    ConsistentAfterChange,
}

/// Classify every version of one row
///
/// # Arguments
/// * `targets` - Plain-text target per version, in ascending slot order
///
/// # Returns
/// A label for each version that has one; the first version never does
pub fn detect_patterns(targets: &BTreeMap<VersionSlot, String>) -> BTreeMap<VersionSlot, ChangePattern> {
    let sequence: Vec<(VersionSlot, &str)> = targets
        .iter()
        .filter(|(_, target)| !target.is_empty())
        .map(|(slot, target)| (*slot, target.as_str()))
        .collect();

    let mut patterns = BTreeMap::new();
    let mut last_change: Option<usize> = None;

    for i in 1..sequence.len() {
        let (slot, current) = sequence[i];
        let previous = sequence[i - 1].1;

        if current != previous {
            let stuck = sequence[i + 1..].iter().all(|(_, later)| *later == current);
            let pattern = if stuck {
                ChangePattern::Changed
            } else {
                ChangePattern::Reverted
            };
            patterns.insert(slot, pattern);
            last_change = Some(i);
        } else if let Some(change) = last_change {
            if sequence[change].1 == current {
                patterns.insert(slot, ChangePattern::ConsistentAfterChange);
            }
        }
    }

    patterns
}
