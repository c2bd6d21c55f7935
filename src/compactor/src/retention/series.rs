//! Series deletion ledger for a single compaction pass.
//!
//! Index shards can report the same series many times. The ledger keeps one
//! entry per `series_id ‖ user_id` key, starts every entry out as deletable and
//! lets the scan retract that as soon as it finds live chunks for the series.
//!
//! The map is populated through `&mut self`, so scanning shards in parallel
//! requires wrapping it in a mutex or giving each worker its own ledger.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A single label pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// Ordered label set attached to a series. Passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new(labels: Vec<Label>) -> Self {
        Self(labels)
    }

    /// Value of the first label named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for Labels
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| Label {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        )
    }
}

/// Series identity within a tenant.
///
/// Both ids live in one buffer, `series_id` first, so the buffer itself is the
/// ledger key. Equality and hashing only look at the concatenated bytes: two
/// identities that split the same bytes differently are the same key.
#[derive(Debug, Clone, Default)]
pub struct UserSeries {
    key: Vec<u8>,
    series_id_len: usize,
}

impl UserSeries {
    pub fn new(series_id: &[u8], user_id: &[u8]) -> Self {
        let mut key = Vec::with_capacity(series_id.len() + user_id.len());
        key.extend_from_slice(series_id);
        key.extend_from_slice(user_id);
        Self {
            key,
            series_id_len: series_id.len(),
        }
    }

    /// Composite `series_id ‖ user_id` key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn series_id(&self) -> &[u8] {
        &self.key[..self.series_id_len]
    }

    pub fn user_id(&self) -> &[u8] {
        &self.key[self.series_id_len..]
    }

    /// Overwrite this identity in place, reusing the existing allocation.
    pub fn reset(&mut self, series_id: &[u8], user_id: &[u8]) {
        compose_key(&mut self.key, series_id, user_id);
        self.series_id_len = series_id.len();
    }
}

impl PartialEq for UserSeries {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for UserSeries {}

// Must hash exactly like `[u8]` so lookups through `Borrow<[u8]>` work.
impl Hash for UserSeries {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.as_slice().hash(state);
    }
}

impl Borrow<[u8]> for UserSeries {
    fn borrow(&self) -> &[u8] {
        &self.key
    }
}

/// Deletion state tracked for each series in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserSeriesInfo {
    /// `true` until some shard reports live data for the series.
    pub is_deleted: bool,
    pub labels: Labels,
}

/// Ledger of series seen during one compaction pass.
#[derive(Debug, Default)]
pub struct UserSeriesMap {
    series: HashMap<UserSeries, UserSeriesInfo>,
    // Reused for key lookups so probing existing entries does not allocate.
    scratch: Vec<u8>,
}

impl UserSeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series as deletable. The first registration wins; later
    /// calls for the same identity are ignored, whatever their labels.
    pub fn add(&mut self, series_id: &[u8], user_id: &[u8], labels: Labels) {
        let key = compose_key(&mut self.scratch, series_id, user_id);
        if self.series.contains_key(key) {
            return;
        }

        self.series.insert(
            UserSeries::new(series_id, user_id),
            UserSeriesInfo {
                is_deleted: true,
                labels,
            },
        );
    }

    /// Record that a series still has chunks in the store.
    ///
    /// An unseen series gets an entry with empty labels, so the mark holds no
    /// matter whether it arrives before or after the series' `add`. That entry
    /// still carries its series and user IDs; visitors never see a blank
    /// identity.
    pub fn mark_series_not_deleted(&mut self, series_id: &[u8], user_id: &[u8]) {
        let key = compose_key(&mut self.scratch, series_id, user_id);
        if let Some(info) = self.series.get_mut(key) {
            info.is_deleted = false;
            return;
        }

        self.series.insert(
            UserSeries::new(series_id, user_id),
            UserSeriesInfo {
                is_deleted: false,
                labels: Labels::default(),
            },
        );
    }

    pub fn get(&self, series_id: &[u8], user_id: &[u8]) -> Option<&UserSeriesInfo> {
        let mut key = Vec::new();
        self.series
            .get(compose_key(&mut key, series_id, user_id))
    }

    /// Visit every entry in unspecified order. The first visitor error stops
    /// the traversal and is returned.
    pub fn for_each<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&UserSeries, &UserSeriesInfo) -> Result<(), E>,
    {
        for (series, info) in &self.series {
            visit(series, info)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserSeries, &UserSeriesInfo)> {
        self.series.iter()
    }

    /// Entries still marked deletable: the series this pass may drop.
    pub fn deleted_series(&self) -> impl Iterator<Item = (&UserSeries, &UserSeriesInfo)> {
        self.series.iter().filter(|(_, info)| info.is_deleted)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn compose_key<'a>(buf: &'a mut Vec<u8>, series_id: &[u8], user_id: &[u8]) -> &'a [u8] {
    buf.clear();
    buf.reserve(series_id.len() + user_id.len());
    buf.extend_from_slice(series_id);
    buf.extend_from_slice(user_id);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(app: &str) -> Labels {
        [("app", app), ("env", "prod")].into_iter().collect()
    }

    #[test]
    fn test_user_series_accessors() {
        let series = UserSeries::new(b"s1", b"tenantA");
        assert_eq!(series.key(), b"s1tenantA");
        assert_eq!(series.series_id(), b"s1");
        assert_eq!(series.user_id(), b"tenantA");
    }

    #[test]
    fn test_user_series_reset_reuses_buffer() {
        let mut series = UserSeries::new(b"series-long-id", b"tenant");
        let capacity = series.key.capacity();

        series.reset(b"s2", b"t2");
        assert_eq!(series.series_id(), b"s2");
        assert_eq!(series.user_id(), b"t2");
        assert_eq!(series.key.capacity(), capacity);
    }

    #[test]
    fn test_add_marks_series_deleted() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));

        let info = ledger.get(b"s1", b"tenantA").unwrap();
        assert!(info.is_deleted);
        assert_eq!(info.labels.get("app"), Some("api"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_first_add_wins() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));
        ledger.add(b"s1", b"tenantA", labels("worker"));

        assert_eq!(ledger.len(), 1);
        let info = ledger.get(b"s1", b"tenantA").unwrap();
        assert!(info.is_deleted);
        assert_eq!(info.labels, labels("api"));
    }

    #[test]
    fn test_mark_after_add() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));
        ledger.mark_series_not_deleted(b"s1", b"tenantA");

        let info = ledger.get(b"s1", b"tenantA").unwrap();
        assert!(!info.is_deleted);
        assert_eq!(info.labels, labels("api"));

        let (series, _) = ledger.iter().next().unwrap();
        assert_eq!(series.key(), b"s1tenantA");
    }

    #[test]
    fn test_mark_before_add_materializes_entry() {
        let mut ledger = UserSeriesMap::new();
        ledger.mark_series_not_deleted(b"s1", b"tenantA");

        let info = ledger.get(b"s1", b"tenantA").unwrap();
        assert!(!info.is_deleted);
        assert!(info.labels.is_empty());

        // The later add is a no-op: the entry keeps empty labels.
        ledger.add(b"s1", b"tenantA", labels("api"));
        let info = ledger.get(b"s1", b"tenantA").unwrap();
        assert!(!info.is_deleted);
        assert!(info.labels.is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_mark_only_entry_keeps_its_identity() {
        let mut ledger = UserSeriesMap::new();
        ledger.mark_series_not_deleted(b"s1", b"tenantA");

        let mut seen = Vec::new();
        ledger
            .for_each(|series, info| {
                seen.push((
                    series.series_id().to_vec(),
                    series.user_id().to_vec(),
                    info.is_deleted,
                ));
                Ok::<(), ()>(())
            })
            .unwrap();

        assert_eq!(seen, vec![(b"s1".to_vec(), b"tenantA".to_vec(), false)]);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));
        ledger.mark_series_not_deleted(b"s1", b"tenantA");
        ledger.mark_series_not_deleted(b"s1", b"tenantA");

        assert_eq!(ledger.len(), 1);
        assert!(!ledger.get(b"s1", b"tenantA").unwrap().is_deleted);
    }

    #[test]
    fn test_tenants_are_separate_entries() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));
        ledger.add(b"s1", b"tenantB", labels("api"));
        ledger.mark_series_not_deleted(b"s1", b"tenantB");

        assert_eq!(ledger.len(), 2);
        assert!(ledger.get(b"s1", b"tenantA").unwrap().is_deleted);
        assert!(!ledger.get(b"s1", b"tenantB").unwrap().is_deleted);
    }

    #[test]
    fn test_identity_is_concatenated_bytes() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));
        ledger.mark_series_not_deleted(b"s1t", b"enantA");

        assert_eq!(ledger.len(), 1);
        let (series, info) = ledger.iter().next().unwrap();
        assert_eq!(series.series_id(), b"s1");
        assert!(!info.is_deleted);
    }

    #[test]
    fn test_deleted_series() {
        let mut ledger = UserSeriesMap::new();
        ledger.add(b"s1", b"tenantA", labels("api"));
        ledger.add(b"s2", b"tenantA", labels("worker"));
        ledger.add(b"s3", b"tenantA", labels("db"));
        ledger.mark_series_not_deleted(b"s2", b"tenantA");

        let mut deleted: Vec<_> = ledger
            .deleted_series()
            .map(|(series, _)| series.series_id().to_vec())
            .collect();
        deleted.sort();
        assert_eq!(deleted, vec![b"s1".to_vec(), b"s3".to_vec()]);
    }

    #[test]
    fn test_for_each_visits_all_entries() {
        let mut ledger = UserSeriesMap::new();
        for i in 0..10 {
            ledger.add(format!("s{i}").as_bytes(), b"tenant", Labels::default());
        }

        let mut visited = 0;
        let result: Result<(), String> = ledger.for_each(|_, info| {
            assert!(info.is_deleted);
            visited += 1;
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(visited, 10);
    }

    #[test]
    fn test_for_each_stops_on_first_error() {
        let mut ledger = UserSeriesMap::new();
        for i in 0..10 {
            ledger.add(format!("s{i}").as_bytes(), b"tenant", Labels::default());
        }

        let mut visited = 0;
        let result = ledger.for_each(|_, _| {
            visited += 1;
            if visited == 3 {
                return Err(format!("failed at {visited}"));
            }
            Ok(())
        });

        assert_eq!(result, Err("failed at 3".to_string()));
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_for_each_on_empty_ledger() {
        let ledger = UserSeriesMap::new();
        let result: Result<(), String> = ledger.for_each(|_, _| Err("unreachable".to_string()));
        assert!(result.is_ok());
        assert!(ledger.is_empty());
    }
}
