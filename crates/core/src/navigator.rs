use std::ops::RangeInclusive;

use crate::model::EntryId;

/// Where a freshly opened group should land.
///
/// `First` is the deferred-redirect sentinel: it resolves to the first entry
/// once the list has loaded, and stays pending until then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    First,
    Entry(EntryId),
}

/// Position within the ordered entry list of one group.
///
/// No wraparound: `previous`/`next` return `None` at the edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    ids: Vec<EntryId>,
    current: usize,
}

impl Navigator {
    /// Resolve a target against a loaded entry list.
    ///
    /// Returns `None` while the list is empty or the target id is not in it,
    /// which callers treat as "still pending" rather than an error.
    #[must_use]
    pub fn resolve(ids: Vec<EntryId>, target: &NavTarget) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }
        let current = match target {
            NavTarget::First => 0,
            NavTarget::Entry(id) => ids.iter().position(|candidate| candidate == id)?,
        };
        Some(Self { ids, current })
    }

    #[must_use]
    pub fn current(&self) -> &EntryId {
        &self.ids[self.current]
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Entry before the current one, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&EntryId> {
        self.current.checked_sub(1).map(|i| &self.ids[i])
    }

    /// Entry after the current one, if any.
    #[must_use]
    pub fn next(&self) -> Option<&EntryId> {
        self.ids.get(self.current + 1)
    }

    /// Move to the entry at `index`. Out-of-bounds indexes are rejected.
    pub fn jump_to(&mut self, index: usize) -> Option<&EntryId> {
        if index >= self.ids.len() {
            return None;
        }
        self.current = index;
        Some(&self.ids[index])
    }

    /// Pagination window around the current entry: two before, one after,
    /// clamped to the list bounds.
    #[must_use]
    pub fn window(&self) -> RangeInclusive<usize> {
        let start = self.current.saturating_sub(2);
        let end = (self.current + 1).min(self.ids.len() - 1);
        start..=end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<EntryId> {
        (1..=n).map(|i| EntryId::new(format!("e{i}"))).collect()
    }

    #[test]
    fn empty_list_stays_pending() {
        assert!(Navigator::resolve(Vec::new(), &NavTarget::First).is_none());
    }

    #[test]
    fn first_sentinel_resolves_to_index_zero() {
        let nav = Navigator::resolve(ids(3), &NavTarget::First).unwrap();
        assert_eq!(nav.current_index(), 0);
        assert_eq!(nav.current().as_str(), "e1");
    }

    #[test]
    fn unknown_target_stays_pending() {
        let target = NavTarget::Entry(EntryId::new("missing"));
        assert!(Navigator::resolve(ids(3), &target).is_none());
    }

    #[test]
    fn no_wraparound_at_edges() {
        let mut nav = Navigator::resolve(ids(3), &NavTarget::First).unwrap();
        assert!(nav.previous().is_none());
        assert_eq!(nav.next().unwrap().as_str(), "e2");

        nav.jump_to(2).unwrap();
        assert_eq!(nav.previous().unwrap().as_str(), "e2");
        assert!(nav.next().is_none());
    }

    #[test]
    fn jump_rejects_out_of_bounds() {
        let mut nav = Navigator::resolve(ids(2), &NavTarget::First).unwrap();
        assert!(nav.jump_to(2).is_none());
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn window_is_two_before_one_after() {
        let mut nav = Navigator::resolve(ids(10), &NavTarget::First).unwrap();
        assert_eq!(nav.window(), 0..=1);

        nav.jump_to(5).unwrap();
        assert_eq!(nav.window(), 3..=6);

        nav.jump_to(9).unwrap();
        assert_eq!(nav.window(), 7..=9);
    }

    #[test]
    fn window_on_short_lists() {
        let nav = Navigator::resolve(ids(1), &NavTarget::First).unwrap();
        assert_eq!(nav.window(), 0..=0);
    }
}
