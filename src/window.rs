//! Offset-by-one window over partitioned rows.
//!
//! Rows are grouped into partitions, each partition is sorted explicitly,
//! and [`lag`] walks a sorted partition yielding `(current, previous)` pairs.
//! The iterator borrows the partition and owns only its position, so it can
//! be recreated at any time to restart the traversal.

use std::collections::BTreeMap;

/// Group `rows` by `key`, then sort every partition by `order`.
///
/// Partitions come back in ascending key order. The sort is stable, so rows
/// with equal order keys keep their input order.
pub fn partition_sorted<'a, T, K, O, FK, FO>(
    rows: impl IntoIterator<Item = &'a T>,
    key: FK,
    order: FO,
) -> BTreeMap<K, Vec<&'a T>>
where
    T: 'a,
    K: Ord,
    O: Ord,
    FK: Fn(&T) -> K,
    FO: Fn(&T) -> O,
{
    let mut partitions: BTreeMap<K, Vec<&'a T>> = BTreeMap::new();
    for row in rows {
        partitions.entry(key(row)).or_default().push(row);
    }
    for partition in partitions.values_mut() {
        partition.sort_by_key(|row| order(*row));
    }
    partitions
}

/// Pairs each row of an ordered partition with the row one step earlier.
pub struct Lagged<'a, T> {
    rows: &'a [T],
    pos: usize,
}

/// Start a lag traversal over an already ordered partition.
pub fn lag<T>(rows: &[T]) -> Lagged<'_, T> {
    Lagged { rows, pos: 0 }
}

impl<'a, T> Iterator for Lagged<'a, T> {
    type Item = (&'a T, Option<&'a T>);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.rows.get(self.pos)?;
        let previous = self.pos.checked_sub(1).and_then(|i| self.rows.get(i));
        self.pos += 1;
        Some((current, previous))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Lagged<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_pairs() {
        let values = [100, 120, 90];
        let pairs: Vec<(i32, Option<i32>)> = lag(&values).map(|(c, p)| (*c, p.copied())).collect();
        assert_eq!(pairs, vec![(100, None), (120, Some(100)), (90, Some(120))]);
    }

    #[test]
    fn test_lag_is_restartable() {
        let values = [1, 2];
        let first: Vec<_> = lag(&values).collect();
        let second: Vec<_> = lag(&values).collect();
        assert_eq!(first, second);
        assert_eq!(lag(&values).len(), 2);
        assert_eq!(lag::<i32>(&[]).next(), None);
    }

    #[test]
    fn test_partitions_are_sorted_independently() {
        let rows = vec![("b", 3), ("a", 2), ("b", 1), ("a", 9), ("a", 1)];
        let parts = partition_sorted(&rows, |r| r.0, |r| r.1);
        let keys: Vec<_> = parts.keys().copied().collect();
        assert_eq!(keys, vec!["a", "b"]);
        let a: Vec<i32> = parts["a"].iter().map(|r| r.1).collect();
        let b: Vec<i32> = parts["b"].iter().map(|r| r.1).collect();
        assert_eq!(a, vec![1, 2, 9]);
        assert_eq!(b, vec![1, 3]);
    }
}
