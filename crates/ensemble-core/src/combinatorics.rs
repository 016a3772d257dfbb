//! Lazy cartesian products over per-slot candidate lists.
//!
//! Given `[[a, b], [x, y, z]]`, [`Combinations`] yields `[a, x]`, `[a, y]`,
//! `[a, z]`, `[b, x]`, ... : the first list is the outermost loop and the
//! last list varies fastest. Only the current index vector is kept in memory,
//! so callers can stop after the first acceptable combination without paying
//! for the rest of the product.

use std::ops::ControlFlow;

/// Iterator over the cartesian product of `lists`.
///
/// An empty `lists` yields exactly one empty combination; any empty inner
/// list yields nothing.
#[derive(Debug, Clone)]
pub struct Combinations<'a, T> {
    lists: &'a [Vec<T>],
    /// Index into each list of the next combination; `None` once exhausted.
    cursor: Option<Vec<usize>>,
}

impl<'a, T> Combinations<'a, T> {
    pub fn new(lists: &'a [Vec<T>]) -> Self {
        let cursor = if lists.iter().any(Vec::is_empty) {
            None
        } else {
            Some(vec![0; lists.len()])
        };
        Self { lists, cursor }
    }

    /// Total number of combinations, saturating at `usize::MAX`.
    pub fn count_total(lists: &[Vec<T>]) -> usize {
        lists
            .iter()
            .fold(1usize, |acc, list| acc.saturating_mul(list.len()))
    }
}

impl<'a, T> Iterator for Combinations<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        let item: Vec<&'a T> = cursor
            .iter()
            .zip(self.lists)
            .map(|(&i, list)| &list[i])
            .collect();

        // Odometer step, last position fastest.
        let mut exhausted = true;
        for (pos, list) in cursor.iter_mut().zip(self.lists).rev() {
            *pos += 1;
            if *pos < list.len() {
                exhausted = false;
                break;
            }
            *pos = 0;
        }
        if exhausted {
            self.cursor = None;
        }
        Some(item)
    }
}

/// Run `f` on each combination of `lists` until it breaks.
///
/// Returns the break value, or `None` if every combination was visited.
pub fn for_each_combination<T, B, F>(lists: &[Vec<T>], mut f: F) -> Option<B>
where
    F: FnMut(&[&T]) -> ControlFlow<B>,
{
    for combination in Combinations::new(lists) {
        if let ControlFlow::Break(b) = f(&combination) {
            return Some(b);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
