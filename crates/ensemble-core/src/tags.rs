//! Text tag sets and tag queries.
//!
//! Tags are short, case-insensitive labels ("kissing", "aggressive", "mf").
//! They are stored lowercased in a sorted set so iteration order is stable.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

/// An unordered set of case-insensitive labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag. Returns `false` if it was already present or is blank.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = normalize(tag);
        if tag.is_empty() {
            return false;
        }
        self.tags.insert(tag)
    }

    /// Insert every tag of `other`.
    pub fn add_tags(&mut self, other: &TagSet) {
        self.tags.extend(other.tags.iter().cloned());
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(&normalize(tag))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&normalize(tag))
    }

    /// Test `other` against this set.
    ///
    /// With `match_all` every tag of `other` must be present; otherwise any
    /// one suffices. An empty `other` always matches.
    pub fn has_tags(&self, other: &TagSet, match_all: bool) -> bool {
        if other.is_empty() {
            return true;
        }
        if match_all {
            other.tags.is_subset(&self.tags)
        } else {
            !other.tags.is_disjoint(&self.tags)
        }
    }

    /// Visit tags in sorted order until the callback breaks.
    ///
    /// Returns `true` if the callback broke out early.
    pub fn for_each_tag<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        self.tags.iter().any(|t| f(t).is_break())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.add_tag(tag.as_ref());
        }
        set
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// TagQuery
// ---------------------------------------------------------------------------

/// A parsed tag filter.
///
/// Written as a comma separated list: plain tags are required, tags prefixed
/// with `-` must be absent, and tags prefixed with `~` are alternatives of
/// which at least one must be present.
///
/// ```
/// use ensemble_core::tags::{TagQuery, TagSet};
///
/// let query = TagQuery::parse("kissing, -aggressive, ~bed, ~floor");
/// let tags: TagSet = ["Kissing", "floor"].into_iter().collect();
/// assert!(query.matches(&tags));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagQuery {
    pub required: TagSet,
    pub excluded: TagSet,
    pub any_of: TagSet,
}

impl TagQuery {
    pub fn parse(text: &str) -> Self {
        let mut query = TagQuery::default();
        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(tag) = item.strip_prefix('-') {
                query.excluded.add_tag(tag);
            } else if let Some(tag) = item.strip_prefix('~') {
                query.any_of.add_tag(tag);
            } else {
                query.required.add_tag(item);
            }
        }
        query
    }

    pub fn matches(&self, tags: &TagSet) -> bool {
        tags.has_tags(&self.required, true)
            && (self.excluded.is_empty() || !tags.has_tags(&self.excluded, false))
            && tags.has_tags(&self.any_of, false)
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty() && self.any_of.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tags: &[&str]) -> TagSet {
        tags.iter().collect()
    }

    #[test]
    fn tags_are_case_insensitive() {
        let mut tags = TagSet::new();
        assert!(tags.add_tag("Oral"));
        assert!(!tags.add_tag("ORAL"));
        assert!(!tags.add_tag("   "));
        assert!(tags.has_tag("oral"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn match_all_and_match_any() {
        let tags = set(&["a", "b", "c"]);
        assert!(tags.has_tags(&set(&["a", "c"]), true));
        assert!(!tags.has_tags(&set(&["a", "d"]), true));
        assert!(tags.has_tags(&set(&["a", "d"]), false));
        assert!(!tags.has_tags(&set(&["d", "e"]), false));
        assert!(tags.has_tags(&TagSet::new(), true));
        assert!(tags.has_tags(&TagSet::new(), false));
    }

    #[test]
    fn for_each_tag_stops_on_break() {
        let tags = set(&["a", "b", "c"]);
        let mut seen = Vec::new();
        let broke = tags.for_each_tag(|t| {
            seen.push(t.to_owned());
            if t == "b" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(broke);
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn query_combines_required_excluded_and_alternatives() {
        let query = TagQuery::parse("a, -x, ~p, ~q");
        assert!(query.matches(&set(&["a", "p"])));
        assert!(!query.matches(&set(&["a"])), "needs one alternative");
        assert!(!query.matches(&set(&["a", "q", "x"])), "excluded present");
        assert!(!query.matches(&set(&["p"])), "required missing");
        assert!(TagQuery::parse(" , ").is_empty());
    }
}
