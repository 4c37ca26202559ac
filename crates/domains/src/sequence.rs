//! # BlogSequence
//!
//! The ordered membership list of a thread. Order is reading order and is
//! always caller-supplied; the sequence never sorts. Every constructor and
//! mutator keeps the list free of duplicates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::models::BlogId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BlogId>", into = "Vec<BlogId>")]
pub struct BlogSequence(Vec<BlogId>);

/// Where a blog sits inside its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPosition {
    pub index: usize,
    pub total: usize,
    pub previous: Option<BlogId>,
    pub next: Option<BlogId>,
}

impl BlogSequence {
    pub fn new(ids: Vec<BlogId>) -> DomainResult<Self> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(*id) {
                return Err(DomainError::InvalidArgument(format!(
                    "Blog {id} appears more than once"
                )));
            }
        }
        Ok(Self(ids))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: BlogId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlogId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[BlogId] {
        &self.0
    }

    pub fn position(&self, id: BlogId) -> Option<usize> {
        self.0.iter().position(|b| *b == id)
    }

    /// Appends `id` as the newest entry.
    pub fn push(&mut self, id: BlogId) -> DomainResult<()> {
        if self.contains(id) {
            return Err(DomainError::AlreadyMember(id));
        }
        self.0.push(id);
        Ok(())
    }

    /// Removes `id` if present. Returns whether anything changed.
    pub fn remove(&mut self, id: BlogId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replaces the order with `new_order`, which must be a permutation of
    /// the current members. On failure the sequence is left untouched.
    pub fn reorder(&mut self, new_order: Vec<BlogId>) -> DomainResult<()> {
        if !self.is_permutation(&new_order) {
            return Err(DomainError::InvalidArgument(
                "Reorder must contain the same blog IDs".into(),
            ));
        }
        self.0 = new_order;
        Ok(())
    }

    /// Same length and same members; duplicates in `candidate` fail the
    /// length-vs-set comparison.
    pub fn is_permutation(&self, candidate: &[BlogId]) -> bool {
        if candidate.len() != self.0.len() {
            return false;
        }
        let current: HashSet<&BlogId> = self.0.iter().collect();
        let proposed: HashSet<&BlogId> = candidate.iter().collect();
        current == proposed
    }

    pub fn neighbours(&self, id: BlogId) -> Option<SeriesPosition> {
        let index = self.position(id)?;
        Some(SeriesPosition {
            index,
            total: self.0.len(),
            previous: index.checked_sub(1).map(|i| self.0[i]),
            next: self.0.get(index + 1).copied(),
        })
    }
}

impl TryFrom<Vec<BlogId>> for BlogSequence {
    type Error = DomainError;

    fn try_from(ids: Vec<BlogId>) -> Result<Self, Self::Error> {
        BlogSequence::new(ids)
    }
}

impl From<BlogSequence> for Vec<BlogId> {
    fn from(seq: BlogSequence) -> Self {
        seq.0
    }
}

impl<'a> IntoIterator for &'a BlogSequence {
    type Item = &'a BlogId;
    type IntoIter = std::slice::Iter<'a, BlogId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<BlogId> {
        (0..n).map(|_| BlogId::new()).collect()
    }

    #[test]
    fn rejects_duplicates_on_construction() {
        let b = BlogId::new();
        let err = BlogSequence::new(vec![b, BlogId::new(), b]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn push_appends_and_refuses_existing_member() {
        let v = ids(2);
        let mut seq = BlogSequence::new(v.clone()).unwrap();
        let extra = BlogId::new();
        seq.push(extra).unwrap();
        assert_eq!(seq.as_slice(), &[v[0], v[1], extra]);

        let err = seq.push(v[0]).unwrap_err();
        assert!(matches!(err, DomainError::AlreadyMember(id) if id == v[0]));
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn remove_of_absent_member_is_a_no_op() {
        let v = ids(3);
        let mut seq = BlogSequence::new(v.clone()).unwrap();
        assert!(!seq.remove(BlogId::new()));
        assert_eq!(seq.as_slice(), v.as_slice());

        assert!(seq.remove(v[1]));
        assert_eq!(seq.as_slice(), &[v[0], v[2]]);
    }

    #[test]
    fn reorder_accepts_only_permutations() {
        let v = ids(3);
        let mut seq = BlogSequence::new(v.clone()).unwrap();

        seq.reorder(vec![v[1], v[0], v[2]]).unwrap();
        assert_eq!(seq.as_slice(), &[v[1], v[0], v[2]]);

        // dropped member
        assert!(seq.reorder(vec![v[0], v[1]]).is_err());
        // duplicated member with matching length
        assert!(seq.reorder(vec![v[0], v[0], v[1]]).is_err());
        // foreign member
        assert!(seq.reorder(vec![v[0], v[1], BlogId::new()]).is_err());
        // extra member
        assert!(seq.reorder(vec![v[0], v[1], v[2], BlogId::new()]).is_err());

        assert_eq!(seq.as_slice(), &[v[1], v[0], v[2]]);
    }

    #[test]
    fn neighbours_at_boundaries() {
        let v = ids(3);
        let seq = BlogSequence::new(v.clone()).unwrap();

        let first = seq.neighbours(v[0]).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.previous, None);
        assert_eq!(first.next, Some(v[1]));

        let last = seq.neighbours(v[2]).unwrap();
        assert_eq!(last.index, 2);
        assert_eq!(last.total, 3);
        assert_eq!(last.previous, Some(v[1]));
        assert_eq!(last.next, None);

        assert!(seq.neighbours(BlogId::new()).is_none());
    }

    #[test]
    fn deserialising_duplicates_fails() {
        let b = BlogId::new();
        let raw = format!("[\"{b}\", \"{b}\"]");
        assert!(serde_json::from_str::<BlogSequence>(&raw).is_err());
    }
}
