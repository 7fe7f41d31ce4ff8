use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::error::{ExtractError, Result};

type NodeId = u32;

const ROOT: NodeId = 0;

/// A prefix trie over the whitespace delimited tokens of a job, mapping every
/// token (and every prefix of it) to the 1-based line numbers it appears on.
///
/// Nodes live in a flat arena and refer to each other by index. Queries are
/// order-insensitive: `find("a b")` and `find("b a")` return the same lines.
#[derive(Debug, Clone)]
pub struct KeywordIndex {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Default)]
struct Node {
    /// children sorted by character
    children: SmallVec<[(char, NodeId); 4]>,
    lines: BTreeSet<usize>,
}

impl Node {
    fn child(&self, c: char) -> Option<NodeId> {
        self.children
            .binary_search_by_key(&c, |&(key, _)| key)
            .ok()
            .map(|position| self.children[position].1)
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// Record that `token` occurs on `line_number` (1-based).
    ///
    /// Inserting the same pair twice has no further effect.
    pub fn insert(&mut self, token: &str, line_number: usize) -> Result<()> {
        if token.is_empty() {
            return Err(ExtractError::InvalidArgument(
                "cannot index an empty token".to_owned(),
            ));
        }
        if line_number == 0 {
            return Err(ExtractError::InvalidArgument(format!(
                "line numbers are 1-based, got 0 for `{token}`"
            )));
        }

        let mut current = ROOT;
        for c in token.chars() {
            current = match self.nodes[current as usize].child(c) {
                Some(next) => next,
                None => self.push_child(current, c),
            };
            self.nodes[current as usize].lines.insert(line_number);
        }

        Ok(())
    }

    fn push_child(&mut self, parent: NodeId, c: char) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::default());

        let children = &mut self.nodes[parent as usize].children;
        let position = children
            .binary_search_by_key(&c, |&(key, _)| key)
            .unwrap_or_else(|position| position);
        children.insert(position, (c, id));
        id
    }

    fn lines_of(&self, word: &str) -> Option<&BTreeSet<usize>> {
        let mut current = ROOT;
        for c in word.chars() {
            current = self.nodes[current as usize].child(c)?;
        }
        Some(&self.nodes[current as usize].lines)
    }

    /// Returns the sorted line numbers on which every word of `phrase` occurs.
    ///
    /// `None` means at least one word never occurs in the job. `Some(vec![])`
    /// means every word occurs, but never all on the same line.
    pub fn find(&self, phrase: &str) -> Option<Vec<usize>> {
        let mut words = phrase.split_whitespace();
        let mut intersection = self.lines_of(words.next()?)?.clone();

        for word in words {
            let lines = self.lines_of(word)?;
            intersection.retain(|line| lines.contains(line));
        }

        Some(intersection.into_iter().collect())
    }

    /// The first line on which every word of `phrase` occurs.
    pub fn first(&self, phrase: &str) -> Option<usize> {
        self.find(phrase)?.first().copied()
    }

    /// Like [`KeywordIndex::find`], but a phrase that never occurs (or never
    /// occurs as a whole) is a structural error naming what it was needed for.
    pub fn require(&self, phrase: &str, aspect: &str) -> Result<Vec<usize>> {
        match self.find(phrase) {
            Some(lines) if !lines.is_empty() => Ok(lines),
            _ => Err(ExtractError::not_found(phrase, aspect)),
        }
    }

    /// The first line of [`KeywordIndex::require`].
    pub fn require_first(&self, phrase: &str, aspect: &str) -> Result<usize> {
        self.require(phrase, aspect).map(|lines| lines[0])
    }

    /// Number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::KeywordIndex;
    use crate::error::ExtractError;

    fn index(entries: &[(&str, usize)]) -> KeywordIndex {
        let mut index = KeywordIndex::new();
        for &(token, line) in entries {
            index.insert(token, line).unwrap();
        }
        index
    }

    #[test]
    fn phrase_order_does_not_matter() {
        let index = index(&[
            ("alpha", 1),
            ("electrons", 1),
            ("beta", 1),
            ("alpha", 4),
            ("electrons", 7),
        ]);

        assert_eq!(index.find("alpha electrons"), Some(vec![1]));
        assert_eq!(index.find("electrons alpha"), index.find("alpha electrons"));
    }

    #[test]
    fn intersection_is_exact_and_sorted() {
        let index = index(&[
            ("Density", 9),
            ("Density", 2),
            ("Density", 5),
            ("Matrix:", 5),
            ("Matrix:", 9),
            ("Matrix:", 11),
        ]);

        assert_eq!(index.find("Density"), Some(vec![2, 5, 9]));
        assert_eq!(index.find("Matrix: Density"), Some(vec![5, 9]));
    }

    #[test]
    fn unseen_token_is_not_found_but_disjoint_tokens_are_empty() {
        let index = index(&[("NBasis", 3), ("NAtoms", 8)]);

        assert_eq!(index.find("Overlap"), None);
        assert_eq!(index.find("NBasis Overlap"), None);
        assert_eq!(index.find("NBasis NAtoms"), Some(vec![]));
        assert_eq!(index.find(""), None);
    }

    #[test]
    fn prefixes_share_storage_and_match() {
        let index = index(&[("NBasis", 3), ("NBsUse", 4)]);

        assert_eq!(index.find("NB"), Some(vec![3, 4]));
        assert_eq!(index.find("NBa"), Some(vec![3]));
        // root + N, B, a, s, i, s + s, U, s, e
        assert_eq!(index.node_count(), 11);
    }

    #[test]
    fn insertion_is_idempotent() {
        let mut once = index(&[("EigV", 12)]);
        once.insert("EigV", 12).unwrap();

        assert_eq!(once.find("EigV"), Some(vec![12]));
        assert_eq!(once.node_count(), 5);
    }

    #[test]
    fn empty_token_and_zero_line_are_rejected() {
        let mut index = KeywordIndex::new();

        assert!(matches!(
            index.insert("", 1),
            Err(ExtractError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.insert("SCF", 0),
            Err(ExtractError::InvalidArgument(_))
        ));
    }

    #[test]
    fn require_names_the_missing_keyword() {
        let index = index(&[("NAtoms=", 2)]);

        assert_eq!(index.require_first("NAtoms", "atom count").unwrap(), 2);
        let error = index.require("Overlap", "overlap matrix").unwrap_err();
        assert!(error.to_string().contains("Overlap"));
        assert!(error.to_string().contains("overlap matrix"));
    }
}
