//! This module contains the representation of the inheritance relationships
//! between the contracts in a merged source text, and the linearization used
//! to order override lookups.

use std::collections::{HashMap, HashSet};

/// The direct-parent relationships between contracts, as declared by
/// `contract X is Y, Z` clauses.
///
/// Constructor-call arguments after a parent name (`Y(arg)`) are stripped by
/// the parser; only the identifiers are recorded here.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InheritanceMap {
    /// Contract name to its direct parents, in declaration order.
    relations: HashMap<String, Vec<String>>,
}

impl InheritanceMap {
    /// Creates a new, empty, inheritance map.
    #[must_use]
    pub fn new() -> Self {
        let relations = HashMap::new();
        Self { relations }
    }

    /// Records that `child` directly inherits from `parents`, in the given
    /// order.
    ///
    /// Flattened source can declare the same contract twice; the first
    /// declaration's parent list is kept.
    pub fn record(&mut self, child: impl Into<String>, parents: Vec<String>) {
        self.relations.entry(child.into()).or_insert(parents);
    }

    /// Gets the direct parents of `contract`, in declaration order.
    #[must_use]
    pub fn parents(&self, contract: &str) -> &[String] {
        self.relations.get(contract).map(Vec::as_slice).unwrap_or_default()
    }

    /// Checks whether any inheritance relationships were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Gets the names of all contracts that appear as a parent of some other
    /// contract.
    #[must_use]
    pub fn all_parents(&self) -> HashSet<&str> {
        self.relations
            .values()
            .flat_map(|parents| parents.iter().map(String::as_str))
            .collect()
    }

    /// Checks whether `contract` declares any parents.
    #[must_use]
    pub fn has_parents(&self, contract: &str) -> bool {
        !self.parents(contract).is_empty()
    }

    /// Produces the ancestry of `contract` as an ordered, duplicate-free list
    /// with the most-derived contract first.
    ///
    /// The order is computed by a post-order depth-first traversal (parents
    /// are visited before the contract that inherits from them) followed by a
    /// reversal. This is an approximation of Solidity's C3 linearization that
    /// is sufficient for override lookup; it is not guaranteed to agree with
    /// the compiler for diamond-shaped multiple inheritance with conflicting
    /// declaration orders.
    #[must_use]
    pub fn linearize(&self, contract: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut ordered = Vec::new();
        self.visit(contract, &mut visited, &mut ordered);
        ordered.reverse();
        ordered
    }

    /// Visits `current` and its ancestry depth-first, recording each contract
    /// after all of its parents.
    fn visit(&self, current: &str, visited: &mut HashSet<String>, ordered: &mut Vec<String>) {
        if !visited.insert(current.to_string()) {
            return;
        }

        for parent in self.parents(current) {
            self.visit(parent, visited, ordered);
        }

        ordered.push(current.to_string());
    }
}

#[cfg(test)]
mod test {
    use super::InheritanceMap;

    #[test]
    fn linearizes_most_derived_first() {
        let mut map = InheritanceMap::new();
        map.record("A", vec!["B".to_string(), "C".to_string()]);
        map.record("B", vec!["C".to_string()]);

        let order = map.linearize("A");
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn shared_ancestors_appear_exactly_once() {
        let mut map = InheritanceMap::new();
        map.record("Child", vec!["Left".to_string(), "Right".to_string()]);
        map.record("Left", vec!["Base".to_string()]);
        map.record("Right", vec!["Base".to_string()]);

        let order = map.linearize("Child");
        assert_eq!(order.iter().filter(|name| *name == "Base").count(), 1);
        assert_eq!(order.first().map(String::as_str), Some("Child"));
    }

    #[test]
    fn unknown_contracts_linearize_to_themselves() {
        let map = InheritanceMap::new();
        assert_eq!(map.linearize("Alone"), vec!["Alone"]);
    }

    #[test]
    fn keeps_the_first_parent_list_for_duplicate_declarations() {
        let mut map = InheritanceMap::new();
        map.record("A", vec!["B".to_string()]);
        map.record("A", vec!["C".to_string()]);

        assert_eq!(map.parents("A"), ["B".to_string()]);
    }
}
