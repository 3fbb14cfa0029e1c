//! The branch lineage model.
//!
//! Lineage maps each feature branch to its parent. The transitive parent
//! walk from any branch terminates at a branch without an entry (main or a
//! perennial branch). All queries are pure; persistence lives in
//! [`crate::config`].

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    parents: BTreeMap<String, String>,
}

impl Lineage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn parent(&self, branch: &str) -> Option<&str> {
        self.parents.get(branch).map(|parent| parent.as_str())
    }

    pub fn has_parent(&self, branch: &str) -> bool {
        self.parents.contains_key(branch)
    }

    pub fn set_parent(&mut self, branch: &str, parent: &str) {
        self.parents.insert(branch.to_string(), parent.to_string());
    }

    pub fn remove(&mut self, branch: &str) {
        self.parents.remove(branch);
    }

    /// All (child, parent) entries, child-ordered.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.parents
            .iter()
            .map(|(child, parent)| (child.clone(), parent.clone()))
            .collect()
    }

    /// All branches that have a lineage entry.
    pub fn branches(&self) -> Vec<String> {
        self.parents.keys().cloned().collect()
    }

    /// The ancestors of a branch, root-most first, ending with the
    /// immediate parent. The walk stops at the first branch without an
    /// entry; a cycle in the map terminates the walk instead of looping.
    pub fn ancestors(&self, branch: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = branch;
        while let Some(parent) = self.parent(current) {
            if result.iter().any(|seen| seen == parent) || parent == branch {
                break;
            }
            result.push(parent.to_string());
            current = parent;
        }
        result.reverse();
        result
    }

    /// The direct children of a branch.
    pub fn children(&self, branch: &str) -> Vec<String> {
        self.parents
            .iter()
            .filter(|(_, parent)| parent.as_str() == branch)
            .map(|(child, _)| child.clone())
            .collect()
    }

    /// All transitive children of a branch, depth-first.
    pub fn descendants(&self, branch: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut stack = self.children(branch);
        stack.reverse();
        while let Some(child) = stack.pop() {
            if result.contains(&child) {
                continue;
            }
            let mut grandchildren = self.children(&child);
            grandchildren.reverse();
            stack.extend(grandchildren);
            result.push(child);
        }
        result
    }

    /// Whether every parent walk terminates without revisiting a branch.
    pub fn is_acyclic(&self) -> bool {
        for branch in self.parents.keys() {
            let mut seen = vec![branch.as_str()];
            let mut current = branch.as_str();
            while let Some(parent) = self.parent(current) {
                if seen.contains(&parent) {
                    return false;
                }
                seen.push(parent);
                current = parent;
            }
        }
        true
    }
}
