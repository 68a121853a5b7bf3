//! Hierarchy expansion of selected facets.
//!
//! This module provides the `HierarchyTraverser` struct that expands the
//! facets selected on a hierarchical reference (categories and the like) by
//! their descendants using BFS (Breadth-First Search).

use std::collections::VecDeque;

use facet_query::PrimaryKey;

use crate::bitset::EntityIdSet;
use crate::traits::HierarchyLookup;

/// Which descendants of a selected facet are part of the selection.
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyRefinement {
    /// Every descendant: `includingChildren()`
    All,
    /// Only descendants in the set, reached through descendants in the set:
    /// `includingChildrenHaving(..)`
    Having(EntityIdSet),
    /// Every descendant outside the subtrees rooted in the set:
    /// `includingChildrenExcept(..)`
    Except(EntityIdSet),
}

impl HierarchyRefinement {
    /// Returns true if the traversal may enter `node`.
    fn admits(&self, node: PrimaryKey) -> bool {
        match self {
            HierarchyRefinement::All => true,
            HierarchyRefinement::Having(allowed) => allowed.contains(node),
            HierarchyRefinement::Except(excluded) => !excluded.contains(node),
        }
    }
}

/// Traverses the hierarchy of one entity type using BFS.
///
/// # Example
///
/// ```ignore
/// use facet_summary::HierarchyTraverser;
///
/// let traverser = HierarchyTraverser::new(&store, "Category");
///
/// // All categories below "Electronics"
/// let descendants = traverser.get_descendants(1);
/// ```
pub struct HierarchyTraverser<'a> {
    hierarchy: &'a dyn HierarchyLookup,
    entity_type: &'a str,
}

impl<'a> HierarchyTraverser<'a> {
    /// Creates a new traverser over the given entity type.
    pub fn new(hierarchy: &'a dyn HierarchyLookup, entity_type: &'a str) -> Self {
        Self {
            hierarchy,
            entity_type,
        }
    }

    /// Gets all descendants of a node.
    ///
    /// Does NOT include the node itself.
    pub fn get_descendants(&self, primary_key: PrimaryKey) -> EntityIdSet {
        self.collect_descendants(primary_key, &HierarchyRefinement::All)
    }

    /// Gets the descendants of a node admitted by the refinement.
    ///
    /// A node that is not admitted is skipped together with its whole
    /// subtree. Does NOT include the node itself.
    pub fn collect_descendants(
        &self,
        primary_key: PrimaryKey,
        refinement: &HierarchyRefinement,
    ) -> EntityIdSet {
        let mut visited = EntityIdSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(primary_key);

        while let Some(current) = queue.pop_front() {
            for child in self.hierarchy.children_of(self.entity_type, current) {
                if child != primary_key && refinement.admits(child) && visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        visited
    }

    /// Expands the selected ids by the descendants admitted by the refinement.
    ///
    /// The selected ids themselves are always kept.
    pub fn expand(&self, selected: &EntityIdSet, refinement: &HierarchyRefinement) -> EntityIdSet {
        let mut expanded = selected.clone();
        for primary_key in selected {
            expanded.union_with(&self.collect_descendants(primary_key, refinement));
        }
        expanded
    }
}
