//! Queries over the parse tree: ancestor search, recursive descendant
//! search, and plain traversal iterators.

use crate::element::{NodeId, Tree};
use regex::Regex;
use std::collections::{HashSet, VecDeque};

impl Tree {
    /// Walk parents from `from` and return the first whose name equals
    /// `name`; failing that, the first whose path matches `pattern`.
    pub fn closest(&self, from: NodeId, name: &str, pattern: Option<&Regex>) -> Option<NodeId> {
        let mut by_pattern = None;

        let mut cursor = self.node(from).parent;
        while let Some(current) = cursor {
            if self.node(current).name == name {
                return Some(current);
            }
            if by_pattern.is_none() {
                if let Some(pattern) = pattern {
                    if pattern.is_match(&self.path(current)) {
                        by_pattern = Some(current);
                    }
                }
            }
            cursor = self.node(current).parent;
        }

        by_pattern
    }

    /// Preorder descent from `from`, returning every element whose name
    /// equals `name` or whose path matches `pattern`.
    ///
    /// The same element can be reachable through several views (per-kind
    /// track buckets alias TrackEntry nodes); duplicates are suppressed by
    /// identity.
    pub fn find(&self, from: NodeId, name: Option<&str>, pattern: Option<&Regex>) -> Vec<NodeId> {
        let mut matches = Vec::new();
        let mut seen = HashSet::new();

        for node in self.descendants(from) {
            if !seen.insert(node) {
                continue;
            }
            let element = self.node(node);
            let hit = name.is_some_and(|n| element.name == n)
                || pattern.is_some_and(|p| p.is_match(&self.path(node)));
            if hit {
                matches.push(node);
            }
        }

        matches
    }

    /// Depth-first preorder iterator over the subtree rooted at `from`,
    /// excluding `from` itself.
    pub fn descendants(&self, from: NodeId) -> DepthFirst<'_> {
        let mut stack = Vec::new();
        push_children_reversed(self, from, &mut stack);
        DepthFirst { tree: self, stack }
    }

    /// Breadth-first iterator over the subtree rooted at `from`, excluding
    /// `from` itself.
    pub fn breadth_first(&self, from: NodeId) -> BreadthFirst<'_> {
        let mut queue = VecDeque::new();
        for (_, slot) in self.node(from).children.iter() {
            queue.extend(slot.all().iter().copied());
        }
        BreadthFirst { tree: self, queue }
    }
}

fn push_children_reversed(tree: &Tree, node: NodeId, stack: &mut Vec<NodeId>) {
    let mut children: Vec<NodeId> = Vec::new();
    for (_, slot) in tree.node(node).children.iter() {
        children.extend(slot.all().iter().copied());
    }
    while let Some(child) = children.pop() {
        stack.push(child);
    }
}

/// Depth-first preorder traversal.
pub struct DepthFirst<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        push_children_reversed(self.tree, node, &mut self.stack);
        Some(node)
    }
}

/// Breadth-first traversal.
pub struct BreadthFirst<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeId>,
}

impl Iterator for BreadthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        for (_, slot) in self.tree.node(node).children.iter() {
            self.queue.extend(slot.all().iter().copied());
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Children, Element, Value};
    use crate::schema::ElementType;

    fn build_tree() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let alloc = |tree: &mut Tree, name, parent| {
            tree.alloc(Element {
                id: 0,
                name,
                kind: ElementType::Master,
                offset: 0,
                data_offset: 0,
                size: Some(0),
                level: 0,
                parent,
                root: None,
                skipped: false,
                value: Value::None,
                raw: None,
                children: Children::default(),
            })
        };

        let segment = alloc(&mut tree, "Segment", None);
        let tracks = alloc(&mut tree, "Tracks", Some(segment));
        let entry1 = alloc(&mut tree, "TrackEntry", Some(tracks));
        let entry2 = alloc(&mut tree, "TrackEntry", Some(tracks));
        tree.add_root(segment);
        tree.node_mut(segment).children.insert("Tracks", tracks, false);
        tree.node_mut(tracks).children.insert("TrackEntry", entry1, true);
        tree.node_mut(tracks).children.insert("TrackEntry", entry2, true);
        (tree, segment, tracks, entry1, entry2)
    }

    #[test]
    fn test_closest_by_name() {
        let (tree, segment, tracks, entry1, _) = build_tree();
        assert_eq!(tree.closest(entry1, "Tracks", None), Some(tracks));
        assert_eq!(tree.closest(entry1, "Segment", None), Some(segment));
        assert_eq!(tree.closest(entry1, "Info", None), None);
    }

    #[test]
    fn test_closest_by_pattern() {
        let (tree, _, tracks, entry1, _) = build_tree();
        let pattern = Regex::new(r"Tracks$").unwrap();
        assert_eq!(tree.closest(entry1, "NoSuchName", Some(&pattern)), Some(tracks));
    }

    #[test]
    fn test_find_by_name() {
        let (tree, segment, _, entry1, entry2) = build_tree();
        let found = tree.find(segment, Some("TrackEntry"), None);
        assert_eq!(found, vec![entry1, entry2]);
    }

    #[test]
    fn test_find_deduplicates_aliases() {
        let (mut tree, segment, tracks, entry1, _) = build_tree();
        // Alias entry1 under a per-kind bucket, as track cooking does.
        tree.node_mut(tracks).children.insert("Video", entry1, true);
        let found = tree.find(segment, Some("TrackEntry"), None);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_breadth_first_order() {
        let (tree, segment, tracks, entry1, entry2) = build_tree();
        let order: Vec<NodeId> = tree.breadth_first(segment).collect();
        assert_eq!(order, vec![tracks, entry1, entry2]);
    }

    #[test]
    fn test_depth_first_order() {
        let (tree, segment, tracks, entry1, entry2) = build_tree();
        let order: Vec<NodeId> = tree.descendants(segment).collect();
        assert_eq!(order, vec![tracks, entry1, entry2]);
    }
}
