//! Hierarchical group tree stored in a flat arena.
//!
//! Groups reference each other by [`GroupId`] (an index into the arena), so
//! parent, child and previous-sibling links never form ownership cycles.
//! The root has depth 0 and no grouping value; each grouping column adds one
//! level below it.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::calculate::{calculate_by, CalculatedValue};
use crate::field::{compare_values, CellValue, SortDirection};
use crate::layout::Rect;
use crate::types::{Column, ColumnId, GridData, Row};

/// Index of a group in its [`GroupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(pub usize);

/// A grouping level: the column to group by and the order of its groups.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLevel<'a> {
    pub column: &'a Column,
    pub direction: SortDirection,
}

/// A node of the group tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub depth: usize,
    pub parent: Option<GroupId>,
    /// Previous sibling, for upward navigation between groups.
    pub previous: Option<GroupId>,
    pub children: Vec<GroupId>,
    /// Storage indexes of every row under this group, in display order.
    pub rows: Vec<usize>,
    pub column: Option<ColumnId>,
    pub value: Option<CellValue>,
    /// Normalized grouping key shared by all rows of the group.
    pub key: String,
    pub collapsed: bool,
    pub aggregates: HashMap<ColumnId, CalculatedValue>,
    /// Content-space rectangle, filled in by the layout pass.
    pub rect: Option<Rect>,
}

impl Group {
    fn new(id: GroupId, depth: usize, parent: Option<GroupId>) -> Self {
        Self {
            id,
            depth,
            parent,
            previous: None,
            children: Vec::new(),
            rows: Vec::new(),
            column: None,
            value: None,
            key: String::new(),
            collapsed: false,
            aggregates: HashMap::new(),
            rect: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena of groups with a single root.
#[derive(Debug, Clone, Serialize)]
pub struct GroupTree {
    nodes: Vec<Group>,
}

impl GroupTree {
    pub const ROOT: GroupId = GroupId(0);

    /// Partition `order` (row indexes, already sorted) into one tree level per
    /// grouping level. Rows keep their relative order inside every group.
    pub fn build(rows: &[Row], order: &[usize], levels: &[GroupLevel<'_>]) -> Self {
        let mut tree = Self {
            nodes: vec![Group::new(Self::ROOT, 0, None)],
        };
        if let Some(root) = tree.nodes.first_mut() {
            root.rows = order.to_vec();
        }
        tree.split(Self::ROOT, rows, levels);
        tracing::debug!(groups = tree.nodes.len(), rows = order.len(), "group tree built");
        tree
    }

    fn split(&mut self, parent: GroupId, rows: &[Row], levels: &[GroupLevel<'_>]) {
        let Some((level, rest)) = levels.split_first() else {
            return;
        };
        let Some(parent_rows) = self.get(parent).map(|g| g.rows.clone()) else {
            return;
        };
        let depth = self.get(parent).map_or(0, |g| g.depth + 1);
        let column = &level.column.id;

        // Bucket by normalized key, remembering first-seen order.
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(String, Option<CellValue>, Vec<usize>)> = Vec::new();
        for &row_idx in &parent_rows {
            let value = rows.get(row_idx).and_then(|r| r.get(column));
            let key = level.column.field.group_key(value);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, value.cloned(), Vec::new()));
                buckets.len() - 1
            });
            if let Some(bucket) = buckets.get_mut(slot) {
                bucket.2.push(row_idx);
            }
        }

        buckets.sort_by(|a, b| {
            level
                .direction
                .apply(compare_values(a.1.as_ref(), b.1.as_ref()))
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut previous = None;
        let mut children = Vec::with_capacity(buckets.len());
        for (key, value, bucket_rows) in buckets {
            let id = GroupId(self.nodes.len());
            let mut group = Group::new(id, depth, Some(parent));
            group.previous = previous;
            group.column = Some(column.clone());
            group.value = value;
            group.key = key;
            group.rows = bucket_rows;
            self.nodes.push(group);
            children.push(id);
            previous = Some(id);
        }
        if let Some(p) = self.get_mut(parent) {
            p.children.clone_from(&children);
        }
        for child in children {
            self.split(child, rows, rest);
        }
    }

    pub fn root(&self) -> Option<&Group> {
        self.nodes.first()
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.nodes.iter()
    }

    pub fn children(&self, id: GroupId) -> &[GroupId] {
        self.get(id).map_or(&[], |g| g.children.as_slice())
    }

    /// Chain from `id`'s parent up to the root, closest first.
    pub fn ancestors(&self, id: GroupId) -> impl Iterator<Item = GroupId> + '_ {
        std::iter::successors(self.get(id).and_then(|g| g.parent), move |p| {
            self.get(*p).and_then(|g| g.parent)
        })
    }

    /// Whether any ancestor of `id` is collapsed.
    pub fn is_hidden_by_collapse(&self, id: GroupId) -> bool {
        self.ancestors(id)
            .filter(|a| *a != Self::ROOT)
            .any(|a| self.get(a).is_some_and(|g| g.collapsed))
    }

    /// Leaf groups in display order.
    pub fn leaves(&self) -> Vec<GroupId> {
        let mut out = Vec::new();
        self.collect_leaves(Self::ROOT, &mut out);
        out
    }

    fn collect_leaves(&self, id: GroupId, out: &mut Vec<GroupId>) {
        let children = self.children(id);
        if children.is_empty() {
            out.push(id);
        } else {
            for &child in children {
                self.collect_leaves(child, out);
            }
        }
    }

    /// Row indexes in display order (leaf by leaf).
    pub fn flatten_rows(&self) -> Vec<usize> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| self.get(leaf))
            .flat_map(|g| g.rows.iter().copied())
            .collect()
    }

    /// Toggle one group; returns `false` for the root or an unknown id.
    pub fn set_collapsed(&mut self, id: GroupId, collapsed: bool) -> bool {
        if id == Self::ROOT {
            return false;
        }
        match self.get_mut(id) {
            Some(group) => {
                group.collapsed = collapsed;
                true
            }
            None => false,
        }
    }

    pub fn set_all_collapsed(&mut self, collapsed: bool) {
        for group in self.nodes.iter_mut().skip(1) {
            group.collapsed = collapsed;
        }
    }

    /// Key path from the first level down to `id`; identifies a group across
    /// rebuilds.
    pub fn key_path(&self, id: GroupId) -> Vec<String> {
        let mut path: Vec<String> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|g| *g != Self::ROOT)
            .filter_map(|g| self.get(g).map(|g| g.key.clone()))
            .collect();
        path.reverse();
        path
    }

    /// Key paths of every collapsed group.
    pub fn collapsed_paths(&self) -> HashSet<Vec<String>> {
        self.nodes
            .iter()
            .filter(|g| g.collapsed)
            .map(|g| self.key_path(g.id))
            .collect()
    }

    /// Re-apply collapse state captured with [`collapsed_paths`](Self::collapsed_paths).
    pub fn restore_collapsed(&mut self, paths: &HashSet<Vec<String>>) {
        if paths.is_empty() {
            return;
        }
        let ids: Vec<GroupId> = self
            .nodes
            .iter()
            .skip(1)
            .filter(|g| paths.contains(&self.key_path(g.id)))
            .map(|g| g.id)
            .collect();
        for id in ids {
            self.set_collapsed(id, true);
        }
    }

    /// Compute every column aggregate for every group. Each group uses its
    /// own full row set, so order of evaluation does not matter.
    pub fn calculate(&mut self, data: &GridData) {
        let targets: Vec<&Column> = data
            .columns
            .iter()
            .filter(|c| c.calculate.is_some())
            .collect();
        for group in &mut self.nodes {
            group.aggregates.clear();
            for column in &targets {
                let Some(operator) = column.calculate else {
                    continue;
                };
                let values: Vec<Option<&CellValue>> = group
                    .rows
                    .iter()
                    .map(|&i| data.rows.get(i).and_then(|r| r.get(&column.id)))
                    .collect();
                if let Some(result) = calculate_by(&values, operator, &column.field) {
                    group.aggregates.insert(column.id.clone(), result);
                }
            }
        }
    }

    /// Groups ordered depth-first (parents before children), root first.
    pub fn preorder(&self) -> Vec<GroupId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::group::CalculateOperator;

    fn boolean_rows() -> Vec<Row> {
        (0..6)
            .map(|i| Row::new(i).with("done", i % 2 == 0).with("n", f64::from(i as u8)))
            .collect()
    }

    #[test]
    fn test_group_by_boolean_two_children() {
        let rows = boolean_rows();
        let column = Column::new("done", Field::checkbox("Done"));
        let order: Vec<usize> = (0..rows.len()).collect();
        let tree = GroupTree::build(
            &rows,
            &order,
            &[GroupLevel {
                column: &column,
                direction: SortDirection::Asc,
            }],
        );
        let root = tree.root().unwrap();
        assert_eq!(root.rows.len(), 6);
        assert_eq!(root.children.len(), 2);
        for &child in &root.children {
            let group = tree.get(child).unwrap();
            assert_eq!(group.rows.len(), 3);
            assert_eq!(group.depth, 1);
            assert!(group.is_leaf());
        }
        // false sorts before true
        let first = tree.get(root.children[0]).unwrap();
        assert_eq!(first.value, Some(CellValue::Boolean(false)));
        let second = tree.get(root.children[1]).unwrap();
        assert_eq!(second.previous, Some(first.id));
    }

    #[test]
    fn test_descending_group_order() {
        let rows = boolean_rows();
        let column = Column::new("done", Field::checkbox("Done"));
        let order: Vec<usize> = (0..rows.len()).collect();
        let tree = GroupTree::build(
            &rows,
            &order,
            &[GroupLevel {
                column: &column,
                direction: SortDirection::Desc,
            }],
        );
        let first = tree.get(tree.children(GroupTree::ROOT)[0]).unwrap();
        assert_eq!(first.value, Some(CellValue::Boolean(true)));
    }

    #[test]
    fn test_two_levels_union_invariant() {
        let rows: Vec<Row> = (0..12)
            .map(|i| {
                Row::new(i)
                    .with("a", if i < 6 { "x" } else { "y" })
                    .with("b", f64::from((i % 3) as u8))
            })
            .collect();
        let a = Column::new("a", Field::text("A"));
        let b = Column::new("b", Field::number("B"));
        let order: Vec<usize> = (0..rows.len()).collect();
        let tree = GroupTree::build(
            &rows,
            &order,
            &[
                GroupLevel { column: &a, direction: SortDirection::Asc },
                GroupLevel { column: &b, direction: SortDirection::Asc },
            ],
        );
        for group in tree.iter().filter(|g| !g.is_leaf()) {
            let mut union: Vec<usize> = group
                .children
                .iter()
                .flat_map(|c| tree.get(*c).unwrap().rows.clone())
                .collect();
            union.sort_unstable();
            let mut own = group.rows.clone();
            own.sort_unstable();
            assert_eq!(union, own);
        }
        assert_eq!(tree.leaves().len(), 6);
        assert_eq!(tree.flatten_rows().len(), 12);
        let leaf = tree.leaves()[0];
        assert_eq!(tree.ancestors(leaf).count(), 2);
        assert_eq!(tree.key_path(leaf), vec!["x".to_string(), "0".to_string()]);
    }

    #[test]
    fn test_collapse_survives_rebuild() {
        let rows = boolean_rows();
        let column = Column::new("done", Field::checkbox("Done"));
        let order: Vec<usize> = (0..rows.len()).collect();
        let levels = [GroupLevel {
            column: &column,
            direction: SortDirection::Asc,
        }];
        let mut tree = GroupTree::build(&rows, &order, &levels);
        let second = tree.children(GroupTree::ROOT)[1];
        assert!(tree.set_collapsed(second, true));
        assert!(!tree.set_collapsed(GroupTree::ROOT, true));

        let paths = tree.collapsed_paths();
        let mut rebuilt = GroupTree::build(&rows, &order, &levels);
        rebuilt.restore_collapsed(&paths);
        assert!(rebuilt.get(second).unwrap().collapsed);
    }

    #[test]
    fn test_group_aggregates_use_own_rows() {
        let rows = boolean_rows();
        let mut n = Column::new("n", Field::number("N"));
        n.calculate = Some(CalculateOperator::Sum);
        let done = Column::new("done", Field::checkbox("Done"));
        let data = GridData::new(rows.clone(), vec![done.clone(), n]);
        let order: Vec<usize> = (0..rows.len()).collect();
        let mut tree = GroupTree::build(
            &rows,
            &order,
            &[GroupLevel { column: &done, direction: SortDirection::Asc }],
        );
        tree.calculate(&data);
        let id = ColumnId::from("n");
        assert_eq!(tree.root().unwrap().aggregates[&id].display(), "15");
        // false group holds rows 1, 3, 5
        let first = tree.get(tree.children(GroupTree::ROOT)[0]).unwrap();
        assert_eq!(first.aggregates[&id].display(), "9");
    }
}
