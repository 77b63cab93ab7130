//! Grouping, sorting and aggregate tests through the `GridView` facade.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_precision_loss
)]

use vgrid::group::CalculatedValue;
use vgrid::{
    CalculateOperator, CellValue, Column, ColumnId, Field, GridConfig, GridEvent, GridView,
    HitTarget, Row, RowId, SortDirection,
};

// ============================================================================
// Helpers
// ============================================================================

/// Six rows: `done` alternates true/false, `qty` is the row index.
fn grid() -> GridView {
    let columns = vec![
        Column::new("name", Field::text("Name")).with_width(200.0),
        Column::new("qty", Field::number("Qty")).with_width(120.0),
        Column::new("done", Field::checkbox("Done")).with_width(100.0),
    ];
    let rows = (0..6u64)
        .map(|i| {
            Row::new(i)
                .with("name", format!("item {}", 5 - i))
                .with("qty", i as f64)
                .with("done", i % 2 == 0)
        })
        .collect();
    GridView::with_data(GridConfig::default(), columns, rows, 600.0, 400.0).unwrap()
}

fn id(s: &str) -> ColumnId {
    ColumnId::from(s)
}

fn display_ids(view: &GridView) -> Vec<u64> {
    (0..view.data().display_row_count())
        .map(|r| view.data().row_at(r).unwrap().id.0)
        .collect()
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn test_boolean_grouping_splits_evenly() {
    let mut view = grid();
    assert!(view.group_column(&id("done"), Some(SortDirection::Asc)));
    view.update();

    let tree = view.tree();
    let root = tree.root().unwrap();
    assert_eq!(root.rows.len(), 6);
    assert_eq!(root.children.len(), 2);
    for child in &root.children {
        assert_eq!(tree.get(*child).unwrap().rows.len(), 3);
    }
    assert!(view.is_grouped());
}

#[test]
fn test_grouped_display_follows_tree() {
    let mut view = grid();
    view.group_column(&id("done"), Some(SortDirection::Desc));
    view.update();

    let tree = view.tree();
    let first = tree.get(tree.root().unwrap().children[0]).unwrap();
    assert_eq!(first.value, Some(CellValue::Boolean(true)));
    assert_eq!(display_ids(&view), vec![0, 2, 4, 1, 3, 5]);
}

#[test]
fn test_group_aggregates_per_group() {
    let mut view = grid();
    view.group_column(&id("done"), Some(SortDirection::Asc));
    assert!(view.calculate_column(&id("qty"), Some(CalculateOperator::Sum)));
    view.update();

    let tree = view.tree();
    let root = tree.root().unwrap();
    assert_eq!(
        root.aggregates.get(&id("qty")),
        Some(&CalculatedValue::Number(15.0))
    );
    let mut sums: Vec<String> = root
        .children
        .iter()
        .map(|c| tree.get(*c).unwrap().aggregates[&id("qty")].display())
        .collect();
    sums.sort();
    assert_eq!(sums, vec!["6".to_string(), "9".to_string()]);
}

#[test]
fn test_edit_updates_aggregate() {
    let mut view = grid();
    view.calculate_column(&id("qty"), Some(CalculateOperator::Max));
    view.update();
    let qty = 1;
    assert!(view
        .begin_edit(vgrid::CellIndex::new(0, qty))
        .unwrap());
    view.input("100").unwrap();
    assert!(view.commit_edit().unwrap());
    view.update();

    let root = view.tree().root().unwrap();
    assert_eq!(
        root.aggregates.get(&id("qty")),
        Some(&CalculatedValue::Number(100.0))
    );
}

#[test]
fn test_collapse_shrinks_content() {
    let mut view = grid();
    view.group_column(&id("done"), Some(SortDirection::Asc));
    view.update();
    let expanded = view.scroll().content_size().1;
    // Two leaves of header + 3 rows + spacing.
    assert_eq!(expanded, 2.0 * (40.0 + 3.0 * 32.0 + 20.0));

    let first = view.tree().root().unwrap().children[0];
    assert!(view.toggle_group(first));
    view.update();
    let collapsed = view.scroll().content_size().1;
    assert_eq!(collapsed, 40.0 + (40.0 + 3.0 * 32.0 + 20.0));

    view.expand_all();
    view.update();
    assert_eq!(view.scroll().content_size().1, expanded);
}

#[test]
fn test_collapse_survives_regroup_refresh() {
    let mut view = grid();
    view.group_column(&id("done"), Some(SortDirection::Asc));
    view.update();
    let first = view.tree().root().unwrap().children[0];
    let key = view.tree().get(first).unwrap().key.clone();
    view.toggle_group(first);

    // A sort change rebuilds the tree.
    view.sort_column(&id("qty"), Some(SortDirection::Desc));
    view.update();

    let tree = view.tree();
    let same = tree
        .root()
        .unwrap()
        .children
        .iter()
        .map(|c| tree.get(*c).unwrap())
        .find(|g| g.key == key)
        .unwrap();
    assert!(same.collapsed);
}

#[test]
fn test_group_header_hit_test() {
    let mut view = grid();
    view.group_column(&id("done"), Some(SortDirection::Asc));
    view.update();
    let first = view.tree().root().unwrap().children[0];

    assert_eq!(
        view.hit_test(50.0, 10.0),
        HitTarget::GroupHeader { group: first }
    );
    // First row sits right under the 40 px header.
    assert!(matches!(
        view.hit_test(50.0, 50.0),
        HitTarget::Cell { row: 0, col: 0 }
    ));
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_sort_cascade() {
    let mut view = grid();
    view.flush_events();
    view.sort_column(&id("done"), Some(SortDirection::Asc));
    view.sort_column(&id("qty"), Some(SortDirection::Desc));
    view.update();
    assert_eq!(display_ids(&view), vec![5, 3, 1, 4, 2, 0]);

    let events = view.flush_events();
    let GridEvent::ColumnSort(sorts) = &events[0] else {
        panic!("expected sort batch, got {events:?}");
    };
    assert_eq!(sorts.len(), 2);
}

#[test]
fn test_clearing_sort_restores_storage_order() {
    let mut view = grid();
    view.sort_column(&id("name"), Some(SortDirection::Asc));
    view.update();
    assert_eq!(display_ids(&view), vec![5, 4, 3, 2, 1, 0]);

    view.sort_column(&id("name"), None);
    view.update();
    assert_eq!(display_ids(&view), vec![0, 1, 2, 3, 4, 5]);
    assert!(view.sort_columns().is_empty());
}

#[test]
fn test_edit_on_sorted_column_reorders() {
    let mut view = grid();
    view.sort_column(&id("qty"), Some(SortDirection::Asc));
    view.update();
    view.begin_edit(vgrid::CellIndex::new(0, 1)).unwrap();
    view.input("10").unwrap();
    view.commit_edit().unwrap();
    view.update();

    let ids = display_ids(&view);
    assert_eq!(ids.last(), Some(&0));
    assert_eq!(view.data().display_position_of(RowId(0)), Some(5));
}
