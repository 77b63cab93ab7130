//! Selection, clipboard, fill and edit tests through the `GridView` facade.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use vgrid::editor::clipboard::{parse_tsv, write_tsv, ClipboardSnapshot};
use vgrid::editor::ExcludeFilter;
use vgrid::{
    CellIndex, CellValue, Column, ColumnId, Field, GridConfig, GridError, GridEvent, GridView, Row,
    SelectionRange,
};

// ============================================================================
// Helpers
// ============================================================================

fn num_grid(values: &[Option<f64>]) -> GridView {
    let columns = vec![
        Column::new("num", Field::number("Num")).with_width(120.0),
        Column::new("label", Field::text("Label")).with_width(160.0),
    ];
    let rows = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let row = Row::new(i as u64 + 1).with("label", format!("row {}", i + 1));
            match v {
                Some(v) => row.with("num", *v),
                None => row,
            }
        })
        .collect();
    let mut view = GridView::with_data(GridConfig::default(), columns, rows, 800.0, 600.0).unwrap();
    view.update();
    view
}

fn num_at(view: &GridView, row: usize) -> Option<f64> {
    match view.data().value_at(CellIndex::new(row, 0)) {
        Some(CellValue::Number(n)) => Some(*n),
        _ => None,
    }
}

fn cell(row: usize, col: usize) -> CellIndex {
    CellIndex::new(row, col)
}

// ============================================================================
// Fill
// ============================================================================

#[test]
fn test_fill_single_value_repeats_down() {
    let mut view = num_grid(&[Some(10.0), None, None, None]);
    let source = SelectionRange::cell_range(cell(0, 0), cell(0, 0));
    let target = SelectionRange::cell_range(cell(1, 0), cell(3, 0));

    let summary = view
        .fill(&source, &target, false, ExcludeFilter::NONE)
        .unwrap();

    assert_eq!(summary.count, 3);
    assert_eq!(summary.total, 3);
    let filled: Vec<_> = (1..4).map(|r| num_at(&view, r)).collect();
    assert_eq!(filled, vec![Some(10.0), Some(10.0), Some(10.0)]);
}

#[test]
fn test_fill_two_points_extends_series() {
    let mut view = num_grid(&[Some(2.0), Some(4.0), None, None]);
    let source = SelectionRange::cell_range(cell(0, 0), cell(1, 0));
    let target = SelectionRange::cell_range(cell(2, 0), cell(3, 0));

    view.fill(&source, &target, false, ExcludeFilter::NONE)
        .unwrap();

    assert_eq!(num_at(&view, 2), Some(6.0));
    assert_eq!(num_at(&view, 3), Some(8.0));
}

#[test]
fn test_fill_emits_one_merged_event() {
    let mut view = num_grid(&[Some(1.0), None, None]);
    let source = SelectionRange::cell_range(cell(0, 0), cell(0, 0));
    let target = SelectionRange::cell_range(cell(1, 0), cell(2, 0));
    view.flush_events();
    view.fill(&source, &target, false, ExcludeFilter::NONE)
        .unwrap();

    let events = view.flush_events();
    assert_eq!(events.len(), 1);
    let GridEvent::CellFill(patches) = &events[0] else {
        panic!("expected a fill event, got {:?}", events[0]);
    };
    assert_eq!(patches.len(), 2);
}

// ============================================================================
// Clipboard
// ============================================================================

#[test]
fn test_paste_2x2_into_single_cell_grows_selection() {
    let mut view = num_grid(&[Some(1.0), Some(2.0), Some(3.0)]);
    view.select_cells(cell(0, 0), cell(0, 0), false).unwrap();

    let summary = view
        .paste_text("7\tseven\n8\teight", ExcludeFilter::NONE)
        .unwrap();

    let selection = *view.selection().unwrap();
    assert_eq!(selection.start, cell(0, 0));
    assert_eq!(selection.end, cell(1, 1));
    assert_eq!(summary.count, 4);
    assert_eq!(num_at(&view, 0), Some(7.0));
    assert_eq!(num_at(&view, 1), Some(8.0));
    assert_eq!(
        view.data().value_at(cell(1, 1)),
        Some(&CellValue::Text("eight".into()))
    );
    // Untouched row
    assert_eq!(num_at(&view, 2), Some(3.0));
}

#[test]
fn test_paste_past_last_column_fails_without_writing() {
    let mut view = num_grid(&[Some(1.0)]);
    view.select_cells(cell(0, 1), cell(0, 1), false).unwrap();

    let err = view.paste_text("a\tb", ExcludeFilter::NONE).unwrap_err();

    assert!(matches!(err, GridError::NonSequentialRange));
    assert!(err.is_structural());
    assert_eq!(
        view.data().value_at(cell(0, 1)),
        Some(&CellValue::Text("row 1".into()))
    );
}

#[test]
fn test_copy_with_empty_filter_counts_remaining_cells() {
    let mut view = num_grid(&[Some(10.0), None, Some(30.0), None, Some(50.0)]);
    view.select_cells(cell(0, 0), cell(4, 0), false).unwrap();

    let (text, summary) = view.copy(ExcludeFilter::EMPTY).unwrap();

    assert_eq!(summary.count, 3);
    assert_eq!(summary.total, 3);
    let parsed = parse_tsv(&text);
    assert_eq!(parsed.len(), 5);
    assert!(parsed[1][0].is_empty());
}

#[test]
fn test_copy_then_paste_moves_values() {
    let mut view = num_grid(&[Some(1.0), Some(2.0), None, None]);
    view.select_cells(cell(0, 0), cell(1, 0), false).unwrap();
    let (text, _) = view.copy(ExcludeFilter::NONE).unwrap();

    view.select_cells(cell(2, 0), cell(2, 0), false).unwrap();
    view.paste_text(&text, ExcludeFilter::NONE).unwrap();

    assert_eq!(num_at(&view, 2), Some(1.0));
    assert_eq!(num_at(&view, 3), Some(2.0));
}

#[test]
fn test_tsv_round_trip_keeps_shape() {
    let rows = vec![
        vec!["plain".to_string(), "with\ttab".to_string(), String::new()],
        vec![
            "multi\nline".to_string(),
            "say \"hi\"".to_string(),
            "last".to_string(),
        ],
    ];

    let text = write_tsv(&rows);
    let snapshot = ClipboardSnapshot::from_text(&text);

    assert_eq!(snapshot.row_count, 2);
    assert_eq!(snapshot.column_count, 3);
    assert_eq!(parse_tsv(&text), rows);
    assert_eq!(snapshot.to_text(), text);
}

#[test]
fn test_clear_reports_partial_summary() {
    let columns = vec![
        Column::new("a", Field::text("A").required(true)),
        Column::new("b", Field::text("B")),
    ];
    let rows = vec![Row::new(1).with("a", "keep").with("b", "drop")];
    let mut view = GridView::with_data(GridConfig::default(), columns, rows, 800.0, 600.0).unwrap();
    view.update();
    view.select_cells(cell(0, 0), cell(0, 1), false).unwrap();

    let summary = view.clear(ExcludeFilter::NONE).unwrap();

    assert!(summary.is_partial());
    assert_eq!(summary.count, 1);
    assert_eq!(view.data().value_at(cell(0, 1)), None);
    assert_eq!(
        view.data().value_at(cell(0, 0)),
        Some(&CellValue::Text("keep".into()))
    );
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_selection_is_symmetric() {
    let mut view = num_grid(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    let forward = view
        .select_cells(cell(3, 0), cell(1, 1), false)
        .unwrap()
        .unwrap();
    let backward = view
        .select_cells(cell(1, 1), cell(3, 0), false)
        .unwrap()
        .unwrap();

    assert_eq!(forward.start, backward.start);
    assert_eq!(forward.end, backward.end);
    assert_eq!(forward.start, cell(1, 0));
    assert_eq!(forward.end, cell(3, 1));
}

#[test]
fn test_selection_clamped_to_grid() {
    let mut view = num_grid(&[Some(1.0), Some(2.0)]);
    let range = view
        .select_cells(cell(0, 0), cell(99, 99), false)
        .unwrap()
        .unwrap();
    assert_eq!(range.end, cell(1, 1));
}

// ============================================================================
// Pending edits
// ============================================================================

#[test]
fn test_invalid_edit_blocks_selection_move() {
    let columns = vec![
        Column::new("name", Field::text("Name").required(true)),
        Column::new("note", Field::text("Note")),
    ];
    let rows = vec![Row::new(1).with("name", "a"), Row::new(2).with("name", "b")];
    let mut view = GridView::with_data(GridConfig::default(), columns, rows, 800.0, 600.0).unwrap();
    view.update();
    view.select_cells(cell(0, 0), cell(0, 0), false).unwrap();

    assert!(view.begin_edit(cell(0, 0)).unwrap());
    let errors = view.input("").unwrap();
    assert!(errors.is_some());

    let blocked = view.select_cells(cell(1, 0), cell(1, 0), false);
    assert!(matches!(blocked, Err(GridError::Validation(_))));
    assert_eq!(view.selection().unwrap().primary, cell(0, 0));

    view.cancel_edit().unwrap();
    assert_eq!(
        view.data().value_at(cell(0, 0)),
        Some(&CellValue::Text("a".into()))
    );
    assert!(view.select_cells(cell(1, 0), cell(1, 0), false).is_ok());
}

#[test]
fn test_invalid_pending_edit_leaves_data_alone() {
    let mut view = num_grid(&[Some(1.0), Some(2.0)]);
    view.flush_events();
    assert!(view.begin_edit(cell(0, 0)).unwrap());
    assert!(view.input("abc").unwrap().is_some());

    let matrix = view.get_cells(cell(0, 0), cell(1, 0), ExcludeFilter::NONE);
    assert_eq!(matrix.get(0, 0).unwrap().value, Some(CellValue::Number(1.0)));
    assert_eq!(
        view.display_value(cell(0, 0)),
        Some(&CellValue::Text("abc".into()))
    );

    assert!(matches!(view.commit_edit(), Err(GridError::Validation(_))));
    assert_eq!(view.data().value_at(cell(0, 0)), Some(&CellValue::Number(1.0)));
    view.cancel_edit().unwrap();
    assert_eq!(view.display_value(cell(0, 0)), Some(&CellValue::Number(1.0)));
    assert!(view.flush_events().is_empty());
}

#[test]
fn test_commit_emits_row_patch() {
    let mut view = num_grid(&[Some(1.0), Some(2.0)]);
    view.flush_events();
    assert!(view.begin_edit(cell(1, 0)).unwrap());
    assert!(view.input("42").unwrap().is_none());
    assert!(view.commit_edit().unwrap());

    let events = view.flush_events();
    let patch = events
        .iter()
        .find_map(|e| match e {
            GridEvent::CellEdit(patches) => patches.first().cloned(),
            _ => None,
        })
        .expect("cell edit event");
    assert_eq!(patch.row.0, 2);
    assert_eq!(
        patch.values.get(&ColumnId::from("num")),
        Some(&Some(CellValue::Number(42.0)))
    );
}

#[test]
fn test_replayed_events_match_grid_state() {
    let mut view = num_grid(&[Some(1.0)]);
    view.flush_events();
    let label = cell(0, 1);

    view.begin_edit(label).unwrap();
    view.input("one").unwrap();
    view.commit_edit().unwrap();
    view.select_cells(label, label, false).unwrap();
    view.paste_text("two", ExcludeFilter::NONE).unwrap();
    view.begin_edit(label).unwrap();
    view.input("three").unwrap();
    view.commit_edit().unwrap();

    let mut replayed = None;
    for event in view.flush_events() {
        let patches = match &event {
            GridEvent::CellEdit(p) | GridEvent::CellPaste(p) => p,
            _ => continue,
        };
        for patch in patches {
            if let Some(value) = patch.values.get(&ColumnId::from("label")) {
                replayed = value.clone();
            }
        }
    }
    assert_eq!(replayed, Some(CellValue::Text("three".into())));
    assert_eq!(view.data().value_at(label), replayed.as_ref());
}
