//! Benchmarks for viewport culling and the per-frame update path.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vgrid::layout::{cull_columns, cull_rows, ColumnLayout, Viewport};
use vgrid::{Column, Field, GridConfig, GridView, Row, SortDirection};

const ROW_HEIGHT: f32 = 32.0;

fn columns(count: usize) -> Vec<Column> {
    (0..count)
        .map(|i| {
            let field = match i % 3 {
                0 => Field::text(format!("Text {i}")),
                1 => Field::number(format!("Number {i}")),
                _ => Field::checkbox(format!("Flag {i}")),
            };
            Column::new(format!("c{i}"), field).with_width(120.0)
        })
        .collect()
}

fn rows(count: usize, columns: usize) -> Vec<Row> {
    (0..count as u64)
        .map(|id| {
            (0..columns).fold(Row::new(id), |row, c| match c % 3 {
                0 => row.with(format!("c{c}"), format!("row {id}")),
                1 => row.with(format!("c{c}"), (id % 97) as f64),
                _ => row.with(format!("c{c}"), id % 2 == 0),
            })
        })
        .collect()
}

fn grid(rows_count: usize) -> GridView {
    let mut view = GridView::with_data(
        GridConfig::default(),
        columns(12),
        rows(rows_count, 12),
        1280.0,
        720.0,
    )
    .expect("grid");
    view.update();
    view
}

/// Row range lookup at the middle of a 50k-row grid
fn bench_cull_rows(c: &mut Criterion) {
    let count = 50_000;
    let start = (count / 2) as f32 * ROW_HEIGHT;
    c.bench_function("cull_rows_50k", |b| {
        b.iter(|| {
            cull_rows(
                black_box(count),
                ROW_HEIGHT,
                black_box(start),
                start + 720.0,
                4,
            )
        })
    });
}

/// Binary search over a wide column layout
fn bench_cull_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("cull_columns");
    for count in [50usize, 500, 5_000] {
        let widths = vec![120.0; count];
        let layout = ColumnLayout::compute(&widths, 2, 0.0);
        let mut viewport = Viewport::new(1280.0, 720.0);
        viewport.scroll_x = layout.total_width() / 2.0;
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &layout, |b, layout| {
            b.iter(|| cull_columns(black_box(layout), black_box(&viewport)))
        });
    }
    group.finish();
}

/// One scroll step plus the window rebuild a frame would do
fn bench_scroll_frame(c: &mut Criterion) {
    let mut view = grid(50_000);
    let mut offset = 0.0f32;
    c.bench_function("scroll_frame_50k", |b| {
        b.iter(|| {
            offset = (offset + 48.0) % 1_000_000.0;
            view.scroll_to(0.0, offset);
            black_box(view.update().views.len())
        })
    });
}

/// Sort and regroup through the full pipeline
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    for count in [1_000usize, 10_000, 50_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sort", count), &count, |b, &count| {
            let mut view = grid(count);
            let mut desc = false;
            b.iter(|| {
                desc = !desc;
                let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
                view.sort_column(&"c1".into(), Some(direction));
                black_box(view.update().rows.len())
            })
        });
        group.bench_with_input(BenchmarkId::new("group", count), &count, |b, &count| {
            let mut view = grid(count);
            let mut on = false;
            b.iter(|| {
                on = !on;
                view.group_column(&"c2".into(), on.then_some(SortDirection::Asc));
                black_box(view.update().groups.len())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cull_rows,
    bench_cull_columns,
    bench_scroll_frame,
    bench_pipeline,
);

criterion_main!(benches);
