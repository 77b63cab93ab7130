//! CLI tool for vgrid - loads a grid description and prints its groups and
//! the rows a viewport would render.
//!
//! Usage:
//!   vgrid_cli <grid.json>                     # Group tree and first window
//!   vgrid_cli <grid.json> --scroll 3200       # Window at a vertical offset
//!   vgrid_cli <grid.json> -o window.json      # Write the window as JSON
//!
//! The input file holds `{ "config": {...}, "columns": [...], "rows": [...] }`.
//! Set `RUST_LOG=vgrid=trace` to see culling and pipeline logs.

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Write};

use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use vgrid::{Column, GridConfig, GroupTree, GridView, GroupId, Row};

const VIEWPORT_WIDTH: f32 = 1280.0;
const VIEWPORT_HEIGHT: f32 = 720.0;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridFile {
    #[serde(default)]
    config: GridConfig,
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<Row>,
}

struct Args {
    input: String,
    scroll: f32,
    output: Option<String>,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let mut input = None;
    let mut scroll = 0.0;
    let mut output = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scroll" => {
                let value = args.next().ok_or("--scroll needs a pixel offset")?;
                scroll = value.parse()?;
            }
            "-o" => output = Some(args.next().ok_or("-o needs a file name")?),
            _ if input.is_none() => input = Some(arg),
            _ => return Err(format!("unexpected argument: {arg}").into()),
        }
    }
    let input = input.ok_or("Usage: vgrid_cli <grid.json> [--scroll px] [-o window.json]")?;
    Ok(Args {
        input,
        scroll,
        output,
    })
}

fn print_tree(out: &mut impl Write, tree: &GroupTree, id: GroupId) -> io::Result<()> {
    let Some(group) = tree.get(id) else {
        return Ok(());
    };
    if group.depth > 0 {
        let indent = "  ".repeat(group.depth - 1);
        let marker = if group.collapsed { "+" } else { "-" };
        write!(out, "{indent}{marker} {} ({} rows)", group.key, group.rows.len())?;
        let mut aggregates: Vec<_> = group.aggregates.iter().collect();
        aggregates.sort_by(|a, b| a.0 .0.cmp(&b.0 .0));
        for (column, value) in aggregates {
            write!(out, "  {}={value}", column.0)?;
        }
        writeln!(out)?;
    }
    for &child in tree.children(id) {
        print_tree(out, tree, child)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let text = fs::read_to_string(&args.input)
        .map_err(|e| format!("Error reading {}: {e}", args.input))?;
    let file: GridFile = serde_json::from_str(&text)?;
    file.config.validate()?;

    let mut view = GridView::with_data(
        file.config,
        file.columns,
        file.rows,
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
    )?;
    view.update();
    view.scroll_to(0.0, args.scroll);
    let window = view.update().clone();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let (width, height) = view.scroll().content_size();
    writeln!(
        out,
        "{} rows, {} columns, content {width}x{height}",
        view.data().display_row_count(),
        view.data().visible_column_count()
    )?;
    if let Some(root) = view.tree().root() {
        if !root.children.is_empty() {
            print_tree(&mut out, view.tree(), root.id)?;
        }
    }
    writeln!(
        out,
        "window at y={}: rows {:?}, frozen columns {:?}, columns {:?}, {} views",
        view.scroll().scroll_y(),
        window.rows.first().zip(window.rows.last()),
        window.columns.frozen,
        window.columns.scrollable,
        window.views.len()
    )?;

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&window)?;
        fs::write(&path, json).map_err(|e| format!("Error writing {path}: {e}"))?;
        eprintln!("Written: {path}");
    }
    Ok(())
}
