//! Plain-text rendering of a table head for the terminal.

use fundalign_core::Table;
use fundalign_runner::DisplayOptions;

const MAX_CELL_WIDTH: usize = 14;

/// Render at most `opts.max_rows` rows and `opts.max_columns` columns of
/// `table`, with a trailing line saying what was cut.
pub fn render(table: &Table, opts: &DisplayOptions) -> String {
    let ncols = table.width().min(opts.max_columns);
    let nrows = table.height().min(opts.max_rows);

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(nrows + 1);
    grid.push(table.columns()[..ncols].iter().map(|c| clip(c)).collect());
    for row in &table.rows()[..nrows] {
        grid.push(row[..ncols].iter().map(|v| clip(&v.to_string())).collect());
    }

    let widths: Vec<usize> = (0..ncols)
        .map(|c| grid.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
        if i == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            out.push_str(&rule.join("  "));
            out.push('\n');
        }
    }

    let hidden_rows = table.height() - nrows;
    let hidden_cols = table.width() - ncols;
    if hidden_rows > 0 || hidden_cols > 0 {
        out.push_str(&format!(
            "[{} rows x {} columns, {hidden_rows} rows and {hidden_cols} columns not shown]\n",
            table.height(),
            table.width()
        ));
    }
    out
}

fn clip(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let head: String = s.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{head}~")
    }
}
