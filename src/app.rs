//! Render loop: one-shot dashboard and the interactive category prompt

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::cli::{parse_selection, Selection};
use crate::filter::CategoryFilter;
use crate::report::{render_dashboard, ReportOptions};
use crate::session::Session;
use crate::viz::render_charts;

/// Filter, summarise, draw and print one dashboard
pub fn render_view<W: Write>(
    session: &Session,
    filter: &CategoryFilter,
    output_dir: &Path,
    options: &ReportOptions,
    out: &mut W,
) -> crate::Result<()> {
    let start_time = Instant::now();

    let view = session.view(filter)?;
    let charts = render_charts(&view, output_dir)?;
    render_dashboard(out, &view, &charts, options)?;

    info!(
        category = %filter,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "dashboard rendered"
    );
    Ok(())
}

/// Prompt for categories until `q` or end of input, re-rendering each time.
///
/// Starts with the "all" view. Returns the number of dashboards rendered.
pub fn run_interactive<R: BufRead, W: Write>(
    session: &Session,
    mut input: R,
    out: &mut W,
    output_dir: &Path,
    options: &ReportOptions,
) -> crate::Result<usize> {
    let categories = session.table().categories()?;
    let mut filter = CategoryFilter::All;
    let mut rendered = 0;

    loop {
        render_view(session, &filter, output_dir, options, out)?;
        rendered += 1;

        writeln!(out)?;
        writeln!(out, "Select a category:")?;
        writeln!(out, "  0) all")?;
        for (i, category) in categories.iter().enumerate() {
            writeln!(out, "  {}) {}", i + 1, category)?;
        }

        filter = loop {
            write!(out, "category> ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(rendered);
            }

            match parse_selection(&line, &categories) {
                Selection::Select(filter) => break filter,
                Selection::Quit => return Ok(rendered),
                Selection::Unknown(text) => {
                    warn!(input = %text, "unknown category selection");
                    writeln!(out, "Unknown category '{}'", text)?;
                }
            }
        };
        writeln!(out)?;
    }
}
