mod app;
mod config;
mod input;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use rainfield::{color::shade_grid, field::generate, rainfall_table, RainfallArchive};
use std::{
    io::{self, Write},
    path::PathBuf,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "rainfield")]
#[command(about = "Character fluid animated by a year of monthly rainfall")]
struct Cli {
    /// Year to start on (snapped past 1940-1946)
    #[arg(long)]
    year: Option<i32>,

    /// JSON archive of monthly rainfall: {"1997": [12 values], ...}
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Field width in cells (0 fits the terminal)
    #[arg(long)]
    cols: Option<u16>,

    /// Field height in cells (0 fits the terminal)
    #[arg(long)]
    rows: Option<u16>,

    /// Frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Do not write tuned values back to settings.json on exit
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// Print a single frame's glyphs to stdout and exit
    #[arg(long, default_value_t = false)]
    dump: bool,

    /// Print the selected year's monthly table and statistics, then exit
    #[arg(long, default_value_t = false)]
    table: bool,

    /// Frame time in seconds used by --dump
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    time: f64,

    /// With --dump, emit 24-bit ANSI colour
    #[arg(long, default_value_t = false)]
    color: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let opts = app::Options {
        year: cli.year,
        archive: cli.archive.clone(),
        cols: cli.cols,
        rows: cli.rows,
        fps: cli.fps,
        save: !cli.no_save,
    };

    if cli.table {
        return table(&opts);
    }
    if cli.dump {
        return dump(&cli, &opts);
    }
    app::run(opts)
}

fn headless_archive(opts: &app::Options) -> Result<(config::Settings, RainfallArchive)> {
    let paths = config::project_paths()?;
    let settings = app::resolve_settings(&paths, opts);
    let archive = match &settings.archive_path {
        Some(p) => RainfallArchive::load(p)?,
        None => app::load_archive(&settings, &paths),
    };
    Ok((settings, archive))
}

/// Monthly table for one year, without opening the terminal UI.
fn table(opts: &app::Options) -> Result<()> {
    let (settings, archive) = headless_archive(opts)?;
    let year = settings.default_year;
    match rainfall_table(&archive, year) {
        Some(t) => print!("{t}"),
        None => println!("Year {year} not found in rainfall data."),
    }
    Ok(())
}

/// Headless single frame, for piping or quick checks.
fn dump(cli: &Cli, opts: &app::Options) -> Result<()> {
    let (settings, archive) = headless_archive(opts)?;
    let year = app::year_range(&archive, settings.default_year).snap(settings.default_year);

    let cols = if settings.cols == 0 { 100 } else { settings.cols as usize };
    let rows = if settings.rows == 0 { 36 } else { settings.rows as usize };
    let grid = generate(archive.series_for(year), cli.time, cols, rows, &settings.field);
    let shaded = shade_grid(&grid, cli.time, &settings.palette);

    let mut out = io::stdout().lock();
    for y in 0..shaded.rows {
        let mut line = String::with_capacity(cols * if cli.color { 20 } else { 1 });
        for c in shaded.row(y) {
            if cli.color {
                line.push_str(&format!("\x1b[38;2;{};{};{}m{}", c.rgb.r, c.rgb.g, c.rgb.b, c.glyph));
            } else {
                line.push(c.glyph);
            }
        }
        if cli.color {
            line.push_str("\x1b[0m");
        }
        writeln!(out, "{line}").context("writing frame")?;
    }
    Ok(())
}
