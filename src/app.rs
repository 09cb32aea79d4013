use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event_to_action, Action, Tune};
use crate::render::{draw_center_box, draw_chart, draw_field, hud, Hud, Terminal, HUD_ROWS};
use anyhow::Result;
use rainfield::{
    archive::{month_level, RainfallArchive, MONTHS},
    color::shade_grid,
    field::generate,
    years::{YearRange, FIRST_RECORD_YEAR},
    FieldParams, PaletteParams,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Seconds of running time each month stays highlighted.
const MONTH_STEP: f64 = 0.8;
const WHITEN_MAX: f64 = 2.5;

const HELP: &str = "Space  start / stop\n\
R      restart from t=0 and reload the archive\n\
[ ]    previous / next year\n\
{ }    ten years back / forward\n\n\
Up/Down      speed factor x1.2 / x0.8\n\
Right/Left   base time scale x1.2 / x0.8\n\
W/S          top whiten +/-0.05\n\
E/D          bottom boost +/-0.05\n\n\
C shows the year's monthly bar chart.\n\
H toggles this help, Q or Esc quits.";

/// Live copy of the tunables owned by the harness; the field and colour
/// functions only ever see a snapshot of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TuningSession {
    pub(crate) field: FieldParams,
    pub(crate) palette: PaletteParams,
}

impl TuningSession {
    pub(crate) fn apply(&mut self, tune: Tune) {
        match tune {
            Tune::SpeedFactor(k) => {
                self.field.speed_factor *= k;
                log::info!("speed_factor = {:.2}", self.field.speed_factor);
            }
            Tune::BaseTimeScale(k) => {
                self.field.base_time_scale *= k;
                log::info!("base_time_scale = {:.2}", self.field.base_time_scale);
            }
            Tune::TopWhiten(d) => {
                self.palette.top_whiten = (self.palette.top_whiten + d).clamp(0.0, WHITEN_MAX);
                log::info!("top_whiten = {:.3}", self.palette.top_whiten);
            }
            Tune::BottomBoost(d) => {
                self.palette.bottom_boost = (self.palette.bottom_boost + d).clamp(0.0, WHITEN_MAX);
                log::info!("bottom_boost = {:.3}", self.palette.bottom_boost);
            }
        }
    }

    fn summary(&self) -> String {
        format!(
            "speed {:.2} base {:.1} top {:.2} bottom {:.2}",
            self.field.speed_factor,
            self.field.base_time_scale,
            self.palette.top_whiten,
            self.palette.bottom_boost
        )
    }
}

/// Animation clock plus the month cursor that walks through the year.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Playback {
    pub(crate) running: bool,
    pub(crate) frame_time: f64,
    pub(crate) month: usize,
    month_acc: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            running: true,
            frame_time: 0.0,
            month: 0,
            month_acc: 0.0,
        }
    }
}

impl Playback {
    pub(crate) fn advance(&mut self, dt: f64) {
        if !self.running || dt <= 0.0 {
            return;
        }
        self.frame_time += dt;
        self.month_acc += dt;
        while self.month_acc >= MONTH_STEP {
            self.month_acc -= MONTH_STEP;
            self.month = (self.month + 1) % MONTHS.len();
        }
    }

    pub(crate) fn restart(&mut self) {
        let running = self.running;
        *self = Self {
            running,
            ..Self::default()
        };
    }
}

/// Value and level of the highlighted month; short series fall back to
/// their mean.
pub(crate) fn month_readout(archive: &RainfallArchive, year: i32, month: usize) -> (f64, f64) {
    let series = archive.series_for(year);
    let value = if series.len() >= MONTHS.len() {
        series[month % MONTHS.len()]
    } else {
        series.iter().sum::<f64>() / series.len().max(1) as f64
    };
    (value, month_level(value, archive.month_range(year)))
}

pub(crate) struct Options {
    pub(crate) year: Option<i32>,
    pub(crate) archive: Option<PathBuf>,
    pub(crate) cols: Option<u16>,
    pub(crate) rows: Option<u16>,
    pub(crate) fps: Option<u32>,
    pub(crate) save: bool,
}

pub(crate) fn resolve_settings(paths: &Paths, opts: &Options) -> Settings {
    let mut settings = load_settings(&paths.settings_path);
    if let Some(p) = &opts.archive {
        settings.archive_path = Some(p.clone());
    }
    if let Some(c) = opts.cols {
        settings.cols = c;
    }
    if let Some(r) = opts.rows {
        settings.rows = r;
    }
    if let Some(f) = opts.fps {
        settings.fps_cap = f;
    }
    if let Some(y) = opts.year {
        settings.default_year = y;
    }
    settings
}

fn archive_source(settings: &Settings, paths: &Paths) -> Option<PathBuf> {
    settings
        .archive_path
        .clone()
        .or_else(|| paths.archive_path.exists().then(|| paths.archive_path.clone()))
}

/// Archive from the configured file, the default location, or the
/// built-in series, in that order.
pub(crate) fn load_archive(settings: &Settings, paths: &Paths) -> RainfallArchive {
    if let Some(path) = archive_source(settings, paths) {
        match RainfallArchive::load(&path) {
            Ok(a) if !a.is_empty() => return a,
            Ok(_) => log::warn!("{} holds no years; using built-in data", path.display()),
            Err(e) => log::warn!("{e:#}; using built-in data"),
        }
    }
    RainfallArchive::builtin(settings.default_year)
}

/// Fresh copy of the archive file for a reload. `None` means the caller
/// keeps what it already has.
pub(crate) fn reload_archive(settings: &Settings, paths: &Paths) -> Option<RainfallArchive> {
    let Some(path) = archive_source(settings, paths) else {
        log::info!("no archive file to reload; keeping the current data");
        return None;
    };
    match RainfallArchive::load(&path) {
        Ok(a) if !a.is_empty() => Some(a),
        Ok(_) => {
            log::warn!("{} holds no years; keeping the current archive", path.display());
            None
        }
        Err(e) => {
            log::warn!("{e:#}; keeping the current archive");
            None
        }
    }
}

pub(crate) fn year_range(archive: &RainfallArchive, fallback_year: i32) -> YearRange {
    match archive.year_bounds() {
        Some((lo, hi)) => YearRange::new(lo, hi),
        None => YearRange::new(FIRST_RECORD_YEAR, fallback_year),
    }
}

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    save_on_exit: bool,
    archive: RainfallArchive,
    years: YearRange,
    year: i32,
    tuning: TuningSession,
    playback: Playback,
    show_help: bool,
    show_chart: bool,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init(opts: Options) -> Result<Self> {
        let paths = project_paths()?;
        if let Err(e) = crate::config::init_logging(&paths.log_path) {
            eprintln!("Warning: {e:#}; continuing without a log file");
        }
        let settings = resolve_settings(&paths, &opts);
        let archive = load_archive(&settings, &paths);
        let years = year_range(&archive, settings.default_year);
        let year = years.snap(settings.default_year);
        log::info!(
            "starting at {year}, archive {}..={} ({} years)",
            years.min,
            years.max,
            archive.len()
        );

        let tuning = TuningSession {
            field: settings.field,
            palette: settings.palette,
        };
        let show_help = settings.show_help;

        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            paths,
            save_on_exit: opts.save,
            archive,
            years,
            year,
            tuning,
            playback: Playback::default(),
            show_help,
            show_chart: false,
            term,
            should_quit: false,
        })
    }

    fn run(&mut self) -> Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let mut last_frame = Instant::now();

        while !self.should_quit {
            self.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event_to_action(ev) {
                    self.handle(action);
                }
                if self.should_quit {
                    break;
                }
            }

            let now = Instant::now();
            let dt = now.saturating_duration_since(last_frame).as_secs_f64();
            last_frame = now;
            self.playback.advance(dt);

            self.render_frame()?;

            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }

    fn handle(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::TogglePlayback => {
                self.playback.running = !self.playback.running;
                log::info!(
                    "animation {}",
                    if self.playback.running { "started" } else { "stopped" }
                );
            }
            Action::Reload => self.reload(),
            Action::Year(delta) => {
                self.year = self.years.step(self.year, delta);
                log::debug!("year {}", self.year);
            }
            Action::Tune(t) => self.tuning.apply(t),
            Action::HelpToggle => self.show_help = !self.show_help,
            Action::ChartToggle => self.show_chart = !self.show_chart,
            Action::Resized => {}
        }
    }

    fn reload(&mut self) {
        self.playback.restart();
        if let Some(archive) = reload_archive(&self.settings, &self.paths) {
            self.years = year_range(&archive, self.settings.default_year);
            self.year = self.years.snap(self.year);
            self.archive = archive;
            log::info!("archive reloaded ({} years)", self.archive.len());
        }
        log::info!("animation reset");
    }

    fn field_size(&self) -> (usize, usize) {
        let avail_w = self.term.cols;
        let avail_h = self.term.rows.saturating_sub(HUD_ROWS);
        let w = if self.settings.cols == 0 {
            avail_w
        } else {
            self.settings.cols.min(avail_w)
        };
        let h = if self.settings.rows == 0 {
            avail_h
        } else {
            self.settings.rows.min(avail_h)
        };
        (w as usize, h as usize)
    }

    fn render_frame(&mut self) -> Result<()> {
        self.term.cur.clear();

        let (cols, rows) = self.field_size();
        if cols > 0 && rows > 0 {
            let t = self.playback.frame_time;
            let data = self.archive.series_for(self.year);
            let grid = generate(data, t, cols, rows, &self.tuning.field);
            let shaded = shade_grid(&grid, t, &self.tuning.palette);

            let x0 = (self.term.cols as usize - cols) / 2;
            let y0 = (self.term.rows.saturating_sub(HUD_ROWS) as usize - rows) / 2;
            draw_field(&mut self.term.cur, &shaded, x0 as u16, y0 as u16);
        }

        let (month_value, level) = month_readout(&self.archive, self.year, self.playback.month);
        hud(
            &mut self.term.cur,
            &Hud {
                year: self.year,
                first_year: self.years.min,
                last_year: self.years.max,
                year_fraction: self.years.fraction(self.year),
                has_record: self.archive.contains(self.year),
                running: self.playback.running,
                month: MONTHS[self.playback.month],
                month_value,
                month_level: level,
                tuning: self.tuning.summary(),
            },
        );

        if self.show_chart {
            draw_chart(
                &mut self.term.cur,
                self.year,
                self.archive.series_for(self.year),
                self.archive.contains(self.year),
            );
        }

        if self.show_help {
            draw_center_box(&mut self.term.cur, "Rainfield", HELP);
        }

        self.term.present()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.term.end()?;
        if self.save_on_exit {
            self.settings.field = self.tuning.field;
            self.settings.palette = self.tuning.palette;
            self.settings.default_year = self.year;
            self.settings.show_help = self.show_help;
            save_settings_atomic(&self.paths.settings_path, &self.settings)?;
            log::info!("settings saved to {}", self.paths.settings_path.display());
        }
        Ok(())
    }
}

pub(crate) fn run(opts: Options) -> Result<()> {
    let mut app = App::init(opts)?;
    let res = app.run();
    // restore the terminal even when the loop failed
    let end = app.shutdown();
    res.and(end)
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> TuningSession {
        TuningSession {
            field: FieldParams::default(),
            palette: PaletteParams::default(),
        }
    }

    #[test]
    fn test_speed_tuning_scales() {
        let mut s = session();
        s.apply(Tune::SpeedFactor(1.2));
        assert!((s.field.speed_factor - 7.2).abs() < 1e-9);
        s.apply(Tune::BaseTimeScale(0.8));
        assert!((s.field.base_time_scale - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_whiten_tuning_is_bounded() {
        let mut s = session();
        for _ in 0..100 {
            s.apply(Tune::TopWhiten(0.05));
            s.apply(Tune::BottomBoost(-0.05));
        }
        assert_eq!(s.palette.top_whiten, WHITEN_MAX);
        assert_eq!(s.palette.bottom_boost, 0.0);
    }

    #[test]
    fn test_tuning_leaves_other_fields() {
        let mut s = session();
        s.apply(Tune::TopWhiten(0.05));
        assert_eq!(s.field, FieldParams::default());
        assert_eq!(s.palette.bottom_boost, 0.25);
    }

    #[test]
    fn test_stopped_playback_freezes() {
        let mut p = Playback::default();
        p.advance(0.5);
        p.running = false;
        p.advance(3.0);
        assert_eq!(p.frame_time, 0.5);
        assert_eq!(p.month, 0);
    }

    #[test]
    fn test_month_cursor_wraps() {
        let mut p = Playback::default();
        for _ in 0..13 {
            p.advance(0.81);
        }
        assert_eq!(p.month, 1);
    }

    #[test]
    fn test_restart_keeps_run_state() {
        let mut p = Playback::default();
        p.advance(2.0);
        p.running = false;
        p.restart();
        assert_eq!(p.frame_time, 0.0);
        assert_eq!(p.month, 0);
        assert!(!p.running);
    }

    #[test]
    fn test_month_readout_short_series_uses_mean() {
        let mut a = RainfallArchive::new();
        a.insert(2000, vec![2.0, 4.0]);
        let (v, _) = month_readout(&a, 2000, 5);
        assert_eq!(v, 3.0);
    }

    #[test]
    fn test_month_readout_full_year() {
        let a = RainfallArchive::builtin(2025);
        let (v, lvl) = month_readout(&a, 2025, 6);
        assert_eq!(v, 298.5);
        assert!((lvl - 1.0).abs() < 1e-12);
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rainfield-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn paths_in(dir: &std::path::Path) -> Paths {
        Paths {
            settings_path: dir.join("settings.json"),
            archive_path: dir.join("archive.json"),
            log_path: dir.join("rainfield.log"),
        }
    }

    #[test]
    fn test_failed_reload_keeps_current_archive() {
        let dir = scratch_dir("reload");
        let file = dir.join("rain.json");
        std::fs::write(&file, r#"{ "1990": [1, 2, 3], "2000": [4, 5, 6] }"#).unwrap();
        let settings = Settings {
            archive_path: Some(file.clone()),
            ..Settings::default()
        };
        let paths = paths_in(&dir);

        let first = load_archive(&settings, &paths);
        assert_eq!(first.year_bounds(), Some((1990, 2000)));

        std::fs::write(&file, "{ not json").unwrap();
        assert_eq!(reload_archive(&settings, &paths), None);

        std::fs::write(&file, "{}").unwrap();
        assert_eq!(reload_archive(&settings, &paths), None);

        std::fs::write(&file, r#"{ "1985": [7] }"#).unwrap();
        let fresh = reload_archive(&settings, &paths).unwrap();
        assert_eq!(fresh.year_bounds(), Some((1985, 1985)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_reload_without_file_keeps_current() {
        let dir = scratch_dir("nofile");
        let settings = Settings {
            archive_path: None,
            ..Settings::default()
        };
        assert_eq!(reload_archive(&settings, &paths_in(&dir)), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_year_range_fallback() {
        let empty = RainfallArchive::new();
        assert_eq!(year_range(&empty, 2025), YearRange::new(1884, 2025));
        let one = RainfallArchive::builtin(1990);
        assert_eq!(year_range(&one, 2025), YearRange::new(1990, 1990));
    }
}
