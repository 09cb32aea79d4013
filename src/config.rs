use anyhow::{Context, Result};
use chrono::Datelike;
use directories::ProjectDirs;
use rainfield::{FieldParams, PaletteParams};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    /// 0 fits the terminal width.
    pub(crate) cols: u16,
    /// 0 fits the terminal height minus the HUD.
    pub(crate) rows: u16,
    pub(crate) default_year: i32,
    pub(crate) archive_path: Option<PathBuf>,
    pub(crate) show_help: bool,
    pub(crate) field: FieldParams,
    pub(crate) palette: PaletteParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            cols: 0,
            rows: 0,
            default_year: chrono::Local::now().year(),
            archive_path: None,
            show_help: true,
            field: FieldParams::default(),
            palette: PaletteParams::default(),
        }
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) archive_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "rainfield", "Rainfield")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        archive_path: dir.join("archive.json"),
        log_path: dir.join("rainfield.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<Settings>(&s) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("ignoring unreadable {}: {e}", path.display());
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // rename-over-existing is not atomic on Windows
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).with_context(|| format!("replacing {}", to.display()))?;
    Ok(())
}

/// Log file next to the settings; the terminal itself belongs to the renderer.
pub(crate) fn init_logging(path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("installing logger")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let s = Settings::default();
        assert_eq!(s.fps_cap, 60);
        assert_eq!(s.field.speed_factor, 6.0);
        assert_eq!(s.field.base_time_scale, 20.0);
        assert_eq!(s.field.speed_multiplier, 3.5);
        assert_eq!(s.field.global_mean_cap, 300.0);
        assert_eq!(s.palette.top_whiten, 0.30);
        assert_eq!(s.palette.bottom_boost, 0.25);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{ "fps_cap": 30, "field": { "speed_factor": 2.0 } }"#).unwrap();
        assert_eq!(s.fps_cap, 30);
        assert_eq!(s.field.speed_factor, 2.0);
        assert_eq!(s.field.base_time_scale, 20.0);
        assert_eq!(s.palette, PaletteParams::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("rainfield-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");

        let mut s = Settings::default();
        s.default_year = 1997;
        s.palette.top_whiten = 0.55;
        save_settings_atomic(&path, &s).unwrap();
        save_settings_atomic(&path, &s).unwrap();
        assert_eq!(load_settings(&path), s);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("rainfield-does-not-exist.json");
        assert_eq!(load_settings(&path), Settings::default());
    }
}
