//! Rainfall-driven character field.
//!
//! [`field::generate`] turns a year of monthly rainfall into a grid of
//! glyphs with a density in [0,1]; [`color`] turns each density into the
//! colour it is drawn with. Both are pure functions of their arguments.

pub mod archive;
pub mod color;
pub mod field;
pub mod years;

pub use archive::{rainfall_table, MonthStats, RainfallArchive, DEFAULT_SERIES};
pub use color::{base_color, final_color, shade_grid, twinkle, PaletteParams, Rgb, ShadedGrid};
pub use field::{generate, DensityGrid, FieldCell, FieldParams};
pub use years::YearRange;
