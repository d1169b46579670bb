use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plotters::prelude::*;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::statistics::{Data, Median};
use tracing::info;

use crate::data_handling::{CLASS, DELTA};
use crate::error::{AnalyzerError, Result};
use crate::models::{FUNC_INT, LOF};

/// Rows of the plot, top to bottom, with their point colours.
const CLASS_ROWS: [(&str, RGBColor); 2] = [
    (FUNC_INT, RGBColor(0x77, 0x77, 0x77)),
    (LOF, RGBColor(0xd6, 0x27, 0x28)),
];
const JITTER: f64 = 0.3;
const JITTER_SEED: u64 = 42;

fn plot_err(e: impl std::fmt::Display) -> AnalyzerError {
    AnalyzerError::Plot(e.to_string())
}

/// Delta scores grouped by class in plotting order; classes absent from `df` yield empty groups.
pub fn deltas_by_class(df: &DataFrame) -> Result<Vec<(&'static str, Vec<f64>)>> {
    let classes = df.column(CLASS)?.str()?;
    let deltas = df.column(DELTA)?.f64()?;

    let mut groups: Vec<(&'static str, Vec<f64>)> =
        CLASS_ROWS.iter().map(|(c, _)| (*c, Vec::new())).collect();
    for (class, delta) in classes.into_iter().zip(deltas.into_iter()) {
        let (Some(class), Some(delta)) = (class, delta) else {
            continue;
        };
        if let Some((_, values)) = groups.iter_mut().find(|(c, _)| *c == class) {
            values.push(delta);
        }
    }
    Ok(groups)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Uniform offsets in `[-JITTER, JITTER)`, reproducible for a given seed.
fn jitter(n: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-JITTER..JITTER)).collect()
}

/// Padded x-range covering every value, or a unit range around zero when empty.
fn x_range(groups: &[(&str, Vec<f64>)]) -> (f64, f64) {
    let (lo, hi) = groups
        .iter()
        .flat_map(|(_, v)| v.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1e-3 };
    (lo - pad, hi + pad)
}

/// Draws one jittered row of points per class with a median tick, as PNG.
pub fn render_strip_plot(groups: &[(&str, Vec<f64>)], output_path: &Path) -> Result<()> {
    let (x_lo, x_hi) = x_range(groups);
    let n_rows = groups.len() as f64;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_lo..x_hi, -0.5..(n_rows - 0.5))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(groups.len())
        .y_label_formatter(&|y: &f64| {
            let level = y.round();
            if (y - level).abs() < 1e-6 && (0.0..n_rows).contains(&level) {
                let row = (n_rows - 1.0 - level) as usize;
                groups.get(row).map_or(String::new(), |(c, _)| c.to_string())
            } else {
                String::new()
            }
        })
        .x_desc("Delta likelihood score, Evo 2")
        .y_desc("BRCA1 SNV class")
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(plot_err)?;

    let mut rng = StdRng::seed_from_u64(JITTER_SEED);
    for (row, (class, values)) in groups.iter().enumerate() {
        let color = CLASS_ROWS
            .iter()
            .find(|(c, _)| c == class)
            .map_or(BLACK, |(_, color)| *color);
        // first group on top
        let y = n_rows - 1.0 - row as f64;

        let offsets = jitter(values.len(), &mut rng);
        chart
            .draw_series(
                values
                    .iter()
                    .zip(offsets)
                    .map(|(&x, dy)| Circle::new((x, y + dy), 3, color.mix(0.8).filled())),
            )
            .map_err(plot_err)?;

        if let Some(m) = median(values) {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(m, y - 0.4), (m, y + 0.4)],
                    BLACK.stroke_width(2),
                )))
                .map_err(plot_err)?;
        }
    }

    root.present().map_err(plot_err)?;
    info!("Saved plot to {}", output_path.display());
    Ok(())
}

/// Renders the plot and returns the PNG as base64.
///
/// With no `output_path` the image goes to a temporary file that is removed afterwards.
pub fn strip_plot_base64(groups: &[(&str, Vec<f64>)], output_path: Option<&Path>) -> Result<String> {
    match output_path {
        Some(path) => {
            render_strip_plot(groups, path)?;
            encode_png(path)
        }
        None => {
            let tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
            render_strip_plot(groups, tmp.path())?;
            encode_png(tmp.path())
        }
    }
}

pub fn encode_png(path: &Path) -> Result<String> {
    Ok(STANDARD.encode(fs::read(path)?))
}
