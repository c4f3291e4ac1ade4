//! Comparison plots
//!
//! [`plan_plots`] decides which files an evaluation produces; a [`PlotRenderer`]
//! draws them. Real data is drawn in blue, synthetic data in red.

use super::stats::RegressionLine;
use super::{ColumnPair, QualityReport};
use crate::metadata::TableMetadata;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tabsynth_common::{is_missing, ArtifactLayout, Table};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotKind {
    Column { column: String },
    Scatter { x: String, y: String },
    Regression { x: String, y: String },
    ColumnShapes,
    ColumnPairTrends,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSpec {
    #[serde(flatten)]
    pub kind: PlotKind,
    pub file_name: String,
}

/// One plot per column, a scatter and a regression plot per numeric pair, and
/// the two property summaries.
pub fn plan_plots(id: i64, metadata: &TableMetadata, pairs: &[ColumnPair]) -> Vec<PlotSpec> {
    let mut specs: Vec<PlotSpec> = metadata
        .names()
        .map(|column| PlotSpec {
            file_name: ArtifactLayout::column_plot_name(id, column),
            kind: PlotKind::Column {
                column: column.to_string(),
            },
        })
        .collect();

    for (x, y) in pairs {
        specs.push(PlotSpec {
            file_name: ArtifactLayout::scatter_plot_name(id, x, y),
            kind: PlotKind::Scatter {
                x: x.clone(),
                y: y.clone(),
            },
        });
        specs.push(PlotSpec {
            file_name: ArtifactLayout::regression_plot_name(id, x, y),
            kind: PlotKind::Regression {
                x: x.clone(),
                y: y.clone(),
            },
        });
    }

    specs.push(PlotSpec {
        file_name: ArtifactLayout::column_shapes_plot_name(id),
        kind: PlotKind::ColumnShapes,
    });
    specs.push(PlotSpec {
        file_name: ArtifactLayout::pair_trends_plot_name(id),
        kind: PlotKind::ColumnPairTrends,
    });
    specs
}

/// Everything a renderer may draw from.
#[derive(Debug, Clone, Copy)]
pub struct PlotContext<'a> {
    pub real: &'a Table,
    pub synthetic: &'a Table,
    pub metadata: &'a TableMetadata,
    pub report: &'a QualityReport,
}

pub trait PlotRenderer: Send + Sync {
    fn render(&self, spec: &PlotSpec, ctx: &PlotContext<'_>, path: &Path) -> Result<(), PlotError>;
}

/// Render every spec into `plot_root`, returning the written paths in order.
pub fn render_all(
    renderer: &dyn PlotRenderer,
    specs: &[PlotSpec],
    ctx: &PlotContext<'_>,
    plot_root: &Path,
) -> Result<Vec<PathBuf>, PlotError> {
    std::fs::create_dir_all(plot_root)?;
    let mut written = Vec::with_capacity(specs.len());
    for spec in specs {
        let path = plot_root.join(&spec.file_name);
        renderer.render(spec, ctx, &path)?;
        written.push(path);
    }
    debug!(plots = written.len(), "Rendered evaluation plots");
    Ok(written)
}

const REAL: Rgb<u8> = Rgb([31, 119, 180]);
const SYNTHETIC: Rgb<u8> = Rgb([214, 39, 40]);
const NEUTRAL: Rgb<u8> = Rgb([90, 90, 90]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

const HISTOGRAM_BINS: usize = 20;
const MAX_CATEGORIES: usize = 30;

/// PNG renderer backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct PngPlotRenderer {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
}

impl Default for PngPlotRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            margin: 40,
        }
    }
}

/// Linear map from a data range onto [0, 1].
#[derive(Debug, Clone, Copy)]
struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    fn fit(values: impl Iterator<Item = f64>) -> Option<Self> {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        if min == max {
            return Some(Self {
                min: min - 0.5,
                max: max + 0.5,
            });
        }
        Some(Self { min, max })
    }

    fn unit(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }
}

struct Canvas {
    image: RgbImage,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl Canvas {
    /// Margins shrink so the plot area keeps at least one pixel per axis.
    fn new(r: &PngPlotRenderer) -> Self {
        let (image_width, image_height) = (r.width.max(1), r.height.max(1));
        let left = r.margin.min((image_width - 1) / 2);
        let top = r.margin.min((image_height - 1) / 2);
        let width = image_width - 2 * left;
        let height = image_height - 2 * top;

        let mut image = RgbImage::from_pixel(image_width, image_height, BACKGROUND);
        for x in left..left + width {
            image.put_pixel(x, top + height - 1, AXIS);
        }
        for y in top..top + height {
            image.put_pixel(left, y, AXIS);
        }

        Self {
            image,
            left,
            top,
            width,
            height,
        }
    }

    fn pixel(&self, ux: f64, uy: f64) -> (i64, i64) {
        let x = self.left as f64 + ux.clamp(0.0, 1.0) * (self.width - 1) as f64;
        let y = self.top as f64 + (1.0 - uy.clamp(0.0, 1.0)) * (self.height - 1) as f64;
        (x.round() as i64, y.round() as i64)
    }

    /// Half-transparent pixel write.
    fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x >= self.image.width() || y >= self.image.height() {
            return;
        }
        let current = *self.image.get_pixel(x, y);
        let mixed = Rgb([
            ((current[0] as u16 + color[0] as u16) / 2) as u8,
            ((current[1] as u16 + color[1] as u16) / 2) as u8,
            ((current[2] as u16 + color[2] as u16) / 2) as u8,
        ]);
        self.image.put_pixel(x, y, mixed);
    }

    fn point(&mut self, ux: f64, uy: f64, color: Rgb<u8>) {
        let (cx, cy) = self.pixel(ux, uy);
        for dx in -2..=2 {
            for dy in -2..=2 {
                if dx * dx + dy * dy <= 4 {
                    self.blend(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
        let (mut x0, mut y0) = self.pixel(from.0, from.1);
        let (x1, y1) = self.pixel(to.0, to.1);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.blend(x0, y0, color);
            self.blend(x0, y0 + 1, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Filled bar between `ux0` and `ux1`, from the x axis up to `uy`.
    fn bar(&mut self, ux0: f64, ux1: f64, uy: f64, color: Rgb<u8>) {
        let (x0, y_top) = self.pixel(ux0, uy);
        let (x1, y_bottom) = self.pixel(ux1, 0.0);
        for x in x0..x1.max(x0 + 1) {
            for y in y_top..=y_bottom {
                if let (Ok(px), Ok(py)) = (u32::try_from(x), u32::try_from(y)) {
                    if px < self.image.width() && py < self.image.height() {
                        self.image.put_pixel(px, py, color);
                    }
                }
            }
        }
    }

    fn save(self, path: &Path) -> Result<(), PlotError> {
        self.image.save(path)?;
        Ok(())
    }
}

fn column_index(table: &Table, name: &str) -> Result<usize, PlotError> {
    table
        .column_index(name)
        .ok_or_else(|| PlotError::UnknownColumn(name.to_string()))
}

fn present(table: &Table, index: usize) -> Vec<f64> {
    table.numeric_values(index).into_iter().flatten().collect()
}

fn histogram(values: &[f64], scale: Scale) -> Vec<f64> {
    let mut counts = vec![0.0; HISTOGRAM_BINS];
    for v in values {
        let bin = (scale.unit(*v) * HISTOGRAM_BINS as f64).floor() as usize;
        counts[bin.min(HISTOGRAM_BINS - 1)] += 1.0;
    }
    let total = values.len().max(1) as f64;
    counts.iter_mut().for_each(|c| *c /= total);
    counts
}

fn category_shares<'a>(table: &'a Table, index: usize) -> HashMap<&'a str, f64> {
    let mut shares = HashMap::new();
    let mut total = 0.0;
    for cell in table.column_values(index).filter(|c| !is_missing(c)) {
        *shares.entry(cell.trim()).or_insert(0.0) += 1.0;
        total += 1.0;
    }
    if total > 0.0 {
        shares.values_mut().for_each(|v| *v /= total);
    }
    shares
}

/// Side-by-side bars for two series over the same slots.
fn paired_bars(canvas: &mut Canvas, real: &[f64], synthetic: &[f64]) {
    let slots = real.len().max(synthetic.len()).max(1);
    let peak = real
        .iter()
        .chain(synthetic)
        .copied()
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);
    let slot = 1.0 / slots as f64;
    for i in 0..slots {
        let start = i as f64 * slot;
        let r = real.get(i).copied().unwrap_or(0.0);
        let s = synthetic.get(i).copied().unwrap_or(0.0);
        canvas.bar(start + slot * 0.05, start + slot * 0.5, r / peak, REAL);
        canvas.bar(start + slot * 0.5, start + slot * 0.95, s / peak, SYNTHETIC);
    }
}

/// One bar per score, on a fixed [0, 1] axis.
fn score_bars(canvas: &mut Canvas, scores: &[f64]) {
    let slots = scores.len().max(1);
    let slot = 1.0 / slots as f64;
    for (i, score) in scores.iter().enumerate() {
        let start = i as f64 * slot;
        canvas.bar(start + slot * 0.1, start + slot * 0.9, score.clamp(0.0, 1.0), NEUTRAL);
    }
}

impl PngPlotRenderer {
    fn draw_column(&self, canvas: &mut Canvas, ctx: &PlotContext<'_>, column: &str) -> Result<(), PlotError> {
        let index = column_index(ctx.real, column)?;
        let numeric = ctx
            .metadata
            .column(column)
            .is_some_and(|c| c.column_type.is_numeric());

        if numeric {
            let real = present(ctx.real, index);
            let synthetic = present(ctx.synthetic, index);
            if let Some(scale) = Scale::fit(real.iter().chain(&synthetic).copied()) {
                paired_bars(canvas, &histogram(&real, scale), &histogram(&synthetic, scale));
            }
            return Ok(());
        }

        let real = category_shares(ctx.real, index);
        let synthetic = category_shares(ctx.synthetic, index);
        let mut categories: Vec<&str> = real.keys().chain(synthetic.keys()).copied().collect();
        categories.sort_unstable();
        categories.dedup();
        categories.sort_by(|a, b| {
            let ra = real.get(a).copied().unwrap_or(0.0);
            let rb = real.get(b).copied().unwrap_or(0.0);
            rb.total_cmp(&ra)
        });
        categories.truncate(MAX_CATEGORIES);

        let series = |shares: &HashMap<&str, f64>| -> Vec<f64> {
            categories
                .iter()
                .map(|c| shares.get(c).copied().unwrap_or(0.0))
                .collect()
        };
        paired_bars(canvas, &series(&real), &series(&synthetic));
        Ok(())
    }

    fn draw_scatter(
        &self,
        canvas: &mut Canvas,
        ctx: &PlotContext<'_>,
        x: &str,
        y: &str,
        with_lines: bool,
    ) -> Result<(), PlotError> {
        let (xi, yi) = (column_index(ctx.real, x)?, column_index(ctx.real, y)?);
        let real = super::stats::complete_pairs(&ctx.real.numeric_values(xi), &ctx.real.numeric_values(yi));
        let synthetic = super::stats::complete_pairs(
            &ctx.synthetic.numeric_values(xi),
            &ctx.synthetic.numeric_values(yi),
        );

        let all = || real.iter().chain(&synthetic);
        let (Some(sx), Some(sy)) = (
            Scale::fit(all().map(|p| p.0)),
            Scale::fit(all().map(|p| p.1)),
        ) else {
            return Ok(());
        };

        for &(px, py) in &real {
            canvas.point(sx.unit(px), sy.unit(py), REAL);
        }
        for &(px, py) in &synthetic {
            canvas.point(sx.unit(px), sy.unit(py), SYNTHETIC);
        }

        if with_lines {
            let comparison = ctx
                .report
                .pair_statistics
                .iter()
                .find(|p| p.columns.0 == x && p.columns.1 == y);
            if let Some(comparison) = comparison {
                let mut draw = |line: Option<RegressionLine>, color| {
                    if let Some(line) = line {
                        canvas.line(
                            (0.0, sy.unit(line.at(sx.min))),
                            (1.0, sy.unit(line.at(sx.max))),
                            color,
                        );
                    }
                };
                draw(comparison.real.regression, REAL);
                draw(comparison.synthetic.regression, SYNTHETIC);
            }
        }
        Ok(())
    }
}

impl PlotRenderer for PngPlotRenderer {
    fn render(&self, spec: &PlotSpec, ctx: &PlotContext<'_>, path: &Path) -> Result<(), PlotError> {
        let mut canvas = Canvas::new(self);

        match &spec.kind {
            PlotKind::Column { column } => self.draw_column(&mut canvas, ctx, column)?,
            PlotKind::Scatter { x, y } => self.draw_scatter(&mut canvas, ctx, x, y, false)?,
            PlotKind::Regression { x, y } => self.draw_scatter(&mut canvas, ctx, x, y, true)?,
            PlotKind::ColumnShapes => {
                let scores: Vec<f64> = ctx.report.details.column_shapes.iter().map(|s| s.score).collect();
                score_bars(&mut canvas, &scores);
            },
            PlotKind::ColumnPairTrends => {
                let scores: Vec<f64> = ctx
                    .report
                    .details
                    .column_pair_trends
                    .iter()
                    .map(|s| s.score)
                    .collect();
                score_bars(&mut canvas, &scores);
            },
        }

        canvas.save(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::evaluation::{column_pairs, evaluate, StatisticalScorer};
    use crate::metadata::{HeuristicDetector, MetadataDetector};

    fn tables() -> (Table, Table) {
        let real = Table::from_reader("a,kind,b\n1,x,2\n2,y,4.5\n3,x,5\n4,z,9\n".as_bytes()).unwrap();
        let synthetic =
            Table::from_reader("a,kind,b\n2,x,3\n3,x,5\n1,y,1.5\n4,z,7\n".as_bytes()).unwrap();
        (real, synthetic)
    }

    #[test]
    fn test_plan_plots() {
        let (real, _) = tables();
        let metadata = HeuristicDetector.detect(&real);
        let specs = plan_plots(5, &metadata, &column_pairs(&metadata));
        let names: Vec<&str> = specs.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "5a.png",
                "5kind.png",
                "5b.png",
                "5ab.png",
                "5abreg.png",
                "5column_shapes.png",
                "5column_pair_trends.png",
            ]
        );
    }

    #[test]
    fn test_render_all_writes_pngs() {
        let (real, synthetic) = tables();
        let (report, metadata) =
            evaluate(&real, &synthetic, &HeuristicDetector, &StatisticalScorer).unwrap();
        let specs = plan_plots(1, &metadata, &report.column_pairs);
        let ctx = PlotContext {
            real: &real,
            synthetic: &synthetic,
            metadata: &metadata,
            report: &report,
        };

        let dir = tempfile::tempdir().unwrap();
        let renderer = PngPlotRenderer {
            width: 200,
            height: 120,
            margin: 10,
        };
        let written = render_all(&renderer, &specs, &ctx, dir.path()).unwrap();
        assert_eq!(written.len(), specs.len());
        for path in written {
            let img = image::open(&path).unwrap();
            assert_eq!((img.width(), img.height()), (200, 120));
        }
    }

    #[test]
    fn test_tiny_canvas_clamps_margin() {
        let (real, synthetic) = tables();
        let (report, metadata) =
            evaluate(&real, &synthetic, &HeuristicDetector, &StatisticalScorer).unwrap();
        let specs = plan_plots(1, &metadata, &report.column_pairs);
        let ctx = PlotContext {
            real: &real,
            synthetic: &synthetic,
            metadata: &metadata,
            report: &report,
        };

        let dir = tempfile::tempdir().unwrap();
        for (width, height) in [(30, 20), (1, 1), (0, 5)] {
            let renderer = PngPlotRenderer {
                width,
                height,
                margin: 40,
            };
            let written = render_all(&renderer, &specs, &ctx, dir.path()).unwrap();
            let img = image::open(&written[0]).unwrap();
            assert_eq!((img.width(), img.height()), (width.max(1), height.max(1)));
        }
    }

    #[test]
    fn test_unknown_column() {
        let (real, synthetic) = tables();
        let (report, metadata) =
            evaluate(&real, &synthetic, &HeuristicDetector, &StatisticalScorer).unwrap();
        let ctx = PlotContext {
            real: &real,
            synthetic: &synthetic,
            metadata: &metadata,
            report: &report,
        };
        let dir = tempfile::tempdir().unwrap();
        let spec = PlotSpec {
            kind: PlotKind::Column {
                column: "nope".into(),
            },
            file_name: "1nope.png".into(),
        };
        let err = PngPlotRenderer::default()
            .render(&spec, &ctx, &dir.path().join("1nope.png"))
            .unwrap_err();
        assert!(matches!(err, PlotError::UnknownColumn(_)));
    }
}
