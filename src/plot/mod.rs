//! Diagnostic plots.

use crate::data::Status;
use crate::error::{Result, TidyError};
use crate::profile::PrevalenceProfile;
use log::{info, warn};
use plotters::prelude::*;
use std::path::Path;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 650;

const KEEP_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const DISCARD_COLOR: RGBColor = RGBColor(0xd6, 0x27, 0x28);

/// What ended up on a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotSummary {
    pub n_points: usize,
    /// OTUs with mean RA of 0, which have no position on a log axis.
    pub n_skipped: usize,
}

fn plot_err<E: std::fmt::Display>(e: E) -> TidyError {
    TidyError::Plot(e.to_string())
}

/// Scatter plot of prevalence against mean relative abundance, one point per
/// OTU, log10 x-axis, colored by status, written as SVG.
///
/// `threshold` is drawn as a horizontal reference line.
pub fn plot_prevalence<P: AsRef<Path>>(
    profile: &PrevalenceProfile,
    threshold: f64,
    path: P,
) -> Result<PlotSummary> {
    let path = path.as_ref();
    let placed: Vec<_> = profile.otus.iter().filter(|o| o.mean_ra > 0.0).collect();
    let n_skipped = profile.otus.len() - placed.len();
    if n_skipped > 0 {
        warn!("{} OTUs with zero mean abundance left off the log-scale plot", n_skipped);
    }

    let (x_min, x_max) = placed
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, o| match acc {
            None => Some((o.mean_ra, o.mean_ra)),
            Some((lo, hi)) => Some((lo.min(o.mean_ra), hi.max(o.mean_ra))),
        })
        .map(|(lo, hi)| (lo / 2.0, hi * 2.0))
        .unwrap_or((0.01, 1000.0));

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("OTU prevalence vs. mean relative abundance", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((x_min..x_max).log_scale(), 0.0..1.05)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Mean relative abundance (per mille)")
        .y_desc("Prevalence")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            vec![(x_min, threshold), (x_max, threshold)],
            BLACK.mix(0.5).stroke_width(1),
        ))
        .map_err(plot_err)?;

    for (status, color) in [(Status::Keep, KEEP_COLOR), (Status::Discard, DISCARD_COLOR)] {
        chart
            .draw_series(
                placed
                    .iter()
                    .filter(|o| o.status == status)
                    .map(|o| Circle::new((o.mean_ra, o.prev), 3, color.filled())),
            )
            .map_err(plot_err)?
            .label(status.to_string())
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    info!("Wrote prevalence plot ({} OTUs) to {}", placed.len(), path.display());

    Ok(PlotSummary {
        n_points: placed.len(),
        n_skipped,
    })
}
