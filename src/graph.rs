//! Renders the request duration distribution chart of a test.
//!
//! The chart is an SVG image containing:
//!  - a density-scaled histogram of `duration_ms` (30 bins)
//!  - a Gaussian kernel density estimate, using Scott's rule for the bandwidth
//!  - a normal distribution fitted with the sample mean and standard deviation
//!  - vertical markers at the 90th and 95th percentiles
//!
//! Rendering failures are logged and reported as `false`: a missing chart never prevents
//! the rest of the report from being written.

use plotters::prelude::*;
use std::error::Error;
use std::f64::consts::PI;
use std::path::Path;

use crate::stats::LatencySummary;

/// Number of histogram bins.
pub const HISTOGRAM_BINS: usize = 30;

/// Number of points sampled along the density curves.
const CURVE_POINTS: usize = 200;

const CHART_SIZE: (u32, u32) = (1000, 600);

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const ORANGE: RGBColor = RGBColor(255, 165, 0);

/// One histogram bar, with its height scaled so the total area is 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub density: f64,
}

/// Render the distribution chart of `durations` to `output`, returning whether it worked.
pub fn render_chart(
    test_name: &str,
    durations: &[f64],
    summary: &LatencySummary,
    output: &Path,
) -> bool {
    info!("generating graph for {} at {}", test_name, output.display());
    match draw_chart(test_name, durations, summary, output) {
        Ok(()) => {
            info!("graph saved to {}", output.display());
            true
        }
        Err(e) => {
            error!("failed to generate graph for {}: {}", test_name, e);
            false
        }
    }
}

fn draw_chart(
    test_name: &str,
    durations: &[f64],
    summary: &LatencySummary,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    if durations.is_empty() {
        return Err("no durations to plot".into());
    }

    let (x_min, x_max) = x_range(summary);
    let bins = histogram_bins(durations, HISTOGRAM_BINS, x_min, x_max);
    let xs = (0..CURVE_POINTS)
        .map(|i| x_min + (x_max - x_min) * i as f64 / (CURVE_POINTS - 1) as f64)
        .collect::<Vec<f64>>();

    // Both curves need some spread, a single repeated value has none.
    let (kde, normal) = if summary.std_dev > 0.0 {
        let bandwidth = scott_bandwidth(summary);
        (
            xs.iter()
                .map(|x| (*x, gaussian_kde(durations, bandwidth, *x)))
                .collect::<Vec<(f64, f64)>>(),
            xs.iter()
                .map(|x| (*x, normal_pdf(*x, summary.mean, summary.std_dev)))
                .collect::<Vec<(f64, f64)>>(),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let y_max = bins
        .iter()
        .map(|bin| bin.density)
        .chain(kde.iter().map(|(_, y)| *y))
        .chain(normal.iter().map(|(_, y)| *y))
        .fold(0.0, f64::max)
        * 1.1;
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };

    let root = SVGBackend::new(output, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Request Duration Distribution for {}", test_name),
            ("sans-serif", 24),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Request duration (ms)")
        .y_desc("Density")
        .draw()?;

    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new(
            [(bin.start, 0.0), (bin.end, bin.density)],
            SKY_BLUE.mix(0.7).filled(),
        )
    }))?;
    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new([(bin.start, 0.0), (bin.end, bin.density)], BLACK.stroke_width(1))
    }))?;

    if !kde.is_empty() {
        chart
            .draw_series(LineSeries::new(kde, BLUE.stroke_width(2)))?
            .label("Kernel density")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        chart
            .draw_series(LineSeries::new(normal, BLACK.stroke_width(2)))?
            .label("Normal distribution")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
    }

    chart
        .draw_series(LineSeries::new(
            vec![(summary.p90, 0.0), (summary.p90, y_max)],
            ORANGE.stroke_width(2),
        ))?
        .label(format!("90th percentile ({:.2} ms)", summary.p90))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &ORANGE));
    chart
        .draw_series(LineSeries::new(
            vec![(summary.p95, 0.0), (summary.p95, y_max)],
            RED.stroke_width(2),
        ))?
        .label(format!("95th percentile ({:.2} ms)", summary.p95))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Horizontal extent of the chart: the observed range plus 5% on each side.
fn x_range(summary: &LatencySummary) -> (f64, f64) {
    let spread = summary.max - summary.min;
    let padding = if spread > 0.0 { spread * 0.05 } else { 1.0 };
    (summary.min - padding, summary.max + padding)
}

/// Split `[start, end)` into `bins` equal bins, with heights normalized to a density.
///
/// Values outside the range are ignored, except `end` itself which lands in the last bin.
pub fn histogram_bins(durations: &[f64], bins: usize, start: f64, end: f64) -> Vec<HistogramBin> {
    if bins == 0 || durations.is_empty() || end <= start {
        return Vec::new();
    }

    let width = (end - start) / bins as f64;
    let mut counts = vec![0usize; bins];
    for duration in durations {
        if *duration < start || *duration > end {
            continue;
        }
        let index = (((duration - start) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    let total = durations.len() as f64;
    counts
        .iter()
        .enumerate()
        .map(|(index, count)| HistogramBin {
            start: start + width * index as f64,
            end: start + width * (index + 1) as f64,
            density: *count as f64 / (total * width),
        })
        .collect()
}

/// Scott's rule: `std_dev * n^(-1/5)`.
pub fn scott_bandwidth(summary: &LatencySummary) -> f64 {
    summary.std_dev * (summary.count as f64).powf(-0.2)
}

/// Gaussian kernel density estimate at `x`.
pub fn gaussian_kde(durations: &[f64], bandwidth: f64, x: f64) -> f64 {
    if durations.is_empty() || bandwidth <= 0.0 {
        return 0.0;
    }
    let sum = durations
        .iter()
        .map(|duration| normal_pdf(x, *duration, bandwidth))
        .sum::<f64>();
    sum / durations.len() as f64
}

/// Probability density of a normal distribution at `x`.
pub fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * PI).sqrt())
}
