//! Standalone SVG line chart of the portfolio value series.

use crate::domain::portfolio::PortfolioValueSample;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 60.0;

/// Empty string when there is nothing to plot.
pub fn generate_value_svg(series: &[PortfolioValueSample]) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return String::new();
    };

    let min = series
        .iter()
        .map(|s| s.total_value)
        .fold(f64::INFINITY, f64::min);
    let max = series
        .iter()
        .map(|s| s.total_value)
        .fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 0.0 };
    let scale_x = if series.len() > 1 {
        plot_width / (series.len() - 1) as f64
    } else {
        0.0
    };
    // flat series sits mid-plot
    let offset_y = if range > 0.0 { 0.0 } else { plot_height / 2.0 };

    let points: Vec<String> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - offset_y - (s.total_value - min) * scale_y;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    let bottom = HEIGHT - PADDING;
    let right = WIDTH - PADDING;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{cx:.0}" y="30" text-anchor="middle" font-family="sans-serif" font-size="16">Portfolio Value Over Time</text>
<line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{bottom:.0}" stroke="black"/>
<line x1="{PADDING:.0}" y1="{bottom:.0}" x2="{right:.0}" y2="{bottom:.0}" stroke="black"/>
<text x="{lx:.0}" y="{PADDING:.0}" text-anchor="end" font-family="sans-serif" font-size="10">{max:.0}</text>
<text x="{lx:.0}" y="{bottom:.0}" text-anchor="end" font-family="sans-serif" font-size="10">{min:.0}</text>
<text x="{PADDING:.0}" y="{dy:.0}" font-family="sans-serif" font-size="10">{start}</text>
<text x="{right:.0}" y="{dy:.0}" text-anchor="end" font-family="sans-serif" font-size="10">{end}</text>
<polyline fill="none" stroke="#1f77b4" stroke-width="1.5" points="{points}"/>
</svg>
"##,
        cx = WIDTH / 2.0,
        lx = PADDING - 5.0,
        dy = bottom + 15.0,
        start = first.date,
        end = last.date,
        points = points.join(" "),
    )
}
