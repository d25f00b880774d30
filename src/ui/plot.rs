use std::f64::consts::TAU;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text};

use crate::chart::{ChartData, HistogramBin, HistogramGroup, Series};
use crate::color::{diverging, generate_palette, ColorMap};
use crate::data::aggregate::{AggValue, CorrelationMatrix};

const PLOT_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Chart rendering (central panel)
// ---------------------------------------------------------------------------

/// Render prepared chart data. Category colours come from `colors` when
/// given, otherwise from an evenly spaced palette.
pub fn chart(ui: &mut Ui, id: &str, data: &ChartData, colors: Option<&ColorMap>) {
    ui.strong(data.title());
    if data.is_empty() {
        ui.label("No data to plot for the current selection.");
        return;
    }

    match data {
        ChartData::Bars {
            x_label,
            y_label,
            bars,
            ..
        } => bar_plot(ui, id, x_label, y_label, bars, colors),
        ChartData::Pie { slices, .. } => pie_plot(ui, id, slices, colors),
        ChartData::Histogram {
            x_label,
            bins,
            groups,
            ..
        } => histogram_plot(ui, id, x_label, bins, groups, colors),
        ChartData::Lines { series, .. } => line_plot(ui, id, series),
        ChartData::Scatter {
            x_label,
            y_label,
            groups,
            trend,
            ..
        } => scatter_plot(ui, id, x_label, y_label, groups, *trend, colors),
        ChartData::Heatmap { matrix, .. } => heatmap_plot(ui, id, matrix),
    }
}

fn category_colors(labels: &[&str], colors: Option<&ColorMap>) -> Vec<Color32> {
    match colors {
        Some(map) => labels.iter().map(|l| map.color_for_label(l)).collect(),
        None => generate_palette(labels.len()),
    }
}

fn bar_plot(
    ui: &mut Ui,
    id: &str,
    x_label: &str,
    y_label: &str,
    bars: &[(String, AggValue)],
    colors: Option<&ColorMap>,
) {
    let labels: Vec<&str> = bars.iter().map(|(l, _)| l.as_str()).collect();
    let palette = category_colors(&labels, colors);

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, ((label, value), color)) in bars.iter().zip(palette).enumerate() {
                // undefined groups keep their slot but draw nothing
                let Some(height) = value.value() else {
                    continue;
                };
                let bar = Bar::new(i as f64, height).width(0.7).fill(color).name(label);
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(label).color(color));
            }
        });
}

fn histogram_bars(bins: &[HistogramBin], counts: impl Iterator<Item = usize>) -> Vec<Bar> {
    bins.iter()
        .zip(counts)
        .map(|(b, count)| {
            Bar::new((b.start + b.end) / 2.0, count as f64)
                .width(b.end - b.start)
                .name(format!("{:.2} – {:.2}", b.start, b.end))
        })
        .collect()
}

fn histogram_plot(
    ui: &mut Ui,
    id: &str,
    x_label: &str,
    bins: &[HistogramBin],
    groups: &[HistogramGroup],
    colors: Option<&ColorMap>,
) {
    let mut charts: Vec<BarChart> = Vec::new();
    if groups.is_empty() {
        let bars = histogram_bars(bins, bins.iter().map(|b| b.count));
        charts.push(BarChart::new(bars).color(Color32::LIGHT_BLUE));
    } else {
        let labels: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        for (group, color) in groups.iter().zip(category_colors(&labels, colors)) {
            let bars = histogram_bars(bins, group.counts.iter().copied());
            let below: Vec<&BarChart> = charts.iter().collect();
            let chart = BarChart::new(bars)
                .name(&group.name)
                .color(color)
                .stack_on(&below);
            charts.push(chart);
        }
    }

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label("count")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

/// Points along the arc from `start` to `end` (radians), closed at the centre.
fn slice_points(start: f64, end: f64) -> Vec<[f64; 2]> {
    let steps = (((end - start) / TAU) * 120.0).ceil().max(1.0) as usize;
    let mut points = vec![[0.0, 0.0]];
    points.extend((0..=steps).map(|s| {
        let angle = start + (end - start) * s as f64 / steps as f64;
        [angle.cos(), angle.sin()]
    }));
    points
}

fn pie_plot(ui: &mut Ui, id: &str, slices: &[(String, f64)], colors: Option<&ColorMap>) {
    let total: f64 = slices.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        ui.label("Nothing to show: all values are zero.");
        return;
    }
    let labels: Vec<&str> = slices.iter().map(|(l, _)| l.as_str()).collect();
    let palette = category_colors(&labels, colors);

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            // clockwise from twelve o'clock
            let mut angle = TAU / 4.0;
            for ((label, value), color) in slices.iter().zip(palette) {
                let sweep = TAU * value / total;
                let points = slice_points(angle - sweep, angle);
                let share = 100.0 * value / total;
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(points))
                        .fill_color(color)
                        .name(format!("{label} ({share:.1}%)")),
                );
                angle -= sweep;
            }
        });
}

fn line_plot(ui: &mut Ui, id: &str, series: &[Series]) {
    let palette = generate_palette(series.len());
    Plot::new(id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("row")
        .show(ui, |plot_ui| {
            for (s, color) in series.iter().zip(palette) {
                plot_ui.line(
                    Line::new(PlotPoints::from(s.points.clone()))
                        .name(&s.name)
                        .color(color)
                        .width(1.5),
                );
            }
        });
}

fn scatter_plot(
    ui: &mut Ui,
    id: &str,
    x_label: &str,
    y_label: &str,
    groups: &[Series],
    trend: Option<(f64, f64)>,
    colors: Option<&ColorMap>,
) {
    let labels: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    let palette = category_colors(&labels, colors);
    let (x_min, x_max) = groups
        .iter()
        .flat_map(|g| g.points.iter().map(|p| p[0]))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .show(ui, |plot_ui| {
            for (group, color) in groups.iter().zip(palette) {
                plot_ui.points(
                    Points::new(PlotPoints::from(group.points.clone()))
                        .name(&group.name)
                        .color(color)
                        .radius(3.0),
                );
            }
            if let Some((slope, intercept)) = trend {
                let fit = vec![
                    [x_min, slope * x_min + intercept],
                    [x_max, slope * x_max + intercept],
                ];
                plot_ui.line(
                    Line::new(PlotPoints::from(fit))
                        .name("OLS trend")
                        .color(Color32::DARK_GRAY)
                        .width(1.5),
                );
            }
        });
}

/// Annotated correlation grid; row 0 at the top.
fn heatmap_plot(ui: &mut Ui, id: &str, matrix: &CorrelationMatrix) {
    let n = matrix.columns.len();
    Plot::new(id)
        .height(PLOT_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            for (i, row) in matrix.values.iter().enumerate() {
                let y = (n - 1 - i) as f64;
                for (j, value) in row.iter().enumerate() {
                    let x = j as f64;
                    let cell = vec![[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0]];
                    let fill = value.value().map_or(Color32::GRAY, diverging);
                    plot_ui.polygon(Polygon::new(PlotPoints::from(cell)).fill_color(fill));
                    plot_ui.text(Text::new(
                        PlotPoint::new(x + 0.5, y + 0.5),
                        RichText::new(format!("{value:.2}")).color(Color32::BLACK),
                    ));
                }
            }
            for (k, name) in matrix.columns.iter().enumerate() {
                plot_ui.text(Text::new(PlotPoint::new(k as f64 + 0.5, -0.3), name.as_str()));
                plot_ui.text(Text::new(
                    PlotPoint::new(-0.6, (n - 1 - k) as f64 + 0.5),
                    name.as_str(),
                ));
            }
        });
}
