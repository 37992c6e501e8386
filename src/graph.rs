#![cfg(feature = "web")]
use crate::aggregate::ItemTotal;
use crate::error::{DashboardError, Result};
use plotters::prelude::*;

/// Longest item label drawn under a bar before it is shortened
const MAX_LABEL_CHARS: usize = 14;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Sales by Item".to_string(),
            y_label: "Amount (BHD)".to_string(),
            width: 900,
            height: 420,
        }
    }
}

/// Draws the per-item sales totals as a bar chart
///
/// Bars keep the order of `totals`, which the aggregator already sorted by
/// amount descending.
///
/// # Arguments
/// * `totals` - Summed amount per item label
/// * `options` - Chart styling options
///
/// # Returns
/// * A Result containing the SVG document, or `None` when there is nothing to draw
///
/// # Examples
/// ```
/// use carpet_dashboard::aggregate::ItemTotal;
/// use carpet_dashboard::graph::{GraphOptions, sales_by_item_svg};
///
/// let totals = vec![ItemTotal { item: "Kashan rug".into(), amount: 120.0 }];
/// let svg = sales_by_item_svg(&totals, &GraphOptions::default()).unwrap();
/// assert!(svg.unwrap().contains("<svg"));
/// ```
pub fn sales_by_item_svg(totals: &[ItemTotal], options: &GraphOptions) -> Result<Option<String>> {
    if totals.is_empty() {
        return Ok(None);
    }

    let labels: Vec<String> = totals.iter().map(|t| short_label(&t.item)).collect();
    let max_y = totals.iter().map(|t| t.amount).fold(0.0_f64, f64::max);
    let min_y = totals.iter().map(|t| t.amount).fold(0.0_f64, f64::min);
    let y_range = min_y..if max_y > 0.0 { max_y * 1.1 } else { 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..totals.len() as u32).into_segmented(), y_range)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(totals.len())
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    labels.get(*i as usize).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .y_desc(&options.y_label)
            .draw()
            .map_err(chart_error)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.filled())
                    .margin(6)
                    .data(totals.iter().enumerate().map(|(i, t)| (i as u32, t.amount))),
            )
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    Ok(Some(svg))
}

fn short_label(item: &str) -> String {
    if item.is_empty() {
        return "(blank)".to_string();
    }
    if item.chars().count() <= MAX_LABEL_CHARS {
        return item.to_string();
    }
    let mut label: String = item.chars().take(MAX_LABEL_CHARS - 1).collect();
    label.push('…');
    label
}

fn chart_error<E: std::fmt::Display>(e: E) -> DashboardError {
    DashboardError::Chart(e.to_string())
}
