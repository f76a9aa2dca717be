//! Visualization utilities for maintenance plans.
//!
//! Generates SVG line charts for two-series chart data (stock and orders of
//! one component) and scatter plots of a Pareto frontier.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

#[cfg(feature = "resvg")]
use resvg::render;
#[cfg(feature = "resvg")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "resvg")]
use resvg::usvg;
#[cfg(feature = "resvg")]
use resvg::usvg::TreeParsing;
#[cfg(feature = "resvg")]
use resvg::FitTo;

use crate::error::{PlannerError, Result};
use crate::pareto::ParetoFront;
use crate::report::ChartData;

const STYLE: &str = r##"<style>
    .first { stroke: #3498db; stroke-width: 2; fill: none; }
    .second { stroke: #e67e22; stroke-width: 2; fill: none; }
    .point { fill: #2ecc71; stroke: #27ae60; stroke-width: 1; }
    .front { stroke: #27ae60; stroke-width: 1; stroke-dasharray: 5,5; fill: none; }
    .axis { stroke: #2c3e50; stroke-width: 1; }
    .label { font-family: Arial; font-size: 11px; fill: #2c3e50; }
    .title { font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }
</style>"##;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// Marker radius
    pub point_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 400.0,
            margin: 50.0,
            point_radius: 4.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&self, title: &str) -> String {
        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
{}
<rect width="100%" height="100%" fill="#ecf0f1"/>
<text x="{}" y="25" class="title">{}</text>
"##,
            self.width,
            self.height,
            self.width,
            self.height,
            STYLE,
            self.margin,
            escape(title)
        )
    }

    fn axes(&self) -> String {
        format!(
            r##"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" class="axis"/>
<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" class="axis"/>
"##,
            m = self.margin,
            b = self.height - self.margin,
            r = self.width - self.margin
        )
    }

    /// Line chart of both series against the labels
    pub fn chart_svg(&self, chart: &ChartData) -> String {
        let mut svg = self.header(&chart.title);
        svg.push_str(&self.axes());

        let plot_width = self.width - 2.0 * self.margin;
        let plot_height = self.height - 2.0 * self.margin;
        let n = chart.labels.len().max(2);
        let x_scale = plot_width / (n - 1) as f64;
        let y_max = chart.max_value().max(1.0);
        let y_scale = plot_height / y_max;
        let bottom = self.height - self.margin;

        for (series, class) in [(&chart.first, "first"), (&chart.second, "second")] {
            let mut path = String::new();
            for (i, &value) in series.values.iter().enumerate() {
                let x = self.margin + i as f64 * x_scale;
                let y = bottom - value * y_scale;
                if i == 0 {
                    path.push_str(&format!("M {:.2} {:.2}", x, y));
                } else {
                    path.push_str(&format!(" L {:.2} {:.2}", x, y));
                }
            }
            svg.push_str(&format!("<path d=\"{}\" class=\"{}\"/>\n", path, class));
        }

        for (i, label) in chart.labels.iter().enumerate() {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" class=\"label\" text-anchor=\"middle\">{}</text>\n",
                self.margin + i as f64 * x_scale,
                bottom + 15.0,
                escape(label)
            ));
        }
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" class=\"label\" text-anchor=\"end\">{}</text>\n",
            self.margin - 5.0,
            self.margin + 4.0,
            format_value(y_max)
        ));

        let legend_x = self.width - self.margin - 160.0;
        svg.push_str(&format!(
            r##"<line x1="{}" y1="{}" x2="{}" y2="{}" class="first"/>
<text x="{}" y="{}" class="label">{}</text>
<line x1="{}" y1="{}" x2="{}" y2="{}" class="second"/>
<text x="{}" y="{}" class="label">{}</text>
"##,
            legend_x, 20.0, legend_x + 20.0, 20.0,
            legend_x + 25.0, 24.0, escape(&chart.first.name),
            legend_x + 80.0, 20.0, legend_x + 100.0, 20.0,
            legend_x + 105.0, 24.0, escape(&chart.second.name)
        ));

        svg.push_str("</svg>");
        svg
    }

    /// Scatter plot of cost against makespan, non-dominated points joined
    pub fn pareto_svg(&self, front: &ParetoFront) -> String {
        let mut svg = self.header(&format!("Pareto frontier ({} points)", front.len()));
        svg.push_str(&self.axes());

        let plot_width = self.width - 2.0 * self.margin;
        let plot_height = self.height - 2.0 * self.margin;
        let bottom = self.height - self.margin;

        let points = front.points();
        let max_makespan = points.iter().map(|p| p.makespan).max().unwrap_or(1).max(1) as f64;
        let min_cost = points.iter().map(|p| p.cost).fold(f64::INFINITY, f64::min);
        let max_cost = points.iter().map(|p| p.cost).fold(f64::NEG_INFINITY, f64::max);
        let (min_cost, max_cost) = if points.is_empty() { (0.0, 1.0) } else { (min_cost, max_cost) };
        let cost_range = (max_cost - min_cost).max(1.0);

        let transform = |makespan: usize, cost: f64| -> (f64, f64) {
            let x = self.margin + makespan as f64 / max_makespan * plot_width;
            let y = bottom - (cost - min_cost) / cost_range * plot_height * 0.9 - plot_height * 0.05;
            (x, y)
        };

        let mut path = String::new();
        for (i, point) in front.non_dominated().iter().enumerate() {
            let (x, y) = transform(point.makespan, point.cost);
            if i == 0 {
                path.push_str(&format!("M {:.2} {:.2}", x, y));
            } else {
                path.push_str(&format!(" L {:.2} {:.2}", x, y));
            }
        }
        if !path.is_empty() {
            svg.push_str(&format!("<path d=\"{}\" class=\"front\"/>\n", path));
        }

        for point in points {
            let (x, y) = transform(point.makespan, point.cost);
            svg.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{}\" class=\"point\"/>\n",
                x, y, self.point_radius
            ));
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" class=\"label\">{}</text>\n",
                x + 6.0,
                y - 6.0,
                format_value(point.cost)
            ));
        }

        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" class=\"label\" text-anchor=\"middle\">makespan</text>\n",
            self.width / 2.0,
            bottom + 30.0
        ));
        svg.push_str("</svg>");
        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG: native resvg renderer when the feature is enabled,
    /// otherwise `rsvg-convert`, `magick convert` or `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> Result<()> {
        #[cfg(feature = "resvg")]
        let result = self.render_native(svg, path.as_ref());
        #[cfg(not(feature = "resvg"))]
        let result = render_external(svg, path.as_ref());
        result
    }

    #[cfg(feature = "resvg")]
    fn render_native(&self, svg: &str, path: &Path) -> Result<()> {
        let opt = usvg::Options::default();
        let rtree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| PlannerError::Backend(format!("usvg parse error: {}", e)))?;
        let mut pixmap = Pixmap::new(self.width as u32, self.height as u32)
            .ok_or_else(|| PlannerError::Backend("Failed to create pixmap".to_string()))?;
        render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
            .ok_or_else(|| PlannerError::Backend("resvg render failed".to_string()))?;
        pixmap
            .save_png(path)
            .map_err(|e| PlannerError::Backend(format!("save_png failed: {}", e)))
    }
}

/// Write the SVG next to the target and try the external converters in turn.
#[cfg_attr(feature = "resvg", allow(dead_code))]
fn render_external(svg: &str, path: &Path) -> Result<()> {
    let tmp_svg = path.with_extension("svg.tmp");
    std::fs::write(&tmp_svg, svg)?;
    let out = path.to_string_lossy().to_string();
    let input = tmp_svg.to_string_lossy().to_string();

    let attempts: [(&str, Vec<&str>); 3] = [
        ("rsvg-convert", vec!["-o", out.as_str(), input.as_str()]),
        ("magick", vec!["convert", input.as_str(), out.as_str()]),
        ("inkscape", vec![input.as_str(), "--export-type=png", "--export-filename", out.as_str()]),
    ];
    for (program, args) in &attempts {
        if let Ok(status) = Command::new(program).args(args).status() {
            if status.success() {
                let _ = std::fs::remove_file(&tmp_svg);
                return Ok(());
            }
        }
    }

    let _ = std::fs::remove_file(&tmp_svg);
    Err(PlannerError::Backend(
        "No SVG->PNG converter succeeded (tried rsvg-convert, magick, inkscape)".to_string(),
    ))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Series;

    #[test]
    fn test_chart_svg() {
        let chart = ChartData {
            title: "Inventory of pump & valve".to_string(),
            labels: vec!["t0".to_string(), "t1".to_string(), "t2".to_string()],
            first: Series { name: "stock".to_string(), values: vec![1.0, 0.0, 2.0] },
            second: Series { name: "orders".to_string(), values: vec![0.0, 3.0, 0.0] },
        };
        let viz = Visualizer::new();
        let svg = viz.chart_svg(&chart);

        assert!(svg.starts_with("<?xml"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("pump &amp; valve"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains(".first { stroke"));
    }

    #[test]
    fn test_empty_pareto_svg() {
        let svg = Visualizer::new().pareto_svg(&ParetoFront::default());
        assert!(svg.contains("0 points"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn test_save_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let viz = Visualizer::new();
        viz.save_svg("<svg/>", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
    }
}
