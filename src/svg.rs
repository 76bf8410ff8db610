use std::fmt::Write;

use rowtrace::geom::Scalar;
use rowtrace::{Curves, Point};

/// Presentation of traced contours in an SVG document.
#[derive(Debug, Clone)]
pub struct SvgStyle {
    pub stroke: &'static str,
    pub stroke_width: f32,
    /// Fill colour for closed polygons; `None` leaves them unfilled.
    pub fill: Option<&'static str>,
    /// Decimal places of emitted coordinates.
    pub precision: usize,
}

impl Default for SvgStyle {
    fn default() -> Self {
        Self {
            stroke: "black",
            stroke_width: 1.0,
            fill: None,
            precision: 3,
        }
    }
}

/// Render polygons as one even-odd filled path and polylines as one open path.
pub fn render<T: Scalar>(curves: &Curves<T>, width: u32, height: u32, style: &SvgStyle) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    if !curves.polygons.is_empty() {
        let mut d = String::new();
        for polygon in &curves.polygons {
            push_contour(&mut d, polygon, true, style.precision);
        }
        let _ = writeln!(
            svg,
            r#"  <path fill="{}" fill-rule="evenodd" stroke="{}" stroke-width="{}" d="{}"/>"#,
            style.fill.unwrap_or("none"),
            style.stroke,
            style.stroke_width,
            d.trim_end()
        );
    }
    if !curves.polylines.is_empty() {
        let mut d = String::new();
        for polyline in &curves.polylines {
            push_contour(&mut d, polyline, false, style.precision);
        }
        let _ = writeln!(
            svg,
            r#"  <path fill="none" stroke="{}" stroke-width="{}" d="{}"/>"#,
            style.stroke,
            style.stroke_width,
            d.trim_end()
        );
    }
    svg.push_str("</svg>\n");
    svg
}

fn push_contour<T: Scalar>(d: &mut String, contour: &[Point<T>], closed: bool, precision: usize) {
    for (i, point) in contour.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        let _ = write!(
            d,
            "{command}{} {} ",
            number(point.x.to_f64(), precision),
            number(point.y.to_f64(), precision)
        );
    }
    if closed && !contour.is_empty() {
        d.push_str("Z ");
    }
}

/// Fixed precision with trailing zeros stripped.
fn number(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" { "0".to_string() } else { trimmed.to_string() }
    } else {
        text
    }
}
