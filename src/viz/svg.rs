//! SVG canvas with cartesian world-to-page scaling.
//!
//! The canvas maps floor-plane coordinates (y up) onto an SVG page
//! (y down) with a uniform scale derived from a bounding box, so the
//! rendered map keeps its aspect ratio regardless of extent.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::Point2;

use super::bounds::BoundingBox;

/// Page units per inch in the generated documents.
const UNITS_PER_INCH: f64 = 100.0;

/// Fraction of the page kept as margin on each side.
const MARGIN_FRACTION: f64 = 0.05;

/// A writable SVG page with a world-coordinate transform.
pub struct SvgCanvas<W: Write> {
    out: W,
    page_width: f64,
    page_height: f64,
    scale: f64,
    world_min: Point2<f64>,
    margin: f64,
}

impl SvgCanvas<BufWriter<File>> {
    /// Create `<path>` and write the document header for a page of the
    /// given size in inches.
    pub fn create(path: &Path, width_in: f64, height_in: f64) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Self::new(BufWriter::new(file), width_in, height_in)
    }
}

impl<W: Write> SvgCanvas<W> {
    /// Write the document header for a page of the given size in inches.
    pub fn new(mut out: W, width_in: f64, height_in: f64) -> Result<Self> {
        let page_width = width_in * UNITS_PER_INCH;
        let page_height = height_in * UNITS_PER_INCH;
        writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width_in}in\" height=\"{height_in}in\" \
             viewBox=\"0 0 {page_width:.0} {page_height:.0}\">"
        )?;
        Ok(Self {
            out,
            page_width,
            page_height,
            scale: 1.0,
            world_min: Point2::new(0.0, 0.0),
            margin: page_height.min(page_width) * MARGIN_FRACTION,
        })
    }

    /// Fit the world `bbox` onto the page with a uniform scale.
    ///
    /// A degenerate box (empty, or a single point) falls back to a unit
    /// extent so the transform stays finite.
    pub fn set_cartesian(&mut self, bbox: &BoundingBox) {
        let (min, width, height) = if bbox.is_empty() {
            (Point2::new(-0.5, -0.5), 1.0, 1.0)
        } else {
            (
                Point2::new(bbox.min_x, bbox.min_y),
                bbox.width().max(1.0),
                bbox.height().max(1.0),
            )
        };
        let usable_w = self.page_width - 2.0 * self.margin;
        let usable_h = self.page_height - 2.0 * self.margin;
        self.scale = (usable_w / width).min(usable_h / height);
        self.world_min = min;
    }

    fn to_page(&self, p: Point2<f64>) -> (f64, f64) {
        let x = (p.x - self.world_min.x) * self.scale + self.margin;
        // SVG y runs down the page; floor y runs up.
        let y = self.page_height - ((p.y - self.world_min.y) * self.scale + self.margin);
        (x, y)
    }

    /// Draw a line between two world points.
    pub fn line(&mut self, p1: Point2<f64>, p2: Point2<f64>, color: &str) -> Result<()> {
        let (x1, y1) = self.to_page(p1);
        let (x2, y2) = self.to_page(p2);
        writeln!(
            self.out,
            " <line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" \
             stroke=\"{color}\" stroke-width=\"1\"/>"
        )?;
        Ok(())
    }

    /// Draw text anchored at a world point.
    pub fn text(&mut self, label: &str, at: Point2<f64>, color: &str) -> Result<()> {
        let (x, y) = self.to_page(at);
        writeln!(
            self.out,
            " <text x=\"{x:.2}\" y=\"{y:.2}\" font-size=\"12\" fill=\"{color}\">{label}</text>"
        )?;
        Ok(())
    }

    /// Close the document and flush the writer.
    pub fn close(mut self) -> Result<()> {
        writeln!(self.out, "</svg>")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_unit_line() -> String {
        let mut buffer = Vec::new();
        {
            let mut canvas = SvgCanvas::new(&mut buffer, 8.0, 10.5).unwrap();
            let mut bbox = BoundingBox::new();
            bbox.update(Point2::new(0.0, 0.0));
            bbox.update(Point2::new(100.0, 100.0));
            canvas.set_cartesian(&bbox);
            canvas.line(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), "red").unwrap();
            canvas.close().unwrap();
        }
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_document_structure() {
        let svg = render_unit_line();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("stroke=\"red\""));
    }

    #[test]
    fn test_y_axis_flips() {
        let mut buffer = Vec::new();
        {
            let mut canvas = SvgCanvas::new(&mut buffer, 8.0, 8.0).unwrap();
            let mut bbox = BoundingBox::new();
            bbox.update(Point2::new(0.0, 0.0));
            bbox.update(Point2::new(100.0, 100.0));
            canvas.set_cartesian(&bbox);
            // World-north should land nearer the top of the page.
            let (_, y_low) = canvas.to_page(Point2::new(0.0, 0.0));
            let (_, y_high) = canvas.to_page(Point2::new(0.0, 100.0));
            assert!(y_high < y_low);
            canvas.close().unwrap();
        }
    }

    #[test]
    fn test_degenerate_bbox_is_finite() {
        let mut buffer = Vec::new();
        let mut canvas = SvgCanvas::new(&mut buffer, 8.0, 10.5).unwrap();
        canvas.set_cartesian(&BoundingBox::new());
        let (x, y) = canvas.to_page(Point2::new(0.0, 0.0));
        assert!(x.is_finite());
        assert!(y.is_finite());
    }
}
