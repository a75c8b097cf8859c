//! SVG rendering of the marker map.

use std::f64::consts::{FRAC_PI_4, PI};
use std::path::PathBuf;

use anyhow::Result;
use nalgebra::Point2;

use crate::io::trajectory::RobotLocation;
use crate::map::{Marker, MarkerMap};

use super::bounds::BoundingBox;
use super::svg::SvgCanvas;

/// Page size of the rendered map, inches.
const PAGE_WIDTH_IN: f64 = 8.0;
const PAGE_HEIGHT_IN: f64 = 10.5;

/// Glyph half-diagonal for markers whose physical size is unknown.
const FALLBACK_HALF_DIAGONAL: f64 = 20.0;

/// Trajectory triangle: long leg toward the bearing, back corners at
/// ±3π/4 off it.
const TRIANGLE_NOSE: f64 = 40.0;
const TRIANGLE_TAIL: f64 = 20.0;
const TRIANGLE_BACK_ANGLE: f64 = PI * 0.75;

/// Render `map` (and an optional robot trajectory) to `<base_name>.svg`.
///
/// Axes are cyan, tree edges red, cross edges green, the trajectory a
/// purple polyline over black oriented triangles. Returns the path of
/// the written file.
pub fn render_map_svg(
    map: &MarkerMap,
    base_name: &str,
    trajectory: &[RobotLocation],
) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{base_name}.svg"));
    let mut canvas = SvgCanvas::create(&path, PAGE_WIDTH_IN, PAGE_HEIGHT_IN)?;

    let mut bbox = BoundingBox::new();
    for marker in map.markers() {
        bbox.update(Point2::new(marker.x, marker.y));
    }
    canvas.set_cartesian(&bbox);

    draw_axes(&mut canvas, &bbox)?;

    for marker in map.markers() {
        draw_marker(&mut canvas, marker)?;
    }

    for obs in map.observations() {
        let from = map.get_marker(obs.from);
        let to = map.get_marker(obs.to);
        if let (Some(from), Some(to)) = (from, to) {
            let color = if obs.in_tree { "red" } else { "green" };
            canvas.line(Point2::new(from.x, from.y), Point2::new(to.x, to.y), color)?;
        }
    }

    draw_trajectory(&mut canvas, trajectory)?;

    canvas.close()?;
    Ok(path)
}

fn draw_axes<W: std::io::Write>(canvas: &mut SvgCanvas<W>, bbox: &BoundingBox) -> Result<()> {
    if bbox.is_empty() {
        return Ok(());
    }
    canvas.line(
        Point2::new(bbox.min_x, 0.0),
        Point2::new(bbox.max_x, 0.0),
        "cyan",
    )?;
    canvas.line(
        Point2::new(0.0, bbox.min_y),
        Point2::new(0.0, bbox.max_y),
        "cyan",
    )?;
    Ok(())
}

/// Square outline rotated by the marker twist, a heading tick along its
/// local X axis, and the id as a label.
fn draw_marker<W: std::io::Write>(canvas: &mut SvgCanvas<W>, marker: &Marker) -> Result<()> {
    let center = Point2::new(marker.x, marker.y);
    let half_diagonal = {
        let world_diagonal = marker.diagonal * marker.distance_per_pixel;
        if world_diagonal > 0.0 {
            world_diagonal / 2.0
        } else {
            FALLBACK_HALF_DIAGONAL
        }
    };

    let corner = |k: u32| {
        let angle = marker.twist + FRAC_PI_4 + f64::from(k) * (PI / 2.0);
        Point2::new(
            center.x + half_diagonal * angle.cos(),
            center.y + half_diagonal * angle.sin(),
        )
    };
    for k in 0..4 {
        canvas.line(corner(k), corner((k + 1) % 4), "blue")?;
    }

    let nose = Point2::new(
        center.x + half_diagonal * marker.twist.cos(),
        center.y + half_diagonal * marker.twist.sin(),
    );
    canvas.line(center, nose, "blue")?;
    canvas.text(&marker.id.to_string(), center, "black")?;
    Ok(())
}

fn draw_trajectory<W: std::io::Write>(
    canvas: &mut SvgCanvas<W>,
    trajectory: &[RobotLocation],
) -> Result<()> {
    let mut last: Option<Point2<f64>> = None;
    for location in trajectory {
        let center = Point2::new(location.x, location.y);
        let bearing = location.bearing;

        let nose = Point2::new(
            center.x + TRIANGLE_NOSE * bearing.cos(),
            center.y + TRIANGLE_NOSE * bearing.sin(),
        );
        let left = Point2::new(
            center.x + TRIANGLE_TAIL * (bearing + TRIANGLE_BACK_ANGLE).cos(),
            center.y + TRIANGLE_TAIL * (bearing + TRIANGLE_BACK_ANGLE).sin(),
        );
        let right = Point2::new(
            center.x + TRIANGLE_TAIL * (bearing - TRIANGLE_BACK_ANGLE).cos(),
            center.y + TRIANGLE_TAIL * (bearing - TRIANGLE_BACK_ANGLE).sin(),
        );
        canvas.line(nose, left, "black")?;
        canvas.line(left, right, "black")?;
        canvas.line(right, nose, "black")?;

        if let Some(last) = last {
            canvas.line(last, center, "purple")?;
        }
        last = Some(center);
    }
    Ok(())
}
