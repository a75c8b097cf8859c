//! Robot trajectory CSV reader.
//!
//! Each record is `x,y,bearing` (floor coordinates, bearing in radians);
//! `#`-prefixed lines are comments. The trajectory is only consumed by
//! the SVG renderer, which overlays it on the marker map.

use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;

/// One robot pose sample on the floor plane.
#[derive(Debug, Clone, Copy)]
pub struct RobotLocation {
    pub x: f64,
    pub y: f64,
    /// Heading, radians from the floor X axis.
    pub bearing: f64,
}

/// Load a trajectory from a CSV file.
pub fn load_trajectory(path: &Path) -> Result<Vec<RobotLocation>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut locations = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 3 {
            continue;
        }
        locations.push(RobotLocation {
            x: rec[0].trim().parse()?,
            y: rec[1].trim().parse()?,
            bearing: rec[2].trim().parse()?,
        });
    }
    Ok(locations)
}
