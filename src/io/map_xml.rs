//! Map and height-table XML persistence.
//!
//! Twists are stored in degrees on disk and converted to radians at
//! load; numbers print with six decimal places. Arc elements must keep
//! `From_Tag_Id < To_Tag_Id`, which the writer guarantees and the loader
//! trusts (a reversed element would be re-canonicalized, twists and all).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::map::{HeightEntry, MarkerId, MarkerMap, Observation};

use super::xml::XmlScanner;

/// Save `map` to an XML file, in sorted order.
pub fn save_map(map: &mut MarkerMap, path: &Path) -> Result<()> {
    map.sort();
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_map(map, &mut out)?;
    out.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    debug!(
        "saved {} markers, {} observations to {}",
        map.num_markers(),
        map.num_observations(),
        path.display()
    );
    Ok(())
}

/// Write `map` in its current list order.
pub fn write_map<W: Write>(map: &MarkerMap, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "<Map Tags_Count=\"{}\" Arcs_Count=\"{}\">",
        map.num_markers(),
        map.num_observations()
    )?;
    for marker in map.markers() {
        writeln!(
            out,
            " <Tag Id=\"{}\" X=\"{:.6}\" Y=\"{:.6}\" Twist=\"{:.6}\" Diagonal=\"{:.6}\" \
             Distance_Per_Pixel=\"{:.6}\" Z=\"{:.6}\" Hop_Count=\"{}\"/>",
            marker.id.0,
            marker.x,
            marker.y,
            marker.twist.to_degrees(),
            marker.diagonal,
            marker.distance_per_pixel,
            marker.z,
            marker.hop_count
        )?;
    }
    for obs in map.observations() {
        writeln!(
            out,
            " <Arc From_Tag_Id=\"{}\" From_Twist=\"{:.6}\" Distance=\"{:.6}\" \
             To_Tag_Id=\"{}\" To_Twist=\"{:.6}\" Goodness=\"{:.6}\" In_Tree=\"{}\"/>",
            obs.from.0,
            obs.from_twist.to_degrees(),
            obs.distance,
            obs.to.0,
            obs.to_twist.to_degrees(),
            obs.goodness,
            u8::from(obs.in_tree)
        )?;
    }
    writeln!(out, "</Map>")?;
    Ok(())
}

/// Read a map back from an XML file.
pub fn restore_map(path: &Path) -> Result<MarkerMap> {
    let input =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    read_map(&input).with_context(|| format!("malformed map file {}", path.display()))
}

/// Parse a map from XML text.
///
/// Marker ids referenced by arcs resolve lazily, so element order inside
/// the file only has to be internally consistent. Counts in the header
/// are verified against what was actually reconstructed.
pub fn read_map(input: &str) -> Result<MarkerMap> {
    let mut scanner = XmlScanner::new(input);
    let mut map = MarkerMap::new();

    let header = scanner.expect_element("Map")?;
    if header.self_closing {
        bail!("<Map> must not be self-closing");
    }
    let tags_count = header.integer_attribute("Tags_Count")?;
    let arcs_count = header.integer_attribute("Arcs_Count")?;

    for _ in 0..tags_count {
        read_marker(&mut scanner, &mut map)?;
    }
    for _ in 0..arcs_count {
        read_observation(&mut scanner, &mut map)?;
    }
    scanner.expect_close("Map")?;

    if map.num_markers() != tags_count as usize {
        bail!(
            "Tags_Count says {tags_count} but the file defines {} markers",
            map.num_markers()
        );
    }
    if map.num_observations() != arcs_count as usize {
        bail!(
            "Arcs_Count says {arcs_count} but the file defines {} observations",
            map.num_observations()
        );
    }
    Ok(map)
}

fn read_marker(scanner: &mut XmlScanner<'_>, map: &mut MarkerMap) -> Result<()> {
    let element = scanner.expect_element("Tag")?;
    let id = MarkerId::new(element.integer_attribute("Id")?);
    let x = element.float_attribute("X")?;
    let y = element.float_attribute("Y")?;
    let twist = element.float_attribute("Twist")?.to_radians();
    let diagonal = element.float_attribute("Diagonal")?;
    let distance_per_pixel = element.float_attribute("Distance_Per_Pixel")?;
    let z = element.float_attribute("Z")?;
    let hop_count = element.integer_attribute("Hop_Count")?;

    map.marker_lookup(id);
    if let Some(marker) = map.get_marker_mut(id) {
        marker.x = x;
        marker.y = y;
        marker.twist = twist;
        marker.diagonal = diagonal;
        marker.distance_per_pixel = distance_per_pixel;
        marker.z = z;
        marker.hop_count = hop_count;
    }
    Ok(())
}

fn read_observation(scanner: &mut XmlScanner<'_>, map: &mut MarkerMap) -> Result<()> {
    let element = scanner.expect_element("Arc")?;
    let from = MarkerId::new(element.integer_attribute("From_Tag_Id")?);
    let from_twist = element.float_attribute("From_Twist")?.to_radians();
    let distance = element.float_attribute("Distance")?;
    let to = MarkerId::new(element.integer_attribute("To_Tag_Id")?);
    let to_twist = element.float_attribute("To_Twist")?.to_radians();
    let goodness = element.float_attribute("Goodness")?;
    let in_tree = element.integer_attribute("In_Tree")? != 0;

    // Canonicalize first so a reversed element still lands its twists on
    // the right endpoints; well-formed files make this a no-op.
    let parsed = Observation::new(from, from_twist, distance, to, to_twist, goodness);
    let obs_id = map.observation_lookup(parsed.from, parsed.to);
    if let Some(stored) = map.get_observation_mut(obs_id) {
        stored.update(parsed.from_twist, parsed.distance, parsed.to_twist, parsed.goodness);
        stored.in_tree = in_tree;
    }
    Ok(())
}

/// Read height-table entries from an XML file.
pub fn load_height_table(path: &Path) -> Result<Vec<HeightEntry>> {
    let input =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    read_height_table(&input)
        .with_context(|| format!("malformed height table {}", path.display()))
}

/// Parse height-table entries from XML text.
pub fn read_height_table(input: &str) -> Result<Vec<HeightEntry>> {
    let mut scanner = XmlScanner::new(input);

    let header = scanner.expect_element("Map_Tag_Heights")?;
    let count = header.integer_attribute("Count")?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let element = scanner.expect_element("Tag_Height")?;
        entries.push(HeightEntry {
            first_id: element.integer_attribute("First_Id")?,
            last_id: element.integer_attribute("Last_Id")?,
            distance_per_pixel: element.float_attribute("Distance_Per_Pixel")?,
            z: element.float_attribute("Z")?,
        });
    }
    scanner.expect_close("Map_Tag_Heights")?;
    Ok(entries)
}

/// Write height-table entries as XML.
pub fn write_height_table<W: Write>(entries: &[HeightEntry], out: &mut W) -> Result<()> {
    writeln!(out, "<Map_Tag_Heights Count=\"{}\">", entries.len())?;
    for entry in entries {
        writeln!(
            out,
            " <Tag_Height First_Id=\"{}\" Last_Id=\"{}\" Distance_Per_Pixel=\"{:.6}\" Z=\"{:.6}\"/>",
            entry.first_id, entry.last_id, entry.distance_per_pixel, entry.z
        )?;
    }
    writeln!(out, "</Map_Tag_Heights>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEIGHTS: &str = "<Map_Tag_Heights Count=\"2\">\n \
        <Tag_Height First_Id=\"100\" Last_Id=\"199\" Distance_Per_Pixel=\"2.500000\" Z=\"3000.000000\"/>\n \
        <Tag_Height First_Id=\"0\" Last_Id=\"99\" Distance_Per_Pixel=\"1.000000\" Z=\"2500.000000\"/>\n\
        </Map_Tag_Heights>\n";

    #[test]
    fn test_read_height_table() {
        let entries = read_height_table(HEIGHTS).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].first_id, 100);
        assert_eq!(entries[1].distance_per_pixel, 1.0);
    }

    #[test]
    fn test_height_table_round_trip() {
        let entries = read_height_table(HEIGHTS).unwrap();
        let mut buffer = Vec::new();
        write_height_table(&entries, &mut buffer).unwrap();
        let again = read_height_table(std::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(entries, again);
    }

    #[test]
    fn test_height_table_count_mismatch_fails() {
        let truncated = "<Map_Tag_Heights Count=\"3\">\n \
            <Tag_Height First_Id=\"0\" Last_Id=\"9\" Distance_Per_Pixel=\"1.000000\" Z=\"1.000000\"/>\n\
            </Map_Tag_Heights>\n";
        assert!(read_height_table(truncated).is_err());
    }

    #[test]
    fn test_read_empty_map() {
        let map = read_map("<Map Tags_Count=\"0\" Arcs_Count=\"0\">\n</Map>\n").unwrap();
        assert_eq!(map.num_markers(), 0);
        assert_eq!(map.num_observations(), 0);
    }

    #[test]
    fn test_map_count_mismatch_fails() {
        // One arc references a marker the header does not account for.
        let input = "<Map Tags_Count=\"1\" Arcs_Count=\"1\">\n \
            <Tag Id=\"1\" X=\"0.000000\" Y=\"0.000000\" Twist=\"0.000000\" Diagonal=\"0.000000\" \
            Distance_Per_Pixel=\"1.000000\" Z=\"1.000000\" Hop_Count=\"0\"/>\n \
            <Arc From_Tag_Id=\"1\" From_Twist=\"0.000000\" Distance=\"10.000000\" \
            To_Tag_Id=\"2\" To_Twist=\"0.000000\" Goodness=\"0.500000\" In_Tree=\"1\"/>\n\
            </Map>\n";
        assert!(read_map(input).is_err());
    }

    #[test]
    fn test_read_map_reconstructs_incidence() {
        let input = "<Map Tags_Count=\"2\" Arcs_Count=\"1\">\n \
            <Tag Id=\"1\" X=\"0.000000\" Y=\"0.000000\" Twist=\"0.000000\" Diagonal=\"40.000000\" \
            Distance_Per_Pixel=\"1.000000\" Z=\"1.000000\" Hop_Count=\"0\"/>\n \
            <Tag Id=\"2\" X=\"0.000000\" Y=\"100.000000\" Twist=\"180.000000\" Diagonal=\"40.000000\" \
            Distance_Per_Pixel=\"1.000000\" Z=\"1.000000\" Hop_Count=\"1\"/>\n \
            <Arc From_Tag_Id=\"1\" From_Twist=\"-90.000000\" Distance=\"100.000000\" \
            To_Tag_Id=\"2\" To_Twist=\"90.000000\" Goodness=\"0.000000\" In_Tree=\"1\"/>\n\
            </Map>\n";
        let map = read_map(input).unwrap();

        let marker = map.get_marker(MarkerId::new(2)).unwrap();
        assert!((marker.y - 100.0).abs() < 1e-9);
        assert!((marker.twist - std::f64::consts::PI).abs() < 1e-9);
        assert_eq!(marker.edges.len(), 1);

        let obs = map
            .find_observation(MarkerId::new(1), MarkerId::new(2))
            .unwrap();
        assert!(obs.in_tree);
        assert!((obs.from_twist + std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
