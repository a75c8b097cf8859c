use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use ceilmap::io::{MapperConfig, load_height_table, load_trajectory, restore_map, save_map};
use ceilmap::map::MarkerMap;
use ceilmap::viz::render_map_svg;

fn main() -> Result<()> {
    // Initialize tracing subscriber with environment filter
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mapper.yaml".to_string());
    let config = MapperConfig::load(Path::new(&config_path))?;

    let heights = load_height_table(&config.height_table)?;
    debug!("loaded {} height bands", heights.len());

    let mut map = if config.map_file.exists() {
        restore_map(&config.map_file)?
    } else {
        info!(
            "{} does not exist yet; starting empty",
            config.map_file.display()
        );
        MarkerMap::new()
    };
    map.load_heights(heights);
    map.set_announce(Box::new(|a| {
        debug!(
            "{} x={:.1} y={:.1} z={:.1} twist={:.3}",
            a.id, a.x, a.y, a.z, a.twist
        );
    }));

    // Recompute poses from the pairwise graph and persist the result.
    map.update();
    save_map(&mut map, &config.map_file)?;
    info!(
        "map: {} markers, {} observations",
        map.num_markers(),
        map.num_observations()
    );

    if let Some(base_name) = &config.svg_base_name {
        let trajectory = match &config.trajectory {
            Some(path) => load_trajectory(path)?,
            None => Vec::new(),
        };
        let svg_path = render_map_svg(&map, base_name, &trajectory)?;
        info!("rendered {}", svg_path.display());
    }

    Ok(())
}
