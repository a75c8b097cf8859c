//! Persistence and host input: map/height-table XML, trajectory CSV,
//! YAML configuration.

pub mod config;
pub mod map_xml;
pub mod trajectory;
pub mod xml;

pub use config::MapperConfig;
pub use map_xml::{load_height_table, restore_map, save_map};
pub use trajectory::{RobotLocation, load_trajectory};
