//! Height table - per-marker pixel-to-floor scale bands.
//!
//! Markers on a flat ceiling section share one physical height, so a
//! single distance-per-pixel value covers a whole range of ids. The
//! table maps inclusive id ranges to that scale plus the ceiling height.

/// One contiguous band of marker ids at the same ceiling height.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightEntry {
    /// First marker id of the band (inclusive).
    pub first_id: u32,

    /// Last marker id of the band (inclusive).
    pub last_id: u32,

    /// Floor distance represented by one camera pixel at this height.
    pub distance_per_pixel: f64,

    /// Ceiling height above the floor, in the same distance unit.
    pub z: f64,
}

impl HeightEntry {
    /// True if `id` falls inside this band.
    pub fn contains(&self, id: u32) -> bool {
        self.first_id <= id && id <= self.last_id
    }
}

/// Lookup table from marker id to its height band.
///
/// Entries are kept sorted by `first_id`; lookup is a linear scan and the
/// first matching band wins, so overlapping bands resolve deterministically.
#[derive(Debug, Clone, Default)]
pub struct HeightTable {
    entries: Vec<HeightEntry>,
}

impl HeightTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Populate the table from externally parsed entries, sorting by
    /// `first_id` ascending.
    pub fn load(&mut self, mut entries: Vec<HeightEntry>) {
        entries.sort_by_key(|e| e.first_id);
        self.entries = entries;
    }

    /// The band containing `id`, if any.
    pub fn lookup(&self, id: u32) -> Option<&HeightEntry> {
        self.entries.iter().find(|e| e.contains(id))
    }

    /// Distance-per-pixel for `id`, or 0.0 when no band covers it.
    ///
    /// Zero is a sentinel, not an error: callers that ingest measurements
    /// must make sure the table is populated first.
    pub fn distance_per_pixel(&self, id: u32) -> f64 {
        self.lookup(id).map_or(0.0, |e| e.distance_per_pixel)
    }

    /// Ceiling height for `id`, or 0.0 when no band covers it.
    pub fn z(&self, id: u32) -> f64 {
        self.lookup(id).map_or(0.0, |e| e.z)
    }

    /// Number of bands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table holds no bands.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All bands in sorted order.
    pub fn entries(&self) -> &[HeightEntry] {
        &self.entries
    }
}
