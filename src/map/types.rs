//! Core ID types for the marker map structures.

/// Unique identifier of a ceiling marker within a map.
///
/// Marker ids come from the fiducial payload itself, so they are stable
/// across sessions. They serve as lightweight handles for cross-referencing
/// without needing Arc/Rc, which simplifies ownership and avoids cyclic
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u32);

impl MarkerId {
    /// Create a new MarkerId with the given value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag{}", self.0)
    }
}

/// Stable handle to an observation in the map's observation arena.
///
/// Observations are never destroyed, so an ObservationId stays valid for
/// the lifetime of the map that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(pub u32);

impl ObservationId {
    /// Create a new ObservationId with the given value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// The arena slot this handle points at.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ObservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Obs{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_id_ordering() {
        let id1 = MarkerId::new(4);
        let id2 = MarkerId::new(4);
        let id3 = MarkerId::new(40);

        assert_eq!(id1, id2);
        assert!(id1 < id3);
    }

    #[test]
    fn test_marker_id_display() {
        assert_eq!(format!("{}", MarkerId::new(17)), "Tag17");
    }

    #[test]
    fn test_id_as_hashmap_key() {
        use std::collections::HashMap;

        let mut table: HashMap<MarkerId, &str> = HashMap::new();
        table.insert(MarkerId::new(1), "first");
        table.insert(MarkerId::new(2), "second");

        assert_eq!(table.get(&MarkerId::new(1)), Some(&"first"));
        assert_eq!(table.get(&MarkerId::new(3)), None);
    }
}
