//! Observation - a pairwise relative-pose measurement between two markers.
//!
//! Each observation is an undirected edge recording how two markers seen
//! in the same camera frame sit relative to each other: the floor
//! distance between their centers, and the two twists referred to the
//! line segment joining them. The endpoint with the lower id is always
//! stored as `from`; creating the edge with the endpoints reversed swaps
//! the two twists along with them, which describes the same physical
//! measurement.
//!
//! `goodness` is an error proxy (smaller is better): the absolute
//! difference of the two endpoints' pixel distances from the image
//! center. Pairs seen equidistant from the optical axis suffer the least
//! radial distortion.

use std::cmp::Ordering;

use nalgebra::Point2;

use super::types::MarkerId;

/// Sentinel goodness for an observation that has never been measured.
/// Any real measurement beats it.
pub const UNMEASURED_GOODNESS: f64 = 123_456_789.0;

/// One decoded fiducial detection in a single camera frame.
///
/// Produced by the (external) detector: the marker id, the pixel center
/// of the fiducial, its twist in the pixel frame, and its pixel diagonal.
#[derive(Debug, Clone, Copy)]
pub struct CameraDetection {
    /// Decoded marker id.
    pub id: MarkerId,

    /// Fiducial center in pixel coordinates.
    pub center: Point2<f64>,

    /// Fiducial twist in the pixel frame, radians.
    pub twist: f64,

    /// Fiducial diagonal in pixels.
    pub diagonal: f64,
}

impl CameraDetection {
    /// Create a detection.
    pub fn new(id: MarkerId, center: Point2<f64>, twist: f64, diagonal: f64) -> Self {
        Self {
            id,
            center,
            twist,
            diagonal,
        }
    }
}

/// An undirected edge between two markers, canonically ordered so that
/// `from < to`.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Lower-id endpoint.
    pub from: MarkerId,

    /// Higher-id endpoint.
    pub to: MarkerId,

    /// Angle from the `from` marker's local X axis to the segment
    /// joining the two centers, radians in (−π, π].
    pub from_twist: f64,

    /// Angle from the `to` marker's local X axis to the same segment,
    /// measured from the far side (offset by π), radians in (−π, π].
    pub to_twist: f64,

    /// Floor-plane distance between the two marker centers.
    pub distance: f64,

    /// Quality of the stored measurement; smaller is better.
    /// [`UNMEASURED_GOODNESS`] means no measurement has been folded in.
    pub goodness: f64,

    /// Whether pose propagation selected this edge for the current
    /// spanning tree.
    pub in_tree: bool,

    /// Traversal scratch: generation stamp of the last propagation pass
    /// that visited this edge.
    pub visit: u64,
}

impl Observation {
    /// Create an observation, enforcing the canonical endpoint order.
    ///
    /// If `from.id > to.id` the endpoints are swapped together with their
    /// twists, which yields the conjugate description of the same edge.
    pub fn new(
        from: MarkerId,
        from_twist: f64,
        distance: f64,
        to: MarkerId,
        to_twist: f64,
        goodness: f64,
    ) -> Self {
        let (from, from_twist, to, to_twist) = if from > to {
            (to, to_twist, from, from_twist)
        } else {
            (from, from_twist, to, to_twist)
        };
        Self {
            from,
            from_twist,
            to,
            to_twist,
            distance,
            goodness,
            in_tree: false,
            visit: 0,
        }
    }

    /// Create a never-measured observation between two markers.
    pub fn unmeasured(from: MarkerId, to: MarkerId) -> Self {
        Self::new(from, 0.0, 0.0, to, 0.0, UNMEASURED_GOODNESS)
    }

    /// The canonical id pair identifying this edge.
    pub fn key(&self) -> (MarkerId, MarkerId) {
        (self.from, self.to)
    }

    /// Canonicalize an unordered id pair into an edge-index key.
    pub fn canonical_key(a: MarkerId, b: MarkerId) -> (MarkerId, MarkerId) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// True once a real measurement has been folded in.
    pub fn is_measured(&self) -> bool {
        self.goodness < UNMEASURED_GOODNESS
    }

    /// Given one endpoint, the other one.
    ///
    /// Panics if `id` is not an endpoint of this edge.
    pub fn other_end(&self, id: MarkerId) -> MarkerId {
        if id == self.from {
            self.to
        } else {
            assert_eq!(id, self.to, "marker {id} is not an endpoint");
            self.from
        }
    }

    /// Overwrite the measurement in place. Endpoints are not touched.
    pub fn update(&mut self, from_twist: f64, distance: f64, to_twist: f64, goodness: f64) {
        debug_assert!(self.from < self.to);
        self.from_twist = from_twist;
        self.distance = distance;
        self.to_twist = to_twist;
        self.goodness = goodness;
    }

    /// Lexicographic order on the canonical id pair.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }

    /// Frontier sort order: descending by distance, ties broken
    /// descending by the given minimum endpoint hop counts.
    ///
    /// A list sorted with this comparator keeps the shortest edge with
    /// the best-connected neighborhood at its tail, ready to pop.
    pub fn distance_compare(&self, other: &Self, min_hop: u32, other_min_hop: u32) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other_min_hop.cmp(&min_hop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_swaps_twists() {
        let obs = Observation::new(
            MarkerId::new(9),
            0.25,
            10.0,
            MarkerId::new(2),
            -1.5,
            3.0,
        );
        assert_eq!(obs.from, MarkerId::new(2));
        assert_eq!(obs.to, MarkerId::new(9));
        // The twists travel with their endpoints.
        assert_eq!(obs.from_twist, -1.5);
        assert_eq!(obs.to_twist, 0.25);
        assert_eq!(obs.distance, 10.0);
        assert_eq!(obs.goodness, 3.0);
    }

    #[test]
    fn test_already_canonical_is_untouched() {
        let obs = Observation::new(MarkerId::new(2), 0.25, 10.0, MarkerId::new(9), -1.5, 3.0);
        assert_eq!(obs.from, MarkerId::new(2));
        assert_eq!(obs.from_twist, 0.25);
        assert_eq!(obs.to_twist, -1.5);
    }

    #[test]
    fn test_unmeasured_sentinel() {
        let obs = Observation::unmeasured(MarkerId::new(5), MarkerId::new(1));
        assert!(!obs.is_measured());
        assert_eq!(obs.goodness, UNMEASURED_GOODNESS);
        assert_eq!(obs.key(), (MarkerId::new(1), MarkerId::new(5)));
    }

    #[test]
    fn test_other_end() {
        let obs = Observation::unmeasured(MarkerId::new(1), MarkerId::new(5));
        assert_eq!(obs.other_end(MarkerId::new(1)), MarkerId::new(5));
        assert_eq!(obs.other_end(MarkerId::new(5)), MarkerId::new(1));
    }

    #[test]
    fn test_compare_is_lexicographic() {
        let a = Observation::unmeasured(MarkerId::new(1), MarkerId::new(5));
        let b = Observation::unmeasured(MarkerId::new(1), MarkerId::new(7));
        let c = Observation::unmeasured(MarkerId::new(2), MarkerId::new(3));
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&c), Ordering::Less);
        assert_eq!(a.compare(&a), Ordering::Equal);
    }

    #[test]
    fn test_distance_compare_longest_first() {
        let mut short = Observation::unmeasured(MarkerId::new(1), MarkerId::new(2));
        short.distance = 5.0;
        let mut long = Observation::unmeasured(MarkerId::new(3), MarkerId::new(4));
        long.distance = 50.0;

        // Longest sorts first, so it is Less in the comparator's order.
        assert_eq!(long.distance_compare(&short, 0, 0), Ordering::Less);
        assert_eq!(short.distance_compare(&long, 0, 0), Ordering::Greater);
    }

    #[test]
    fn test_distance_compare_hop_tiebreak() {
        let mut a = Observation::unmeasured(MarkerId::new(1), MarkerId::new(2));
        a.distance = 10.0;
        let mut b = Observation::unmeasured(MarkerId::new(3), MarkerId::new(4));
        b.distance = 10.0;

        // Equal distance: the higher min-hop edge sorts first, keeping the
        // lowest-hop edge at the pop end.
        assert_eq!(a.distance_compare(&b, 4, 1), Ordering::Less);
        assert_eq!(a.distance_compare(&b, 1, 4), Ordering::Greater);
        assert_eq!(a.distance_compare(&b, 2, 2), Ordering::Equal);
    }
}
