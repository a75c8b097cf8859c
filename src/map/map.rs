//! MarkerMap - container and fusion engine for the ceiling-marker graph.
//!
//! The MarkerMap is the central data structure of the mapper:
//! - Markers (ceiling fiducials) with their floor-plane poses
//! - Observations (pairwise relative measurements) between markers
//! - The edge index guaranteeing one observation per unordered id pair
//!
//! It provides methods for:
//! - Lazily creating markers and observations on first reference
//! - Ingesting per-frame detection pairs (`observe_pair`)
//! - Deriving absolute poses from the pairwise graph (`update`)
//! - Ordering and comparing whole maps for persistence round trips
//!
//! Pose propagation grows a spanning tree from the lowest-id marker,
//! always extending over the shortest not-yet-visited edge, and composes
//! planar rigid-body transforms along tree edges. The map is
//! single-threaded; wrap it in a mutex externally if needed.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::f64::consts::PI;

use nalgebra::Point2;
use tracing::{debug, warn};

use crate::geometry::{floor_projection, normalize_angle, polar_about};

use super::height::{HeightEntry, HeightTable};
use super::marker::Marker;
use super::observation::{CameraDetection, Observation};
use super::types::{MarkerId, ObservationId};

/// Pose assignment notification passed to the announce callback.
///
/// `dx`/`dy`/`dz` describe the physical marker extent (world units);
/// `z` is the ceiling height of the marker's height band.
#[derive(Debug, Clone, Copy)]
pub struct MarkerAnnouncement {
    pub id: MarkerId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub twist: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

/// Callback invoked each time pose propagation assigns a marker pose.
///
/// Expect many calls per [`MarkerMap::update`].
pub type AnnounceFn = Box<dyn FnMut(&MarkerAnnouncement)>;

/// The ceiling-marker map: markers, observations, and the fusion engine
/// that ties them together.
pub struct MarkerMap {
    /// All markers, keyed by id.
    markers: HashMap<MarkerId, Marker>,

    /// Marker ids in list order. Insertion order until `sort()` or
    /// `update()` reorders it ascending; persistence writes this order.
    marker_order: Vec<MarkerId>,

    /// Observation arena. Slots are never reused or reordered, so an
    /// ObservationId stays valid for the life of the map.
    observations: Vec<Observation>,

    /// Observation handles in list order (see `marker_order`).
    observation_order: Vec<ObservationId>,

    /// Canonical id pair -> observation handle. At most one observation
    /// per unordered pair.
    edge_index: HashMap<(MarkerId, MarkerId), ObservationId>,

    /// Height bands giving each marker its pixel-to-floor scale.
    heights: HeightTable,

    /// Generation counter stamped onto markers and observations during
    /// pose propagation, so per-entity scratch never needs clearing.
    visit: u64,

    /// Set by any mutation that invalidates derived poses.
    is_changed: bool,

    /// Optional pose-assignment callback.
    announce: Option<AnnounceFn>,
}

impl MarkerMap {
    /// Create a new empty map.
    pub fn new() -> Self {
        Self {
            markers: HashMap::new(),
            marker_order: Vec::new(),
            observations: Vec::new(),
            observation_order: Vec::new(),
            edge_index: HashMap::new(),
            heights: HeightTable::new(),
            visit: 0,
            is_changed: false,
            announce: None,
        }
    }

    /// Install the pose-assignment callback.
    pub fn set_announce(&mut self, announce: AnnounceFn) {
        self.announce = Some(announce);
    }

    /// Populate the height table from externally parsed entries.
    ///
    /// Must happen before ingesting detections; markers resolve their
    /// pixel-to-floor scale once, at creation.
    pub fn load_heights(&mut self, entries: Vec<HeightEntry>) {
        self.heights.load(entries);
    }

    /// The height table.
    pub fn heights(&self) -> &HeightTable {
        &self.heights
    }

    /// Distance-per-pixel for a marker id; 0.0 when no band covers it.
    pub fn distance_per_pixel(&self, id: MarkerId) -> f64 {
        self.heights.distance_per_pixel(id.0)
    }

    /// True when derived poses are stale relative to the stored graph.
    pub fn is_changed(&self) -> bool {
        self.is_changed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Marker operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a marker by id, creating it on first reference.
    ///
    /// Creation resolves the height band once; an id outside every band
    /// gets a zero scale, which poisons distances measured against it
    /// (logged, not rejected).
    pub fn marker_lookup(&mut self, id: MarkerId) -> &Marker {
        self.ensure_marker(id);
        &self.markers[&id]
    }

    /// Get a marker by id.
    pub fn get_marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// Get a mutable reference to a marker by id.
    pub fn get_marker_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.get_mut(&id)
    }

    /// All markers in list order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.marker_order.iter().map(|id| &self.markers[id])
    }

    /// Number of markers.
    pub fn num_markers(&self) -> usize {
        self.markers.len()
    }

    fn ensure_marker(&mut self, id: MarkerId) {
        if self.markers.contains_key(&id) {
            return;
        }
        let distance_per_pixel = self.heights.distance_per_pixel(id.0);
        let z = self.heights.z(id.0);
        if distance_per_pixel == 0.0 {
            warn!("{id} is outside every height band; distances involving it will be zero");
        }
        debug!("created {id} (distance_per_pixel={distance_per_pixel})");
        self.markers.insert(id, Marker::new(id, distance_per_pixel, z));
        self.marker_order.push(id);
        self.is_changed = true;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observation operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up the observation joining two markers, creating an
    /// unmeasured one (and the markers themselves) on first reference.
    ///
    /// The edge index guarantees at most one observation per unordered
    /// pair: a second lookup with the endpoints in either order returns
    /// the same handle.
    pub fn observation_lookup(&mut self, a: MarkerId, b: MarkerId) -> ObservationId {
        let key = Observation::canonical_key(a, b);
        if let Some(&id) = self.edge_index.get(&key) {
            return id;
        }
        self.insert_observation(Observation::unmeasured(a, b))
    }

    /// Get an observation by handle.
    pub fn get_observation(&self, id: ObservationId) -> Option<&Observation> {
        self.observations.get(id.index())
    }

    /// Get a mutable reference to an observation by handle.
    pub fn get_observation_mut(&mut self, id: ObservationId) -> Option<&mut Observation> {
        self.observations.get_mut(id.index())
    }

    /// The observation joining two markers, if one exists.
    pub fn find_observation(&self, a: MarkerId, b: MarkerId) -> Option<&Observation> {
        let key = Observation::canonical_key(a, b);
        self.edge_index
            .get(&key)
            .map(|id| &self.observations[id.index()])
    }

    /// All observations in list order.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.observation_order
            .iter()
            .map(|id| &self.observations[id.index()])
    }

    /// Number of observations.
    pub fn num_observations(&self) -> usize {
        self.observations.len()
    }

    /// Insert a fully formed observation, wiring it into both endpoints.
    fn insert_observation(&mut self, obs: Observation) -> ObservationId {
        debug_assert!(obs.from < obs.to);
        let id = ObservationId::new(self.observations.len() as u32);
        self.ensure_marker(obs.from);
        self.ensure_marker(obs.to);
        if let Some(marker) = self.markers.get_mut(&obs.from) {
            marker.attach_edge(id);
        }
        if let Some(marker) = self.markers.get_mut(&obs.to) {
            marker.attach_edge(id);
        }
        debug!("created {} between {} and {}", id, obs.from, obs.to);
        self.edge_index.insert(obs.key(), id);
        self.observations.push(obs);
        self.observation_order.push(id);
        self.is_changed = true;
        id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────

    /// Fold one detection pair from a single frame into the graph.
    ///
    /// The candidate measurement's goodness is the absolute difference of
    /// the two detections' pixel distances from the image center: radial
    /// distortion grows away from the optical axis, so equidistant pairs
    /// are the most trustworthy. The stored observation is overwritten
    /// only when the candidate is strictly better.
    ///
    /// Returns true when the stored observation was updated.
    pub fn observe_pair(
        &mut self,
        from: &CameraDetection,
        to: &CameraDetection,
        image_width: u32,
        image_height: u32,
    ) -> bool {
        if from.id == to.id {
            warn!("detection pair with equal ids ({}); ignored", from.id);
            return false;
        }

        let center = Point2::new(f64::from(image_width) / 2.0, f64::from(image_height) / 2.0);
        let (rho_from, phi_from) = polar_about(center, from.center);
        let (rho_to, phi_to) = polar_about(center, to.center);
        let goodness = (rho_from - rho_to).abs();

        self.ensure_marker(from.id);
        self.ensure_marker(to.id);
        if let Some(marker) = self.markers.get_mut(&from.id) {
            marker.diagonal = from.diagonal;
        }
        if let Some(marker) = self.markers.get_mut(&to.id) {
            marker.diagonal = to.diagonal;
        }

        let obs_id = self.observation_lookup(from.id, to.id);
        if goodness >= self.observations[obs_id.index()].goodness {
            return false;
        }

        // Project both centers onto the floor plane, camera at the floor
        // origin. The scales may differ: ceiling height varies per band.
        let dpp_from = self.markers[&from.id].distance_per_pixel;
        let dpp_to = self.markers[&to.id].distance_per_pixel;
        let floor_from = floor_projection(dpp_from, rho_from, phi_from);
        let floor_to = floor_projection(dpp_to, rho_to, phi_to);
        let distance = (floor_from - floor_to).norm();

        // Both twists are referred to the pixel-frame segment joining the
        // centers; the `to` side is measured from the far end (offset π).
        let segment = to.center - from.center;
        let segment_angle = segment.y.atan2(segment.x);
        let from_twist = normalize_angle(from.twist - segment_angle);
        let to_twist = normalize_angle(to.twist + PI - segment_angle);

        let obs = &mut self.observations[obs_id.index()];
        if from.id < to.id {
            obs.update(from_twist, distance, to_twist, goodness);
        } else {
            // The stored edge is canonically ordered; the detections
            // arrived reversed, so the twists change sides.
            obs.update(to_twist, distance, from_twist, goodness);
        }
        debug!(
            "updated {} <-> {}: distance={distance:.3} goodness={goodness:.3}",
            from.id, to.id
        );
        self.is_changed = true;
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pose propagation
    // ─────────────────────────────────────────────────────────────────────────

    /// Recompute every reachable marker's absolute pose.
    ///
    /// No-op unless the graph changed since the last call. The lowest-id
    /// marker is pinned at (0, 0, 0); a spanning tree grows from it by
    /// repeatedly taking the shortest unvisited frontier edge (distance
    /// ties prefer the endpoint closest to the origin in hops), and each
    /// tree edge assigns the newly reached marker's pose from its
    /// parent's. Markers in components not connected to the origin keep
    /// their previous pose.
    pub fn update(&mut self) {
        if !self.is_changed {
            return;
        }
        self.visit += 1;
        let visit = self.visit;

        // Lowest id becomes the origin.
        self.marker_order.sort();
        let Some(&origin_id) = self.marker_order.first() else {
            self.is_changed = false;
            return;
        };

        let mut frontier: Vec<ObservationId> = {
            let origin = self
                .markers
                .get_mut(&origin_id)
                .expect("ordered ids always resolve");
            origin.x = 0.0;
            origin.y = 0.0;
            origin.twist = 0.0;
            origin.hop_count = 0;
            origin.visit = visit;
            origin.edges.clone()
        };

        // Keep the frontier sorted longest-first so the tail is always
        // the best edge to take next.
        self.sort_frontier(&mut frontier);

        let mut tree_edges = 0usize;
        while let Some(obs_id) = frontier.pop() {
            {
                let obs = &mut self.observations[obs_id.index()];
                if obs.visit == visit {
                    continue;
                }
                obs.visit = visit;
            }

            let (from_id, to_id) = self.observations[obs_id.index()].key();
            let from_is_new = self.markers[&from_id].visit != visit;
            let to_is_new = self.markers[&to_id].visit != visit;
            match (from_is_new, to_is_new) {
                (false, false) => {
                    // Both endpoints already in the tree: cross edge.
                    self.observations[obs_id.index()].in_tree = false;
                }
                (true, false) => {
                    self.grow_tree(to_id, from_id, obs_id, visit, &mut frontier);
                    tree_edges += 1;
                }
                (false, true) => {
                    self.grow_tree(from_id, to_id, obs_id, visit, &mut frontier);
                    tree_edges += 1;
                }
                (true, true) => {
                    // Frontier edges always touch a visited marker.
                    unreachable!("frontier edge {obs_id} has two unvisited endpoints");
                }
            }
        }

        debug!(
            "pose propagation: origin={origin_id}, {tree_edges} tree edges, {} markers, {} observations",
            self.markers.len(),
            self.observations.len()
        );
        self.is_changed = false;
    }

    /// Extend the spanning tree over `obs_id` from `parent_id` to the
    /// newly reached `child_id`.
    fn grow_tree(
        &mut self,
        parent_id: MarkerId,
        child_id: MarkerId,
        obs_id: ObservationId,
        visit: u64,
        frontier: &mut Vec<ObservationId>,
    ) {
        let parent_hop = self.markers[&parent_id].hop_count;
        if let Some(child) = self.markers.get_mut(&child_id) {
            child.hop_count = parent_hop + 1;
            child.visit = visit;
            frontier.extend_from_slice(&child.edges);
        }
        self.observations[obs_id.index()].in_tree = true;
        self.assign_pose_via_edge(parent_id, child_id, obs_id);
        self.sort_frontier(frontier);
    }

    /// Compose the child's pose from the parent's across one tree edge.
    ///
    /// With `A` the world bearing of the from->to segment, the stored
    /// twists satisfy `from_twist = from.twist - A` and
    /// `to_twist = to.twist + π - A`. The π folded into `to_twist` makes
    /// the twist composition symmetric in the two endpoints, at the cost
    /// of assigned twists carrying a π offset on odd tree depths; the
    /// bearing compensates with the parent's hop parity. From either
    /// side the child ends up at `distance` along the true direction to
    /// it, and the twist rule `parent − parent_side + child_side`
    /// applies unchanged whichever endpoint is the parent.
    fn assign_pose_via_edge(
        &mut self,
        parent_id: MarkerId,
        child_id: MarkerId,
        obs_id: ObservationId,
    ) {
        let obs = &self.observations[obs_id.index()];
        let (parent_side, child_side) = if parent_id == obs.from {
            (obs.from_twist, obs.to_twist)
        } else {
            (obs.to_twist, obs.from_twist)
        };
        let distance = obs.distance;

        let parent = &self.markers[&parent_id];
        let parity = if parent.hop_count % 2 == 1 { PI } else { 0.0 };
        let bearing = normalize_angle(parent.twist - parent_side + parity);
        let x = parent.x + distance * bearing.cos();
        let y = parent.y + distance * bearing.sin();
        let twist = normalize_angle(parent.twist - parent_side + child_side);

        if let Some(child) = self.markers.get_mut(&child_id) {
            child.x = x;
            child.y = y;
            child.twist = twist;
            let announcement = MarkerAnnouncement {
                id: child_id,
                x,
                y,
                z: child.z,
                twist,
                dx: child.world_size(),
                dy: child.world_size(),
                dz: 0.0,
            };
            if let Some(announce) = self.announce.as_mut() {
                announce(&announcement);
            }
        }
    }

    fn sort_frontier(&self, frontier: &mut [ObservationId]) {
        frontier.sort_by(|&a, &b| {
            let obs_a = &self.observations[a.index()];
            let obs_b = &self.observations[b.index()];
            obs_a.distance_compare(obs_b, self.min_hop(obs_a), self.min_hop(obs_b))
        });
    }

    fn min_hop(&self, obs: &Observation) -> u32 {
        self.markers[&obs.from]
            .hop_count
            .min(self.markers[&obs.to].hop_count)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ordering and comparison
    // ─────────────────────────────────────────────────────────────────────────

    /// Reorder the marker and observation lists into canonical order:
    /// markers ascending by id, observations ascending by id pair.
    pub fn sort(&mut self) {
        self.marker_order.sort();
        let observations = &self.observations;
        self.observation_order
            .sort_by(|a, b| observations[a.index()].compare(&observations[b.index()]));
    }

    /// Structural comparison in current list order: marker counts, then
    /// marker ids pairwise, then observation counts, then id pairs
    /// pairwise. `sort` both maps first for an order-independent answer.
    pub fn compare(&self, other: &Self) -> Ordering {
        let by_markers = self
            .marker_order
            .len()
            .cmp(&other.marker_order.len())
            .then_with(|| self.marker_order.cmp(&other.marker_order));
        if by_markers != Ordering::Equal {
            return by_markers;
        }

        self.observation_order
            .len()
            .cmp(&other.observation_order.len())
            .then_with(|| {
                for (a, b) in self
                    .observation_order
                    .iter()
                    .zip(&other.observation_order)
                {
                    let ordering = self.observations[a.index()]
                        .compare(&other.observations[b.index()]);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            })
    }
}

impl Default for MarkerMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerMap")
            .field("num_markers", &self.markers.len())
            .field("num_observations", &self.observations.len())
            .field("visit", &self.visit)
            .field("is_changed", &self.is_changed)
            .finish()
    }
}
