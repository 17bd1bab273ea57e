/*!
Spatial index and narrow-phase tolerances.

Keeping these together makes tuning easier and keeps the octree build and the
contact tests consistent with each other.

Notes
- Distances are in meters.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

/// Nodes holding more triangles than this are split into octants.
pub const LEAF_THRESHOLD: usize = 8;

/// Maximum split depth below the root.
pub const MAX_DEPTH: u32 = 16;

/// Consecutive splits that leave a child with every triangle of its parent
/// before splitting stops. Large triangles overlapping in one region would
/// otherwise be duplicated into every octant down to `MAX_DEPTH`.
pub const MAX_STALLED_SPLITS: u32 = 3;

/// Outward shift of the root box's minimum corner, keeping grid-aligned
/// geometry off the split planes.
pub const ROOT_BOX_EPSILON: f32 = 0.01;

/// Octant boxes are loosened by this much when assigning triangles, so float
/// error on shared faces never drops a triangle from both neighbors.
pub const OCTANT_SLOP: f32 = 1.0e-4;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Squared-length floor under which a direction is treated as zero.
pub const NORMAL_EPS_SQ: f32 = 1.0e-12;
