//! # Sort Key Packing
//!
//! Packs (depth, material, mesh, priority) into a single 64-bit integer whose
//! natural ordering defines the draw batching order:
//!
//! ```text
//! bits [63:32]  depth (monotonic bit-reinterpretation of view-space depth)
//! bits [31:16]  material identifier
//! bits [15:8]   mesh/geometry identifier
//! bits [7:0]    priority (255 reserved for always-on-top overlay primitives)
//! ```
//!
//! Comparing two keys as plain integers orders primarily by depth, then
//! material, then mesh, then priority. The radix sorter and the
//! material-batched executor both rely on exactly this total order.

use super::device::{MaterialId, MeshId};

/// Priority value reserved for "draw last / ignore depth" overlay primitives
///
/// Overlay keys built through [`SortKey::overlay`] also force the depth field
/// to its maximum, so they sort strictly after all depth-ordered geometry.
pub const PRIORITY_OVERLAY: u8 = 255;

const DEPTH_SHIFT: u32 = 32;
const MATERIAL_SHIFT: u32 = 16;
const MESH_SHIFT: u32 = 8;

/// Packed 64-bit batching key for a draw command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SortKey(u64);

impl SortKey {
    /// Key used by commands that do not participate in draw sorting
    pub const ZERO: Self = Self(0);

    /// Pack the four batching fields into a key
    ///
    /// Pure and total: every input tuple produces a valid key, and the field
    /// accessors invert it exactly.
    #[must_use]
    pub const fn pack(depth_bits: u32, material: MaterialId, mesh: MeshId, priority: u8) -> Self {
        Self(
            (depth_bits as u64) << DEPTH_SHIFT
                | (material.0 as u64) << MATERIAL_SHIFT
                | (mesh.0 as u64) << MESH_SHIFT
                | priority as u64,
        )
    }

    /// Build a key for a depth-sorted draw from a view-space depth value
    #[must_use]
    pub fn for_draw(depth: f32, material: MaterialId, mesh: MeshId, priority: u8) -> Self {
        Self::pack(depth_to_bits(depth), material, mesh, priority)
    }

    /// Build a key for an always-on-top overlay primitive
    ///
    /// The depth field is forced to `u32::MAX` and the priority byte to
    /// [`PRIORITY_OVERLAY`], so overlay draws sort after all normal geometry
    /// regardless of their actual view-space depth.
    #[must_use]
    pub const fn overlay(material: MaterialId, mesh: MeshId) -> Self {
        Self::pack(u32::MAX, material, mesh, PRIORITY_OVERLAY)
    }

    /// Depth field, bits [63:32]
    #[must_use]
    pub const fn depth_bits(self) -> u32 {
        (self.0 >> DEPTH_SHIFT) as u32
    }

    /// Material identifier field, bits [31:16]
    #[must_use]
    pub const fn material_id(self) -> MaterialId {
        MaterialId((self.0 >> MATERIAL_SHIFT) as u16)
    }

    /// Mesh identifier field, bits [15:8]
    #[must_use]
    pub const fn mesh_id(self) -> MeshId {
        MeshId((self.0 >> MESH_SHIFT) as u8)
    }

    /// Priority field, bits [7:0]
    #[must_use]
    pub const fn priority(self) -> u8 {
        self.0 as u8
    }

    /// The raw packed integer, as consumed by the radix sorter
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Map a view-space depth to an unsigned integer preserving float ordering
///
/// Uses the sign-flip bit trick: positive floats get the sign bit set,
/// negative floats are bit-inverted. For any two finite depths `a < b`,
/// `depth_to_bits(a) < depth_to_bits(b)`.
#[must_use]
pub fn depth_to_bits(depth: f32) -> u32 {
    let bits = depth.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_round_trip() {
        let key = SortKey::pack(0xDEAD_BEEF, MaterialId(0x1234), MeshId(0x56), 0x78);
        assert_eq!(key.depth_bits(), 0xDEAD_BEEF);
        assert_eq!(key.material_id(), MaterialId(0x1234));
        assert_eq!(key.mesh_id(), MeshId(0x56));
        assert_eq!(key.priority(), 0x78);
    }

    #[test]
    fn test_round_trip_extremes() {
        for (depth, material, mesh, priority) in [
            (0u32, MaterialId(0), MeshId(0), 0u8),
            (u32::MAX, MaterialId(u16::MAX), MeshId(u8::MAX), u8::MAX),
            (1, MaterialId(1), MeshId(1), 1),
        ] {
            let key = SortKey::pack(depth, material, mesh, priority);
            assert_eq!(key.depth_bits(), depth);
            assert_eq!(key.material_id(), material);
            assert_eq!(key.mesh_id(), mesh);
            assert_eq!(key.priority(), priority);
        }
    }

    #[test]
    fn test_depth_dominates_ordering() {
        // Lower depth must sort first even when all other fields are maxed
        let near = SortKey::pack(10, MaterialId(u16::MAX), MeshId(u8::MAX), u8::MAX);
        let far = SortKey::pack(11, MaterialId(0), MeshId(0), 0);
        assert!(near < far);
    }

    #[test]
    fn test_depth_ties_break_by_material_then_mesh_then_priority() {
        let a = SortKey::pack(5, MaterialId(1), MeshId(200), 200);
        let b = SortKey::pack(5, MaterialId(2), MeshId(0), 0);
        assert!(a < b);

        let c = SortKey::pack(5, MaterialId(2), MeshId(1), 200);
        let d = SortKey::pack(5, MaterialId(2), MeshId(2), 0);
        assert!(c < d);

        let e = SortKey::pack(5, MaterialId(2), MeshId(2), 1);
        let f = SortKey::pack(5, MaterialId(2), MeshId(2), 2);
        assert!(e < f);
    }

    #[test]
    fn test_depth_to_bits_monotonic() {
        let depths = [-1000.0f32, -2.5, -0.0, 0.0, 0.001, 1.0, 2.5, 1000.0];
        for window in depths.windows(2) {
            assert!(
                depth_to_bits(window[0]) <= depth_to_bits(window[1]),
                "ordering broken between {} and {}",
                window[0],
                window[1]
            );
        }
        assert!(depth_to_bits(-2.5) < depth_to_bits(2.5));
    }

    #[test]
    fn test_overlay_sorts_after_all_normal_geometry() {
        let farthest = SortKey::for_draw(f32::MAX, MaterialId(u16::MAX), MeshId(u8::MAX), 254);
        let overlay = SortKey::overlay(MaterialId(0), MeshId(0));
        assert!(overlay > farthest);
        assert_eq!(overlay.priority(), PRIORITY_OVERLAY);
        assert_eq!(overlay.depth_bits(), u32::MAX);
    }
}
