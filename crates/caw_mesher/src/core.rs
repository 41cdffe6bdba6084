//! Core type definitions: vertex record, face groups and the face template.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use half::f16;

use crate::error::{MeshError, Result};

/// Half extent of the unit cube a template is authored around.
pub const HALF_EXTENT: f32 = 0.5;

/// Size of one vertex record in bytes (no padding).
pub const VERTEX_SIZE: usize = std::mem::size_of::<Vertex>();

/// One template vertex.
///
/// Memory layout (28 bytes, `#[repr(C)]`, no padding):
/// - position: 3 × binary16
/// - normal: 3 × binary16
/// - tangent: 4 × binary16
/// - color: 4 × u8 (RGBA)
/// - uv: 2 × binary16
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f16; 3],
    pub normal: [f16; 3],
    pub tangent: [f16; 4],
    pub color: [u8; 4],
    pub uv: [f16; 2],
}

const _: () = assert!(VERTEX_SIZE == 28);

impl Vertex {
    /// Build a vertex from full-precision attributes (rounded to binary16).
    pub fn from_f32(
        position: [f32; 3],
        normal: [f32; 3],
        tangent: [f32; 4],
        color: [u8; 4],
        uv: [f32; 2],
    ) -> Self {
        Self {
            position: position.map(f16::from_f32),
            normal: normal.map(f16::from_f32),
            tangent: tangent.map(f16::from_f32),
            color,
            uv: uv.map(f16::from_f32),
        }
    }

    /// Vertex with only a position set; all other attributes zero.
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position: position.map(f16::from_f32),
            ..Self::default()
        }
    }

    #[inline]
    pub fn position_f32(&self) -> [f32; 3] {
        self.position.map(f16::to_f32)
    }

    /// Copy of this vertex moved by an integer voxel offset.
    ///
    /// The sum is rounded back to binary16, so only attributes other than the
    /// position are carried bit-for-bit. From 1024 upwards half-voxel
    /// positions no longer round-trip, and past 65504 they overflow to infinity.
    #[inline]
    pub fn translated(&self, offset: [usize; 3]) -> Self {
        let mut out = *self;
        for axis in 0..3 {
            let moved = self.position[axis].to_f32() + offset[axis] as f32;
            out.position[axis] = f16::from_f32(moved);
        }
        out
    }
}

/// The seven face groups of a template.
///
/// The declaration order is the on-disk order of the `.caw` header and vertex
/// blocks, and the order in which the assembler lays a voxel's groups out in
/// the output buffer.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceGroup {
    PosX = 0,
    PosY = 1,
    PosZ = 2,
    NegX = 3,
    NegY = 4,
    NegZ = 5,
    /// Triangles not lying on any cube face.
    Remain = 6,
}

impl FaceGroup {
    /// Number of groups.
    pub const COUNT: usize = 7;

    /// All groups in canonical order.
    pub const ALL: [FaceGroup; Self::COUNT] = [
        FaceGroup::PosX,
        FaceGroup::PosY,
        FaceGroup::PosZ,
        FaceGroup::NegX,
        FaceGroup::NegY,
        FaceGroup::NegZ,
        FaceGroup::Remain,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Axis (0 = x, 1 = y, 2 = z) and sign of the face normal, `None` for `Remain`.
    #[inline]
    pub const fn axis(self) -> Option<(usize, i8)> {
        match self {
            FaceGroup::PosX => Some((0, 1)),
            FaceGroup::PosY => Some((1, 1)),
            FaceGroup::PosZ => Some((2, 1)),
            FaceGroup::NegX => Some((0, -1)),
            FaceGroup::NegY => Some((1, -1)),
            FaceGroup::NegZ => Some((2, -1)),
            FaceGroup::Remain => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FaceGroup::PosX => "+X",
            FaceGroup::PosY => "+Y",
            FaceGroup::PosZ => "+Z",
            FaceGroup::NegX => "-X",
            FaceGroup::NegY => "-Y",
            FaceGroup::NegZ => "-Z",
            FaceGroup::Remain => "REMAIN",
        }
    }
}

impl fmt::Display for FaceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit-cube face template: one triangle list per face group.
///
/// Counts are always derived from the stored sequences.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Template {
    groups: [Vec<Vertex>; FaceGroup::COUNT],
}

impl Template {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a template from per-group vertex lists in canonical order.
    pub fn from_groups(groups: [Vec<Vertex>; FaceGroup::COUNT]) -> Self {
        Self { groups }
    }

    /// Vertices of a group.
    #[inline]
    pub fn group(&self, group: FaceGroup) -> &[Vertex] {
        &self.groups[group.index()]
    }

    /// Append one triangle to a group.
    pub fn push_triangle(&mut self, group: FaceGroup, triangle: [Vertex; 3]) {
        self.groups[group.index()].extend_from_slice(&triangle);
    }

    /// Vertex count of a group.
    #[inline]
    pub fn count(&self, group: FaceGroup) -> usize {
        self.groups[group.index()].len()
    }

    /// Vertex counts of all groups in canonical order.
    pub fn counts(&self) -> [usize; FaceGroup::COUNT] {
        FaceGroup::ALL.map(|group| self.count(group))
    }

    /// Total vertices over all groups.
    pub fn total_vertices(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Check if every group is empty.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// Iterate `(group, vertices)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (FaceGroup, &[Vertex])> + '_ {
        FaceGroup::ALL
            .into_iter()
            .map(move |group| (group, self.group(group)))
    }

    /// Consume the template, returning its groups.
    pub fn into_groups(self) -> [Vec<Vertex>; FaceGroup::COUNT] {
        self.groups
    }

    /// Check that every group holds whole triangles.
    pub fn validate(&self) -> Result<()> {
        for (group, vertices) in self.iter() {
            if vertices.len() % 3 != 0 {
                return Err(MeshError::invalid(format!(
                    "template group {group} has {} vertices, not a whole number of triangles",
                    vertices.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_has_no_padding() {
        assert_eq!(VERTEX_SIZE, 28);
        assert_eq!(std::mem::align_of::<Vertex>(), 2);
    }

    #[test]
    fn group_order_is_canonical() {
        for (i, group) in FaceGroup::ALL.iter().enumerate() {
            assert_eq!(group.index(), i);
            assert_eq!(FaceGroup::from_index(i), Some(*group));
        }
        assert_eq!(FaceGroup::from_index(7), None);
        let labels: Vec<_> = FaceGroup::ALL.iter().map(|g| g.label()).collect();
        assert_eq!(labels, ["+X", "+Y", "+Z", "-X", "-Y", "-Z", "REMAIN"]);
    }

    #[test]
    fn group_axes() {
        assert_eq!(FaceGroup::PosY.axis(), Some((1, 1)));
        assert_eq!(FaceGroup::NegX.axis(), Some((0, -1)));
        assert_eq!(FaceGroup::Remain.axis(), None);
    }

    #[test]
    fn translated_moves_position_only() {
        let v = Vertex::from_f32(
            [0.5, -0.5, 0.25],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0, -1.0],
            [10, 20, 30, 255],
            [0.75, 0.125],
        );
        let moved = v.translated([3, 1, 2]);
        assert_eq!(moved.position_f32(), [3.5, 0.5, 2.25]);
        assert_eq!(moved.normal, v.normal);
        assert_eq!(moved.tangent, v.tangent);
        assert_eq!(moved.color, v.color);
        assert_eq!(moved.uv, v.uv);
    }

    #[test]
    fn translated_precision_limits() {
        let v = Vertex::at([0.5, -0.5, 0.0]);
        assert_eq!(v.translated([1023, 1023, 0]).position_f32(), [1023.5, 1022.5, 0.0]);

        // Spacing is 1.0 in [1024, 2048) and 2.0 in [2048, 4096)
        assert_ne!(v.translated([1025, 0, 0]).position_f32()[0], 1025.5);
        assert_eq!(v.translated([2049, 0, 0]).position_f32()[0], 2050.0);
        assert!(v.translated([70000, 0, 0]).position_f32()[0].is_infinite());
    }

    #[test]
    fn template_counts() {
        let mut template = Template::new();
        assert!(template.is_empty());

        let tri = [Vertex::at([0.5, 0.0, 0.0]); 3];
        template.push_triangle(FaceGroup::PosX, tri);
        template.push_triangle(FaceGroup::PosX, tri);
        template.push_triangle(FaceGroup::Remain, tri);

        assert_eq!(template.count(FaceGroup::PosX), 6);
        assert_eq!(template.count(FaceGroup::Remain), 3);
        assert_eq!(template.counts(), [6, 0, 0, 0, 0, 0, 3]);
        assert_eq!(template.total_vertices(), 9);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn template_rejects_partial_triangles() {
        let mut groups: [Vec<Vertex>; FaceGroup::COUNT] = Default::default();
        groups[FaceGroup::NegZ.index()] = vec![Vertex::default(); 4];
        let template = Template::from_groups(groups);

        let err = template.validate().unwrap_err();
        assert!(matches!(err, MeshError::InvalidInput(_)));
        assert!(err.to_string().contains("-Z"));
    }
}
