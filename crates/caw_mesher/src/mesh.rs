//! Mesh output and the top-level meshing pipeline.
//!
//! Orchestrates the complete process:
//! 1. Load or receive a face template
//! 2. Validate the voxel field
//! 3. Assemble (count pass, prefix sum, write pass)

use std::path::Path;

use glam::Vec3;

use crate::assemble::{AssemblerConfig, MeshAssembler};
use crate::codec::read_template;
use crate::core::{FaceGroup, Template, Vertex};
use crate::error::Result;
use crate::field::VoxelField;
use crate::visibility::VisibilityPolicy;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box around a single point.
    #[inline]
    pub fn from_point(point: Vec3) -> Self {
        Self { min: point, max: point }
    }

    /// Grow to include a point.
    #[inline]
    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Smallest box holding both boxes.
    #[inline]
    pub fn union(self, other: Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Fold optional partial boxes (used when reducing per-partition bounds).
    pub fn merge(a: Option<Aabb>, b: Option<Aabb>) -> Option<Aabb> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Packed, non-indexed triangle list ready for upload.
///
/// `indices[k] == k` for every slot; the index buffer only exists so the mesh
/// can go through indexed-draw APIs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Bounds of all written positions, `None` for an empty mesh.
    pub bounds: Option<Aabb>,
}

impl MeshBuffers {
    /// Number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Raw vertex bytes for a GPU vertex buffer.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for a GPU index buffer (u32).
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Vertex positions widened to f32 (3 floats per vertex).
    pub fn positions_f32(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| v.position.map(|c| c.to_f32()))
            .collect()
    }

    /// Vertex normals widened to f32 (3 floats per vertex).
    pub fn normals_f32(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| v.normal.map(|c| c.to_f32()))
            .collect()
    }

    /// Vertex tangents widened to f32 (4 floats per vertex).
    pub fn tangents_f32(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| v.tangent.map(|c| c.to_f32()))
            .collect()
    }

    /// UV coordinates widened to f32 (2 floats per vertex).
    pub fn uvs_f32(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| v.uv.map(|c| c.to_f32()))
            .collect()
    }

    /// Vertex colors (4 bytes per vertex, RGBA).
    pub fn colors(&self) -> Vec<u8> {
        self.vertices.iter().flat_map(|v| v.color).collect()
    }
}

/// Statistics about an assembly run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshStats {
    /// Voxels in the field
    pub voxel_count: usize,
    /// Solid voxels
    pub solid_voxels: usize,
    /// Voxels that emitted each group, in canonical group order
    pub groups_emitted: [usize; FaceGroup::COUNT],
    /// Voxels that skipped each group (solid voxels only)
    pub groups_culled: [usize; FaceGroup::COUNT],
    /// Total vertices
    pub vertex_count: usize,
    /// Total triangles
    pub triangle_count: usize,
}

impl MeshStats {
    /// Fraction of potential face group instances that were culled.
    pub fn cull_ratio(&self) -> f32 {
        let culled: usize = self.groups_culled.iter().sum();
        let emitted: usize = self.groups_emitted.iter().sum();
        let total = culled + emitted;
        if total > 0 {
            culled as f32 / total as f32
        } else {
            0.0
        }
    }
}

/// Mesh a voxel field with a template using the default configuration.
///
/// # Example
/// ```
/// use caw_mesher::{build_mesh, FaceGroup, Template, Vertex, VisibilityPolicy, VoxelField};
///
/// let mut template = Template::new();
/// template.push_triangle(FaceGroup::Remain, [Vertex::at([0.0, 0.0, 0.0]); 3]);
///
/// let mut field = VoxelField::new([2, 2, 2]);
/// field.set_solid(1, 1, 1, true);
///
/// let mesh = build_mesh(&template, &field, VisibilityPolicy::inset_cube()).unwrap();
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.indices, vec![0, 1, 2]);
/// ```
pub fn build_mesh(
    template: &Template,
    field: &VoxelField,
    policy: VisibilityPolicy,
) -> Result<MeshBuffers> {
    MeshAssembler::new(template, policy).assemble(field)
}

/// Load a `.caw` template from disk and mesh `field` with it.
///
/// A missing or malformed template aborts the whole build; no mesh is
/// produced.
pub fn build_mesh_from_file(
    path: impl AsRef<Path>,
    field: &VoxelField,
    policy: VisibilityPolicy,
    config: AssemblerConfig,
) -> Result<MeshBuffers> {
    let template = read_template(path)?;
    MeshAssembler::new(&template, policy)
        .with_config(config)
        .assemble(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{template_file_name, write_template};
    use crate::error::MeshError;

    #[test]
    fn aabb_merge() {
        let mut a = Aabb::from_point(Vec3::new(1.0, 2.0, 3.0));
        a.include(Vec3::new(-1.0, 5.0, 3.0));
        assert_eq!(a.min, Vec3::new(-1.0, 2.0, 3.0));
        assert_eq!(a.max, Vec3::new(1.0, 5.0, 3.0));

        let b = Aabb::from_point(Vec3::new(0.0, 0.0, 10.0));
        let merged = Aabb::merge(Some(a), Some(b)).unwrap();
        assert_eq!(merged.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(merged.max, Vec3::new(1.0, 5.0, 10.0));
        assert_eq!(Aabb::merge(None, Some(b)), Some(b));
        assert_eq!(Aabb::merge(None, None), None);
        assert_eq!(merged.size(), Vec3::new(2.0, 5.0, 7.0));
        assert_eq!(merged.center(), Vec3::new(0.0, 2.5, 6.5));
    }

    #[test]
    fn mesh_buffers_attribute_streams() {
        let v = Vertex::from_f32(
            [1.0, 2.0, 3.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 1.0],
            [9, 8, 7, 6],
            [0.5, 0.25],
        );
        let mesh = MeshBuffers {
            vertices: vec![v; 3],
            indices: vec![0, 1, 2],
            bounds: None,
        };
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(&mesh.positions_f32()[..3], &[1.0f32, 2.0, 3.0]);
        assert_eq!(mesh.normals_f32().len(), 9);
        assert_eq!(mesh.tangents_f32().len(), 12);
        assert_eq!(&mesh.uvs_f32()[..2], &[0.5f32, 0.25]);
        assert_eq!(&mesh.colors()[..4], &[9u8, 8, 7, 6]);
        assert_eq!(mesh.vertex_bytes().len(), 3 * 28);
        assert_eq!(mesh.index_bytes().len(), 12);
    }

    #[test]
    fn cull_ratio() {
        let stats = MeshStats {
            groups_emitted: [1, 1, 1, 1, 0, 0, 0],
            groups_culled: [0, 0, 0, 0, 2, 2, 0],
            ..Default::default()
        };
        assert!((stats.cull_ratio() - 0.5).abs() < 1e-6);
        assert_eq!(MeshStats::default().cull_ratio(), 0.0);
    }

    #[test]
    fn build_from_file() {
        let dir = std::env::temp_dir().join(format!("caw_mesh_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(template_file_name("Tri"));

        let mut template = Template::new();
        template.push_triangle(FaceGroup::PosX, [Vertex::at([0.5, 0.0, 0.0]); 3]);
        write_template(&path, &template).unwrap();

        let mut field = VoxelField::new([2, 1, 1]);
        field.set_solid(1, 0, 0, true);
        let mesh = build_mesh_from_file(
            &path,
            &field,
            VisibilityPolicy::inset_cube(),
            AssemblerConfig::default(),
        )
        .unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions_f32()[0], 1.5);

        std::fs::remove_file(&path).unwrap();
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn missing_template_aborts_build() {
        let field = VoxelField::new([2, 2, 2]);
        let result = build_mesh_from_file(
            "does/not/exist/InsetCube.caw",
            &field,
            VisibilityPolicy::default(),
            AssemblerConfig::default(),
        );
        assert!(matches!(result, Err(MeshError::Io { .. })));
    }
}
