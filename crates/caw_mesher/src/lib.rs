//! Template-instancing voxel mesher.
//!
//! An authored cube mesh is split into seven face groups (one per cube face
//! plus the interior remainder) and stored as a `.caw` template. Meshing a
//! voxel field instances the template at every solid voxel, dropping the face
//! groups a [`VisibilityPolicy`] culls against solid neighbors.
//!
//! # Example
//!
//! ```
//! use caw_mesher::{
//!     classify_triangles, decode, encode, FaceGroup, MeshAssembler, Vertex,
//!     VisibilityPolicy, VoxelField,
//! };
//!
//! // One triangle on the +X face of the unit cube
//! let triangle = [
//!     Vertex::at([0.5, -0.5, -0.5]),
//!     Vertex::at([0.5, 0.5, -0.5]),
//!     Vertex::at([0.5, 0.5, 0.5]),
//! ];
//! let template = classify_triangles(&triangle).unwrap();
//! assert_eq!(template.count(FaceGroup::PosX), 3);
//!
//! let bytes = encode(&template).unwrap();
//! let template = decode(&bytes).unwrap();
//!
//! let field = VoxelField::from_fn([4, 4, 4], |_, y, _| y == 0);
//! let mesh = MeshAssembler::new(&template, VisibilityPolicy::inset_cube())
//!     .assemble(&field)
//!     .unwrap();
//! assert_eq!(mesh.triangle_count(), 16); // +X is emitted by every solid voxel
//! ```

pub mod assemble;
pub mod classify;
pub mod codec;
pub mod core;
pub mod error;
pub mod field;
pub mod mesh;
pub mod visibility;

// Re-export primary types
pub use crate::core::{FaceGroup, Template, Vertex, HALF_EXTENT, VERTEX_SIZE};
pub use crate::error::{FormatError, MeshError, Result};
pub use crate::field::{VoxelField, DEFAULT_DENSITY_THRESHOLD, EMPTY, SOLID};
pub use crate::mesh::{Aabb, MeshBuffers, MeshStats};
pub use crate::visibility::{FaceRule, VisibilityPolicy};

// Re-export main entry points
pub use crate::assemble::{
    assemble_async, AssemblerConfig, MeshAssembler, OffsetTable, MAX_EXACT_EXTENT,
};
pub use crate::classify::{classify_indexed, classify_triangle, classify_triangles};
pub use crate::codec::{decode, encode, read_template, write_template, FORMAT_VERSION, MAGIC};
pub use crate::mesh::{build_mesh, build_mesh_from_file};
