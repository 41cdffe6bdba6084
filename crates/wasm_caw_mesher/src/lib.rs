//! WASM bindings for the CAW template mesher.
//!
//! Provides JavaScript-accessible functions for decoding `.caw` templates,
//! classifying authored cube meshes and meshing voxel grids.

use wasm_bindgen::prelude::*;
use caw_mesher::codec::read_header;
use caw_mesher::{
    classify_indexed, decode, encode, AssemblerConfig, FaceGroup, MeshAssembler, MeshBuffers,
    MeshError, Template, Vertex, VisibilityPolicy, VoxelField, FORMAT_VERSION,
};

/// Mesh result returned to JavaScript.
///
/// Contains vertex data ready for use with Three.js BufferGeometry.
#[wasm_bindgen]
pub struct MeshResult {
    vertices: Vec<Vertex>,
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    colors: Vec<u8>,
    indices: Vec<u32>,
    bounds: Vec<f32>,
}

#[wasm_bindgen]
impl MeshResult {
    /// Get vertex positions (3 floats per vertex).
    #[wasm_bindgen(getter)]
    pub fn positions(&self) -> Vec<f32> {
        self.positions.clone()
    }

    /// Get vertex normals (3 floats per vertex).
    #[wasm_bindgen(getter)]
    pub fn normals(&self) -> Vec<f32> {
        self.normals.clone()
    }

    /// Get UV coordinates (2 floats per vertex).
    #[wasm_bindgen(getter)]
    pub fn uvs(&self) -> Vec<f32> {
        self.uvs.clone()
    }

    /// Get vertex colors (4 bytes per vertex, RGBA).
    #[wasm_bindgen(getter)]
    pub fn colors(&self) -> Vec<u8> {
        self.colors.clone()
    }

    /// Get triangle indices.
    #[wasm_bindgen(getter)]
    pub fn indices(&self) -> Vec<u32> {
        self.indices.clone()
    }

    /// Packed 28-byte vertex records for a WebGPU vertex buffer.
    #[wasm_bindgen(getter)]
    pub fn interleaved(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices).to_vec()
    }

    /// Bounding box as `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    /// Returns empty array for an empty mesh.
    #[wasm_bindgen(getter)]
    pub fn bounds(&self) -> Vec<f32> {
        self.bounds.clone()
    }

    /// Number of vertices in the mesh.
    #[wasm_bindgen(getter)]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles in the mesh.
    #[wasm_bindgen(getter)]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh is empty (no geometry).
    #[wasm_bindgen(getter)]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl From<MeshBuffers> for MeshResult {
    fn from(mesh: MeshBuffers) -> Self {
        let bounds = mesh
            .bounds
            .map(|b| [b.min.to_array(), b.max.to_array()].concat())
            .unwrap_or_default();
        Self {
            positions: mesh.positions_f32(),
            normals: mesh.normals_f32(),
            uvs: mesh.uvs_f32(),
            colors: mesh.colors(),
            bounds,
            indices: mesh.indices,
            vertices: mesh.vertices,
        }
    }
}

/// Header summary of a `.caw` template.
#[wasm_bindgen]
pub struct TemplateInfo {
    version: u8,
    counts: Vec<u32>,
}

#[wasm_bindgen]
impl TemplateInfo {
    #[wasm_bindgen(getter)]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Vertex counts as [+X, +Y, +Z, -X, -Y, -Z, REMAIN].
    #[wasm_bindgen(getter)]
    pub fn counts(&self) -> Vec<u32> {
        self.counts.clone()
    }

    /// Sum of all counts. Seven maximal `i32` counts exceed `u32`, so the sum
    /// is returned as a JS number (exact below 2^53).
    #[wasm_bindgen(getter)]
    pub fn total_vertices(&self) -> f64 {
        self.counts.iter().map(|&c| u64::from(c)).sum::<u64>() as f64
    }
}

/// Read the header of a `.caw` template without decoding the vertex blocks.
///
/// # Example (JavaScript)
/// ```javascript
/// const bytes = new Uint8Array(await (await fetch("InsetCube.caw")).arrayBuffer());
/// const info = decode_template_info(bytes);
/// console.log(info.counts);
/// ```
#[wasm_bindgen]
pub fn decode_template_info(bytes: &[u8]) -> Result<TemplateInfo, JsValue> {
    template_info(bytes).map_err(to_js)
}

/// Mesh a dense occupancy grid with a `.caw` template.
///
/// # Arguments
/// * `template_bytes` - Encoded `.caw` template
/// * `voxels` - Flat occupancy array (0 = empty, 255 = solid), X-major order
/// * `width`, `height`, `depth` - Grid dimensions
///
/// # Example (JavaScript)
/// ```javascript
/// const voxels = new Uint8Array(16 * 16 * 16);
/// voxels.fill(255); // All solid
/// const result = build_mesh(templateBytes, voxels, 16, 16, 16);
/// ```
#[wasm_bindgen]
pub fn build_mesh(
    template_bytes: &[u8],
    voxels: &[u8],
    width: u32,
    height: u32,
    depth: u32,
) -> Result<MeshResult, JsValue> {
    let dims = [width as usize, height as usize, depth as usize];
    let mesh = mesh_voxels(template_bytes, voxels.to_vec(), dims).map_err(to_js)?;
    log(&format!(
        "build_mesh: {} vertices for {}x{}x{} grid",
        mesh.vertex_count(),
        width,
        height,
        depth
    ));
    Ok(mesh.into())
}

/// Classify an authored unit cube mesh into a `.caw` template.
///
/// `normals` (3 floats per vertex) and `uvs` (2 floats per vertex) may be
/// empty; missing attributes default to zero.
#[wasm_bindgen]
pub fn classify_cube_mesh(
    positions: &[f32],
    normals: &[f32],
    uvs: &[f32],
    indices: &[u32],
) -> Result<Vec<u8>, JsValue> {
    let template = classify_arrays(positions, normals, uvs, indices).map_err(to_js)?;
    log(&format!("classify_cube_mesh: counts {:?}", template.counts()));
    encode(&template).map_err(to_js)
}

fn template_info(bytes: &[u8]) -> caw_mesher::Result<TemplateInfo> {
    // Header counts are non-negative i32 values, so they always fit a u32
    let counts = read_header(bytes)?.iter().map(|&c| c as u32).collect();
    Ok(TemplateInfo {
        version: FORMAT_VERSION,
        counts,
    })
}

fn mesh_voxels(
    template_bytes: &[u8],
    voxels: Vec<u8>,
    dims: [usize; 3],
) -> caw_mesher::Result<MeshBuffers> {
    let template = decode(template_bytes)?;
    let field = VoxelField::from_cells(dims, voxels)?;
    // No rayon thread pool in a plain wasm32 build
    MeshAssembler::new(&template, VisibilityPolicy::inset_cube())
        .with_config(AssemblerConfig::sequential())
        .assemble(&field)
}

fn classify_arrays(
    positions: &[f32],
    normals: &[f32],
    uvs: &[f32],
    indices: &[u32],
) -> caw_mesher::Result<Template> {
    if positions.len() % 3 != 0 {
        return Err(MeshError::InvalidInput(format!(
            "positions length {} is not a multiple of 3",
            positions.len()
        )));
    }
    let count = positions.len() / 3;
    if !normals.is_empty() && normals.len() != count * 3 {
        return Err(MeshError::InvalidInput(format!(
            "expected {} normal floats, got {}",
            count * 3,
            normals.len()
        )));
    }
    if !uvs.is_empty() && uvs.len() != count * 2 {
        return Err(MeshError::InvalidInput(format!(
            "expected {} uv floats, got {}",
            count * 2,
            uvs.len()
        )));
    }

    let vertices: Vec<Vertex> = (0..count)
        .map(|i| {
            let normal = if normals.is_empty() {
                [0.0; 3]
            } else {
                [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]]
            };
            let uv = if uvs.is_empty() {
                [0.0; 2]
            } else {
                [uvs[i * 2], uvs[i * 2 + 1]]
            };
            Vertex::from_f32(
                [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
                normal,
                [1.0, 0.0, 0.0, 1.0],
                [255; 4],
                uv,
            )
        })
        .collect();

    classify_indexed(&vertices, indices)
}

fn to_js(err: MeshError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// Logging support

thread_local! {
    static LOG_ENABLED: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

/// Enable or disable console logging.
#[wasm_bindgen]
pub fn set_log_enabled(enabled: bool) {
    LOG_ENABLED.with(|flag| flag.set(enabled));
}

fn log(message: &str) {
    if LOG_ENABLED.with(|enabled| enabled.get()) {
        web_sys::console::log_1(&message.into());
    }
}

/// Get the version of the mesher library.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Face group labels in header order, for display in the host UI.
#[wasm_bindgen]
pub fn face_group_labels() -> js_sys::Array {
    FaceGroup::ALL
        .iter()
        .map(|group| JsValue::from_str(group.label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f32 = 0.5;

    /// One quad on +X and one on -Y, indexed.
    fn two_faces() -> (Vec<f32>, Vec<u32>) {
        let positions = vec![
            H, -H, -H, H, H, -H, H, H, H, H, -H, H, // +X
            -H, -H, -H, H, -H, -H, H, -H, H, -H, -H, H, // -Y
        ];
        let indices = vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7];
        (positions, indices)
    }

    #[test]
    fn classify_then_mesh() {
        let (positions, indices) = two_faces();
        let template = classify_arrays(&positions, &[], &[], &indices).unwrap();
        assert_eq!(template.count(FaceGroup::PosX), 6);
        assert_eq!(template.count(FaceGroup::NegY), 6);

        let bytes = encode(&template).unwrap();
        let info = template_info(&bytes).unwrap();
        assert_eq!(info.version, 1);
        assert_eq!(info.counts, vec![6, 0, 0, 0, 6, 0, 0]);

        let mut voxels = vec![0u8; 8];
        voxels[0] = 255;
        let mesh = mesh_voxels(&bytes, voxels, [2, 2, 2]).unwrap();
        assert_eq!(mesh.vertex_count(), 12);

        let result = MeshResult::from(mesh);
        assert_eq!(result.positions.len(), 36);
        assert_eq!(result.colors.len(), 48);
        assert_eq!(result.bounds, vec![-0.5, -0.5, -0.5, 0.5, 0.5, 0.5]);
        assert_eq!(result.interleaved().len(), 12 * 28);
    }

    #[test]
    fn total_vertices_of_maximal_header() {
        let mut bytes = caw_mesher::MAGIC.to_vec();
        bytes.push(FORMAT_VERSION);
        for _ in FaceGroup::ALL {
            bytes.extend_from_slice(&i32::MAX.to_le_bytes());
        }
        let info = template_info(&bytes).unwrap();
        assert_eq!(info.counts, vec![i32::MAX as u32; 7]);
        assert_eq!(info.total_vertices(), 7.0 * i32::MAX as f64);
    }

    #[test]
    fn classify_rejects_mismatched_attributes() {
        let (positions, indices) = two_faces();
        assert!(classify_arrays(&positions[..5], &[], &[], &indices).is_err());
        assert!(classify_arrays(&positions, &[0.0; 3], &[], &indices).is_err());
        assert!(classify_arrays(&positions, &[], &[0.0; 3], &indices).is_err());
    }

    #[test]
    fn mesh_rejects_bad_grid() {
        let bytes = encode(&Template::new()).unwrap();
        assert!(mesh_voxels(&bytes, vec![0; 7], [2, 2, 2]).is_err());
        assert!(mesh_voxels(&bytes, vec![3; 8], [2, 2, 2]).is_err());
        assert!(mesh_voxels(b"cax", vec![0; 8], [2, 2, 2]).is_err());
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let bytes = encode(&Template::new()).unwrap();
        let result = MeshResult::from(mesh_voxels(&bytes, vec![255; 8], [2, 2, 2]).unwrap());
        assert!(result.is_empty());
        assert!(result.bounds.is_empty());
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn reports_version() {
        assert_eq!(get_version(), env!("CARGO_PKG_VERSION"));
    }

    #[wasm_bindgen_test]
    fn errors_become_strings() {
        let err = decode_template_info(b"nope").err().unwrap();
        assert!(err.as_string().unwrap().contains("header"));
    }
}
