//! Face template classification.
//!
//! Splits an authored cube mesh into the seven face groups by checking whether
//! a triangle lies flat on one of the cube's faces. Comparison is exact on the
//! binary16 positions; authoring tools snap face vertices to ±0.5.

use half::f16;

use crate::core::{FaceGroup, Template, Vertex, HALF_EXTENT};
use crate::error::{MeshError, Result};

/// Face group of a single triangle.
///
/// Groups are tested in the order +X, +Y, +Z, -X, -Y, -Z; the first group whose
/// plane holds all three vertices wins. Triangles on no face are `Remain`.
pub fn classify_triangle(triangle: &[Vertex; 3]) -> FaceGroup {
    let plus = f16::from_f32(HALF_EXTENT);
    let minus = f16::from_f32(-HALF_EXTENT);

    let on_plane = |axis: usize, value: f16| triangle.iter().all(|v| v.position[axis] == value);

    FaceGroup::ALL[..6]
        .iter()
        .copied()
        .find(|group| match group.axis() {
            Some((axis, sign)) => on_plane(axis, if sign > 0 { plus } else { minus }),
            None => false,
        })
        .unwrap_or(FaceGroup::Remain)
}

/// Classify a non-indexed triangle list (consecutive vertex triples).
///
/// # Errors
/// Returns `InvalidInput` if the vertex count is not a multiple of 3.
pub fn classify_triangles(vertices: &[Vertex]) -> Result<Template> {
    if vertices.len() % 3 != 0 {
        return Err(MeshError::invalid(format!(
            "triangle list has {} vertices, not a multiple of 3",
            vertices.len()
        )));
    }

    let mut template = Template::new();
    for tri in vertices.chunks_exact(3) {
        let triangle = [tri[0], tri[1], tri[2]];
        template.push_triangle(classify_triangle(&triangle), triangle);
    }
    log_counts(&template);
    Ok(template)
}

/// Classify an indexed triangle mesh; triangles are expanded into independent
/// vertices.
///
/// # Errors
/// Returns `InvalidInput` if the index count is not a multiple of 3 or an index
/// is out of range.
pub fn classify_indexed(vertices: &[Vertex], indices: &[u32]) -> Result<Template> {
    if indices.len() % 3 != 0 {
        return Err(MeshError::invalid(format!(
            "index list has {} entries, not a multiple of 3",
            indices.len()
        )));
    }

    let fetch = |i: u32| {
        vertices.get(i as usize).copied().ok_or_else(|| {
            MeshError::invalid(format!(
                "index {i} out of range for {} vertices",
                vertices.len()
            ))
        })
    };

    let mut template = Template::new();
    for tri in indices.chunks_exact(3) {
        let triangle = [fetch(tri[0])?, fetch(tri[1])?, fetch(tri[2])?];
        template.push_triangle(classify_triangle(&triangle), triangle);
    }
    log_counts(&template);
    Ok(template)
}

fn log_counts(template: &Template) {
    log::trace!("classified template counts {:?}", template.counts());
}
