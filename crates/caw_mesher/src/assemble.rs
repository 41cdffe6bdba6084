//! Two-pass mesh assembly.
//!
//! 1. Count pass: vertices emitted by every voxel (parallel, no shared state)
//! 2. Scan: exclusive prefix sum of the counts into an [`OffsetTable`]
//! 3. Write pass: every voxel copies its emitted groups to its own offset
//!    (parallel)
//!
//! The offset table is exact before any vertex is written, so the output
//! buffers are cut into disjoint sub-slices, one per partition of the voxel
//! index space, and workers never share a slot.

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;

use bytemuck::Zeroable;
use glam::Vec3;
use rayon::prelude::*;

use crate::core::{FaceGroup, Template, Vertex};
use crate::error::{MeshError, Result};
use crate::field::VoxelField;
use crate::mesh::{Aabb, MeshBuffers, MeshStats};
use crate::visibility::VisibilityPolicy;

/// Grid extent below which translated half-voxel positions are exact in
/// binary16 (the format's spacing reaches 1.0 at 1024).
pub const MAX_EXACT_EXTENT: usize = 1024;

/// Configuration for the assembler.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Run the count and write passes on the rayon pool.
    pub parallel: bool,
    /// Minimum voxels handled by one task in the parallel passes.
    pub min_voxels_per_task: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_voxels_per_task: 4096,
        }
    }
}

impl AssemblerConfig {
    /// Configuration running every pass on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_voxels_per_task == 0 {
            return Err(MeshError::invalid("min_voxels_per_task must be >= 1"));
        }
        Ok(())
    }
}

/// Exclusive prefix sum of per-voxel emission counts.
///
/// `offset(i)` is the number of vertices emitted by voxels `0..i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    offsets: Vec<usize>,
    total: usize,
}

impl OffsetTable {
    /// Scan counts in linear voxel order.
    pub fn from_counts(counts: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut running = 0usize;
        for &count in counts {
            offsets.push(running);
            running += count;
        }
        Self {
            offsets,
            total: running,
        }
    }

    /// Start of a voxel's output range.
    #[inline]
    pub fn offset(&self, index: usize) -> usize {
        self.offsets[index]
    }

    /// Output offset where the voxels at `index..` start (`total` past the end).
    #[inline]
    pub fn boundary(&self, index: usize) -> usize {
        self.offsets.get(index).copied().unwrap_or(self.total)
    }

    /// Output slots owned by a voxel.
    #[inline]
    pub fn range(&self, index: usize) -> Range<usize> {
        self.offsets[index]..self.boundary(index + 1)
    }

    /// Total vertices over all voxels.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }
}

/// One worker's share of the write pass.
struct WriteJob<'out> {
    voxels: Range<usize>,
    /// Absolute output offset of `vertices[0]`.
    base: usize,
    vertices: &'out mut [Vertex],
    indices: &'out mut [u32],
}

/// Instances a face template at every solid voxel of a field.
#[derive(Debug, Clone)]
pub struct MeshAssembler<'a> {
    template: &'a Template,
    policy: VisibilityPolicy,
    config: AssemblerConfig,
}

impl<'a> MeshAssembler<'a> {
    pub fn new(template: &'a Template, policy: VisibilityPolicy) -> Self {
        Self {
            template,
            policy,
            config: AssemblerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn template(&self) -> &Template {
        self.template
    }

    pub fn policy(&self) -> &VisibilityPolicy {
        &self.policy
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Check the template, field and configuration before any pass runs.
    pub fn validate(&self, field: &VoxelField) -> Result<()> {
        self.config.validate()?;
        self.template.validate()?;
        field.validate()?;
        if u32::try_from(self.template.total_vertices()).is_err() {
            return Err(MeshError::invalid(format!(
                "template has {} vertices, more than a u32 index can address",
                self.template.total_vertices()
            )));
        }
        Ok(())
    }

    /// Run all three phases and return the packed mesh.
    ///
    /// # Errors
    /// `InvalidInput` for a malformed field, template or configuration, or if
    /// the mesh would exceed the u32 index range. Nothing is allocated for the
    /// output in either case.
    ///
    /// # Precision
    /// Positions stay binary16 after translation. Fields wider than
    /// [`MAX_EXACT_EXTENT`] along an axis lose sub-voxel detail (whole-voxel
    /// steps from 1024, even steps from 2048), and coordinates past 65504
    /// become infinite.
    pub fn assemble(&self, field: &VoxelField) -> Result<MeshBuffers> {
        self.validate(field)?;

        let counts = self.count_pass(field);
        let offsets = OffsetTable::from_counts(&counts);
        if u32::try_from(offsets.total()).is_err() {
            return Err(MeshError::invalid(format!(
                "mesh needs {} vertices, more than a u32 index can address",
                offsets.total()
            )));
        }

        let mesh = self.write_pass(field, &offsets);
        log::debug!(
            "assembled {} vertices from {} voxels (dims {:?})",
            mesh.vertex_count(),
            field.len(),
            field.dims()
        );
        Ok(mesh)
    }

    /// Assemble and collect per-group statistics.
    pub fn assemble_with_stats(&self, field: &VoxelField) -> Result<(MeshBuffers, MeshStats)> {
        let mesh = self.assemble(field)?;
        let stats = self.stats(field, &mesh);
        Ok((mesh, stats))
    }

    /// Phase 1: emitted vertex count of every voxel, in linear index order.
    ///
    /// Does not validate; call [`validate`](Self::validate) first.
    pub fn count_pass(&self, field: &VoxelField) -> Vec<usize> {
        let count_voxel = |index: usize| self.voxel_count(field, index);
        if self.config.parallel {
            (0..field.len())
                .into_par_iter()
                .with_min_len(self.config.min_voxels_per_task)
                .map(count_voxel)
                .collect()
        } else {
            (0..field.len()).map(count_voxel).collect()
        }
    }

    /// Vertices emitted by the voxel at `index`.
    #[inline]
    pub fn voxel_count(&self, field: &VoxelField, index: usize) -> usize {
        if !field.is_solid_at(index) {
            return 0;
        }
        let mask = self.policy.emission_mask(field.coords(index), field);
        FaceGroup::ALL
            .iter()
            .filter(|group| mask[group.index()])
            .map(|&group| self.template.count(group))
            .sum()
    }

    /// Phase 3: allocate the buffers and write every voxel's vertices.
    ///
    /// `offsets` must come from [`count_pass`](Self::count_pass) over the same
    /// field, template and policy.
    pub fn write_pass(&self, field: &VoxelField, offsets: &OffsetTable) -> MeshBuffers {
        debug_assert_eq!(offsets.len(), field.len());

        let total = offsets.total();
        let mut vertices = vec![Vertex::zeroed(); total];
        let mut indices = vec![0u32; total];

        let jobs = split_jobs(
            offsets,
            self.partition_len(field.len()),
            &mut vertices,
            &mut indices,
        );

        let bounds = if self.config.parallel {
            jobs.into_par_iter()
                .map(|job| self.write_partition(field, offsets, job))
                .reduce(|| None, Aabb::merge)
        } else {
            jobs.into_iter()
                .map(|job| self.write_partition(field, offsets, job))
                .fold(None, Aabb::merge)
        };

        MeshBuffers {
            vertices,
            indices,
            bounds,
        }
    }

    /// Voxels per write partition.
    fn partition_len(&self, voxel_count: usize) -> usize {
        if !self.config.parallel {
            return voxel_count.max(1);
        }
        let min = self.config.min_voxels_per_task.max(1);
        // A few partitions per thread keeps the pool busy on uneven fields
        let target = rayon::current_num_threads() * 4;
        voxel_count.div_ceil(target.max(1)).max(min)
    }

    /// Write one partition and return the bounds of what it wrote.
    fn write_partition(
        &self,
        field: &VoxelField,
        offsets: &OffsetTable,
        job: WriteJob<'_>,
    ) -> Option<Aabb> {
        let WriteJob {
            voxels,
            base,
            vertices,
            indices,
        } = job;
        let mut bounds: Option<Aabb> = None;

        for index in voxels {
            if !field.is_solid_at(index) {
                continue;
            }
            let coords = field.coords(index);
            let mask = self.policy.emission_mask(coords, field);
            let range = offsets.range(index);
            let mut cursor = range.start - base;

            for group in FaceGroup::ALL {
                if !mask[group.index()] {
                    continue;
                }
                let source = self.template.group(group);
                let dest = &mut vertices[cursor..cursor + source.len()];
                for (out, vertex) in dest.iter_mut().zip(source) {
                    *out = vertex.translated(coords);
                    let p = Vec3::from_array(out.position_f32());
                    bounds = Some(match bounds {
                        Some(mut b) => {
                            b.include(p);
                            b
                        }
                        None => Aabb::from_point(p),
                    });
                }
                for (k, slot) in indices[cursor..cursor + source.len()].iter_mut().enumerate() {
                    *slot = (base + cursor + k) as u32;
                }
                cursor += source.len();
            }

            debug_assert_eq!(
                cursor + base,
                range.end,
                "voxel {index} wrote a different count than the count pass"
            );
        }

        bounds
    }

    /// Per-group emission statistics for a field.
    pub fn stats(&self, field: &VoxelField, mesh: &MeshBuffers) -> MeshStats {
        let tally = |index: usize| {
            let mut emitted = [0usize; FaceGroup::COUNT];
            let mut culled = [0usize; FaceGroup::COUNT];
            if field.is_solid_at(index) {
                let mask = self.policy.emission_mask(field.coords(index), field);
                for (i, &emits) in mask.iter().enumerate() {
                    if emits {
                        emitted[i] += 1;
                    } else {
                        culled[i] += 1;
                    }
                }
            }
            (emitted, culled)
        };
        type Tally = ([usize; FaceGroup::COUNT], [usize; FaceGroup::COUNT]);
        let add = |(mut ea, mut ca): Tally, (eb, cb): Tally| {
            for i in 0..FaceGroup::COUNT {
                ea[i] += eb[i];
                ca[i] += cb[i];
            }
            (ea, ca)
        };
        let zero = ([0usize; FaceGroup::COUNT], [0usize; FaceGroup::COUNT]);

        let (groups_emitted, groups_culled) = if self.config.parallel {
            (0..field.len())
                .into_par_iter()
                .with_min_len(self.config.min_voxels_per_task.max(1))
                .map(tally)
                .reduce(|| zero, add)
        } else {
            (0..field.len()).map(tally).fold(zero, add)
        };

        MeshStats {
            voxel_count: field.len(),
            solid_voxels: field.solid_count(),
            groups_emitted,
            groups_culled,
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
        }
    }
}

/// Cut the output buffers into per-partition sub-slices along the offset table.
fn split_jobs<'out>(
    offsets: &OffsetTable,
    partition_len: usize,
    vertices: &'out mut [Vertex],
    indices: &'out mut [u32],
) -> Vec<WriteJob<'out>> {
    let voxel_count = offsets.len();
    let mut jobs = Vec::with_capacity(voxel_count.div_ceil(partition_len.max(1)));
    let mut vertices_rest = vertices;
    let mut indices_rest = indices;

    let mut start = 0;
    while start < voxel_count {
        let end = (start + partition_len).min(voxel_count);
        let base = offsets.boundary(start);
        let len = offsets.boundary(end) - base;

        let (v, v_rest) = std::mem::take(&mut vertices_rest).split_at_mut(len);
        let (i, i_rest) = std::mem::take(&mut indices_rest).split_at_mut(len);
        vertices_rest = v_rest;
        indices_rest = i_rest;

        jobs.push(WriteJob {
            voxels: start..end,
            base,
            vertices: v,
            indices: i,
        });
        start = end;
    }

    debug_assert!(vertices_rest.is_empty() && indices_rest.is_empty());
    jobs
}

/// Assemble on the rayon pool and deliver the result through a future.
///
/// The returned future resolves once all three phases have finished; the
/// caller chooses whether to block on it or poll it from an executor.
pub fn assemble_async(
    template: Arc<Template>,
    field: VoxelField,
    policy: VisibilityPolicy,
    config: AssemblerConfig,
) -> impl Future<Output = Result<MeshBuffers>> {
    let (sender, receiver) = futures::channel::oneshot::channel();
    rayon::spawn(move || {
        let result = MeshAssembler::new(&template, policy)
            .with_config(config)
            .assemble(&field);
        let _ = sender.send(result);
    });
    async move {
        receiver
            .await
            .map_err(|_| MeshError::invalid("assembly task dropped before completing"))?
    }
}
