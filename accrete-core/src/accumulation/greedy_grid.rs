//! Greedy voxel-grid alignment before concatenation
//!
//! Every non-reference observation is shifted by the whole-voxel offset that
//! lands the most of its points in voxels occupied by the reference
//! observation. One greedy pass over a bounded offset window; no rotation, no
//! iterative refinement.

use crate::accumulation::strategy::{AccumulationStrategy, Observation, empty_output};
use crate::config::{GreedyGridConfig, MAX_SEARCH_RADIUS};
use crate::error::PatchError;
use accrete_data::PointCloud;
use glam::{IVec3, Vec3};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Set of voxels occupied by at least one point.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    voxel_size: f32,
    occupied: HashSet<IVec3>,
}

impl VoxelGrid {
    pub fn from_cloud(cloud: &PointCloud, voxel_size: f32) -> Self {
        Self {
            voxel_size,
            occupied: cloud.positions().map(|p| voxel_key(p, voxel_size)).collect(),
        }
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    pub fn contains(&self, key: IVec3) -> bool {
        self.occupied.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }
}

/// Integer voxel coordinates of `p`.
pub fn voxel_key(p: Vec3, voxel_size: f32) -> IVec3 {
    (p / voxel_size).floor().as_ivec3()
}

/// Result of the offset search for one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    /// Offset in whole voxels.
    pub voxels: IVec3,
    /// Translation to apply, in metres.
    pub offset: Vec3,
    /// Moving points that fall into occupied reference voxels after the shift.
    pub correspondences: usize,
}

impl Alignment {
    pub fn identity() -> Self {
        Self {
            voxels: IVec3::ZERO,
            offset: Vec3::ZERO,
            correspondences: 0,
        }
    }
}

/// Registration-based merge with a greedy voxel-correspondence search.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyGridStrategy {
    config: GreedyGridConfig,
}

impl GreedyGridStrategy {
    pub fn new(config: GreedyGridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GreedyGridConfig {
        &self.config
    }

    /// Candidate offsets, nearest first. Ties in distance keep x, y, z
    /// lexicographic order, so the search is deterministic.
    ///
    /// The radius is clamped to `0..=MAX_SEARCH_RADIUS` for configs that
    /// skipped validation.
    fn candidate_offsets(&self) -> Vec<IVec3> {
        let r = self.config.search_radius.clamp(0, MAX_SEARCH_RADIUS);
        let side = r.unsigned_abs() as usize * 2 + 1;
        let mut offsets = Vec::with_capacity(side.saturating_mul(side).saturating_mul(side));
        for x in -r..=r {
            for y in -r..=r {
                for z in -r..=r {
                    offsets.push(IVec3::new(x, y, z));
                }
            }
        }
        offsets.sort_by_key(|o| (o.length_squared(), o.x, o.y, o.z));
        offsets
    }

    /// Find the offset that maximises correspondences of `moving` with `reference`.
    ///
    /// The first offset to reach the maximum wins, so the zero offset is kept
    /// whenever nothing does strictly better. When no offset produces any
    /// correspondence the identity alignment is returned.
    pub fn align(&self, reference: &VoxelGrid, moving: &PointCloud) -> Alignment {
        if reference.is_empty() || moving.is_empty() {
            return Alignment::identity();
        }

        // shifting by whole voxels moves every key by the same integer offset
        let mut moving_voxels: HashMap<IVec3, usize> = HashMap::new();
        for p in moving.positions() {
            *moving_voxels
                .entry(voxel_key(p, reference.voxel_size()))
                .or_insert(0) += 1;
        }

        let mut best = Alignment::identity();
        for voxels in self.candidate_offsets() {
            let correspondences: usize = moving_voxels
                .iter()
                .filter(|(key, _)| reference.contains(**key + voxels))
                .map(|(_, count)| *count)
                .sum();
            if correspondences > best.correspondences {
                best = Alignment {
                    voxels,
                    offset: voxels.as_vec3() * reference.voxel_size(),
                    correspondences,
                };
            }
        }
        best
    }
}

impl AccumulationStrategy for GreedyGridStrategy {
    fn name(&self) -> &'static str {
        "greedy_grid"
    }

    fn accumulate(&self, observations: &[Observation]) -> Result<PointCloud, PatchError> {
        self.config.validate()?;
        let mut merged = empty_output(observations)?;

        let Some((reference, rest)) = observations.split_first() else {
            return Ok(merged);
        };
        let reference_points = reference.in_scene_frame();
        merged.extend_from(&reference_points)?;
        if rest.is_empty() {
            debug!("Single observation, nothing to align");
            return Ok(merged);
        }

        let grid = VoxelGrid::from_cloud(&reference_points, self.config.voxel_size);
        for observation in rest {
            let mut moving = observation.in_scene_frame();
            if moving.is_empty() {
                debug!("Frame {} has no points for this instance", observation.frame_id);
                merged.extend_from(&moving)?;
                continue;
            }

            let alignment = self.align(&grid, &moving);
            if alignment.correspondences == 0 {
                warn!(
                    "No voxel correspondences for frame {}, keeping identity alignment",
                    observation.frame_id
                );
            } else {
                debug!(
                    "Frame {} shifted by {:?} ({} of {} points corresponding)",
                    observation.frame_id,
                    alignment.offset,
                    alignment.correspondences,
                    moving.len()
                );
                moving.translate(alignment.offset);
            }
            merged.extend_from(&moving)?;
        }

        debug!(
            "Aligned and merged {} observations into {} points",
            observations.len(),
            merged.len()
        );
        Ok(merged)
    }
}
