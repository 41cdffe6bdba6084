//! Per-voxel face group visibility.
//!
//! A voxel emits a face group's vertices only if the voxel itself is solid and
//! the group's [`FaceRule`] allows it. The same predicate is evaluated by the
//! count pass and the write pass, so it must stay a pure function of the field.

use crate::core::FaceGroup;
use crate::field::VoxelField;

/// Emission rule for one face group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceRule {
    /// Emit for every solid voxel.
    Always,
    /// Never emit.
    Never,
    /// Emit on the grid boundary in the group's direction, otherwise only when
    /// the neighbor in that direction is not solid.
    ///
    /// `Remain` has no direction and treats this as [`FaceRule::Always`].
    CullAgainstNeighbor,
}

/// Rule table for the seven face groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityPolicy {
    rules: [FaceRule; FaceGroup::COUNT],
}

impl VisibilityPolicy {
    /// Table for the inset cube template.
    ///
    /// The inset faces (+X, -Y, -Z) never touch a neighbor's geometry and are
    /// always emitted; +Y, +Z and -X are culled against solid neighbors. Two
    /// solid voxels stacked along Y therefore both keep their -Y faces.
    pub const fn inset_cube() -> Self {
        use FaceRule::*;
        Self {
            rules: [
                Always,              // +X
                CullAgainstNeighbor, // +Y
                CullAgainstNeighbor, // +Z
                CullAgainstNeighbor, // -X
                Always,              // -Y
                Always,              // -Z
                Always,              // REMAIN
            ],
        }
    }

    /// Every cube face culled against its neighbor.
    pub const fn symmetric() -> Self {
        use FaceRule::*;
        Self {
            rules: [
                CullAgainstNeighbor,
                CullAgainstNeighbor,
                CullAgainstNeighbor,
                CullAgainstNeighbor,
                CullAgainstNeighbor,
                CullAgainstNeighbor,
                Always,
            ],
        }
    }

    /// Every group emitted for every solid voxel.
    pub const fn all_faces() -> Self {
        Self {
            rules: [FaceRule::Always; FaceGroup::COUNT],
        }
    }

    pub const fn from_rules(rules: [FaceRule; FaceGroup::COUNT]) -> Self {
        Self { rules }
    }

    #[inline]
    pub fn rule(&self, group: FaceGroup) -> FaceRule {
        self.rules[group.index()]
    }

    /// Builder-style override of one group's rule.
    pub fn with_rule(mut self, group: FaceGroup, rule: FaceRule) -> Self {
        self.rules[group.index()] = rule;
        self
    }

    /// Whether `group` of the voxel at `coords` is emitted.
    ///
    /// Empty voxels emit nothing.
    #[inline]
    pub fn emits(&self, group: FaceGroup, coords: [usize; 3], field: &VoxelField) -> bool {
        let [x, y, z] = coords;
        if !field.is_solid(x, y, z) {
            return false;
        }
        self.face_visible(group, coords, field)
    }

    /// Per-group decisions for a voxel, in canonical group order.
    #[inline]
    pub fn emission_mask(&self, coords: [usize; 3], field: &VoxelField) -> [bool; FaceGroup::COUNT] {
        let [x, y, z] = coords;
        if !field.is_solid(x, y, z) {
            return [false; FaceGroup::COUNT];
        }
        FaceGroup::ALL.map(|group| self.face_visible(group, coords, field))
    }

    /// Rule evaluation assuming the voxel itself is solid.
    #[inline]
    fn face_visible(&self, group: FaceGroup, coords: [usize; 3], field: &VoxelField) -> bool {
        match self.rule(group) {
            FaceRule::Always => true,
            FaceRule::Never => false,
            FaceRule::CullAgainstNeighbor => match neighbor(group, coords, field.dims()) {
                // Grid boundary in this direction
                None => true,
                Some([nx, ny, nz]) => !field.is_solid(nx, ny, nz),
            },
        }
    }
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::inset_cube()
    }
}

/// Neighbor one step in the group's direction, `None` at the grid boundary
/// (and for `Remain`).
#[inline]
fn neighbor(group: FaceGroup, coords: [usize; 3], dims: [usize; 3]) -> Option<[usize; 3]> {
    let (axis, sign) = group.axis()?;
    let mut out = coords;
    if sign > 0 {
        if coords[axis] + 1 >= dims[axis] {
            return None;
        }
        out[axis] += 1;
    } else {
        if coords[axis] == 0 {
            return None;
        }
        out[axis] -= 1;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_of(policy: &VisibilityPolicy, field: &VoxelField, coords: [usize; 3]) -> Vec<FaceGroup> {
        FaceGroup::ALL
            .into_iter()
            .filter(|&g| policy.emits(g, coords, field))
            .collect()
    }

    #[test]
    fn empty_voxel_emits_nothing() {
        let field = VoxelField::new([3, 3, 3]);
        let policy = VisibilityPolicy::inset_cube();
        assert!(mask_of(&policy, &field, [1, 1, 1]).is_empty());
        assert_eq!(policy.emission_mask([1, 1, 1], &field), [false; 7]);
    }

    #[test]
    fn isolated_voxel_emits_all_groups() {
        let mut field = VoxelField::new([3, 3, 3]);
        field.set_solid(1, 1, 1, true);
        let policy = VisibilityPolicy::inset_cube();
        assert_eq!(mask_of(&policy, &field, [1, 1, 1]), FaceGroup::ALL.to_vec());
    }

    #[test]
    fn surrounded_voxel_keeps_inset_faces_only() {
        let field = VoxelField::from_fn([3, 3, 3], |_, _, _| true);
        let policy = VisibilityPolicy::inset_cube();
        assert_eq!(
            mask_of(&policy, &field, [1, 1, 1]),
            vec![FaceGroup::PosX, FaceGroup::NegY, FaceGroup::NegZ, FaceGroup::Remain]
        );
    }

    #[test]
    fn stacked_voxels_double_floor() {
        let mut field = VoxelField::new([3, 3, 3]);
        field.set_solid(1, 0, 1, true);
        field.set_solid(1, 1, 1, true);
        let policy = VisibilityPolicy::inset_cube();

        // Lower voxel loses +Y, upper voxel still emits -Y
        assert!(!policy.emits(FaceGroup::PosY, [1, 0, 1], &field));
        assert!(policy.emits(FaceGroup::NegY, [1, 0, 1], &field));
        assert!(policy.emits(FaceGroup::NegY, [1, 1, 1], &field));
        assert!(policy.emits(FaceGroup::PosY, [1, 1, 1], &field));
    }

    #[test]
    fn boundary_rules() {
        let field = VoxelField::from_fn([2, 2, 2], |_, _, _| true);
        let policy = VisibilityPolicy::inset_cube();

        // x == 0 always emits -X; x == 1 has a solid -X neighbor
        assert!(policy.emits(FaceGroup::NegX, [0, 0, 0], &field));
        assert!(!policy.emits(FaceGroup::NegX, [1, 0, 0], &field));

        // +Y / +Z emit on the far boundary only
        assert!(policy.emits(FaceGroup::PosY, [0, 1, 0], &field));
        assert!(!policy.emits(FaceGroup::PosY, [0, 0, 0], &field));
        assert!(policy.emits(FaceGroup::PosZ, [0, 0, 1], &field));
        assert!(!policy.emits(FaceGroup::PosZ, [0, 0, 0], &field));
    }

    #[test]
    fn symmetric_policy_culls_all_directions() {
        let field = VoxelField::from_fn([3, 3, 3], |_, _, _| true);
        let policy = VisibilityPolicy::symmetric();
        assert_eq!(mask_of(&policy, &field, [1, 1, 1]), vec![FaceGroup::Remain]);
        // Corner voxel: the three boundary faces
        assert_eq!(
            mask_of(&policy, &field, [0, 0, 0]),
            vec![FaceGroup::NegX, FaceGroup::NegY, FaceGroup::NegZ, FaceGroup::Remain]
        );
    }

    #[test]
    fn custom_rules() {
        let mut field = VoxelField::new([1, 1, 1]);
        field.set_solid(0, 0, 0, true);
        let policy = VisibilityPolicy::all_faces()
            .with_rule(FaceGroup::Remain, FaceRule::Never)
            .with_rule(FaceGroup::PosX, FaceRule::CullAgainstNeighbor);

        assert_eq!(policy.rule(FaceGroup::Remain), FaceRule::Never);
        assert_eq!(mask_of(&policy, &field, [0, 0, 0]).len(), 6);
    }

    #[test]
    fn remain_cull_rule_acts_as_always() {
        let field = VoxelField::from_fn([3, 3, 3], |_, _, _| true);
        let policy = VisibilityPolicy::inset_cube()
            .with_rule(FaceGroup::Remain, FaceRule::CullAgainstNeighbor);
        assert!(policy.emits(FaceGroup::Remain, [1, 1, 1], &field));
    }

    #[test]
    fn mask_matches_emits() {
        let field = VoxelField::from_fn([4, 4, 4], |x, y, z| (x + 2 * y + z) % 3 != 0);
        let policy = VisibilityPolicy::inset_cube();
        for index in 0..field.len() {
            let coords = field.coords(index);
            let mask = policy.emission_mask(coords, &field);
            for group in FaceGroup::ALL {
                assert_eq!(mask[group.index()], policy.emits(group, coords, &field));
            }
        }
    }
}
