// Actuator layout: which index is a hip or a foot, which leg group it
// belongs to, and the per-hip swing end-points. The gaits are written
// against roles, groups and masks only, so a different chassis (or a
// cut-down test rig) is just another table.

use crate::motion::{ActuatorMask, MotionState};

/// The two leg groups that alternate stance and swing during walking.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LegGroup {
    A,
    B,
}

/// Hip swing direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Swing {
    Forward,
    Back,
}

/// What an actuator does. Hips carry their own swing end-points because
/// the joints are mounted at different angles along the chassis; a common
/// "forward" constant would twist the stations against each other.
#[derive(Clone, Copy, Debug)]
pub enum Role {
    Hip {
        swing_fwd_cdeg: i32,
        swing_back_cdeg: i32,
    },
    Foot,
}

#[derive(Clone, Copy, Debug)]
pub struct ActuatorSpec {
    pub role: Role,
    pub group: LegGroup,
}

/// A chassis description: one spec per actuator index.
pub struct Layout {
    specs: &'static [ActuatorSpec],
}

impl Layout {
    pub const fn new(specs: &'static [ActuatorSpec]) -> Layout {
        assert!(specs.len() <= MotionState::MAX_ACTUATORS);
        Layout { specs }
    }

    pub const fn len(&self) -> usize {
        self.specs.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Every actuator in the layout.
    pub fn all(&self) -> ActuatorMask {
        (0..self.specs.len()).collect()
    }

    pub fn hips(&self) -> ActuatorMask {
        self.select(|spec| matches!(spec.role, Role::Hip { .. }))
    }

    pub fn feet(&self, group: LegGroup) -> ActuatorMask {
        self.select(|spec| matches!(spec.role, Role::Foot) && spec.group == group)
    }

    pub fn all_feet(&self) -> ActuatorMask {
        self.select(|spec| matches!(spec.role, Role::Foot))
    }

    /// Hips of `group` with their target for `direction`, ascending by
    /// index.
    pub fn hip_swings(
        &self,
        group: LegGroup,
        direction: Swing,
    ) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.specs
            .iter()
            .enumerate()
            .filter_map(move |(index, spec)| match spec.role {
                Role::Hip {
                    swing_fwd_cdeg,
                    swing_back_cdeg,
                } if spec.group == group => Some((
                    index,
                    match direction {
                        Swing::Forward => swing_fwd_cdeg,
                        Swing::Back => swing_back_cdeg,
                    },
                )),
                _ => None,
            })
    }

    /// Feet in ascending index order. The ripple wave walks this as a
    /// ring: each foot's predecessor is the previous element, wrapping to
    /// the last foot for the first.
    pub fn wave_ring(&self) -> Vec<usize> {
        self.all_feet().iter().collect()
    }

    fn select(&self, pred: impl Fn(&ActuatorSpec) -> bool) -> ActuatorMask {
        self.specs
            .iter()
            .enumerate()
            .filter(|(_, spec)| pred(spec))
            .map(|(index, _)| index)
            .collect()
    }
}

const fn hip(group: LegGroup, swing_fwd_cdeg: i32, swing_back_cdeg: i32) -> ActuatorSpec {
    ActuatorSpec {
        role: Role::Hip {
            swing_fwd_cdeg,
            swing_back_cdeg,
        },
        group,
    }
}

const fn foot(group: LegGroup) -> ActuatorSpec {
    ActuatorSpec {
        role: Role::Foot,
        group,
    }
}

/// The twelve-servo hexapod. Legs run hip-then-foot down the index range,
/// stations front to rear, groups interleaved so that each tripod (front
/// and rear of one side plus middle of the other) shares a group letter.
pub static HEXAPOD: Layout = Layout::new(&[
    hip(LegGroup::A, 0, -500),   // 0: hip A1
    foot(LegGroup::A),           // 1: foot A1
    hip(LegGroup::B, 250, -250), // 2: hip B1
    foot(LegGroup::B),           // 3: foot B1
    hip(LegGroup::A, 500, 0),    // 4: hip A2
    foot(LegGroup::A),           // 5: foot A2
    hip(LegGroup::B, 500, 0),    // 6: hip B2
    foot(LegGroup::B),           // 7: foot B2
    hip(LegGroup::A, 250, -250), // 8: hip A3
    foot(LegGroup::A),           // 9: foot A3
    hip(LegGroup::B, 0, -500),   // 10: hip B3
    foot(LegGroup::B),           // 11: foot B3
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexapod_masks_match_the_wiring() {
        assert_eq!(HEXAPOD.len(), 12);
        assert_eq!(HEXAPOD.all().bits(), 0xFFF);
        assert_eq!(
            HEXAPOD.hips().iter().collect::<Vec<_>>(),
            vec![0, 2, 4, 6, 8, 10]
        );
        assert_eq!(
            HEXAPOD.feet(LegGroup::A).iter().collect::<Vec<_>>(),
            vec![1, 5, 9]
        );
        assert_eq!(
            HEXAPOD.feet(LegGroup::B).iter().collect::<Vec<_>>(),
            vec![3, 7, 11]
        );
        assert_eq!(
            HEXAPOD.all_feet().bits(),
            HEXAPOD.feet(LegGroup::A).bits() | HEXAPOD.feet(LegGroup::B).bits()
        );
    }

    #[test]
    fn hip_swings_pair_each_station_with_its_own_end_point() {
        let a_back: Vec<_> = HEXAPOD.hip_swings(LegGroup::A, Swing::Back).collect();
        assert_eq!(a_back, vec![(0, -500), (4, 0), (8, -250)]);

        let b_forward: Vec<_> = HEXAPOD.hip_swings(LegGroup::B, Swing::Forward).collect();
        assert_eq!(b_forward, vec![(2, 250), (6, 500), (10, 0)]);

        // front and rear stations mirror each other across the chassis
        let a_fwd: Vec<_> = HEXAPOD.hip_swings(LegGroup::A, Swing::Forward).collect();
        assert_eq!(a_fwd, vec![(0, 0), (4, 500), (8, 250)]);
    }

    #[test]
    fn wave_ring_is_feet_ascending() {
        assert_eq!(HEXAPOD.wave_ring(), vec![1, 3, 5, 7, 9, 11]);
    }
}
