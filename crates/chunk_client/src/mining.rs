//! Progress-based block mining: turns a per-frame raycast hit into a block-break event once
//! the target has been held long enough.

use glam::Vec3;
use voxel_proto::BlockType;

/// Maximum reach, in blocks, for a mining raycast; targets beyond this are treated as a miss.
pub const MAX_REACH: f32 = 5.0;
/// How far inside the hit face the target block position is stepped.
const TARGET_INSET: f32 = 0.1;
/// Targets within this distance of the previous target are treated as unchanged.
const TARGET_STABILITY_EPS: f32 = 0.1;

/// A block position, in integer block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    fn from_point(point: Vec3) -> Self {
        Self {
            x: point.x.floor() as i32,
            y: point.y.floor() as i32,
            z: point.z.floor() as i32,
        }
    }

    fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

/// One frame's targeting raycast result: hit distance, world-space point, face normal, and the
/// struck block's type.
#[derive(Clone, Copy, Debug)]
pub struct TargetHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub block_type: BlockType,
}

/// Inputs sampled once per frame and fed to [`MiningState::update`].
pub struct MiningInput {
    pub delta_time: f32,
    pub break_held: bool,
    pub window_focused: bool,
    /// The current raycast hit within reach, if any; callers should already have capped the
    /// raycast's `max_distance` to [`MAX_REACH`], but `update` re-checks defensively.
    pub hit: Option<TargetHit>,
}

/// A block-mined event, fired once `progress` reaches 1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockMined {
    pub pos: BlockPos,
    pub block_type: BlockType,
}

/// Per-player mining progress state. `progress` increases monotonically while the target stays
/// stable and the break input is held; any target change or input release resets it to zero.
#[derive(Default)]
pub struct MiningState {
    current_target: Option<BlockPos>,
    progress: f32,
    block_type: BlockType,
    speed_mult: f32,
}

impl MiningState {
    /// Builds a fresh, idle mining state at the given speed multiplier (1.0 is baseline).
    pub fn new(speed_mult: f32) -> Self {
        Self {
            current_target: None,
            progress: 0.0,
            block_type: BlockType::Air,
            speed_mult,
        }
    }

    /// Current progress toward breaking the target block, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// The block currently being targeted, if any.
    pub fn current_target(&self) -> Option<BlockPos> {
        self.current_target
    }

    /// Advances the state machine by one frame, returning a [`BlockMined`] event if the target
    /// was just broken.
    pub fn update(&mut self, input: &MiningInput) -> Option<BlockMined> {
        if !input.window_focused {
            self.reset();
            return None;
        }

        let Some(hit) = input.hit.as_ref().filter(|hit| hit.distance <= MAX_REACH) else {
            self.reset();
            return None;
        };
        let (point, normal, block_type) = (hit.point, hit.normal, hit.block_type);

        if !input.break_held {
            self.reset();
            return None;
        }

        let target = BlockPos::from_point(point - normal * TARGET_INSET);
        let same_target = self
            .current_target
            .is_some_and(|prev| (prev.as_vec3() - target.as_vec3()).length() < TARGET_STABILITY_EPS);

        if !same_target {
            self.current_target = Some(target);
            self.block_type = block_type;
            self.progress = 0.0;
            return None;
        }

        let hardness = block_type.hardness_secs().max(f32::MIN_POSITIVE);
        self.progress += input.delta_time / (hardness * self.speed_mult.max(f32::MIN_POSITIVE));

        if self.progress >= 1.0 {
            let event = BlockMined {
                pos: target,
                block_type: self.block_type,
            };
            self.reset();
            return Some(event);
        }

        None
    }

    fn reset(&mut self) {
        self.current_target = None;
        self.progress = 0.0;
        self.block_type = BlockType::Air;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone_hit_at_origin() -> TargetHit {
        TargetHit {
            distance: 2.0,
            point: Vec3::new(2.0, 0.0, 0.0),
            normal: Vec3::Y,
            block_type: BlockType::Stone,
        }
    }

    #[test]
    fn holding_for_the_full_hardness_duration_fires_exactly_one_event() {
        let mut state = MiningState::new(1.0);
        let hit = stone_hit_at_origin();

        // Run a little past the 2.0s hardness duration so float rounding in the per-frame
        // accumulation can't leave the loop one frame short of the threshold.
        let mut fired = Vec::new();
        for _ in 0..25 {
            let event = state.update(&MiningInput {
                delta_time: 0.1,
                break_held: true,
                window_focused: true,
                hit: Some(hit),
            });
            fired.extend(event);
        }

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].block_type, BlockType::Stone);
    }

    #[test]
    fn releasing_early_resets_progress_with_no_event() {
        let mut state = MiningState::new(1.0);
        let hit = stone_hit_at_origin();

        for _ in 0..10 {
            state.update(&MiningInput {
                delta_time: 0.1,
                break_held: true,
                window_focused: true,
                hit: Some(hit),
            });
        }
        assert!(state.progress() > 0.0);

        let event = state.update(&MiningInput {
            delta_time: 0.1,
            break_held: false,
            window_focused: true,
            hit: Some(hit),
        });
        assert!(event.is_none());
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn changing_target_restarts_progress() {
        let mut state = MiningState::new(1.0);
        state.update(&MiningInput {
            delta_time: 0.5,
            break_held: true,
            window_focused: true,
            hit: Some(TargetHit {
                distance: 2.0,
                point: Vec3::new(2.0, 0.0, 0.0),
                normal: Vec3::Y,
                block_type: BlockType::Stone,
            }),
        });
        assert!(state.progress() > 0.0);

        state.update(&MiningInput {
            delta_time: 0.0,
            break_held: true,
            window_focused: true,
            hit: Some(TargetHit {
                distance: 4.0,
                point: Vec3::new(20.0, 0.0, 0.0),
                normal: Vec3::Y,
                block_type: BlockType::Dirt,
            }),
        });
        assert_eq!(state.progress(), 0.0);
    }
}
