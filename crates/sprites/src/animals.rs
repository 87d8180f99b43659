use crate::batch::InstanceBatcher;
use crate::items::{self, RenderItem};
use crate::scatter::{self, ANIMAL_SALT};
use hexfield_assets::{QualitySettings, SpriteCatalog, SpriteDef};
use hexfield_common::{projection, Camera, ChunkKey, HexCoord, SeedStream, UvRect, CHUNK_SIZE};
use hexfield_gfx::GpuDevice;
use hexfield_world::TileMap;
use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;

/// Pixels per second while walking.
const WALK_SPEED: f32 = 24.0;
/// Seconds per leg-cycle frame while walking.
const LEG_PERIOD: f32 = 0.2;
/// Wander target radius around the tile center, in world pixels.
const WANDER_RADIUS: f32 = 28.0;

/// Per-frame animal statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimalStats {
    pub animals: usize,
    pub draw_calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Idle,
    Eat,
    Walk { target: Vec2 },
}

/// Live state of one wandering animal instance.
///
/// Placement (which tiles spawn animals, where they stand initially) is
/// deterministic; the wander itself rolls real entropy each transition and
/// is not expected to reproduce run-to-run.
#[derive(Debug, Clone)]
struct AnimalState {
    pos: Vec2,
    behavior: Behavior,
    /// Seconds until the next transition roll (idle/eat only).
    timer: f32,
    facing_left: bool,
    leg_timer: f32,
    leg_up: bool,
}

impl AnimalState {
    fn spawn(tile: HexCoord, index: u32, def: &SpriteDef) -> Self {
        let offset = scatter::clump_offset(tile, ANIMAL_SALT, index, def.visual.clump.spread);
        let mut stream = SeedStream::for_tile(tile, ANIMAL_SALT.wrapping_add(101 + index as u64));
        Self {
            pos: projection::tile_center(tile) + offset,
            behavior: Behavior::Idle,
            timer: stream.next_range(1.0, 3.0),
            facing_left: stream.next_f32() < 0.5,
            leg_timer: 0.0,
            leg_up: false,
        }
    }
}

/// Draws and animates animal sprites on resource tiles.
#[derive(Debug)]
pub struct AnimalRenderer {
    shadows: InstanceBatcher,
    sprites: InstanceBatcher,
    states: HashMap<(u64, u32), AnimalState>,
    rng: SmallRng,
    unsupported: bool,
    stats: AnimalStats,
}

impl Default for AnimalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimalRenderer {
    pub fn new() -> Self {
        Self {
            shadows: InstanceBatcher::new(),
            sprites: InstanceBatcher::new(),
            states: HashMap::new(),
            rng: SmallRng::from_entropy(),
            unsupported: false,
            stats: AnimalStats::default(),
        }
    }

    pub fn stats(&self) -> AnimalStats {
        self.stats
    }

    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    /// Drop all behavior state (context loss or map reload).
    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn render(
        &mut self,
        gpu: &mut dyn GpuDevice,
        map: &TileMap,
        catalog: &SpriteCatalog,
        quality: &QualitySettings,
        camera: &Camera,
        visible: &[ChunkKey],
        dt: Duration,
    ) {
        self.stats = AnimalStats::default();
        if !gpu.supports_instancing() {
            if !self.unsupported {
                tracing::warn!("instancing unavailable; animal pass disabled");
            }
            self.unsupported = true;
            return;
        }
        let dt = dt.as_secs_f32();

        let mut gathered: Vec<RenderItem> = Vec::new();
        for key in visible {
            let origin = key.origin_tile();
            for dr in 0..CHUNK_SIZE {
                for dq in 0..CHUNK_SIZE {
                    let tile = HexCoord::new(origin.q + dq, origin.r + dr);
                    let Some(data) = map.get(tile) else {
                        continue;
                    };
                    if !data.visible {
                        continue;
                    }
                    let Some(resource) = data.resource.filter(|r| r.is_animal()) else {
                        continue;
                    };
                    let Some(def) = catalog.get(resource.icon_sprite()) else {
                        continue;
                    };

                    let count =
                        scatter::clump_count(&def.visual.clump, quality, tile, ANIMAL_SALT);
                    let home = projection::tile_center(tile);
                    for index in 0..count {
                        let state = self
                            .states
                            .entry((pack_tile(tile), index))
                            .or_insert_with(|| AnimalState::spawn(tile, index, def));
                        step(state, &mut self.rng, home, dt);
                        gathered.push(animal_item(def, state, camera, quality));
                    }
                }
            }
        }

        items::painter_sort(&mut gathered);
        items::submit(gpu, &mut self.shadows, &mut self.sprites, &gathered);
        self.stats.animals = gathered.len();
        self.stats.draw_calls =
            self.shadows.stats().draw_calls + self.sprites.stats().draw_calls;
    }
}

/// Bijective packing of an animal's home tile.
fn pack_tile(tile: HexCoord) -> u64 {
    ((tile.q as u32 as u64) << 32) | (tile.r as u32 as u64)
}

fn animal_item(
    def: &SpriteDef,
    state: &AnimalState,
    camera: &Camera,
    quality: &QualitySettings,
) -> RenderItem {
    let anchor = camera.world_to_screen(state.pos);
    let frame = match state.behavior {
        Behavior::Idle => 0,
        Behavior::Eat => 1,
        Behavior::Walk { .. } => {
            if state.leg_up {
                3
            } else {
                2
            }
        }
    };
    let mut instance =
        items::sprite_instance(def, anchor, camera.zoom, state.facing_left, 1.0);
    let uv = frame_uv(def.uv, frame);
    instance.uv = [uv.u0, uv.v0, uv.u1, uv.v1];
    let shadow = (quality.shadows && def.visual.shadow.enabled)
        .then(|| items::shadow_instance(def, anchor, camera.zoom));
    RenderItem {
        atlas: def.atlas,
        instance,
        shadow,
        sort_key: instance.dest[1] + instance.dest[3],
    }
}

/// An animal sprite cell holds a 2×2 grid of frames:
/// idle, eat / walk-step, walk-step-raised.
fn frame_uv(uv: UvRect, frame: u8) -> UvRect {
    let mu = (uv.u0 + uv.u1) * 0.5;
    let mv = (uv.v0 + uv.v1) * 0.5;
    match frame {
        0 => UvRect::new(uv.u0, uv.v0, mu, mv),
        1 => UvRect::new(mu, uv.v0, uv.u1, mv),
        2 => UvRect::new(uv.u0, mv, mu, uv.v1),
        _ => UvRect::new(mu, mv, uv.u1, uv.v1),
    }
}

fn step(state: &mut AnimalState, rng: &mut SmallRng, home: Vec2, dt: f32) {
    match state.behavior {
        Behavior::Walk { target } => {
            let delta = target - state.pos;
            let dist = delta.length();
            if dist < 1.0 {
                state.pos = target;
                enter_rest(state, rng);
                return;
            }
            let travel = WALK_SPEED * dt;
            if travel >= dist {
                state.pos = target;
                enter_rest(state, rng);
                return;
            }
            state.pos += delta * (travel / dist);
            if delta.x.abs() > f32::EPSILON {
                state.facing_left = delta.x < 0.0;
            }
            state.leg_timer += dt;
            while state.leg_timer >= LEG_PERIOD {
                state.leg_timer -= LEG_PERIOD;
                state.leg_up = !state.leg_up;
            }
        }
        Behavior::Idle | Behavior::Eat => {
            state.timer -= dt;
            if state.timer <= 0.0 {
                roll_transition(state, rng, home);
            }
        }
    }
}

/// Timer expiry: 40% eat, 30% idle, 30% pick a wander target.
fn roll_transition(state: &mut AnimalState, rng: &mut SmallRng, home: Vec2) {
    let roll: f32 = rng.gen_range(0.0..1.0);
    if roll < 0.4 {
        state.behavior = Behavior::Eat;
        state.timer = rng.gen_range(2.0..4.0);
    } else if roll < 0.7 {
        state.behavior = Behavior::Idle;
        state.timer = rng.gen_range(1.0..3.0);
    } else {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(0.0..WANDER_RADIUS);
        state.behavior = Behavior::Walk {
            target: home
                + Vec2::new(
                    angle.cos() * radius,
                    angle.sin() * radius * projection::VERTICAL_SQUASH,
                ),
        };
        state.timer = 0.0;
        state.leg_timer = 0.0;
    }
}

/// Arrival: settle into a resting state before the next roll.
fn enter_rest(state: &mut AnimalState, rng: &mut SmallRng) {
    if rng.gen_range(0.0..1.0f32) < 0.4 {
        state.behavior = Behavior::Eat;
        state.timer = rng.gen_range(2.0..4.0);
    } else {
        state.behavior = Behavior::Idle;
        state.timer = rng.gen_range(1.0..3.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_gfx::RecordingDevice;
    use hexfield_world::Resource;

    fn walking(pos: Vec2, target: Vec2) -> AnimalState {
        AnimalState {
            pos,
            behavior: Behavior::Walk { target },
            timer: 0.0,
            facing_left: false,
            leg_timer: 0.0,
            leg_up: false,
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn near_target_snaps_exactly_and_leaves_walk() {
        let target = Vec2::new(10.5, 4.0);
        let mut state = walking(Vec2::new(10.0, 4.0), target);
        step(&mut state, &mut rng(), Vec2::ZERO, 0.016);
        assert_eq!(state.pos, target);
        assert!(!matches!(state.behavior, Behavior::Walk { .. }));
        assert!(state.timer > 0.0);
    }

    #[test]
    fn walk_covers_distance_at_constant_speed() {
        let mut state = walking(Vec2::ZERO, Vec2::new(100.0, 0.0));
        step(&mut state, &mut rng(), Vec2::ZERO, 0.5);
        assert!((state.pos.x - WALK_SPEED * 0.5).abs() < 1.0e-3);
        assert!(matches!(state.behavior, Behavior::Walk { .. }));
    }

    #[test]
    fn overshooting_travel_also_snaps() {
        let target = Vec2::new(5.0, 0.0);
        let mut state = walking(Vec2::ZERO, target);
        step(&mut state, &mut rng(), Vec2::ZERO, 1.0);
        assert_eq!(state.pos, target);
        assert!(!matches!(state.behavior, Behavior::Walk { .. }));
    }

    #[test]
    fn facing_follows_travel_direction() {
        let mut state = walking(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        step(&mut state, &mut rng(), Vec2::ZERO, 0.1);
        assert!(state.facing_left);

        let mut state = walking(Vec2::ZERO, Vec2::new(50.0, 0.0));
        step(&mut state, &mut rng(), Vec2::ZERO, 0.1);
        assert!(!state.facing_left);
    }

    #[test]
    fn leg_cycle_advances_every_period() {
        let mut state = walking(Vec2::ZERO, Vec2::new(1000.0, 0.0));
        step(&mut state, &mut rng(), Vec2::ZERO, 0.25);
        assert!(state.leg_up);
        step(&mut state, &mut rng(), Vec2::ZERO, 0.25);
        assert!(!state.leg_up);
    }

    #[test]
    fn timer_expiry_rolls_a_transition() {
        let mut state = AnimalState {
            pos: Vec2::ZERO,
            behavior: Behavior::Idle,
            timer: 0.05,
            facing_left: false,
            leg_timer: 0.0,
            leg_up: false,
        };
        let mut r = rng();
        step(&mut state, &mut r, Vec2::new(3.0, 3.0), 0.1);
        match state.behavior {
            Behavior::Walk { .. } => assert_eq!(state.timer, 0.0),
            Behavior::Idle | Behavior::Eat => assert!(state.timer > 0.0),
        }
    }

    #[test]
    fn frame_uv_splits_the_cell_into_quadrants() {
        let uv = UvRect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(frame_uv(uv, 0), UvRect::new(0.0, 0.0, 0.5, 0.5));
        assert_eq!(frame_uv(uv, 1), UvRect::new(0.5, 0.0, 1.0, 0.5));
        assert_eq!(frame_uv(uv, 2), UvRect::new(0.0, 0.5, 0.5, 1.0));
        assert_eq!(frame_uv(uv, 3), UvRect::new(0.5, 0.5, 1.0, 1.0));
    }

    fn deer_scene() -> (TileMap, SpriteCatalog, Camera, Vec<ChunkKey>) {
        let mut map = TileMap::new(16, 16);
        map.set_resource(HexCoord::new(4, 4), Some(Resource::Deer));
        map.set_resource(HexCoord::new(9, 9), Some(Resource::Cattle));
        (
            map,
            SpriteCatalog::with_defaults(),
            Camera::default(),
            vec![ChunkKey::new(0, 0)],
        )
    }

    #[test]
    fn initial_placement_is_deterministic() {
        let (map, catalog, camera, visible) = deer_scene();
        let quality = QualitySettings::default();
        let mut draws = Vec::new();
        for _ in 0..2 {
            let mut gpu = RecordingDevice::new();
            let mut animals = AnimalRenderer::new();
            // dt of zero: timers never expire, so no entropy is drawn and
            // both runs must lay the herd out identically.
            animals.render(
                &mut gpu,
                &map,
                &catalog,
                &quality,
                &camera,
                &visible,
                Duration::ZERO,
            );
            draws.push(gpu.take_calls());
        }
        assert_eq!(draws[0], draws[1]);
    }

    #[test]
    fn quality_cap_limits_herd_size() {
        let (map, catalog, camera, visible) = deer_scene();
        let mut gpu = RecordingDevice::new();
        let mut animals = AnimalRenderer::new();
        let quality = QualitySettings {
            shadows: false,
            max_clump: 1,
        };
        animals.render(
            &mut gpu,
            &map,
            &catalog,
            &quality,
            &camera,
            &visible,
            Duration::ZERO,
        );
        // Exactly one instance per animal tile.
        assert_eq!(animals.stats().animals, 2);
    }

    #[test]
    fn behavior_state_persists_across_frames() {
        let (map, catalog, camera, visible) = deer_scene();
        let mut gpu = RecordingDevice::new();
        let mut animals = AnimalRenderer::new();
        let quality = QualitySettings::default();
        for _ in 0..10 {
            animals.render(
                &mut gpu,
                &map,
                &catalog,
                &quality,
                &camera,
                &visible,
                Duration::from_millis(500),
            );
        }
        assert!(!animals.states.is_empty());
        animals.reset();
        assert!(animals.states.is_empty());
    }

    #[test]
    fn missing_instancing_degrades_silently() {
        let (map, catalog, camera, visible) = deer_scene();
        let mut gpu = RecordingDevice::new();
        gpu.instancing = false;
        let mut animals = AnimalRenderer::new();
        animals.render(
            &mut gpu,
            &map,
            &catalog,
            &QualitySettings::default(),
            &camera,
            &visible,
            Duration::ZERO,
        );
        assert!(animals.is_unsupported());
        assert!(gpu.calls().is_empty());
    }
}
