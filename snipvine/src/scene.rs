//! One level: the prize on its vines, the crocodile below, the water beneath.

use anyhow::{anyhow, Context, Result};

use crate::actions::ActionQueue;
use crate::config::{GameConfig, SceneLayout};
use crate::crocodile::{Crocodile, MouthState, CHOMP_STEP};
use crate::cut::{CutDetector, SeveredVine};
use crate::input::{GestureEvent, Swipe};
use crate::level::LevelDescriptor;
use crate::math::Vec2;
use crate::node::{image, layer, Node, Role};
use crate::physics::{Category, ColliderShape, CollisionFilter, PhysicsWorld, RigidBodyType};
use crate::presentation::{Cue, Impact, Presentation, SoundCue, Transition};
use crate::vine::{VineChain, VineId, VineSet};
use crate::world::{EntityId, World};

/// Seconds the prize takes to shrink into the crocodile's mouth.
pub const PRIZE_SHRINK_TIME: f32 = 0.08;
/// Seconds severed segments take to fade out.
pub const SEGMENT_FADE_TIME: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Playing,
    /// Terminal. The scene only plays out its remaining animations.
    LevelOver(Outcome),
}

/// What the scene asks of whoever owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneRequest {
    /// Replace this level with a fresh one.
    NextLevel(Transition),
}

#[derive(Debug)]
enum SceneAction {
    RemovePrize,
    RemoveNodes(Vec<EntityId>),
    PresentNextLevel(Transition),
}

pub struct GameScene {
    layout: SceneLayout,
    restart_delay: f32,

    world: World,
    physics: PhysicsWorld,
    vines: VineSet,
    cutter: CutDetector,
    prize: EntityId,
    crocodile_entity: EntityId,
    crocodile: Crocodile,

    actions: ActionQueue<SceneAction>,
    phase: Phase,
}

impl GameScene {
    /// Build a level: physics, scenery, prize, vines, then the crocodile.
    pub fn new(config: &GameConfig, level: &LevelDescriptor) -> Result<Self> {
        let layout = config.layout.clone();
        let mut world = World::new();
        let mut physics = Self::setup_physics(config);

        Self::setup_scenery(&layout, &mut world);
        let prize = Self::setup_prize(&layout, &mut world, &mut physics)
            .context("failed to set up the prize")?;
        let vines = Self::setup_vines(level, prize, &layout, &mut world, &mut physics)
            .context("failed to set up the vines")?;
        let crocodile_entity = Self::setup_crocodile(&layout, &mut world, &mut physics)
            .context("failed to set up the crocodile")?;

        let rng = match config.rng_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut crocodile = Crocodile::new(rng);
        crocodile.animate_idle();

        log::debug!(
            "level ready: {} vines, {} bodies, {} joints",
            vines.len(),
            physics.body_count(),
            physics.joint_count()
        );

        Ok(Self {
            layout,
            restart_delay: config.restart_delay,
            world,
            physics,
            vines,
            cutter: CutDetector::new(config.allow_multiple_cuts_per_gesture),
            prize,
            crocodile_entity,
            crocodile,
            actions: ActionQueue::new(),
            phase: Phase::Playing,
        })
    }

    fn setup_physics(config: &GameConfig) -> PhysicsWorld {
        let mut physics = PhysicsWorld::new()
            .with_points_per_meter(config.points_per_meter)
            .with_gravity(config.gravity)
            .with_solver_iterations(config.solver_iterations)
            .with_damping(config.damping);
        physics.on_event(|event| log::trace!("physics event {event:?}"));
        physics
    }

    fn setup_scenery(layout: &SceneLayout, world: &mut World) {
        let background = world.spawn();
        world.insert(
            background,
            Node::new(image::BACKGROUND, layer::BACKGROUND, layout.size).at(layout.size / 2.0),
        );
        world.insert(background, Role::Scenery);

        let water_size = Vec2::new(layout.size.x, layout.size.y * layout.water_height_ratio);
        let water = world.spawn();
        world.insert(
            water,
            Node::new(image::WATER, layer::FOREGROUND, water_size).at(water_size / 2.0),
        );
        world.insert(water, Role::Scenery);
    }

    fn setup_prize(
        layout: &SceneLayout,
        world: &mut World,
        physics: &mut PhysicsWorld,
    ) -> Result<EntityId> {
        let size = layout.prize_size;
        let prize = world.spawn();
        world.insert(prize, Node::new(image::PRIZE, layer::PRIZE, size));
        world.insert(prize, Role::Prize);

        physics.create_body(prize, RigidBodyType::Dynamic, layout.prize_origin())?;
        physics.add_collider(
            prize,
            ColliderShape::Box {
                hx: size.x / 2.0,
                hy: size.y / 2.0,
            },
            layout.prize_density,
            CollisionFilter::new(Category::PRIZE).contacts_with(Category::CROCODILE),
        )?;
        Ok(prize)
    }

    fn setup_vines(
        level: &LevelDescriptor,
        prize: EntityId,
        layout: &SceneLayout,
        world: &mut World,
        physics: &mut PhysicsWorld,
    ) -> Result<VineSet> {
        let mut vines = VineSet::new();
        for (index, descriptor) in level.vines().iter().enumerate() {
            let id = VineId::new(u32::try_from(index)?);
            let anchor = descriptor.relative_anchor.resolve(layout.size);
            let mut chain = VineChain::build(id, descriptor, anchor, layout, world, physics)?;
            chain.attach_to_prize(prize, layout.prize_size, physics)?;
            vines.insert(chain);
        }
        Ok(vines)
    }

    fn setup_crocodile(
        layout: &SceneLayout,
        world: &mut World,
        physics: &mut PhysicsWorld,
    ) -> Result<EntityId> {
        let size = layout.crocodile_size;
        let crocodile = world.spawn();
        world.insert(
            crocodile,
            Node::new(image::CROC_MOUTH_CLOSED, layer::CROCODILE, size),
        );
        world.insert(crocodile, Role::Crocodile);

        physics.create_body(crocodile, RigidBodyType::Fixed, layout.crocodile_origin())?;
        physics.add_sensor(
            crocodile,
            ColliderShape::Box {
                hx: size.x / 2.0,
                hy: size.y / 2.0,
            },
            CollisionFilter::new(Category::CROCODILE).contacts_with(Category::PRIZE),
        )?;
        Ok(crocodile)
    }

    // ------------------------------
    // Input
    // ------------------------------

    pub fn handle_gesture(&mut self, event: GestureEvent, fx: &mut dyn Presentation) {
        match event {
            GestureEvent::Began => self.touches_began(),
            GestureEvent::Moved(swipes) => self.touches_moved(&swipes, fx),
            GestureEvent::Ended => self.touches_ended(fx),
        }
    }

    pub fn touches_began(&mut self) {
        self.cutter.gesture_began();
    }

    pub fn touches_moved(&mut self, swipes: &[Swipe], fx: &mut dyn Presentation) {
        for &swipe in swipes {
            if self.is_level_over() {
                return;
            }
            for severed in self.cutter.swipe(swipe, &mut self.vines, &mut self.physics) {
                self.vine_severed(severed, fx);
            }
            fx.present(Cue::SwipeTrail { at: swipe.current });
        }
    }

    pub fn touches_ended(&mut self, fx: &mut dyn Presentation) {
        fx.present(Cue::SwipeTrailEnded);
    }

    fn vine_severed(&mut self, severed: SeveredVine, fx: &mut dyn Presentation) {
        log::debug!(
            "{} cut at ({:.1}, {:.1})",
            severed.vine,
            severed.at.x,
            severed.at.y
        );
        fx.present(Cue::Sound(SoundCue::Slice));
        fx.present(Cue::FadeOut {
            entities: severed.segments.clone(),
            duration: SEGMENT_FADE_TIME,
        });
        self.actions
            .schedule(SEGMENT_FADE_TIME, SceneAction::RemoveNodes(severed.segments));

        self.crocodile.open_after_cut();
        self.present_mouth(0.0, fx);
    }

    // ------------------------------
    // Simulation
    // ------------------------------

    /// One fixed physics step, then the contacts it produced.
    pub fn simulate(&mut self, dt: f32, fx: &mut dyn Presentation) {
        self.physics.step(dt);
        for event in self.physics.drain_events() {
            if let Some((a, b)) = event.began() {
                self.did_begin_contact(a, b, fx);
            }
        }
    }

    /// React to two bodies starting to touch. Only the prize reaching the
    /// crocodile matters, and only while the level is being played.
    pub fn did_begin_contact(&mut self, a: EntityId, b: EntityId, fx: &mut dyn Presentation) {
        if self.is_level_over() {
            return;
        }
        let roles = (self.world.get::<Role>(a), self.world.get::<Role>(b));
        let reached = matches!(
            roles,
            (Some(Role::Prize), Some(Role::Crocodile)) | (Some(Role::Crocodile), Some(Role::Prize))
        );
        if reached {
            self.win(fx);
        }
    }

    /// Per-frame hook: the water check, due actions and the mouth animation.
    pub fn update(&mut self, dt: f32, fx: &mut dyn Presentation) -> Option<SceneRequest> {
        if !self.is_level_over() {
            if let Some(position) = self.prize_position() {
                if position.y <= self.layout.water_line {
                    self.lose(fx);
                }
            }
        }

        let mut request = None;
        for action in self.actions.advance(dt) {
            match action {
                SceneAction::RemovePrize => {
                    self.physics.remove_body(self.prize);
                    self.vines.prune_joints(&self.physics);
                    self.world.despawn(self.prize);
                }
                SceneAction::RemoveNodes(entities) => {
                    for entity in entities {
                        self.world.despawn(entity);
                    }
                }
                SceneAction::PresentNextLevel(transition) => {
                    fx.present(Cue::Transition(transition));
                    request = Some(SceneRequest::NextLevel(transition));
                }
            }
        }

        self.present_mouth(dt, fx);
        request
    }

    fn win(&mut self, fx: &mut dyn Presentation) {
        log::info!("the crocodile got the prize");
        self.phase = Phase::LevelOver(Outcome::Won);

        fx.present(Cue::ShrinkOut {
            entity: self.prize,
            duration: PRIZE_SHRINK_TIME,
        });
        self.actions
            .schedule(PRIZE_SHRINK_TIME, SceneAction::RemovePrize);

        self.crocodile.chomp(CHOMP_STEP);
        fx.present(Cue::Sound(SoundCue::NomNom));
        fx.present(Cue::Haptic(Impact::Heavy));
        self.actions.schedule(
            self.restart_delay,
            SceneAction::PresentNextLevel(Transition::Doorway),
        );
    }

    fn lose(&mut self, fx: &mut dyn Presentation) {
        log::info!("the prize fell in the water");
        self.phase = Phase::LevelOver(Outcome::Lost);

        fx.present(Cue::Sound(SoundCue::Splash));
        fx.present(Cue::Haptic(Impact::Light));
        self.actions.schedule(
            self.restart_delay,
            SceneAction::PresentNextLevel(Transition::Fade),
        );
    }

    fn present_mouth(&mut self, dt: f32, fx: &mut dyn Presentation) {
        for mouth in self.crocodile.advance(dt) {
            if let Some(node) = self.world.get_mut::<Node>(self.crocodile_entity) {
                node.image = match mouth {
                    MouthState::Open => image::CROC_MOUTH_OPEN,
                    MouthState::Closed => image::CROC_MOUTH_CLOSED,
                };
            }
            fx.present(Cue::Mouth(mouth));
        }
    }

    // ------------------------------
    // Accessors
    // ------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_level_over(&self) -> bool {
        matches!(self.phase, Phase::LevelOver(_))
    }

    pub fn prize(&self) -> EntityId {
        self.prize
    }

    /// `None` once the prize has been eaten.
    pub fn prize_position(&self) -> Option<Vec2> {
        self.physics.body_position(self.prize)
    }

    pub fn crocodile(&self) -> EntityId {
        self.crocodile_entity
    }

    pub fn mouth(&self) -> MouthState {
        self.crocodile.mouth()
    }

    pub fn vines(&self) -> &VineSet {
        &self.vines
    }

    pub fn vine(&self, id: VineId) -> Result<&VineChain> {
        self.vines.get(id).ok_or_else(|| anyhow!("no {id} in this level"))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }
}
