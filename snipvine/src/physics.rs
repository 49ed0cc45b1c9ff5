//! Rigid body physics behind an engine-facing API.
//!
//! Callers speak `EntityId`s and scene units (points, y up). Rapier works in
//! meters; every position and size crossing this boundary is scaled by
//! `points_per_meter`. Rapier itself is an implementation detail and is not
//! re-exported.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::world::EntityId;

use rapier2d::prelude::*;

/// Engine-facing rigid body type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigidBodyType {
    Dynamic,
    Fixed,
}

/// Engine-facing collider shape, in scene units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box { hx: f32, hy: f32 },
    Circle { radius: f32 },
}

bitflags! {
    /// Physics categories of the bodies in a level.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        const CROCODILE = 1;
        const VINE_HOLDER = 1 << 1;
        const VINE = 1 << 2;
        const PRIZE = 1 << 3;
    }
}

/// Category bitmasks attached to a collider.
///
/// A contact between two colliders is solved when either side's
/// `collides_with` admits the other's category, and a contact event is raised
/// when either side's `contacts_with` does. Fixed bodies never move, so a one
/// sided mask is enough to stop a dynamic body against them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: Category,
    pub collides_with: Category,
    pub contacts_with: Category,
}

impl CollisionFilter {
    /// A filter for `category` that collides with nothing and reports nothing.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            collides_with: Category::empty(),
            contacts_with: Category::empty(),
        }
    }

    #[must_use]
    pub fn collides_with(mut self, mask: Category) -> Self {
        self.collides_with = mask;
        self
    }

    #[must_use]
    pub fn contacts_with(mut self, mask: Category) -> Self {
        self.contacts_with = mask;
        self
    }

    pub fn solves_contact_with(&self, other: &CollisionFilter) -> bool {
        self.collides_with.intersects(other.category)
            || other.collides_with.intersects(self.category)
    }

    pub fn reports_contact_with(&self, other: &CollisionFilter) -> bool {
        self.contacts_with.intersects(other.category)
            || other.contacts_with.intersects(self.category)
    }

    fn to_user_data(self) -> u128 {
        (self.category.bits() as u128)
            | (self.collides_with.bits() as u128) << 32
            | (self.contacts_with.bits() as u128) << 64
    }

    fn from_user_data(data: u128) -> Self {
        let field = |shift: u32| Category::from_bits_truncate((data >> shift) as u32);
        Self {
            category: field(0),
            collides_with: field(32),
            contacts_with: field(64),
        }
    }
}

/// Engine-facing collision event. Uses EntityId only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsEvent {
    CollisionEnter { a: EntityId, b: EntityId },
    CollisionExit { a: EntityId, b: EntityId },
    TriggerEnter { a: EntityId, b: EntityId },
    TriggerExit { a: EntityId, b: EntityId },
}

impl PhysicsEvent {
    /// The pair of a contact that just began, if this is one.
    pub fn began(&self) -> Option<(EntityId, EntityId)> {
        match *self {
            PhysicsEvent::CollisionEnter { a, b } | PhysicsEvent::TriggerEnter { a, b } => {
                Some((a, b))
            }
            _ => None,
        }
    }
}

/// Observer invoked for every physics event as it is collected.
pub type PhysicsEventCallback = Box<dyn Fn(PhysicsEvent) + Send + Sync>;

/// Identifier of a pin joint created through `add_pin_joint`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(u32);

/// One body crossed by a segment query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: EntityId,
    /// Hit point in scene units.
    pub point: Vec2,
    /// Position along the segment, 0 at the start and 1 at the end.
    pub fraction: f32,
}

#[derive(Clone, Copy)]
struct PinJoint {
    a: EntityId,
    b: EntityId,
    handle: ImpulseJointHandle,
}

/// Applies `CollisionFilter`s stored in collider user data.
struct CategoryHooks;

impl PhysicsHooks for CategoryHooks {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let a = CollisionFilter::from_user_data(context.colliders[context.collider1].user_data);
        let b = CollisionFilter::from_user_data(context.colliders[context.collider2].user_data);
        a.solves_contact_with(&b)
            .then_some(SolverFlags::COMPUTE_IMPULSES)
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        let a = CollisionFilter::from_user_data(context.colliders[context.collider1].user_data);
        let b = CollisionFilter::from_user_data(context.colliders[context.collider2].user_data);
        a.reports_contact_with(&b)
    }
}

pub struct PhysicsWorld {
    // --- rapier internals ---
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    event_recv_collision: crossbeam_channel::Receiver<CollisionEvent>,
    event_recv_contact_force: crossbeam_channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,

    // --- mappings (engine <-> rapier) ---
    entity_to_body: HashMap<EntityId, RigidBodyHandle>,
    body_to_entity: HashMap<RigidBodyHandle, EntityId>,
    joints: HashMap<JointId, PinJoint>,
    next_joint: u32,

    /// Meters per second squared.
    gravity: Vec2,
    points_per_meter: f32,
    /// Linear and angular damping of every dynamic body.
    damping: f32,

    pending_events: Vec<PhysicsEvent>,
    callbacks: Vec<PhysicsEventCallback>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub const DEFAULT_POINTS_PER_METER: f32 = 150.0;

    /// Earth gravity pointing down, 150 points per meter.
    pub fn new() -> Self {
        let (send_col, recv_col) = crossbeam_channel::unbounded();
        let (send_force, recv_force) = crossbeam_channel::unbounded();
        let event_handler = ChannelEventCollector::new(send_col, send_force);

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),

            event_recv_collision: recv_col,
            event_recv_contact_force: recv_force,
            event_handler,

            entity_to_body: HashMap::new(),
            body_to_entity: HashMap::new(),
            joints: HashMap::new(),
            next_joint: 0,

            gravity: Vec2::new(0.0, -9.8),
            points_per_meter: Self::DEFAULT_POINTS_PER_METER,
            damping: 0.0,
            pending_events: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Gravity in meters per second squared.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Must be set before any body is created.
    #[must_use]
    pub fn with_points_per_meter(mut self, points_per_meter: f32) -> Self {
        debug_assert!(self.entity_to_body.is_empty());
        self.points_per_meter = points_per_meter.max(f32::EPSILON);
        self
    }

    /// Velocity solver iterations per step. More iterations keep long chains
    /// of joints stiffer under load.
    #[must_use]
    pub fn with_solver_iterations(mut self, iterations: usize) -> Self {
        self.integration_parameters.max_velocity_iterations = iterations.max(1);
        self
    }

    /// Damping of dynamic bodies created from now on.
    #[must_use]
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping.max(0.0);
        self
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(PhysicsEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Create/replace the body of an entity at a scene position.
    pub fn create_body(
        &mut self,
        entity: EntityId,
        body_type: RigidBodyType,
        position: Vec2,
    ) -> Result<()> {
        // One body per entity.
        self.remove_body(entity);

        let rb_type = match body_type {
            RigidBodyType::Dynamic => rapier2d::prelude::RigidBodyType::Dynamic,
            RigidBodyType::Fixed => rapier2d::prelude::RigidBodyType::Fixed,
        };

        let p = self.to_physics(position);
        let mut builder = RigidBodyBuilder::new(rb_type).translation(vector![p.x, p.y]);
        if matches!(body_type, RigidBodyType::Dynamic) {
            builder = builder
                .ccd_enabled(true)
                .linear_damping(self.damping)
                .angular_damping(self.damping);
        }

        let handle = self.rigid_bodies.insert(builder.build());
        self.entity_to_body.insert(entity, handle);
        self.body_to_entity.insert(handle, entity);
        Ok(())
    }

    /// Remove the body of an entity along with its colliders and joints.
    /// Returns whether one existed.
    pub fn remove_body(&mut self, entity: EntityId) -> bool {
        let Some(handle) = self.entity_to_body.remove(&entity) else {
            return false;
        };
        self.rigid_bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.body_to_entity.remove(&handle);
        self.joints.retain(|_, j| j.a != entity && j.b != entity);
        self.update_query_pipeline();
        true
    }

    /// Attach a solid collider.
    pub fn add_collider(
        &mut self,
        entity: EntityId,
        shape: ColliderShape,
        density: f32,
        filter: CollisionFilter,
    ) -> Result<()> {
        self.insert_collider(entity, shape, density, filter, false)
    }

    /// Attach a sensor: it never pushes anything but reports contacts.
    pub fn add_sensor(
        &mut self,
        entity: EntityId,
        shape: ColliderShape,
        filter: CollisionFilter,
    ) -> Result<()> {
        self.insert_collider(entity, shape, 1.0, filter, true)
    }

    /// Pin two bodies together at a scene point. The bodies keep the relative
    /// offset to that point they have right now and rotate freely around it.
    /// Pinned bodies never collide with each other.
    pub fn add_pin_joint(&mut self, a: EntityId, b: EntityId, anchor: Vec2) -> Result<JointId> {
        let ha = self.body_handle(a)?;
        let hb = self.body_handle(b)?;

        let joint = RevoluteJointBuilder::new()
            .local_anchor1(self.local_point(ha, anchor))
            .local_anchor2(self.local_point(hb, anchor))
            .contacts_enabled(false)
            .build();
        let handle = self.impulse_joints.insert(ha, hb, joint, true);

        let id = JointId(self.next_joint);
        self.next_joint += 1;
        self.joints.insert(id, PinJoint { a, b, handle });
        Ok(id)
    }

    /// Move a pin to another scene point without moving either body.
    pub fn move_pin(&mut self, joint: JointId, anchor: Vec2) -> Result<()> {
        let pin = *self
            .joints
            .get(&joint)
            .ok_or_else(|| anyhow!("{:?} does not exist", joint))?;
        let local1 = self.local_point(self.body_handle(pin.a)?, anchor);
        let local2 = self.local_point(self.body_handle(pin.b)?, anchor);

        let data = &mut self
            .impulse_joints
            .get_mut(pin.handle)
            .ok_or_else(|| anyhow!("{:?} lost its rapier joint", joint))?
            .data;
        data.set_local_anchor1(local1).set_local_anchor2(local2);
        Ok(())
    }

    /// Step simulation by fixed dt (seconds).
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        let gravity = vector![self.gravity.x, self.gravity.y];
        let hooks = CategoryHooks;

        self.pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &hooks,
            &self.event_handler,
        );

        self.update_query_pipeline();

        self.collect_events();
    }

    /// Update the query pipeline (call after adding/removing bodies/colliders).
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline
            .update(&self.island_manager, &self.rigid_bodies, &self.colliders);
    }

    /// Drain physics events collected since last drain.
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ------------------------------
    // Per-entity queries/actions
    // ------------------------------

    pub fn body_position(&self, entity: EntityId) -> Option<Vec2> {
        let b = self.rigid_bodies.get(*self.entity_to_body.get(&entity)?)?;
        let t = b.translation();
        Some(self.from_physics(Vec2::new(t.x, t.y)))
    }

    pub fn body_rotation(&self, entity: EntityId) -> Option<f32> {
        let b = self.rigid_bodies.get(*self.entity_to_body.get(&entity)?)?;
        Some(b.rotation().angle())
    }

    /// Linear velocity in scene units per second.
    pub fn linear_velocity(&self, entity: EntityId) -> Option<Vec2> {
        let b = self.rigid_bodies.get(*self.entity_to_body.get(&entity)?)?;
        let v = b.linvel();
        Some(self.from_physics(Vec2::new(v.x, v.y)))
    }

    /// Place a body at rest at a scene position, rotated by `rotation` radians.
    pub fn set_body_pose(&mut self, entity: EntityId, pos: Vec2, rotation: f32) {
        let p = self.to_physics(pos);
        if let Some(h) = self.entity_to_body.get(&entity).copied() {
            if let Some(b) = self.rigid_bodies.get_mut(h) {
                b.set_position(Isometry::new(vector![p.x, p.y], rotation), true);
                b.set_linvel(vector![0.0, 0.0], true);
                b.set_angvel(0.0, true);
            }
            self.sync_colliders(h);
        }
    }

    pub fn has_body(&self, entity: EntityId) -> bool {
        self.entity_to_body.contains_key(&entity)
    }

    pub fn body_count(&self) -> usize {
        self.entity_to_body.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Number of live joints with `entity` on either side.
    pub fn joints_attached_to(&self, entity: EntityId) -> usize {
        self.joints
            .values()
            .filter(|j| j.a == entity || j.b == entity)
            .count()
    }

    pub fn has_joint(&self, joint: JointId) -> bool {
        self.joints.contains_key(&joint)
    }

    // ------------------------------
    // Queries
    // ------------------------------

    /// Every body crossed by the segment `from -> to`, nearest to `from` first.
    /// A body is reported once, at its nearest hit.
    pub fn cast_segment(&self, from: Vec2, to: Vec2) -> Vec<RayHit> {
        let dir = to - from;
        if dir.length_squared() <= f32::EPSILON {
            return Vec::new();
        }

        let origin = self.to_physics(from);
        let d = self.to_physics(dir);
        let ray = Ray::new(point![origin.x, origin.y], vector![d.x, d.y]);

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.rigid_bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
            |handle, intersection| {
                let entity = self
                    .colliders
                    .get(handle)
                    .and_then(|c| c.parent())
                    .and_then(|body| self.body_to_entity.get(&body));
                if let Some(&entity) = entity {
                    hits.push(RayHit {
                        entity,
                        point: from + dir * intersection.toi,
                        fraction: intersection.toi,
                    });
                }
                true
            },
        );

        hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        let mut seen = HashSet::new();
        hits.retain(|hit| seen.insert(hit.entity));
        hits
    }

    // ------------------------------
    // Private helpers
    // ------------------------------

    fn insert_collider(
        &mut self,
        entity: EntityId,
        shape: ColliderShape,
        density: f32,
        filter: CollisionFilter,
        sensor: bool,
    ) -> Result<()> {
        let body = self.body_handle(entity)?;

        let mut events = ActiveEvents::empty();
        if sensor || !filter.contacts_with.is_empty() {
            events |= ActiveEvents::COLLISION_EVENTS;
        }

        let collider = ColliderBuilder::new(self.to_rapier_shape(shape))
            .density(density)
            .sensor(sensor)
            .user_data(filter.to_user_data())
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR)
            .active_events(events)
            .build();

        self.colliders
            .insert_with_parent(collider, body, &mut self.rigid_bodies);
        self.update_query_pipeline();
        Ok(())
    }

    /// Carry a body's colliders to where the body is now, so that queries see
    /// bodies moved since the last step.
    fn sync_colliders(&mut self, handle: RigidBodyHandle) {
        let Some(body) = self.rigid_bodies.get(handle) else {
            return;
        };
        let pose = *body.position();
        for collider in body.colliders() {
            if let Some(collider) = self.colliders.get_mut(*collider) {
                if let Some(local) = collider.position_wrt_parent().copied() {
                    collider.set_position(pose * local);
                }
            }
        }
        self.update_query_pipeline();
    }

    /// A scene point in the local frame of a body, in meters.
    fn local_point(&self, body: RigidBodyHandle, at: Vec2) -> Point<Real> {
        let p = self.to_physics(at);
        self.rigid_bodies[body]
            .position()
            .inverse_transform_point(&point![p.x, p.y])
    }

    fn body_handle(&self, entity: EntityId) -> Result<RigidBodyHandle> {
        self.entity_to_body
            .get(&entity)
            .copied()
            .ok_or_else(|| anyhow!("Entity {:?} has no physics body", entity))
    }

    fn to_physics(&self, v: Vec2) -> Vec2 {
        v / self.points_per_meter
    }

    fn from_physics(&self, v: Vec2) -> Vec2 {
        v * self.points_per_meter
    }

    fn to_rapier_shape(&self, s: ColliderShape) -> SharedShape {
        let k = self.points_per_meter;
        match s {
            ColliderShape::Box { hx, hy } => SharedShape::cuboid(hx / k, hy / k),
            ColliderShape::Circle { radius } => SharedShape::ball(radius / k),
        }
    }

    fn collect_events(&mut self) {
        while let Ok(ev) = self.event_recv_collision.try_recv() {
            match ev {
                CollisionEvent::Started(c1, c2, _) => {
                    if let Some((a, b, is_trigger)) = self.map_pair(c1, c2) {
                        let e = if is_trigger {
                            PhysicsEvent::TriggerEnter { a, b }
                        } else {
                            PhysicsEvent::CollisionEnter { a, b }
                        };
                        self.push_event(e);
                    }
                }
                CollisionEvent::Stopped(c1, c2, _) => {
                    if let Some((a, b, is_trigger)) = self.map_pair(c1, c2) {
                        let e = if is_trigger {
                            PhysicsEvent::TriggerExit { a, b }
                        } else {
                            PhysicsEvent::CollisionExit { a, b }
                        };
                        self.push_event(e);
                    }
                }
            }
        }

        // Contact force events are not enabled on any collider; keep the channel empty.
        while self.event_recv_contact_force.try_recv().is_ok() {}
    }

    fn map_pair(
        &self,
        c1: ColliderHandle,
        c2: ColliderHandle,
    ) -> Option<(EntityId, EntityId, bool)> {
        let col1 = self.colliders.get(c1)?;
        let col2 = self.colliders.get(c2)?;
        let e1 = *self.body_to_entity.get(&col1.parent()?)?;
        let e2 = *self.body_to_entity.get(&col2.parent()?)?;

        let is_trigger = col1.is_sensor() || col2.is_sensor();
        Some((e1, e2, is_trigger))
    }

    fn push_event(&mut self, e: PhysicsEvent) {
        for cb in &self.callbacks {
            cb(e);
        }
        self.pending_events.push(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    const DT: f32 = 1.0 / 60.0;

    fn vine_filter() -> CollisionFilter {
        CollisionFilter::new(Category::VINE).collides_with(Category::VINE_HOLDER)
    }

    #[test]
    fn filter_round_trips_through_user_data() {
        let f = CollisionFilter::new(Category::CROCODILE).contacts_with(Category::PRIZE);
        assert_eq!(CollisionFilter::from_user_data(f.to_user_data()), f);
    }

    #[test]
    fn contact_solving_needs_one_side() {
        let holder = CollisionFilter::new(Category::VINE_HOLDER);
        let vine = vine_filter();
        assert!(vine.solves_contact_with(&holder));
        assert!(holder.solves_contact_with(&vine));

        let prize = CollisionFilter::new(Category::PRIZE).contacts_with(Category::CROCODILE);
        assert!(!prize.solves_contact_with(&holder));
        assert!(!prize.solves_contact_with(&vine));
    }

    #[test]
    fn vine_rests_on_a_holder() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new();
        let holder = world.spawn();
        let plank = world.spawn();

        physics
            .create_body(holder, RigidBodyType::Fixed, Vec2::new(0.0, 0.0))
            .unwrap();
        physics
            .add_collider(
                holder,
                ColliderShape::Circle { radius: 10.0 },
                1.0,
                CollisionFilter::new(Category::VINE_HOLDER),
            )
            .unwrap();
        physics
            .create_body(plank, RigidBodyType::Dynamic, Vec2::new(0.0, 40.0))
            .unwrap();
        physics
            .add_collider(plank, ColliderShape::Box { hx: 20.0, hy: 5.0 }, 1.0, vine_filter())
            .unwrap();

        for _ in 0..45 {
            physics.step(DT);
        }

        let y = physics.body_position(plank).unwrap().y;
        assert!(y > 10.0, "vine fell through the holder to {y}");
    }

    #[test]
    fn contact_reporting_needs_one_side() {
        let croc = CollisionFilter::new(Category::CROCODILE).contacts_with(Category::PRIZE);
        let prize = CollisionFilter::new(Category::PRIZE);
        let vine = vine_filter();
        assert!(croc.reports_contact_with(&prize));
        assert!(prize.reports_contact_with(&croc));
        assert!(!croc.reports_contact_with(&vine));
    }

    #[test]
    fn dynamic_body_falls_and_fixed_body_stays() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new();
        let ball = world.spawn();
        let ground = world.spawn();

        physics
            .create_body(ball, RigidBodyType::Dynamic, Vec2::new(0.0, 100.0))
            .unwrap();
        physics
            .add_collider(ball, ColliderShape::Circle { radius: 5.0 }, 1.0, vine_filter())
            .unwrap();
        physics
            .create_body(ground, RigidBodyType::Fixed, Vec2::new(0.0, 50.0))
            .unwrap();

        for _ in 0..30 {
            physics.step(DT);
        }

        assert!(physics.body_position(ball).unwrap().y < 100.0);
        assert_eq!(physics.body_position(ground).unwrap(), Vec2::new(0.0, 50.0));
    }

    #[test]
    fn pinned_body_hangs_from_fixed_anchor() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new();
        let anchor = world.spawn();
        let bob = world.spawn();

        physics
            .create_body(anchor, RigidBodyType::Fixed, Vec2::new(0.0, 200.0))
            .unwrap();
        physics
            .create_body(bob, RigidBodyType::Dynamic, Vec2::new(0.0, 170.0))
            .unwrap();
        physics
            .add_collider(bob, ColliderShape::Box { hx: 4.0, hy: 10.0 }, 1.0, vine_filter())
            .unwrap();
        let joint = physics
            .add_pin_joint(anchor, bob, Vec2::new(0.0, 200.0))
            .unwrap();

        for _ in 0..120 {
            physics.step(DT);
        }

        let y = physics.body_position(bob).unwrap().y;
        assert!((y - 170.0).abs() < 3.0, "bob drifted to {y}");
        assert!(physics.has_joint(joint));
        assert_eq!(physics.joints_attached_to(bob), 1);

        assert!(physics.remove_body(bob));
        assert!(!physics.has_joint(joint));
        assert_eq!(physics.joint_count(), 0);
        assert!(!physics.remove_body(bob));
    }

    #[test]
    fn moved_pin_holds_bodies_where_they_are() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new().with_damping(2.0);
        let anchor = world.spawn();
        let bob = world.spawn();

        physics
            .create_body(anchor, RigidBodyType::Fixed, Vec2::new(0.0, 200.0))
            .unwrap();
        physics
            .create_body(bob, RigidBodyType::Dynamic, Vec2::new(0.0, 170.0))
            .unwrap();
        physics
            .add_collider(bob, ColliderShape::Box { hx: 4.0, hy: 10.0 }, 1.0, vine_filter())
            .unwrap();
        let joint = physics
            .add_pin_joint(anchor, bob, Vec2::new(0.0, 200.0))
            .unwrap();

        // Swing the bob out sideways, pointing away from the anchor.
        let rotation = std::f32::consts::FRAC_PI_2;
        physics.set_body_pose(bob, Vec2::new(30.0, 200.0), rotation);
        physics.move_pin(joint, Vec2::new(0.0, 200.0)).unwrap();
        let placed = physics.body_position(bob).unwrap();
        assert!(placed.distance(Vec2::new(30.0, 200.0)) < 1e-3);
        assert!((physics.body_rotation(bob).unwrap() - rotation).abs() < 1e-5);

        for _ in 0..120 {
            physics.step(DT);
        }

        // Still 30 points from the pin, now hanging below it.
        let p = physics.body_position(bob).unwrap();
        let reach = p.distance(Vec2::new(0.0, 200.0));
        assert!((reach - 30.0).abs() < 3.0, "bob at {p:?}");
        assert!(p.y < 190.0, "bob still swinging at {p:?}");

        assert!(physics.move_pin(JointId(99), Vec2::ZERO).is_err());
    }

    #[test]
    fn segment_query_orders_hits_from_the_start_point() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new();
        let left = world.spawn();
        let right = world.spawn();
        for (entity, x) in [(right, 60.0), (left, 20.0)] {
            physics
                .create_body(entity, RigidBodyType::Fixed, Vec2::new(x, 0.0))
                .unwrap();
            physics
                .add_collider(entity, ColliderShape::Box { hx: 4.0, hy: 10.0 }, 1.0, vine_filter())
                .unwrap();
        }

        let hits = physics.cast_segment(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0));
        let order: Vec<EntityId> = hits.iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![left, right]);
        assert!((hits[0].point.x - 16.0).abs() < 0.01);

        let reversed = physics.cast_segment(Vec2::new(100.0, 0.0), Vec2::new(0.0, 0.0));
        assert_eq!(reversed[0].entity, right);

        assert!(physics
            .cast_segment(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0))
            .is_empty());
    }

    #[test]
    fn segment_query_sees_bodies_moved_before_a_step() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new();
        let e = world.spawn();
        physics
            .create_body(e, RigidBodyType::Dynamic, Vec2::new(0.0, 0.0))
            .unwrap();
        physics
            .add_collider(e, ColliderShape::Box { hx: 4.0, hy: 4.0 }, 1.0, vine_filter())
            .unwrap();
        physics.set_body_pose(e, Vec2::new(50.0, 0.0), 0.0);

        let hits = physics.cast_segment(Vec2::new(40.0, 0.0), Vec2::new(60.0, 0.0));
        assert_eq!(hits.len(), 1);
        assert!(physics
            .cast_segment(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0))
            .is_empty());

        physics.remove_body(e);
        assert!(physics
            .cast_segment(Vec2::new(40.0, 0.0), Vec2::new(60.0, 0.0))
            .is_empty());
    }

    #[test]
    fn sensor_reports_trigger_with_matching_category() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new();
        let sensor = world.spawn();
        let falling = world.spawn();

        physics
            .create_body(sensor, RigidBodyType::Fixed, Vec2::new(0.0, 0.0))
            .unwrap();
        physics
            .add_sensor(
                sensor,
                ColliderShape::Box { hx: 50.0, hy: 20.0 },
                CollisionFilter::new(Category::CROCODILE).contacts_with(Category::PRIZE),
            )
            .unwrap();
        physics
            .create_body(falling, RigidBodyType::Dynamic, Vec2::new(0.0, 60.0))
            .unwrap();
        physics
            .add_collider(
                falling,
                ColliderShape::Circle { radius: 10.0 },
                0.5,
                CollisionFilter::new(Category::PRIZE).contacts_with(Category::CROCODILE),
            )
            .unwrap();

        let mut began = Vec::new();
        for _ in 0..60 {
            physics.step(DT);
            began.extend(physics.drain_events().iter().filter_map(|e| e.began()));
        }

        assert_eq!(began.len(), 1);
        let (a, b) = began[0];
        assert!((a == sensor && b == falling) || (a == falling && b == sensor));
    }
}
