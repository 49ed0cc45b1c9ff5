//! Vines: chains of rigid segments pinned between a fixed holder and the prize.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::{anyhow, bail, ensure, Result};

use crate::config::SceneLayout;
use crate::level::VineDescriptor;
use crate::math::Vec2;
use crate::node::{image, layer, Node, Role};
use crate::physics::{
    Category, ColliderShape, CollisionFilter, JointId, PhysicsWorld, RigidBodyType,
};
use crate::world::{EntityId, World};

/// Keeps a default prize within a few times the mass of one segment. Joint
/// chains sag apart when the body at their end outweighs a link by much more.
const SEGMENT_DENSITY: f32 = 3.0;

/// Identity shared by every segment of one vine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VineId(u32);

impl VineId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for VineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vine {}", self.0)
    }
}

/// One link of a vine.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidSegment {
    pub entity: EntityId,
    pub owner: VineId,
    pub size: Vec2,
    /// False once the vine has been severed and the body removed.
    pub physics_enabled: bool,
}

/// A vine hanging from its holder.
///
/// Segments are ordered from the holder end to the prize end. A chain of `n`
/// segments owns `n` joints once built (holder to first segment, then one per
/// adjacent pair) and `n + 1` once attached to the prize.
#[derive(Debug)]
pub struct VineChain {
    id: VineId,
    anchor: Vec2,
    holder: EntityId,
    segments: Vec<RigidSegment>,
    joints: Vec<JointId>,
    cut: bool,
}

impl VineChain {
    /// Spawn the holder and segments of a vine hanging straight down from
    /// `anchor` and pin them together.
    pub fn build(
        id: VineId,
        descriptor: &VineDescriptor,
        anchor: Vec2,
        layout: &SceneLayout,
        world: &mut World,
        physics: &mut PhysicsWorld,
    ) -> Result<Self> {
        ensure!(descriptor.length > 0, "{id} has no segments");

        let holder = world.spawn();
        world.insert(
            holder,
            Node::new(image::VINE_HOLDER, layer::VINE + 1.0, layout.vine_holder_size).at(anchor),
        );
        world.insert(holder, Role::VineHolder(id));
        physics.create_body(holder, RigidBodyType::Fixed, anchor)?;
        physics.add_collider(
            holder,
            ColliderShape::Circle {
                radius: layout.vine_holder_size.x / 2.0,
            },
            1.0,
            CollisionFilter::new(Category::VINE_HOLDER),
        )?;

        let size = layout.vine_segment_size;
        let mut segments = Vec::with_capacity(descriptor.length);
        for i in 0..descriptor.length {
            let entity = world.spawn();
            world.insert(entity, Node::new(image::VINE_TEXTURE, layer::VINE, size));
            world.insert(entity, Role::VineSegment(id));

            let offset = size.y * (i + 1) as f32;
            physics.create_body(
                entity,
                RigidBodyType::Dynamic,
                Vec2::new(anchor.x, anchor.y - offset),
            )?;
            physics.add_collider(
                entity,
                ColliderShape::Box {
                    hx: size.x / 2.0,
                    hy: size.y / 2.0,
                },
                SEGMENT_DENSITY,
                CollisionFilter::new(Category::VINE).collides_with(Category::VINE_HOLDER),
            )?;

            segments.push(RigidSegment {
                entity,
                owner: id,
                size,
                physics_enabled: true,
            });
        }

        let mut joints = Vec::with_capacity(descriptor.length + 1);
        joints.push(physics.add_pin_joint(holder, segments[0].entity, anchor)?);
        for pair in segments.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            let upper_center = physics
                .body_position(upper.entity)
                .ok_or_else(|| anyhow!("segment {} has no body", upper.entity))?;
            let bottom_edge = Vec2::new(upper_center.x, upper_center.y - upper.size.y / 2.0);
            joints.push(physics.add_pin_joint(upper.entity, lower.entity, bottom_edge)?);
        }

        log::debug!(
            "built {id}: {} segments at ({:.1}, {:.1})",
            segments.len(),
            anchor.x,
            anchor.y
        );

        Ok(Self {
            id,
            anchor,
            holder,
            segments,
            joints,
            cut: false,
        })
    }

    /// Pin the last segment to the prize, just above its center.
    ///
    /// The chain is first laid out straight from the holder to that point so
    /// that every joint starts out holding its bodies where they are.
    pub fn attach_to_prize(
        &mut self,
        prize: EntityId,
        prize_size: Vec2,
        physics: &mut PhysicsWorld,
    ) -> Result<()> {
        if self.cut {
            bail!("{} is cut and cannot be attached", self.id);
        }
        if self.joints.len() > self.segments.len() {
            bail!("{} is already attached", self.id);
        }
        let last = self
            .segments
            .last()
            .ok_or_else(|| anyhow!("{} has no segments", self.id))?
            .entity;
        let prize_center = physics
            .body_position(prize)
            .ok_or_else(|| anyhow!("prize {prize} has no body"))?;

        let attach_point = Vec2::new(prize_center.x, prize_center.y + prize_size.y * 0.1);
        self.lay_out_towards(attach_point, physics)?;
        self.joints
            .push(physics.add_pin_joint(last, prize, attach_point)?);
        Ok(())
    }

    /// Spread the segments evenly along the line from the anchor to `end`,
    /// the last one centered on `end`, and carry the pins along.
    fn lay_out_towards(&self, end: Vec2, physics: &mut PhysicsWorld) -> Result<()> {
        let span = end - self.anchor;
        let step = span / self.segments.len() as f32;
        // Turns a segment hanging straight down onto the line.
        let rotation = if span.length_squared() > f32::EPSILON {
            span.x.atan2(-span.y)
        } else {
            0.0
        };

        for (i, segment) in self.segments.iter().enumerate() {
            physics.set_body_pose(segment.entity, self.anchor + step * (i + 1) as f32, rotation);
        }
        // The holder pin stays on the anchor. Every other pin sits halfway
        // between the two segments it joins.
        for (i, joint) in self.joints.iter().enumerate() {
            let pin = if i == 0 {
                self.anchor
            } else {
                self.anchor + step * (i as f32 + 0.5)
            };
            physics.move_pin(*joint, pin)?;
        }
        Ok(())
    }

    /// Remove every segment from the simulation. Returns the removed segment
    /// entities, or nothing when the vine was already cut.
    pub fn sever(&mut self, physics: &mut PhysicsWorld) -> Vec<EntityId> {
        if self.cut {
            return Vec::new();
        }
        self.cut = true;

        let mut removed = Vec::with_capacity(self.segments.len());
        for segment in &mut self.segments {
            physics.remove_body(segment.entity);
            segment.physics_enabled = false;
            removed.push(segment.entity);
        }
        self.prune_joints(physics);
        removed
    }

    pub fn id(&self) -> VineId {
        self.id
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn holder(&self) -> EntityId {
        self.holder
    }

    pub fn segments(&self) -> &[RigidSegment] {
        &self.segments
    }

    /// Joints of this vine still in the simulation.
    pub fn joints(&self) -> &[JointId] {
        &self.joints
    }

    /// Forget joints the simulation dropped along with one of their bodies.
    pub fn prune_joints(&mut self, physics: &PhysicsWorld) {
        self.joints.retain(|joint| physics.has_joint(*joint));
    }

    pub fn is_cut(&self) -> bool {
        self.cut
    }
}

/// Every vine of a level, with the segment to vine lookup used by cuts.
#[derive(Debug, Default)]
pub struct VineSet {
    chains: BTreeMap<VineId, VineChain>,
    owners: HashMap<EntityId, VineId>,
}

impl VineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chain: VineChain) {
        for segment in &chain.segments {
            self.owners.insert(segment.entity, chain.id);
        }
        if let Some(previous) = self.chains.insert(chain.id, chain) {
            log::warn!("{} was built twice; replacing it", previous.id);
        }
    }

    /// The vine an entity is a segment of.
    pub fn owner_of(&self, entity: EntityId) -> Option<VineId> {
        self.owners.get(&entity).copied()
    }

    pub fn get(&self, id: VineId) -> Option<&VineChain> {
        self.chains.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VineChain> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Forget joints of every vine that the simulation no longer has.
    pub fn prune_joints(&mut self, physics: &PhysicsWorld) {
        for chain in self.chains.values_mut() {
            chain.prune_joints(physics);
        }
    }

    /// Vines not cut yet.
    pub fn intact(&self) -> usize {
        self.chains.values().filter(|c| !c.is_cut()).count()
    }

    /// Sever a vine. `None` when the id is unknown or the vine was already cut.
    pub fn sever(&mut self, id: VineId, physics: &mut PhysicsWorld) -> Option<Vec<EntityId>> {
        let chain = self.chains.get_mut(&id)?;
        if chain.is_cut() {
            return None;
        }
        let removed = chain.sever(physics);
        for entity in &removed {
            self.owners.remove(entity);
        }
        log::debug!("severed {id} ({} segments)", removed.len());
        Some(removed)
    }
}
