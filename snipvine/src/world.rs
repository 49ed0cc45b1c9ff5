use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Unique identifier for an entity in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Get the underlying integer ID (useful for debugging).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Storage = HashMap<EntityId, Box<dyn Any>>;

/// Scene graph storage: entity ids plus typed components keyed by entity.
///
/// The scene keeps one `Node` (what is drawn) and one `Role` (what the entity
/// is in the game) per entity. Components are indexed by their Rust type, so
/// any other per-entity record can be attached the same way.
pub struct World {
    next_id: u32,
    alive: HashSet<EntityId>,
    storages: HashMap<TypeId, Storage>,
}

impl World {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            alive: HashSet::new(),
            storages: HashMap::new(),
        }
    }

    /// Spawn a new entity and return its `EntityId`.
    pub fn spawn(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.alive.insert(id);
        id
    }

    /// Despawn an entity, removing all of its components. Returns whether it was alive.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        for storage in self.storages.values_mut() {
            storage.remove(&entity);
        }
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    /// Number of alive entities.
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Insert a component of type `T`, overwriting any existing one.
    /// Inserting on a dead entity is ignored.
    pub fn insert<T: Any>(&mut self, entity: EntityId, component: T) {
        if !self.is_alive(entity) {
            log::debug!("ignoring component insert on dead entity {entity}");
            return;
        }
        self.storages
            .entry(TypeId::of::<T>())
            .or_default()
            .insert(entity, Box::new(component));
    }

    pub fn get<T: Any>(&self, entity: EntityId) -> Option<&T> {
        self.storages
            .get(&TypeId::of::<T>())?
            .get(&entity)
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storages
            .get_mut(&TypeId::of::<T>())?
            .get_mut(&entity)
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    /// All entities carrying a component of type `T`, sorted by id.
    pub fn query<T: Any>(&self) -> Vec<(EntityId, &T)> {
        let Some(storage) = self.storages.get(&TypeId::of::<T>()) else {
            return Vec::new();
        };
        let mut found: Vec<(EntityId, &T)> = storage
            .iter()
            .filter_map(|(&entity, boxed)| boxed.downcast_ref::<T>().map(|c| (entity, c)))
            .collect();
        found.sort_by_key(|(entity, _)| *entity);
        found
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tag(&'static str);

    #[test]
    fn despawn_drops_components() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.insert(a, Tag("a"));
        world.insert(b, Tag("b"));

        assert!(world.despawn(a));
        assert!(!world.despawn(a));
        assert_eq!(world.get::<Tag>(a), None);
        assert_eq!(world.query::<Tag>(), vec![(b, &Tag("b"))]);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn insert_on_dead_entity_is_ignored() {
        let mut world = World::new();
        let a = world.spawn();
        world.despawn(a);
        world.insert(a, Tag("ghost"));
        assert!(world.query::<Tag>().is_empty());
    }
}
