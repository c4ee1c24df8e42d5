//! The component registry: entity lifetime plus a sparse, per-type component
//! store.
//!
//! Each component type gets its own `HashMap<EntityId, C>`, erased behind a
//! small trait object so the registry can evict a destroyed entity from
//! every storage without knowing the concrete component types up front --
//! the same shape as a `std::unordered_map<type_index, ComponentStorageBase>`
//! in the reference implementation this crate is modeled on, translated to
//! a tagged-union-free, no-inheritance Rust form.

use crate::entity::{EntityAllocator, EntityId};
use crate::error::RegistryError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

trait ErasedStorage: Any {
    fn remove_entity(&mut self, id: EntityId) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: 'static> ErasedStorage for HashMap<EntityId, C> {
    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.remove(&id).is_some()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Entity lifetime plus per-type component storage.
#[derive(Default)]
pub struct Registry {
    allocator: EntityAllocator,
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Destroys an entity, evicting it from every component storage.
    /// A no-op on an already-dead or unknown id.
    pub fn destroy(&mut self, id: EntityId) {
        if self.allocator.deallocate(id) {
            for storage in self.storages.values_mut() {
                storage.remove_entity(id);
            }
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn clear(&mut self) {
        self.allocator.clear();
        self.storages.clear();
    }

    fn storage<C: 'static>(&self) -> Option<&HashMap<EntityId, C>> {
        self.storages
            .get(&TypeId::of::<C>())
            .map(|s| s.as_any().downcast_ref::<HashMap<EntityId, C>>().unwrap())
    }

    fn storage_mut<C: 'static>(&mut self) -> &mut HashMap<EntityId, C> {
        self.storages
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(HashMap::<EntityId, C>::new()))
            .as_any_mut()
            .downcast_mut::<HashMap<EntityId, C>>()
            .unwrap()
    }

    pub fn emplace<C: 'static>(&mut self, id: EntityId, value: C) -> Result<&mut C, RegistryError> {
        if !self.allocator.is_alive(id) {
            return Err(RegistryError::DeadEntity { entity: id });
        }
        let map = self.storage_mut::<C>();
        map.insert(id, value);
        Ok(map.get_mut(&id).unwrap())
    }

    pub fn has<C: 'static>(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id) && self.storage::<C>().is_some_and(|m| m.contains_key(&id))
    }

    pub fn get<C: 'static>(&self, id: EntityId) -> Result<&C, RegistryError> {
        self.storage::<C>()
            .and_then(|m| m.get(&id))
            .ok_or(RegistryError::ComponentNotFound {
                entity: id,
                component: std::any::type_name::<C>(),
            })
    }

    pub fn get_mut<C: 'static>(&mut self, id: EntityId) -> Result<&mut C, RegistryError> {
        let name = std::any::type_name::<C>();
        self.storage_mut::<C>()
            .get_mut(&id)
            .ok_or(RegistryError::ComponentNotFound {
                entity: id,
                component: name,
            })
    }

    /// Removes a component from an entity. Idempotent: removing an absent
    /// component, or acting on a dead entity, is a silent no-op.
    pub fn remove<C: 'static>(&mut self, id: EntityId) {
        if let Some(storage) = self.storages.get_mut(&TypeId::of::<C>()) {
            storage.remove_entity(id);
        }
    }

    /// Lazily iterates the live entities that carry every component in `T`,
    /// in ascending `EntityId` order.
    pub fn view<'a, T: ViewTuple<'a>>(&'a self) -> View<'a, T> {
        View {
            registry: self,
            cursor: 0,
            high: self.allocator.high_watermark(),
            _marker: PhantomData,
        }
    }

    /// Materializes the ascending-order id list of live entities carrying
    /// every component in `T`. Used by systems that need mutable access to
    /// more than one component at a time, where simultaneous borrowing
    /// through a lazy iterator is not expressible safely.
    pub fn ids_matching<'a, T: ViewTuple<'a>>(&'a self) -> Vec<EntityId> {
        self.view::<T>().map(|(id, _)| id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.allocator.alive_count()
    }
}

/// A set of component types that can be fetched together for a given id.
pub trait ViewTuple<'a> {
    type Refs;
    fn fetch(registry: &'a Registry, id: EntityId) -> Option<Self::Refs>;
}

impl<'a, A: 'static> ViewTuple<'a> for (A,) {
    type Refs = &'a A;
    fn fetch(registry: &'a Registry, id: EntityId) -> Option<Self::Refs> {
        registry.get::<A>(id).ok()
    }
}

impl<'a, A: 'static, B: 'static> ViewTuple<'a> for (A, B) {
    type Refs = (&'a A, &'a B);
    fn fetch(registry: &'a Registry, id: EntityId) -> Option<Self::Refs> {
        Some((registry.get::<A>(id).ok()?, registry.get::<B>(id).ok()?))
    }
}

impl<'a, A: 'static, B: 'static, C: 'static> ViewTuple<'a> for (A, B, C) {
    type Refs = (&'a A, &'a B, &'a C);
    fn fetch(registry: &'a Registry, id: EntityId) -> Option<Self::Refs> {
        Some((
            registry.get::<A>(id).ok()?,
            registry.get::<B>(id).ok()?,
            registry.get::<C>(id).ok()?,
        ))
    }
}

impl<'a, A: 'static, B: 'static, C: 'static, D: 'static> ViewTuple<'a> for (A, B, C, D) {
    type Refs = (&'a A, &'a B, &'a C, &'a D);
    fn fetch(registry: &'a Registry, id: EntityId) -> Option<Self::Refs> {
        Some((
            registry.get::<A>(id).ok()?,
            registry.get::<B>(id).ok()?,
            registry.get::<C>(id).ok()?,
            registry.get::<D>(id).ok()?,
        ))
    }
}

/// Lazy, non-allocating iterator over entities satisfying a [`ViewTuple`].
pub struct View<'a, T: ViewTuple<'a>> {
    registry: &'a Registry,
    cursor: u32,
    high: u32,
    _marker: PhantomData<T>,
}

impl<'a, T: ViewTuple<'a>> Iterator for View<'a, T> {
    type Item = (EntityId, T::Refs);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.high {
            let idx = self.cursor;
            self.cursor += 1;
            if !self.registry.allocator.is_index_alive(idx) {
                continue;
            }
            let gen = self
                .registry
                .allocator
                .generation_of(idx)
                .expect("index below high watermark always has a generation");
            let id = EntityId::new(idx, gen);
            if let Some(refs) = T::fetch(self.registry, id) {
                return Some((id, refs));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos(f32, f32);
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel(f32, f32);

    #[test]
    fn destroy_evicts_from_every_storage_and_id_is_reusable() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.emplace(e, Pos(1.0, 2.0)).unwrap();
        reg.emplace(e, Vel(0.0, 0.0)).unwrap();
        reg.destroy(e);
        assert!(!reg.is_alive(e));
        assert!(!reg.has::<Pos>(e));
        assert!(!reg.has::<Vel>(e));

        let e2 = reg.create();
        assert_eq!(e2.index(), e.index());
        assert_ne!(e2, e);
    }

    #[test]
    fn emplace_on_dead_entity_fails() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.destroy(e);
        assert!(matches!(
            reg.emplace(e, Pos(0.0, 0.0)),
            Err(RegistryError::DeadEntity { .. })
        ));
    }

    #[test]
    fn get_missing_component_fails() {
        let mut reg = Registry::new();
        let e = reg.create();
        assert!(matches!(
            reg.get::<Pos>(e),
            Err(RegistryError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn destroy_dead_id_is_noop() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.destroy(e);
        reg.destroy(e); // second call must not panic
        assert!(!reg.is_alive(e));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.remove::<Pos>(e);
        reg.emplace(e, Pos(1.0, 1.0)).unwrap();
        reg.remove::<Pos>(e);
        reg.remove::<Pos>(e);
        assert!(!reg.has::<Pos>(e));
    }

    #[test]
    fn view_iterates_ascending_and_intersects_required_components() {
        let mut reg = Registry::new();
        let e0 = reg.create();
        reg.emplace(e0, Pos(0.0, 0.0)).unwrap();
        reg.emplace(e0, Vel(1.0, 0.0)).unwrap();

        let e1 = reg.create();
        reg.emplace(e1, Pos(1.0, 0.0)).unwrap(); // no Vel, excluded

        let e2 = reg.create();
        reg.emplace(e2, Pos(2.0, 0.0)).unwrap();
        reg.emplace(e2, Vel(2.0, 0.0)).unwrap();

        let ids: Vec<EntityId> = reg.view::<(Pos, Vel)>().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![e0, e2]);
    }

    #[test]
    fn view_skips_dead_entities() {
        let mut reg = Registry::new();
        let e0 = reg.create();
        reg.emplace(e0, Pos(0.0, 0.0)).unwrap();
        let e1 = reg.create();
        reg.emplace(e1, Pos(1.0, 0.0)).unwrap();
        reg.destroy(e0);

        let ids: Vec<EntityId> = reg.view::<(Pos,)>().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![e1]);
    }
}
