use crate::entity::EntityId;

/// Errors produced by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// `emplace` was called against a dead or never-allocated entity.
    #[error("entity {entity} is dead, cannot emplace a component on it")]
    DeadEntity { entity: EntityId },

    /// `get`/`get_mut` was called for a component the entity does not carry.
    #[error("entity {entity} has no component '{component}'")]
    ComponentNotFound {
        entity: EntityId,
        component: &'static str,
    },
}
