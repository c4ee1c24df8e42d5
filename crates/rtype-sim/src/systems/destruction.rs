//! `DestructionSystem`: finalizes a caller-composed dead list.

use rtype_ecs::{EntityId, Registry};

use crate::events::{DestroyEvent, EventBus};

/// Destroys every still-alive id in `dead_list`, publishing one
/// `DestroyEvent` per actual destruction. Ids already dead (e.g. listed
/// twice by the caller) are silently skipped.
pub fn destruction_system(registry: &mut Registry, dead_list: &[EntityId], bus: &mut EventBus) {
    for &id in dead_list {
        if registry.is_alive(id) {
            registry.destroy(id);
            bus.publish_destroy(DestroyEvent { id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroys_each_alive_id_once() {
        let mut registry = Registry::new();
        let e = registry.create();
        let mut bus = EventBus::new();
        destruction_system(&mut registry, &[e, e], &mut bus);
        assert!(!registry.is_alive(e));
        assert_eq!(bus.destroy_events().len(), 1);
    }
}
