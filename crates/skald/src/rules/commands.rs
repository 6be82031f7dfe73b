//! Deferred structural changes.
//!
//! Spawning and destroying entities while an event pass is walking the store
//! would shift the candidate list under the pass's feet. Actions with
//! structural effects record a [`Command`] instead, and the queue is applied
//! once the pass is over, in recording order.

use crate::ecs::entity::{Entity, EntityId};
use crate::level::EntityStore;

/// A structural change waiting for the end of the pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Spawn(Entity),
    Despawn(EntityId),
}

/// An ordered queue of [`Command`]s.
#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) {
        self.queue.push(Command::Spawn(entity));
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.queue.push(Command::Despawn(id));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.queue.iter()
    }

    /// Apply every queued command to `store`, draining the queue.
    ///
    /// Returns the ids of spawned entities. Despawning an entity that is
    /// already gone (two events destroying the same target) is skipped.
    pub fn apply(&mut self, store: &mut EntityStore) -> Vec<EntityId> {
        let mut spawned = Vec::new();
        for command in self.queue.drain(..) {
            match command {
                Command::Spawn(entity) => spawned.push(store.spawn(entity)),
                Command::Despawn(id) => {
                    if store.despawn(id).is_none() {
                        log::trace!("despawn of {id} skipped, already gone");
                    }
                }
            }
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::kinds;

    #[test]
    fn apply_runs_in_recording_order() {
        let mut store = EntityStore::new();
        let goomba = store.spawn(Entity::new().with(kinds::NAME, "goomba".to_string()));

        let mut commands = Commands::new();
        commands.despawn(goomba);
        commands.spawn(Entity::new().with(kinds::NAME, "coin".to_string()));
        assert_eq!(commands.len(), 2);

        let spawned = commands.apply(&mut store);
        assert!(commands.is_empty());
        assert_eq!(spawned.len(), 1);
        assert!(!store.is_alive(goomba));
        assert_eq!(store.get(spawned[0]).unwrap().name(), Some("coin"));
    }

    #[test]
    fn double_despawn_is_harmless() {
        let mut store = EntityStore::new();
        let a = store.spawn(Entity::new());
        let b = store.spawn(Entity::new());

        let mut commands = Commands::new();
        commands.despawn(a);
        commands.despawn(a);
        commands.apply(&mut store);

        assert_eq!(store.ids(), vec![b]);
    }
}
