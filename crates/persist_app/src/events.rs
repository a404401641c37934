//! Lifecycle event dispatch from the host world to the persistence layer.

use persist_core::{ActivationReport, MetadataPersistence};
use tracing::{debug, warn};

use crate::world::{HostEvent, HostWorld};

/// Totals over every event dispatched by a [`PersistenceListener`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Objects tagged on creation.
    pub registered: usize,
    /// Objects whose tag could not be persisted.
    pub registration_failures: usize,
    /// Combined activation outcome of all chunk loads.
    pub activation: ActivationReport,
}

/// Routes host lifecycle events into [`MetadataPersistence`].
#[derive(Debug)]
pub struct PersistenceListener {
    persistence: MetadataPersistence,
    stats: DispatchStats,
}

impl PersistenceListener {
    #[must_use]
    pub fn new(persistence: MetadataPersistence) -> Self {
        Self {
            persistence,
            stats: DispatchStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn persistence(&mut self) -> &mut MetadataPersistence {
        &mut self.persistence
    }

    /// Handle a single event.
    pub fn handle(&mut self, world: &mut HostWorld, event: HostEvent) {
        match event {
            HostEvent::ObjectCreated(handle) => {
                let Some(object) = world.object_mut(handle) else {
                    warn!(?handle, "created object vanished before dispatch");
                    return;
                };
                if self.persistence.register_persistent_metadata(object) {
                    self.stats.registered += 1;
                } else {
                    self.stats.registration_failures += 1;
                }
            }
            HostEvent::ChunkLoaded(chunk) => {
                let report = self
                    .persistence
                    .on_group_activated(world.chunk_objects_mut(chunk));
                debug!(%chunk, restored = report.restored, "chunk rehydrated");

                let total = &mut self.stats.activation;
                total.restored += report.restored;
                total.skipped += report.skipped;
                total.failed += report.failed;
                total.attributes += report.attributes;
            }
        }
    }

    /// Drain and handle every queued event. Returns how many were handled.
    pub fn dispatch(&mut self, world: &mut HostWorld) -> usize {
        let mut handled = 0;
        while let Some(event) = world.poll_event() {
            self.handle(world, event);
            handled += 1;
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use persist_core::{PersistenceConfig, PersistentObject, Value};

    use super::*;
    use crate::world::ChunkCoord;

    fn listener_in(dir: &tempfile::TempDir) -> PersistenceListener {
        let config = PersistenceConfig::new(dir.path().join("data.toml"));
        PersistenceListener::new(MetadataPersistence::open(&config).unwrap())
    }

    #[test]
    fn test_creation_tags_objects() {
        let dir = tempfile::tempdir().unwrap();
        let mut listener = listener_in(&dir);
        let mut world = HostWorld::new();
        let chunk = ChunkCoord::new(0, 0);

        let a = world.spawn(chunk, "zombie", Some("Zombie"));
        let b = world.spawn(chunk, "cow", None);
        assert_eq!(listener.dispatch(&mut world), 2);

        assert_eq!(world.object(a).unwrap().display_name(), Some("0:Zombie"));
        assert_eq!(world.object(b).unwrap().display_name(), Some("1:"));
        assert_eq!(listener.stats().registered, 2);
    }

    #[test]
    fn test_chunk_load_restores_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut listener = listener_in(&dir);
        let mut world = HostWorld::new();
        let chunk = ChunkCoord::new(5, 5);

        let a = world.spawn(chunk, "zombie", Some("Zombie"));
        listener.dispatch(&mut world);
        let object = world.object_mut(a).unwrap();
        assert!(listener.persistence().set_metadata(object, "level", 5));

        world.unload_chunk(chunk);
        assert_eq!(world.object(a).unwrap().metadata("level"), None);

        world.load_chunk(chunk);
        listener.dispatch(&mut world);
        assert_eq!(world.object(a).unwrap().metadata("level"), Some(&Value::Integer(5)));
        assert_eq!(listener.stats().activation.restored, 1);
    }

    #[test]
    fn test_failed_registration_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let mut listener = listener_in(&dir);
        std::fs::create_dir(dir.path().join("data.toml")).unwrap();
        let mut world = HostWorld::new();

        let a = world.spawn(ChunkCoord::new(0, 0), "zombie", Some("Zombie"));
        listener.dispatch(&mut world);
        assert_eq!(listener.stats().registration_failures, 1);
        assert_eq!(world.object(a).unwrap().display_name(), Some("Zombie"));
    }
}
