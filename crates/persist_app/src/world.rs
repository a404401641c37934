//! Simulated host world.
//!
//! A minimal stand-in for the game server: objects live in chunks, carry a
//! display name that the host keeps across unloads, and have in-memory
//! metadata that is wiped whenever their chunk unloads. The world queues
//! lifecycle events for the listener to dispatch.

use std::collections::{BTreeSet, HashMap, VecDeque};

use persist_core::{PersistentObject, Value};

/// Host-side handle of an object. Unrelated to the persistent id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// Chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

/// Lifecycle events raised by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// A new object was spawned.
    ObjectCreated(ObjectHandle),
    /// A chunk and every object in it became active.
    ChunkLoaded(ChunkCoord),
}

/// An object in the simulated world.
#[derive(Debug, Clone)]
pub struct HostObject {
    /// The object's type (e.g. `"zombie"`).
    pub kind: String,
    /// The chunk the object lives in.
    pub chunk: ChunkCoord,
    custom_name: Option<String>,
    metadata: HashMap<String, Value>,
}

impl HostObject {
    /// Returns the in-memory metadata value for `key`.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

impl PersistentObject for HostObject {
    fn display_name(&self) -> Option<&str> {
        self.custom_name.as_deref()
    }

    fn set_display_name(&mut self, name: String) {
        self.custom_name = Some(name);
    }

    fn attach_transient(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
    }
}

/// All objects and chunks of the simulated host.
#[derive(Debug, Default)]
pub struct HostWorld {
    next_handle: u64,
    objects: HashMap<ObjectHandle, HostObject>,
    loaded: BTreeSet<ChunkCoord>,
    pending: VecDeque<HostEvent>,
}

impl HostWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an object into `chunk`, loading the chunk if needed, and queue
    /// an [`HostEvent::ObjectCreated`].
    pub fn spawn(&mut self, chunk: ChunkCoord, kind: &str, name: Option<&str>) -> ObjectHandle {
        self.loaded.insert(chunk);

        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(
            handle,
            HostObject {
                kind: kind.to_string(),
                chunk,
                custom_name: name.map(str::to_string),
                metadata: HashMap::new(),
            },
        );
        self.pending.push_back(HostEvent::ObjectCreated(handle));
        handle
    }

    /// Unload `chunk`. Every object in it loses its in-memory metadata.
    ///
    /// Returns `false` if the chunk was not loaded.
    pub fn unload_chunk(&mut self, chunk: ChunkCoord) -> bool {
        if !self.loaded.remove(&chunk) {
            return false;
        }
        for object in self.objects.values_mut().filter(|o| o.chunk == chunk) {
            object.metadata.clear();
        }
        true
    }

    /// Load `chunk` and queue a [`HostEvent::ChunkLoaded`].
    ///
    /// Returns `false` if the chunk was already loaded.
    pub fn load_chunk(&mut self, chunk: ChunkCoord) -> bool {
        if !self.loaded.insert(chunk) {
            return false;
        }
        self.pending.push_back(HostEvent::ChunkLoaded(chunk));
        true
    }

    #[must_use]
    pub fn object(&self, handle: ObjectHandle) -> Option<&HostObject> {
        self.objects.get(&handle)
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut HostObject> {
        self.objects.get_mut(&handle)
    }

    /// Returns mutable references to every object in `chunk`.
    pub fn chunk_objects_mut(&mut self, chunk: ChunkCoord) -> impl Iterator<Item = &mut HostObject> {
        self.objects.values_mut().filter(move |o| o.chunk == chunk)
    }

    /// Returns the currently loaded chunks in ascending order.
    #[must_use]
    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        self.loaded.iter().copied().collect()
    }

    /// Take the next queued event.
    pub fn poll_event(&mut self) -> Option<HostEvent> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_queues_creation() {
        let mut world = HostWorld::new();
        let chunk = ChunkCoord::new(0, 0);
        let a = world.spawn(chunk, "zombie", Some("Zombie"));
        let b = world.spawn(chunk, "skeleton", None);

        assert_ne!(a, b);
        assert_eq!(world.loaded_chunks(), vec![chunk]);
        assert_eq!(world.poll_event(), Some(HostEvent::ObjectCreated(a)));
        assert_eq!(world.poll_event(), Some(HostEvent::ObjectCreated(b)));
        assert_eq!(world.poll_event(), None);
        assert_eq!(world.object(a).unwrap().display_name(), Some("Zombie"));
        assert_eq!(world.object(b).unwrap().display_name(), None);
    }

    #[test]
    fn test_unload_wipes_metadata_but_keeps_name() {
        let mut world = HostWorld::new();
        let chunk = ChunkCoord::new(1, -1);
        let other = ChunkCoord::new(2, 2);
        let a = world.spawn(chunk, "zombie", Some("0:Zombie"));
        let b = world.spawn(other, "zombie", None);
        world.object_mut(a).unwrap().attach_transient("level", Value::Integer(5));
        world.object_mut(b).unwrap().attach_transient("level", Value::Integer(6));

        assert!(world.unload_chunk(chunk));
        assert!(!world.unload_chunk(chunk));

        let object = world.object(a).unwrap();
        assert_eq!(object.metadata("level"), None);
        assert_eq!(object.display_name(), Some("0:Zombie"));
        assert_eq!(world.object(b).unwrap().metadata("level"), Some(&Value::Integer(6)));
    }

    #[test]
    fn test_load_queues_activation_once() {
        let mut world = HostWorld::new();
        let chunk = ChunkCoord::new(3, 4);
        world.spawn(chunk, "zombie", None);
        world.poll_event();

        assert!(!world.load_chunk(chunk));
        world.unload_chunk(chunk);
        assert!(world.load_chunk(chunk));
        assert_eq!(world.poll_event(), Some(HostEvent::ChunkLoaded(chunk)));
        assert_eq!(world.chunk_objects_mut(chunk).count(), 1);
        assert_eq!(world.chunk_objects_mut(ChunkCoord::new(9, 9)).count(), 0);
    }
}
