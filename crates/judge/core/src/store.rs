//! Namespaced attribute store.
//!
//! Every gameplay attribute lives here, addressed by `(namespace, key)` inside
//! a partition chosen by the value type. Partitions are independent: the same
//! slot in the `u32` and `f32` partitions are two unrelated cells.
//!
//! # Concurrency
//!
//! Partitions are shard-locked [`DashMap`]s. A single `save` or `load` is atomic
//! for its slot, and [`Writer::update`] / [`Writer::try_update`] hold the slot's
//! shard lock for the whole read-modify-write, so two systems subtracting from
//! the same key never lose an update. There are no multi-key transactions.
//!
//! Closures passed to `update` run under the shard lock and must not touch the
//! store themselves.

use core::fmt;

use dashmap::DashMap;

use crate::identity::Identity;
use crate::key::PropertyKey;

/// Address of one cell within a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    pub namespace: Identity,
    pub key: PropertyKey,
}

type Partition<T> = DashMap<Slot, T>;

/// Primitive value types the store is partitioned by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    U8,
    U32,
    I32,
    U64,
    F32,
    Bool,
}

mod sealed {
    pub trait Sealed {}
}

/// A value type with its own partition in the [`AttributeStore`].
///
/// Sealed: the set of partitions is fixed by the store layout.
pub trait AttributeValue:
    Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Sealed
{
    /// Partition tag, recorded by the property table.
    const KIND: ValueKind;

    #[doc(hidden)]
    fn partition(store: &AttributeStore) -> &Partition<Self>;
}

macro_rules! attribute_value {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl sealed::Sealed for $ty {}

        impl AttributeValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            #[inline]
            fn partition(store: &AttributeStore) -> &Partition<Self> {
                &store.$field
            }
        }
    };
}

attribute_value!(u8, U8, bytes);
attribute_value!(u32, U32, unsigned);
attribute_value!(i32, I32, signed);
attribute_value!(u64, U64, wide);
attribute_value!(f32, F32, floats);
attribute_value!(bool, Bool, flags);

/// Typed, namespace-scoped key/value cache backing every entity property.
#[derive(Default)]
pub struct AttributeStore {
    bytes: Partition<u8>,
    unsigned: Partition<u32>,
    signed: Partition<i32>,
    wide: Partition<u64>,
    floats: Partition<f32>,
    flags: Partition<bool>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read view over one namespace.
    #[inline]
    pub fn reader(&self, namespace: Identity) -> Reader<'_> {
        Reader {
            store: self,
            namespace,
        }
    }

    /// Write view over one namespace.
    #[inline]
    pub fn writer(&self, namespace: Identity) -> Writer<'_> {
        Writer {
            store: self,
            namespace,
        }
    }

    /// Number of cells written so far, across all partitions.
    pub fn len(&self) -> usize {
        self.bytes.len()
            + self.unsigned.len()
            + self.signed.len()
            + self.wide.len()
            + self.floats.len()
            + self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cell. Subsequent loads read defaults.
    pub fn clear(&self) {
        self.bytes.clear();
        self.unsigned.clear();
        self.signed.clear();
        self.wide.clear();
        self.floats.clear();
        self.flags.clear();
    }
}

impl fmt::Debug for AttributeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeStore")
            .field("cells", &self.len())
            .finish()
    }
}

/// Read-only view of one namespace.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    store: &'a AttributeStore,
    namespace: Identity,
}

impl Reader<'_> {
    pub fn namespace(&self) -> Identity {
        self.namespace
    }

    /// Current value, or `T::default()` if the slot was never written.
    pub fn load<T: AttributeValue>(&self, key: PropertyKey) -> T {
        T::partition(self.store)
            .get(&self.slot(key))
            .map(|cell| *cell)
            .unwrap_or_default()
    }

    /// Returns true if the slot holds a value in the `T` partition.
    pub fn contains<T: AttributeValue>(&self, key: PropertyKey) -> bool {
        T::partition(self.store).contains_key(&self.slot(key))
    }

    fn slot(&self, key: PropertyKey) -> Slot {
        Slot {
            namespace: self.namespace,
            key,
        }
    }
}

/// Write view of one namespace.
#[derive(Clone, Copy)]
pub struct Writer<'a> {
    store: &'a AttributeStore,
    namespace: Identity,
}

impl<'a> Writer<'a> {
    pub fn namespace(&self) -> Identity {
        self.namespace
    }

    pub fn reader(&self) -> Reader<'a> {
        self.store.reader(self.namespace)
    }

    /// Overwrites the slot.
    pub fn save<T: AttributeValue>(&self, key: PropertyKey, value: T) {
        T::partition(self.store).insert(self.slot(key), value);
    }

    /// Atomic read-modify-write. Returns the stored value.
    pub fn update<T, F>(&self, key: PropertyKey, f: F) -> T
    where
        T: AttributeValue,
        F: FnOnce(T) -> T,
    {
        let mut cell = T::partition(self.store)
            .entry(self.slot(key))
            .or_default();
        let next = f(*cell);
        *cell = next;
        next
    }

    /// Atomic conditional read-modify-write.
    ///
    /// The closure validates the current value and either returns the value to
    /// commit or a rejection; on rejection nothing is written.
    pub fn try_update<T, E, F>(&self, key: PropertyKey, f: F) -> Result<T, E>
    where
        T: AttributeValue,
        F: FnOnce(T) -> Result<T, E>,
    {
        let mut cell = T::partition(self.store)
            .entry(self.slot(key))
            .or_default();
        let next = f(*cell)?;
        *cell = next;
        Ok(next)
    }

    /// Removes the slot so it reads as default again.
    pub fn remove<T: AttributeValue>(&self, key: PropertyKey) -> Option<T> {
        T::partition(self.store)
            .remove(&self.slot(key))
            .map(|(_, value)| value)
    }

    fn slot(&self, key: PropertyKey) -> Slot {
        Slot {
            namespace: self.namespace,
            key,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identity::Camp;
    use crate::key::key;

    const HERO: Identity = Identity::new(Camp::Red, 1);

    #[test]
    fn unwritten_slots_read_as_default() {
        let store = AttributeStore::new();
        let reader = store.reader(HERO);
        assert_eq!(reader.load::<u32>(key("health")), 0);
        assert_eq!(reader.load::<i32>(key("coins")), 0);
        assert_eq!(reader.load::<f32>(key("heat")), 0.0);
        assert!(!reader.load::<bool>(key("alive")));
        assert!(!reader.contains::<u32>(key("health")));
    }

    #[test]
    fn save_then_load_for_every_partition() {
        let store = AttributeStore::new();
        let writer = store.writer(HERO);
        writer.save(key("level"), 3u8);
        writer.save(key("health"), 200u32);
        writer.save(key("coins"), -5i32);
        writer.save(key("elapsed"), u64::MAX);
        writer.save(key("heat"), 12.5f32);
        writer.save(key("alive"), true);

        let reader = store.reader(HERO);
        assert_eq!(reader.load::<u8>(key("level")), 3);
        assert_eq!(reader.load::<u32>(key("health")), 200);
        assert_eq!(reader.load::<i32>(key("coins")), -5);
        assert_eq!(reader.load::<u64>(key("elapsed")), u64::MAX);
        assert_eq!(reader.load::<f32>(key("heat")), 12.5);
        assert!(reader.load::<bool>(key("alive")));
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn partitions_are_independent() {
        let store = AttributeStore::new();
        let writer = store.writer(HERO);
        writer.save(key("health"), 100u32);
        writer.save(key("health"), 7.0f32);

        let reader = store.reader(HERO);
        assert_eq!(reader.load::<u32>(key("health")), 100);
        assert_eq!(reader.load::<f32>(key("health")), 7.0);
        assert_eq!(reader.load::<i32>(key("health")), 0);
    }

    #[test]
    fn namespaces_are_independent() {
        let store = AttributeStore::new();
        store.writer(HERO).save(key("health"), 100u32);
        store
            .writer(Identity::camp_wide(Camp::Red))
            .save(key("health"), 900u32);

        assert_eq!(store.reader(HERO).load::<u32>(key("health")), 100);
        assert_eq!(
            store
                .reader(Identity::camp_wide(Camp::Red))
                .load::<u32>(key("health")),
            900
        );
        assert_eq!(store.reader(Identity::SERVER).load::<u32>(key("health")), 0);
    }

    #[test]
    fn try_update_commits_only_on_accept() {
        let store = AttributeStore::new();
        let writer = store.writer(HERO);
        writer.save(key("ammo"), 10u32);

        let taken = writer.try_update(key("ammo"), |ammo: u32| ammo.checked_sub(4).ok_or(ammo));
        assert_eq!(taken, Ok(6));

        let rejected = writer.try_update(key("ammo"), |ammo: u32| ammo.checked_sub(50).ok_or(ammo));
        assert_eq!(rejected, Err(6));
        assert_eq!(writer.reader().load::<u32>(key("ammo")), 6);
    }

    #[test]
    fn remove_and_clear_restore_defaults() {
        let store = AttributeStore::new();
        let writer = store.writer(HERO);
        writer.save(key("health"), 1u32);
        writer.save(key("heat"), 1.0f32);

        assert_eq!(writer.remove::<u32>(key("health")), Some(1));
        assert_eq!(writer.reader().load::<u32>(key("health")), 0);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_updates_do_not_lose_writes() {
        let store = Arc::new(AttributeStore::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        store.writer(HERO).update(key("shots"), |n: u32| n + 1);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(store.reader(HERO).load::<u32>(key("shots")), 8000);
    }
}
