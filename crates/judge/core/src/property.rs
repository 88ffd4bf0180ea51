//! Declarative attribute bindings.
//!
//! A property is declared once at wiring time as `(role, name, mode)` and
//! yields a typed [`Property`] handle. The handle generates up to three access
//! shapes over the [`AttributeStore`], all on the same key:
//!
//! - **Single**: one canonical cell in the default namespace
//!   ([`Identity::SERVER`] unless configured otherwise)
//! - **Identity**: one cell per participant
//! - **Camp**: one cell per camp
//!
//! The shapes address different namespaces, so they are independent cells and
//! never aliases of each other. Accessing a shape the [`StorageMode`] does not
//! enable is a programming error and panics.
//!
//! [`PropertyTable`] records every declaration and rejects duplicate names and
//! hash collisions at startup.

use core::fmt;
use core::marker::PhantomData;
use std::collections::HashMap;

use bitflags::bitflags;

use crate::error::ConfigError;
use crate::identity::{Camp, Identity};
use crate::key::PropertyKey;
use crate::store::{AttributeStore, AttributeValue, ValueKind};

bitflags! {
    /// Namespaces a property may be read and written under.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StorageMode: u8 {
        const SINGLE = 0b001;
        const IDENTITY = 0b010;
        const CAMP = 0b100;
    }
}

/// Capability role a property belongs to. Bookkeeping only; it does not
/// affect addressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Healthed,
    Shooter,
    Chassis,
    Experienced,
    Buff,
    Zone,
    Economy,
    Score,
    Settlement,
    Operator,
}

/// Where an access lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Single,
    Identity(Identity),
    Camp(Camp),
}

/// Typed handle to a declared property.
pub struct Property<T> {
    name: &'static str,
    key: PropertyKey,
    mode: StorageMode,
    default_namespace: Identity,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<T: AttributeValue> Property<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> PropertyKey {
        self.key
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Resolves `scope` to a store namespace.
    ///
    /// # Panics
    ///
    /// If the storage mode does not enable `scope`, or if an identity access
    /// names a camp-wide namespace.
    pub fn namespace(&self, scope: Scope) -> Identity {
        match scope {
            Scope::Single => {
                self.require(StorageMode::SINGLE, "single");
                self.default_namespace
            }
            Scope::Identity(identity) => {
                self.require(StorageMode::IDENTITY, "identity");
                assert!(
                    !identity.is_camp_wide(),
                    "property `{}` accessed per identity with camp namespace {identity}",
                    self.name
                );
                identity
            }
            Scope::Camp(camp) => {
                self.require(StorageMode::CAMP, "camp");
                Identity::camp_wide(camp)
            }
        }
    }

    pub fn load(&self, store: &AttributeStore, scope: Scope) -> T {
        store.reader(self.namespace(scope)).load(self.key)
    }

    pub fn save(&self, store: &AttributeStore, scope: Scope, value: T) {
        store.writer(self.namespace(scope)).save(self.key, value);
    }

    pub fn modify<F>(&self, store: &AttributeStore, scope: Scope, f: F) -> T
    where
        F: FnOnce(T) -> T,
    {
        store.writer(self.namespace(scope)).update(self.key, f)
    }

    pub fn try_modify<E, F>(&self, store: &AttributeStore, scope: Scope, f: F) -> Result<T, E>
    where
        F: FnOnce(T) -> Result<T, E>,
    {
        store.writer(self.namespace(scope)).try_update(self.key, f)
    }

    // ===== Single =====

    pub fn get(&self, store: &AttributeStore) -> T {
        self.load(store, Scope::Single)
    }

    pub fn set(&self, store: &AttributeStore, value: T) {
        self.save(store, Scope::Single, value);
    }

    pub fn update<F: FnOnce(T) -> T>(&self, store: &AttributeStore, f: F) -> T {
        self.modify(store, Scope::Single, f)
    }

    // ===== Identity =====

    pub fn get_for(&self, store: &AttributeStore, identity: Identity) -> T {
        self.load(store, Scope::Identity(identity))
    }

    pub fn set_for(&self, store: &AttributeStore, identity: Identity, value: T) {
        self.save(store, Scope::Identity(identity), value);
    }

    pub fn update_for<F: FnOnce(T) -> T>(
        &self,
        store: &AttributeStore,
        identity: Identity,
        f: F,
    ) -> T {
        self.modify(store, Scope::Identity(identity), f)
    }

    pub fn try_update_for<E, F: FnOnce(T) -> Result<T, E>>(
        &self,
        store: &AttributeStore,
        identity: Identity,
        f: F,
    ) -> Result<T, E> {
        self.try_modify(store, Scope::Identity(identity), f)
    }

    // ===== Camp =====

    pub fn get_camp(&self, store: &AttributeStore, camp: Camp) -> T {
        self.load(store, Scope::Camp(camp))
    }

    pub fn set_camp(&self, store: &AttributeStore, camp: Camp, value: T) {
        self.save(store, Scope::Camp(camp), value);
    }

    pub fn update_camp<F: FnOnce(T) -> T>(&self, store: &AttributeStore, camp: Camp, f: F) -> T {
        self.modify(store, Scope::Camp(camp), f)
    }

    pub fn try_update_camp<E, F: FnOnce(T) -> Result<T, E>>(
        &self,
        store: &AttributeStore,
        camp: Camp,
        f: F,
    ) -> Result<T, E> {
        self.try_modify(store, Scope::Camp(camp), f)
    }

    fn require(&self, flag: StorageMode, shape: &str) {
        assert!(
            self.mode.contains(flag),
            "property `{}` does not support {shape} storage (mode {:?})",
            self.name,
            self.mode
        );
    }
}

/// One registered declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDecl {
    pub role: Capability,
    pub name: &'static str,
    pub key: PropertyKey,
    pub mode: StorageMode,
    pub default_namespace: Identity,
    pub kind: ValueKind,
}

/// Registry of every declared property.
///
/// Built once during wiring; declarations fail fast on duplicate names and on
/// key collisions between distinct names.
#[derive(Debug, Default)]
pub struct PropertyTable {
    entries: Vec<PropertyDecl>,
    by_key: HashMap<PropertyKey, usize>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property in the server namespace.
    pub fn declare<T: AttributeValue>(
        &mut self,
        role: Capability,
        name: &'static str,
        mode: StorageMode,
    ) -> Result<Property<T>, ConfigError> {
        self.declare_in(role, name, mode, Identity::SERVER)
    }

    /// Declares a property whose Single cell lives in `default_namespace`.
    pub fn declare_in<T: AttributeValue>(
        &mut self,
        role: Capability,
        name: &'static str,
        mode: StorageMode,
        default_namespace: Identity,
    ) -> Result<Property<T>, ConfigError> {
        let decl = PropertyDecl {
            role,
            name,
            key: PropertyKey::of(name),
            mode,
            default_namespace,
            kind: T::KIND,
        };
        self.register(decl)?;

        Ok(Property {
            name,
            key: PropertyKey::of(name),
            mode,
            default_namespace,
            _value: PhantomData,
        })
    }

    /// Looks up an existing declaration and re-issues its typed handle.
    pub fn lookup<T: AttributeValue>(&self, name: &str) -> Result<Option<Property<T>>, ConfigError> {
        let Some(decl) = self.get(name) else {
            return Ok(None);
        };
        if decl.kind != T::KIND {
            return Err(ConfigError::TypeMismatch {
                name: decl.name,
                declared: decl.kind,
                requested: T::KIND,
            });
        }
        Ok(Some(Property {
            name: decl.name,
            key: decl.key,
            mode: decl.mode,
            default_namespace: decl.default_namespace,
            _value: PhantomData,
        }))
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDecl> {
        let index = self.by_key.get(&PropertyKey::of(name))?;
        let decl = &self.entries[*index];
        (decl.name == name).then_some(decl)
    }

    pub fn entries(&self) -> &[PropertyDecl] {
        &self.entries
    }

    /// Declarations belonging to one capability role.
    pub fn role(&self, role: Capability) -> impl Iterator<Item = &PropertyDecl> + '_ {
        self.entries.iter().filter(move |decl| decl.role == role)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register(&mut self, decl: PropertyDecl) -> Result<(), ConfigError> {
        if decl.mode.is_empty() {
            return Err(ConfigError::EmptyStorageMode { name: decl.name });
        }
        if let Some(&index) = self.by_key.get(&decl.key) {
            let existing = &self.entries[index];
            return Err(if existing.name == decl.name {
                ConfigError::DuplicateProperty { name: decl.name }
            } else {
                ConfigError::KeyCollision {
                    key: decl.key,
                    existing: existing.name,
                    name: decl.name,
                }
            });
        }
        self.by_key.insert(decl.key, self.entries.len());
        self.entries.push(decl);
        Ok(())
    }
}
