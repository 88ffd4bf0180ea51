//! Capability-typed entity views.
//!
//! An entity owns no state. It is an [`Identity`] plus a handle to the shared
//! [`AttributeStore`], projected through one or more capability traits
//! ([`Healthed`], [`Shooter`], [`Chassis`], [`Experienced`]). Rule systems work
//! against the capability they need and never name a concrete robot kind:
//!
//! ```ignore
//! if let Some(target) = roster.get(victim).and_then(|e| e.as_healthed()) {
//!     target.take_damage(50);
//! }
//! ```
//!
//! Entities are built once per container by [`Roster`]; a new match resets
//! their attribute values, never the entities themselves.

mod capability;
mod kinds;
mod roster;

use core::fmt;
use std::sync::Arc;

pub use capability::{Chassis, Experienced, Healthed, Shooter};
pub use kinds::{Aerial, Base, Engineer, Hero, Infantry, Outpost, Sentry};
pub use roster::{Roster, RosterEntry};

use crate::bindings::Properties;
use crate::identity::{Identity, RobotVariant};
use crate::store::AttributeStore;

/// Shared plumbing behind every entity view.
#[derive(Clone)]
pub struct EntityCore {
    identity: Identity,
    variant: RobotVariant,
    store: Arc<AttributeStore>,
    props: Arc<Properties>,
}

impl EntityCore {
    pub fn new(
        identity: Identity,
        variant: RobotVariant,
        store: Arc<AttributeStore>,
        props: Arc<Properties>,
    ) -> Self {
        Self {
            identity,
            variant,
            store,
            props,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn variant(&self) -> RobotVariant {
        self.variant
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }
}

impl fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCore")
            .field("identity", &self.identity)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

/// A participant on the field.
///
/// The `as_*` accessors expose the capabilities a kind implements; the
/// defaults report the capability as absent.
pub trait Entity: Send + Sync + fmt::Debug {
    fn core(&self) -> &EntityCore;

    fn identity(&self) -> Identity {
        self.core().identity()
    }

    fn variant(&self) -> RobotVariant {
        self.core().variant()
    }

    fn as_healthed(&self) -> Option<&dyn Healthed> {
        None
    }

    fn as_shooter(&self) -> Option<&dyn Shooter> {
        None
    }

    fn as_chassis(&self) -> Option<&dyn Chassis> {
        None
    }

    fn as_experienced(&self) -> Option<&dyn Experienced> {
        None
    }
}

/// Builds the entity view for `variant`.
pub fn spawn(core: EntityCore) -> Arc<dyn Entity> {
    match core.variant() {
        RobotVariant::Hero => Arc::new(Hero::new(core)),
        RobotVariant::Engineer => Arc::new(Engineer::new(core)),
        RobotVariant::Infantry => Arc::new(Infantry::new(core)),
        RobotVariant::Aerial => Arc::new(Aerial::new(core)),
        RobotVariant::Sentry => Arc::new(Sentry::new(core)),
        RobotVariant::Outpost => Arc::new(Outpost::new(core)),
        RobotVariant::Base => Arc::new(Base::new(core)),
    }
}
