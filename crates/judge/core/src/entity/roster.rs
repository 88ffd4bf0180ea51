//! Fixed set of participants for one container.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Chassis, Entity, EntityCore, Experienced, Healthed, Shooter, spawn};
use crate::bindings::Properties;
use crate::error::ConfigError;
use crate::identity::{Camp, Identity, RobotVariant};
use crate::store::AttributeStore;

/// One roster slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RosterEntry {
    pub identity: Identity,
    pub variant: RobotVariant,
}

impl RosterEntry {
    pub const fn new(identity: Identity, variant: RobotVariant) -> Self {
        Self { identity, variant }
    }

    /// Standard lineup for both camps.
    ///
    /// Role indices follow the field numbering: 1 hero, 2 engineer, 3-5
    /// infantry, 6 aerial, 7 sentry, 8 outpost, 9 base.
    pub fn standard() -> Vec<RosterEntry> {
        const LINEUP: [(u8, RobotVariant); 9] = [
            (1, RobotVariant::Hero),
            (2, RobotVariant::Engineer),
            (3, RobotVariant::Infantry),
            (4, RobotVariant::Infantry),
            (5, RobotVariant::Infantry),
            (6, RobotVariant::Aerial),
            (7, RobotVariant::Sentry),
            (8, RobotVariant::Outpost),
            (9, RobotVariant::Base),
        ];

        Camp::COMPETING
            .iter()
            .flat_map(|&camp| {
                LINEUP
                    .iter()
                    .map(move |&(role, variant)| RosterEntry::new(Identity::new(camp, role), variant))
            })
            .collect()
    }
}

/// Every entity of the container, addressable by identity.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    entities: Vec<Arc<dyn Entity>>,
    index: HashMap<Identity, usize>,
}

impl Roster {
    /// Builds one entity per entry.
    ///
    /// Fails on duplicate identities and on identities that collide with a
    /// reserved namespace (server or camp-wide).
    pub fn build(
        entries: &[RosterEntry],
        store: Arc<AttributeStore>,
        props: Arc<Properties>,
    ) -> Result<Self, ConfigError> {
        let mut roster = Roster::default();
        for entry in entries {
            let identity = entry.identity;
            if identity.is_camp_wide() || identity.is_server() || identity.camp == Camp::Neutral {
                return Err(ConfigError::ReservedIdentity { identity });
            }
            if roster.index.contains_key(&identity) {
                return Err(ConfigError::DuplicateIdentity { identity });
            }
            let core = EntityCore::new(identity, entry.variant, store.clone(), props.clone());
            roster.index.insert(identity, roster.entities.len());
            roster.entities.push(spawn(core));
        }
        Ok(roster)
    }

    pub fn get(&self, identity: Identity) -> Option<&dyn Entity> {
        self.index
            .get(&identity)
            .map(|&index| self.entities[index].as_ref())
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.index.contains_key(&identity)
    }

    pub fn healthed(&self, identity: Identity) -> Option<&dyn Healthed> {
        self.get(identity)?.as_healthed()
    }

    pub fn shooter(&self, identity: Identity) -> Option<&dyn Shooter> {
        self.get(identity)?.as_shooter()
    }

    pub fn chassis(&self, identity: Identity) -> Option<&dyn Chassis> {
        self.get(identity)?.as_chassis()
    }

    pub fn experienced(&self, identity: Identity) -> Option<&dyn Experienced> {
        self.get(identity)?.as_experienced()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Entity> + '_ {
        self.entities.iter().map(|entity| entity.as_ref())
    }

    pub fn camp(&self, camp: Camp) -> impl Iterator<Item = &dyn Entity> + '_ {
        self.iter().filter(move |entity| entity.identity().camp == camp)
    }

    /// First entity of `variant` in `camp`.
    pub fn find(&self, camp: Camp, variant: RobotVariant) -> Option<&dyn Entity> {
        self.camp(camp).find(|entity| entity.variant() == variant)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
