//! Concrete robot kinds and the capability subset each one implements.

use super::{Chassis, Entity, EntityCore, Experienced, Healthed, Shooter};

macro_rules! entity_kind {
    ($(#[$doc:meta])* $name:ident: $($cap:ident),*) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            core: EntityCore,
        }

        impl $name {
            pub fn new(core: EntityCore) -> Self {
                Self { core }
            }
        }

        impl Entity for $name {
            fn core(&self) -> &EntityCore {
                &self.core
            }

            $(entity_kind!(@accessor $cap);)*
        }

        $(impl $cap for $name {})*
    };

    (@accessor Healthed) => {
        fn as_healthed(&self) -> Option<&dyn Healthed> {
            Some(self)
        }
    };
    (@accessor Shooter) => {
        fn as_shooter(&self) -> Option<&dyn Shooter> {
            Some(self)
        }
    };
    (@accessor Chassis) => {
        fn as_chassis(&self) -> Option<&dyn Chassis> {
            Some(self)
        }
    };
    (@accessor Experienced) => {
        fn as_experienced(&self) -> Option<&dyn Experienced> {
            Some(self)
        }
    };
}

entity_kind! {
    /// Large-caliber launcher; levels up.
    Hero: Healthed, Shooter, Chassis, Experienced
}

entity_kind! {
    /// No launcher; levels do not apply.
    Engineer: Healthed, Chassis
}

entity_kind! {
    /// Switchable chassis modes.
    Infantry: Healthed, Shooter, Chassis, Experienced
}

entity_kind! {
    /// Cannot be hit; only shoots.
    Aerial: Shooter
}

entity_kind! {
    Sentry: Healthed, Shooter
}

entity_kind! {
    Outpost: Healthed
}

entity_kind! {
    /// Destroying the base ends the match.
    Base: Healthed
}
