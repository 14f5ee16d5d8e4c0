//! Type-safe identifiers for routes and stops.
//!
//! Identifiers wrap `Arc<str>` so snapshots and notices can carry them
//! around without copying the underlying string. Stop ids are only unique
//! within a route, so a stop is always addressed together with its route.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

macro_rules! impl_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        /// Lets maps keyed by the identifier be queried with a plain `&str`
        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(Arc::from(id))
            }
        }
    };
}

impl_identifier!(
    /// A stop on a route, e.g. `"gachibowli"`
    StopIdentifier
);
impl_identifier!(
    /// A bus route, e.g. `"BUS001"`
    RouteIdentifier
);
