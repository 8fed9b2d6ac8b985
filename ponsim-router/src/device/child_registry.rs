//! Port-to-location lookup for the children of a Terminal device.

use crate::device::{DeviceLocation, UPLINK_PORT};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Read-only view of which child device sits behind which port.
///
/// Populated by provisioning before any routing call arrives; the router only queries it.
pub trait ChildRegistry: Send + Sync {
    fn child_ports(&self) -> Vec<i32>;

    fn child_location(&self, port: i32) -> Option<DeviceLocation>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChildRegistryError {
    UplinkPort,
    DuplicatePort(i32),
}

impl Display for ChildRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildRegistryError::UplinkPort => {
                write!(f, "port {UPLINK_PORT} is reserved for the uplink")
            }
            ChildRegistryError::DuplicatePort(port) => {
                write!(f, "port {port} is already provisioned")
            }
        }
    }
}

impl Error for ChildRegistryError {}

/// Registry provisioned once from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticChildRegistry {
    children: HashMap<i32, DeviceLocation>,
}

impl StaticChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a child behind `port`. The uplink port and duplicates are rejected.
    pub fn provision(
        &mut self,
        port: i32,
        location: DeviceLocation,
    ) -> Result<(), ChildRegistryError> {
        if port == UPLINK_PORT {
            return Err(ChildRegistryError::UplinkPort);
        }
        if self.children.contains_key(&port) {
            return Err(ChildRegistryError::DuplicatePort(port));
        }
        self.children.insert(port, location);
        Ok(())
    }

    pub fn from_children<I>(children: I) -> Result<Self, ChildRegistryError>
    where
        I: IntoIterator<Item = (i32, DeviceLocation)>,
    {
        let mut registry = Self::new();
        for (port, location) in children {
            registry.provision(port, location)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl ChildRegistry for StaticChildRegistry {
    fn child_ports(&self) -> Vec<i32> {
        self.children.keys().copied().collect()
    }

    fn child_location(&self, port: i32) -> Option<DeviceLocation> {
        self.children.get(&port).cloned()
    }
}
