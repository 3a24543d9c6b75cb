//! Address → role lookup.
//!
//! Roles come from two places: a fixed override map loaded once from
//! configuration, and the role store. Overrides always win.

use std::collections::HashMap;
use std::sync::Arc;

use diploma_registry_core::{OwnerAddress, Role, ValidationError};
use diploma_registry_store::RoleStore;

use crate::error::Result;

/// Resolves and assigns roles.
pub struct RoleDirectory<S: RoleStore> {
    store: Arc<S>,
    overrides: Arc<HashMap<OwnerAddress, Role>>,
}

impl<S: RoleStore> Clone for RoleDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            overrides: Arc::clone(&self.overrides),
        }
    }
}

impl<S: RoleStore> RoleDirectory<S> {
    pub fn new(store: Arc<S>, overrides: Arc<HashMap<OwnerAddress, Role>>) -> Self {
        Self { store, overrides }
    }

    /// The fixed override entries.
    pub fn overrides(&self) -> &HashMap<OwnerAddress, Role> {
        &self.overrides
    }

    /// The role of an address: override, then stored role, then `STUDENT`.
    pub async fn role_of(&self, address: &str) -> Result<Role> {
        let address = parse_address(address)?;

        if let Some(role) = self.overrides.get(&address) {
            tracing::debug!(address = %address, role = %role, "role from override");
            return Ok(*role);
        }

        let role = self.store.get_role(&address).await?.unwrap_or_default();
        tracing::debug!(address = %address, role = %role, "role resolved");
        Ok(role)
    }

    /// Assign a role by name. Unknown names are rejected.
    pub async fn assign(&self, address: &str, role: &str) -> Result<Role> {
        let role: Role = role.trim().parse()?;
        self.assign_role(address, role).await
    }

    /// Assign a role. The stored entry is shadowed while an override exists
    /// for the same address.
    pub async fn assign_role(&self, address: &str, role: Role) -> Result<Role> {
        let address = parse_address(address)?;
        self.store.upsert_role(&address, role).await?;
        tracing::info!(address = %address, role = %role, "role assigned");
        Ok(role)
    }

    /// Write the override entries into the role store. Run once at startup.
    pub async fn seed_overrides(&self) -> Result<usize> {
        for (address, role) in self.overrides.iter() {
            self.store.upsert_role(address, *role).await?;
        }
        tracing::info!(count = self.overrides.len(), "seeded role overrides");
        Ok(self.overrides.len())
    }
}

fn parse_address(address: &str) -> std::result::Result<OwnerAddress, ValidationError> {
    let address = OwnerAddress::new(address);
    if address.as_str().is_empty() {
        return Err(ValidationError::MissingAddress);
    }
    Ok(address)
}
