//! Owner-administered capability table.
//!
//! The owner implicitly holds [`Capability::SetRate`]. Every other grant is
//! explicit: the vault must be granted [`Capability::MintAndBurn`] before it
//! can mint or burn ledger shares. Only the owner may grant or revoke.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::error::AuthError;
use crate::traits::Authorizer;
use crate::types::{Capability, HolderId};

/// In-memory [`Authorizer`] with a single owner.
#[derive(Debug)]
pub struct AccessControl {
    owner: HolderId,
    grants: RwLock<HashMap<HolderId, BTreeSet<Capability>>>,
}

impl AccessControl {
    pub fn new(owner: HolderId) -> Self {
        Self {
            owner,
            grants: RwLock::new(HashMap::new()),
        }
    }

    /// Grant `capability` to `holder`. Returns `false` if it was already held.
    pub fn grant(
        &self,
        caller: &HolderId,
        holder: &HolderId,
        capability: Capability,
    ) -> Result<bool, AuthError> {
        self.ensure_owner(caller)?;
        Ok(self
            .grants
            .write()
            .entry(*holder)
            .or_default()
            .insert(capability))
    }

    /// Revoke `capability` from `holder`. Returns `false` if it was not held.
    ///
    /// The owner's implicit [`Capability::SetRate`] cannot be revoked.
    pub fn revoke(
        &self,
        caller: &HolderId,
        holder: &HolderId,
        capability: Capability,
    ) -> Result<bool, AuthError> {
        self.ensure_owner(caller)?;
        let mut grants = self.grants.write();
        let Some(held) = grants.get_mut(holder) else {
            return Ok(false);
        };
        let removed = held.remove(&capability);
        if held.is_empty() {
            grants.remove(holder);
        }
        Ok(removed)
    }

    /// Capabilities explicitly granted to `holder`.
    pub fn granted(&self, holder: &HolderId) -> Vec<Capability> {
        self.grants
            .read()
            .get(holder)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn ensure_owner(&self, caller: &HolderId) -> Result<(), AuthError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(AuthError::NotOwner(*caller))
        }
    }
}

impl Authorizer for AccessControl {
    fn owner(&self) -> HolderId {
        self.owner
    }

    fn has_capability(&self, holder: &HolderId, capability: Capability) -> bool {
        if capability == Capability::SetRate && *holder == self.owner {
            return true;
        }
        self.grants
            .read()
            .get(holder)
            .is_some_and(|set| set.contains(&capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: HolderId = HolderId([0x01; 20]);
    const VAULT: HolderId = HolderId([0x02; 20]);
    const USER: HolderId = HolderId([0x03; 20]);

    #[test]
    fn owner_sets_rate_implicitly() {
        let acl = AccessControl::new(OWNER);
        assert!(acl.has_capability(&OWNER, Capability::SetRate));
        assert!(!acl.has_capability(&OWNER, Capability::MintAndBurn));
        assert!(!acl.has_capability(&USER, Capability::SetRate));
    }

    #[test]
    fn owner_grants_mint_and_burn() {
        let acl = AccessControl::new(OWNER);
        assert!(acl.grant(&OWNER, &VAULT, Capability::MintAndBurn).unwrap());
        assert!(!acl.grant(&OWNER, &VAULT, Capability::MintAndBurn).unwrap());
        assert!(acl.has_capability(&VAULT, Capability::MintAndBurn));
        assert_eq!(acl.granted(&VAULT), vec![Capability::MintAndBurn]);
    }

    #[test]
    fn non_owner_cannot_grant() {
        let acl = AccessControl::new(OWNER);
        assert_eq!(
            acl.grant(&USER, &USER, Capability::MintAndBurn).unwrap_err(),
            AuthError::NotOwner(USER)
        );
        assert!(!acl.has_capability(&USER, Capability::MintAndBurn));
    }

    #[test]
    fn revoke_removes_grant() {
        let acl = AccessControl::new(OWNER);
        acl.grant(&OWNER, &VAULT, Capability::MintAndBurn).unwrap();
        assert!(acl.revoke(&OWNER, &VAULT, Capability::MintAndBurn).unwrap());
        assert!(!acl.revoke(&OWNER, &VAULT, Capability::MintAndBurn).unwrap());
        assert!(!acl.has_capability(&VAULT, Capability::MintAndBurn));
        assert!(acl.granted(&VAULT).is_empty());
    }

    #[test]
    fn owner_set_rate_survives_revoke() {
        let acl = AccessControl::new(OWNER);
        acl.revoke(&OWNER, &OWNER, Capability::SetRate).unwrap();
        assert!(acl.has_capability(&OWNER, Capability::SetRate));
    }

    #[test]
    fn ensure_reports_capability() {
        let acl = AccessControl::new(OWNER);
        assert_eq!(
            acl.ensure(&USER, Capability::MintAndBurn).unwrap_err(),
            AuthError::Unauthorized {
                holder: USER,
                capability: Capability::MintAndBurn,
            }
        );
    }
}
