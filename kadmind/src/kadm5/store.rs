use super::{FieldMask, Password, PrincipalEntry};
use crate::{Error, Keyblock, Principal};

/// The identity store as seen by one administrative session. Every
/// operation answers with a value or a kadm5 status; "not found" and
/// "already exists" are ordinary statuses.
pub trait PrincipalStore {
    fn get_principal(&mut self, principal: &Principal, mask: FieldMask) -> Result<PrincipalEntry, Error>;

    fn delete_principal(&mut self, principal: &Principal) -> Result<(), Error>;

    fn create_principal(
        &mut self,
        entry: &PrincipalEntry,
        mask: FieldMask,
        password: &Password,
    ) -> Result<(), Error>;

    fn modify_principal(&mut self, entry: &PrincipalEntry, mask: FieldMask) -> Result<(), Error>;

    fn rename_principal(&mut self, source: &Principal, target: &Principal) -> Result<(), Error>;

    fn change_password(&mut self, principal: &Principal, password: &Password) -> Result<(), Error>;

    fn randomize_key(&mut self, principal: &Principal) -> Result<Vec<Keyblock>, Error>;

    fn list_principals(&mut self, expression: Option<&str>) -> Result<Vec<String>, Error>;
}

/// Opens a store session bound to an authenticated caller.
pub trait StoreFactory: Send + Sync {
    fn open(&self, caller: &Principal) -> anyhow::Result<Box<dyn PrincipalStore + Send>>;
}
