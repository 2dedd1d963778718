use crate::{
    kadm5::{AccessControl, PrincipalStore, Privileges},
    Error, Principal,
};
use std::sync::Arc;

/// Everything a connection fixes once authentication is done: who the caller
/// is, what decides their rights, and their store session.
pub struct Session {
    caller: Principal,
    acl: Arc<dyn AccessControl>,
    store: Box<dyn PrincipalStore + Send>,
}

impl Session {
    pub fn new(caller: Principal, acl: Arc<dyn AccessControl>, store: Box<dyn PrincipalStore + Send>) -> Self {
        Self { caller, acl, store }
    }

    pub fn caller(&self) -> &Principal {
        &self.caller
    }

    pub fn privileges(&self) -> Privileges {
        self.acl.privileges(&self.caller)
    }

    pub fn check(&self, required: Privileges) -> Result<(), Error> {
        self.acl.check(&self.caller, required)
    }

    pub fn store(&mut self) -> &mut (dyn PrincipalStore + Send) {
        self.store.as_mut()
    }
}
