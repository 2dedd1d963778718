//! Administrative data model and the collaborator contracts the protocol
//! engine is written against: the permission gate ([`AccessControl`]) and
//! the identity store ([`PrincipalStore`]).

mod acl;
mod entry;
mod memory_store;
mod password;
mod privileges;
mod store;

pub use self::{
    acl::{AccessControl, AclFile},
    entry::{FieldMask, KeyData, KeySalt, PrincipalEntry, TlData},
    memory_store::{MemoryDatabase, MemoryStore},
    password::Password,
    privileges::Privileges,
    store::{PrincipalStore, StoreFactory},
};
