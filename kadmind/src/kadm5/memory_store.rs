use super::{FieldMask, KeyData, KeySalt, Password, PrincipalEntry, PrincipalStore, StoreFactory};
use crate::{crypto::pbkdf2_hmac_sha1, Error, Keyblock, Keytype, Kvno, Principal, Timestamp};
use glob::Pattern;
use rand::RngCore;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

const PBKDF2_ITERATIONS: u32 = 4096;
// Version 1 key data carries no salt; version 2 adds one.
const KEY_DATA_VERSION_UNSALTED: i32 = 1;
const KEY_DATA_VERSION_SALTED: i32 = 2;
const SALTTYPE_NORMAL: i32 = 0;

const CREATE_FORBIDDEN: FieldMask = FieldMask(
    FieldMask::LAST_PWD_CHANGE.0
        | FieldMask::MOD_TIME.0
        | FieldMask::MOD_NAME.0
        | FieldMask::MKVNO.0
        | FieldMask::AUX_ATTRIBUTES.0
        | FieldMask::KEY_DATA.0
        | FieldMask::POLICY_CLR.0
        | FieldMask::LAST_SUCCESS.0
        | FieldMask::LAST_FAILED.0
        | FieldMask::FAIL_AUTH_COUNT.0,
);

// Keys and kvno change only through change-password and random-key.
const MODIFY_FORBIDDEN: FieldMask = FieldMask(
    FieldMask::PRINCIPAL.0
        | FieldMask::KVNO.0
        | FieldMask::KEY_DATA.0
        | FieldMask::LAST_PWD_CHANGE.0
        | FieldMask::MOD_TIME.0
        | FieldMask::MOD_NAME.0
        | FieldMask::MKVNO.0
        | FieldMask::AUX_ATTRIBUTES.0
        | FieldMask::LAST_SUCCESS.0
        | FieldMask::LAST_FAILED.0,
);

type Principals = HashMap<Principal, PrincipalEntry>;

/// A principal database held in process memory and shared by every
/// connection of the server.
#[derive(Debug, Default, Clone)]
pub struct MemoryDatabase {
    principals: Arc<Mutex<Principals>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreFactory for MemoryDatabase {
    fn open(&self, caller: &Principal) -> anyhow::Result<Box<dyn PrincipalStore + Send>> {
        Ok(Box::new(MemoryStore {
            principals: Arc::clone(&self.principals),
            caller: caller.clone(),
        }))
    }
}

/// One caller's session on a [`MemoryDatabase`]. Modifications are stamped
/// with the caller's name.
#[derive(Debug)]
pub struct MemoryStore {
    principals: Arc<Mutex<Principals>>,
    caller: Principal,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Principals>, Error> {
        self.principals.lock().map_err(|_| Error::KADM5_BAD_DB)
    }

    fn stamp(&self, entry: &mut PrincipalEntry) {
        entry.mod_date = now();
        entry.mod_name = Some(self.caller.clone());
    }
}

fn now() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp()).unwrap_or(Timestamp::MAX)
}

fn check_principal(principal: &Principal) -> Result<(), Error> {
    if principal.components.is_empty() || principal.realm.is_empty() {
        Err(Error::KADM5_BAD_PRINCIPAL)?
    }
    Ok(())
}

fn default_salt(principal: &Principal) -> Vec<u8> {
    [principal.realm.as_slice()]
        .into_iter()
        .chain(principal.components.iter().map(Vec::as_slice))
        .collect::<Vec<_>>()
        .concat()
}

/// Derives one key per default enctype from the password, salted with the
/// realm followed by every name component.
fn password_keys(principal: &Principal, password: &Password, kvno: Kvno) -> Result<Vec<KeyData>, Error> {
    if password.is_empty() {
        Err(Error::KADM5_PASS_Q_TOOSHORT)?
    }
    let salt = default_salt(principal);
    Keytype::defaults()
        .map(|ktp| {
            let key = pbkdf2_hmac_sha1(password.as_bytes(), &salt, PBKDF2_ITERATIONS, ktp.key_size())
                .map_err(|_| Error::KADM5_FAILURE)?;
            Ok(KeyData {
                ver: KEY_DATA_VERSION_SALTED,
                kvno,
                key: Keyblock::new(ktp.enctype(), key.to_vec()),
                salt: KeySalt {
                    salt_type: SALTTYPE_NORMAL,
                    value: vec![],
                },
            })
        })
        .collect()
}

fn random_keys() -> Vec<Keyblock> {
    let mut rng = rand::thread_rng();
    Keytype::defaults()
        .map(|ktp| {
            let mut contents = vec![0; ktp.key_size()];
            rng.fill_bytes(&mut contents);
            Keyblock::new(ktp.enctype(), contents)
        })
        .collect()
}

impl PrincipalStore for MemoryStore {
    fn get_principal(&mut self, principal: &Principal, mask: FieldMask) -> Result<PrincipalEntry, Error> {
        let principals = self.lock()?;
        let mut entry = principals
            .get(principal)
            .ok_or(Error::KADM5_UNK_PRINC)?
            .filtered(mask);
        // key contents never leave the store
        for key_data in &mut entry.key_data {
            key_data.key = Keyblock::new(key_data.key.enctype, vec![]);
        }
        Ok(entry)
    }

    fn delete_principal(&mut self, principal: &Principal) -> Result<(), Error> {
        self.lock()?
            .remove(principal)
            .map(|_| ())
            .ok_or(Error::KADM5_UNK_PRINC)
    }

    fn create_principal(
        &mut self,
        entry: &PrincipalEntry,
        mask: FieldMask,
        password: &Password,
    ) -> Result<(), Error> {
        if !mask.is_known() || mask.intersects(CREATE_FORBIDDEN) {
            Err(Error::KADM5_BAD_MASK)?
        }
        check_principal(&entry.principal)?;
        let mut created = PrincipalEntry::new(entry.principal.clone());
        created.apply(entry, mask);
        created.principal = entry.principal.clone();
        if !mask.contains(FieldMask::KVNO) {
            created.kvno = 1;
        }
        created.key_data = password_keys(&created.principal, password, created.kvno)?;
        created.last_pwd_change = now();
        self.stamp(&mut created);

        let mut principals = self.lock()?;
        if principals.contains_key(&entry.principal) {
            Err(Error::KADM5_DUP)?
        }

        debug!(principal = %created.principal, kvno = created.kvno, "created");
        principals.insert(created.principal.clone(), created);
        Ok(())
    }

    fn modify_principal(&mut self, entry: &PrincipalEntry, mask: FieldMask) -> Result<(), Error> {
        if !mask.is_known() || mask.intersects(MODIFY_FORBIDDEN) {
            Err(Error::KADM5_BAD_MASK)?
        }
        let mut principals = self.lock()?;
        let current = principals
            .get_mut(&entry.principal)
            .ok_or(Error::KADM5_UNK_PRINC)?;
        current.apply(entry, mask);
        self.stamp(current);
        Ok(())
    }

    fn rename_principal(&mut self, source: &Principal, target: &Principal) -> Result<(), Error> {
        check_principal(target)?;
        let mut principals = self.lock()?;
        if principals.contains_key(target) {
            Err(Error::KADM5_DUP)?
        }
        let mut entry = principals.remove(source).ok_or(Error::KADM5_UNK_PRINC)?;
        entry.principal = target.clone();
        // the salt follows the old name, so keep it explicit
        for key_data in &mut entry.key_data {
            if key_data.ver >= KEY_DATA_VERSION_SALTED && key_data.salt.value.is_empty() {
                key_data.salt.value = default_salt(source);
            }
        }
        self.stamp(&mut entry);
        principals.insert(target.clone(), entry);
        Ok(())
    }

    fn change_password(&mut self, principal: &Principal, password: &Password) -> Result<(), Error> {
        // derived before locking; the kvno is filled in once it is known
        let mut keys = password_keys(principal, password, 0)?;
        let mut principals = self.lock()?;
        let entry = principals.get_mut(principal).ok_or(Error::KADM5_UNK_PRINC)?;
        let kvno = entry.kvno.wrapping_add(1);
        for key_data in &mut keys {
            key_data.kvno = kvno;
        }
        entry.key_data = keys;
        entry.kvno = kvno;
        entry.last_pwd_change = now();
        entry.mod_date = entry.last_pwd_change;
        entry.mod_name = Some(self.caller.clone());
        Ok(())
    }

    fn randomize_key(&mut self, principal: &Principal) -> Result<Vec<Keyblock>, Error> {
        let mut principals = self.lock()?;
        let entry = principals.get_mut(principal).ok_or(Error::KADM5_UNK_PRINC)?;
        let keys = random_keys();
        entry.kvno = entry.kvno.wrapping_add(1);
        entry.key_data = keys
            .iter()
            .map(|key| KeyData {
                ver: KEY_DATA_VERSION_UNSALTED,
                kvno: entry.kvno,
                key: key.clone(),
                salt: KeySalt::default(),
            })
            .collect();
        entry.last_pwd_change = now();
        entry.mod_date = entry.last_pwd_change;
        entry.mod_name = Some(self.caller.clone());
        Ok(keys)
    }

    fn list_principals(&mut self, expression: Option<&str>) -> Result<Vec<String>, Error> {
        let pattern = match expression {
            Some(expression) if expression.contains('@') => expression.to_owned(),
            Some(expression) => format!("{}@{}", expression, String::from_utf8_lossy(&self.caller.realm)),
            None => "*".to_owned(),
        };
        let pattern = Pattern::new(&pattern).map_err(|_| Error::KADM5_FAILURE)?;
        let mut names = self
            .lock()?
            .keys()
            .filter_map(|principal| principal.unparse_name(0).ok())
            .filter(|name| pattern.matches(name))
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }
}
