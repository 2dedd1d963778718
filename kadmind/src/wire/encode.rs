use crate::{kadm5::PrincipalEntry, Keyblock, Principal};
use std::mem;
use zeroize::Zeroizing;

/// Builds one payload. The buffer is wiped when dropped since responses may
/// carry fresh key material.
pub struct Encoder {
    buf: Zeroizing<Vec<u8>>,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buf: Zeroizing::new(vec![]),
        }
    }

    pub fn int32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn uint32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn data(&mut self, bytes: &[u8]) -> &mut Self {
        self.uint32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.data(value.as_bytes())
    }

    pub fn optional_string(&mut self, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self.int32(1).string(value),
            None => self.int32(0),
        }
    }

    pub fn principal(&mut self, principal: &Principal) -> &mut Self {
        self.int32(principal.name_type.0)
            .uint32(principal.components.len() as u32)
            .data(&principal.realm);
        for component in &principal.components {
            self.data(component);
        }
        self
    }

    pub fn principal_entry(&mut self, entry: &PrincipalEntry) -> &mut Self {
        self.principal(&entry.principal)
            .int32(entry.princ_expire_time)
            .int32(entry.pw_expiration)
            .int32(entry.last_pwd_change)
            .int32(entry.max_life);
        match &entry.mod_name {
            Some(mod_name) => self.int32(1).principal(mod_name),
            None => self.int32(0),
        };
        self.int32(entry.mod_date)
            .int32(entry.attributes)
            .uint32(entry.kvno)
            .uint32(entry.mkvno)
            .optional_string(entry.policy.as_deref())
            .int32(entry.aux_attributes)
            .int32(entry.max_renewable_life)
            .int32(entry.last_success)
            .int32(entry.last_failed)
            .int32(entry.fail_auth_count);

        self.uint32(entry.key_data.len() as u32);
        for key_data in &entry.key_data {
            self.int32(key_data.ver)
                .uint32(key_data.kvno)
                .keyblock(&key_data.key)
                .int32(key_data.salt.salt_type)
                .data(&key_data.salt.value);
        }

        self.uint32(entry.tl_data.len() as u32);
        for tl_data in &entry.tl_data {
            self.int32(tl_data.tl_type).data(&tl_data.contents);
        }
        self
    }

    pub fn keyblock(&mut self, keyblock: &Keyblock) -> &mut Self {
        self.int32(keyblock.enctype.0).data(&keyblock.contents)
    }

    pub fn keyblocks(&mut self, keyblocks: &[Keyblock]) -> &mut Self {
        self.uint32(keyblocks.len() as u32);
        for keyblock in keyblocks {
            self.keyblock(keyblock);
        }
        self
    }

    pub fn strings(&mut self, values: &[String]) -> &mut Self {
        self.uint32(values.len() as u32);
        for value in values {
            self.string(value);
        }
        self
    }

    pub fn finish(&mut self) -> Zeroizing<Vec<u8>> {
        mem::replace(&mut self.buf, Zeroizing::new(vec![]))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
