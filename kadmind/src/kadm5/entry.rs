use crate::{Flags, Keyblock, Kvno, Principal, Timestamp};
use std::ops::BitOr;

/// Selects which attributes of a [`PrincipalEntry`] a request means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldMask(pub u32);

macro_rules! field {
    ($name:ident, $value:expr) => {
        pub const $name: FieldMask = FieldMask($value);
    };
}

impl FieldMask {
    field!(PRINCIPAL, 0x000001);
    field!(PRINC_EXPIRE_TIME, 0x000002);
    field!(PW_EXPIRATION, 0x000004);
    field!(LAST_PWD_CHANGE, 0x000008);
    field!(ATTRIBUTES, 0x000010);
    field!(MAX_LIFE, 0x000020);
    field!(MOD_TIME, 0x000040);
    field!(MOD_NAME, 0x000080);
    field!(KVNO, 0x000100);
    field!(MKVNO, 0x000200);
    field!(AUX_ATTRIBUTES, 0x000400);
    field!(POLICY, 0x000800);
    field!(POLICY_CLR, 0x001000);
    field!(MAX_RLIFE, 0x002000);
    field!(LAST_SUCCESS, 0x004000);
    field!(LAST_FAILED, 0x008000);
    field!(FAIL_AUTH_COUNT, 0x010000);
    field!(KEY_DATA, 0x020000);
    field!(TL_DATA, 0x040000);
    field!(ALL, 0x07ffff);

    pub fn contains(self, field: Self) -> bool {
        self.0 & field.0 == field.0
    }

    pub fn intersects(self, fields: Self) -> bool {
        self.0 & fields.0 != 0
    }

    pub fn is_known(self) -> bool {
        self.0 & !Self::ALL.0 == 0
    }
}

impl BitOr for FieldMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeySalt {
    pub salt_type: i32,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyData {
    pub ver: i32,
    pub kvno: Kvno,
    pub key: Keyblock,
    pub salt: KeySalt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlData {
    pub tl_type: i32,
    pub contents: Vec<u8>,
}

/// The administrative record of one principal. The wire layout is fixed;
/// a [`FieldMask`] only says which of these fields carry meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrincipalEntry {
    pub principal: Principal,
    pub princ_expire_time: Timestamp,
    pub pw_expiration: Timestamp,
    pub last_pwd_change: Timestamp,
    pub max_life: i32,
    pub mod_name: Option<Principal>,
    pub mod_date: Timestamp,
    pub attributes: Flags,
    pub kvno: Kvno,
    pub mkvno: Kvno,
    pub policy: Option<String>,
    pub aux_attributes: i32,
    pub max_renewable_life: i32,
    pub last_success: Timestamp,
    pub last_failed: Timestamp,
    pub fail_auth_count: i32,
    pub key_data: Vec<KeyData>,
    pub tl_data: Vec<TlData>,
}

impl PrincipalEntry {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            ..Default::default()
        }
    }

    /// A copy holding the principal plus only the fields named by `mask`.
    pub fn filtered(&self, mask: FieldMask) -> Self {
        let mut entry = Self::new(self.principal.clone());
        entry.apply(self, FieldMask(mask.0 & !FieldMask::POLICY_CLR.0));
        entry
    }

    /// Copies every field named by `mask` from `update` into `self`.
    pub fn apply(&mut self, update: &Self, mask: FieldMask) {
        let entry = self;
        macro_rules! copy {
            ($($bit:ident => $field:ident),* $(,)?) => {
                $(
                    if mask.contains(FieldMask::$bit) {
                        entry.$field = update.$field.clone();
                    }
                )*
            };
        }
        copy!(
            PRINCIPAL => principal,
            PRINC_EXPIRE_TIME => princ_expire_time,
            PW_EXPIRATION => pw_expiration,
            LAST_PWD_CHANGE => last_pwd_change,
            ATTRIBUTES => attributes,
            MAX_LIFE => max_life,
            MOD_TIME => mod_date,
            MOD_NAME => mod_name,
            KVNO => kvno,
            MKVNO => mkvno,
            AUX_ATTRIBUTES => aux_attributes,
            POLICY => policy,
            MAX_RLIFE => max_renewable_life,
            LAST_SUCCESS => last_success,
            LAST_FAILED => last_failed,
            FAIL_AUTH_COUNT => fail_auth_count,
            KEY_DATA => key_data,
            TL_DATA => tl_data,
        );
        if mask.contains(FieldMask::POLICY_CLR) {
            entry.policy = None;
        }
    }
}
