use crate::{Error, Flags};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

const REALM_SEP: u8 = b'@';
const COMPONENT_SEP: u8 = b'/';
const KRB5_TGS_NAME: &str = "krbtgt";
const KRB5_WELLKNOWN_NAMESTR: &str = "WELLKNOWN";

/// A principal identifier. Equality and hashing only look at the realm and
/// the components; the name type is carried along for the wire.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub realm: Vec<u8>,
    pub components: Vec<Vec<u8>>,
    pub name_type: NameType,
}

macro_rules! principal_flag {
    ($name:ident, $value:expr) => {
        pub const $name: Flags = $value;
    };
}

impl Principal {
    principal_flag!(PARSE_NO_REALM, 0x1);
    principal_flag!(PARSE_REQUIRE_REALM, 0x2);
    principal_flag!(PARSE_NO_DEF_REALM, 0x10);

    principal_flag!(UNPARSE_NO_REALM, 0x2);

    pub fn new(realm: &str, components: &[&str]) -> Self {
        let components = components
            .iter()
            .map(|c| c.as_bytes().to_owned())
            .collect::<Vec<_>>();
        let name_type = Self::infer_principal_type(&components);
        Self {
            realm: realm.as_bytes().to_owned(),
            components,
            name_type,
        }
    }

    pub fn parse_name(name: &str, default_realm: Option<&[u8]>, flags: Flags) -> anyhow::Result<Self> {
        if name.is_empty() || name.ends_with('\\') {
            Err(Error::KRB5_PARSE_MALFORMED)?
        }
        let require_realm = flags & Self::PARSE_REQUIRE_REALM != 0;
        let no_realm = flags & Self::PARSE_NO_REALM != 0;
        let no_def_realm = flags & Self::PARSE_NO_DEF_REALM != 0;

        let (components, realm) = match name.split_once('@') {
            None => (name, None),
            Some((components, realm)) => (components, Some(realm)),
        };

        let components = components
            .split('/')
            .map(|c| c.as_bytes().to_owned())
            .collect::<Vec<_>>();
        if components.iter().any(Vec::is_empty) {
            Err(Error::KRB5_PARSE_MALFORMED)?
        }

        let realm = match realm {
            Some(realm) => {
                if no_realm || realm.is_empty() || realm.contains('/') || realm.contains('@') {
                    Err(Error::KRB5_PARSE_MALFORMED)?
                }
                realm.as_bytes().to_owned()
            }
            None => {
                if require_realm {
                    Err(Error::KRB5_PARSE_MALFORMED)?
                }
                if no_realm || no_def_realm {
                    vec![]
                } else {
                    default_realm
                        .map(<[u8]>::to_owned)
                        .ok_or(Error::KRB5_CONFIG_NODEFREALM)?
                }
            }
        };

        let name_type = Self::infer_principal_type(&components);

        Ok(Principal {
            realm,
            components,
            name_type,
        })
    }

    fn infer_principal_type(components: &[Vec<u8>]) -> NameType {
        if components.len() == 2 && components[0].eq(KRB5_TGS_NAME.as_bytes()) {
            NameType::SRV_INST
        } else if components.len() >= 2 && components[0].eq(KRB5_WELLKNOWN_NAMESTR.as_bytes()) {
            NameType::WELLKNOWN
        } else {
            NameType::PRINCIPAL
        }
    }

    pub fn unparse_name(&self, flags: Flags) -> anyhow::Result<String> {
        let mut name = self.components.join(&COMPONENT_SEP);
        if flags & Self::UNPARSE_NO_REALM == 0 {
            name = [name, self.realm.clone()].join(&REALM_SEP);
        }
        Ok(String::from_utf8(name)?)
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.realm == other.realm && self.components == other.components
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.realm.hash(state);
        self.components.hash(state);
    }
}

/// Lossy rendering for log lines; names that are not UTF-8 still print.
impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", String::from_utf8_lossy(component))?;
        }
        write!(f, "@{}", String::from_utf8_lossy(&self.realm))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameType(pub i32);

macro_rules! name_type {
    ($name_type:ident, $int:expr) => {
        pub const $name_type: NameType = NameType($int);
    };
}

impl NameType {
    // Name type not known
    name_type!(UNKNOWN, 0);
    // Just the name of the principal as in DCE, or for users
    name_type!(PRINCIPAL, 1);
    // Service and other unique instance (krbtgt)
    name_type!(SRV_INST, 2);
    // Well-known (special) principal
    name_type!(WELLKNOWN, 11);
}
