use std::{fmt, ops::BitOr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Privileges(pub u32);

macro_rules! privilege {
    ($name:ident, $value:expr) => {
        pub const $name: Privileges = Privileges($value);
    };
}

const NAMES: [(&str, Privileges); 6] = [
    ("get", Privileges::GET),
    ("add", Privileges::ADD),
    ("modify", Privileges::MODIFY),
    ("delete", Privileges::DELETE),
    ("list", Privileges::LIST),
    ("cpw", Privileges::CHANGE_PASSWORD),
];

impl Privileges {
    privilege!(NONE, 0);
    privilege!(GET, 0x1);
    privilege!(ADD, 0x2);
    privilege!(MODIFY, 0x4);
    privilege!(DELETE, 0x8);
    privilege!(LIST, 0x10);
    privilege!(CHANGE_PASSWORD, 0x20);
    privilege!(ALL, 0x3f);

    pub fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Accepts the names used in ACL files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::ALL),
            "change-password" => Some(Self::CHANGE_PASSWORD),
            _ => NAMES.iter().find(|(n, _)| *n == name).map(|(_, p)| *p),
        }
    }
}

impl BitOr for Privileges {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = NAMES
            .iter()
            .filter(|(_, p)| self.contains(*p))
            .map(|(n, _)| *n)
            .collect::<Vec<_>>();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_requires_every_bit() {
        let granted = Privileges::ADD | Privileges::GET;
        assert!(granted.contains(Privileges::ADD));
        assert!(granted.contains(Privileges::NONE));
        assert!(!granted.contains(Privileges::ADD | Privileges::DELETE));
        assert!(Privileges::ALL.contains(Privileges::ADD | Privileges::DELETE));
    }

    #[test]
    fn names() {
        assert_eq!(Privileges::from_name("cpw"), Some(Privileges::CHANGE_PASSWORD));
        assert_eq!(
            Privileges::from_name("change-password"),
            Some(Privileges::CHANGE_PASSWORD)
        );
        assert_eq!(Privileges::from_name("all"), Some(Privileges::ALL));
        assert_eq!(Privileges::from_name("root"), None);
        assert_eq!((Privileges::GET | Privileges::LIST).to_string(), "get,list");
        assert_eq!(Privileges::NONE.to_string(), "none");
    }
}
