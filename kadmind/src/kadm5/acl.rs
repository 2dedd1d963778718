use super::Privileges;
use crate::{Error, Principal};
use glob::Pattern;
use std::fs;

/// Decides whether a caller holds a set of privileges.
pub trait AccessControl: Send + Sync {
    fn privileges(&self, caller: &Principal) -> Privileges;

    fn check(&self, caller: &Principal, required: Privileges) -> Result<(), Error> {
        if self.privileges(caller).contains(required) {
            Ok(())
        } else {
            Err(Error::KADM5_AUTH_INSUFFICIENT)
        }
    }
}

/// A kadmind ACL file. Each line is `principal-pattern rights`, where the
/// pattern is a glob over the unparsed caller name and the rights are a
/// comma separated list such as `get,list` or `all`. A caller holds the
/// union of every matching line.
#[derive(Debug, Default)]
pub struct AclFile {
    entries: Vec<AclEntry>,
}

#[derive(Debug)]
struct AclEntry {
    pattern: Pattern,
    privileges: Privileges,
}

impl AclFile {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents =
            fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{} while reading {}", e, path))?;
        Self::parse(&contents).map_err(|e| anyhow::anyhow!("{}: {}", path, e))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let mut entries = vec![];
        for (number, line) in contents.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((line, _)) => line,
                None => line,
            };
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let (pattern, rights) = match fields.as_slice() {
                [] => continue,
                [pattern, rights] => (pattern, rights),
                _ => Err(anyhow::anyhow!("line {}: expected `principal rights`", number + 1))?,
            };
            let pattern = Pattern::new(pattern)
                .map_err(|e| anyhow::anyhow!("line {}: {}", number + 1, e))?;
            let mut privileges = Privileges::NONE;
            for right in rights.split(',').filter(|r| !r.is_empty()) {
                privileges = privileges
                    | Privileges::from_name(right).ok_or_else(|| {
                        anyhow::anyhow!("line {}: unknown right `{}`", number + 1, right)
                    })?;
            }
            entries.push(AclEntry {
                pattern,
                privileges,
            });
        }
        Ok(Self { entries })
    }
}

impl AccessControl for AclFile {
    fn privileges(&self, caller: &Principal) -> Privileges {
        let name = match caller.unparse_name(0) {
            Ok(name) => name,
            Err(_) => return Privileges::NONE,
        };
        self.entries
            .iter()
            .filter(|entry| entry.pattern.matches(&name))
            .fold(Privileges::NONE, |granted, entry| granted | entry.privileges)
    }
}
