mod profile;

pub use self::profile::Profile;
use crate::{server::DEFAULT_MAX_FRAME_SIZE, Error, Principal};
use nix::unistd::{Uid, User};

const DEFAULT_KADMIND_PORT: u16 = 749;

pub struct Conf;

macro_rules! conf {
    ($name:ident, $value:expr) => {
        pub const $name: &'static str = $value;
    };
}

impl Conf {
    conf!(ACL_FILE, "acl_file");
    conf!(DEFAULT_REALM, "default_realm");
    conf!(KADMIND, "kadmind");
    conf!(KEY_FILE, "key_file");
    conf!(MAX_FRAME_SIZE, "max_frame_size");
    conf!(PORT, "port");
}

/// Server settings materialized from the `[kadmind]` profile section.
#[derive(Debug)]
pub struct Context {
    pub profile: Profile,
    pub port: u16,
    pub acl_file: Option<String>,
    pub key_file: Option<String>,
    pub max_frame_size: usize,
    pub default_realm: Vec<u8>,
}

impl Context {
    pub fn init(config_file: Option<&str>) -> anyhow::Result<Self> {
        Self::new(Profile::new(config_file)?)
    }

    pub fn new(profile: Profile) -> anyhow::Result<Self> {
        let port = match Self::get_int(&profile, Conf::PORT) {
            Some(port) => u16::try_from(port)
                .map_err(|_| anyhow::anyhow!("Invalid {}: {}", Conf::PORT, port))?,
            None => DEFAULT_KADMIND_PORT,
        };

        let max_frame_size = match Self::get_int(&profile, Conf::MAX_FRAME_SIZE) {
            Some(size) if size > 0 => usize::try_from(size)?,
            Some(size) => Err(anyhow::anyhow!("Invalid {}: {}", Conf::MAX_FRAME_SIZE, size))?,
            None => DEFAULT_MAX_FRAME_SIZE,
        };

        let acl_file = Self::get_path(&profile, Conf::ACL_FILE)?;
        let key_file = Self::get_path(&profile, Conf::KEY_FILE)?;
        let default_realm = Self::get_string(&profile, Conf::DEFAULT_REALM)
            .map(String::into_bytes)
            .unwrap_or_default();

        Ok(Self {
            profile,
            port,
            acl_file,
            key_file,
            max_frame_size,
            default_realm,
        })
    }

    fn get_int(profile: &Profile, name: &str) -> Option<i64> {
        profile.get_int(&format!("{}.{}", Conf::KADMIND, name))
    }

    fn get_string(profile: &Profile, name: &str) -> Option<String> {
        profile.get_string(&format!("{}.{}", Conf::KADMIND, name))
    }

    fn get_path(profile: &Profile, name: &str) -> anyhow::Result<Option<String>> {
        Self::get_string(profile, name)
            .map(|path| Self::expand_path_tokens(&path))
            .transpose()
    }

    pub fn expand_path_tokens(path: &str) -> anyhow::Result<String> {
        let mut buf = vec![];
        let mut path_remained = path;
        while !path_remained.is_empty() {
            let token_begin = match path_remained.find("%{") {
                Some(token_begin) => {
                    buf.extend_from_slice(path_remained[..token_begin].as_bytes());
                    token_begin
                }
                None => {
                    buf.extend_from_slice(path_remained.as_bytes());
                    break;
                }
            };
            let token_end = match path_remained[token_begin..].find('}') {
                Some(token_end) => token_begin + token_end,
                None => Err(anyhow::anyhow!("Invalid argument"))?,
            };
            let token_value = Self::expand_token(&path_remained[token_begin + 2..token_end])?;
            buf.extend_from_slice(token_value.as_bytes());
            path_remained = &path_remained[token_end + 1..];
        }
        Ok(String::from_utf8(buf)?)
    }

    fn expand_token(token: &str) -> anyhow::Result<String> {
        let token_value = match token {
            "euid" => Uid::effective().to_string(),
            "username" => User::from_uid(Uid::effective())?
                .map(|u| u.name)
                .unwrap_or_else(|| Uid::effective().to_string()),
            "uid" | "USERID" => Uid::current().to_string(),
            _ => Err(anyhow::anyhow!("Invalid argument"))?,
        };
        Ok(token_value)
    }

    pub fn get_default_realm(&self) -> anyhow::Result<&[u8]> {
        if !self.default_realm.is_empty() {
            return Ok(&self.default_realm);
        }
        Err(Error::KRB5_CONFIG_NODEFREALM)?
    }

    pub fn parse_name(&self, name: &str) -> anyhow::Result<Principal> {
        Principal::parse_name(name, self.get_default_realm().ok(), 0)
    }
}
