use config::{Config, File, FileFormat};
use std::env;

const DEFAULT_PROFILE_PATH: &str = "/etc/kadmind.conf";
const KADMIND_ENV_CONFIG: &str = "KADMIND_CONFIG";

#[derive(Debug)]
pub struct Profile {
    files: Vec<ProfileFile>,
}

macro_rules! get_value {
    ($fn:ident, $type:ident) => {
        pub fn $fn(&self, key: &str) -> Option<$type> {
            for file in &self.files {
                if let Ok(value) = file.config.$fn(key) {
                    return Some(value);
                }
            }
            None
        }
    };
}

impl Profile {
    /// Loads an explicitly named file, or else the `KADMIND_CONFIG` search
    /// path, or else the system default. Only an explicit name must exist.
    pub fn new(explicit: Option<&str>) -> anyhow::Result<Self> {
        let (names, required) = match explicit {
            Some(name) => (vec![name.to_owned()], true),
            None => (Self::default_config_files(), false),
        };
        let mut files = vec![];
        for name in names {
            files.push(ProfileFile::new(&name, required)?);
        }
        Ok(Self { files })
    }

    pub fn from_ini(contents: &str) -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Ini))
            .build()?;
        Ok(Self {
            files: vec![ProfileFile { config }],
        })
    }

    fn default_config_files() -> Vec<String> {
        env::var(KADMIND_ENV_CONFIG)
            .unwrap_or(DEFAULT_PROFILE_PATH.to_owned())
            .split(':')
            .filter(|f| !f.is_empty())
            .map(|f| f.to_owned())
            .collect()
    }

    get_value!(get_string, String);

    get_value!(get_int, i64);
}

#[derive(Debug)]
struct ProfileFile {
    config: Config,
}

impl ProfileFile {
    fn new(filename: &str, required: bool) -> anyhow::Result<Self> {
        let expanded_filename = match (filename.starts_with("~/"), env::var("HOME")) {
            (true, Ok(home_env)) => format!("{}{}", home_env, &filename[1..]),
            _ => filename.to_owned(),
        };
        let config = Config::builder()
            .add_source(
                File::with_name(&expanded_filename)
                    .format(FileFormat::Ini)
                    .required(required),
            )
            .build()?;
        Ok(Self { config })
    }
}
