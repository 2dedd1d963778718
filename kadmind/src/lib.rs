pub mod context;
pub mod crypto;
pub mod error;
pub mod kadm5;
pub mod principal;
pub mod server;
pub mod wire;

pub use context::{Conf, Context};
pub use crypto::{Enctype, Keyblock, Keytype};
pub use error::{Error, ErrorCode};
pub use principal::{NameType, Principal};

use std::process::ExitCode;

pub type Flags = i32;
pub type Timestamp = i32;
pub type Kvno = u32;

pub fn prefix_progname_to_error_if_needed(progname: &str, result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) if err.to_string().starts_with(&format!("Usage: {}", progname)) => {
            eprintln!("{:?}", err);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{}: {:?}", progname, err);
            ExitCode::FAILURE
        }
    }
}
