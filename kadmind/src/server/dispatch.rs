use super::Session;
use crate::{
    kadm5::{FieldMask, Password, PrincipalEntry, Privileges},
    wire::{Decoder, Encoder, WireError},
    Error, Keyblock, Principal,
};
use std::fmt;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub i32);

macro_rules! opcode {
    ($name:ident, $value:expr) => {
        pub const $name: Opcode = Opcode($value);
    };
}

impl Opcode {
    opcode!(GET, 0);
    opcode!(DELETE, 1);
    opcode!(CREATE, 2);
    opcode!(RENAME, 3);
    opcode!(CHANGE_PASSWORD, 4);
    opcode!(MODIFY, 5);
    opcode!(RANDOM_KEY, 6);
    opcode!(GET_PRIVILEGES, 7);
    opcode!(LIST, 8);

    pub fn name(self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::DELETE => "DELETE",
            Self::CREATE => "CREATE",
            Self::RENAME => "RENAME",
            Self::CHANGE_PASSWORD => "CHPASS",
            Self::MODIFY => "MODIFY",
            Self::RANDOM_KEY => "RANDKEY",
            Self::GET_PRIVILEGES => "GET_PRIVS",
            Self::LIST => "LIST",
            _ => "UNKNOWN OP",
        }
    }
}

/// A fully decoded request. Dropping it wipes any password it carries.
#[derive(Debug)]
enum Request {
    Get { principal: Principal, mask: FieldMask },
    Delete { principal: Principal },
    Create { entry: PrincipalEntry, mask: FieldMask, password: Password },
    Modify { entry: PrincipalEntry, mask: FieldMask },
    Rename { source: Principal, target: Principal },
    ChangePassword { principal: Principal, password: Password },
    RandomKey { principal: Principal },
    GetPrivileges,
    List { expression: Option<String> },
}

enum Reply {
    Done,
    Entry(PrincipalEntry),
    Keys(Vec<Keyblock>),
    Privileges(Privileges),
    Names(Vec<String>),
}

/// Where a request stopped short of a reply.
#[derive(Debug)]
enum Failure {
    Decode(Opcode, WireError),
    UnknownOpcode(Opcode),
    Denied(Error),
    Backend(Error),
}

impl Failure {
    fn status(&self) -> Error {
        match self {
            Self::Decode(..) => Error::HEIM_ERR_EOF,
            Self::UnknownOpcode(_) => Error::KADM5_FAILURE,
            Self::Denied(e) | Self::Backend(e) => *e,
        }
    }
}

struct Target<'r>(&'r Request);

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Request::Get { principal, .. }
            | Request::Delete { principal }
            | Request::ChangePassword { principal, .. }
            | Request::RandomKey { principal } => write!(f, "{}", principal),
            Request::Create { entry, .. } | Request::Modify { entry, .. } => {
                write!(f, "{}", entry.principal)
            }
            Request::Rename { source, target } => write!(f, "{} -> {}", source, target),
            Request::GetPrivileges => Ok(()),
            Request::List { expression } => write!(f, "{}", expression.as_deref().unwrap_or("*")),
        }
    }
}

impl Request {
    // Fields are read strictly in wire order; the first one that fails to
    // decode ends the request.
    fn decode(opcode: Opcode, decoder: &mut Decoder) -> Result<Self, Failure> {
        let failed = |e| Failure::Decode(opcode, e);
        let request = match opcode {
            Opcode::GET => {
                let principal = decoder.principal("principal").map_err(failed)?;
                let mask = decoder.mask().map_err(failed)?;
                Self::Get { principal, mask }
            }
            Opcode::DELETE => {
                let principal = decoder.principal("principal").map_err(failed)?;
                Self::Delete { principal }
            }
            Opcode::CREATE => {
                let entry = decoder.principal_entry().map_err(failed)?;
                let mask = decoder.mask().map_err(failed)?;
                let password = decoder.password().map_err(failed)?;
                Self::Create {
                    entry,
                    mask,
                    password,
                }
            }
            Opcode::MODIFY => {
                let entry = decoder.principal_entry().map_err(failed)?;
                let mask = decoder.mask().map_err(failed)?;
                Self::Modify { entry, mask }
            }
            Opcode::RENAME => {
                let source = decoder.principal("source").map_err(failed)?;
                let target = decoder.principal("target").map_err(failed)?;
                Self::Rename { source, target }
            }
            Opcode::CHANGE_PASSWORD => {
                let principal = decoder.principal("principal").map_err(failed)?;
                let password = decoder.password().map_err(failed)?;
                Self::ChangePassword {
                    principal,
                    password,
                }
            }
            Opcode::RANDOM_KEY => {
                let principal = decoder.principal("principal").map_err(failed)?;
                Self::RandomKey { principal }
            }
            Opcode::GET_PRIVILEGES => Self::GetPrivileges,
            Opcode::LIST => {
                let expression = decoder.optional_string("expression").map_err(failed)?;
                Self::List { expression }
            }
            _ => Err(Failure::UnknownOpcode(opcode))?,
        };
        Ok(request)
    }

    fn required_privileges(&self) -> Privileges {
        match self {
            Self::Get { .. } => Privileges::GET,
            Self::Delete { .. } => Privileges::DELETE,
            Self::Create { .. } => Privileges::ADD,
            Self::Modify { .. } => Privileges::MODIFY,
            Self::Rename { .. } => Privileges::ADD | Privileges::DELETE,
            Self::ChangePassword { .. } | Self::RandomKey { .. } => Privileges::CHANGE_PASSWORD,
            Self::GetPrivileges => Privileges::NONE,
            Self::List { .. } => Privileges::LIST,
        }
    }

    fn execute(self, session: &mut Session) -> Result<Reply, Error> {
        match self {
            Self::Get { principal, mask } => session
                .store()
                .get_principal(&principal, mask)
                .map(Reply::Entry),
            Self::Delete { principal } => session
                .store()
                .delete_principal(&principal)
                .map(|_| Reply::Done),
            Self::Create {
                entry,
                mask,
                password,
            } => session
                .store()
                .create_principal(&entry, mask, &password)
                .map(|_| Reply::Done),
            Self::Modify { entry, mask } => session
                .store()
                .modify_principal(&entry, mask)
                .map(|_| Reply::Done),
            Self::Rename { source, target } => session
                .store()
                .rename_principal(&source, &target)
                .map(|_| Reply::Done),
            Self::ChangePassword {
                principal,
                password,
            } => session
                .store()
                .change_password(&principal, &password)
                .map(|_| Reply::Done),
            Self::RandomKey { principal } => {
                let keys = session.store().randomize_key(&principal)?;
                for key in &keys {
                    debug!(principal = %principal, enctype = key.enctype.name(true).unwrap_or("unknown"), "new key");
                }
                Ok(Reply::Keys(keys))
            }
            Self::GetPrivileges => Ok(Reply::Privileges(session.privileges())),
            Self::List { expression } => session
                .store()
                .list_principals(expression.as_deref())
                .map(Reply::Names),
        }
    }
}

fn process(session: &mut Session, input: &[u8]) -> Result<Reply, Failure> {
    let mut decoder = Decoder::new(input);
    let opcode = Opcode(
        decoder
            .int32("opcode")
            .map_err(|e| Failure::Decode(Opcode(-1), e))?,
    );
    let request = match Request::decode(opcode, &mut decoder) {
        Ok(request) => request,
        Err(Failure::UnknownOpcode(opcode)) => {
            warn!(client = %session.caller(), "{}: UNKNOWN OP {}", session.caller(), opcode.0);
            Err(Failure::UnknownOpcode(opcode))?
        }
        Err(failure) => Err(failure)?,
    };

    info!(
        client = %session.caller(),
        op = opcode.name(),
        principal = %Target(&request),
        "{}: {} {}",
        session.caller(),
        opcode.name(),
        Target(&request)
    );

    if let Err(e) = session.check(request.required_privileges()) {
        warn!(
            client = %session.caller(),
            op = opcode.name(),
            principal = %Target(&request),
            "{}: {} {}: {}",
            session.caller(),
            opcode.name(),
            Target(&request),
            e
        );
        Err(Failure::Denied(e))?
    }

    request.execute(session).map_err(Failure::Backend)
}

/// Runs one request through decode, authorization and execution, and
/// encodes the reply. Every outcome yields a status-prefixed reply. The
/// request bytes, password included, are wiped before this returns.
pub fn dispatch(session: &mut Session, request: &mut [u8]) -> Zeroizing<Vec<u8>> {
    let outcome = process(session, request);
    request.zeroize();

    let mut encoder = Encoder::new();
    match outcome {
        Ok(reply) => {
            encoder.int32(0);
            match reply {
                Reply::Done => {}
                Reply::Entry(entry) => {
                    encoder.principal_entry(&entry);
                }
                Reply::Keys(keys) => {
                    encoder.keyblocks(&keys);
                }
                Reply::Privileges(privileges) => {
                    encoder.uint32(privileges.0);
                }
                Reply::Names(names) => {
                    encoder.strings(&names);
                }
            }
        }
        Err(failure) => {
            match &failure {
                Failure::Decode(opcode, e) => {
                    warn!(client = %session.caller(), op = opcode.name(), "{}: {}", opcode.name(), e)
                }
                Failure::Backend(e) => {
                    debug!(client = %session.caller(), status = e.code, "{}", e)
                }
                Failure::UnknownOpcode(_) | Failure::Denied(_) => {}
            }
            encoder.int32(failure.status().code);
        }
    }
    encoder.finish()
}
