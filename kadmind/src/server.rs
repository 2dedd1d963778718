//! The per-connection protocol engine: handshake, authentication, the
//! sealed frame loop and request dispatch.

mod auth;
mod channel;
mod connection;
mod dispatch;
mod handshake;
mod session;

pub use self::{
    auth::{Authenticated, Authenticator, SharedKeyAuthenticator, Stream},
    channel::{read_length_prefix, write_frame, AeadContext, SecureChannel, SecurityContext},
    connection::{ConnectionState, Server, DEFAULT_MAX_FRAME_SIZE},
    dispatch::{dispatch, Opcode},
    handshake::{read_version, write_version, FirstFrame, SENDAUTH_VERSION},
    session::Session,
};
