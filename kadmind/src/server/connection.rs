use super::{
    auth::{Authenticated, Authenticator},
    channel::{read_length_prefix, SecureChannel},
    dispatch::dispatch,
    handshake::{read_version, FirstFrame},
    Session,
};
use crate::kadm5::{AccessControl, StoreFactory};
use std::{
    io::{Read, Write},
    sync::Arc,
};
use tracing::debug;

/// Largest sealed frame accepted unless configured otherwise.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingHandshake,
    Authenticating,
    Serving,
    Closed,
}

/// The collaborators shared by every connection. Each call to
/// [`Server::serve`] owns one connection from handshake to close.
pub struct Server {
    authenticator: Arc<dyn Authenticator>,
    acl: Arc<dyn AccessControl>,
    store: Arc<dyn StoreFactory>,
    max_frame_size: usize,
}

impl Server {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        acl: Arc<dyn AccessControl>,
        store: Arc<dyn StoreFactory>,
    ) -> Self {
        Self {
            authenticator,
            acl,
            store,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Serves one connection until the peer closes it. An error means the
    /// connection was dropped on a fatal fault.
    pub fn serve<S: Read + Write>(&self, mut stream: S) -> anyhow::Result<()> {
        let mut state = ConnectionState::AwaitingHandshake;
        debug!(?state);

        let prefix = match read_length_prefix(&mut stream)? {
            Some(prefix) => prefix,
            None => {
                debug!("closed before handshake");
                return Ok(());
            }
        };
        match FirstFrame::classify(prefix) {
            FirstFrame::Legacy { .. } => Err(anyhow::anyhow!("packet appears to be version 4"))?,
            FirstFrame::Sendauth { length } => read_version(&mut stream, length)?,
        }

        state = ConnectionState::Authenticating;
        debug!(?state);
        let Authenticated { client, context } = self
            .authenticator
            .accept(&mut stream)
            .map_err(|e| anyhow::anyhow!("authentication failed: {}", e))?;
        let store = self
            .store
            .open(&client)
            .map_err(|e| anyhow::anyhow!("{} while opening store for {}", e, client))?;
        let mut session = Session::new(client, Arc::clone(&self.acl), store);

        state = ConnectionState::Serving;
        debug!(?state, client = %session.caller());
        let mut channel = SecureChannel::new(&mut stream, context, self.max_frame_size);
        while let Some(mut request) = channel.receive()? {
            let response = dispatch(&mut session, &mut request);
            channel.send(&response)?;
        }

        state = ConnectionState::Closed;
        debug!(?state, client = %session.caller());
        Ok(())
    }
}
