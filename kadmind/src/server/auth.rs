use super::channel::{AeadContext, SecurityContext};
use crate::Principal;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use std::{
    fs,
    io::{Read, Write},
};
use tracing::debug;
use zeroize::Zeroizing;

const MAX_CLIENT_NAME_LENGTH: usize = 1024;
const NONCE_LENGTH: usize = 16;
const SESSION_KEY_INFO: &[u8] = b"kadmind session key";

pub trait Stream: Read + Write {}

impl<T: Read + Write> Stream for T {}

/// What a successful authentication exchange yields: who is on the other end
/// and the context protecting everything they send afterwards.
pub struct Authenticated {
    pub client: Principal,
    pub context: Box<dyn SecurityContext>,
}

pub trait Authenticator: Send + Sync {
    fn accept(&self, stream: &mut dyn Stream) -> anyhow::Result<Authenticated>;
}

/// Authenticates clients by possession of a key shared with the server.
///
/// The client names itself and sends a nonce; the server acknowledges with a
/// zero status and its own nonce. Both ends then expand the shared key into a
/// per-connection session key. A client without the key is caught when its
/// first frame fails to unseal.
pub struct SharedKeyAuthenticator {
    key: Zeroizing<[u8; 32]>,
    default_realm: Vec<u8>,
}

impl SharedKeyAuthenticator {
    pub fn new(key: [u8; 32], default_realm: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(key),
            default_realm: default_realm.to_owned(),
        }
    }

    /// Reads a key file holding 64 hex digits.
    pub fn from_key_file(path: &str, default_realm: &[u8]) -> anyhow::Result<Self> {
        let contents = Zeroizing::new(
            fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{} while reading {}", e, path))?,
        );
        let bytes = Zeroizing::new(
            hex::decode(contents.trim()).map_err(|e| anyhow::anyhow!("{}: {}", path, e))?,
        );
        let key = <[u8; 32]>::try_from(bytes.as_slice())
            .map_err(|_| anyhow::anyhow!("{}: expected a 32 byte key", path))?;
        Ok(Self::new(key, default_realm))
    }

    fn session_key(&self, client_nonce: &[u8], server_nonce: &[u8]) -> anyhow::Result<Zeroizing<[u8; 32]>> {
        let salt = [client_nonce, server_nonce].concat();
        let hkdf = Hkdf::<Sha256>::new(Some(salt.as_slice()), self.key.as_slice());
        let mut session_key = Zeroizing::new([0; 32]);
        hkdf.expand(SESSION_KEY_INFO, session_key.as_mut_slice())
            .map_err(|e| anyhow::anyhow!("{} while deriving session key", e))?;
        Ok(session_key)
    }

    /// The client half of the exchange, run after the version string.
    pub fn initiate(&self, stream: &mut dyn Stream, client_name: &str) -> anyhow::Result<AeadContext> {
        let mut client_nonce = [0; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut client_nonce);
        let mut hello = vec![];
        hello.extend_from_slice(&(client_name.len() as u32).to_be_bytes());
        hello.extend_from_slice(client_name.as_bytes());
        hello.extend_from_slice(&client_nonce);
        stream
            .write_all(&hello)
            .and_then(|_| stream.flush())
            .map_err(|e| anyhow::anyhow!("{} while sending client name", e))?;

        let mut reply = [0; 4 + NONCE_LENGTH];
        stream
            .read_exact(&mut reply)
            .map_err(|e| anyhow::anyhow!("{} while reading authentication reply", e))?;
        let (status, server_nonce) = reply.split_at(4);
        if status != [0; 4] {
            Err(anyhow::anyhow!("authentication refused"))?
        }
        let session_key = self.session_key(&client_nonce, server_nonce)?;
        Ok(AeadContext::initiator(&session_key))
    }
}

impl Authenticator for SharedKeyAuthenticator {
    fn accept(&self, stream: &mut dyn Stream) -> anyhow::Result<Authenticated> {
        let mut length = [0; 4];
        stream
            .read_exact(&mut length)
            .map_err(|e| anyhow::anyhow!("{} while reading client name", e))?;
        let length = u32::from_be_bytes(length) as usize;
        if length == 0 || length > MAX_CLIENT_NAME_LENGTH {
            Err(anyhow::anyhow!("bad client name length {}", length))?
        }
        let mut name = vec![0; length];
        let mut client_nonce = [0; NONCE_LENGTH];
        stream
            .read_exact(&mut name)
            .and_then(|_| stream.read_exact(&mut client_nonce))
            .map_err(|e| anyhow::anyhow!("{} while reading client name", e))?;
        let name = String::from_utf8(name)?;
        let client = Principal::parse_name(&name, Some(self.default_realm.as_slice()), 0)
            .map_err(|e| anyhow::anyhow!("{} while parsing client name {}", e, name))?;

        let mut server_nonce = [0; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut server_nonce);
        let mut reply = vec![0; 4];
        reply.extend_from_slice(&server_nonce);
        stream
            .write_all(&reply)
            .and_then(|_| stream.flush())
            .map_err(|e| anyhow::anyhow!("{} while acknowledging client", e))?;

        let session_key = self.session_key(&client_nonce, &server_nonce)?;
        debug!(client = %client, "shared key exchange complete");
        Ok(Authenticated {
            client,
            context: Box::new(AeadContext::acceptor(&session_key)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Write as _, os::unix::net::UnixStream, thread};

    const KEY: [u8; 32] = [0x11; 32];

    #[test]
    fn both_ends_agree_on_session() {
        let (mut client_end, mut server_end) = UnixStream::pair().unwrap();
        let server = thread::spawn(move || {
            SharedKeyAuthenticator::new(KEY, b"EXAMPLE.COM")
                .accept(&mut server_end)
                .map(|authenticated| (authenticated, server_end))
        });
        let mut client = SharedKeyAuthenticator::new(KEY, b"EXAMPLE.COM")
            .initiate(&mut client_end, "alice/admin")
            .unwrap();
        let (mut authenticated, _server_end) = server.join().unwrap().unwrap();

        assert_eq!(
            authenticated.client,
            Principal::new("EXAMPLE.COM", &["alice", "admin"])
        );
        let sealed = client.seal(b"request").unwrap();
        assert_eq!(
            authenticated.context.unseal(&sealed).unwrap().as_slice(),
            b"request"
        );
    }

    #[test]
    fn wrong_key_cannot_talk() {
        let (mut client_end, mut server_end) = UnixStream::pair().unwrap();
        let server = thread::spawn(move || {
            SharedKeyAuthenticator::new(KEY, b"EXAMPLE.COM")
                .accept(&mut server_end)
                .map(|authenticated| authenticated.context)
        });
        let mut client = SharedKeyAuthenticator::new([0x22; 32], b"EXAMPLE.COM")
            .initiate(&mut client_end, "mallory@EXAMPLE.COM")
            .unwrap();
        let mut context = server.join().unwrap().unwrap();
        assert!(context.unseal(&client.seal(b"request").unwrap()).is_err());
    }

    #[test]
    fn rejects_bad_client_names() {
        let authenticator = SharedKeyAuthenticator::new(KEY, b"EXAMPLE.COM");
        let mut stream = std::io::Cursor::new(vec![0xffu8; 4]);
        assert!(authenticator.accept(&mut stream).is_err());

        let mut bytes = vec![0, 0, 0, 6];
        bytes.extend_from_slice(b"alice@");
        bytes.extend_from_slice(&[0; NONCE_LENGTH]);
        let mut stream = std::io::Cursor::new(bytes);
        assert!(authenticator.accept(&mut stream).is_err());
    }

    #[test]
    fn key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", "ab".repeat(32)).unwrap();
        let authenticator =
            SharedKeyAuthenticator::from_key_file(file.path().to_str().unwrap(), b"EXAMPLE.COM").unwrap();
        assert_eq!(*authenticator.key, [0xab; 32]);

        let mut short = tempfile::NamedTempFile::new().unwrap();
        writeln!(short, "abcd").unwrap();
        assert!(SharedKeyAuthenticator::from_key_file(short.path().to_str().unwrap(), b"").is_err());
        assert!(SharedKeyAuthenticator::from_key_file("/nonexistent/key", b"").is_err());
    }
}
