use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use std::io::{ErrorKind, Read, Write};
use zeroize::Zeroizing;

const INITIATOR_TAG: u32 = u32::from_be_bytes(*b"kadc");
const ACCEPTOR_TAG: u32 = u32::from_be_bytes(*b"kads");

/// The security context an authentication exchange leaves behind. Each call
/// protects or checks exactly one message; a failure is fatal to the
/// connection.
pub trait SecurityContext: Send {
    fn seal(&mut self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>>;

    fn unseal(&mut self, sealed: &[u8]) -> anyhow::Result<Zeroizing<Vec<u8>>>;
}

struct Direction {
    tag: u32,
    counter: u64,
}

impl Direction {
    fn next_nonce(&mut self) -> anyhow::Result<Nonce> {
        let mut nonce = [0; 12];
        nonce[..4].copy_from_slice(&self.tag.to_be_bytes());
        nonce[4..].copy_from_slice(&self.counter.to_be_bytes());
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("message counter exhausted"))?;
        Ok(Nonce::clone_from_slice(&nonce))
    }
}

/// ChaCha20-Poly1305 under a session key. Nonces are a direction tag plus a
/// message counter, so a reordered, replayed or reflected message fails to
/// unseal.
pub struct AeadContext {
    cipher: ChaCha20Poly1305,
    send: Direction,
    recv: Direction,
}

impl AeadContext {
    pub fn initiator(key: &[u8; 32]) -> Self {
        Self::new(key, INITIATOR_TAG, ACCEPTOR_TAG)
    }

    pub fn acceptor(key: &[u8; 32]) -> Self {
        Self::new(key, ACCEPTOR_TAG, INITIATOR_TAG)
    }

    fn new(key: &[u8; 32], send_tag: u32, recv_tag: u32) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
            send: Direction {
                tag: send_tag,
                counter: 0,
            },
            recv: Direction {
                tag: recv_tag,
                counter: 0,
            },
        }
    }
}

impl SecurityContext for AeadContext {
    fn seal(&mut self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        let nonce = self.send.next_nonce()?;
        self.cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| anyhow::anyhow!("{} while sealing", e))
    }

    fn unseal(&mut self, sealed: &[u8]) -> anyhow::Result<Zeroizing<Vec<u8>>> {
        let nonce = self.recv.next_nonce()?;
        self.cipher
            .decrypt(&nonce, sealed)
            .map(Zeroizing::new)
            .map_err(|e| anyhow::anyhow!("{} while unsealing", e))
    }
}

/// Reads a 4-byte big-endian length. `None` means the peer closed the stream
/// exactly on a frame boundary.
pub fn read_length_prefix<R: Read + ?Sized>(reader: &mut R) -> anyhow::Result<Option<u32>> {
    let mut buf = [0; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => Err(anyhow::anyhow!("short read ({})", filled))?,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => Err(anyhow::anyhow!("read error: {}", e))?,
        }
    }
    Ok(Some(u32::from_be_bytes(buf)))
}

pub fn write_frame<W: Write + ?Sized>(writer: &mut W, bytes: &[u8]) -> anyhow::Result<()> {
    let length = u32::try_from(bytes.len())
        .map_err(|_| anyhow::anyhow!("frame of {} bytes too long", bytes.len()))?;
    let mut frame = Vec::with_capacity(4 + bytes.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(bytes);
    writer
        .write_all(&frame)
        .and_then(|_| writer.flush())
        .map_err(|e| anyhow::anyhow!("{} while writing frame", e))
}

/// Framed, sealed messages over a byte stream: `[length][sealed bytes]` in
/// each direction, where the length counts sealed bytes.
pub struct SecureChannel<'s, S: ?Sized> {
    stream: &'s mut S,
    context: Box<dyn SecurityContext>,
    max_frame_size: usize,
}

impl<'s, S: Read + Write + ?Sized> SecureChannel<'s, S> {
    pub fn new(stream: &'s mut S, context: Box<dyn SecurityContext>, max_frame_size: usize) -> Self {
        Self {
            stream,
            context,
            max_frame_size,
        }
    }

    /// The next unsealed message, or `None` once the peer has closed.
    pub fn receive(&mut self) -> anyhow::Result<Option<Zeroizing<Vec<u8>>>> {
        let length = match read_length_prefix(&mut *self.stream)? {
            Some(length) => length as usize,
            None => return Ok(None),
        };
        if length > self.max_frame_size {
            Err(anyhow::anyhow!(
                "frame of {} bytes exceeds limit of {}",
                length,
                self.max_frame_size
            ))?
        }
        let mut sealed = vec![0; length];
        self.stream
            .read_exact(&mut sealed)
            .map_err(|e| anyhow::anyhow!("short read: {}", e))?;
        self.context.unseal(&sealed).map(Some)
    }

    pub fn send(&mut self, plaintext: &[u8]) -> anyhow::Result<()> {
        let sealed = self.context.seal(plaintext)?;
        write_frame(&mut *self.stream, &sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const KEY: [u8; 32] = [0x42; 32];

    #[test]
    fn seal_unseal_between_peers() {
        let mut client = AeadContext::initiator(&KEY);
        let mut server = AeadContext::acceptor(&KEY);
        let messages: [&[u8]; 3] = [b"first", b"second", b""];
        for message in messages {
            let sealed = client.seal(message).unwrap();
            assert_eq!(sealed.len(), message.len() + 16);
            assert_eq!(server.unseal(&sealed).unwrap().as_slice(), message);
        }
        let sealed = server.seal(b"reply").unwrap();
        assert_eq!(client.unseal(&sealed).unwrap().as_slice(), b"reply");
    }

    #[test]
    fn unseal_rejects_tampering_replay_and_reflection() {
        let mut client = AeadContext::initiator(&KEY);
        let mut server = AeadContext::acceptor(&KEY);

        let mut sealed = client.seal(b"request").unwrap();
        sealed[0] ^= 1;
        assert!(server.unseal(&sealed).is_err());

        let mut client = AeadContext::initiator(&KEY);
        let mut server = AeadContext::acceptor(&KEY);
        let sealed = client.seal(b"request").unwrap();
        server.unseal(&sealed).unwrap();
        assert!(server.unseal(&sealed).is_err());

        let mut server = AeadContext::acceptor(&KEY);
        let reflected = server.seal(b"reply").unwrap();
        let mut other = AeadContext::acceptor(&KEY);
        assert!(other.unseal(&reflected).is_err());

        let mut wrong_key = AeadContext::acceptor(&[0x43; 32]);
        let sealed = AeadContext::initiator(&KEY).seal(b"request").unwrap();
        assert!(wrong_key.unseal(&sealed).is_err());
    }

    #[test]
    fn length_prefix_boundaries() {
        assert_eq!(read_length_prefix(&mut Cursor::new(Vec::<u8>::new())).unwrap(), None);
        assert_eq!(
            read_length_prefix(&mut Cursor::new(vec![0u8, 0, 1, 0])).unwrap(),
            Some(256)
        );
        assert!(read_length_prefix(&mut Cursor::new(vec![0u8, 0])).is_err());
    }

    #[test]
    fn channel_frames() {
        let mut client = AeadContext::initiator(&KEY);
        let mut wire: Vec<u8> = vec![];
        write_frame(&mut wire, &client.seal(b"hello").unwrap()).unwrap();
        assert_eq!(&wire[..4], &[0, 0, 0, 21]);

        let mut stream = Cursor::new(wire);
        let mut channel = SecureChannel::new(&mut stream, Box::new(AeadContext::acceptor(&KEY)), 1024);
        assert_eq!(channel.receive().unwrap().unwrap().as_slice(), b"hello");
        assert!(channel.receive().unwrap().is_none());
    }

    #[test]
    fn channel_refuses_oversized_and_short_frames() {
        let mut stream = Cursor::new(vec![0u8, 1, 0, 0]);
        let mut channel = SecureChannel::new(&mut stream, Box::new(AeadContext::acceptor(&KEY)), 1024);
        assert!(channel.receive().is_err());

        let mut stream = Cursor::new(vec![0u8, 0, 0, 32, 1, 2, 3]);
        let mut channel = SecureChannel::new(&mut stream, Box::new(AeadContext::acceptor(&KEY)), 1024);
        assert!(channel.receive().is_err());
    }
}
