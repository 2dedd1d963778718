use std::io::{Read, Write};

pub const SENDAUTH_VERSION: &[u8] = b"KRB5_SENDAUTH_V1.0\0";

// Version 4 requests start with a length whose low half reads "KA".
const LEGACY_MARKER: u32 = ((b'K' as u32) << 8) + b'A' as u32;

/// How the length prefix opening a connection is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstFrame {
    Legacy { length: u32 },
    Sendauth { length: u32 },
}

impl FirstFrame {
    pub fn classify(prefix: u32) -> Self {
        if prefix > 0xffff && prefix & 0xffff == LEGACY_MARKER {
            Self::Legacy {
                length: prefix >> 16,
            }
        } else {
            Self::Sendauth { length: prefix }
        }
    }
}

pub fn read_version<R: Read + ?Sized>(reader: &mut R, length: u32) -> anyhow::Result<()> {
    if length as usize != SENDAUTH_VERSION.len() {
        Err(anyhow::anyhow!("bad sendauth len {}", length))?
    }
    let mut version = [0; SENDAUTH_VERSION.len()];
    reader
        .read_exact(&mut version)
        .map_err(|e| anyhow::anyhow!("{} while reading sendauth version", e))?;
    if &version[..] != SENDAUTH_VERSION {
        Err(anyhow::anyhow!(
            "bad sendauth version {}",
            String::from_utf8_lossy(&version[..8])
        ))?
    }
    Ok(())
}

/// The client side of [`read_version`].
pub fn write_version<W: Write + ?Sized>(writer: &mut W) -> anyhow::Result<()> {
    super::channel::write_frame(writer, SENDAUTH_VERSION)
}
