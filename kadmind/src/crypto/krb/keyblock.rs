use super::Enctype;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key material for one enctype. The contents are wiped when the block is
/// dropped and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Keyblock {
    #[zeroize(skip)]
    pub enctype: Enctype,
    pub contents: Vec<u8>,
}

impl Keyblock {
    pub fn new(enctype: Enctype, contents: Vec<u8>) -> Self {
        Self { enctype, contents }
    }
}

impl fmt::Debug for Keyblock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyblock")
            .field("enctype", &self.enctype)
            .field("length", &self.contents.len())
            .finish()
    }
}
