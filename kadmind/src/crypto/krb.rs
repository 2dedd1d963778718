mod enctype;
mod keyblock;
mod keytype;

pub use self::{enctype::Enctype, keyblock::Keyblock, keytype::Keytype};
