//! The kadm5 wire primitives. Every integer is 32 bits big-endian.
//!
//! ```text
//! data ::=
//!     length (32 bits)
//!     value (length bytes)
//! principal ::=
//!     name type (32 bits)
//!     count of components (32 bits)
//!     realm (data)
//!     component1 (data)
//!     component2 (data)
//!     ...
//! keyblock ::=
//!     enctype (32 bits)
//!     contents (data)
//! optional ::=
//!     present (32 bits, 0 or 1)
//!     value [only when present]
//! ```
//!
//! A principal entry is a fixed sequence laid out by
//! [`Encoder::principal_entry`]; the field mask never changes which
//! fields are physically present.

mod decode;
mod encode;

pub use self::{
    decode::{Decoder, WireError},
    encode::Encoder,
};
