mod krb;
mod pbkdf2;

pub use self::{
    krb::{Enctype, Keyblock, Keytype},
    pbkdf2::pbkdf2_hmac_sha1,
};
