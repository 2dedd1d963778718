use super::keytype::Keytype;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Enctype(pub i32);

macro_rules! enctype {
    ($enctype:ident, $int:expr) => {
        pub const $enctype: Enctype = Enctype($int);
    };
}

impl Enctype {
    enctype!(NULL, 0x0000);
    // @deprecated DES-3 cbc with SHA1
    enctype!(DES3_CBC_SHA1, 0x0010);
    // RFC 3962
    enctype!(AES128_CTS_HMAC_SHA1_96, 0x0011);
    // RFC 3962
    enctype!(AES256_CTS_HMAC_SHA1_96, 0x0012);
    // RFC 8009
    enctype!(AES128_CTS_HMAC_SHA256_128, 0x0013);
    // RFC 8009
    enctype!(AES256_CTS_HMAC_SHA384_192, 0x0014);
    // RFC 4757
    enctype!(ARCFOUR_HMAC, 0x0017);
    // RFC 6803
    enctype!(CAMELLIA128_CTS_CMAC, 0x0019);
    // RFC 6803
    enctype!(CAMELLIA256_CTS_CMAC, 0x001a);

    pub fn name(self, shortest: bool) -> anyhow::Result<&'static str> {
        Keytype::find_enctype(self)
            .map(|keytype| keytype.name(shortest))
            .ok_or_else(|| anyhow::anyhow!("Invalid enctype: {}", self.0))
    }
}
