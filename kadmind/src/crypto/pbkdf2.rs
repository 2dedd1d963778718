use sha1::Sha1;
use zeroize::Zeroizing;

/// PKCS #5 v2.0 PBKDF2 with HMAC-SHA1 as the PRF (RFC 2898 section 5.2).
pub fn pbkdf2_hmac_sha1(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    key_size: usize,
) -> anyhow::Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        Err(anyhow::anyhow!("PBKDF2 iteration count must be positive"))?
    }
    let mut key = Zeroizing::new(vec![0; key_size]);
    ::pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, iterations, key.as_mut_slice());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vector {
        password: &'static [u8],
        salt: &'static [u8],
        iterations: u32,
        expected: &'static str,
    }

    // RFC 3962 appendix B and RFC 6070.
    const VECTORS: [Vector; 9] = [
        Vector {
            password: b"password",
            salt: b"ATHENA.MIT.EDUraeburn",
            iterations: 1,
            expected: "cdedb5281bb2f801565a1122b2563515",
        },
        Vector {
            password: b"password",
            salt: b"ATHENA.MIT.EDUraeburn",
            iterations: 1,
            expected: "cdedb5281bb2f801565a1122b25635150ad1f7a04bb9f3a333ecc0e2e1f70837",
        },
        Vector {
            password: b"password",
            salt: b"ATHENA.MIT.EDUraeburn",
            iterations: 2,
            expected: "01dbee7f4a9e243e988b62c73cda935da05378b93244ec8f48a99e61ad799d86",
        },
        Vector {
            password: b"password",
            salt: b"ATHENA.MIT.EDUraeburn",
            iterations: 1200,
            expected: "5c08eb61fdf71e4e4ec3cf6ba1f5512ba7e52ddbc5e5142f708a31e2e62b1e13",
        },
        Vector {
            password: b"password",
            salt: b"\x12\x34\x56\x78\x78\x56\x34\x12",
            iterations: 5,
            expected: "d1daa78615f287e6a1c8b120d7062a49",
        },
        Vector {
            password: b"XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX",
            salt: b"pass phrase equals block size",
            iterations: 1200,
            expected: "139c30c0966bc32ba55fdbf212530ac9",
        },
        Vector {
            password: b"\xf0\x9d\x84\x9e",
            salt: b"EXAMPLE.COMpianist",
            iterations: 50,
            expected: "6b9cf26d45455a43a5b8bb276a403b39",
        },
        Vector {
            password: b"passwordPASSWORDpassword",
            salt: b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
            iterations: 4096,
            expected: "3d2eec4fe41c849b80c8d83662c0e44a8b291a964cf2f07038",
        },
        Vector {
            password: b"pass\0word",
            salt: b"sa\0lt",
            iterations: 4096,
            expected: "56fa6aa75548099dcc37d7f03425e0c3",
        },
    ];

    #[test]
    fn known_answers() {
        for vector in VECTORS.iter() {
            let expected = hex::decode(vector.expected).unwrap();
            let key = pbkdf2_hmac_sha1(
                vector.password,
                vector.salt,
                vector.iterations,
                expected.len(),
            )
            .unwrap();
            assert_eq!(
                key.as_slice(),
                expected.as_slice(),
                "{} iterations over {:?}",
                vector.iterations,
                vector.salt
            );
        }
    }

    #[test]
    fn zero_iterations_is_rejected() {
        assert!(pbkdf2_hmac_sha1(b"password", b"salt", 0, 16).is_err());
    }
}
