use crate::{
    kadm5::{FieldMask, KeyData, KeySalt, Password, PrincipalEntry, TlData},
    Enctype, Keyblock, NameType, Principal,
};
use nom::{
    combinator::{cond, map, map_res},
    error::{Error as NomError, ErrorKind},
    multi::{count, length_data},
    number::complete::{be_i32, be_u32},
    sequence::tuple,
    Err as NomErr, IResult,
};
use std::str;

/// Why a request payload could not be decoded. Either way the request gets a
/// single decode status and nothing past the failing field is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("truncated {field}")]
    Truncated { field: &'static str },
    #[error("malformed {field}")]
    Malformed { field: &'static str },
}

impl WireError {
    fn from_nom(field: &'static str, err: NomErr<NomError<&[u8]>>) -> Self {
        match err {
            NomErr::Incomplete(_) => Self::Truncated { field },
            NomErr::Error(e) | NomErr::Failure(e) if e.code == ErrorKind::Eof => Self::Truncated { field },
            NomErr::Error(_) | NomErr::Failure(_) => Self::Malformed { field },
        }
    }
}

type ParseResult<'a, T> = IResult<&'a [u8], T>;

fn data(input: &[u8]) -> ParseResult<&[u8]> {
    length_data(be_u32)(input)
}

fn string(input: &[u8]) -> ParseResult<&str> {
    map_res(data, str::from_utf8)(input)
}

// Every counted element takes at least four bytes, so a count larger than
// that is refused before anything is allocated for it.
fn element_count(input: &[u8]) -> ParseResult<usize> {
    let (rest, n) = be_u32(input)?;
    let n = n as usize;
    if n > rest.len() / 4 {
        return Err(NomErr::Error(NomError::new(input, ErrorKind::TooLarge)));
    }
    Ok((rest, n))
}

fn optional<'a, T, F>(mut parser: F) -> impl FnMut(&'a [u8]) -> ParseResult<'a, Option<T>>
where
    F: FnMut(&'a [u8]) -> ParseResult<'a, T>,
{
    move |input: &'a [u8]| {
        let (input, present) = be_i32(input)?;
        cond(present != 0, &mut parser)(input)
    }
}

fn principal(input: &[u8]) -> ParseResult<Principal> {
    let (input, name_type) = be_i32(input)?;
    let (input, n) = element_count(input)?;
    let (input, realm) = data(input)?;
    let (input, components) = count(data, n)(input)?;
    let principal = Principal {
        realm: realm.to_vec(),
        components: components.into_iter().map(<[u8]>::to_vec).collect(),
        name_type: NameType(name_type),
    };
    Ok((input, principal))
}

fn keyblock(input: &[u8]) -> ParseResult<Keyblock> {
    map(tuple((be_i32, data)), |(enctype, contents)| {
        Keyblock::new(Enctype(enctype), contents.to_vec())
    })(input)
}

// key data ::=
//     version (32 bits)
//     kvno (32 bits)
//     key (keyblock)
//     salt type (32 bits)
//     salt (data)
fn key_data(input: &[u8]) -> ParseResult<KeyData> {
    let (input, (ver, kvno, key)) = tuple((be_i32, be_u32, keyblock))(input)?;
    let (input, (salt_type, salt)) = tuple((be_i32, data))(input)?;
    let key_data = KeyData {
        ver,
        kvno,
        key,
        salt: KeySalt {
            salt_type,
            value: salt.to_vec(),
        },
    };
    Ok((input, key_data))
}

fn tl_data(input: &[u8]) -> ParseResult<TlData> {
    map(tuple((be_i32, data)), |(tl_type, contents)| TlData {
        tl_type,
        contents: contents.to_vec(),
    })(input)
}

fn counted<'a, T, F>(mut parser: F) -> impl FnMut(&'a [u8]) -> ParseResult<'a, Vec<T>>
where
    F: FnMut(&'a [u8]) -> ParseResult<'a, T>,
{
    move |input: &'a [u8]| {
        let (input, n) = element_count(input)?;
        count(&mut parser, n)(input)
    }
}

/// A cursor over one request or response payload.
pub struct Decoder<'a> {
    input: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn run<T, F>(&mut self, field: &'static str, mut parser: F) -> Result<T, WireError>
    where
        F: FnMut(&'a [u8]) -> ParseResult<'a, T>,
    {
        let (rest, value) = parser(self.input).map_err(|e| WireError::from_nom(field, e))?;
        self.input = rest;
        Ok(value)
    }

    pub fn int32(&mut self, field: &'static str) -> Result<i32, WireError> {
        self.run(field, be_i32)
    }

    pub fn mask(&mut self) -> Result<FieldMask, WireError> {
        self.run("mask", be_u32).map(FieldMask)
    }

    pub fn string(&mut self, field: &'static str) -> Result<String, WireError> {
        self.run(field, string).map(str::to_owned)
    }

    pub fn optional_string(&mut self, field: &'static str) -> Result<Option<String>, WireError> {
        self.run(field, optional(string))
            .map(|s| s.map(str::to_owned))
    }

    pub fn password(&mut self) -> Result<Password, WireError> {
        self.run("password", data).map(Password::new)
    }

    pub fn principal(&mut self, field: &'static str) -> Result<Principal, WireError> {
        self.run(field, principal)
    }

    // principal entry ::=
    //     principal
    //     princ_expire_time, pw_expiration, last_pwd_change, max_life (32 bits each)
    //     mod_name (optional principal)
    //     mod_date, attributes, kvno, mkvno (32 bits each)
    //     policy (optional data)
    //     aux_attributes, max_renewable_life, last_success, last_failed,
    //     fail_auth_count (32 bits each)
    //     key data (count, key data...)
    //     tl data (count, tl data...)
    pub fn principal_entry(&mut self) -> Result<PrincipalEntry, WireError> {
        let name = self.principal("principal")?;
        let princ_expire_time = self.int32("princ_expire_time")?;
        let pw_expiration = self.int32("pw_expiration")?;
        let last_pwd_change = self.int32("last_pwd_change")?;
        let max_life = self.int32("max_life")?;
        let mod_name = self.run("mod_name", optional(principal))?;
        let mod_date = self.int32("mod_date")?;
        let attributes = self.int32("attributes")?;
        let kvno = self.run("kvno", be_u32)?;
        let mkvno = self.run("mkvno", be_u32)?;
        let policy = self.optional_string("policy")?;
        let aux_attributes = self.int32("aux_attributes")?;
        let max_renewable_life = self.int32("max_renewable_life")?;
        let last_success = self.int32("last_success")?;
        let last_failed = self.int32("last_failed")?;
        let fail_auth_count = self.int32("fail_auth_count")?;
        let key_data = self.run("key_data", counted(key_data))?;
        let tl_data = self.run("tl_data", counted(tl_data))?;
        Ok(PrincipalEntry {
            principal: name,
            princ_expire_time,
            pw_expiration,
            last_pwd_change,
            max_life,
            mod_name,
            mod_date,
            attributes,
            kvno,
            mkvno,
            policy,
            aux_attributes,
            max_renewable_life,
            last_success,
            last_failed,
            fail_auth_count,
            key_data,
            tl_data,
        })
    }

    pub fn keyblocks(&mut self) -> Result<Vec<Keyblock>, WireError> {
        self.run("keys", counted(keyblock))
    }

    pub fn strings(&mut self) -> Result<Vec<String>, WireError> {
        self.run("names", counted(string))
            .map(|names| names.into_iter().map(str::to_owned).collect())
    }
}
