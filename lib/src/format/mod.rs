pub mod ms3d;

use std::{
    fmt::{Debug, Display, Formatter},
    io::{Read, Seek, Write},
};

use binrw::{BinRead, BinResult, BinWrite, Endian};

/// Encodes text one byte per character (Latin-1). Anything outside
/// Latin-1 becomes `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect()
}

#[inline]
pub fn decode_latin1(bytes: &[u8]) -> String { bytes.iter().map(|&b| char::from(b)).collect() }

/// Fixed-size, zero-padded string field of exactly `N` bytes.
///
/// Decoding is tolerant of the garbage real files leave in name fields.
/// Bytes 32..=255 are literal characters. If the field holds a null byte
/// anywhere, the string ends at the first byte below 32. Without any null
/// byte the whole field is kept and control bytes become spaces.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
pub struct FixedString<const N: usize>(pub String);

impl<const N: usize> FixedString<N> {
    pub fn new(text: &str) -> Self { Self(text.to_owned()) }

    pub fn decode(bytes: &[u8; N]) -> Self {
        let terminated = bytes.contains(&0);
        let mut text = String::with_capacity(N);
        for &b in bytes {
            if b >= 32 {
                text.push(char::from(b));
            } else if terminated {
                break;
            } else {
                text.push(' ');
            }
        }
        Self(text)
    }

    pub fn encode(&self) -> [u8; N] {
        let mut out = [0u8; N];
        for (dst, src) in out.iter_mut().zip(encode_latin1(&self.0)) {
            *dst = src;
        }
        out
    }

    #[inline]
    pub fn into_string(self) -> String { self.0 }
}

impl<const N: usize> BinRead for FixedString<N> {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let mut buf = [0u8; N];
        reader.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }
}

impl<const N: usize> BinWrite for FixedString<N> {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}

impl<const N: usize> Display for FixedString<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl<const N: usize> Debug for FixedString<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(&self.0, f) }
}

/// String stored as a `u32` byte length followed by the raw bytes.
///
/// Bytes map to characters one to one, so the text round-trips exactly.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
pub struct PrefixedString(pub String);

impl PrefixedString {
    pub fn new(text: &str) -> Self { Self(text.to_owned()) }

    #[inline]
    pub fn into_string(self) -> String { self.0 }
}

impl BinRead for PrefixedString {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let length = u32::read_options(reader, endian, ())?;
        // Read through `take` so a bogus length can't force a huge allocation
        let mut bytes = Vec::new();
        reader.by_ref().take(u64::from(length)).read_to_end(&mut bytes)?;
        if bytes.len() < length as usize {
            return Err(binrw::Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(Self(decode_latin1(&bytes)))
    }
}

impl BinWrite for PrefixedString {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let bytes = encode_latin1(&self.0);
        let length: u32 = bytes.len().try_into().map_err(|_| binrw::Error::AssertFail {
            pos: writer.stream_position().unwrap_or_default(),
            message: format!("String of {} bytes is too long", bytes.len()),
        })?;
        length.write_options(writer, endian, ())?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

impl Display for PrefixedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl Debug for PrefixedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(&self.0, f) }
}
