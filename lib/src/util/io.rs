use std::io::{self, Read, Seek, SeekFrom, Write};

use binrw::{BinRead, BinResult, BinWrite, Endian};

/// Upper bound for preallocating lists whose length comes from untrusted input.
const MAX_PREALLOCATE: usize = 4096;

/// Number of bytes between the current position and the end of the stream.
///
/// The stream position is left unchanged.
pub fn bytes_remaining<R>(reader: &mut R) -> io::Result<u64>
where R: Seek + ?Sized {
    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    if end != pos {
        reader.seek(SeekFrom::Start(pos))?;
    }
    Ok(end.saturating_sub(pos))
}

#[inline]
pub fn has_remaining<R>(reader: &mut R) -> io::Result<bool>
where R: Seek + ?Sized {
    Ok(bytes_remaining(reader)? > 0)
}

/// Reads `count` little-endian records back to back.
pub fn read_list<T, R>(reader: &mut R, count: usize) -> BinResult<Vec<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
    R: Read + Seek,
{
    let mut out = Vec::with_capacity(count.min(MAX_PREALLOCATE));
    for _ in 0..count {
        out.push(T::read_options(reader, Endian::Little, ())?);
    }
    Ok(out)
}

/// Writes records back to back, little-endian.
pub fn write_list<'i, T, W, I>(writer: &mut W, items: I) -> BinResult<()>
where
    T: for<'a> BinWrite<Args<'a> = ()> + 'i,
    W: Write + Seek,
    I: IntoIterator<Item = &'i T>,
{
    for item in items {
        item.write_options(writer, Endian::Little, ())?;
    }
    Ok(())
}
