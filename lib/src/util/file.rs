use std::{
    fs::File,
    io::{BufWriter, Cursor},
    path::Path,
};

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};

/// Opens a memory mapped file.
pub fn map_file<P: AsRef<Path>>(path: P) -> Result<Mmap> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open file '{}'", path.as_ref().display()))?;
    let map = unsafe { MmapOptions::new().map(&file) }
        .with_context(|| format!("Failed to mmap file: '{}'", path.as_ref().display()))?;
    Ok(map)
}

/// Opens a memory mapped file as a seekable reader.
pub fn map_reader<P: AsRef<Path>>(path: P) -> Result<Cursor<Mmap>> {
    Ok(Cursor::new(map_file(path)?))
}

/// Creates (or truncates) a file for buffered writing.
pub fn create_file<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file '{}'", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}
