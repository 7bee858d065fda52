//! Serialization of executable images into the LMCX binary format.
//!
//! The on-disk layout is, in order:
//! - a magic string: `LMCX` for standard images, `LMCXTENDED` for images
//!   carrying a non-zero extension version;
//! - for extended images only, the extension version as one little-endian
//!   `u16`;
//! - the payload: every machine word as a little-endian `u16`.
//!
//! All multi-byte values are little-endian regardless of host byte order,
//! so images are portable across machines.

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{Read as _, Write as _};
use std::path::Path;

use super::Executable;

const MAGIC: &[u8] = b"LMCX";
const MAGIC_EXTENDED: &[u8] = b"LMCXTENDED";

/// Error from decoding LMCX data.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FormatErr {
    /// The data does not start with a recognized magic string.
    BadMagic,
    /// The data ends before the declared content does.
    Truncated,
}
impl std::fmt::Display for FormatErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatErr::BadMagic  => f.write_str("not an LMC executable (bad magic)"),
            FormatErr::Truncated => f.write_str("executable data is truncated"),
        }
    }
}
impl std::error::Error for FormatErr {}
impl crate::err::Error for FormatErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            FormatErr::BadMagic => Some("LMC executables start with \"LMCX\" or \"LMCXTENDED\"".into()),
            FormatErr::Truncated => None,
        }
    }
}

/// Error from reading or writing an executable file.
#[derive(Debug)]
pub enum FileErr {
    /// The file could not be accessed.
    Io(std::io::Error),
    /// The file's content is not valid LMCX data.
    Format(FormatErr),
    /// The destination file already exists and overwriting was not permitted.
    AlreadyExists(std::path::PathBuf),
}
impl std::fmt::Display for FileErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileErr::Io(e) => e.fmt(f),
            FileErr::Format(e) => e.fmt(f),
            FileErr::AlreadyExists(p) => write!(f, "{} already exists", p.display()),
        }
    }
}
impl std::error::Error for FileErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileErr::Io(e) => Some(e),
            FileErr::Format(e) => Some(e),
            FileErr::AlreadyExists(_) => None,
        }
    }
}
impl crate::err::Error for FileErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            FileErr::Format(e) => e.help(),
            FileErr::AlreadyExists(_) => Some("pass the overwrite flag to replace it".into()),
            FileErr::Io(_) => None,
        }
    }
}
impl From<std::io::Error> for FileErr {
    fn from(e: std::io::Error) -> Self {
        FileErr::Io(e)
    }
}
impl From<FormatErr> for FileErr {
    fn from(e: FormatErr) -> Self {
        FileErr::Format(e)
    }
}

/// Takes a fixed-length prefix off the front of a byte slice,
/// advancing the slice past it.
fn take_prefix<'a>(data: &mut &'a [u8], n: usize) -> Result<&'a [u8], FormatErr> {
    if data.len() < n {
        return Err(FormatErr::Truncated);
    }
    let (taken, rest) = data.split_at(n);
    *data = rest;
    Ok(taken)
}

fn take_u16(data: &mut &[u8]) -> Result<u16, FormatErr> {
    let bytes = take_prefix(data, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

impl Executable {
    /// Serializes this image into LMCX bytes.
    ///
    /// The extended header is emitted iff the extension version is non-zero.
    pub fn write_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(MAGIC_EXTENDED.len() + 2 + 2 * self.len());

        match self.ext_version() {
            0 => data.extend_from_slice(MAGIC),
            v => {
                data.extend_from_slice(MAGIC_EXTENDED);
                data.extend_from_slice(&v.to_le_bytes());
            },
        }
        for &word in self.words() {
            data.extend_from_slice(&word.to_le_bytes());
        }

        data
    }

    /// Deserializes an image from LMCX bytes.
    ///
    /// The payload length is taken from the data itself: everything past
    /// the header is words. An odd number of payload bytes means the last
    /// word was cut short and is an error, as is an unrecognized magic.
    pub fn read_bytes(mut data: &[u8]) -> Result<Executable, FormatErr> {
        // The extended magic shares a prefix with the standard one,
        // so it has to be tried first.
        let ext_version = if data.starts_with(MAGIC_EXTENDED) {
            take_prefix(&mut data, MAGIC_EXTENDED.len())?;
            take_u16(&mut data)?
        } else if data.starts_with(MAGIC) {
            take_prefix(&mut data, MAGIC.len())?;
            0
        } else {
            return Err(FormatErr::BadMagic);
        };

        if data.len() % 2 != 0 {
            return Err(FormatErr::Truncated);
        }
        let mut words = Vec::with_capacity(data.len() / 2);
        while !data.is_empty() {
            words.push(take_u16(&mut data)?);
        }

        Ok(Executable::new_extended(words, ext_version))
    }

    /// Writes this image to a file.
    ///
    /// If `overwrite` is false and the file already exists, this fails with
    /// [`FileErr::AlreadyExists`] without touching it; otherwise any
    /// existing content is truncated.
    pub fn write_file(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<(), FileErr> {
        let path = path.as_ref();

        let mut open = OpenOptions::new();
        open.write(true);
        match overwrite {
            true  => open.create(true).truncate(true),
            false => open.create_new(true),
        };

        let mut f = open.open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => FileErr::AlreadyExists(path.to_path_buf()),
            _ => FileErr::Io(e),
        })?;
        f.write_all(&self.write_bytes())?;
        Ok(())
    }

    /// Reads an image from a file.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Executable, FileErr> {
        let mut data = vec![];
        std::fs::File::open(path)?.read_to_end(&mut data)?;
        Ok(Executable::read_bytes(&data)?)
    }
}
