//! Compressing writers for day archives.

use flate2::write::GzEncoder;
use std::io::{self, Write};

/// Compression type, parsed from its configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Parses `NONE`, `GZIP` or `Zstandard`; anything else means no compression.
    pub fn from_name(name: &str) -> Self {
        match name {
            "GZIP" => Self::Gzip,
            "Zstandard" => Self::Zstd,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Gzip => "GZIP",
            Self::Zstd => "Zstandard",
        }
    }
}

/// Compression level, parsed from its configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    No,
    BestSpeed,
    #[default]
    Default,
    BestCompression,
    HuffmanOnly,
}

impl CompressionLevel {
    /// Parses a level name; unrecognized names fall back to `Default`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "No" => Self::No,
            "BestSpeed" => Self::BestSpeed,
            "BestCompression" => Self::BestCompression,
            "HuffmanOnly" => Self::HuffmanOnly,
            _ => Self::Default,
        }
    }

    // flate2 has no Huffman-only mode; the fastest preset is the closest.
    fn gzip(self) -> flate2::Compression {
        match self {
            Self::No => flate2::Compression::none(),
            Self::BestSpeed | Self::HuffmanOnly => flate2::Compression::fast(),
            Self::Default => flate2::Compression::default(),
            Self::BestCompression => flate2::Compression::best(),
        }
    }

    fn zstd(self) -> i32 {
        match self {
            Self::No | Self::BestSpeed => 1,
            Self::Default | Self::HuffmanOnly => zstd::DEFAULT_COMPRESSION_LEVEL,
            Self::BestCompression => 19,
        }
    }
}

/// A writer that must be explicitly finished.
///
/// `close` finalizes the stream (gzip and zstd write their trailers here) and
/// flushes into the wrapped writer. It never closes the wrapped writer; that
/// stays with the caller.
pub trait WriteCloser: Write + Send {
    fn close(self: Box<Self>) -> io::Result<()>;
}

struct Passthrough<W: Write + Send>(W);

impl<W: Write + Send> Write for Passthrough<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Send> WriteCloser for Passthrough<W> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Send> WriteCloser for GzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.flush()
    }
}

impl<W: Write + Send> WriteCloser for zstd::stream::write::Encoder<'static, W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.flush()
    }
}

/// Selected compression for day archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionStrategy {
    #[default]
    None,
    Gzip(CompressionLevel),
    Zstd(CompressionLevel),
}

impl CompressionStrategy {
    /// Picks the strategy. Disabled compression is always `None`,
    /// whatever the kind.
    pub fn new(enabled: bool, kind: Compression, level: CompressionLevel) -> Self {
        if !enabled {
            return Self::None;
        }
        match kind {
            Compression::None => Self::None,
            Compression::Gzip => Self::Gzip(level),
            Compression::Zstd => Self::Zstd(level),
        }
    }

    /// Wraps `writer` in a compressing writer.
    pub fn create<'a, W>(&self, writer: W) -> io::Result<Box<dyn WriteCloser + 'a>>
    where
        W: Write + Send + 'a,
    {
        let wrapped: Box<dyn WriteCloser + 'a> = match *self {
            Self::None => Box::new(Passthrough(writer)),
            Self::Gzip(level) => Box::new(GzEncoder::new(writer, level.gzip())),
            Self::Zstd(level) => Box::new(zstd::stream::write::Encoder::new(writer, level.zstd())?),
        };
        Ok(wrapped)
    }

    /// File name carrying the compression's extension.
    pub fn filename(&self, original: &str) -> String {
        match self {
            Self::None => original.to_string(),
            Self::Gzip(_) => format!("{original}.gz"),
            Self::Zstd(_) => format!("{original}.zst"),
        }
    }
}
