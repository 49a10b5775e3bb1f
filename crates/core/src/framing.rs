//! Category record framing.
//!
//! After the info header, an SII image is a stream of category records,
//! each carrying one payload tagged with its category type:
//!
//! # Record Format
//!
//! ```text
//! +--------------------+
//! | tag (2)            |  u16 little-endian category type
//! +--------------------+
//! | len_in_words (2)   |  u16 payload length in 16-bit words
//! +--------------------+
//! | payload            |  len_in_words * 2 bytes
//! | (variable)         |
//! +--------------------+
//! ...
//! +--------------------+
//! | 0xFFFF  | 0xFFFF   |  terminator
//! +--------------------+
//! ```
//!
//! # Payload Isolation
//!
//! Every payload is copied into its own buffer and decoded from a fresh
//! reader over that buffer, so a decoder that stops early or runs short can
//! never shift the framing of the records that follow. Leftover bytes are
//! checked per category: the table categories tolerate one trailing pad
//! byte, everything else must be consumed exactly.
//!
//! Encoded payloads of odd length are padded with one zero byte so the word
//! count is always exact.

use std::fmt;
use std::io::{Read, Write};

use log::trace;

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CategoryError, Result};
use crate::node::Node;
use crate::schema;

/// Category type terminating the record stream.
pub const END_TAG: u16 = 0xFFFF;

/// Size of a record header in bytes.
pub const HEADER_LEN: usize = 4;

/// Category types with a known payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CategoryType {
    Strings = 10,
    General = 30,
    Fmmu = 40,
    SyncM = 41,
    FmmuEx = 42,
    SyncUnit = 43,
    TxPdo = 50,
    RxPdo = 51,
    Dc = 60,
}

impl CategoryType {
    /// Order in which present categories are written back out.
    pub const EMISSION_ORDER: [CategoryType; 9] = [
        CategoryType::Strings,
        CategoryType::General,
        CategoryType::Fmmu,
        CategoryType::SyncM,
        CategoryType::FmmuEx,
        CategoryType::SyncUnit,
        CategoryType::TxPdo,
        CategoryType::RxPdo,
        CategoryType::Dc,
    ];

    /// Look up a tag; `None` for tags that pass through undecoded.
    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::EMISSION_ORDER.into_iter().find(|c| c.tag() == tag)
    }

    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Human-readable name used in log lines and error messages.
    pub fn name(self) -> &'static str {
        match self {
            CategoryType::Strings => "Strings",
            CategoryType::General => "General",
            CategoryType::Fmmu => "FMMU",
            CategoryType::SyncM => "SyncM",
            CategoryType::FmmuEx => "FMMUX",
            CategoryType::SyncUnit => "SyncUnit",
            CategoryType::TxPdo => "TxPDO",
            CategoryType::RxPdo => "RxPDO",
            CategoryType::Dc => "DC",
        }
    }

    /// Key addressing this category in document paths (`"syncm.0.length"`).
    pub fn key(self) -> &'static str {
        match self {
            CategoryType::Strings => "strings",
            CategoryType::General => "general",
            CategoryType::Fmmu => "fmmu",
            CategoryType::SyncM => "syncm",
            CategoryType::FmmuEx => "fmmux",
            CategoryType::SyncUnit => "sync_unit",
            CategoryType::TxPdo => "txpdo",
            CategoryType::RxPdo => "rxpdo",
            CategoryType::Dc => "dc",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::EMISSION_ORDER.into_iter().find(|c| c.key() == key)
    }

    /// Fresh, empty payload tree for this category.
    pub fn schema(self) -> Result<Node> {
        match self {
            CategoryType::Strings => schema::strings(),
            CategoryType::General => schema::general(),
            CategoryType::Fmmu => schema::fmmu(),
            CategoryType::SyncM => schema::syncm(),
            CategoryType::FmmuEx => schema::fmmu_ex(),
            CategoryType::SyncUnit | CategoryType::TxPdo | CategoryType::RxPdo => schema::opaque(),
            CategoryType::Dc => schema::dc(),
        }
    }

    /// Number of unconsumed trailing bytes tolerated after decoding.
    pub fn pad_tolerance(self) -> usize {
        match self {
            CategoryType::Strings
            | CategoryType::Fmmu
            | CategoryType::FmmuEx
            | CategoryType::SyncM => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tag and length preceding a category payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryHeader {
    pub tag: u16,
    pub len_words: u16,
}

impl CategoryHeader {
    /// Header announcing the end of the category stream.
    pub const END: CategoryHeader = CategoryHeader {
        tag: END_TAG,
        len_words: 0xFFFF,
    };

    pub fn read<R: Read>(reader: &mut BitReader<R>) -> Result<Self> {
        let mut node = schema::category_header()?;
        node.decode(reader)?;
        // Both fields are 16 bits wide, so the casts are lossless.
        Ok(Self {
            tag: node.at("category_type")?.value()? as u16,
            len_words: node.at("len_in_words")?.value()? as u16,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        let mut node = schema::category_header()?;
        node.at_mut("category_type")?.set_value(u64::from(self.tag))?;
        node.at_mut("len_in_words")?.set_value(u64::from(self.len_words))?;
        node.encode(writer)
    }

    pub fn is_end(&self) -> bool {
        self.tag == END_TAG
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> usize {
        usize::from(self.len_words) * 2
    }
}

/// Decode one category payload from its isolated buffer.
///
/// # Errors
/// - `CategoryError::Malformed` if more bytes remain unconsumed than the
///   category tolerates
/// - Any error raised by the payload decoder
///
/// All errors are wrapped with the category name and tag.
pub fn decode_payload(category: CategoryType, payload: &[u8]) -> Result<Node> {
    decode_isolated(category, payload).map_err(|e| e.in_category(category.name(), category.tag()))
}

fn decode_isolated(category: CategoryType, payload: &[u8]) -> Result<Node> {
    let mut node = category.schema()?;
    let mut reader = BitReader::new(payload);
    node.decode(&mut reader)?;

    let leftover = reader.get_ref().len();
    let allowed = category.pad_tolerance();
    if leftover > allowed {
        return Err(CategoryError::Malformed {
            category: category.name(),
            leftover,
            allowed,
        }
        .into());
    }
    if leftover > 0 {
        trace!("{category}: skipped {leftover} trailing pad byte(s)");
    }
    Ok(node)
}

/// Encode one category payload, without framing or padding.
pub fn encode_payload(category: CategoryType, node: &Node) -> Result<Vec<u8>> {
    node.to_bytes()
        .map_err(|e| e.in_category(category.name(), category.tag()))
}

/// Write a framed category record, padding an odd payload with one zero byte.
///
/// # Errors
/// Returns `CategoryError::PayloadTooLong` if the padded payload does not
/// fit a 16-bit word count.
pub fn write_category<W: Write>(writer: &mut BitWriter<W>, tag: u16, payload: &[u8]) -> Result<()> {
    let padded_len = payload.len() + payload.len() % 2;
    let len_words = u16::try_from(padded_len / 2).map_err(|_| CategoryError::PayloadTooLong {
        tag,
        len: payload.len(),
    })?;

    CategoryHeader { tag, len_words }.write(writer)?;
    writer.write_bytes(payload)?;
    if padded_len > payload.len() {
        writer.write_bytes(&[0])?;
    }
    Ok(())
}

/// Write the stream terminator.
pub fn write_end<W: Write>(writer: &mut BitWriter<W>) -> Result<()> {
    CategoryHeader::END.write(writer)
}
