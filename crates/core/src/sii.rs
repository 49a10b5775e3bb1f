//! The SII document: info header, category payloads and string bookkeeping.
//!
//! Decoding reads the fixed info header, then category records until the
//! terminator. Known categories are decoded into their schema trees; all
//! other tags are kept as raw bytes and written back unchanged, after the
//! known categories, in the order they were read.
//!
//! Known categories are always written in [`CategoryType::EMISSION_ORDER`],
//! so a re-encoded image can differ from its source in category order while
//! holding the same content.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, warn};

use crate::bitio::{BitReader, BitWriter};
use crate::composite::Sequence;
use crate::error::{Error, Result, ValueError};
use crate::framing::{self, CategoryHeader, CategoryType};
use crate::node::Node;
use crate::scalar::StrNode;
use crate::schema;

/// Number of leading info header bytes covered by the checksum.
pub const CHECKSUM_COVERAGE: usize = 14;

const CRC8_POLY: u8 = 0x07;
const CRC8_INIT: u8 = 0xFF;

/// A category whose tag has no known layout, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory {
    pub tag: u16,
    pub data: Vec<u8>,
}

/// String-table references held by the general category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralString {
    Name,
    Group,
    Order,
    Image,
}

impl GeneralString {
    /// Visiting order used when the string table is rebuilt.
    pub const COMPACTION_ORDER: [GeneralString; 4] = [
        GeneralString::Name,
        GeneralString::Group,
        GeneralString::Order,
        GeneralString::Image,
    ];

    /// Field of the general category holding the 1-based table index.
    pub fn index_field(self) -> &'static str {
        match self {
            GeneralString::Name => "name_idx",
            GeneralString::Group => "group_idx",
            GeneralString::Order => "order_idx",
            GeneralString::Image => "img_idx",
        }
    }
}

/// A decoded SII image.
///
/// `info` is `None` only for a document built with [`Sii::new`]; such a
/// document cannot be encoded until an info header is supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sii {
    pub info: Option<Node>,
    pub strings: Option<Node>,
    pub general: Option<Node>,
    pub fmmu: Option<Node>,
    pub syncm: Option<Node>,
    pub fmmux: Option<Node>,
    pub sync_unit: Option<Node>,
    pub txpdo: Option<Node>,
    pub rxpdo: Option<Node>,
    pub dc: Option<Node>,
    pub unknown: Vec<UnknownCategory>,
}

impl Sii {
    /// Empty document without an info header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with a zeroed info header and no categories.
    pub fn with_info() -> Result<Self> {
        Ok(Self {
            info: Some(schema::info_structure()?),
            ..Self::default()
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(bytes)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Decode a complete image from a byte source.
    ///
    /// # Errors
    /// - `BitIoError::OutOfData` if the source ends before the terminator
    /// - `CategoryError::Malformed` if a known payload leaves stray bytes
    /// - Any payload decode error, wrapped with its category and field
    pub fn read_from<R: Read>(source: R) -> Result<Self> {
        let mut reader = BitReader::new(source);

        let mut info = schema::info_structure()?;
        info.decode(&mut reader).map_err(|e| e.in_field("info"))?;
        let mut sii = Self {
            info: Some(info),
            ..Self::default()
        };

        loop {
            let header = CategoryHeader::read(&mut reader).map_err(|e| e.in_field("category header"))?;
            if header.is_end() {
                break;
            }

            let category = CategoryType::from_tag(header.tag);
            let name = category.map_or("unknown", CategoryType::name);
            let payload = reader
                .read_bytes(header.payload_len())
                .map_err(|e| e.in_category(name, header.tag))?;

            match category {
                Some(category) => {
                    debug!(
                        "decoding {category} category (tag {:#06x}, {} bytes)",
                        header.tag,
                        payload.len()
                    );
                    let node = framing::decode_payload(category, &payload)?;
                    let slot = sii.slot_mut(category);
                    if slot.is_some() {
                        warn!("duplicate {category} category (tag {:#06x}), keeping the later one", header.tag);
                    }
                    *slot = Some(node);
                }
                None => {
                    debug!(
                        "passing through category {:#06x} ({} bytes)",
                        header.tag,
                        payload.len()
                    );
                    sii.unknown.push(UnknownCategory {
                        tag: header.tag,
                        data: payload,
                    });
                }
            }
        }

        Ok(sii)
    }

    /// Encode the document to a byte sink.
    ///
    /// Present known categories are written in canonical order, followed by
    /// the passthrough categories and the terminator.
    ///
    /// # Errors
    /// - `Error::Precondition` if the document has no info header
    /// - Any encode error, wrapped with its category and field
    pub fn write_to<W: Write>(&self, sink: W) -> Result<()> {
        let info = self
            .info
            .as_ref()
            .ok_or(Error::Precondition("document has no info header"))?;

        let mut writer = BitWriter::new(sink);
        info.encode(&mut writer).map_err(|e| e.in_field("info"))?;

        for category in CategoryType::EMISSION_ORDER {
            if let Some(node) = self.category(category) {
                let payload = framing::encode_payload(category, node)?;
                debug!(
                    "encoding {category} category (tag {:#06x}, {} bytes)",
                    category.tag(),
                    payload.len()
                );
                framing::write_category(&mut writer, category.tag(), &payload)
                    .map_err(|e| e.in_category(category.name(), category.tag()))?;
            }
        }

        for unknown in &self.unknown {
            debug!(
                "passing through category {:#06x} ({} bytes)",
                unknown.tag,
                unknown.data.len()
            );
            framing::write_category(&mut writer, unknown.tag, &unknown.data)
                .map_err(|e| e.in_category("unknown", unknown.tag))?;
        }

        framing::write_end(&mut writer)?;
        writer.flush()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }

    /// Decoded payload of a known category, if present.
    pub fn category(&self, category: CategoryType) -> Option<&Node> {
        match category {
            CategoryType::Strings => self.strings.as_ref(),
            CategoryType::General => self.general.as_ref(),
            CategoryType::Fmmu => self.fmmu.as_ref(),
            CategoryType::SyncM => self.syncm.as_ref(),
            CategoryType::FmmuEx => self.fmmux.as_ref(),
            CategoryType::SyncUnit => self.sync_unit.as_ref(),
            CategoryType::TxPdo => self.txpdo.as_ref(),
            CategoryType::RxPdo => self.rxpdo.as_ref(),
            CategoryType::Dc => self.dc.as_ref(),
        }
    }

    pub fn category_mut(&mut self, category: CategoryType) -> Option<&mut Node> {
        self.slot_mut(category).as_mut()
    }

    fn slot_mut(&mut self, category: CategoryType) -> &mut Option<Node> {
        match category {
            CategoryType::Strings => &mut self.strings,
            CategoryType::General => &mut self.general,
            CategoryType::Fmmu => &mut self.fmmu,
            CategoryType::SyncM => &mut self.syncm,
            CategoryType::FmmuEx => &mut self.fmmux,
            CategoryType::SyncUnit => &mut self.sync_unit,
            CategoryType::TxPdo => &mut self.txpdo,
            CategoryType::RxPdo => &mut self.rxpdo,
            CategoryType::Dc => &mut self.dc,
        }
    }

    /// Node addressed by a dotted path whose first segment is `info` or a
    /// category key, e.g. `"info.id.vendor_id"` or `"syncm.0.length"`.
    ///
    /// # Errors
    /// Returns `ValueError::FieldNotFound` if any segment does not resolve,
    /// including a category that is absent from the document.
    pub fn field(&self, path: &str) -> Result<&Node> {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        let root = match head {
            "info" => self.info.as_ref(),
            key => CategoryType::from_key(key).and_then(|c| self.category(c)),
        };
        root.ok_or_else(|| ValueError::FieldNotFound(head.to_string()))?
            .at(rest)
    }

    pub fn field_mut(&mut self, path: &str) -> Result<&mut Node> {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        let root = match head {
            "info" => self.info.as_mut(),
            key => match CategoryType::from_key(key) {
                Some(category) => self.category_mut(category),
                None => None,
            },
        };
        root.ok_or_else(|| ValueError::FieldNotFound(head.to_string()))?
            .at_mut(rest)
    }

    /// String referenced by one of the general category's index fields.
    ///
    /// `None` when the general category or string table is missing, the
    /// index is zero, or it points past the end of the table.
    pub fn general_string(&self, which: GeneralString) -> Option<Cow<'_, str>> {
        let index = self.general.as_ref()?.at(which.index_field()).ok()?.value().ok()?;
        let index = usize::try_from(index).ok()?.checked_sub(1)?;
        let entry = self.strings.as_ref()?.as_sequence()?.get(index)?;
        Some(entry.as_str()?.text())
    }

    pub fn general_name(&self) -> Option<Cow<'_, str>> {
        self.general_string(GeneralString::Name)
    }

    pub fn general_group(&self) -> Option<Cow<'_, str>> {
        self.general_string(GeneralString::Group)
    }

    pub fn general_order(&self) -> Option<Cow<'_, str>> {
        self.general_string(GeneralString::Order)
    }

    pub fn general_image(&self) -> Option<Cow<'_, str>> {
        self.general_string(GeneralString::Image)
    }

    /// Point one of the general category's string references at `text`.
    ///
    /// The string is appended to the table (created if absent), the index
    /// is pointed at it, and the table is compacted.
    ///
    /// # Errors
    /// - `Error::Precondition` if there is no general category
    /// - `ValueError::StringTooLong` if `text` exceeds 255 bytes
    /// - lookup errors if `general` lacks the index fields
    ///
    /// On error the document is unchanged.
    pub fn set_general_string(&mut self, which: GeneralString, text: &str) -> Result<()> {
        if self.general.is_none() {
            return Err(Error::Precondition("document has no general category"));
        }
        let entry = StrNode::from_text(text)?;

        // A failed append or compaction leaves the document as it was
        let saved = (self.strings.clone(), self.general.clone());
        let result = self.strings_table_mut().and_then(|table| {
            table.push(entry.into());
            Ok(table.len())
        });
        let result = result.and_then(|appended| self.compact_with(Some((which, appended))));
        if result.is_err() {
            (self.strings, self.general) = saved;
        }
        result
    }

    pub fn set_general_name(&mut self, text: &str) -> Result<()> {
        self.set_general_string(GeneralString::Name, text)
    }

    pub fn set_general_group(&mut self, text: &str) -> Result<()> {
        self.set_general_string(GeneralString::Group, text)
    }

    pub fn set_general_order(&mut self, text: &str) -> Result<()> {
        self.set_general_string(GeneralString::Order, text)
    }

    pub fn set_general_image(&mut self, text: &str) -> Result<()> {
        self.set_general_string(GeneralString::Image, text)
    }

    fn strings_table_mut(&mut self) -> Result<&mut Sequence> {
        if self.strings.is_none() {
            self.strings = Some(schema::strings()?);
        }
        match &mut self.strings {
            Some(Node::Sequence(table)) => Ok(table),
            Some(other) => Err(ValueError::WrongKind {
                expected: "sequence",
                found: other.kind_name(),
            }
            .into()),
            None => Err(Error::Precondition("document has no string table")),
        }
    }

    /// Rebuild the string table from the general category's references.
    ///
    /// References are visited in [`GeneralString::COMPACTION_ORDER`]; each
    /// distinct string is kept once, at its first occurrence. References
    /// that are zero or out of range become zero. Strings referenced only
    /// from other categories are dropped. Does nothing without a general
    /// category.
    pub fn compact_strings(&mut self) -> Result<()> {
        self.compact_with(None)
    }

    /// `pending` overrides one reference with an index that may not fit the
    /// 8-bit field yet.
    fn compact_with(&mut self, pending: Option<(GeneralString, usize)>) -> Result<()> {
        let Some(general) = self.general.as_mut() else {
            return Ok(());
        };
        let old: &[Node] = match &self.strings {
            Some(Node::Sequence(table)) => table.as_slice(),
            Some(other) => {
                return Err(ValueError::WrongKind {
                    expected: "sequence",
                    found: other.kind_name(),
                }
                .into())
            }
            None => &[],
        };

        let mut kept: Vec<Node> = Vec::new();
        let mut indices = Vec::with_capacity(GeneralString::COMPACTION_ORDER.len());
        for which in GeneralString::COMPACTION_ORDER {
            let index = match pending {
                Some((target, index)) if target == which => index,
                _ => general.at(which.index_field())?.value()? as usize,
            };
            let new_index = match index.checked_sub(1).and_then(|i| old.get(i)) {
                None => 0,
                Some(entry) => match kept.iter().position(|k| k == entry) {
                    Some(position) => position + 1,
                    None => {
                        kept.push(entry.clone());
                        kept.len()
                    }
                },
            };
            indices.push((which, new_index));
        }

        for (which, index) in indices {
            general.at_mut(which.index_field())?.set_value(index as u64)?;
        }
        if self.strings.is_some() {
            let mut table = Sequence::length_prefixed(schema::string_entry);
            kept.into_iter().for_each(|entry| table.push(entry));
            self.strings = Some(table.into());
        }
        Ok(())
    }

    /// CRC-8 over the first 14 bytes of the encoded info header.
    ///
    /// # Errors
    /// Returns `Error::Precondition` if the document has no info header.
    pub fn compute_checksum(&self) -> Result<u8> {
        let bytes = self.info_node()?.to_bytes()?;
        Ok(crc8(&bytes[..CHECKSUM_COVERAGE.min(bytes.len())]))
    }

    /// True when the low byte of the stored checksum matches.
    pub fn checksum_valid(&self) -> Result<bool> {
        let stored = self.info_node()?.at("checksum")?.value()?;
        Ok(stored & 0xFF == u64::from(self.compute_checksum()?))
    }

    /// Store the computed checksum in the low byte of the checksum field,
    /// keeping the high byte, and return it.
    pub fn update_checksum(&mut self) -> Result<u8> {
        let crc = self.compute_checksum()?;
        let field = self
            .info
            .as_mut()
            .ok_or(Error::Precondition("document has no info header"))?
            .at_mut("checksum")?;
        let high = field.value()? & 0xFF00;
        field.set_value(high | u64::from(crc))?;
        Ok(crc)
    }

    fn info_node(&self) -> Result<&Node> {
        self.info
            .as_ref()
            .ok_or(Error::Precondition("document has no info header"))
    }
}

fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(CRC8_INIT, |crc, &byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            }
        })
    })
}

impl fmt::Display for Sii {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = std::iter::once(("info", self.info.as_ref())).chain(
            CategoryType::EMISSION_ORDER
                .into_iter()
                .map(|c| (c.key(), self.category(c))),
        );

        let mut lines = Vec::new();
        for (key, node) in sections {
            if let Some(node) = node {
                lines.push(format!("== {} ==", key.to_uppercase()));
                lines.push(node.to_string());
            }
        }
        if !self.unknown.is_empty() {
            lines.push("== UNKNOWN ==".to_string());
            for unknown in &self.unknown {
                lines.push(format!(
                    "Category 0x{:04X}. {} Bytes",
                    unknown.tag,
                    unknown.data.len()
                ));
            }
        }
        f.write_str(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::INFO_LEN;

    fn document() -> Sii {
        let mut sii = Sii::with_info().unwrap();
        sii.general = Some(schema::general().unwrap());
        sii
    }

    fn table(sii: &Sii) -> Vec<String> {
        sii.strings
            .as_ref()
            .unwrap()
            .as_sequence()
            .unwrap()
            .iter()
            .map(|n| n.as_str().unwrap().text().into_owned())
            .collect()
    }

    #[test]
    fn test_crc8_vectors() {
        assert_eq!(crc8(&[0u8; 14]), 0x30);
        assert_eq!(crc8(b"123456789"), 0xFB);
        assert_eq!(crc8(&[]), CRC8_INIT);
    }

    #[test]
    fn test_minimal_round_trip() {
        let sii = Sii::with_info().unwrap();
        let bytes = sii.to_bytes().unwrap();

        assert_eq!(bytes.len(), INFO_LEN + 4);
        assert_eq!(&bytes[INFO_LEN..], &[0xFF; 4]);
        assert_eq!(Sii::from_bytes(&bytes).unwrap(), sii);
    }

    #[test]
    fn test_encode_requires_info() {
        let err = Sii::new().to_bytes().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(Sii::new().compute_checksum().unwrap_err().kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn test_setter_requires_general() {
        let mut sii = Sii::with_info().unwrap();
        let err = sii.set_general_name("EL1008").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(sii.strings.is_none());
    }

    #[test]
    fn test_failed_setter_leaves_document_unchanged() {
        let mut sii = document();
        sii.set_general_name("EK1100").unwrap();
        sii.general = Some(Node::int(8));
        let before = sii.clone();

        let err = sii.set_general_group("DigIn").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(sii, before);

        sii.strings = None;
        assert!(sii.set_general_group("DigIn").is_err());
        assert!(sii.strings.is_none());
    }

    #[test]
    fn test_set_strings() {
        let mut sii = document();
        assert_eq!(sii.general_name(), None);

        sii.set_general_name("EL1008").unwrap();
        sii.set_general_group("DigIn").unwrap();
        sii.set_general_order("EL1008-0000").unwrap();
        sii.set_general_image("IMGCBITMAP").unwrap();

        assert_eq!(sii.general_name().as_deref(), Some("EL1008"));
        assert_eq!(sii.general_group().as_deref(), Some("DigIn"));
        assert_eq!(sii.general_order().as_deref(), Some("EL1008-0000"));
        assert_eq!(sii.general_image().as_deref(), Some("IMGCBITMAP"));
        assert_eq!(table(&sii), ["EL1008", "DigIn", "EL1008-0000", "IMGCBITMAP"]);
    }

    #[test]
    fn test_set_same_string_twice() {
        let mut sii = document();
        sii.set_general_name("EK1100").unwrap();
        sii.set_general_name("EK1100").unwrap();

        assert_eq!(table(&sii), ["EK1100"]);
        assert_eq!(sii.field("general.name_idx").unwrap().value().unwrap(), 1);
    }

    #[test]
    fn test_shared_string_deduplicated() {
        let mut sii = document();
        sii.set_general_name("Coupler").unwrap();
        sii.set_general_group("Coupler").unwrap();

        assert_eq!(table(&sii), ["Coupler"]);
        assert_eq!(sii.field("general.group_idx").unwrap().value().unwrap(), 1);
    }

    #[test]
    fn test_compaction() {
        let mut sii = document();
        let mut strings = Sequence::length_prefixed(schema::string_entry);
        for text in ["unused", "B", "A", "B"] {
            strings.push(StrNode::from_text(text).unwrap().into());
        }
        sii.strings = Some(strings.into());
        sii.field_mut("general.name_idx").unwrap().set_value(4).unwrap();
        sii.field_mut("general.group_idx").unwrap().set_value(3).unwrap();
        sii.field_mut("general.order_idx").unwrap().set_value(2).unwrap();
        sii.field_mut("general.img_idx").unwrap().set_value(9).unwrap();

        sii.compact_strings().unwrap();
        assert_eq!(table(&sii), ["B", "A"]);
        assert_eq!(sii.general_name().as_deref(), Some("B"));
        assert_eq!(sii.general_group().as_deref(), Some("A"));
        assert_eq!(sii.general_order().as_deref(), Some("B"));
        assert_eq!(sii.general_image(), None);
        assert_eq!(sii.field("general.img_idx").unwrap().value().unwrap(), 0);

        // Already compact
        let before = sii.clone();
        sii.compact_strings().unwrap();
        assert_eq!(sii, before);
    }

    #[test]
    fn test_long_string_rejected() {
        let mut sii = document();
        let err = sii.set_general_name(&"x".repeat(256)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert!(sii.strings.is_none());
    }

    #[test]
    fn test_field_paths() {
        let mut sii = document();
        sii.field_mut("info.id.vendor_id").unwrap().set_value(2).unwrap();
        assert_eq!(sii.field("info.id.vendor_id").unwrap().value().unwrap(), 2);

        assert_eq!(sii.field("dc").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(sii.field("bogus.x").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(sii.field("general.nope").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_checksum_update() {
        let mut sii = Sii::with_info().unwrap();
        sii.field_mut("info.checksum").unwrap().set_value(0xAB00).unwrap();
        assert!(!sii.checksum_valid().unwrap());

        assert_eq!(sii.update_checksum().unwrap(), 0x30);
        assert_eq!(sii.field("info.checksum").unwrap().value().unwrap(), 0xAB30);
        assert!(sii.checksum_valid().unwrap());

        sii.field_mut("info.configured_alias").unwrap().set_value(7).unwrap();
        assert!(!sii.checksum_valid().unwrap());
    }

    #[test]
    fn test_display_sections() {
        let mut sii = document();
        sii.set_general_name("EK1100").unwrap();
        sii.unknown.push(UnknownCategory {
            tag: 0x0800,
            data: vec![0; 6],
        });

        let text = sii.to_string();
        assert!(text.starts_with("== INFO ==\npdi_control: 0(0x0)"));
        assert!(text.contains("== STRINGS ==\n0: EK1100\n== GENERAL =="));
        assert!(text.contains("  vendor_id: 0(0x0)"));
        assert!(text.contains("physical_port:\n  port0: UNUSED(0x0)"));
        assert!(text.ends_with("== UNKNOWN ==\nCategory 0x0800. 6 Bytes"));
        assert!(!text.contains("== DC =="));
    }
}
