//! The closed set of serializable node kinds.
//!
//! A [`Node`] is one of the leaf kinds from [`crate::scalar`] or one of the
//! composites from [`crate::composite`]. Schema trees are built from nodes,
//! decoded in place from a [`BitReader`], edited through the typed setters
//! and encoded back through a [`BitWriter`].
//!
//! Nodes inside a tree can be addressed by a dotted path: record fields by
//! name, sequence elements by index (`"id.vendor_id"`, `"3.length"`).

use std::fmt;
use std::io::{Read, Write};

use crate::bitio::{BitReader, BitWriter};
use crate::composite::{NodeFactory, Record, Sequence, SequenceMode};
use crate::error::{Result, ValueError};
use crate::scalar::{Blob, EnumNode, EnumOptions, IntNode, Padding, StrNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Int(IntNode),
    Enum(EnumNode),
    Padding(Padding),
    Str(StrNode),
    Blob(Blob),
    Record(Record),
    Sequence(Sequence),
}

impl Node {
    pub fn int(bits: u8) -> Self {
        Node::Int(IntNode::new(bits))
    }

    pub fn bounded(bits: u8, min: u64, max: u64) -> Self {
        Node::Int(IntNode::bounded(bits, min, max))
    }

    pub fn enumeration(bits: u8, options: EnumOptions) -> Self {
        Node::Enum(EnumNode::new(bits, options))
    }

    pub fn pad_bytes(len: usize) -> Self {
        Node::Padding(Padding::bytes(len))
    }

    pub fn pad_bits(len: usize) -> Self {
        Node::Padding(Padding::bits(len))
    }

    pub fn string() -> Self {
        Node::Str(StrNode::new())
    }

    pub fn blob() -> Self {
        Node::Blob(Blob::default())
    }

    pub fn record(fields: Vec<(&'static str, Node)>) -> Result<Self> {
        Ok(Node::Record(Record::new(fields)?))
    }

    pub fn sequence(factory: NodeFactory, mode: SequenceMode) -> Self {
        Node::Sequence(Sequence::new(factory, mode))
    }

    /// Short name of this node's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Int(_) => "integer",
            Node::Enum(_) => "enumeration",
            Node::Padding(_) => "padding",
            Node::Str(_) => "string",
            Node::Blob(_) => "blob",
            Node::Record(_) => "record",
            Node::Sequence(_) => "sequence",
        }
    }

    fn wrong_kind(&self, expected: &'static str) -> ValueError {
        ValueError::WrongKind {
            expected,
            found: self.kind_name(),
        }
    }

    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        match self {
            Node::Int(n) => n.decode(reader),
            Node::Enum(n) => n.decode(reader),
            Node::Padding(n) => n.decode(reader),
            Node::Str(n) => n.decode(reader),
            Node::Blob(n) => n.decode(reader),
            Node::Record(n) => n.decode(reader),
            Node::Sequence(n) => n.decode(reader),
        }
    }

    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        match self {
            Node::Int(n) => n.encode(writer),
            Node::Enum(n) => n.encode(writer),
            Node::Padding(n) => n.encode(writer),
            Node::Str(n) => n.encode(writer),
            Node::Blob(n) => n.encode(writer),
            Node::Record(n) => n.encode(writer),
            Node::Sequence(n) => n.encode(writer),
        }
    }

    /// Encode this node alone into a byte vector, zero-extending a trailing
    /// partial byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BitWriter::new(Vec::new());
        self.encode(&mut writer)?;
        writer.into_inner()
    }

    pub fn as_int(&self) -> Option<&IntNode> {
        match self {
            Node::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumNode> {
        match self {
            Node::Enum(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&StrNode> {
        match self {
            Node::Str(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Node::Blob(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Record(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Node::Record(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(n) => Some(n),
            _ => None,
        }
    }

    /// Raw numeric value of an integer or enumeration.
    pub fn value(&self) -> Result<u64> {
        match self {
            Node::Int(n) => Ok(n.value()),
            Node::Enum(n) => Ok(n.raw()),
            other => Err(other.wrong_kind("integer").into()),
        }
    }

    /// Assign an integer, enforcing its bounds.
    pub fn set_value(&mut self, value: u64) -> Result<()> {
        match self {
            Node::Int(n) => n.set_value(value),
            other => Err(other.wrong_kind("integer").into()),
        }
    }

    /// Label of an enumeration; `None` for unmapped codes.
    pub fn label(&self) -> Result<Option<&'static str>> {
        match self {
            Node::Enum(n) => Ok(n.label()),
            other => Err(other.wrong_kind("enumeration").into()),
        }
    }

    /// Assign an enumeration by label.
    pub fn set_label(&mut self, label: &str) -> Result<()> {
        match self {
            Node::Enum(n) => n.set_label(label),
            other => Err(other.wrong_kind("enumeration").into()),
        }
    }

    /// Assign string content.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        match self {
            Node::Str(n) => n.set_text(text),
            other => Err(other.wrong_kind("string").into()),
        }
    }

    /// Direct child by record field name or sequence index.
    pub fn child(&self, key: &str) -> Result<&Node> {
        match self {
            Node::Record(r) => r.field(key),
            Node::Sequence(s) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| s.get(i))
                .ok_or_else(|| ValueError::FieldNotFound(key.to_string()).into()),
            _ => Err(ValueError::FieldNotFound(key.to_string()).into()),
        }
    }

    pub fn child_mut(&mut self, key: &str) -> Result<&mut Node> {
        match self {
            Node::Record(r) => r.field_mut(key),
            Node::Sequence(s) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| s.get_mut(i))
                .ok_or_else(|| ValueError::FieldNotFound(key.to_string()).into()),
            _ => Err(ValueError::FieldNotFound(key.to_string()).into()),
        }
    }

    /// Descendant addressed by a dotted path; the empty path is `self`.
    ///
    /// # Errors
    /// Returns `ValueError::FieldNotFound` naming the first segment that
    /// does not resolve.
    pub fn at(&self, path: &str) -> Result<&Node> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn at_mut(&mut self, path: &str) -> Result<&mut Node> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child_mut(segment))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Int(n) => fmt::Display::fmt(n, f),
            Node::Enum(n) => fmt::Display::fmt(n, f),
            Node::Padding(n) => fmt::Display::fmt(n, f),
            Node::Str(n) => fmt::Display::fmt(n, f),
            Node::Blob(n) => fmt::Display::fmt(n, f),
            Node::Record(n) => fmt::Display::fmt(n, f),
            Node::Sequence(n) => fmt::Display::fmt(n, f),
        }
    }
}

impl From<IntNode> for Node {
    fn from(node: IntNode) -> Self {
        Node::Int(node)
    }
}

impl From<EnumNode> for Node {
    fn from(node: EnumNode) -> Self {
        Node::Enum(node)
    }
}

impl From<StrNode> for Node {
    fn from(node: StrNode) -> Self {
        Node::Str(node)
    }
}

impl From<Record> for Node {
    fn from(node: Record) -> Self {
        Node::Record(node)
    }
}

impl From<Sequence> for Node {
    fn from(node: Sequence) -> Self {
        Node::Sequence(node)
    }
}
