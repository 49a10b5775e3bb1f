//! Composite node kinds: named-field records and homogeneous sequences.
//!
//! # Records
//!
//! A [`Record`] is an ordered mapping from field name to child node. Decode
//! and encode visit the fields in declaration order. The set of names is
//! fixed at construction; only the children's values can change afterwards.
//!
//! # Sequences
//!
//! A [`Sequence`] holds instances of one element type, created on demand by
//! a [`NodeFactory`]. Three framing modes exist:
//!
//! ```text
//! Fixed(n)        elem elem ... elem            (n known from the schema)
//! LengthPrefixed  count:u8 elem elem ... elem   (count = current length)
//! Unbounded       elem elem ...                 (until the source runs dry)
//! ```
//!
//! An unbounded sequence stops cleanly when an element hits end-of-data;
//! any other decode failure propagates, as does an element that decodes
//! without consuming anything.

use std::fmt;
use std::io::{Read, Write};

use crate::bitio::{BitReader, BitWriter};
use crate::error::{Error, Result, ValueError};
use crate::node::Node;

/// Names that may not be used as record fields.
pub const RESERVED_FIELD_NAMES: [&str; 2] = ["take", "put"];

/// Largest element count a length-prefixed sequence can describe.
pub const MAX_PREFIXED_COUNT: usize = u8::MAX as usize;

/// Render a leaf as `label: value`; a record or sequence as `label:`
/// followed by its own lines indented by two spaces.
fn push_entry(lines: &mut Vec<String>, label: &str, node: &Node) {
    match node {
        Node::Record(_) | Node::Sequence(_) => {
            lines.push(format!("{label}:"));
            lines.extend(node.to_string().lines().map(|line| format!("  {line}")));
        }
        leaf => lines.push(format!("{label}: {leaf}")),
    }
}

/// Ordered collection of named child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(&'static str, Node)>,
}

impl Record {
    /// Build a record from `(name, node)` pairs in declaration order.
    ///
    /// # Errors
    /// - `ValueError::ReservedFieldName` for `take` or `put`
    /// - `ValueError::DuplicateField` if a name appears twice
    pub fn new(fields: Vec<(&'static str, Node)>) -> Result<Self> {
        for (i, (name, _)) in fields.iter().enumerate() {
            if RESERVED_FIELD_NAMES.contains(name) {
                return Err(ValueError::ReservedFieldName(name.to_string()).into());
            }
            if fields[..i].iter().any(|(other, _)| other == name) {
                return Err(ValueError::DuplicateField(name.to_string()).into());
            }
        }
        Ok(Self { fields })
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for a record without fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    /// `(name, node)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Node)> {
        self.fields.iter().map(|(name, node)| (*name, node))
    }

    /// Mutable `(name, node)` pairs in declaration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut Node)> {
        self.fields.iter_mut().map(|(name, node)| (*name, node))
    }

    /// Look up a field by name.
    ///
    /// # Errors
    /// Returns `ValueError::FieldNotFound` if no field has that name.
    pub fn field(&self, name: &str) -> Result<&Node> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, node)| node)
            .ok_or_else(|| ValueError::FieldNotFound(name.to_string()).into())
    }

    /// Mutable lookup by name.
    pub fn field_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.fields
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, node)| node)
            .ok_or_else(|| ValueError::FieldNotFound(name.to_string()).into())
    }

    /// Decode every field in declaration order.
    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        for (name, node) in &mut self.fields {
            node.decode(reader).map_err(|e| e.in_field(*name))?;
        }
        Ok(())
    }

    /// Encode every field in declaration order.
    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        for (name, node) in &self.fields {
            node.encode(writer).map_err(|e| e.in_field(*name))?;
        }
        Ok(())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        for (name, node) in &self.fields {
            push_entry(&mut lines, name, node);
        }
        f.write_str(&lines.join("\n"))
    }
}

/// Builds a fresh, unaliased element instance for a sequence.
pub type NodeFactory = fn() -> Result<Node>;

/// How a sequence determines its element count on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// Exactly this many elements, known from the schema
    Fixed(usize),
    /// A leading count byte holds the number of elements
    LengthPrefixed,
    /// Elements continue until the source is exhausted
    Unbounded,
}

/// Homogeneous list of nodes of one element type.
#[derive(Clone)]
pub struct Sequence {
    factory: NodeFactory,
    mode: SequenceMode,
    items: Vec<Node>,
}

impl Sequence {
    /// Empty sequence of `factory` elements framed by `mode`.
    pub fn new(factory: NodeFactory, mode: SequenceMode) -> Self {
        Self {
            factory,
            mode,
            items: Vec::new(),
        }
    }

    /// Empty sequence that decodes exactly `count` elements.
    pub fn fixed(factory: NodeFactory, count: usize) -> Self {
        Self::new(factory, SequenceMode::Fixed(count))
    }

    /// Empty sequence framed by a leading count byte.
    pub fn length_prefixed(factory: NodeFactory) -> Self {
        Self::new(factory, SequenceMode::LengthPrefixed)
    }

    /// Empty sequence that decodes until the source runs dry.
    pub fn unbounded(factory: NodeFactory) -> Self {
        Self::new(factory, SequenceMode::Unbounded)
    }

    /// The framing mode.
    pub fn mode(&self) -> SequenceMode {
        self.mode
    }

    /// Number of elements currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no elements are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    /// Mutable element at `index`, if present.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.items.get_mut(index)
    }

    /// All elements in order.
    pub fn as_slice(&self) -> &[Node] {
        &self.items
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    /// Iterate mutably over the elements.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.items.iter_mut()
    }

    /// A fresh element of this sequence's type, not yet inserted.
    pub fn new_element(&self) -> Result<Node> {
        (self.factory)()
    }

    /// Append an element. Count limits are enforced on encode.
    pub fn push(&mut self, node: Node) {
        self.items.push(node);
    }

    /// Append a freshly built element and return it for editing.
    pub fn push_new(&mut self) -> Result<&mut Node> {
        let node = self.new_element()?;
        self.items.push(node);
        let last = self.items.len() - 1;
        Ok(&mut self.items[last])
    }

    /// Remove and return the element at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<Node> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Drop all elements.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the contents with elements decoded according to the mode.
    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        self.items.clear();
        match self.mode {
            SequenceMode::Fixed(count) => self.decode_counted(reader, count),
            SequenceMode::LengthPrefixed => {
                let count = reader.read_bits(8).map_err(|e| e.in_field("count"))? as usize;
                self.decode_counted(reader, count)
            }
            SequenceMode::Unbounded => loop {
                let mut item = self.new_element()?;
                let start = reader.bits_consumed();
                match item.decode(reader) {
                    Ok(()) if reader.bits_consumed() == start => {
                        let err = Error::from(ValueError::EmptyElement);
                        return Err(err.in_field(self.items.len().to_string()));
                    }
                    Ok(()) => self.items.push(item),
                    Err(e) if e.is_out_of_data() => return Ok(()),
                    Err(e) => return Err(e.in_field(self.items.len().to_string())),
                }
            },
        }
    }

    fn decode_counted<R: Read>(&mut self, reader: &mut BitReader<R>, count: usize) -> Result<()> {
        self.items.reserve(count);
        for index in 0..count {
            let mut item = self.new_element()?;
            item.decode(reader).map_err(|e| e.in_field(index.to_string()))?;
            self.items.push(item);
        }
        Ok(())
    }

    /// Emit the current elements; a length prefix reflects the current count.
    ///
    /// # Errors
    /// - `ValueError::TooManyElements` if a prefixed count exceeds 255
    /// - `ValueError::CountMismatch` if a fixed sequence was resized
    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        match self.mode {
            SequenceMode::Fixed(expected) if expected != self.items.len() => {
                return Err(ValueError::CountMismatch {
                    expected,
                    actual: self.items.len(),
                }
                .into());
            }
            SequenceMode::LengthPrefixed => {
                if self.items.len() > MAX_PREFIXED_COUNT {
                    return Err(ValueError::TooManyElements {
                        len: self.items.len(),
                    }
                    .into());
                }
                writer.write_bits(self.items.len() as u64, 8)?;
            }
            _ => {}
        }
        for (index, item) in self.items.iter().enumerate() {
            item.encode(writer).map_err(|e| e.in_field(index.to_string()))?;
        }
        Ok(())
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.items == other.items
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("mode", &self.mode)
            .field("items", &self.items)
            .finish()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        for (index, node) in self.items.iter().enumerate() {
            push_entry(&mut lines, &index.to_string(), node);
        }
        f.write_str(&lines.join("\n"))
    }
}
