//! ecat-sii-core: codec for EtherCAT Slave Information Interface images
//!
//! This library reads, edits and writes the EEPROM image an EtherCAT device
//! carries to describe itself:
//! - Decodes the fixed info header and the tagged category stream
//! - Exposes every field as a typed, bounds-checked node addressable by path
//! - Keeps unrecognised categories verbatim for lossless re-encoding
//! - Maintains the string table behind the general category's references
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Low-level bit reading/writing
//! - `scalar`, `composite`, `node`: Serializable node kinds
//! - `schema`: Node trees for the info header and each known category
//! - `framing`: Category record headers, payload isolation and padding
//! - `sii`: The document and its string-table helpers
//!
//! # Example
//! ```
//! use ecat_sii_core::{schema, Sii};
//!
//! let mut sii = Sii::with_info().unwrap();
//! sii.general = Some(schema::general().unwrap());
//! sii.field_mut("info.id.vendor_id").unwrap().set_value(0x2).unwrap();
//! sii.set_general_name("EK1100").unwrap();
//!
//! let bytes = sii.to_bytes().unwrap();
//! let decoded = Sii::from_bytes(&bytes).unwrap();
//! assert_eq!(decoded.general_name().as_deref(), Some("EK1100"));
//! assert_eq!(decoded, sii);
//! ```
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and carry the field and
//!   category that were being processed
//! - **Isolated payloads**: A broken category cannot disturb its neighbours
//! - **Lossless**: Unknown categories and unmapped enumeration codes survive
//!   a decode/encode cycle unchanged

pub mod bitio;
pub mod composite;
pub mod error;
pub mod framing;
pub mod node;
pub mod scalar;
pub mod schema;
pub mod sii;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use framing::CategoryType;
pub use node::Node;
pub use sii::{GeneralString, Sii, UnknownCategory};
