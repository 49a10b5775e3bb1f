//! Node trees describing the SII info header and the known category payloads.
//!
//! Every function returns a freshly built tree, so each decode works on its
//! own unaliased nodes. Field names follow ETG.1000.6 where it names them.
//!
//! # Info Header (0x40 words)
//!
//! ```text
//! 0x00  pdi_control, pdi_config, sync_impulse_len, pdi_config_2   4 x u16
//! 0x08  configured_alias                                           u16
//! 0x0A  reserved                                                   4 bytes
//! 0x0E  checksum                                                   u16
//! 0x10  id: vendor_id, product_code, revision_number, serial       4 x u32
//! 0x20  reserved                                                   8 bytes
//! 0x28  bootstrap_mbx, standard_mbx                                2 x 8 bytes
//! 0x38  mbx_protocol (AoE EoE CoE FoE SoE VoE + 10 reserved bits)  u16
//! 0x3A  reserved                                                   66 bytes
//! 0x7C  size, version                                              2 x u16
//! ```

use crate::composite::Sequence;
use crate::error::Result;
use crate::node::Node;
use crate::scalar::EnumOptions;

/// Encoded size of the info header, in bytes.
pub const INFO_LEN: usize = 0x80;
/// Encoded size of the general category payload, in bytes.
pub const GENERAL_LEN: usize = 32;
/// Encoded size of the distributed-clock category payload, in bytes.
pub const DC_LEN: usize = 24;
/// Encoded size of one SyncManager entry, in bytes.
pub const SYNCM_ENTRY_LEN: usize = 8;
/// Encoded size of one extended FMMU entry, in bytes.
pub const FMMUX_ENTRY_LEN: usize = 3;

pub const PORT_DESCRIPTIONS: EnumOptions = &[
    (0x00, "UNUSED"),
    (0x01, "MII"),
    (0x02, "RESERVED"),
    (0x03, "EBUS"),
    (0x04, "FAST HOT CONNECT"),
];

pub const FMMU_USAGE: EnumOptions = &[
    (0x00, "UNUSED"),
    (0x01, "OUTPUTS"),
    (0x02, "INPUTS"),
    (0x03, "SYNCM STATUS"),
    (0xFF, "UNUSED"),
];

pub const SYNCM_TYPES: EnumOptions = &[
    (0x00, "UNUSED"),
    (0x01, "MBX_OUT"),
    (0x02, "MBX_IN"),
    (0x03, "PROCESS_DATA_OUT"),
    (0x04, "PROCESS_DATA_IN"),
];

/// Offset/size pairs of one mailbox configuration.
pub fn mailbox_config() -> Result<Node> {
    Node::record(vec![
        ("recv_mbx_offset", Node::int(16)),
        ("recv_mbx_size", Node::int(16)),
        ("send_mbx_offset", Node::int(16)),
        ("send_mbx_size", Node::int(16)),
    ])
}

/// The fixed info header at the start of every image.
pub fn info_structure() -> Result<Node> {
    Node::record(vec![
        ("pdi_control", Node::int(16)),
        ("pdi_config", Node::int(16)),
        ("sync_impulse_len", Node::int(16)),
        ("pdi_config_2", Node::int(16)),
        ("configured_alias", Node::int(16)),
        ("reserved1", Node::pad_bytes(4)),
        ("checksum", Node::int(16)),
        (
            "id",
            Node::record(vec![
                ("vendor_id", Node::int(32)),
                ("product_code", Node::int(32)),
                ("revision_number", Node::int(32)),
                ("serial_number", Node::int(32)),
            ])?,
        ),
        ("reserved2", Node::pad_bytes(8)),
        ("bootstrap_mbx", mailbox_config()?),
        ("standard_mbx", mailbox_config()?),
        (
            "mbx_protocol",
            Node::record(vec![
                ("AoE", Node::int(1)),
                ("EoE", Node::int(1)),
                ("CoE", Node::int(1)),
                ("FoE", Node::int(1)),
                ("SoE", Node::int(1)),
                ("VoE", Node::int(1)),
                ("reserved", Node::pad_bits(10)),
            ])?,
        ),
        ("reserved3", Node::pad_bytes(66)),
        ("size", Node::int(16)),
        ("version", Node::int(16)),
    ])
}

/// Tag and word count preceding every category payload.
pub fn category_header() -> Result<Node> {
    Node::record(vec![
        ("category_type", Node::int(16)),
        ("len_in_words", Node::int(16)),
    ])
}

pub fn port_description() -> Node {
    Node::enumeration(4, PORT_DESCRIPTIONS)
}

/// General category: device metadata and string-table indices.
pub fn general() -> Result<Node> {
    Node::record(vec![
        ("group_idx", Node::int(8)),
        ("img_idx", Node::int(8)),
        ("order_idx", Node::int(8)),
        ("name_idx", Node::int(8)),
        ("reserved", Node::int(8)),
        (
            "coe_details",
            Node::record(vec![
                ("enable_sdo", Node::int(1)),
                ("enable_sdo_info", Node::int(1)),
                ("enable_pdo_assign", Node::int(1)),
                ("enable_pdo_config", Node::int(1)),
                ("enable_upload_at_start", Node::int(1)),
                ("enable_complete_sdo_access", Node::int(1)),
                ("reserved", Node::pad_bits(2)),
            ])?,
        ),
        (
            "foe_details",
            Node::record(vec![
                ("enable_foe", Node::int(1)),
                ("reserved", Node::pad_bits(7)),
            ])?,
        ),
        (
            "eoe_details",
            Node::record(vec![
                ("enable_eoe", Node::int(1)),
                ("reserved", Node::pad_bits(7)),
            ])?,
        ),
        ("soe_channels", Node::pad_bytes(1)),
        ("ds402_channels", Node::pad_bytes(1)),
        ("sysman_class", Node::pad_bytes(1)),
        (
            "flags",
            Node::record(vec![
                ("enable_safe_op", Node::int(1)),
                ("enable_not_lrw", Node::int(1)),
                ("mbox_data_link_layer", Node::int(1)),
                ("ident_als_ts", Node::int(1)),
                ("ident_phy_m", Node::int(1)),
                ("reserved", Node::pad_bits(3)),
            ])?,
        ),
        ("current_on_ebus", Node::int(16)),
        ("group_idx_1", Node::int(8)),
        ("reserved1", Node::pad_bytes(1)),
        (
            "physical_port",
            Node::record(vec![
                ("port0", port_description()),
                ("port1", port_description()),
                ("port2", port_description()),
                ("port3", port_description()),
            ])?,
        ),
        ("physical_memory_address", Node::int(16)),
        ("reserved2", Node::pad_bytes(12)),
    ])
}

pub fn string_entry() -> Result<Node> {
    Ok(Node::string())
}

/// Strings category: count byte followed by length-prefixed strings.
pub fn strings() -> Result<Node> {
    Ok(Sequence::length_prefixed(string_entry).into())
}

pub fn fmmu_entry() -> Result<Node> {
    Ok(Node::enumeration(8, FMMU_USAGE))
}

/// FMMU category: one usage byte per FMMU until the payload ends.
pub fn fmmu() -> Result<Node> {
    Ok(Sequence::unbounded(fmmu_entry).into())
}

pub fn fmmu_ex_entry() -> Result<Node> {
    Node::record(vec![
        ("op_only", Node::int(1)),
        ("sm_defined", Node::int(1)),
        ("su_defined", Node::int(1)),
        ("reserved", Node::pad_bits(5)),
        ("sm", Node::int(8)),
        ("su", Node::int(8)),
    ])
}

pub fn fmmu_ex() -> Result<Node> {
    Ok(Sequence::unbounded(fmmu_ex_entry).into())
}

pub fn syncm_entry() -> Result<Node> {
    Node::record(vec![
        ("physical_start_addr", Node::int(16)),
        ("length", Node::int(16)),
        ("control_register", Node::int(8)),
        ("status_register", Node::pad_bytes(1)),
        (
            "enable_sync_manager",
            Node::record(vec![
                ("enable", Node::int(1)),
                ("fixed_content", Node::int(1)),
                ("virtual_sync_manager", Node::int(1)),
                ("op_only", Node::int(1)),
                ("reserved", Node::pad_bits(4)),
            ])?,
        ),
        ("sync_manager_type", Node::enumeration(8, SYNCM_TYPES)),
    ])
}

pub fn syncm() -> Result<Node> {
    Ok(Sequence::unbounded(syncm_entry).into())
}

/// Distributed-clock category.
pub fn dc() -> Result<Node> {
    Node::record(vec![
        ("cycle_time_0", Node::int(32)),
        ("shift_time_0", Node::int(32)),
        ("shift_time_1", Node::int(32)),
        ("sync1_cycle_factor", Node::int(16)),
        ("assign_activate", Node::int(16)),
        ("sync0_cycle_factor", Node::int(16)),
        ("name_idx", Node::int(8)),
        ("desc_idx", Node::int(8)),
        ("reserved", Node::pad_bytes(4)),
    ])
}

/// Payload kept verbatim: recognised by tag but not decoded further.
pub fn opaque() -> Result<Node> {
    Ok(Node::blob())
}
