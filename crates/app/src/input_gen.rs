//! Sample SII image generation for testing.
//!
//! When no input file is specified, we generate a plausible device image so
//! the tool has something to show.
//!
//! # Design
//!
//! Generated images have:
//! - A filled-in info header (identity, mailbox layout, protocol flags)
//! - Name/group/order strings and a general category referencing them
//! - Typical FMMU and SyncManager tables, opaque PDO blobs
//! - Sometimes a DC block and a vendor-specific passthrough category
//!
//! Everything is built through the core API, so the result always decodes.

use ecat_sii_core::composite::Sequence;
use ecat_sii_core::scalar::Blob;
use ecat_sii_core::{schema, Node, Result, Sii, UnknownCategory};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const GROUPS: [&str; 4] = ["DigIn", "DigOut", "AnaIn", "Coupler"];
const PREFIXES: [&str; 3] = ["EL", "EP", "ES"];

/// Standard mailbox and process-data SyncManagers: (start, length, control, type).
const SYNC_MANAGERS: [(u64, u64, u64, &str); 4] = [
    (0x1000, 0x80, 0x26, "MBX_OUT"),
    (0x1080, 0x80, 0x22, "MBX_IN"),
    (0x1100, 0x00, 0x64, "PROCESS_DATA_OUT"),
    (0x1180, 0x00, 0x20, "PROCESS_DATA_IN"),
];

/// Generate a sample SII image.
///
/// # Arguments
/// - `seed`: random seed for determinism
///
/// # Returns
/// Encoded image bytes ready to be written to file or decoded.
pub fn generate_sample_image(seed: u64) -> Result<Vec<u8>> {
    generate_sample(seed)?.to_bytes()
}

/// Generate a sample document.
pub fn generate_sample(seed: u64) -> Result<Sii> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut sii = Sii::with_info()?;

    fill_info(&mut sii, &mut rng)?;

    let mut general = schema::general()?;
    general.at_mut("coe_details.enable_sdo")?.set_value(1)?;
    general.at_mut("coe_details.enable_sdo_info")?.set_value(rng.gen_range(0..=1))?;
    general.at_mut("coe_details.enable_pdo_assign")?.set_value(rng.gen_range(0..=1))?;
    general.at_mut("flags.enable_safe_op")?.set_value(rng.gen_range(0..=1))?;
    general.at_mut("current_on_ebus")?.set_value(rng.gen_range(50..=400))?;
    general.at_mut("physical_port.port0")?.set_label("EBUS")?;
    general.at_mut("physical_port.port1")?.set_label("EBUS")?;
    sii.general = Some(general);

    let number: u16 = rng.gen_range(1000..=9999);
    let name = format!("{}{number}", PREFIXES[rng.gen_range(0..PREFIXES.len())]);
    sii.set_general_name(&name)?;
    sii.set_general_group(GROUPS[rng.gen_range(0..GROUPS.len())])?;
    sii.set_general_order(&format!("{name}-0000"))?;

    let mut fmmu = Sequence::unbounded(schema::fmmu_entry);
    // Four entries keep the payload even, so no pad byte is decoded back
    for label in ["OUTPUTS", "INPUTS", "SYNCM STATUS", "UNUSED"] {
        fmmu.push_new()?.set_label(label)?;
    }
    sii.fmmu = Some(fmmu.into());

    let mut syncm = Sequence::unbounded(schema::syncm_entry);
    for (start, length, control, kind) in SYNC_MANAGERS {
        let entry = syncm.push_new()?;
        entry.at_mut("physical_start_addr")?.set_value(start)?;
        entry.at_mut("length")?.set_value(length)?;
        entry.at_mut("control_register")?.set_value(control)?;
        entry.at_mut("enable_sync_manager.enable")?.set_value(1)?;
        entry.at_mut("sync_manager_type")?.set_label(kind)?;
    }
    sii.syncm = Some(syncm.into());

    sii.txpdo = Some(random_blob(&mut rng));
    sii.rxpdo = Some(random_blob(&mut rng));

    if rng.gen_bool(0.5) {
        let mut dc = schema::dc()?;
        dc.at_mut("cycle_time_0")?.set_value(rng.gen_range(1..=10) * 100_000)?;
        dc.at_mut("assign_activate")?.set_value(0x0300)?;
        sii.dc = Some(dc);
    }

    if rng.gen_bool(0.5) {
        let len = rng.gen_range(1..=8) * 2;
        sii.unknown.push(UnknownCategory {
            tag: rng.gen_range(0x0800..=0x0FFF),
            data: (0..len).map(|_| rng.gen()).collect(),
        });
    }

    sii.update_checksum()?;
    Ok(sii)
}

fn fill_info(sii: &mut Sii, rng: &mut ChaCha8Rng) -> Result<()> {
    sii.field_mut("info.pdi_control")?.set_value(0x0C08)?;
    sii.field_mut("info.configured_alias")?.set_value(rng.gen_range(0..=0xFF))?;
    sii.field_mut("info.id.vendor_id")?.set_value(0x0000_0002)?;
    sii.field_mut("info.id.product_code")?.set_value(u64::from(rng.gen::<u32>()))?;
    sii.field_mut("info.id.revision_number")?.set_value(u64::from(rng.gen_range(1u32..=0x20)) << 16)?;
    sii.field_mut("info.id.serial_number")?.set_value(u64::from(rng.gen::<u32>()))?;

    for (prefix, offset) in [("info.bootstrap_mbx", 0x1000), ("info.standard_mbx", 0x1800)] {
        sii.field_mut(&format!("{prefix}.recv_mbx_offset"))?.set_value(offset)?;
        sii.field_mut(&format!("{prefix}.recv_mbx_size"))?.set_value(0x80)?;
        sii.field_mut(&format!("{prefix}.send_mbx_offset"))?.set_value(offset + 0x80)?;
        sii.field_mut(&format!("{prefix}.send_mbx_size"))?.set_value(0x80)?;
    }
    for protocol in ["CoE", "FoE", "EoE"] {
        let enabled = rng.gen_bool(0.5);
        sii.field_mut(&format!("info.mbx_protocol.{protocol}"))?.set_value(u64::from(enabled))?;
    }

    sii.field_mut("info.size")?.set_value(0x001F)?;
    sii.field_mut("info.version")?.set_value(1)?;
    Ok(())
}

/// Even-length random payload, so it survives re-framing unchanged.
fn random_blob(rng: &mut ChaCha8Rng) -> Node {
    let len = rng.gen_range(4..=16) * 2;
    Node::Blob(Blob::new((0..len).map(|_| rng.gen()).collect()))
}
