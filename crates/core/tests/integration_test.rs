//! Integration tests for whole SII images.
//!
//! These tests verify end-to-end behavior: bytes -> decode -> inspect/edit ->
//! encode -> bytes, with verification that untouched content survives
//! unchanged and malformed images are reported with their category.

use ecat_sii_core::{
    framing::CategoryType,
    schema::{self, INFO_LEN},
    ErrorKind, GeneralString, Sii, UnknownCategory,
};

const VENDOR_ID: u32 = 0x0000_0002;
const PRODUCT_CODE: u32 = 0x044C_2C52;

/// 128-byte info header with a few recognisable fields set.
fn info_bytes() -> Vec<u8> {
    let mut info = vec![0u8; INFO_LEN];
    info[0x00..0x02].copy_from_slice(&0x0C08u16.to_le_bytes()); // pdi_control
    info[0x08..0x0A].copy_from_slice(&0x1234u16.to_le_bytes()); // configured_alias
    info[0x10..0x14].copy_from_slice(&VENDOR_ID.to_le_bytes());
    info[0x14..0x18].copy_from_slice(&PRODUCT_CODE.to_le_bytes());
    info[0x18..0x1C].copy_from_slice(&0x0011_0000u32.to_le_bytes()); // revision
    info[0x38] = 0b0000_0100; // CoE
    info[0x7C..0x7E].copy_from_slice(&0x001Fu16.to_le_bytes()); // size
    info[0x7E..0x80].copy_from_slice(&1u16.to_le_bytes()); // version
    info
}

/// One framed category record; `payload` must already be even.
fn category(tag: u16, payload: &[u8]) -> Vec<u8> {
    assert_eq!(payload.len() % 2, 0);
    let mut record = Vec::new();
    record.extend_from_slice(&tag.to_le_bytes());
    record.extend_from_slice(&((payload.len() / 2) as u16).to_le_bytes());
    record.extend_from_slice(payload);
    record
}

fn strings_payload() -> Vec<u8> {
    let mut payload = vec![2];
    payload.push(6);
    payload.extend_from_slice(b"EK1100");
    payload.push(5);
    payload.extend_from_slice(b"Coupl");
    payload
}

fn general_payload() -> Vec<u8> {
    let mut payload = vec![0u8; schema::GENERAL_LEN];
    payload[0] = 2; // group_idx
    payload[3] = 1; // name_idx
    payload[5] = 0b0000_0101; // enable_sdo, enable_pdo_assign
    payload[12..14].copy_from_slice(&200u16.to_le_bytes()); // current_on_ebus
    payload[16] = 0x33; // port0, port1 = EBUS
    payload
}

fn syncm_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    for (start, length, kind) in [(0x1000u16, 0x80u16, 1u8), (0x1080, 0x80, 2)] {
        payload.extend_from_slice(&start.to_le_bytes());
        payload.extend_from_slice(&length.to_le_bytes());
        payload.push(0x26); // control_register
        payload.push(0x00); // status_register
        payload.push(0x01); // enable
        payload.push(kind);
    }
    payload
}

fn dc_payload() -> Vec<u8> {
    let mut payload = vec![0u8; schema::DC_LEN];
    payload[0..4].copy_from_slice(&1_000_000u32.to_le_bytes()); // cycle_time_0
    payload[14..16].copy_from_slice(&0x0300u16.to_le_bytes()); // assign_activate
    payload
}

/// A complete image with categories in canonical order, followed by one
/// vendor-specific category.
fn sample_image() -> Vec<u8> {
    let mut image = info_bytes();
    image.extend(category(10, &strings_payload()));
    image.extend(category(30, &general_payload()));
    image.extend(category(40, &[0x01, 0x02, 0x03, 0x00]));
    image.extend(category(41, &syncm_payload()));
    image.extend(category(50, &[0xAA; 8]));
    image.extend(category(60, &dc_payload()));
    image.extend(category(0x0800, &[1, 2, 3, 4, 5, 6]));
    image.extend([0xFF; 4]);
    image
}

/// Decode a full image and check representative fields of every category.
#[test]
fn test_decode_full_image() {
    let sii = Sii::from_bytes(&sample_image()).expect("decode failed");

    // Info header
    assert_eq!(sii.field("info.configured_alias").unwrap().value().unwrap(), 0x1234);
    assert_eq!(sii.field("info.id.vendor_id").unwrap().value().unwrap(), u64::from(VENDOR_ID));
    assert_eq!(
        sii.field("info.id.product_code").unwrap().value().unwrap(),
        u64::from(PRODUCT_CODE)
    );
    assert_eq!(sii.field("info.mbx_protocol.CoE").unwrap().value().unwrap(), 1);

    // General and strings
    assert_eq!(sii.general_name().as_deref(), Some("EK1100"));
    assert_eq!(sii.general_group().as_deref(), Some("Coupl"));
    assert_eq!(sii.general_order(), None);
    assert_eq!(sii.field("general.coe_details.enable_sdo").unwrap().value().unwrap(), 1);
    assert_eq!(sii.field("general.coe_details.enable_sdo_info").unwrap().value().unwrap(), 0);
    assert_eq!(sii.field("general.current_on_ebus").unwrap().value().unwrap(), 200);
    assert_eq!(
        sii.field("general.physical_port.port1").unwrap().label().unwrap(),
        Some("EBUS")
    );

    // Tables: the FMMU pad byte decodes as a fourth, unused entry
    let fmmu = sii.fmmu.as_ref().unwrap().as_sequence().unwrap();
    assert_eq!(fmmu.len(), 4);
    assert_eq!(sii.field("fmmu.1").unwrap().label().unwrap(), Some("INPUTS"));
    assert_eq!(sii.field("fmmu.2").unwrap().label().unwrap(), Some("SYNCM STATUS"));
    assert_eq!(sii.field("syncm.1.physical_start_addr").unwrap().value().unwrap(), 0x1080);
    assert_eq!(sii.field("syncm.1.sync_manager_type").unwrap().label().unwrap(), Some("MBX_IN"));
    assert_eq!(sii.field("syncm.0.enable_sync_manager.enable").unwrap().value().unwrap(), 1);

    // Opaque and DC
    assert_eq!(sii.txpdo.as_ref().unwrap().as_blob().unwrap().as_bytes(), &[0xAA; 8]);
    assert!(sii.rxpdo.is_none());
    assert_eq!(sii.field("dc.cycle_time_0").unwrap().value().unwrap(), 1_000_000);
    assert_eq!(sii.field("dc.assign_activate").unwrap().value().unwrap(), 0x0300);

    // Passthrough
    assert_eq!(
        sii.unknown,
        vec![UnknownCategory {
            tag: 0x0800,
            data: vec![1, 2, 3, 4, 5, 6],
        }]
    );
}

/// An image already in canonical order re-encodes byte-for-byte.
#[test]
fn test_canonical_image_round_trip() {
    let image = sample_image();
    let sii = Sii::from_bytes(&image).expect("decode failed");
    let encoded = sii.to_bytes().expect("encode failed");
    assert_eq!(encoded, image);
}

/// Out-of-order categories come back in canonical order with equal content.
#[test]
fn test_category_order_normalised() {
    let mut image = info_bytes();
    image.extend(category(0x0001, &[9, 9]));
    image.extend(category(60, &dc_payload()));
    image.extend(category(0x0002, &[]));
    image.extend(category(30, &general_payload()));
    image.extend([0xFF; 4]);

    let sii = Sii::from_bytes(&image).expect("decode failed");
    let encoded = sii.to_bytes().expect("encode failed");
    assert_ne!(encoded, image);
    assert_eq!(encoded.len(), image.len());

    // General now precedes DC, unknowns keep their relative order at the end
    let mut expected = info_bytes();
    expected.extend(category(30, &general_payload()));
    expected.extend(category(60, &dc_payload()));
    expected.extend(category(0x0001, &[9, 9]));
    expected.extend(category(0x0002, &[]));
    expected.extend([0xFF; 4]);
    assert_eq!(encoded, expected);

    assert_eq!(Sii::from_bytes(&encoded).unwrap(), sii);
}

/// Edit fields through paths and string helpers, then re-decode.
#[test]
fn test_edit_and_reencode() {
    let mut sii = Sii::from_bytes(&sample_image()).expect("decode failed");

    sii.field_mut("info.id.serial_number").unwrap().set_value(0xCAFE).unwrap();
    sii.field_mut("syncm.0.length").unwrap().set_value(0x100).unwrap();
    sii.field_mut("syncm.1.sync_manager_type")
        .unwrap()
        .set_label("PROCESS_DATA_IN")
        .unwrap();
    sii.set_general_order("EK1100-0000").unwrap();
    sii.set_general_string(GeneralString::Image, "EK1100").unwrap();

    let decoded = Sii::from_bytes(&sii.to_bytes().unwrap()).expect("re-decode failed");
    assert_eq!(decoded, sii);
    assert_eq!(decoded.field("info.id.serial_number").unwrap().value().unwrap(), 0xCAFE);
    assert_eq!(decoded.field("syncm.0.length").unwrap().value().unwrap(), 0x100);
    assert_eq!(
        decoded.field("syncm.1.sync_manager_type").unwrap().value().unwrap(),
        0x04
    );
    assert_eq!(decoded.general_order().as_deref(), Some("EK1100-0000"));
    assert_eq!(decoded.general_image().as_deref(), Some("EK1100"));

    // Image shares the name's entry
    let strings = decoded.strings.as_ref().unwrap().as_sequence().unwrap();
    assert_eq!(strings.len(), 3);
    assert_eq!(decoded.field("general.img_idx").unwrap().value().unwrap(), 1);
}

/// Rejected assignments leave the document unchanged.
#[test]
fn test_bounds_enforced() {
    let mut sii = Sii::from_bytes(&sample_image()).expect("decode failed");
    let before = sii.clone();

    let err = sii.field_mut("general.name_idx").unwrap().set_value(0x100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    let err = sii
        .field_mut("fmmu.0")
        .unwrap()
        .set_label("BIDIRECTIONAL")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = sii.set_general_name(&"n".repeat(300)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);

    assert_eq!(sii, before);
}

/// Unmapped enumeration codes display as unknown and re-encode verbatim.
#[test]
fn test_unknown_enum_code_preserved() {
    let mut syncm = syncm_payload();
    syncm[15] = 0x09; // second sync_manager_type
    let mut image = info_bytes();
    image.extend(category(41, &syncm));
    image.extend([0xFF; 4]);

    let sii = Sii::from_bytes(&image).expect("decode failed");
    let kind = sii.field("syncm.1.sync_manager_type").unwrap();
    assert_eq!(kind.label().unwrap(), None);
    assert_eq!(kind.to_string(), "???(0x9)");
    assert_eq!(sii.to_bytes().unwrap(), image);
}

/// Passthrough categories survive, and odd payloads are padded on encode.
#[test]
fn test_unknown_category_passthrough() {
    let mut sii = Sii::with_info().unwrap();
    sii.unknown.push(UnknownCategory {
        tag: 0x0801,
        data: vec![7, 7, 7],
    });

    let encoded = sii.to_bytes().unwrap();
    assert_eq!(
        &encoded[INFO_LEN..],
        &[0x01, 0x08, 0x02, 0x00, 7, 7, 7, 0, 0xFF, 0xFF, 0xFF, 0xFF]
    );

    let decoded = Sii::from_bytes(&encoded).unwrap();
    assert_eq!(decoded.unknown[0].data, vec![7, 7, 7, 0]);
    assert_eq!(decoded.to_bytes().unwrap(), encoded);
}

/// A NOP category (tag 0) is an ordinary passthrough.
#[test]
fn test_nop_category_passthrough() {
    let mut image = info_bytes();
    image.extend(category(0, &[0, 0]));
    image.extend([0xFF; 4]);

    let sii = Sii::from_bytes(&image).unwrap();
    assert_eq!(sii.unknown.len(), 1);
    assert_eq!(sii.unknown[0].tag, 0);
    assert_eq!(sii.to_bytes().unwrap(), image);
}

/// A known category with stray bytes names itself in the error.
#[test]
fn test_malformed_category_reported() {
    let mut dc = dc_payload();
    dc.extend([0, 0]);
    let mut image = info_bytes();
    image.extend(category(60, &dc));
    image.extend([0xFF; 4]);

    let err = Sii::from_bytes(&image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedCategory);
    let message = err.to_string();
    assert!(message.contains("DC"), "{message}");
    assert!(message.contains("0x003c"), "{message}");
}

/// A short payload fails inside its category without disturbing framing.
#[test]
fn test_short_category_reported() {
    let mut image = info_bytes();
    image.extend(category(30, &[0u8; 16]));
    image.extend([0xFF; 4]);

    let err = Sii::from_bytes(&image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfData);
    assert!(err.to_string().contains("General"));
}

/// Truncated images surface as out-of-data.
#[test]
fn test_truncated_image() {
    let image = sample_image();

    // Inside the info header
    let err = Sii::from_bytes(&image[..0x40]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfData);

    // Inside a category payload
    let err = Sii::from_bytes(&image[..INFO_LEN + 10]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfData);

    // Terminator missing
    let err = Sii::from_bytes(&image[..image.len() - 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfData);
}

/// The later of two copies of a known category wins.
#[test]
fn test_duplicate_category_later_wins() {
    let mut first = dc_payload();
    first[0] = 0x11;
    let mut image = info_bytes();
    image.extend(category(60, &first));
    image.extend(category(60, &dc_payload()));
    image.extend([0xFF; 4]);

    let sii = Sii::from_bytes(&image).unwrap();
    assert_eq!(sii.field("dc.cycle_time_0").unwrap().value().unwrap(), 1_000_000);
}

/// Extended FMMU entries are decoded until the payload runs out.
#[test]
fn test_fmmux_table() {
    let mut image = info_bytes();
    image.extend(category(42, &[0b011, 0, 1, 0b101, 2, 3]));
    image.extend([0xFF; 4]);

    let sii = Sii::from_bytes(&image).unwrap();
    let fmmux = sii.category(CategoryType::FmmuEx).unwrap().as_sequence().unwrap();
    assert_eq!(fmmux.len(), 2);
    assert_eq!(sii.field("fmmux.0.sm_defined").unwrap().value().unwrap(), 1);
    assert_eq!(sii.field("fmmux.0.su_defined").unwrap().value().unwrap(), 0);
    assert_eq!(sii.field("fmmux.1.su_defined").unwrap().value().unwrap(), 1);
    assert_eq!(sii.field("fmmux.1.sm").unwrap().value().unwrap(), 2);
    assert_eq!(sii.field("fmmux.1.su").unwrap().value().unwrap(), 3);
    assert_eq!(sii.to_bytes().unwrap(), image);
}

/// Checksum over a decoded header can be validated and repaired.
#[test]
fn test_checksum_repair() {
    let mut sii = Sii::from_bytes(&sample_image()).unwrap();
    assert!(!sii.checksum_valid().unwrap());

    let crc = sii.update_checksum().unwrap();
    assert!(sii.checksum_valid().unwrap());

    let bytes = sii.to_bytes().unwrap();
    assert_eq!(bytes[0x0E], crc);
    assert_eq!(bytes[0x0F], 0);
    assert!(Sii::from_bytes(&bytes).unwrap().checksum_valid().unwrap());
}

/// The text dump lists present categories and passthrough sizes.
#[test]
fn test_render_document() {
    let sii = Sii::from_bytes(&sample_image()).unwrap();
    let text = sii.to_string();

    for header in ["== INFO ==", "== STRINGS ==", "== GENERAL ==", "== FMMU ==", "== SYNCM ==", "== TXPDO ==", "== DC =="] {
        assert!(text.contains(header), "missing {header}");
    }
    assert!(!text.contains("== RXPDO =="));
    assert!(text.contains("configured_alias: 4660(0x1234)"));
    assert!(text.contains("0: EK1100"));
    assert!(text.contains("TXPDO ==\n8 Bytes"));
    assert!(text.ends_with("== UNKNOWN ==\nCategory 0x0800. 6 Bytes"));
}
