//! Minimal SMBIOS dump synthesis.
//!
//! Produces the same layout as `dmidecode --dump-bin` from the two files the
//! kernel exposes under `/sys/firmware/dmi/tables`: the entry point structure
//! padded to 32 bytes, followed by the structure table. The entry point's
//! table address is rewritten to 0x20 (where the table sits in the dump) and
//! its checksums are recomputed; nothing else is touched.
//!
//! Two entry point formats exist:
//!
//! | format     | anchor  | size | table length     | table address    | checksums                |
//! |------------|---------|------|------------------|------------------|--------------------------|
//! | SMBIOS 2.x | `_SM_`  | 0x1F | u16 @ 0x16       | u32 @ 0x18       | 0x15 over 0x10..0x1F, 0x04 over EPS |
//! | SMBIOS 3.x | `_SM3_` | 0x18 | u32 max @ 0x0C   | u64 @ 0x10       | 0x05 over EPS            |

use std::fs;
use std::path::Path;

use log::debug;

use crate::constants::{
    DMI_TABLES_DIR, SMBIOS2_ANCHOR, SMBIOS2_EPS_LEN, SMBIOS3_ANCHOR, SMBIOS3_EPS_LEN, SMBIOS_DUMP_HEADER_LEN,
    SMBIOS_DUMP_TABLE_ADDRESS,
};
use crate::error::SynthesisError;

/// Entry point format, identified by its anchor string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointKind {
    /// 32-bit entry point, SMBIOS 2.1 through 2.8
    Legacy,
    /// 64-bit entry point, SMBIOS 3.0 and later
    Smbios3,
}

impl EntryPointKind {
    pub fn detect(entry_point: &[u8]) -> Option<Self> {
        if entry_point.starts_with(SMBIOS3_ANCHOR) {
            Some(EntryPointKind::Smbios3)
        } else if entry_point.starts_with(SMBIOS2_ANCHOR) {
            Some(EntryPointKind::Legacy)
        } else {
            None
        }
    }
}

/// Two's complement of the byte sum, so the range sums to zero mod 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    sum.wrapping_neg()
}

/// Build a dump from an entry point and the raw table bytes.
///
/// The table is truncated or zero-padded to the length the entry point
/// declares.
pub fn synthesize_dump(entry_point: &[u8], table: &[u8]) -> Result<Vec<u8>, SynthesisError> {
    let kind = EntryPointKind::detect(entry_point).ok_or(SynthesisError::UnrecognizedHeader)?;
    let mut header = [0u8; SMBIOS_DUMP_HEADER_LEN];

    let table_len = match kind {
        EntryPointKind::Legacy => {
            require_len(entry_point, SMBIOS2_EPS_LEN)?;
            // SMBIOS 2.1 errata: some firmware reports 0x1E for a 0x1F structure
            let eps_len = match entry_point[0x05] {
                0x1E => SMBIOS2_EPS_LEN,
                len => usize::from(len),
            };
            if !(SMBIOS2_EPS_LEN..=SMBIOS_DUMP_HEADER_LEN).contains(&eps_len) {
                return Err(SynthesisError::InvalidHeaderLength(entry_point[0x05]));
            }
            require_len(entry_point, eps_len)?;
            header[..eps_len].copy_from_slice(&entry_point[..eps_len]);

            header[0x18..0x1C].copy_from_slice(&SMBIOS_DUMP_TABLE_ADDRESS.to_le_bytes());
            header[0x15] = 0;
            header[0x15] = checksum(&header[0x10..0x1F]);
            header[0x04] = 0;
            header[0x04] = checksum(&header[..eps_len]);

            usize::from(u16::from_le_bytes([header[0x16], header[0x17]]))
        }
        EntryPointKind::Smbios3 => {
            require_len(entry_point, SMBIOS3_EPS_LEN)?;
            let eps_len = usize::from(entry_point[0x06]);
            if !(SMBIOS3_EPS_LEN..=SMBIOS_DUMP_HEADER_LEN).contains(&eps_len) {
                return Err(SynthesisError::InvalidHeaderLength(entry_point[0x06]));
            }
            require_len(entry_point, eps_len)?;
            header[..eps_len].copy_from_slice(&entry_point[..eps_len]);

            header[0x10..0x18].copy_from_slice(&u64::from(SMBIOS_DUMP_TABLE_ADDRESS).to_le_bytes());
            header[0x05] = 0;
            header[0x05] = checksum(&header[..eps_len]);

            u32::from_le_bytes([header[0x0C], header[0x0D], header[0x0E], header[0x0F]]) as usize
        }
    };

    debug!(
        "Synthesized {:?} SMBIOS dump: table {} bytes declared, {} available",
        kind,
        table_len,
        table.len()
    );

    let mut dump = Vec::with_capacity(SMBIOS_DUMP_HEADER_LEN + table_len);
    dump.extend_from_slice(&header);
    let available = table.len().min(table_len);
    dump.extend_from_slice(&table[..available]);
    dump.resize(SMBIOS_DUMP_HEADER_LEN + table_len, 0);
    Ok(dump)
}

fn require_len(entry_point: &[u8], expected: usize) -> Result<(), SynthesisError> {
    if entry_point.len() < expected {
        return Err(SynthesisError::TruncatedHeader {
            expected,
            actual: entry_point.len(),
        });
    }
    Ok(())
}

/// Read the kernel's SMBIOS exports below `root` and synthesize a dump.
pub fn load_sysfs_dump(root: &Path) -> Result<Vec<u8>, SynthesisError> {
    let dir = root.join(DMI_TABLES_DIR);
    if !dir.is_dir() {
        return Err(SynthesisError::TablesDirMissing(dir));
    }

    let entry_point_path = dir.join("smbios_entry_point");
    let entry_point = fs::read(&entry_point_path).map_err(|_| SynthesisError::EntryPointMissing(entry_point_path))?;

    let table_path = dir.join("DMI");
    let table = fs::read(&table_path).map_err(|_| SynthesisError::TableMissing(table_path))?;

    synthesize_dump(&entry_point, &table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fake_sysroot;
    use proptest::prelude::*;

    /// A legacy entry point as firmware would publish it.
    fn legacy_entry_point(table_len: u16, table_addr: u32) -> Vec<u8> {
        let mut ep = vec![0u8; SMBIOS2_EPS_LEN];
        ep[..4].copy_from_slice(b"_SM_");
        ep[0x05] = 0x1F;
        ep[0x06] = 2;
        ep[0x07] = 8;
        ep[0x08..0x0A].copy_from_slice(&0x00C0u16.to_le_bytes());
        ep[0x10..0x15].copy_from_slice(b"_DMI_");
        ep[0x16..0x18].copy_from_slice(&table_len.to_le_bytes());
        ep[0x18..0x1C].copy_from_slice(&table_addr.to_le_bytes());
        ep[0x1C..0x1E].copy_from_slice(&42u16.to_le_bytes());
        ep[0x1E] = 0x28;
        ep[0x15] = checksum(&ep[0x10..0x1F]);
        ep[0x04] = checksum(&ep[..0x1F]);
        ep
    }

    fn smbios3_entry_point(table_max: u32, table_addr: u64) -> Vec<u8> {
        let mut ep = vec![0u8; SMBIOS3_EPS_LEN];
        ep[..5].copy_from_slice(b"_SM3_");
        ep[0x06] = 0x18;
        ep[0x07] = 3;
        ep[0x08] = 4;
        ep[0x0A] = 1;
        ep[0x0C..0x10].copy_from_slice(&table_max.to_le_bytes());
        ep[0x10..0x18].copy_from_slice(&table_addr.to_le_bytes());
        ep[0x05] = checksum(&ep);
        ep
    }

    fn byte_sum(bytes: &[u8]) -> u8 {
        bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    #[test]
    fn test_legacy_dump_layout() {
        let table: Vec<u8> = (0..64u8).collect();
        let dump = synthesize_dump(&legacy_entry_point(64, 0x000F_0000), &table).unwrap();

        assert_eq!(dump.len(), 32 + 64);
        assert_eq!(&dump[32..], &table[..]);
        assert_eq!(&dump[0x18..0x1C], &0x20u32.to_le_bytes());
        assert_eq!(byte_sum(&dump[..0x1F]), 0);
        assert_eq!(byte_sum(&dump[0x10..0x1F]), 0);
        // untouched fields
        assert_eq!(&dump[0x10..0x15], b"_DMI_");
        assert_eq!(&dump[0x1C..0x1E], &42u16.to_le_bytes());
        assert_eq!(dump[0x1F], 0);
    }

    #[test]
    fn test_legacy_table_padded_and_truncated() {
        let short = synthesize_dump(&legacy_entry_point(100, 0xE0000), &[0xAA; 10]).unwrap();
        assert_eq!(short.len(), 32 + 100);
        assert!(short[32..42].iter().all(|b| *b == 0xAA));
        assert!(short[42..].iter().all(|b| *b == 0));

        let long = synthesize_dump(&legacy_entry_point(16, 0xE0000), &[0xBB; 500]).unwrap();
        assert_eq!(long.len(), 32 + 16);
    }

    #[test]
    fn test_smbios3_dump() {
        let table = vec![0x11u8; 300];
        let dump = synthesize_dump(&smbios3_entry_point(256, 0x7FFF_0000_1234), &table).unwrap();

        assert_eq!(dump.len(), 32 + 256);
        assert_eq!(&dump[0x10..0x18], &0x20u64.to_le_bytes());
        assert_eq!(byte_sum(&dump[..0x18]), 0);
        assert_eq!(&dump[0x0C..0x10], &256u32.to_le_bytes());
        assert!(dump[0x18..32].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_legacy_errata_length() {
        let mut ep = legacy_entry_point(8, 0xF0000);
        ep[0x05] = 0x1E;
        let dump = synthesize_dump(&ep, &[1; 8]).unwrap();

        assert_eq!(dump[0x05], 0x1E);
        assert_eq!(byte_sum(&dump[..0x1F]), 0);
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert_eq!(synthesize_dump(b"RSD PTR junk", &[]), Err(SynthesisError::UnrecognizedHeader));
        assert_eq!(
            synthesize_dump(b"_SM_\0\0", &[]),
            Err(SynthesisError::TruncatedHeader { expected: 0x1F, actual: 6 })
        );

        let mut ep = smbios3_entry_point(10, 0);
        ep[0x06] = 0x40;
        assert_eq!(synthesize_dump(&ep, &[]), Err(SynthesisError::InvalidHeaderLength(0x40)));
    }

    #[test]
    fn test_load_from_sysfs() {
        let ep = smbios3_entry_point(4, 0x1000);
        let root = fake_sysroot(&[
            ("sys/firmware/dmi/tables/smbios_entry_point", ep.as_slice()),
            ("sys/firmware/dmi/tables/DMI", &[9u8, 9, 9, 9][..]),
        ]);

        let dump = load_sysfs_dump(root.path()).unwrap();
        assert_eq!(&dump[32..], &[9, 9, 9, 9]);
    }

    #[test]
    fn test_load_reports_missing_pieces() {
        let empty = fake_sysroot(&[]);
        assert!(matches!(load_sysfs_dump(empty.path()), Err(SynthesisError::TablesDirMissing(_))));

        let no_table = fake_sysroot(&[("sys/firmware/dmi/tables/smbios_entry_point", &b"_SM3_"[..])]);
        assert!(matches!(load_sysfs_dump(no_table.path()), Err(SynthesisError::TableMissing(_))));

        let no_ep = fake_sysroot(&[("sys/firmware/dmi/tables/DMI", &b"table"[..])]);
        assert!(matches!(load_sysfs_dump(no_ep.path()), Err(SynthesisError::EntryPointMissing(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Legacy checksums close over their ranges and the table region is
        /// exactly the declared length, whatever the source table size.
        #[test]
        fn prop_legacy_checksums_and_length(
            table_len in 0u16..2048,
            table_addr in any::<u32>(),
            structures in any::<u16>(),
            table in proptest::collection::vec(any::<u8>(), 0..4096),
        ) {
            let mut ep = legacy_entry_point(table_len, table_addr);
            ep[0x1C..0x1E].copy_from_slice(&structures.to_le_bytes());
            let dump = synthesize_dump(&ep, &table).unwrap();

            prop_assert_eq!(byte_sum(&dump[..0x1F]), 0);
            prop_assert_eq!(byte_sum(&dump[0x10..0x1F]), 0);
            prop_assert_eq!(dump.len() - 32, usize::from(table_len));
            let copied = table.len().min(usize::from(table_len));
            prop_assert_eq!(&dump[32..32 + copied], &table[..copied]);
            prop_assert!(dump[32 + copied..].iter().all(|b| *b == 0));
        }

        #[test]
        fn prop_smbios3_checksum(table_max in 0u32..8192, table_addr in any::<u64>()) {
            let dump = synthesize_dump(&smbios3_entry_point(table_max, table_addr), &[]).unwrap();
            prop_assert_eq!(byte_sum(&dump[..0x18]), 0);
            prop_assert_eq!(dump.len(), 32 + table_max as usize);
        }
    }
}
