/*
  ____                 __               __   _ __
 / __ \__ _____ ____  / /___ ____ _    / /  (_) /
/ /_/ / // / _ `/ _ \/ __/ // /  ' \  / /__/ / _ \
\___\_\_,_/\_,_/_//_/\__/\_,_/_/_/_/ /____/_/_.__/
    Part of the Quantum OS Project

Copyright 2025 Gavin Kellam

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

//! # MBR
//! Byte layout of a Master Boot Record and the partition scan the boot
//! installer runs over it. Nothing in here touches files, callers hand in
//! the first sector of a disk or a bootloader binary.

use thiserror::Error;

mod entry;

pub use entry::{FoundPartition, PartitionEntry};

pub const SECTOR_SIZE: usize = 512;
pub const BOOTSTRAP_CODE_SIZE: usize = 440;
pub const DISK_SIGNATURE_OFFSET: usize = 440;
pub const PARTITION_TABLE_OFFSET: usize = 446;
pub const PARTITION_ENTRY_SIZE: usize = 16;
pub const PARTITION_ENTRY_COUNT: usize = 4;
pub const BOOT_SIGNATURE_OFFSET: usize = 510;
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Boot indicator value of the active partition.
pub const BOOTABLE: u8 = 0x80;

/// Bootloader code beyond the first sector lives in `[512, 1MiB)`, the
/// partitions themselves start at 1MiB.
pub const PARTITION_DATA_OFFSET: u64 = 1 << 20;
pub const MAX_BOOTLOADER_SIZE: u64 = PARTITION_DATA_OFFSET;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum MbrError {
    #[error("expected a 512 byte sector, only got {0} bytes")]
    SectorTooShort(usize),
    #[error("boot signature is {}, expected 55aa", signature_hex(.0))]
    InvalidSignature([u8; 2]),
}

fn signature_hex(signature: &[u8; 2]) -> String {
    format!("{:02x}{:02x}", signature[0], signature[1])
}

/// Offset of the boot indicator byte of partition `index` within the sector.
pub const fn boot_indicator_offset(index: usize) -> usize {
    PARTITION_TABLE_OFFSET + index * PARTITION_ENTRY_SIZE + PartitionEntry::BOOT_INDICATOR
}

/// # Master Boot Record
/// A validated copy of a 512-byte boot sector.
#[derive(Clone, Debug)]
pub struct MasterBootRecord {
    sector: [u8; SECTOR_SIZE],
}

impl TryFrom<&[u8]> for MasterBootRecord {
    type Error = MbrError;

    /// Takes the first sector of `value`. Anything past 512 bytes is ignored.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let sector: [u8; SECTOR_SIZE] = value
            .get(..SECTOR_SIZE)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(MbrError::SectorTooShort(value.len()))?;

        let signature = [
            sector[BOOT_SIGNATURE_OFFSET],
            sector[BOOT_SIGNATURE_OFFSET + 1],
        ];

        if signature != BOOT_SIGNATURE {
            return Err(MbrError::InvalidSignature(signature));
        }

        Ok(Self { sector })
    }
}

impl MasterBootRecord {
    pub const fn as_bytes(&self) -> &[u8; SECTOR_SIZE] {
        &self.sector
    }

    pub fn bootstrap_code(&self) -> &[u8] {
        &self.sector[..BOOTSTRAP_CODE_SIZE]
    }

    /// Disk signature, partition table and boot signature, `[440, 512)`.
    pub fn partition_table_region(&self) -> &[u8] {
        &self.sector[DISK_SIGNATURE_OFFSET..]
    }

    pub fn entry(&self, index: usize) -> Option<PartitionEntry> {
        if index >= PARTITION_ENTRY_COUNT {
            return None;
        }

        let offset = PARTITION_TABLE_OFFSET + index * PARTITION_ENTRY_SIZE;
        let mut raw = [0; PARTITION_ENTRY_SIZE];
        raw.copy_from_slice(&self.sector[offset..offset + PARTITION_ENTRY_SIZE]);

        Some(PartitionEntry::new(raw))
    }

    pub fn entries(&self) -> impl Iterator<Item = PartitionEntry> + '_ {
        (0..PARTITION_ENTRY_COUNT).filter_map(|index| self.entry(index))
    }

    /// Walk the four entries and collect what the installer needs to know.
    pub fn scan(&self) -> PartitionScan {
        let found = self
            .entries()
            .enumerate()
            .filter(|(_, entry)| entry.is_present())
            .map(|(index, entry)| FoundPartition { index, entry })
            .collect();

        PartitionScan { found }
    }
}

/// # Partition Scan
/// Present partitions of an image, in table order.
///
/// Several bootable entries are accepted as is, only the existence of one
/// is checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionScan {
    found: Vec<FoundPartition>,
}

impl PartitionScan {
    pub fn found(&self) -> &[FoundPartition] {
        &self.found
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn first_present(&self) -> Option<usize> {
        self.found.first().map(|found| found.index)
    }

    pub fn bootable_found(&self) -> bool {
        self.found.iter().any(|found| found.entry.is_bootable())
    }

    /// The entry that should get the boot flag: the first present one, but
    /// only when nothing is marked bootable yet.
    pub fn activation_target(&self) -> Option<usize> {
        if self.bootable_found() {
            None
        } else {
            self.first_present()
        }
    }
}
