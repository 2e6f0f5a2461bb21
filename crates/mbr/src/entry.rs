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

use core::fmt::{Display, Formatter};

use crate::{BOOTABLE, PARTITION_ENTRY_SIZE};

/// # Partition Entry
/// One 16-byte slot of the MBR partition table.
///
/// Only the fields the installer cares about get accessors; the CHS
/// addresses at bytes 1..4 and 5..8 are carried along untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionEntry {
    raw: [u8; PARTITION_ENTRY_SIZE],
}

impl PartitionEntry {
    pub const BOOT_INDICATOR: usize = 0;
    pub const PARTITION_TYPE: usize = 4;
    pub const START_SECTOR: usize = 8;
    pub const SECTOR_COUNT: usize = 12;

    pub const fn new(raw: [u8; PARTITION_ENTRY_SIZE]) -> Self {
        Self { raw }
    }

    pub const fn as_bytes(&self) -> &[u8; PARTITION_ENTRY_SIZE] {
        &self.raw
    }

    pub const fn boot_indicator(&self) -> u8 {
        self.raw[Self::BOOT_INDICATOR]
    }

    pub const fn partition_type(&self) -> u8 {
        self.raw[Self::PARTITION_TYPE]
    }

    /// An entry is in use iff its type byte is nonzero.
    pub const fn is_present(&self) -> bool {
        self.partition_type() != 0
    }

    /// Only the exact `0x80` value counts, other nonzero values are not active.
    pub const fn is_bootable(&self) -> bool {
        self.boot_indicator() == BOOTABLE
    }

    /// First sector address, in on-disk (little-endian) byte order.
    pub fn start_sector_bytes(&self) -> [u8; 4] {
        self.field(Self::START_SECTOR)
    }

    /// Sector count, in on-disk (little-endian) byte order.
    pub fn sector_count_bytes(&self) -> [u8; 4] {
        self.field(Self::SECTOR_COUNT)
    }

    pub fn start_lba(&self) -> u32 {
        u32::from_le_bytes(self.start_sector_bytes())
    }

    pub fn sector_count(&self) -> u32 {
        u32::from_le_bytes(self.sector_count_bytes())
    }

    fn field(&self, offset: usize) -> [u8; 4] {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.raw[offset..offset + 4]);
        bytes
    }
}

/// # Found Partition
/// A present entry together with its slot in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoundPartition {
    pub index: usize,
    pub entry: PartitionEntry,
}

fn write_hex(f: &mut Formatter<'_>, bytes: &[u8]) -> core::fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }

    Ok(())
}

impl Display for FoundPartition {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Found partition {}, begin: 0x", self.index)?;
        write_hex(f, &self.entry.start_sector_bytes())?;
        f.write_str(", length: 0x")?;
        write_hex(f, &self.entry.sector_count_bytes())?;
        write!(
            f,
            ", type: 0x{:02x}, boot: 0x{:02x}",
            self.entry.partition_type(),
            self.entry.boot_indicator()
        )
    }
}
