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

use anyhow::{Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use mbr::{
    BOOTABLE, BOOTSTRAP_CODE_SIZE, DISK_SIGNATURE_OFFSET, MAX_BOOTLOADER_SIZE, MasterBootRecord,
    MbrError, PARTITION_DATA_OFFSET, PartitionScan, SECTOR_SIZE, boot_indicator_offset,
};
use owo_colors::OwoColorize;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

use crate::status_println;

/// # Bytes to read at a time
/// Chunk size used when copying the partition data region of an image into
/// a separate output file.
const BYTES_TO_READ_AT_A_TIME: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Bootloader binary file is too large!")]
    BootloaderTooLarge { size: u64 },
    #[error("Invalid bootloader MBR!")]
    InvalidBootloader(#[source] MbrError),
    #[error("Invalid Image!")]
    InvalidImage(#[source] MbrError),
}

/// # Bootloader
/// A bootloader binary whose first sector carries a valid boot signature.
/// Bytes past the first sector are the extended code that goes to image
/// offset 512.
#[derive(Clone, Debug)]
pub struct Bootloader {
    mbr: MasterBootRecord,
    data: Vec<u8>,
}

impl Bootloader {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, InstallError> {
        if data.len() as u64 > MAX_BOOTLOADER_SIZE {
            return Err(InstallError::BootloaderTooLarge {
                size: data.len() as u64,
            });
        }

        let mbr = MasterBootRecord::try_from(data.as_slice())
            .map_err(InstallError::InvalidBootloader)?;

        Ok(Self { mbr, data })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read(path)
            .with_context(|| anyhow!("Could not read bootloader '{}'", path.display()))?;

        Ok(Self::from_bytes(data)?)
    }

    pub fn bootstrap_code(&self) -> &[u8] {
        self.mbr.bootstrap_code()
    }

    pub fn extended_code(&self) -> &[u8] {
        &self.data[SECTOR_SIZE..]
    }
}

/// Read and validate the first sector of `image`, then report its partitions.
pub fn scan_image(image: &Path) -> anyhow::Result<PartitionScan> {
    let image_file = File::open(image)
        .with_context(|| anyhow!("Could not open image '{}'", image.display()))?;

    let mut sector = Vec::with_capacity(SECTOR_SIZE);
    (&image_file)
        .take(SECTOR_SIZE as u64)
        .read_to_end(&mut sector)
        .with_context(|| anyhow!("Could not read the MBR of '{}'", image.display()))?;

    let mbr = MasterBootRecord::try_from(sector.as_slice()).map_err(InstallError::InvalidImage)?;
    let scan = mbr.scan();

    for found in scan.found() {
        status_println!("{}", found);
    }

    if scan.is_empty() {
        status_println!("{}", "WARNING: no partition found".yellow().bold());
    }

    Ok(scan)
}

fn is_same_file(image: &Path, output: &Path) -> bool {
    if image == output {
        return true;
    }

    match (image.canonicalize(), output.canonicalize()) {
        (Ok(image), Ok(output)) => image == output,
        _ => false,
    }
}

/// # Destination Writer
/// Writes an installed bootloader into its destination.
///
/// When the destination is a separate file, `source` is the original image
/// and the partition table and data regions are copied over from it. When
/// installing in place there is no source, and those copies do nothing.
pub struct DestinationWriter {
    destination: File,
    source: Option<File>,
}

impl DestinationWriter {
    pub fn open(image: &Path, output: Option<&Path>) -> anyhow::Result<Self> {
        let copy_target = output.filter(|output| !is_same_file(image, output));

        let Some(output) = copy_target else {
            let destination = OpenOptions::new()
                .read(true)
                .write(true)
                .open(image)
                .with_context(|| anyhow!("Could not open image '{}'", image.display()))?;

            return Ok(Self {
                destination,
                source: None,
            });
        };

        let source = File::open(image)
            .with_context(|| anyhow!("Could not open image '{}'", image.display()))?;
        let destination = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(output)
            .with_context(|| anyhow!("Could not open output '{}'", output.display()))?;

        Ok(Self {
            destination,
            source: Some(source),
        })
    }

    pub fn is_in_place(&self) -> bool {
        self.source.is_none()
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> anyhow::Result<()> {
        self.destination.seek(SeekFrom::Start(offset))?;
        self.destination
            .write_all(data)
            .with_context(|| anyhow!("Failed to write {} bytes at offset {}", data.len(), offset))
    }

    /// Copy `[offset, offset + len)` of the source image, or everything from
    /// `offset` to the end when `len` is `None`. Returns the bytes copied.
    fn copy_from_source(
        &mut self,
        message: &str,
        offset: u64,
        len: Option<u64>,
    ) -> anyhow::Result<u64> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };

        status_println!("{}", message);

        let source_len = source.metadata()?.len();
        let available = source_len.saturating_sub(offset);
        let len = len.map_or(available, |len| len.min(available));

        source.seek(SeekFrom::Start(offset))?;
        self.destination.seek(SeekFrom::Start(offset))?;

        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )?
            .progress_chars("##-"),
        );

        let mut image_buffer = vec![0_u8; BYTES_TO_READ_AT_A_TIME];
        let mut reader = source.take(len);
        let mut copied = 0;
        loop {
            match reader.read(&mut image_buffer) {
                Ok(0) => break,
                Ok(n) => {
                    bar.inc(n as u64);
                    self.destination.write_all(&image_buffer[..n])?;
                    copied += n as u64;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        bar.finish_and_clear();

        Ok(copied)
    }

    /// Install `bootloader`, keeping the partition table described by `scan`.
    ///
    /// The boot flag is written after the partition table copy, otherwise the
    /// copy would undo it. Returns the entry that was marked bootable, if any.
    pub fn install(
        &mut self,
        bootloader: &Bootloader,
        scan: &PartitionScan,
    ) -> anyhow::Result<Option<usize>> {
        self.write_at(0, bootloader.bootstrap_code())
            .context("Failed to install MBR")?;
        status_println!("Installing MBR");

        self.copy_from_source(
            "Copying partition table",
            DISK_SIGNATURE_OFFSET as u64,
            Some((SECTOR_SIZE - BOOTSTRAP_CODE_SIZE) as u64),
        )
        .context("Failed to copy partition table")?;

        let activated = scan.activation_target();
        if let Some(index) = activated {
            self.write_at(boot_indicator_offset(index) as u64, &[BOOTABLE])
                .context("Failed to set boot flag")?;
            status_println!("No bootable partition found, setting first partition to bootable");
        }

        self.write_at(SECTOR_SIZE as u64, bootloader.extended_code())
            .context("Failed to install bootloader")?;
        status_println!("Installing bootloader");

        self.copy_from_source("Copying partitions", PARTITION_DATA_OFFSET, None)
            .context("Failed to copy partitions")?;

        self.destination.sync_all()?;

        Ok(activated)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallReport {
    pub scan: PartitionScan,
    pub activated: Option<usize>,
    pub in_place: bool,
}

/// Install `binary` into `image`, or into `output` when it names another file.
///
/// All validation happens before the destination is opened, so a rejected
/// bootloader or image leaves the destination untouched.
pub fn install_bootloader(
    image: &Path,
    binary: &Path,
    output: Option<&Path>,
) -> anyhow::Result<InstallReport> {
    let boot_size = fs::metadata(binary)
        .with_context(|| anyhow!("Could not stat bootloader '{}'", binary.display()))?
        .len();
    let image_size = fs::metadata(image)
        .with_context(|| anyhow!("Could not stat image '{}'", image.display()))?
        .len();

    status_println!("Boot binary size: {}", boot_size);
    status_println!("Image size: {}", image_size);

    if boot_size > MAX_BOOTLOADER_SIZE {
        return Err(InstallError::BootloaderTooLarge { size: boot_size }.into());
    }

    let scan = scan_image(image)?;
    let bootloader = Bootloader::load(binary)?;

    let mut writer = DestinationWriter::open(image, output)?;
    let activated = writer.install(&bootloader, &scan)?;

    status_println!("{}", "Bootloader install complete!".green().bold());

    Ok(InstallReport {
        scan,
        activated,
        in_place: writer.is_in_place(),
    })
}
