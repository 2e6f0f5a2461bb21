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

use mbrman::{CHS, MBR, MBRPartitionEntry};
use meta_tools::install::{InstallError, install_bootloader};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const IMAGE_SIZE: u64 = 4 * 1024 * 1024;
const PARTITION_DATA: usize = 1 << 20;
const PARTITION_SECTORS: u32 = 1024;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("meta-install-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Build a disk image with `partitions` as (mbrman slot 1..=4, boot flag),
/// and a byte pattern over the partition data region.
fn make_image(path: &Path, partitions: &[(usize, u8)]) -> Vec<u8> {
    let mut disk = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .unwrap();
    disk.set_len(IMAGE_SIZE).unwrap();

    let mut mbr = MBR::new_from(&mut disk, 512, [0xde, 0xad, 0xbe, 0xef]).unwrap();
    for &(slot, boot) in partitions {
        let starting_lba = mbr.find_optimal_place(PARTITION_SECTORS).unwrap();

        mbr[slot] = MBRPartitionEntry {
            boot,
            first_chs: CHS::empty(),
            sys: 0x83,
            last_chs: CHS::empty(),
            starting_lba,
            sectors: PARTITION_SECTORS,
        };
    }
    mbr.write_into(&mut disk).unwrap();

    let pattern: Vec<u8> = (0..IMAGE_SIZE as usize - PARTITION_DATA)
        .map(|i| (i % 253) as u8)
        .collect();
    disk.seek(SeekFrom::Start(PARTITION_DATA as u64)).unwrap();
    disk.write_all(&pattern).unwrap();
    disk.sync_all().unwrap();

    fs::read(path).unwrap()
}

fn make_bootloader(path: &Path, len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
    data[510] = 0x55;
    data[511] = 0xAA;
    fs::write(path, &data).unwrap();
    data
}

fn boot_flag(image: &[u8], index: usize) -> u8 {
    image[446 + index * 16]
}

#[test]
fn in_place_install_keeps_partition_table() {
    let dir = scratch_dir("in-place");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    let image = make_image(&image_path, &[(1, mbrman::BOOT_ACTIVE)]);
    let boot = make_bootloader(&boot_path, 2048);

    let report = install_bootloader(&image_path, &boot_path, None).unwrap();
    let installed = fs::read(&image_path).unwrap();

    assert!(report.in_place);
    assert_eq!(report.activated, None);
    assert_eq!(report.scan.found().len(), 1);
    assert_eq!(installed.len(), image.len());
    assert_eq!(installed[..440], boot[..440]);
    assert_eq!(installed[440..512], image[440..512]);
    assert_eq!(installed[512..2048], boot[512..]);
    assert_eq!(installed[2048..], image[2048..]);
}

#[test]
fn output_same_as_image_is_in_place() {
    let dir = scratch_dir("same-output");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    make_image(&image_path, &[(1, mbrman::BOOT_ACTIVE)]);
    let boot = make_bootloader(&boot_path, 512);

    let report = install_bootloader(&image_path, &boot_path, Some(&image_path)).unwrap();

    assert!(report.in_place);
    assert_eq!(fs::read(&image_path).unwrap()[..440], boot[..440]);
}

#[test]
fn copy_mode_copies_table_and_partitions() {
    let dir = scratch_dir("copy");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");
    let output_path = dir.join("out.img");

    let image = make_image(&image_path, &[(1, mbrman::BOOT_ACTIVE), (2, mbrman::BOOT_INACTIVE)]);
    let boot = make_bootloader(&boot_path, 8192);

    let report = install_bootloader(&image_path, &boot_path, Some(&output_path)).unwrap();
    let output = fs::read(&output_path).unwrap();

    assert!(!report.in_place);
    assert_eq!(report.activated, None);
    assert_eq!(output.len(), image.len());
    assert_eq!(output[..440], boot[..440]);
    assert_eq!(output[440..512], image[440..512]);
    assert_eq!(output[512..8192], boot[512..]);
    assert!(output[8192..PARTITION_DATA].iter().all(|&byte| byte == 0));
    assert_eq!(output[PARTITION_DATA..], image[PARTITION_DATA..]);

    // The source image is only read.
    assert_eq!(fs::read(&image_path).unwrap(), image);
}

#[test]
fn first_present_partition_becomes_bootable() {
    let dir = scratch_dir("activate");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    let image = make_image(
        &image_path,
        &[(3, mbrman::BOOT_INACTIVE), (4, mbrman::BOOT_INACTIVE)],
    );
    make_bootloader(&boot_path, 1024);

    let report = install_bootloader(&image_path, &boot_path, None).unwrap();
    let installed = fs::read(&image_path).unwrap();

    assert_eq!(report.scan.first_present(), Some(2));
    assert_eq!(report.activated, Some(2));
    assert_eq!(boot_flag(&installed, 0), 0x00);
    assert_eq!(boot_flag(&installed, 2), 0x80);
    assert_eq!(boot_flag(&installed, 3), 0x00);

    // Nothing else in the table moved.
    let mut expected = image[..512].to_vec();
    expected[446 + 2 * 16] = 0x80;
    assert_eq!(installed[440..512], expected[440..512]);
}

#[test]
fn boot_flag_survives_partition_table_copy() {
    let dir = scratch_dir("activate-copy");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");
    let output_path = dir.join("out.img");

    let image = make_image(&image_path, &[(1, mbrman::BOOT_INACTIVE)]);
    make_bootloader(&boot_path, 512);

    let report = install_bootloader(&image_path, &boot_path, Some(&output_path)).unwrap();
    let output = fs::read(&output_path).unwrap();

    assert_eq!(report.activated, Some(0));
    assert_eq!(boot_flag(&output, 0), 0x80);
    assert_eq!(boot_flag(&image, 0), 0x00);
    assert_eq!(fs::read(&image_path).unwrap(), image);
}

#[test]
fn existing_bootable_partition_is_left_alone() {
    let dir = scratch_dir("already-bootable");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    let image = make_image(
        &image_path,
        &[(1, mbrman::BOOT_INACTIVE), (2, mbrman::BOOT_ACTIVE)],
    );
    make_bootloader(&boot_path, 1024);

    let report = install_bootloader(&image_path, &boot_path, None).unwrap();
    let installed = fs::read(&image_path).unwrap();

    assert_eq!(report.activated, None);
    for index in 0..4 {
        assert_eq!(boot_flag(&installed, index), boot_flag(&image, index));
    }
}

#[test]
fn empty_partition_table_still_installs() {
    let dir = scratch_dir("no-partitions");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    let image = make_image(&image_path, &[]);
    let boot = make_bootloader(&boot_path, 1024);

    let report = install_bootloader(&image_path, &boot_path, None).unwrap();
    let installed = fs::read(&image_path).unwrap();

    assert!(report.scan.is_empty());
    assert_eq!(report.activated, None);
    assert_eq!(installed[..440], boot[..440]);
    assert_eq!(installed[440..512], image[440..512]);
}

#[test]
fn oversized_bootloader_is_rejected_before_writing() {
    let dir = scratch_dir("too-large");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");
    let output_path = dir.join("out.img");

    let image = make_image(&image_path, &[(1, mbrman::BOOT_ACTIVE)]);
    make_bootloader(&boot_path, (1 << 20) + 1);

    let err = install_bootloader(&image_path, &boot_path, Some(&output_path)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<InstallError>(),
        Some(InstallError::BootloaderTooLarge { .. })
    ));
    assert!(!output_path.exists());
    assert_eq!(fs::read(&image_path).unwrap(), image);
}

#[test]
fn largest_bootloader_fits() {
    let dir = scratch_dir("max-size");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    let image = make_image(&image_path, &[(1, mbrman::BOOT_ACTIVE)]);
    let boot = make_bootloader(&boot_path, 1 << 20);

    install_bootloader(&image_path, &boot_path, None).unwrap();
    let installed = fs::read(&image_path).unwrap();

    assert_eq!(installed[512..PARTITION_DATA], boot[512..]);
    assert_eq!(installed[PARTITION_DATA..], image[PARTITION_DATA..]);
}

#[test]
fn image_without_signature_is_rejected() {
    let dir = scratch_dir("bad-image");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");
    let output_path = dir.join("out.img");

    fs::write(&image_path, vec![0_u8; 2 * PARTITION_DATA]).unwrap();
    make_bootloader(&boot_path, 1024);

    let err = install_bootloader(&image_path, &boot_path, Some(&output_path)).unwrap_err();

    assert_eq!(err.to_string(), "Invalid Image!");
    assert!(matches!(
        err.downcast_ref::<InstallError>(),
        Some(InstallError::InvalidImage(_))
    ));
    assert!(!output_path.exists());
    assert!(fs::read(&image_path).unwrap().iter().all(|&byte| byte == 0));
}

#[test]
fn bootloader_without_signature_is_rejected() {
    let dir = scratch_dir("bad-bootloader");
    let image_path = dir.join("disk.img");
    let boot_path = dir.join("boot.bin");

    let image = make_image(&image_path, &[(1, mbrman::BOOT_ACTIVE)]);
    let mut boot = make_bootloader(&boot_path, 1024);
    boot[510] = 0;
    fs::write(&boot_path, &boot).unwrap();

    let err = install_bootloader(&image_path, &boot_path, None).unwrap_err();

    assert_eq!(err.to_string(), "Invalid bootloader MBR!");
    assert_eq!(fs::read(&image_path).unwrap(), image);
}

#[test]
fn missing_image_is_an_error() {
    let dir = scratch_dir("missing");
    let boot_path = dir.join("boot.bin");
    make_bootloader(&boot_path, 512);

    assert!(install_bootloader(&dir.join("nope.img"), &boot_path, None).is_err());
}
