mod common;

use std::{collections::HashMap, io::Write, path::PathBuf};
use common::{tr1_level, PaletteAt, Recorder};
use flate2::{write::ZlibEncoder, Compression};
use proptest::prelude::*;
use tr_reader::{files::DiskFiles, Level, LoadOptions, Reader};

#[test]
fn level_loads_from_disk_named_by_stem() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("LEVEL2.PHD");
	std::fs::write(&path, tr1_level(PaletteAt::Retail)).unwrap();
	let mut recorder = Recorder::default();
	let level = Level::load(&path, &LoadOptions::default(), &mut recorder).unwrap();
	assert_eq!(level.name(), "LEVEL2");
	assert_eq!(level.num_rooms(), 1);
	assert_eq!(recorder.textiles.len(), 1);
}

#[test]
fn missing_file_is_io() {
	let dir = tempfile::tempdir().unwrap();
	let error = Level::load_with(&DiskFiles, dir.path().join("GONE.PHD"), &LoadOptions::default(), &mut ()).unwrap_err();
	assert!(matches!(error, tr_reader::Error::Io(_)));
}

#[test]
fn level_loads_from_memory_files() {
	let mut files = HashMap::new();
	files.insert(PathBuf::from("data/LEVEL3.PHD"), tr1_level(PaletteAt::Retail));
	let level = Level::load_with(&files, "data/LEVEL3.PHD", &LoadOptions::default(), &mut ()).unwrap();
	assert_eq!(level.name(), "LEVEL3");
	assert_eq!(level.num_entities(), 1);
}

fn compressed_block(data: &[u8], declared: usize) -> Vec<u8> {
	let mut encoder = ZlibEncoder::new(vec![], Compression::default());
	encoder.write_all(data).unwrap();
	let compressed = encoder.finish().unwrap();
	let mut block = vec![];
	block.extend_from_slice(&(declared as u32).to_le_bytes());
	block.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
	block.extend_from_slice(&compressed);
	block.push(0xaa);
	block
}

#[test]
fn zlib_blocks_inflate() {
	let data = (0..5000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>();
	let block = compressed_block(&data, data.len());
	let mut reader = Reader::new(&block);
	assert_eq!(reader.read_compressed().unwrap(), data);
	assert_eq!(reader.read::<u8>().unwrap(), 0xaa);

	let mut reader = Reader::new(&block);
	reader.skip_compressed().unwrap();
	assert_eq!(reader.read::<u8>().unwrap(), 0xaa);
}

#[test]
fn zlib_block_of_the_wrong_length_fails() {
	let block = compressed_block(&[1; 100], 99);
	let error = Reader::new(&block).read_compressed().unwrap_err();
	assert!(matches!(error, tr_reader::Error::Decompression { offset: 8, .. }));

	let mut garbage = vec![];
	garbage.extend_from_slice(&16u32.to_le_bytes());
	garbage.extend_from_slice(&4u32.to_le_bytes());
	garbage.extend_from_slice(&[1, 2, 3, 4]);
	assert!(Reader::new(&garbage).read_compressed().is_err());
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	#[test]
	fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..8192)) {
		let _ = Level::load_from_bytes(&data, "FUZZ", None, &LoadOptions::default(), &(), &mut ());
	}

	#[test]
	fn cut_levels_fail_cleanly(cut in 0usize..70_000) {
		let data = tr1_level(PaletteAt::Retail);
		let cut = cut.min(data.len() - 1);
		prop_assert!(Level::load_from_bytes(&data[..cut], "CUT", None, &LoadOptions::default(), &(), &mut ()).is_err());
	}
}
