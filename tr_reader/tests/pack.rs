mod common;

use common::{tr1_level, Builder, PaletteAt, Recorder};
use tr_reader::{pack::NUM_SLOTS, version::Variant, Level, LoadOptions};

/// Pack with `parts` in the given slots, laid out back to back after the slot table.
fn pack(parts: &[(usize, &[u8])]) -> Vec<u8> {
	let mut b = Builder::default();
	b.u32(0);
	let mut start = 4 + NUM_SLOTS * 8;
	for slot in 0..NUM_SLOTS {
		match parts.iter().find(|(s, _)| *s == slot) {
			Some((_, data)) => {
				b.u32(start as u32).u32(data.len() as u32);
				start += data.len();
			},
			None => {
				b.u32(0).u32(0);
			},
		}
	}
	for slot in 0..NUM_SLOTS {
		if let Some((_, data)) = parts.iter().find(|(s, _)| *s == slot) {
			b.bytes(data);
		}
	}
	b.data
}

#[test]
fn parts_are_previewed() {
	let level = tr1_level(PaletteAt::Retail);
	let data = pack(&[(3, &level), (7, b"junk")]);
	let mut recorder = Recorder::default();
	let loaded = Level::load_from_bytes(&data, "DEMO", None, &LoadOptions::default(), &(), &mut recorder).unwrap();
	assert_eq!(loaded.variant(), Variant::Pack);
	assert!(recorder.sounds.is_empty() && recorder.textiles.is_empty());

	let pack = loaded.pack().unwrap();
	assert_eq!(pack.name(), "DEMO");
	assert_eq!(pack.parts().len(), 2);
	let part = &pack.parts()[0];
	assert_eq!(part.slot, 3);
	assert_eq!(part.size as usize, level.len());
	assert_eq!(part.version.map(|v| v.variant()), Some(Variant::Tr1Pc));

	let preview = pack.part_level(0).unwrap();
	assert_eq!(preview.name(), "DEMO:3");
	assert_eq!(preview.num_rooms(), 1);
	assert_eq!(preview.num_sound_samples(), 0, "previews skip sounds");
	assert!(pack.parts()[1].version.is_none());
	assert!(pack.part_level(1).is_none());
}

#[test]
fn part_opens_with_sounds() {
	let level = tr1_level(PaletteAt::Retail);
	let data = pack(&[(0, &level)]);
	let loaded = Level::load_from_bytes(&data, "DEMO", None, &LoadOptions::default(), &(), &mut ()).unwrap();
	let mut recorder = Recorder::default();
	let part = loaded.pack().unwrap().open_part(0, &LoadOptions::default(), &(), &mut recorder).unwrap().unwrap();
	assert_eq!(part.num_entities(), 1);
	assert_eq!(recorder.sounds.len(), 1);
	assert!(loaded.pack().unwrap().open_part(1, &LoadOptions::default(), &(), &mut recorder).is_none());
}

#[test]
fn corrupt_part_has_no_preview() {
	let level = tr1_level(PaletteAt::Retail);
	let cut = &level[..level.len() / 2];
	let data = pack(&[(0, &level), (1, cut)]);
	let loaded = Level::load_from_bytes(&data, "DEMO", None, &LoadOptions::default(), &(), &mut ()).unwrap();
	let pack = loaded.pack().unwrap();
	assert_eq!(pack.parts().len(), 2);
	assert_eq!(pack.parts()[1].version.map(|v| v.variant()), Some(Variant::Tr1Pc));
	assert_eq!(pack.part_level(0).map(Level::num_entities), Some(1));
	assert!(pack.part_level(1).is_none());
}
