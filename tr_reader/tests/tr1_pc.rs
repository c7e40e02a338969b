mod common;

use common::{empty_tr1_level, tr1_level, PaletteAt, Recorder, ENTITY_TYPE, ROOM_X, SAMPLE};
use tr_reader::{
	version::{Generation, Platform, Variant},
	Level, LoadOptions,
};

fn load(data: &[u8], options: &LoadOptions, recorder: &mut Recorder) -> tr_reader::Result<Level> {
	Level::load_from_bytes(data, "LEVEL1", None, options, &(), recorder)
}

#[test]
fn retail_level_decodes() {
	let mut recorder = Recorder::default();
	let level = load(&tr1_level(PaletteAt::Retail), &LoadOptions::default(), &mut recorder).unwrap();
	assert_eq!(level.name(), "LEVEL1");
	assert_eq!(level.variant(), Variant::Tr1Pc);
	assert_eq!(level.platform(), Platform::Pc);
	assert_eq!(level.generation(), Generation::Tr1);
	assert_eq!(level.num_textiles(), 1);
	assert_eq!(level.num_rooms(), 1);
	assert_eq!(level.num_floor_data(), 2);
	assert_eq!(level.floor_data(1), Some(7));
	assert_eq!(level.num_mesh_pointers(), 2);
	assert_eq!(level.num_models(), 1);
	assert_eq!(level.num_entities(), 1);
	assert_eq!(level.num_cameras(), 0);
	assert_eq!(level.num_sound_samples(), 1);
	assert!(!recorder.progress.is_empty());
}

#[test]
fn empty_level_decodes() {
	let mut recorder = Recorder::default();
	let level = load(&empty_tr1_level(), &LoadOptions::default(), &mut recorder).unwrap();
	assert_eq!(level.num_rooms(), 0);
	assert_eq!(level.num_entities(), 0);
	assert_eq!(level.generation(), Generation::Tr1);
	assert!(level.sound_map().is_empty());
	assert!(recorder.textiles.is_empty() && recorder.sounds.is_empty());
}

#[test]
fn sound_map_runs_up_to_the_details_count() {
	let level = load(&tr1_level(PaletteAt::Retail), &LoadOptions::default(), &mut Recorder::default()).unwrap();
	assert_eq!(level.sound_map().len(), 256);
	assert!(level.sound_map().iter().all(|&entry| entry == -1));
	assert!(level.sound_details().is_empty());
}

#[test]
fn textiles_go_through_the_palette() {
	let mut recorder = Recorder::default();
	load(&tr1_level(PaletteAt::Retail), &LoadOptions::default(), &mut recorder).unwrap();
	assert_eq!(recorder.textiles.len(), 1);
	let textile = &recorder.textiles[0];
	assert_eq!(textile.len(), 256 * 256);
	assert_eq!(textile[0], 0, "index 0 is transparent");
	assert_eq!(textile[1], 0xfffcfcfc);
}

#[test]
fn embedded_sample_is_delivered() {
	let mut recorder = Recorder::default();
	load(&tr1_level(PaletteAt::Retail), &LoadOptions::default(), &mut recorder).unwrap();
	assert_eq!(recorder.sounds, [(0, SAMPLE.to_vec())]);
}

#[test]
fn nothing_is_delivered_when_switched_off() {
	let mut recorder = Recorder::default();
	let options = LoadOptions { sounds: false, textiles: false, variant: None };
	let level = load(&tr1_level(PaletteAt::Retail), &options, &mut recorder).unwrap();
	assert!(recorder.sounds.is_empty());
	assert!(recorder.textiles.is_empty());
	assert_eq!(level.num_textiles(), 1, "textiles are still counted");
	assert_eq!(level.num_sound_samples(), 0);
}

#[test]
fn room_and_entity_fields() {
	let level = load(&tr1_level(PaletteAt::Retail), &LoadOptions::default(), &mut Recorder::default()).unwrap();
	let room = level.room(0).unwrap();
	assert_eq!(room.info.x, ROOM_X);
	assert_eq!(room.vertices.len(), 1);
	assert_eq!((room.num_z_sectors, room.num_x_sectors), (1, 1));
	let sector = room.sectors[0];
	assert_eq!(sector.floor_data_index, 3);
	assert_eq!(sector.room_below, None);
	assert_eq!(sector.floor, -127);
	assert_eq!(room.alternate_room, -1);
	assert!(level.room(1).is_none());

	let entity = level.entity(0).unwrap();
	assert_eq!(entity.type_id, ENTITY_TYPE);
	assert_eq!(entity.pos.x, ROOM_X + 512);
	assert_eq!(entity.intensity1, entity.intensity2);
	assert_eq!(level.mesh_from_type_id(0), 0);
}

#[test]
fn meshes_decode_on_demand() {
	let level = load(&tr1_level(PaletteAt::Retail), &LoadOptions::default(), &mut Recorder::default()).unwrap();
	let model = level.model_by_id(0).unwrap();
	assert_eq!(model.num_meshes, 1);
	assert_eq!(level.mesh_cache().num_cached(), 0);
	let mesh = level.mesh_by_pointer(model.mesh_id as usize).unwrap().unwrap();
	assert_eq!(mesh.coll_radius, 64);
	assert_eq!(mesh.vertices.len(), 1);
	assert!(!mesh.has_normals());
	assert_eq!(mesh.lights, [4096]);
	assert_eq!(mesh.textured_triangles.len(), 1);
	assert_eq!(mesh.num_faces(), 1);
	let again = level.mesh_by_pointer(0).unwrap().unwrap();
	assert!(std::sync::Arc::ptr_eq(&mesh, &again), "both pointers share offset 0");
	assert!(level.mesh_by_pointer(5).unwrap().is_none());
}

#[test]
fn demo_layout_is_retried() {
	let mut recorder = Recorder::default();
	let level = load(&tr1_level(PaletteAt::Demo), &LoadOptions::default(), &mut recorder).unwrap();
	assert!(recorder.progress.iter().any(|p| p == "Attempting to load as TR1 demo"));
	assert_eq!(level.num_entities(), 1);
	assert_eq!(recorder.textiles[0][1], 0xfffcfcfc);
	assert_eq!(recorder.sounds.len(), 1);
}

#[test]
fn cut_file_is_truncated() {
	let data = tr1_level(PaletteAt::Retail);
	let error = load(&data[..data.len() / 2], &LoadOptions::default(), &mut Recorder::default()).unwrap_err();
	assert!(error.is_truncated(), "{}", error);
}

#[test]
fn forced_variant_skips_detection() {
	let options = LoadOptions { variant: Some(Variant::Tr1Pc), ..Default::default() };
	let mut data = tr1_level(PaletteAt::Retail);
	data[..4].copy_from_slice(&0x1234u32.to_le_bytes());
	let level = load(&data, &options, &mut Recorder::default()).unwrap();
	assert_eq!(level.version().raw_version, 0x20);
}

#[test]
fn unknown_version_is_rejected() {
	let mut data = tr1_level(PaletteAt::Retail);
	data[..4].copy_from_slice(&0x1234u32.to_le_bytes());
	let error = load(&data, &LoadOptions::default(), &mut Recorder::default()).unwrap_err();
	assert!(matches!(error, tr_reader::Error::UnrecognizedFormat { version: 0x1234 }));
}
