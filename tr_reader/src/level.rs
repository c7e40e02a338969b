use std::{collections::BTreeMap, f32::consts::TAU, path::Path, sync::Arc};
use glam::{I16Vec3, IVec3, Vec3};
use log::info;
use shared::min_max::MinMax;
use crate::{
	decode::{self, Context},
	files::{DiskFiles, Files},
	mesh::{Mesh, MeshCache},
	model::{
		AiObject, AnimDispatch, Animation, Camera, CinematicFrame, Color3, Color4, Entity, FlybyCamera, Frame,
		FrameRotation, MeshNode, MeshNodeFlags, Model, ObjectTexture, Room, SoundDetails, SoundSource,
		SpriteSequence, SpriteTexture, StateChange, StaticMesh,
	},
	pack::Pack,
	version::{self, Generation, LevelVersion, Platform, Variant},
	Error, Result,
};

/// Receives decode progress, textiles and sound samples as they are produced, in file order.
pub trait LoadCallbacks {
	fn on_progress(&mut self, _message: &str) {}
	/// 256x256 pixels, `0xAABBGGRR`
	fn on_textile(&mut self, _pixels: &[u32]) {}
	/// `index` is the sample slot referenced by sample indices
	fn on_sound(&mut self, _index: u16, _data: &[u8]) {}
}

impl LoadCallbacks for () {}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
	/// Extract sound samples
	pub sounds: bool,
	/// Deliver textiles to `on_textile`
	pub textiles: bool,
	/// Skip detection and decode as this variant
	pub variant: Option<Variant>,
}

impl Default for LoadOptions {
	fn default() -> Self {
		LoadOptions { sounds: true, textiles: true, variant: None }
	}
}

/// Models carrying Lara's skin meshes.
const LARA_SKIN_TR3: i16 = 315;
const LARA_SKIN_POST_TR3: i16 = 8;

/// A decoded level in one shape for every format.
///
/// Built once by `Level::load*`; afterwards only meshes are materialized, on first use.
#[derive(Debug, Default)]
pub struct Level {
	pub(crate) name: String,
	pub(crate) version: LevelVersion,
	pub(crate) trng: bool,
	pub(crate) palette: Vec<Color3>,
	pub(crate) palette16: Vec<Color4>,
	pub(crate) num_textiles: u32,
	pub(crate) rooms: Vec<Room>,
	pub(crate) floor_data: Vec<u16>,
	pub(crate) meshes: MeshCache,
	pub(crate) mesh_pointers: Vec<u32>,
	pub(crate) animations: Vec<Animation>,
	pub(crate) state_changes: Vec<StateChange>,
	pub(crate) anim_dispatches: Vec<AnimDispatch>,
	pub(crate) anim_commands: Vec<i16>,
	pub(crate) mesh_tree: Vec<u32>,
	pub(crate) frames: Vec<u16>,
	pub(crate) models: Vec<Model>,
	pub(crate) static_meshes: BTreeMap<u32, StaticMesh>,
	pub(crate) object_textures: Vec<ObjectTexture>,
	pub(crate) sprite_textures: Vec<SpriteTexture>,
	pub(crate) sprite_sequences: Vec<SpriteSequence>,
	pub(crate) cameras: Vec<Camera>,
	pub(crate) flyby_cameras: Vec<FlybyCamera>,
	pub(crate) sound_sources: Vec<SoundSource>,
	pub(crate) animated_textures: Vec<u16>,
	pub(crate) animated_texture_uv_count: u8,
	pub(crate) entities: Vec<Entity>,
	pub(crate) ai_objects: Vec<AiObject>,
	pub(crate) light_map: Vec<u8>,
	pub(crate) cinematic_frames: Vec<CinematicFrame>,
	pub(crate) demo_data: Vec<u8>,
	pub(crate) sound_map: Vec<i16>,
	pub(crate) sound_details: Vec<SoundDetails>,
	pub(crate) sample_indices: Vec<u32>,
	pub(crate) num_sound_samples: u32,
	pub(crate) lara_type: u16,
	pub(crate) weather_type: u16,
	pub(crate) pack: Option<Pack>,
}

impl Level {
	/// Loads a level file from disk, finding companion files next to it.
	pub fn load(path: impl AsRef<Path>, options: &LoadOptions, callbacks: &mut dyn LoadCallbacks) -> Result<Self> {
		Self::load_with(&DiskFiles, path, options, callbacks)
	}

	pub fn load_with(
		files: &dyn Files,
		path: impl AsRef<Path>,
		options: &LoadOptions,
		callbacks: &mut dyn LoadCallbacks,
	) -> Result<Self> {
		let path = path.as_ref();
		let data = files.load_file(path)?;
		let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
		Self::decode(&data, name, Some(path), options, files, callbacks)
	}

	/// Decodes an in-memory level. Companion files are looked up through `files` relative to `path`.
	pub fn load_from_bytes(
		data: &[u8],
		name: &str,
		path: Option<&Path>,
		options: &LoadOptions,
		files: &dyn Files,
		callbacks: &mut dyn LoadCallbacks,
	) -> Result<Self> {
		Self::decode(data, name.to_owned(), path, options, files, callbacks)
	}

	fn decode(
		data: &[u8],
		name: String,
		path: Option<&Path>,
		options: &LoadOptions,
		files: &dyn Files,
		callbacks: &mut dyn LoadCallbacks,
	) -> Result<Self> {
		let version = match options.variant {
			Some(variant) => variant.version(),
			None => {
				let file_name = path.and_then(|p| p.file_name()).and_then(|n| n.to_str());
				version::detect(data, file_name)?
			},
		};
		if version.is_unknown() {
			return Err(Error::UnrecognizedFormat { version: version.raw_version });
		}
		info!("Loading {} as {}", name, version.variant());
		let level = Level { name, version, ..Default::default() };
		let mut ctx = Context::new(level, options, files, path, callbacks);
		decode::decode(&mut ctx, data)?;
		info!("Loaded {}", ctx.level.name);
		Ok(ctx.level)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn version(&self) -> LevelVersion {
		self.version
	}

	pub fn variant(&self) -> Variant {
		self.version.variant()
	}

	pub fn platform(&self) -> Platform {
		self.version.platform
	}

	pub fn generation(&self) -> Generation {
		self.version.generation
	}

	/// Level extended by the TRNG engine
	pub fn trng(&self) -> bool {
		self.trng
	}

	pub fn remastered(&self) -> bool {
		self.version.remastered
	}

	/// Present for pack files, which carry no level data of their own.
	pub fn pack(&self) -> Option<&Pack> {
		self.pack.as_ref()
	}

	pub fn num_textiles(&self) -> u32 {
		self.num_textiles
	}

	pub fn num_sound_samples(&self) -> u32 {
		self.num_sound_samples
	}

	// rooms

	pub fn num_rooms(&self) -> usize {
		self.rooms.len()
	}

	pub fn room(&self, index: usize) -> Option<&Room> {
		self.rooms.get(index)
	}

	pub fn rooms(&self) -> &[Room] {
		&self.rooms
	}

	// textures

	pub fn num_object_textures(&self) -> usize {
		self.object_textures.len()
	}

	pub fn object_texture(&self, index: usize) -> Option<&ObjectTexture> {
		self.object_textures.get(index)
	}

	pub fn object_textures(&self) -> &[ObjectTexture] {
		&self.object_textures
	}

	pub fn num_sprite_textures(&self) -> usize {
		self.sprite_textures.len()
	}

	pub fn sprite_texture(&self, index: usize) -> Option<&SpriteTexture> {
		self.sprite_textures.get(index)
	}

	pub fn sprite_sequences(&self) -> &[SpriteSequence] {
		&self.sprite_sequences
	}

	pub fn sprite_sequence_by_id(&self, id: i32) -> Option<&SpriteSequence> {
		self.sprite_sequences.iter().find(|s| s.sprite_id == id)
	}

	pub fn animated_textures(&self) -> &[u16] {
		&self.animated_textures
	}

	pub fn animated_texture_uv_count(&self) -> u8 {
		self.animated_texture_uv_count
	}

	// palette

	pub fn palette(&self) -> &[Color3] {
		&self.palette
	}

	pub fn palette16(&self) -> &[Color4] {
		&self.palette16
	}

	pub fn palette_entry8(&self, index: usize) -> Option<Color3> {
		self.palette.get(index).copied()
	}

	pub fn palette_entry16(&self, index: usize) -> Option<Color4> {
		self.palette16.get(index).copied()
	}

	/// The 16-bit palette colour if there is one, otherwise the 8-bit colour. Black when neither exists.
	pub fn palette_entry(&self, index: usize) -> Color4 {
		self.palette_entry16(index)
			.or_else(|| self.palette_entry8(index).map(Color4::from))
			.unwrap_or(Color4 { a: 0xff, ..Default::default() })
	}

	/// As `palette_entry`, with separate indices into the two palettes.
	pub fn palette_entry_split(&self, index8: usize, index16: usize) -> Color4 {
		self.palette_entry16(index16)
			.or_else(|| self.palette_entry8(index8).map(Color4::from))
			.unwrap_or(Color4 { a: 0xff, ..Default::default() })
	}

	pub fn light_map(&self) -> &[u8] {
		&self.light_map
	}

	// floor data

	pub fn num_floor_data(&self) -> usize {
		self.floor_data.len()
	}

	pub fn floor_data(&self, index: usize) -> Option<u16> {
		self.floor_data.get(index).copied()
	}

	pub fn floor_data_all(&self) -> &[u16] {
		&self.floor_data
	}

	// items

	pub fn num_entities(&self) -> usize {
		self.entities.len()
	}

	pub fn entity(&self, index: usize) -> Option<&Entity> {
		self.entities.get(index)
	}

	pub fn entities(&self) -> &[Entity] {
		&self.entities
	}

	pub fn num_ai_objects(&self) -> usize {
		self.ai_objects.len()
	}

	pub fn ai_object(&self, index: usize) -> Option<&AiObject> {
		self.ai_objects.get(index)
	}

	pub fn num_cameras(&self) -> usize {
		self.cameras.len()
	}

	pub fn camera(&self, index: usize) -> Option<&Camera> {
		self.cameras.get(index)
	}

	pub fn flyby_cameras(&self) -> &[FlybyCamera] {
		&self.flyby_cameras
	}

	pub fn cinematic_frames(&self) -> &[CinematicFrame] {
		&self.cinematic_frames
	}

	pub fn demo_data(&self) -> &[u8] {
		&self.demo_data
	}

	/// TR5
	pub fn lara_type(&self) -> u16 {
		self.lara_type
	}

	/// TR5
	pub fn weather_type(&self) -> u16 {
		self.weather_type
	}

	// models and meshes

	pub fn num_models(&self) -> usize {
		self.models.len()
	}

	pub fn model(&self, index: usize) -> Option<&Model> {
		self.models.get(index)
	}

	pub fn model_by_id(&self, id: u32) -> Option<&Model> {
		self.models.iter().find(|m| m.id == id)
	}

	pub fn num_static_meshes(&self) -> usize {
		self.static_meshes.len()
	}

	pub fn static_mesh(&self, id: u32) -> Option<&StaticMesh> {
		self.static_meshes.get(&id)
	}

	pub fn static_meshes(&self) -> impl Iterator<Item = &StaticMesh> {
		self.static_meshes.values()
	}

	pub fn num_mesh_pointers(&self) -> usize {
		self.mesh_pointers.len()
	}

	pub fn mesh_pointer(&self, index: usize) -> Option<u32> {
		self.mesh_pointers.get(index).copied()
	}

	/// Mesh referenced by `mesh_pointers[index]`, decoded on first request.
	pub fn mesh_by_pointer(&self, index: usize) -> Result<Option<Arc<Mesh>>> {
		match self.mesh_pointers.get(index) {
			Some(&pointer) => self.meshes.get(pointer).map(Some),
			None => Ok(None),
		}
	}

	pub fn mesh_cache(&self) -> &MeshCache {
		&self.meshes
	}

	/// Type id whose meshes draw the given entity type; Lara's skin lives in another model from TR3.
	pub fn mesh_from_type_id(&self, type_id: i16) -> i16 {
		let generation = self.generation();
		if type_id != 0 || generation < Generation::Tr3 {
			type_id
		} else if generation > Generation::Tr3 {
			LARA_SKIN_POST_TR3
		} else {
			LARA_SKIN_TR3
		}
	}

	/// `count` nodes starting at word offset `start`. Stops early at the end of the tree.
	pub fn mesh_tree(&self, start: usize, count: usize) -> Vec<MeshNode> {
		self.mesh_tree
			.get(start..)
			.unwrap_or_default()
			.chunks_exact(4)
			.take(count)
			.map(|node| MeshNode {
				flags: MeshNodeFlags(node[0]),
				offset: IVec3::new(node[1] as i32, node[2] as i32, node[3] as i32),
			})
			.collect()
	}

	/// Pose at word offset `offset` of the frame data, with one rotation per mesh.
	/// `None` if the pose runs off the end of the frames.
	pub fn frame(&self, offset: usize, meshes: usize) -> Option<Frame> {
		let mut words = self.frames.get(offset..)?.iter().copied();
		let tr1 = self.generation() == Generation::Tr1;
		let mut word = || words.next().map(|w| w as i16);
		let min = I16Vec3::new(word()?, word()?, word()?);
		let max = I16Vec3::new(word()?, word()?, word()?);
		let offset = I16Vec3::new(word()?, word()?, word()?);
		let meshes = if tr1 { word()? as u16 as usize } else { meshes };
		let unit = |value: u16, steps: f32| value as f32 * TAU / steps;
		let mut rotations = Vec::with_capacity(meshes.min(self.frames.len()));
		for _ in 0..meshes {
			let (data, next) = if tr1 {
				let next = word()? as u16;
				(word()? as u16, next)
			} else {
				let data = word()? as u16;
				match data & 0xc000 {
					0 => (data, word()? as u16),
					_ => (data, 0),
				}
			};
			let mode = if tr1 { 0 } else { data & 0xc000 };
			let rotation = match mode {
				0 => FrameRotation::All(Vec3::new(
					unit((data & 0x3ff0) >> 4, 1024.0),
					unit(((data & 0xf) << 6) | ((next & 0xfc00) >> 10), 1024.0),
					unit(next & 0x3ff, 1024.0),
				)),
				mode => {
					let angle = if self.generation() >= Generation::Tr4 {
						unit(data & 0xfff, 4096.0)
					} else {
						unit(data & 0x3ff, 1024.0)
					};
					match mode {
						0x4000 => FrameRotation::X(angle),
						0x8000 => FrameRotation::Y(angle),
						_ => FrameRotation::Z(angle),
					}
				},
			};
			rotations.push(rotation);
		}
		Some(Frame { bound_box: MinMax { min, max }, offset, rotations })
	}

	pub fn animations(&self) -> &[Animation] {
		&self.animations
	}

	pub fn state_changes(&self) -> &[StateChange] {
		&self.state_changes
	}

	pub fn anim_dispatches(&self) -> &[AnimDispatch] {
		&self.anim_dispatches
	}

	pub fn anim_commands(&self) -> &[i16] {
		&self.anim_commands
	}

	// sound

	pub fn num_sound_sources(&self) -> usize {
		self.sound_sources.len()
	}

	pub fn sound_source(&self, index: usize) -> Option<&SoundSource> {
		self.sound_sources.get(index)
	}

	pub fn sound_details(&self) -> &[SoundDetails] {
		&self.sound_details
	}

	pub fn sound_map(&self) -> &[i16] {
		&self.sound_map
	}

	pub fn sample_indices(&self) -> &[u32] {
		&self.sample_indices
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn level(generation: Generation, frames: Vec<u16>) -> Level {
		Level { version: LevelVersion::new(Platform::Pc, generation, 0), frames, ..Default::default() }
	}

	#[test]
	fn palette_prefers_16_bit() {
		let mut level = Level::default();
		level.palette = vec![Color3 { r: 1, g: 2, b: 3 }; 2];
		assert_eq!(level.palette_entry(1), Color4 { r: 1, g: 2, b: 3, a: 0xff });
		level.palette16 = vec![Color4 { r: 9, g: 9, b: 9, a: 0 }];
		assert_eq!(level.palette_entry(0).r, 9);
		assert_eq!(level.palette_entry(1).r, 1);
		assert_eq!(level.palette_entry_split(1, 0).r, 9);
	}

	#[test]
	fn tr2_frame_single_and_packed_rotations() {
		let frames = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0x4000 | 256, 0x0010, 0x0400 | 1];
		let frame = level(Generation::Tr2, frames).frame(0, 2).unwrap();
		assert_eq!(frame.bound_box.min, I16Vec3::new(1, 2, 3));
		assert_eq!(frame.offset, I16Vec3::new(7, 8, 9));
		assert_eq!(frame.rotations[0], FrameRotation::X(TAU / 4.0));
		let FrameRotation::All(all) = frame.rotations[1] else { panic!("expected packed rotation") };
		let step = TAU / 1024.0;
		assert!((all - Vec3::new(step, step, step)).length() < 1e-6);
	}

	#[test]
	fn tr1_frame_has_mesh_count_and_swapped_words() {
		let frames = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0x0400 | 1, 0x0010];
		let frame = level(Generation::Tr1, frames).frame(0, 99).unwrap();
		assert_eq!(frame.rotations.len(), 1);
		assert!(matches!(frame.rotations[0], FrameRotation::All(_)));
	}

	#[test]
	fn frame_past_end_is_none() {
		assert!(level(Generation::Tr2, vec![0; 9]).frame(0, 1).is_none());
		assert!(level(Generation::Tr2, vec![0; 9]).frame(20, 0).is_none());
	}

	#[test]
	fn mesh_tree_nodes() {
		let mut level = Level::default();
		level.mesh_tree = vec![1, 10, 0xffff_fff6, 30, 2, 0, 0, 0];
		let nodes = level.mesh_tree(0, 5);
		assert_eq!(nodes.len(), 2);
		assert!(nodes[0].flags.pop());
		assert_eq!(nodes[0].offset, IVec3::new(10, -10, 30));
		assert!(nodes[1].flags.push());
	}

	#[test]
	fn lara_skin_moves_after_tr2() {
		assert_eq!(level(Generation::Tr2, vec![]).mesh_from_type_id(0), 0);
		assert_eq!(level(Generation::Tr3, vec![]).mesh_from_type_id(0), 315);
		assert_eq!(level(Generation::Tr4, vec![]).mesh_from_type_id(0), 8);
		assert_eq!(level(Generation::Tr4, vec![]).mesh_from_type_id(5), 5);
	}
}
