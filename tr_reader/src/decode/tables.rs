//! Tables that most formats store the same way, each read into the level by one step.

use num_traits::AsPrimitive;
use crate::{
	mesh::{MeshCache, MeshFormat},
	model::{
		tr1, AiObject, AnimDispatch, Animation, Camera, CinematicFrame, Entity, FlybyCamera, Model, ObjectTexture,
		SoundDetails, SoundSource, SpriteSequence, SpriteTexture, StateChange, StaticMesh, LIGHT_MAP_SIZE,
	},
	read_list, read_vec, Readable, Reader, Result, LE,
};
use super::Context;

impl Context<'_> {
	/// Count of type `L`, then records of type `T` converted to `U`.
	pub fn list<L, T, U>(&mut self, reader: &mut Reader, name: &str) -> Result<Vec<U>>
	where
		L: Readable + AsPrimitive<i64>,
		T: Readable + Into<U>,
	{
		self.step(reader, name);
		let items = read_list::<LE, L, T>(reader)?.into_vec().into_iter().map(Into::into).collect::<Vec<U>>();
		self.finished(reader, items.len(), name);
		Ok(items)
	}

	pub fn floor_data(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.floor_data = self.list::<u32, u16, _>(reader, "floor data")?;
		Ok(())
	}

	/// Mesh data is counted in words and kept as bytes for the mesh cache.
	pub fn mesh_data(&mut self, reader: &mut Reader, format: MeshFormat) -> Result<()> {
		self.step(reader, "mesh data");
		let words = reader.read::<u32>()? as usize;
		let data = reader.take(words.saturating_mul(2))?.to_vec();
		self.finished(reader, words, "mesh data words");
		self.level.meshes = MeshCache::new(data, format);
		Ok(())
	}

	pub fn mesh_pointers(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.mesh_pointers = self.list::<u32, u32, _>(reader, "mesh pointers")?;
		Ok(())
	}

	pub fn animations_tr1_3(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.animations = self.list::<u32, tr1::Anim, _>(reader, "animations")?;
		Ok(())
	}

	pub fn animations_tr4_5(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.animations = self.list::<u32, Animation, _>(reader, "animations")?;
		Ok(())
	}

	/// State changes, dispatches, commands, mesh tree and frames, which always follow the animations.
	pub fn animation_tables(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.state_changes = self.list::<u32, StateChange, _>(reader, "state changes")?;
		self.level.anim_dispatches = self.list::<u32, AnimDispatch, _>(reader, "anim dispatches")?;
		self.level.anim_commands = self.list::<u32, i16, _>(reader, "anim commands")?;
		self.level.mesh_tree = self.list::<u32, u32, _>(reader, "mesh tree")?;
		self.level.frames = self.list::<u32, u16, _>(reader, "frames")?;
		Ok(())
	}

	/// `T` is `Model`, or `PaddedModel` for tables with trailing padding.
	pub fn models<T: Readable + Into<Model>>(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.models = self.list::<u32, T, _>(reader, "models")?;
		Ok(())
	}

	/// Keyed by id; a later mesh with the same id replaces the earlier one.
	pub fn static_meshes(&mut self, reader: &mut Reader) -> Result<()> {
		let meshes = self.list::<u32, StaticMesh, StaticMesh>(reader, "static meshes")?;
		self.level.static_meshes = meshes.into_iter().map(|mesh| (mesh.id, mesh)).collect();
		Ok(())
	}

	pub fn object_textures<T: Readable + Into<ObjectTexture>>(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.object_textures = self.list::<u32, T, _>(reader, "object textures")?;
		Ok(())
	}

	pub fn sprites(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.sprite_textures = self.list::<u32, SpriteTexture, _>(reader, "sprite textures")?;
		self.sprite_sequences(reader)
	}

	pub fn sprite_sequences(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.sprite_sequences = self.list::<u32, SpriteSequence, _>(reader, "sprite sequences")?;
		Ok(())
	}

	pub fn cameras(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.cameras = self.list::<u32, Camera, _>(reader, "cameras")?;
		Ok(())
	}

	pub fn flyby_cameras(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.flyby_cameras = self.list::<u32, FlybyCamera, _>(reader, "flyby cameras")?;
		Ok(())
	}

	pub fn sound_sources(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.sound_sources = self.list::<u32, SoundSource, _>(reader, "sound sources")?;
		Ok(())
	}

	/// Boxes, overlaps and zones are only needed by the game's AI; their bytes are passed over.
	pub fn boxes(&mut self, reader: &mut Reader, box_size: usize, zones_per_box: usize) -> Result<()> {
		self.step(reader, "boxes");
		let num_boxes = reader.read::<u32>()? as usize;
		reader.skip_n(num_boxes, box_size)?;
		self.finished(reader, num_boxes, "boxes");
		self.step(reader, "overlaps");
		let num_overlaps = reader.read::<u32>()? as usize;
		reader.skip_n(num_overlaps, 2)?;
		self.finished(reader, num_overlaps, "overlaps");
		self.step(reader, "zones");
		reader.skip_n(num_boxes.saturating_mul(zones_per_box), 2)?;
		self.finished(reader, num_boxes * zones_per_box, "zones");
		Ok(())
	}

	pub fn animated_textures(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.animated_textures = self.list::<u32, u16, _>(reader, "animated textures")?;
		Ok(())
	}

	pub fn animated_texture_uv_count(&mut self, reader: &mut Reader) -> Result<()> {
		self.step(reader, "animated texture uv count");
		self.level.animated_texture_uv_count = reader.read::<u8>()?;
		Ok(())
	}

	/// `T` is the generation's entity layout.
	pub fn entities<T: Readable + Into<Entity>>(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.entities = self.list::<u32, T, _>(reader, "entities")?;
		Ok(())
	}

	pub fn ai_objects(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.ai_objects = self.list::<u32, AiObject, _>(reader, "ai objects")?;
		Ok(())
	}

	pub fn light_map(&mut self, reader: &mut Reader) -> Result<()> {
		self.step(reader, "light map");
		self.level.light_map = reader.take(LIGHT_MAP_SIZE)?.to_vec();
		Ok(())
	}

	pub fn cinematic_frames(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.cinematic_frames = self.list::<u16, CinematicFrame, _>(reader, "cinematic frames")?;
		Ok(())
	}

	pub fn demo_data(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.demo_data = self.list::<u16, u8, _>(reader, "demo data")?;
		Ok(())
	}

	pub fn sound_map(&mut self, reader: &mut Reader, len: usize) -> Result<()> {
		self.step(reader, "sound map");
		self.level.sound_map = read_vec::<LE, i16>(reader, len)?;
		self.finished(reader, len, "sound map entries");
		Ok(())
	}

	/// For layouts whose sound map size varies between builds: entries run until the next two
	/// bytes pair up into something small enough to be the sound details count.
	pub fn sound_map_until_details(&mut self, reader: &mut Reader) -> Result<()> {
		self.step(reader, "sound map");
		let mut sound_map = vec![];
		while reader.peek::<u32>()? >= 0xffff {
			sound_map.push(reader.read::<i16>()?);
		}
		self.finished(reader, sound_map.len(), "sound map entries");
		self.level.sound_map = sound_map;
		Ok(())
	}

	pub fn sound_details(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.sound_details = self.list::<u32, SoundDetails, _>(reader, "sound details")?;
		Ok(())
	}

	pub fn sample_indices(&mut self, reader: &mut Reader) -> Result<()> {
		self.level.sample_indices = self.list::<u32, u32, _>(reader, "sample indices")?;
		Ok(())
	}

	/// Sound map, details and sample indices.
	pub fn sound_tables(&mut self, reader: &mut Reader) -> Result<()> {
		self.sound_map_until_details(reader)?;
		self.sound_details(reader)?;
		self.sample_indices(reader)
	}

	/// Three-letter section marker, `TR5` adding a NUL.
	pub fn marker(&mut self, reader: &mut Reader, name: &str, len: usize) -> Result<()> {
		log::debug!("[{}] Skipping {} marker", reader.position(), name);
		reader.skip(len)
	}
}

#[cfg(test)]
mod tests {
	use crate::{version::Variant, Level, LoadOptions};
	use super::*;

	fn context<'a>(options: &'a LoadOptions, callbacks: &'a mut Vec<String>) -> Context<'a> {
		let level = Level { version: Variant::Tr2Pc.version(), ..Default::default() };
		Context::new(level, options, &(), None, callbacks)
	}

	impl crate::LoadCallbacks for Vec<String> {
		fn on_progress(&mut self, message: &str) {
			self.push(message.to_owned());
		}
	}

	#[test]
	fn boxes_are_skipped_with_their_zones() {
		let mut data = vec![];
		data.extend_from_slice(&2u32.to_le_bytes());
		data.extend_from_slice(&[0; 16]);
		data.extend_from_slice(&1u32.to_le_bytes());
		data.extend_from_slice(&[0; 2]);
		data.extend_from_slice(&[0; 40]);
		data.push(0xaa);
		let options = LoadOptions::default();
		let mut progress = vec![];
		let mut ctx = context(&options, &mut progress);
		let mut reader = Reader::new(&data);
		ctx.boxes(&mut reader, 8, 10).unwrap();
		assert_eq!(reader.read::<u8>().unwrap(), 0xaa);
		drop(ctx);
		assert_eq!(progress, ["Reading boxes", "Reading overlaps", "Reading zones"]);
	}

	#[test]
	fn sound_map_stops_at_the_details_count() {
		let mut data = vec![];
		for entry in [-1i16, 3, -1, -1] {
			data.extend_from_slice(&entry.to_le_bytes());
		}
		data.extend_from_slice(&7u32.to_le_bytes());
		let options = LoadOptions::default();
		let mut progress = vec![];
		let mut ctx = context(&options, &mut progress);
		let mut reader = Reader::new(&data);
		ctx.sound_map_until_details(&mut reader).unwrap();
		assert_eq!(ctx.level.sound_map, [-1, 3, -1, -1]);
		assert_eq!(reader.read::<u32>().unwrap(), 7);
	}

	#[test]
	fn static_meshes_are_keyed_by_id() {
		let mut data = vec![];
		data.extend_from_slice(&2u32.to_le_bytes());
		for id in [40u32, 7] {
			data.extend_from_slice(&id.to_le_bytes());
			data.extend_from_slice(&[0; 28]);
		}
		let options = LoadOptions::default();
		let mut progress = vec![];
		let mut ctx = context(&options, &mut progress);
		ctx.static_meshes(&mut Reader::new(&data)).unwrap();
		assert_eq!(ctx.level.static_meshes.keys().copied().collect::<Vec<_>>(), [7, 40]);
	}
}
