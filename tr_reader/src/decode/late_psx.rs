//! TR4 and TR5 PlayStation. A level info block at a fixed offset gives the size of every table,
//! textures are addressed in a VRAM image and models and static meshes fill fixed size tables.

use log::debug;
use crate::{
	mesh::{MeshCache, MeshFormat},
	model::{
		psx::{
			LevelInfo, PsxAiObject, PsxEntity, PsxLight, PsxModel, PsxObjectTexture, PsxStaticMesh, RoomHeader,
			MAX_ENTITIES, NUM_MODELS, NUM_STATIC_MESHES,
		},
		tr4, tr5, Camera, Light, ObjectTexture, Portal, Room, RoomStaticMesh, Sector, SoundDetails,
	},
	read_vec,
	sound::{adpcm_to_wav, slice_at_offsets},
	texture::{textile16_to_rgba, ClutResolver, TransparencyRule, Vram},
	version::{psx_level_info_offset, Generation},
	Error, Readable, Reader, Result, LE,
};
use super::{
	in_order,
	psx::{roomlets, OBJECT_TEXTURE_SIZE, SAMPLE_RATE},
	Context,
};

/// Slots in a room's roomlet offset table
const ROOMLET_SLOTS: usize = 16;
const PORTAL_SIZE: usize = 32;
const SOUND_DETAILS_SIZE: usize = 8;
const OUTSIDE_ROOM_MAP_SIZE: usize = 729;
/// Unknown data between the TR4 model and static mesh tables
const TR4_MODEL_TRAILER: usize = 320;

/// Reads as many `T` of `element_size` bytes as fit in `size`, then moves past `size` bytes.
fn sized<T: Readable>(reader: &mut Reader, size: u32, element_size: usize) -> Result<Vec<T>> {
	let start = reader.position();
	let items = read_vec::<LE, T>(reader, size as usize / element_size)?;
	reader.seek(start.saturating_add(size as usize));
	Ok(items)
}

/// Room body laid out by its header: roomlets, then portals, sectors, lights and static meshes,
/// each section sized by the header.
fn room(reader: &mut Reader, header: &RoomHeader) -> Result<Room> {
	let mut room = Room {
		info: header.info,
		num_z_sectors: header.num_z_sectors,
		num_x_sectors: header.num_x_sectors,
		alternate_room: header.alternate_room,
		flags: header.flags,
		alternate_group: header.alternate_group,
		..Default::default()
	};
	let data_start = reader.position();
	let num_roomlets = reader.read::<u32>()? as usize;
	let offsets = reader.read::<[u32; ROOMLET_SLOTS]>()?;
	roomlets(reader, &mut room, data_start, &offsets[..num_roomlets.min(ROOMLET_SLOTS)])?;
	reader.seek(data_start.saturating_add(header.data_size as usize));

	room.portals = sized::<Portal>(reader, header.portal_size, PORTAL_SIZE)?;
	let sectors_start = reader.position();
	let num_sectors = room.num_z_sectors as usize * room.num_x_sectors as usize;
	room.sectors = read_vec::<LE, Sector>(reader, num_sectors)?;
	reader.seek(sectors_start.saturating_add(header.sectors_size as usize));
	let lights_start = reader.position();
	room.lights = read_vec::<LE, PsxLight>(reader, header.num_lights as usize)?
		.into_iter()
		.map(|PsxLight(light)| Light::Tr4(light))
		.collect();
	reader.seek(lights_start.saturating_add(header.light_size as usize));
	let statics_start = reader.position();
	room.static_meshes = read_vec::<LE, RoomStaticMesh>(reader, header.num_meshes as usize)?;
	reader.seek(statics_start.saturating_add(header.static_mesh_size as usize));
	Ok(room)
}

impl Context<'_> {
	/// Every room header, then every room body.
	fn late_psx_rooms(&mut self, reader: &mut Reader, num_rooms: usize) -> Result<()> {
		self.step(reader, "rooms");
		let headers = read_vec::<LE, RoomHeader>(reader, num_rooms)?;
		let mut rooms = Vec::with_capacity(headers.len());
		for (index, header) in headers.iter().enumerate() {
			self.progress(&format!("Reading room {}", index));
			debug!("[{}] Reading room {}", reader.position(), index);
			rooms.push(room(reader, header)?);
		}
		self.finished(reader, rooms.len(), "rooms");
		self.level.rooms = rooms;
		Ok(())
	}

	/// Models and static meshes fill fixed tables; the slot is the id.
	fn fixed_tables(&mut self, reader: &mut Reader, model_trailer: usize) -> Result<()> {
		self.step(reader, "models");
		let models = read_vec::<LE, PsxModel>(reader, NUM_MODELS)?;
		self.level.models = models.iter().enumerate().map(|(id, model)| model.to_model(id as u32)).collect();
		self.finished(reader, self.level.models.len(), "models");
		reader.skip(model_trailer)?;
		self.step(reader, "static meshes");
		let meshes = read_vec::<LE, PsxStaticMesh>(reader, NUM_STATIC_MESHES)?;
		self.level.static_meshes =
			meshes.iter().enumerate().map(|(id, mesh)| (id as u32, mesh.to_static_mesh(id as u32))).collect();
		self.finished(reader, self.level.static_meshes.len(), "static meshes");
		Ok(())
	}

	/// Converts each textile the textures use out of VRAM. Room textures go after the object textures.
	fn late_psx_textures(
		&mut self,
		vram: &Vram,
		object_textures: Vec<PsxObjectTexture>,
		room_textures: Vec<PsxObjectTexture>,
	) {
		self.progress("Converting textiles");
		let mut resolver = ClutResolver::new();
		let mut textiles = vec![];
		let mut resolve = |mut texture: PsxObjectTexture| -> ObjectTexture {
			textiles.extend(resolver.resolve_object_texture(vram, &mut texture, TransparencyRule::TextureArea));
			texture.to_object_texture()
		};
		self.level.object_textures = object_textures.into_iter().map(&mut resolve).collect();
		let room_textures = room_textures.into_iter().map(&mut resolve).collect();
		self.append_room_textures(room_textures);
		debug!("Converted {} textiles", textiles.len());
		for textile in textiles {
			self.emit_textile(&textile16_to_rgba(&textile));
		}
	}
}

/// Room textures are stored with two lower detail copies each.
fn room_textures(reader: &mut Reader, size: u32) -> Result<Vec<PsxObjectTexture>> {
	let start = reader.position();
	let count = size as usize / OBJECT_TEXTURE_SIZE / 3;
	let mut textures = Vec::with_capacity(count.min(reader.remaining() / OBJECT_TEXTURE_SIZE));
	for _ in 0..count {
		textures.push(reader.read::<PsxObjectTexture>()?);
		reader.skip(OBJECT_TEXTURE_SIZE * 2)?;
	}
	reader.seek(start.saturating_add(size as usize));
	Ok(textures)
}

/// VAG samples at offsets into one block of sound data.
fn vag_samples(reader: &mut Reader, start: usize, info: &LevelInfo) -> Result<Vec<Vec<u8>>> {
	reader.seek(start.saturating_add(info.sound_offsets as usize));
	let offsets = read_vec::<LE, u32>(reader, info.num_sounds as usize)?;
	reader.seek(start.saturating_add(info.sound_data_offset as usize));
	let data = reader.take(info.sound_data_length as usize)?;
	debug!("Converting {} VAG samples", offsets.len());
	Ok(slice_at_offsets(data, &offsets).into_iter().map(|vag| adpcm_to_wav(vag, SAMPLE_RATE)).collect())
}

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let version = ctx.level.version;
	let Some(start) = psx_level_info_offset(reader.data(), version.generation) else {
		return Err(Error::UnrecognizedFormat { version: version.raw_version });
	};
	let tr5 = version.generation == Generation::Tr5;
	reader.seek(start);
	ctx.step(reader, "level info");
	let info = reader.read::<LevelInfo>()?;
	debug!("Level info at {:#x}: {} rooms, {} items", start, info.num_rooms, info.num_items);
	let at = |offset: u32| start.saturating_add(offset as usize);

	reader.seek(at(info.room_data_offset));
	ctx.late_psx_rooms(reader, info.num_rooms as usize)?;
	ctx.step(reader, "floor data");
	ctx.level.floor_data = sized(reader, info.floor_data_size, 2)?;
	// outside room map with two bytes of padding, outside room table, bounding boxes
	reader.skip_n(OUTSIDE_ROOM_MAP_SIZE + 1, 2)?;
	reader.skip(info.outside_room_size as usize)?;
	reader.skip(info.bounding_boxes_size as usize)?;

	ctx.step(reader, "mesh data");
	let mesh_data = reader.take(info.mesh_data_size as usize)?.to_vec();
	ctx.level.meshes = MeshCache::new(mesh_data, MeshFormat::Tr4Psx);
	ctx.level.mesh_pointers = sized(reader, info.mesh_pointer_size, 4)?;
	// animations, state changes, dispatches and commands are not decoded
	for size in [info.animations_size, info.state_changes_size, info.dispatches_size, info.commands_size] {
		reader.skip(size as usize)?;
	}
	ctx.level.mesh_tree = sized(reader, info.meshtree_size, 4)?;
	reader.skip(info.animated_texture_length as usize)?;

	ctx.step(reader, "object textures");
	let object_textures = sized::<PsxObjectTexture>(reader, info.texture_info_length, OBJECT_TEXTURE_SIZE)?;
	reader.skip(info.sprite_info_length as usize)?;
	ctx.step(reader, "room textures");
	let room_textures = room_textures(reader, info.texture_info_length2)?;
	reader.skip(info.sfx_info_length as usize)?;

	ctx.sound_map(reader, if tr5 { tr5::SOUND_MAP_SIZE } else { tr4::SOUND_MAP_SIZE })?;
	ctx.level.sound_details = sized::<SoundDetails>(reader, info.sample_info_length, SOUND_DETAILS_SIZE)?;

	ctx.step(reader, "entities");
	let entities = read_vec::<LE, PsxEntity>(reader, MAX_ENTITIES)?;
	ctx.level.entities = entities.into_iter().take(info.num_items as usize).map(|PsxEntity(entity)| entity).collect();
	ctx.level.ai_objects = read_vec::<LE, PsxAiObject>(reader, info.num_ai_objects as usize)?
		.into_iter()
		.map(Into::into)
		.collect();
	let [bytes_a, bytes_b, words @ ..] = info.unknown_offsets.map(|n| n as usize);
	reader.skip(bytes_a.saturating_add(bytes_b))?;
	reader.skip_n(words.iter().fold(0usize, |sum, &n| sum.saturating_add(n)), 2)?;
	ctx.level.cameras = read_vec::<LE, Camera>(reader, info.num_cameras as usize)?;

	reader.seek(at(info.frames_offset));
	ctx.step(reader, "frames");
	ctx.level.frames = sized(reader, info.frames_size, 2)?;
	reader.seek(at(info.models_offset));
	ctx.fixed_tables(reader, if tr5 { 0 } else { TR4_MODEL_TRAILER })?;

	reader.seek(at(info.textiles_offset));
	ctx.step(reader, "textiles");
	let vram = reader.take(Vram::SIZE.min(reader.remaining()))?;
	ctx.late_psx_textures(&Vram { data: vram }, object_textures, room_textures);

	ctx.sounds(reader, |ctx, reader| {
		ctx.progress("Reading sounds");
		Ok(in_order(vag_samples(reader, start, &info)?))
	});
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(data: &mut Vec<u8>, values: &[u32]) {
		for v in values {
			data.extend_from_slice(&v.to_le_bytes());
		}
	}

	#[test]
	fn room_sections_are_sized_by_the_header() {
		let header = RoomHeader {
			data_size: 4 + 64 + 8,
			portal_size: 40,
			sectors_size: 16,
			num_z_sectors: 1,
			num_x_sectors: 1,
			alternate_room: 3,
			..Default::default()
		};
		let mut data = vec![];
		words(&mut data, &[0]);
		data.extend_from_slice(&[0; 64 + 8]);
		// one portal and padding
		data.extend_from_slice(&7u16.to_le_bytes());
		data.extend_from_slice(&[0; 38]);
		// one sector and padding
		data.extend_from_slice(&[0; 16]);
		let mut reader = Reader::new(&data);
		let room = room(&mut reader, &header).unwrap();
		assert!(reader.is_at_end());
		assert_eq!(room.portals.len(), 1);
		assert_eq!(room.portals[0].adjoining_room, 7);
		assert_eq!(room.sectors.len(), 1);
		assert_eq!(room.alternate_room, 3);
		assert!(room.vertices.is_empty());
	}

	#[test]
	fn room_textures_skip_their_copies() {
		let mut data = vec![0u8; OBJECT_TEXTURE_SIZE * 6 + 4];
		data[OBJECT_TEXTURE_SIZE * 3] = 9;
		let mut reader = Reader::new(&data);
		let textures = room_textures(&mut reader, (data.len()) as u32).unwrap();
		assert_eq!(textures.len(), 2);
		assert_eq!(textures[1].x0, 9);
		assert!(reader.is_at_end());
	}
}
