//! TR1 PlayStation, with the version 27 and May 1996 prototypes.

use glam::IVec3;
use log::{debug, warn};
use crate::{
	mesh::MeshFormat,
	model::{psx, tr1, BoundBox, Entity, Face, Light, PaddedModel, RawFace, Room, RoomSprite, StaticMesh},
	texture::TransparencyRule,
	version::{Variant, TR1_PC},
	Readable, Reader, Result,
};
use super::{
	psx::{PsxTextures, SAMPLE_RATE},
	rooms::{self, list},
	Context,
};

/// `pBAV` as a little-endian word
const VAB_MAGIC: u32 = 0x56414270;

/// Zones per box in the version 27 prototype
const VERSION_27_ZONES_PER_BOX: usize = 4;

#[derive(Readable, Clone, Copy, Debug)]
struct May1996StaticMesh {
	id: u32,
	mesh: u16,
	visibility: BoundBox,
}

impl From<May1996StaticMesh> for StaticMesh {
	fn from(May1996StaticMesh { id, mesh, visibility }: May1996StaticMesh) -> Self {
		StaticMesh { id, mesh, visibility, collision: visibility, flags: 0 }
	}
}

#[derive(Readable, Clone, Copy, Debug)]
struct May1996Entity {
	type_id: i16,
	room: i16,
	pos: IVec3,
	angle: i16,
	flags: u16,
}

impl From<May1996Entity> for Entity {
	fn from(May1996Entity { type_id, room, pos, angle, flags }: May1996Entity) -> Self {
		Entity { type_id, room, pos, angle, intensity1: 0, intensity2: 0, flags }
	}
}

/// Vertices, rectangles with their last two corners swapped, triangles and sprites.
fn geometry(reader: &mut Reader, room: &mut Room) -> Result<()> {
	let num_data_words = reader.read::<u32>()?;
	reader.skip(2)?;
	if num_data_words == 0 {
		return Ok(());
	}
	room.vertices = list::<i16, psx::RoomVertex, _>(reader)?;
	room.rectangles = list::<i16, RawFace<4>, Face<4>>(reader)?
		.into_iter()
		.map(|mut face| {
			face.vertices.swap(2, 3);
			face
		})
		.collect();
	room.triangles = list::<i16, RawFace<3>, _>(reader)?;
	room.sprites = list::<i16, RoomSprite, _>(reader)?;
	Ok(())
}

fn lights_and_statics(reader: &mut Reader, room: &mut Room) -> Result<()> {
	room.ambient_intensity_1 = reader.read()?;
	rooms::lights(reader, room, |light: psx::Light| Light::Tr1(light.into()))?;
	rooms::static_meshes::<psx::RoomStaticMesh>(reader, room)
}

fn room(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	geometry(reader, &mut room)?;
	rooms::portals(reader, &mut room)?;
	rooms::sectors(reader, &mut room)?;
	lights_and_statics(reader, &mut room)?;
	rooms::alternate_room_and_flags(reader, &mut room)?;
	Ok(room)
}

/// Only x and z are stored; the vertical extent comes from the vertices.
fn may_1996_room(reader: &mut Reader) -> Result<Room> {
	let mut room = Room::default();
	room.info.x = reader.read()?;
	room.info.z = reader.read()?;
	geometry(reader, &mut room)?;
	let heights = room.vertices.iter().map(|v| v.pos.y as i32);
	room.info.y_top = heights.clone().min().unwrap_or_default();
	room.info.y_bottom = heights.max().unwrap_or_default();
	rooms::portals(reader, &mut room)?;
	rooms::sectors(reader, &mut room)?;
	lights_and_statics(reader, &mut room)?;
	room.alternate_room = -1;
	room.flags = reader.read()?;
	Ok(room)
}

/// Sounds come first: an embedded bank, a skippable block, or a bank in `PSXSOUND`.
fn sounds(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let sound_header_size = reader.read::<u32>()?;
	if sound_header_size != 0 && reader.peek::<u32>()? == VAB_MAGIC {
		reader.seek(0);
		ctx.psx_sound_bank(reader, SAMPLE_RATE)?;
	} else if sound_header_size == 0 {
		let size = reader.read::<u32>()? as usize;
		debug!("[{}] Skipping {} bytes of sound data", reader.position(), size);
		reader.skip(size)?;
	} else {
		reader.seek(0);
		ctx.sounds(reader, |ctx, _| ctx.external_sound_bank());
		reader.seek(0);
	}
	Ok(())
}

pub fn decode(ctx: &mut Context, reader: &mut Reader, variant: Variant) -> Result<()> {
	sounds(ctx, reader)?;
	match variant {
		Variant::Tr1PsxVersion27 => {
			reader.seek(0);
			let textures = ctx.psx_textiles(reader, 15, 1024)?;
			// version
			reader.skip(4)?;
			body(ctx, reader, textures, VERSION_27_ZONES_PER_BOX)
		},
		Variant::Tr1PsxMay1996 => may_1996(ctx, reader),
		_ => {
			let before_textiles = reader.position();
			let mut textures = ctx.psx_textiles(reader, 13, 1024)?;
			if reader.read::<u32>()? != TR1_PC {
				// some cutscenes look like levels without sound
				warn!("No version after the textiles, reading them 8 bytes earlier");
				reader.seek(before_textiles.saturating_sub(8));
				textures = ctx.psx_textiles(reader, 13, 1024)?;
				reader.skip(4)?;
			}
			if reader.is_at_end() {
				debug!("Level ends after the textiles");
				return Ok(());
			}
			body(ctx, reader, textures, tr1::ZONES_PER_BOX)
		},
	}
}

fn body(ctx: &mut Context, reader: &mut Reader, mut textures: PsxTextures, zones_per_box: usize) -> Result<()> {
	ctx.rooms::<u16>(reader, room)?;
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, MeshFormat::Tr1Psx)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr1_3(reader)?;
	ctx.animation_tables(reader)?;
	ctx.models::<PaddedModel>(reader)?;
	ctx.static_meshes(reader)?;
	ctx.psx_object_textures(reader, &mut textures, TransparencyRule::Clut)?;
	ctx.psx_sprite_textures(reader, &mut textures)?;
	ctx.emit_psx_textiles(&mut textures, false);
	ctx.sprite_sequences(reader)?;
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	ctx.boxes(reader, tr1::BOX_SIZE, zones_per_box)?;
	ctx.animated_textures(reader)?;
	ctx.entities::<tr1::Entity>(reader)?;
	ctx.sound_map_until_details(reader)?;
	ctx.sound_details(reader)
}

fn may_1996(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.seek(0);
	let mut textures = ctx.psx_textiles(reader, 20, 2048)?;
	// version, then a palette nothing uses
	reader.skip(4 + 768)?;
	ctx.rooms::<u16>(reader, may_1996_room)?;
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, MeshFormat::Tr1PsxMay1996)?;
	ctx.mesh_pointers(reader)?;
	ctx.step(reader, "animations");
	let num_animations = reader.read::<u32>()? as usize;
	debug!("Skipping {} animations of unknown layout", num_animations);
	reader.skip_n(num_animations, 28)?;
	ctx.animation_tables(reader)?;
	ctx.models::<PaddedModel>(reader)?;
	let meshes = ctx.list::<u32, May1996StaticMesh, StaticMesh>(reader, "static meshes")?;
	ctx.level.static_meshes = meshes.into_iter().map(|mesh| (mesh.id, mesh)).collect();
	ctx.psx_object_textures(reader, &mut textures, TransparencyRule::Clut)?;
	ctx.psx_sprite_textures(reader, &mut textures)?;
	ctx.emit_psx_textiles(&mut textures, false);
	ctx.sprite_sequences(reader)?;
	ctx.cameras(reader)?;
	ctx.boxes(reader, tr1::BOX_SIZE, 0)?;
	ctx.animated_textures(reader)?;
	ctx.entities::<May1996Entity>(reader)
}
