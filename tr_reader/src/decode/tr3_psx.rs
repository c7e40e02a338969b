//! TR3 PlayStation. Room geometry is split into roomlets and room textures are stored
//! apart from the object textures.

use log::debug;
use crate::{
	mesh::MeshFormat,
	model::{tr2, Entity, Light, PaddedModel, Room, RoomStaticMesh},
	read_list,
	texture::TransparencyRule,
	Reader, Result, LE,
};
use super::{
	psx::{self, SAMPLE_RATE},
	rooms,
	Context,
};

/// Blocks of unknown data between the sound bank and the rooms
const HEADER_BLOCKS: usize = 13;
/// Entries in the map of rooms seen from outside
const OUTSIDE_ROOM_MAP_SIZE: usize = 729;

fn room(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	let num_data_words = reader.read::<u32>()? as usize;
	let data_start = reader.position();
	let offsets = read_list::<LE, u32, u32>(reader)?;
	psx::roomlets(reader, &mut room, data_start, &offsets)?;
	reader.seek(data_start.saturating_add(num_data_words * 2));
	rooms::portals(reader, &mut room)?;
	rooms::sectors(reader, &mut room)?;
	room.ambient_intensity_1 = reader.read()?;
	room.light_mode = reader.read()?;
	rooms::lights(reader, &mut room, Light::Tr3)?;
	rooms::static_meshes::<RoomStaticMesh>(reader, &mut room)?;
	rooms::alternate_room_and_flags(reader, &mut room)?;
	room.water_scheme = reader.read()?;
	room.reverb_info = reader.read()?;
	reader.skip(1)?;
	Ok(room)
}

/// Each block is a size and its data, followed by a second sized block when the first is not empty.
fn skip_header_blocks(reader: &mut Reader) -> Result<()> {
	for _ in 0..HEADER_BLOCKS {
		let size = reader.read::<u32>()? as usize;
		if size != 0 {
			reader.skip(size)?;
			let size = reader.read::<u32>()? as usize;
			reader.skip(size)?;
		}
	}
	Ok(())
}

/// Outside room map and table, then bounding boxes.
fn skip_outside_rooms(reader: &mut Reader) -> Result<()> {
	reader.skip_n(OUTSIDE_ROOM_MAP_SIZE, 2)?;
	let table_len = reader.read::<u32>()? as usize;
	reader.skip(table_len)?;
	let num_bounding_boxes = reader.read::<u32>()? as usize;
	reader.skip_n(num_bounding_boxes, 8)?;
	debug!("[{}] Skipped outside room tables", reader.position());
	Ok(())
}

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	// version
	reader.skip(4)?;
	ctx.psx_sound_bank(reader, SAMPLE_RATE)?;
	skip_header_blocks(reader)?;
	ctx.rooms::<u16>(reader, room)?;
	ctx.floor_data(reader)?;
	skip_outside_rooms(reader)?;
	ctx.mesh_data(reader, MeshFormat::Tr3Psx)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr1_3(reader)?;
	ctx.animation_tables(reader)?;
	ctx.models::<PaddedModel>(reader)?;
	ctx.static_meshes(reader)?;
	let mut textures = ctx.psx_counted_textiles(reader, 2)?;
	ctx.psx_object_textures(reader, &mut textures, TransparencyRule::TextureArea)?;
	ctx.psx_sprite_textures(reader, &mut textures)?;
	ctx.sprite_sequences(reader)?;
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	ctx.boxes(reader, tr2::BOX_SIZE, tr2::ZONES_PER_BOX)?;
	ctx.animated_textures(reader)?;
	ctx.entities::<Entity>(reader)?;
	// horizon colour
	reader.skip(4)?;
	ctx.psx_room_textures(reader, &mut textures)?;
	ctx.emit_psx_textiles(&mut textures, false);
	ctx.sound_map_until_details(reader)?;
	ctx.sound_details(reader)
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
	fn room_skips_to_the_end_of_its_data_words() {
		let mut data = vec![0u8; 16];
		let mut geometry = vec![];
		// one roomlet right after the offset table
		words(&mut geometry, &[1, 8]);
		geometry.extend_from_slice(&[0; 6]);
		geometry.extend_from_slice(&[1, 0]);
		words(&mut geometry, &[0, 0x3ff, 0, 0, 0]);
		// padding the roomlet walk never reaches
		geometry.extend_from_slice(&[0xff; 4]);
		words(&mut data, &[geometry.len() as u32 / 2]);
		data.extend_from_slice(&geometry);
		// portals, sectors, ambient, light mode, lights, statics, alternate room, flags
		for v in [0u16, 0, 0, 0, 0, 0, 0, 0xffff, 0] {
			data.extend_from_slice(&v.to_le_bytes());
		}
		// water scheme, reverb, filler
		data.extend_from_slice(&[2, 1, 0]);
		let mut reader = Reader::new(&data);
		let room = room(&mut reader).unwrap();
		assert!(reader.is_at_end());
		assert_eq!(room.vertices.len(), 1);
		assert!(room.rectangles.is_empty());
		assert_eq!((room.water_scheme, room.reverb_info), (2, 1));
	}

	#[test]
	fn header_blocks_come_in_pairs() {
		let mut data = vec![];
		words(&mut data, &[2]);
		data.extend_from_slice(&[0; 2]);
		words(&mut data, &[1]);
		data.push(0);
		for _ in 1..HEADER_BLOCKS {
			words(&mut data, &[0]);
		}
		let mut reader = Reader::new(&data);
		skip_header_blocks(&mut reader).unwrap();
		assert!(reader.is_at_end());
	}
}
