//! TR2 PlayStation and its version 38, 42 and 44 prototypes.

use log::debug;
use crate::{
	mesh::MeshFormat,
	model::{psx, tr1, tr2, Entity, Face, Light, PaddedModel, RawFace, Room, RoomStaticMesh},
	read_vec,
	texture::TransparencyRule,
	version::Variant,
	Readable, Reader, Result, LE,
};
use super::{
	psx::{PsxTextures, SAMPLE_RATE, TR2_SAMPLE_RATE},
	rooms::{self, list},
	Context,
};

/// Packed face indices count in quarter vertices.
const INDEX_SHIFT: u32 = 2;

/// Prototype rectangle: indices only, textures stored separately.
#[derive(Readable, Clone, Copy, Debug)]
struct RectangleIndices([u16; 4]);

/// Prototype triangle with the texture first.
#[derive(Readable, Clone, Copy, Debug)]
struct PackedTriangle {
	texture: u16,
	vertices: [u16; 3],
}

/// Shifted indices, the last two rectangle corners stored swapped.
fn unpack_rectangle(vertices: [u16; 4], texture: u16) -> Face<4> {
	let [a, b, c, d] = vertices.map(|v| v >> INDEX_SHIFT);
	Face::new([a, b, d, c], texture)
}

fn unpack_triangle(vertices: [u16; 3], texture: u16) -> Face<3> {
	Face::new(vertices.map(|v| v >> INDEX_SHIFT), texture)
}

/// `u16` count, a skipped word, then packed vertices.
fn packed_vertices(reader: &mut Reader, room: &mut Room) -> Result<()> {
	let count = reader.read::<u16>()? as usize;
	reader.skip(2)?;
	let y_top = room.info.y_top;
	room.vertices = read_vec::<LE, u32>(reader, count)?.into_iter().map(|v| psx::unpack_grey_vertex(v, y_top)).collect();
	Ok(())
}

/// Rectangle textures, then indices, then triangles, each table aligned to 4 bytes.
fn retail_geometry(reader: &mut Reader, room: &mut Room) -> Result<()> {
	packed_vertices(reader, room)?;
	let start = reader.position();
	let align = |reader: &mut Reader| -> Result<()> {
		if (reader.position() - start) % 4 != 0 {
			reader.skip(2)?;
		}
		Ok(())
	};
	let num_rectangles = reader.read::<u16>()? as usize;
	let textures = read_vec::<LE, u16>(reader, num_rectangles)?;
	align(reader)?;
	let indices = read_vec::<LE, RectangleIndices>(reader, num_rectangles)?;
	room.rectangles = indices.iter().zip(textures).map(|(RectangleIndices(v), texture)| unpack_rectangle(*v, texture)).collect();
	let num_triangles = reader.read::<i16>()?.max(0) as usize;
	align(reader)?;
	room.triangles = read_vec::<LE, PackedTriangle>(reader, num_triangles)?
		.into_iter()
		.map(|t| unpack_triangle(t.vertices, t.texture))
		.collect();
	Ok(())
}

fn version_44_geometry(reader: &mut Reader, room: &mut Room) -> Result<()> {
	packed_vertices(reader, room)?;
	room.rectangles = list::<u16, RawFace<4>, RawFace<4>>(reader)?
		.into_iter()
		.map(|f| unpack_rectangle(f.vertices, f.texture))
		.collect();
	room.triangles = list::<u16, RawFace<3>, RawFace<3>>(reader)?
		.into_iter()
		.map(|f| unpack_triangle(f.vertices, f.texture))
		.collect();
	Ok(())
}

/// TR1 PSX vertices and unshifted faces.
fn version_38_geometry(reader: &mut Reader, room: &mut Room) -> Result<()> {
	// vertex count, repeated below
	reader.skip(2)?;
	room.vertices = list::<i16, psx::RoomVertex, _>(reader)?;
	room.rectangles = list::<i16, RawFace<4>, Face<4>>(reader)?
		.into_iter()
		.map(|mut face| {
			face.vertices.swap(2, 3);
			face
		})
		.collect();
	room.triangles = list::<i16, RawFace<3>, _>(reader)?;
	Ok(())
}

/// The geometry block is sized in words, so whatever `geometry` reads the rest of the room follows it.
fn room(reader: &mut Reader, geometry: fn(&mut Reader, &mut Room) -> Result<()>) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	let num_data_words = reader.read::<u32>()? as usize;
	let start = reader.position();
	if num_data_words > 0 {
		geometry(reader, &mut room)?;
	}
	reader.seek(start.saturating_add(num_data_words * 2));
	rooms::portals(reader, &mut room)?;
	rooms::sectors(reader, &mut room)?;
	room.ambient_intensity_1 = reader.read()?;
	room.ambient_intensity_2 = reader.read()?;
	room.light_mode = reader.read()?;
	rooms::lights(reader, &mut room, Light::Tr2)?;
	rooms::static_meshes::<RoomStaticMesh>(reader, &mut room)?;
	rooms::alternate_room_and_flags(reader, &mut room)?;
	Ok(room)
}

/// Rooms through models, identical in every build.
fn level_data(ctx: &mut Context, reader: &mut Reader, geometry: fn(&mut Reader, &mut Room) -> Result<()>, format: MeshFormat) -> Result<()> {
	ctx.rooms::<u16>(reader, |reader| room(reader, geometry))?;
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, format)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr1_3(reader)?;
	ctx.animation_tables(reader)?;
	ctx.models::<PaddedModel>(reader)?;
	ctx.static_meshes(reader)
}

/// Object textures through entities.
fn tables(ctx: &mut Context, reader: &mut Reader, textures: &mut PsxTextures, box_size: usize) -> Result<()> {
	ctx.psx_object_textures(reader, textures, TransparencyRule::Stored)?;
	ctx.psx_sprite_textures(reader, textures)?;
	ctx.sprite_sequences(reader)?;
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	ctx.boxes(reader, box_size, tr2::ZONES_PER_BOX)?;
	ctx.animated_textures(reader)?;
	ctx.entities::<Entity>(reader)?;
	// unknown
	reader.skip(4)?;
	Ok(())
}

fn sound_tables(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	ctx.sound_map_until_details(reader)?;
	ctx.sound_details(reader)
}

/// Offset of the word after the sound bank.
fn after_sound_bank(reader: &mut Reader) -> Result<usize> {
	reader.seek(16);
	Ok((reader.read::<u32>()? as usize).saturating_add(8))
}

pub fn decode(ctx: &mut Context, reader: &mut Reader, variant: Variant) -> Result<()> {
	match variant {
		Variant::Tr2PsxVersion38 => version_38(ctx, reader),
		Variant::Tr2PsxVersion42 => version_42(ctx, reader),
		Variant::Tr2PsxVersion44 => version_44(ctx, reader),
		_ => retail(ctx, reader),
	}
}

fn retail(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.seek(0);
	ctx.psx_sound_bank(reader, TR2_SAMPLE_RATE)?;
	// version
	reader.skip(4)?;
	level_data(ctx, reader, retail_geometry, MeshFormat::Tr2Psx)?;
	let mut textures = ctx.psx_counted_textiles(reader, 1)?;
	// unknown
	reader.skip(4)?;
	tables(ctx, reader, &mut textures, tr2::BOX_SIZE)?;
	ctx.emit_psx_textiles(&mut textures, false);
	sound_tables(ctx, reader)
}

fn version_44(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let at = after_sound_bank(reader)?;
	reader.seek(at);
	// version
	reader.skip(4)?;
	level_data(ctx, reader, version_44_geometry, MeshFormat::Tr2PsxVersion44)?;
	ctx.step(reader, "textiles");
	let num_textiles = reader.read::<u32>()? as usize;
	let mut textures = ctx.psx_textiles(reader, num_textiles, 2048)?;
	tables(ctx, reader, &mut textures, tr2::BOX_SIZE)?;
	ctx.emit_psx_textiles(&mut textures, false);
	sound_tables(ctx, reader)?;
	reader.seek(0);
	ctx.psx_sound_bank(reader, TR2_SAMPLE_RATE)
}

/// The bank at the start of these files does not decode, so no sounds are read.
fn version_42(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let at = after_sound_bank(reader)?;
	reader.seek(at);
	let mut textures = ctx.psx_textiles(reader, 18, 2048)?;
	// version
	reader.skip(4)?;
	level_data(ctx, reader, version_44_geometry, MeshFormat::Tr2PsxVersion44)?;
	tables(ctx, reader, &mut textures, tr1::BOX_SIZE)?;
	ctx.emit_psx_textiles(&mut textures, false);
	sound_tables(ctx, reader)
}

fn version_38(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let at = after_sound_bank(reader)?;
	reader.seek(at);
	let mut textures = ctx.psx_textiles(reader, 14, 1024)?;
	// version
	reader.skip(4)?;
	level_data(ctx, reader, version_38_geometry, MeshFormat::Tr2PsxVersion38)?;
	ctx.psx_object_textures(reader, &mut textures, TransparencyRule::Stored)?;
	ctx.psx_sprite_textures(reader, &mut textures)?;
	ctx.sprite_sequences(reader)?;
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	// boxes, overlaps and zones of a size not seen in any other build
	ctx.step(reader, "boxes");
	let num_boxes = reader.read::<u32>()? as usize;
	reader.skip_n(num_boxes, 20)?;
	let num_overlaps = reader.read::<u32>()? as usize;
	reader.skip_n(num_overlaps, 2)?;
	reader.skip_n(num_boxes, 20)?;
	debug!("[{}] Skipped {} boxes and {} overlaps", reader.position(), num_boxes, num_overlaps);
	ctx.animated_textures(reader)?;
	ctx.entities::<Entity>(reader)?;
	// unknown
	reader.skip(4)?;
	ctx.emit_psx_textiles(&mut textures, true);
	sound_tables(ctx, reader)?;
	reader.seek(0);
	ctx.psx_sound_bank(reader, SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(data: &mut Vec<u8>, values: &[u16]) {
		for v in values {
			data.extend_from_slice(&v.to_le_bytes());
		}
	}

	/// Portals, sectors, ambient 1 and 2, light mode, lights, statics, alternate room, flags.
	fn empty_room_tail(data: &mut Vec<u8>) {
		words(data, &[0, 0, 0, 0, 0, 0, 0, 0, 0xffff, 0]);
	}

	#[test]
	fn retail_room_tables_are_aligned() {
		let mut data = vec![0u8; 12];
		data.extend_from_slice(&(-2048i32).to_le_bytes());
		let mut geometry = vec![];
		// 4 vertices
		words(&mut geometry, &[4, 0]);
		for v in 0..4u32 {
			geometry.extend_from_slice(&(v | 1 << 5).to_le_bytes());
		}
		// one rectangle: count and texture leave the cursor aligned
		words(&mut geometry, &[1, 9]);
		words(&mut geometry, &[0, 4, 8, 12]);
		// one triangle after padding
		words(&mut geometry, &[1, 0]);
		words(&mut geometry, &[5, 0, 4, 12]);
		data.extend_from_slice(&(geometry.len() as u32 / 2).to_le_bytes());
		data.extend_from_slice(&geometry);
		empty_room_tail(&mut data);

		let mut reader = Reader::new(&data);
		let room = room(&mut reader, retail_geometry).unwrap();
		assert!(reader.is_at_end());
		assert_eq!(room.vertices.len(), 4);
		assert_eq!(room.vertices[0].pos.y, -2048.0 + 256.0);
		assert_eq!((room.rectangles[0].vertices, room.rectangles[0].texture), ([0, 1, 3, 2], 9));
		assert_eq!((room.triangles[0].vertices, room.triangles[0].texture), ([0, 1, 3], 5));
		assert!(room.face_indices_in_range());
		assert_eq!(room.alternate_room, -1);
	}

	#[test]
	fn geometry_block_is_skipped_by_its_size() {
		let mut data = vec![0u8; 16];
		data.extend_from_slice(&5u32.to_le_bytes());
		// no vertices or faces, then a stray word the reader never looks at
		words(&mut data, &[0, 0, 0, 0, 0xbeef]);
		empty_room_tail(&mut data);
		let mut reader = Reader::new(&data);
		let room = room(&mut reader, version_44_geometry).unwrap();
		assert!(reader.is_at_end());
		assert!(room.vertices.is_empty());
	}
}
