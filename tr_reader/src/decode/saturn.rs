//! TR1 Saturn. The level and its `.SAD`, `.SPR` and `.SND` companions are big-endian files of
//! named blocks; each block is read by name until the file's end tag.

use log::{debug, warn};
use crate::{
	files,
	mesh::{MeshCache, MeshFormat},
	model::{
		saturn::{
			Light as SaturnLight, RoomPrimitive, SaturnCamera, SaturnEntity, SaturnObjectTexture,
			SaturnRoomStaticMesh, Tag, INDEX_SHIFT,
		},
		tr1, Face, Light, ObjectTexture, PaddedModel, Portal, RawFace, Room, RoomSprite, Sector, SpriteSequence,
		SpriteTexture, StaticMesh, Vertex,
	},
	read_vec,
	texture::{argb1555_to_rgba, psx_to_argb1555, TileMapper},
	Readable, Reader, Result, BE,
};
use super::Context;

/// Bytes of an animation record, which the block's own size does not give.
const ANIMATION_SIZE: usize = 32;
const ROOM_GEOMETRY: u32 = 2;
/// Texture data offsets count 8-byte units.
const TEXTURE_DATA_UNIT: usize = 8;

fn be<T: Readable>(reader: &mut Reader) -> Result<T> {
	T::read::<BE>(reader)
}

/// File tag and 8 bytes, then blocks until `end` or a block `block` does not know.
fn tag_file<F>(data: &[u8], end: &str, mut block: F) -> Result<()>
where
	F: FnMut(&str, &mut Reader) -> Result<bool>,
{
	let mut reader = Reader::new(data);
	let file = be::<Tag>(&mut reader)?;
	reader.skip(8)?;
	debug!("Reading {}", file.name());
	loop {
		let tag = be::<Tag>(&mut reader)?;
		if tag.name() == end {
			return Ok(());
		}
		if !block(tag.name(), &mut reader)? {
			warn!("[{}] Stopped at unknown block {}", reader.position(), tag.name());
			return Ok(());
		}
	}
}

/// Record size and count, both unused.
fn skip_block(reader: &mut Reader) -> Result<()> {
	let size = be::<u32>(reader)? as usize;
	let count = be::<u32>(reader)? as usize;
	reader.skip_n(count, size)
}

/// Record size, then a count of records.
fn counted<T: Readable>(reader: &mut Reader) -> Result<Vec<T>> {
	reader.skip(4)?;
	let count = be::<u32>(reader)? as usize;
	read_vec::<BE, T>(reader, count)
}

fn shifted<const N: usize>(face: RawFace<N>) -> Face<N> {
	Face::new(face.vertices.map(|v| v >> INDEX_SHIFT), 0)
}

/// `MESHSIZE` holds either the room geometry or the room's static meshes.
fn mesh_size(reader: &mut Reader, room: &mut Room) -> Result<()> {
	if be::<u32>(reader)? != ROOM_GEOMETRY {
		let count = be::<u32>(reader)? as usize;
		room.static_meshes = read_vec::<BE, SaturnRoomStaticMesh>(reader, count)?.into_iter().map(Into::into).collect();
		return Ok(());
	}
	let num_data_words = be::<u32>(reader)? as usize;
	let start = reader.position();
	let num_vertices = be::<u16>(reader)? as usize;
	let vertices = read_vec::<BE, tr1::RoomVertex>(reader, num_vertices)?;
	let _num_primitives = be::<u16>(reader)?;
	let num_groups = be::<u16>(reader)?;
	let mut rectangles = vec![];
	let mut triangles = vec![];
	for _ in 0..num_groups {
		let kind = be::<u16>(reader)?;
		let Some(primitive) = RoomPrimitive::from_u16(kind) else {
			debug!("[{}] Unknown room primitive {}", reader.position(), kind);
			break;
		};
		let count = be::<u16>(reader)? as usize;
		match primitive {
			RoomPrimitive::InvisibleTriangles => reader.skip_n(count, 8)?,
			RoomPrimitive::InvisibleRectangles => reader.skip_n(count, 10)?,
			RoomPrimitive::Triangles => {
				triangles.extend(read_vec::<BE, RawFace<3>>(reader, count)?.into_iter().map(shifted));
			},
			RoomPrimitive::Rectangles => {
				rectangles.extend(read_vec::<BE, RawFace<4>>(reader, count)?.into_iter().map(shifted));
			},
			RoomPrimitive::Sprites => {
				let sprites = read_vec::<BE, RoomSprite>(reader, count)?;
				room.sprites.extend(sprites.into_iter().map(|s| RoomSprite {
					vertex: s.vertex >> INDEX_SHIFT,
					texture: s.texture >> INDEX_SHIFT,
				}));
			},
		}
	}
	room.append_geometry(vertices.into_iter().map(Vertex::from), rectangles, triangles);
	reader.seek(start.saturating_add(num_data_words * 2));
	Ok(())
}

/// Sector counts, the `FLOORSIZ` tag and its two words, then the sectors.
fn floor(reader: &mut Reader, room: &mut Room) -> Result<()> {
	room.num_z_sectors = be::<u32>(reader)? as u16;
	room.num_x_sectors = be::<u32>(reader)? as u16;
	reader.skip(16)?;
	let count = room.num_z_sectors as usize * room.num_x_sectors as usize;
	room.sectors = read_vec::<BE, Sector>(reader, count)?;
	Ok(())
}

/// Room blocks up to and including `RM_FLAGS`.
fn room(reader: &mut Reader) -> Result<Room> {
	let mut room = Room::default();
	loop {
		let tag = be::<Tag>(reader)?;
		match tag.name() {
			// size and room number
			"ROOMNUMB" => reader.skip(8)?,
			"MESHPOS" => room.info = be(reader)?,
			"MESHSIZE" => mesh_size(reader, &mut room)?,
			"DOORDATA" => room.portals = counted::<Portal>(reader)?,
			"FLOORDAT" => floor(reader, &mut room)?,
			"LIGHTAMB" => {
				room.ambient_intensity_1 = be::<u32>(reader)? as i16;
				reader.skip(4)?;
			},
			"LIGHTSIZ" => {
				let lights = counted::<SaturnLight>(reader)?;
				room.lights = lights.into_iter().map(|light| Light::Tr1(light.into())).collect();
			},
			"RM_FLIP" => {
				reader.skip(4)?;
				room.alternate_room = be::<u32>(reader)? as i16;
			},
			"RM_FLAGS" => {
				reader.skip(4)?;
				room.flags = be::<u32>(reader)? as i16;
				return Ok(room);
			},
			other => {
				warn!("[{}] Room ended at unknown block {}", reader.position(), other);
				return Ok(room);
			},
		}
	}
}

/// Room texture records and the pixel data they point into.
#[derive(Default)]
struct RoomTextures {
	records: Vec<SaturnObjectTexture>,
	data: Vec<u8>,
}

impl RoomTextures {
	/// Big-endian 16-bit pixels in PSX colour order. Pixels past the data are transparent.
	fn pixels(&self, texture: &SaturnObjectTexture) -> (Vec<u32>, usize, usize) {
		let (width, height) = texture.size();
		let start = texture.tile as usize * TEXTURE_DATA_UNIT;
		let pixels = (0..width * height)
			.map(|i| match self.data.get(start + i * 2..start + i * 2 + 2) {
				Some(&[hi, lo]) => argb1555_to_rgba(psx_to_argb1555(u16::from_be_bytes([hi, lo]))),
				_ => 0,
			})
			.collect();
		(pixels, width, height)
	}
}

impl Context<'_> {
	fn saturn_rooms(&mut self, reader: &mut Reader) -> Result<()> {
		self.step(reader, "rooms");
		reader.skip(4)?;
		let count = be::<u32>(reader)?;
		let mut rooms = vec![];
		for index in 0..count {
			self.progress(&format!("Reading room {}", index));
			rooms.push(room(reader)?);
		}
		self.finished(reader, rooms.len(), "rooms");
		self.level.rooms = rooms;
		Ok(())
	}

	fn saturn_level(&mut self, data: &[u8], textures: &mut RoomTextures) -> Result<()> {
		tag_file(data, "ROOMEND", |tag, reader| {
			match tag {
				"ROOMTINF" => textures.records = counted(reader)?,
				"ROOMTQTR" => {
					let size = be::<u32>(reader)? as usize;
					let count = be::<u32>(reader)? as usize;
					textures.data = reader.take(size.saturating_mul(count))?.to_vec();
				},
				"ROOMDATA" => self.saturn_rooms(reader)?,
				"FLORDATA" => {
					self.progress("Reading floor data");
					self.level.floor_data = counted(reader)?;
				},
				"CAMERAS" => {
					self.progress("Reading cameras");
					self.level.cameras = counted::<SaturnCamera>(reader)?.into_iter().map(|SaturnCamera(c)| c).collect();
				},
				"ITEMDATA" => {
					self.progress("Reading entities");
					self.level.entities = counted::<SaturnEntity>(reader)?.into_iter().map(Into::into).collect();
				},
				"ROOMTSUB" | "ROOMTPAL" | "ROOMSPAL" | "SOUNDFX" | "BOXES" | "OVERLAPS" | "GND_ZONE" | "GND_ZON2"
				| "FLY_ZONE" | "ARANGES" => skip_block(reader)?,
				_ => return Ok(false),
			}
			Ok(true)
		})
	}

	/// Meshes, models and animation tables.
	fn saturn_objects(&mut self, data: &[u8]) -> Result<()> {
		tag_file(data, "OBJEND", |tag, reader| {
			match tag {
				"ANIMS" => {
					reader.skip(4)?;
					let count = be::<u32>(reader)? as usize;
					reader.skip_n(count, ANIMATION_SIZE)?;
				},
				"ANIBONES" => self.level.mesh_tree = counted(reader)?,
				"ANIMOBJ" => {
					self.progress("Reading models");
					self.level.models = counted::<PaddedModel>(reader)?.into_iter().map(Into::into).collect();
				},
				"STATOBJ" => {
					self.progress("Reading static meshes");
					let meshes = counted::<StaticMesh>(reader)?;
					debug!("Read {} static meshes", meshes.len());
					self.level.static_meshes = meshes.into_iter().map(|mesh| (mesh.id, mesh)).collect();
				},
				"FRAMES" => self.level.frames = counted(reader)?,
				"MESHPTRS" => self.level.mesh_pointers = counted(reader)?,
				"MESHDATA" => {
					reader.skip(4)?;
					let words = be::<u32>(reader)? as usize;
					let data = reader.take(words.saturating_mul(2))?.to_vec();
					self.level.meshes = MeshCache::new(data, MeshFormat::Saturn);
				},
				"CHANGES" | "RANGES" | "COMMANDS" | "OTEXTINF" | "OTEXTDAT" | "ITEXTINF" | "ITEXTDAT" => skip_block(reader)?,
				_ => return Ok(false),
			}
			Ok(true)
		})
	}

	fn saturn_sprites(&mut self, data: &[u8]) -> Result<()> {
		tag_file(data, "SPRITEND", |tag, reader| {
			match tag {
				"SPRITINF" => self.level.sprite_textures = counted::<SpriteTexture>(reader)?,
				"OBJECTS" => self.level.sprite_sequences = counted::<SpriteSequence>(reader)?,
				"SPRITDAT" => skip_block(reader)?,
				_ => return Ok(false),
			}
			Ok(true)
		})
	}

	/// Packs each room texture into atlas textiles. A level without room textures gets one blank
	/// textile and one object texture so faces always have something to point at.
	fn saturn_textures(&mut self, textures: &RoomTextures) {
		self.progress("Packing textures");
		let mut mapper = TileMapper::new(0);
		let mut object_textures = Vec::with_capacity(textures.records.len());
		let mut publish = |pixels: &[u32]| self.emit_textile(pixels);
		for record in &textures.records {
			let (pixels, width, height) = textures.pixels(record);
			object_textures.push(mapper.map(&pixels, width, height, &mut publish));
		}
		let published = mapper.finish(&mut publish);
		debug!("Packed {} room textures into {} textiles", object_textures.len(), published);
		if object_textures.is_empty() {
			object_textures.push(ObjectTexture::default());
		}
		self.level.object_textures = object_textures;
	}
}

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let mut textures = RoomTextures::default();
	ctx.saturn_level(reader.data(), &mut textures)?;
	let objects = ctx.companion(|path| files::companion_path(path, "SAD"))?;
	ctx.saturn_objects(&objects)?;
	let sprites = ctx.companion(|path| files::companion_path(path, "SPR"))?;
	ctx.saturn_sprites(&sprites)?;
	ctx.saturn_textures(&textures);
	// the sample formats are unknown, the file is only walked
	ctx.sounds(reader, |ctx, _| {
		let sounds = ctx.companion(|path| files::companion_path(path, "SND"))?;
		tag_file(&sounds, "ENDFILE", |tag, reader| match tag {
			"SAMPLUT" | "SAMPLE" => skip_block(reader).map(|_| true),
			_ => Ok(false),
		})?;
		Ok(vec![])
	});
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tag(data: &mut Vec<u8>, name: &str) {
		let mut bytes = [b' '; 8];
		bytes[..name.len()].copy_from_slice(name.as_bytes());
		data.extend_from_slice(&bytes);
	}

	fn be32(data: &mut Vec<u8>, values: &[u32]) {
		for v in values {
			data.extend_from_slice(&v.to_be_bytes());
		}
	}

	fn be16(data: &mut Vec<u8>, values: &[u16]) {
		for v in values {
			data.extend_from_slice(&v.to_be_bytes());
		}
	}

	#[test]
	fn blocks_are_read_until_the_end_tag() {
		let mut data = vec![];
		tag(&mut data, "ROOMFILE");
		data.extend_from_slice(&[0; 8]);
		tag(&mut data, "BOXES");
		be32(&mut data, &[4, 2]);
		data.extend_from_slice(&[0; 8]);
		tag(&mut data, "ROOMEND");
		tag(&mut data, "BOXES");
		let mut seen = vec![];
		tag_file(&data, "ROOMEND", |tag, reader| {
			seen.push(tag.to_string());
			skip_block(reader).map(|_| true)
		})
		.unwrap();
		assert_eq!(seen, ["BOXES"]);
	}

	#[test]
	fn room_blocks_end_at_flags() {
		let mut data = vec![];
		tag(&mut data, "ROOMNUMB");
		be32(&mut data, &[4, 0]);
		tag(&mut data, "MESHPOS");
		be32(&mut data, &[1024, 2048, 0, (-512i32) as u32]);
		tag(&mut data, "MESHSIZE");
		let mut geometry = vec![];
		be16(&mut geometry, &[3]);
		for i in 0..3i16 {
			be16(&mut geometry, &[(i * 1024) as u16, 0, 0, 0]);
		}
		// one primitive in two groups, the first invisible
		be16(&mut geometry, &[1, 2]);
		be16(&mut geometry, &[34, 1, 0, 0, 0, 0]);
		be16(&mut geometry, &[36, 1, 0, 1 << 4, 2 << 4, 9]);
		be32(&mut data, &[ROOM_GEOMETRY, geometry.len() as u32 / 2]);
		data.extend_from_slice(&geometry);
		tag(&mut data, "RM_FLIP");
		be32(&mut data, &[4, 5]);
		tag(&mut data, "RM_FLAGS");
		be32(&mut data, &[4, 1]);
		tag(&mut data, "ROOMNUMB");
		let mut reader = Reader::new(&data);
		let room = room(&mut reader).unwrap();
		assert_eq!(reader.remaining(), 8);
		assert_eq!((room.info.x, room.info.z, room.info.y_top), (1024, 2048, -512));
		assert_eq!(room.vertices.len(), 3);
		assert_eq!(room.triangles.len(), 1);
		assert_eq!(room.triangles[0].vertices, [0, 1, 2]);
		assert_eq!(room.triangles[0].texture, 0);
		assert_eq!((room.alternate_room, room.flags), (5, 1));
		assert!(room.is_water());
	}

	#[test]
	fn texture_pixels_past_the_data_are_transparent() {
		let textures = RoomTextures { records: vec![], data: vec![0x80, 0x1f] };
		let record = SaturnObjectTexture { x1: 1, y2: 1, ..Default::default() };
		let (pixels, width, height) = textures.pixels(&record);
		assert_eq!((width, height), (2, 2));
		assert_eq!(pixels[0], 0xff0000ff);
		assert!(pixels[1..].iter().all(|&p| p == 0));
	}
}
