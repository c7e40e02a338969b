//! PC room bodies, and the pieces of them that console layouts share.

use log::debug;
use num_traits::AsPrimitive;
use crate::{
	model::{
		tr1, tr2, tr3, tr5, Face, Light, Portal, RawFace, RawMeshFace, Room, RoomInfo, RoomSprite,
		RoomStaticMesh, Sector, Sectors, Vertex,
	},
	read_list, read_vec, Readable, Reader, Result, LE,
};
use super::Context;

impl Context<'_> {
	/// Count of type `L`, then one room per `read_room` call.
	pub fn rooms<L>(&mut self, reader: &mut Reader, read_room: impl Fn(&mut Reader) -> Result<Room>) -> Result<()>
	where
		L: Readable + AsPrimitive<i64>,
	{
		self.step(reader, "rooms");
		let count = L::read::<LE>(reader)?.as_().max(0) as usize;
		let mut rooms = Vec::with_capacity(count.min(reader.remaining()));
		for index in 0..count {
			self.progress(&format!("Reading room {}", index));
			debug!("[{}] Reading room {}", reader.position(), index);
			rooms.push(read_room(reader)?);
		}
		self.finished(reader, rooms.len(), "rooms");
		self.level.rooms = rooms;
		Ok(())
	}
}

pub(crate) fn list<L, T, U>(reader: &mut Reader) -> Result<Vec<U>>
where
	L: Readable + AsPrimitive<i64>,
	T: Readable + Into<U>,
{
	Ok(read_list::<LE, L, T>(reader)?.into_vec().into_iter().map(Into::into).collect())
}

/// Data word count, then vertices, rectangles, triangles and sprites, each with an `i16` count.
pub(crate) fn geometry<V: Readable + Into<Vertex>>(reader: &mut Reader, room: &mut Room) -> Result<()> {
	let num_data_words = reader.read::<u32>()?;
	debug!("[{}] {} data words to process", reader.position(), num_data_words);
	if num_data_words == 0 {
		return Ok(());
	}
	room.vertices = list::<i16, V, _>(reader)?;
	room.rectangles = list::<i16, RawFace<4>, _>(reader)?;
	room.triangles = list::<i16, RawFace<3>, _>(reader)?;
	room.sprites = list::<i16, RoomSprite, _>(reader)?;
	Ok(())
}

pub(crate) fn portals(reader: &mut Reader, room: &mut Room) -> Result<()> {
	room.portals = list::<u16, Portal, _>(reader)?;
	Ok(())
}

pub(crate) fn sectors(reader: &mut Reader, room: &mut Room) -> Result<()> {
	room.set_sectors(reader.read::<Sectors>()?);
	Ok(())
}

/// `u16` count of lights stored as `T`.
pub(crate) fn lights<T: Readable>(reader: &mut Reader, room: &mut Room, wrap: impl Fn(T) -> Light) -> Result<()> {
	room.lights = read_list::<LE, u16, T>(reader)?.into_vec().into_iter().map(wrap).collect();
	Ok(())
}

pub(crate) fn static_meshes<T: Readable + Into<RoomStaticMesh>>(reader: &mut Reader, room: &mut Room) -> Result<()> {
	room.static_meshes = list::<u16, T, _>(reader)?;
	Ok(())
}

pub(crate) fn alternate_room_and_flags(reader: &mut Reader, room: &mut Room) -> Result<()> {
	room.alternate_room = reader.read()?;
	room.flags = reader.read()?;
	Ok(())
}

pub fn tr1(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	geometry::<tr1::RoomVertex>(reader, &mut room)?;
	portals(reader, &mut room)?;
	sectors(reader, &mut room)?;
	room.ambient_intensity_1 = reader.read()?;
	lights(reader, &mut room, Light::Tr1)?;
	static_meshes::<tr1::RoomStaticMesh>(reader, &mut room)?;
	alternate_room_and_flags(reader, &mut room)?;
	Ok(room)
}

pub fn tr2(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	geometry::<tr2::RoomVertex>(reader, &mut room)?;
	portals(reader, &mut room)?;
	sectors(reader, &mut room)?;
	room.ambient_intensity_1 = reader.read()?;
	room.ambient_intensity_2 = reader.read()?;
	room.light_mode = reader.read()?;
	lights(reader, &mut room, Light::Tr2)?;
	static_meshes::<RoomStaticMesh>(reader, &mut room)?;
	alternate_room_and_flags(reader, &mut room)?;
	Ok(room)
}

pub fn tr3(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	geometry::<tr3::RoomVertex>(reader, &mut room)?;
	portals(reader, &mut room)?;
	sectors(reader, &mut room)?;
	room.ambient_intensity_1 = reader.read()?;
	room.light_mode = reader.read()?;
	lights(reader, &mut room, Light::Tr3)?;
	static_meshes::<RoomStaticMesh>(reader, &mut room)?;
	alternate_room_and_flags(reader, &mut room)?;
	room.water_scheme = reader.read()?;
	room.reverb_info = reader.read()?;
	reader.skip(1)?;
	Ok(room)
}

pub fn tr4(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read()?, ..Default::default() };
	geometry::<tr3::RoomVertex>(reader, &mut room)?;
	portals(reader, &mut room)?;
	sectors(reader, &mut room)?;
	room.color = reader.read()?;
	lights(reader, &mut room, Light::Tr4)?;
	static_meshes::<RoomStaticMesh>(reader, &mut room)?;
	alternate_room_and_flags(reader, &mut room)?;
	room.water_scheme = reader.read()?;
	room.reverb_info = reader.read()?;
	room.alternate_group = reader.read()?;
	Ok(room)
}

/// Faces of one layer, offset past the vertices of the layers before it.
fn layer_faces(reader: &mut Reader, room: &mut Room, rectangles: usize, triangles: usize, offset: u16) -> Result<()> {
	let rects = read_vec::<LE, RawMeshFace<4>>(reader, rectangles)?;
	room.rectangles.extend(rects.into_iter().map(|f| Face::from(f).offset(offset)));
	let tris = read_vec::<LE, RawMeshFace<3>>(reader, triangles)?;
	room.triangles.extend(tris.into_iter().map(|f| Face::from(f).offset(offset)));
	Ok(())
}

fn layer_vertices<V: Readable + Into<Vertex>>(reader: &mut Reader, room: &mut Room, count: usize) -> Result<()> {
	let vertices = read_vec::<LE, V>(reader, count)?;
	room.vertices.extend(vertices.into_iter().map(Into::into));
	Ok(())
}

pub fn tr5(reader: &mut Reader) -> Result<Room> {
	xela::<tr5::RoomVertex>(reader, 0)
}

/// `XELA` room: a fixed header whose offsets locate sectors, portals, static meshes and the layered geometry.
/// Offsets count from `padding` bytes past the header.
pub(crate) fn xela<V: Readable + Into<Vertex>>(reader: &mut Reader, padding: usize) -> Result<Room> {
	reader.skip(4)?;
	let size = reader.read::<u32>()? as usize;
	let end = reader.position().saturating_add(size);
	let header = reader.read::<tr5::RoomHeader>()?;
	reader.skip(padding)?;
	let data_start = reader.position();
	let mut room = Room {
		info: header.info,
		num_x_sectors: header.num_x_sectors,
		num_z_sectors: header.num_z_sectors,
		color: header.color,
		reverb_info: header.reverb_info,
		alternate_group: header.alternate_group,
		water_scheme: header.water_scheme as u8,
		alternate_room: header.alternate_room,
		flags: header.flags,
		..Default::default()
	};
	let lights = read_vec::<LE, tr5::Light>(reader, header.num_lights as usize)?;
	let fog_bulbs = read_vec::<LE, tr5::FogBulb>(reader, header.num_fog_bulbs as usize)?;
	room.lights = lights.into_iter().map(Light::Tr5).chain(fog_bulbs.into_iter().map(Light::Tr5Fog)).collect();

	let at = |offset: u32| data_start.saturating_add(offset as usize);
	reader.seek(at(header.start_sd_offset));
	room.sectors = read_vec::<LE, Sector>(reader, header.num_z_sectors as usize * header.num_x_sectors as usize)?;
	portals(reader, &mut room)?;
	reader.seek(at(header.end_portal_offset));
	room.static_meshes = read_vec::<LE, RoomStaticMesh>(reader, header.num_static_meshes as usize)?;

	reader.seek(at(header.layer_offset));
	let layers = read_vec::<LE, tr5::RoomLayer>(reader, header.num_layers as usize)?;
	reader.seek(at(header.poly_offset));
	let offsets = tr5::layer_offsets(layers.iter().map(|l| l.num_vertices));
	for (layer, offset) in layers.iter().zip(offsets) {
		layer_faces(reader, &mut room, layer.num_rectangles as usize, layer.num_triangles as usize, offset)?;
	}
	reader.seek(at(header.vertices_offset));
	for layer in &layers {
		layer_vertices::<V>(reader, &mut room, layer.num_vertices as usize)?;
	}
	reader.seek(end);
	Ok(room)
}

/// Remastered rooms drop the offset table and store each layer's counts next to its geometry.
pub fn tr5_remastered(reader: &mut Reader) -> Result<Room> {
	let mut room = Room { info: reader.read::<RoomInfo>()?, ..Default::default() };
	portals(reader, &mut room)?;
	sectors(reader, &mut room)?;
	room.color = reader.read()?;
	let num_lights = reader.read::<u16>()? as usize;
	let lights = read_vec::<LE, tr5::Light>(reader, num_lights)?;
	let num_fog_bulbs = reader.read::<u32>()? as usize;
	let fog_bulbs = read_vec::<LE, tr5::FogBulb>(reader, num_fog_bulbs)?;
	room.lights = lights.into_iter().map(Light::Tr5).chain(fog_bulbs.into_iter().map(Light::Tr5Fog)).collect();
	static_meshes::<RoomStaticMesh>(reader, &mut room)?;
	alternate_room_and_flags(reader, &mut room)?;
	room.water_scheme = reader.read()?;
	room.reverb_info = reader.read()?;
	room.alternate_group = reader.read()?;
	let num_layers = reader.read::<u32>()?;
	let mut offset = 0u16;
	for _ in 0..num_layers {
		let layer = reader.read::<tr5::RemasteredRoomLayer>()?;
		layer_vertices::<tr5::RoomVertex>(reader, &mut room, layer.num_vertices as usize)?;
		layer_faces(reader, &mut room, layer.num_rectangles as usize, layer.num_triangles as usize, offset)?;
		offset = offset.wrapping_add(layer.num_vertices as u16);
	}
	// unknown, tracks the vertex count
	reader.skip(4)?;
	Ok(room)
}
