//! PlayStation records.
//! Textures are 4-bit indexed through 16-colour CLUTs and room geometry is packed into words.

use byteorder::ByteOrder;
use glam::{I16Vec3, IVec3, U16Vec2, Vec3};
use crate::{Readable, Reader, Result};
use super::{
	tr1, tr4, AiObject, BoundBox, Color3, Entity, Face, Model, ObjectTexture, RoomInfo, SpriteTexture, StaticMesh,
	TileAndFlag, Vertex,
};

pub const TEXTILE4_SIZE: usize = 32768;
pub const CLUT_COLORS: usize = 16;
/// Bytes in one CLUT on disk
pub const CLUT_SIZE: usize = CLUT_COLORS * 2;

/// 16 RGBA5551 colours: red in bits 0-4, alpha in bit 15.
pub type Clut = [u16; CLUT_COLORS];

/// Clut/tile value marking an object texture whose tile already points at a converted textile.
pub const RESOLVED: u16 = 0xffff;

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsxVertex {
	pub pos: I16Vec3,
	pub w: i16,
}

/// TR1 and early TR2 room vertex. Brightness runs the opposite way to PC levels.
#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomVertex {
	/// Relative to Room
	pub vertex: I16Vec3,
	pub lighting: i16,
}

impl From<RoomVertex> for Vertex {
	fn from(RoomVertex { vertex, lighting }: RoomVertex) -> Self {
		Vertex::from_brightness(vertex, 8191i16.saturating_sub(lighting), 0)
	}
}

/// Quantized room vertex: 5 bits each of x, y above the room top and z, then 15 bits of shade.
fn unpack_position(v: u32, y_top: i32) -> Vec3 {
	Vec3::new(
		(((v >> 10) & 0x1f) << 10) as f32,
		((((v >> 5) & 0x1f) << 8) as i32 + y_top) as i16 as f32,
		((v & 0x1f) << 10) as f32,
	)
}

/// TR2 packed vertex with a greyscale shade.
pub fn unpack_grey_vertex(v: u32, y_top: i32) -> Vertex {
	let grey = (v >> 15) & 0x7fff;
	let shade = grey as f32 / 0x7fff as f32;
	Vertex {
		pos: unpack_position(v, y_top),
		lighting: (grey >> 2) as i16,
		attributes: 0,
		color: Vec3::splat(1.0 - shade),
	}
}

/// TR3/4 packed vertex with a 15-bit colour, red in the low bits.
pub fn unpack_color_vertex(v: u32, y_top: i32) -> Vertex {
	let color = (v >> 15) & 0x7fff;
	let channel = |shift: u32| ((color >> shift) & 0x1f) as f32 / 31.0;
	Vertex {
		pos: unpack_position(v, y_top),
		lighting: 0,
		attributes: 0,
		color: Vec3::new(channel(0), channel(5), channel(10)),
	}
}

/// Roomlet triangle: three 7-bit vertex indices then an 11-bit texture.
pub fn unpack_roomlet_triangle(word: u32) -> Face<3> {
	Face::new(
		[(word & 0x7f) as u16, ((word >> 7) & 0x7f) as u16, ((word >> 14) & 0x7f) as u16],
		(word >> 21) as u16,
	)
}

/// Roomlet quad, the last two corners stored swapped.
pub fn unpack_roomlet_quad(word: u32, texture: u16) -> Face<4> {
	Face::new(
		[
			(word & 0x7f) as u16,
			((word >> 7) & 0x7f) as u16,
			((word >> 21) & 0x7f) as u16,
			((word >> 14) & 0x7f) as u16,
		],
		texture,
	)
}

/// TR1 room light.
#[derive(Readable, Clone, Copy, Debug)]
pub struct Light {
	/// World coords
	pub pos: IVec3,
	pub intensity: u16,
	#[skip_2]
	pub fade: u32,
}

impl From<Light> for tr1::Light {
	fn from(Light { pos, intensity, fade }: Light) -> Self {
		tr1::Light { pos, intensity, fade }
	}
}

/// TR1 room static mesh with trailing padding.
#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomStaticMesh {
	/// World coords
	pub pos: IVec3,
	pub rotation: u16,
	pub intensity: u16,
	/// Id into static_meshes
	pub mesh_id: u16,
	pub unused: u16,
}

impl From<RoomStaticMesh> for super::RoomStaticMesh {
	fn from(RoomStaticMesh { pos, rotation, intensity, mesh_id, .. }: RoomStaticMesh) -> Self {
		super::RoomStaticMesh { pos, rotation, color: intensity, unused: 0, mesh_id }
	}
}

/// Object texture referencing a 4-bit textile and the CLUT to colour it with.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsxObjectTexture {
	pub x0: u8,
	pub y0: u8,
	/// Index into cluts, or a VRAM CLUT address on TR4+
	pub clut: u16,
	pub x1: u8,
	pub y1: u8,
	/// Index into the 4-bit textiles, or a VRAM texture page on TR4+
	pub tile: u16,
	pub x2: u8,
	pub y2: u8,
	pub unknown: u16,
	pub x3: u8,
	pub y3: u8,
	pub attribute: u16,
}

impl PsxObjectTexture {
	/// Corners in 1/256th of a pixel.
	pub fn corners(&self) -> [U16Vec2; 4] {
		[(self.x0, self.y0), (self.x1, self.y1), (self.x2, self.y2), (self.x3, self.y3)]
			.map(|(x, y)| U16Vec2::new(x as u16, y as u16) << 8)
	}

	pub fn is_resolved(&self) -> bool {
		self.clut == RESOLVED
	}

	/// Canonical texture; only meaningful once resolved.
	pub fn to_object_texture(&self) -> ObjectTexture {
		ObjectTexture {
			attribute: self.attribute,
			tile_and_flag: TileAndFlag(self.tile),
			vertices: self.corners(),
		}
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsxSpriteTexture {
	pub left: i16,
	pub top: i16,
	pub right: i16,
	pub bottom: i16,
	pub clut: u16,
	pub tile: u16,
	pub u0: u8,
	pub v0: u8,
	pub u1: u8,
	pub v1: u8,
}

/// Inclusive pixel span as a width in 1/256th of a pixel.
fn span(from: u8, to: u8) -> u16 {
	(((to.saturating_sub(from) as u32 + 1) << 8) - 1) as u16
}

impl PsxSpriteTexture {
	/// Sprite texture on the converted textile `tile`.
	pub fn to_sprite(&self, tile: u16) -> SpriteTexture {
		SpriteTexture {
			tile,
			x: self.u0,
			y: self.v0,
			width: span(self.u0, self.u1),
			height: span(self.v0, self.v1),
			left: self.left,
			top: self.top,
			right: self.right,
			bottom: self.bottom,
		}
	}
}

/// Level info block of TR4/TR5 PSX files. Offsets are relative to the block.
#[derive(Readable, Clone, Copy, Debug)]
pub struct LevelInfo {
	pub version: i32,
	pub sound_offsets: u32,
	pub sound_data_offset: u32,
	pub textiles_offset: u32,
	pub frames_offset: u32,
	pub room_data_offset: u32,
	pub models_offset: u32,
	pub unknown: [u32; 2],
	pub num_sounds: u32,
	pub sound_data_length: u32,
	pub clut_start: u16,
	pub num_rooms: u16,
	#[skip_2]
	pub num_items: u16,
	#[skip_4]
	pub room_data_size: u32,
	pub floor_data_size: u32,
	pub outside_room_size: u32,
	pub bounding_boxes_size: u32,
	#[skip_4]
	pub mesh_data_size: u32,
	pub mesh_pointer_size: u32,
	pub animations_size: u32,
	pub state_changes_size: u32,
	pub dispatches_size: u32,
	pub commands_size: u32,
	pub meshtree_size: u32,
	pub frames_size: u32,
	pub texture_info_length: u32,
	pub sprite_info_length: u32,
	pub texture_info_length2: u32,
	pub animated_texture_length: u32,
	pub sfx_info_length: u32,
	pub sample_info_length: u32,
	#[skip_8]
	#[skip_4]
	pub unknown_offsets: [u32; 7],
	pub num_cameras: u32,
	#[skip_4]
	pub camera_length: i32,
	#[skip_4]
	pub num_ai_objects: u16,
	pub trailer: [u8; 38],
}

pub const LEVEL_INFO_SIZE: usize = 228;

/// Per-room header of TR4/TR5 PSX files, all read before any room body.
#[derive(Readable, Clone, Copy, Debug, Default)]
pub struct RoomHeader {
	pub data_size: u32,
	pub portal_size: u32,
	pub sectors_size: u32,
	pub light_size: u32,
	pub static_mesh_size: u32,
	pub info: RoomInfo,
	pub num_z_sectors: u16,
	pub num_x_sectors: u16,
	#[skip_4]
	pub num_lights: u16,
	pub num_meshes: u16,
	#[skip_1]
	pub alternate_group: u8,
	#[skip_8]
	#[skip_8]
	#[skip_4]
	#[skip_2]
	pub alternate_room: i16,
	pub flags: i16,
	pub trailer: u32,
}

/// Light in 32 bytes; the last 8 bytes depend on the light type.
#[derive(Clone, Copy, Debug)]
pub struct PsxLight(pub tr4::Light);

impl Readable for PsxLight {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let pos = IVec3::read::<E>(reader)?;
		let light_type = u8::read::<E>(reader)?;
		let color = Color3::read::<E>(reader)?;
		let direction = I16Vec3::read::<E>(reader)?.as_vec3() / 4096.0;
		let intensity = u16::read::<E>(reader)?;
		let mut light = tr4::Light {
			pos,
			color,
			light_type,
			unknown: 0,
			intensity: intensity.min(0xff) as u8,
			direction,
			..Default::default()
		};
		match light_type {
			2 => {
				let length = u8::read::<E>(reader)?;
				let cutoff = u8::read::<E>(reader)?;
				reader.skip(2)?;
				let inner = i16::read::<E>(reader)?;
				let outer = i16::read::<E>(reader)?;
				light.hotspot = ((inner as i32) << 2) as f32 / 16384.0;
				light.falloff = ((outer as i32) << 2) as f32 / 16384.0;
				light.length = ((length as u32) << 7) as f32;
				light.cutoff = ((cutoff as u32) << 7) as f32;
			},
			_ => {
				let hotspot = u8::read::<E>(reader)?;
				let falloff = u8::read::<E>(reader)?;
				reader.skip(6)?;
				light.hotspot = ((hotspot as u32) << 7) as f32;
				light.falloff = ((falloff as u32) << 7) as f32;
			},
		}
		Ok(PsxLight(light))
	}
}

pub const LIGHT_SIZE: usize = 32;

/// Item record of TR4/TR5 PSX files: a live game object of which only a few fields matter.
#[derive(Clone, Copy, Debug)]
pub struct PsxEntity(pub Entity);

impl Readable for PsxEntity {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		reader.skip(12)?;
		let type_id = i16::read::<E>(reader)?;
		reader.skip(10)?;
		let room = i16::read::<E>(reader)?;
		reader.skip(14)?;
		let flags = u16::read::<E>(reader)?;
		reader.skip(2)?;
		let ocb = i16::read::<E>(reader)?;
		reader.skip(18)?;
		let pos = IVec3::read::<E>(reader)?;
		reader.skip(2)?;
		let angle = i16::read::<E>(reader)?;
		reader.skip(64)?;
		Ok(PsxEntity(Entity { type_id, room, pos, angle, intensity1: 0, intensity2: ocb, flags }))
	}
}

pub const ENTITY_SIZE: usize = 144;
pub const MAX_ENTITIES: usize = 256;

#[derive(Readable, Clone, Copy, Debug)]
pub struct PsxAiObject {
	pub type_id: u16,
	pub room: u16,
	pub pos: IVec3,
	pub ocb: i16,
	pub flags: u16,
	pub angle: i16,
	pub box_index: u16,
}

impl From<PsxAiObject> for AiObject {
	fn from(a: PsxAiObject) -> Self {
		AiObject { type_id: a.type_id, room: a.room, pos: a.pos, ocb: a.ocb, flags: a.flags, angle: a.angle as i32 }
	}
}

/// Model slot of the fixed TR4/TR5 PSX object table; the slot number is the type id.
#[derive(Readable, Clone, Copy, Debug)]
pub struct PsxModel {
	pub num_meshes: u16,
	pub mesh_id: u16,
	pub mesh_tree: u32,
	pub frame_offset: u32,
	pub trailer: [u32; 13],
}

impl PsxModel {
	pub fn to_model(&self, id: u32) -> Model {
		Model {
			id,
			num_meshes: self.num_meshes,
			mesh_id: self.mesh_id,
			mesh_tree: self.mesh_tree,
			frame_offset: self.frame_offset,
			animation: None,
		}
	}
}

pub const NUM_MODELS: usize = 460;

#[derive(Readable, Clone, Copy, Debug)]
pub struct PsxStaticMesh {
	pub mesh: u16,
	pub flags: u16,
	pub visibility: BoundBox,
	pub collision: BoundBox,
}

impl PsxStaticMesh {
	pub fn to_static_mesh(&self, id: u32) -> StaticMesh {
		StaticMesh { id, mesh: self.mesh, visibility: self.visibility, collision: self.collision, flags: self.flags }
	}
}

pub const NUM_STATIC_MESHES: usize = 70;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn packed_vertex_fields() {
		let v = (3 << 10) | (2 << 5) | 1 | (0x7fff << 15);
		let vertex = unpack_grey_vertex(v, -1024);
		assert_eq!(vertex.pos, Vec3::new(3072.0, -512.0, 1024.0));
		assert_eq!(vertex.color, Vec3::ZERO);
		let vertex = unpack_color_vertex(0x1f << 15, 0);
		assert_eq!(vertex.color, Vec3::new(1.0, 0.0, 0.0));
	}

	#[test]
	fn roomlet_quad_swaps_last_corners() {
		let word = 1 | (2 << 7) | (3 << 14) | (4 << 21);
		assert_eq!(unpack_roomlet_quad(word, 9).vertices, [1, 2, 4, 3]);
		let tri = unpack_roomlet_triangle(1 | (2 << 7) | (3 << 14) | (100 << 21));
		assert_eq!((tri.vertices, tri.texture), ([1, 2, 3], 100));
	}

	#[test]
	fn spot_light_cone() {
		let mut data = vec![];
		for v in [0i32, 0, 0] {
			data.extend_from_slice(&v.to_le_bytes());
		}
		data.extend_from_slice(&[2, 255, 128, 0]);
		for v in [0i16, 4096, 0] {
			data.extend_from_slice(&v.to_le_bytes());
		}
		data.extend_from_slice(&300u16.to_le_bytes());
		data.extend_from_slice(&[4, 8, 0, 0]);
		data.extend_from_slice(&4096i16.to_le_bytes());
		data.extend_from_slice(&8192i16.to_le_bytes());
		let mut reader = Reader::new(&data);
		let PsxLight(light) = reader.read().unwrap();
		assert_eq!(reader.position(), LIGHT_SIZE);
		assert_eq!(light.direction, Vec3::Y);
		assert_eq!(light.intensity, 255);
		assert_eq!((light.hotspot, light.falloff), (1.0, 2.0));
		assert_eq!((light.length, light.cutoff), (512.0, 1024.0));
	}
}
