//! On-disk records specific to TR5.

use glam::{IVec3, Vec3};
use crate::Readable;
use super::{RoomInfo, Vertex};

/// Room header following the `XELA` marker and the room data size.
/// Offsets are relative to the end of the header.
#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomHeader {
	#[skip_4]
	pub end_sd_offset: u32,
	pub start_sd_offset: u32,
	#[skip_4]
	pub end_portal_offset: u32,
	pub info: RoomInfo,
	pub num_z_sectors: u16,
	pub num_x_sectors: u16,
	/// ARGB
	pub color: u32,
	pub num_lights: u16,
	pub num_static_meshes: u16,
	pub reverb_info: u8,
	pub alternate_group: u8,
	pub water_scheme: u16,
	#[skip_8]
	#[skip_8]
	#[skip_4]
	pub alternate_room: i16,
	pub flags: i16,
	pub unknown: [u32; 3],
	#[skip_4]
	pub unknown2: [u16; 2],
	pub room_pos: Vec3,
	#[skip_8]
	#[skip_8]
	#[skip_8]
	pub num_triangles: u32,
	pub num_rectangles: u32,
	#[skip_4]
	pub light_size: u32,
	pub num_lights2: u32,
	pub num_fog_bulbs: u32,
	pub room_y_top: i32,
	pub room_y_bottom: i32,
	pub num_layers: u32,
	pub layer_offset: u32,
	pub vertices_offset: u32,
	pub poly_offset: u32,
	pub poly_offset2: u32,
	pub num_vertices: u32,
	pub trailer: [u32; 4],
}

pub const ROOM_HEADER_SIZE: usize = 204;

/// Per-layer counts; layer faces index the layer's own vertices.
#[derive(Readable, Clone, Copy, Debug, Default)]
pub struct RoomLayer {
	pub num_vertices: u32,
	pub unknown1: u16,
	pub num_rectangles: u16,
	pub num_triangles: u16,
	pub unknown2: u16,
	#[skip_4]
	pub bound_box: [f32; 6],
	#[skip_4]
	pub unknown3: [u32; 3],
}

/// Remastered layers store their counts inline before each layer's geometry.
#[derive(Readable, Clone, Copy, Debug, Default)]
pub struct RemasteredRoomLayer {
	pub num_vertices: u32,
	pub num_rectangles: u32,
	pub num_triangles: u32,
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomVertex {
	/// Relative to Room
	pub vertex: Vec3,
	pub normal: Vec3,
	/// ARGB
	pub color: u32,
}

impl From<RoomVertex> for Vertex {
	fn from(RoomVertex { vertex, color, .. }: RoomVertex) -> Self {
		let channel = |shift: u32| ((color >> shift) & 0xff) as f32 / 128.0;
		Vertex {
			pos: vertex,
			lighting: 0,
			attributes: 0,
			color: Vec3::new(channel(16), channel(8), channel(0)),
		}
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq)]
pub struct Light {
	/// World coords
	pub pos: Vec3,
	pub color: Vec3,
	#[skip_4]
	pub hotspot: f32,
	pub falloff: f32,
	pub rad_in: f32,
	pub rad_out: f32,
	pub range: f32,
	pub direction: Vec3,
	pub pos2: IVec3,
	pub direction2: IVec3,
	pub light_type: u8,
	pub filler: [u8; 3],
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq)]
pub struct FogBulb {
	/// World coords
	pub pos: Vec3,
	pub color: Vec3,
	#[skip_4]
	pub radius: f32,
	pub density: f32,
}

/// Layer vertex counts as running offsets.
pub(crate) fn layer_offsets(counts: impl IntoIterator<Item = u32>) -> impl Iterator<Item = u16> {
	counts.into_iter().scan(0u16, |offset, count| {
		let start = *offset;
		*offset = offset.wrapping_add(count as u16);
		Some(start)
	})
}

pub const SOUND_MAP_SIZE: usize = 450;
