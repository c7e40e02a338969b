//! On-disk records specific to TR1, with conversions to the shared model.

use glam::{I16Vec3, IVec3};
use crate::Readable;
use super::{Animation, Vertex};

#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomVertex {
	/// Relative to Room
	pub vertex: I16Vec3,
	/// 0 is brightest
	pub lighting: i16,
}

impl From<RoomVertex> for Vertex {
	fn from(RoomVertex { vertex, lighting }: RoomVertex) -> Self {
		Vertex::from_brightness(vertex, lighting, 0)
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Light {
	/// World coords
	pub pos: IVec3,
	pub intensity: u16,
	pub fade: u32,
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomStaticMesh {
	/// World coords
	pub pos: IVec3,
	pub rotation: u16,
	pub intensity: u16,
	/// Id into static_meshes
	pub mesh_id: u16,
}

impl From<RoomStaticMesh> for super::RoomStaticMesh {
	fn from(RoomStaticMesh { pos, rotation, intensity, mesh_id }: RoomStaticMesh) -> Self {
		super::RoomStaticMesh { pos, rotation, color: intensity, unused: 0, mesh_id }
	}
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct Entity {
	pub type_id: i16,
	pub room: i16,
	/// World coords
	pub pos: IVec3,
	pub angle: i16,
	pub intensity: i16,
	pub flags: u16,
}

impl From<Entity> for super::Entity {
	fn from(Entity { type_id, room, pos, angle, intensity, flags }: Entity) -> Self {
		super::Entity { type_id, room, pos, angle, intensity1: intensity, intensity2: intensity, flags }
	}
}

/// TR1-3 animation, without lateral motion.
#[derive(Readable, Clone, Copy, Debug)]
pub struct Anim {
	pub frame_offset: u32,
	pub frame_rate: u8,
	pub frame_size: u8,
	pub state: u16,
	pub speed: i32,
	pub accel: i32,
	pub frame_start: u16,
	pub frame_end: u16,
	pub next_animation: u16,
	pub next_frame: u16,
	pub num_state_changes: u16,
	pub state_change: u16,
	pub num_anim_commands: u16,
	pub anim_command: u16,
}

impl From<Anim> for Animation {
	fn from(a: Anim) -> Self {
		Animation {
			frame_offset: a.frame_offset,
			frame_rate: a.frame_rate,
			frame_size: a.frame_size,
			state: a.state,
			speed: a.speed,
			accel: a.accel,
			lateral_speed: 0,
			lateral_accel: 0,
			frame_start: a.frame_start,
			frame_end: a.frame_end,
			next_animation: a.next_animation,
			next_frame: a.next_frame,
			num_state_changes: a.num_state_changes,
			state_change: a.state_change,
			num_anim_commands: a.num_anim_commands,
			anim_command: a.anim_command,
		}
	}
}

/// Boxes are read only to find the zone count.
pub const BOX_SIZE: usize = 20;
pub const ZONES_PER_BOX: usize = 6;
