//! On-disk records specific to TR2.

use glam::{I16Vec3, IVec3};
use crate::Readable;
use super::Vertex;

#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomVertex {
	/// Relative to Room
	pub vertex: I16Vec3,
	pub lighting: i16,
	pub attributes: u16,
	/// Brightness used in place of `lighting`
	pub lighting2: i16,
}

impl From<RoomVertex> for Vertex {
	fn from(RoomVertex { vertex, attributes, lighting2, .. }: RoomVertex) -> Self {
		Vertex::from_brightness(vertex, lighting2, attributes)
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Light {
	/// World coords
	pub pos: IVec3,
	pub intensity1: u16,
	pub intensity2: u16,
	pub fade1: u32,
	pub fade2: u32,
}

pub const BOX_SIZE: usize = 8;
pub const ZONES_PER_BOX: usize = 10;
