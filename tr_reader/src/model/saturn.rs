//! Saturn records. Every Saturn file is big-endian and organised as named tagged blocks.

use byteorder::ByteOrder;
use glam::IVec3;
use crate::{Readable, Reader, Result};
use super::{tr1, Entity, RoomStaticMesh};

/// Eight-character block name, space or NUL padded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag(pub [u8; 8]);

impl Tag {
	pub fn name(&self) -> &str {
		let end = self.0.iter().rposition(|&b| b != 0 && b != b' ').map_or(0, |i| i + 1);
		std::str::from_utf8(&self.0[..end]).unwrap_or("")
	}
}

impl std::fmt::Debug for Tag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Tag({:?})", self.name())
	}
}

impl Readable for Tag {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		Ok(Tag(reader.take_array()?))
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaturnObjectTexture {
	pub x0: u8,
	pub y0: u8,
	pub clut: u16,
	pub x1: u8,
	pub y1: u8,
	pub tile: u16,
	pub x2: u8,
	pub y2: u8,
	pub tri_draw: u8,
	pub quad_draw: u8,
	pub x3: u8,
	pub y3: u8,
	pub attribute: u16,
}

impl SaturnObjectTexture {
	/// Pixel size of the area covered by the corners, at least 2x2.
	pub fn size(&self) -> (usize, usize) {
		let xs = [self.x0, self.x1, self.x2, self.x3];
		let ys = [self.y0, self.y1, self.y2, self.y3];
		let extent = |v: [u8; 4]| {
			let min = v.iter().min().copied().unwrap_or(0);
			let max = v.iter().max().copied().unwrap_or(0);
			((max - min) as usize + 1).max(2)
		};
		(extent(xs), extent(ys))
	}
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct Light {
	/// World coords
	pub pos: IVec3,
	pub intensity: u16,
	pub intensity2: u16,
	pub fade: u32,
}

impl From<Light> for tr1::Light {
	fn from(Light { pos, intensity, fade, .. }: Light) -> Self {
		tr1::Light { pos, intensity, fade }
	}
}

/// Room static mesh; the intensity is not used and reads as full bright.
#[derive(Readable, Clone, Copy, Debug)]
pub struct SaturnRoomStaticMesh {
	pub mesh: tr1::RoomStaticMesh,
	pub padding: u16,
}

impl From<SaturnRoomStaticMesh> for RoomStaticMesh {
	fn from(SaturnRoomStaticMesh { mesh, .. }: SaturnRoomStaticMesh) -> Self {
		let mesh = RoomStaticMesh::from(mesh);
		RoomStaticMesh { color: 0xffff, ..mesh }
	}
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct SaturnEntity {
	pub entity: tr1::Entity,
	pub padding: u16,
}

impl From<SaturnEntity> for Entity {
	fn from(SaturnEntity { entity, .. }: SaturnEntity) -> Self {
		entity.into()
	}
}

/// Camera whose room and flag words are stored little-endian.
#[derive(Clone, Copy, Debug)]
pub struct SaturnCamera(pub super::Camera);

impl Readable for SaturnCamera {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let pos = IVec3::read::<E>(reader)?;
		let room = i16::read::<crate::LE>(reader)?;
		let flags = u16::read::<crate::LE>(reader)?;
		Ok(SaturnCamera(super::Camera { pos, room, flags }))
	}
}

/// Mesh primitive group kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
	ColoredTriangles,
	ColoredRectangles,
	TexturedRectangles,
	TexturedTriangles,
}

impl Primitive {
	pub fn from_u16(value: u16) -> Option<Self> {
		match value {
			4 => Some(Primitive::ColoredTriangles),
			5 => Some(Primitive::ColoredRectangles),
			9 | 17 | 49 | 57 => Some(Primitive::TexturedRectangles),
			2 | 8 | 16 => Some(Primitive::TexturedTriangles),
			_ => None,
		}
	}
}

/// Room geometry group kinds inside `MESHSIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomPrimitive {
	InvisibleTriangles,
	InvisibleRectangles,
	Triangles,
	Rectangles,
	Sprites,
}

impl RoomPrimitive {
	pub fn from_u16(value: u16) -> Option<Self> {
		match value {
			34 => Some(RoomPrimitive::InvisibleTriangles),
			35 => Some(RoomPrimitive::InvisibleRectangles),
			36 => Some(RoomPrimitive::Triangles),
			33 | 37 => Some(RoomPrimitive::Rectangles),
			39 => Some(RoomPrimitive::Sprites),
			_ => None,
		}
	}
}

/// Room face and sprite indices are stored shifted left by 4.
pub const INDEX_SHIFT: u32 = 4;
/// Mesh face vertex indices carry a 5-bit shift.
pub const MESH_INDEX_SHIFT: u32 = 5;

#[cfg(test)]
mod tests {
	use crate::BE;
	use super::*;

	#[test]
	fn tag_names_are_trimmed() {
		let mut reader = Reader::new(b"ROOMEND\0MESHPOS ");
		assert_eq!(Tag::read::<BE>(&mut reader).unwrap().name(), "ROOMEND");
		assert_eq!(Tag::read::<BE>(&mut reader).unwrap().name(), "MESHPOS");
	}

	#[test]
	fn camera_room_is_little_endian() {
		let data = [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 5, 0, 1, 0];
		let mut reader = Reader::new(&data);
		let SaturnCamera(camera) = SaturnCamera::read::<BE>(&mut reader).unwrap();
		assert_eq!(camera.pos, IVec3::new(1, 2, 3));
		assert_eq!((camera.room, camera.flags), (5, 1));
	}

	#[test]
	fn texture_size_from_corners() {
		let texture = SaturnObjectTexture { x0: 0, y0: 0, x1: 31, y1: 0, x2: 31, y2: 15, x3: 0, y3: 15, ..Default::default() };
		assert_eq!(texture.size(), (32, 16));
	}
}
