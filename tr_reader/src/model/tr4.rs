//! On-disk records specific to TR4, some shared with TR5.

use glam::{IVec3, U16Vec2, Vec3};
use byteorder::ByteOrder;
use crate::{Readable, Reader, Result};
use super::{Color3, ObjectTexture, TileAndFlag};

// 1 sector unit = 1024 world coord units

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq)]
pub struct Light {
	/// World coords
	pub pos: IVec3,
	pub color: Color3,
	pub light_type: u8,
	pub unknown: u8,
	pub intensity: u8,
	pub hotspot: f32,
	pub falloff: f32,
	pub length: f32,
	pub cutoff: f32,
	pub direction: Vec3,
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct ObjectTextureFlags(pub u16);

impl ObjectTextureFlags {
	pub fn mapping_correction(&self) -> u16 {
		self.0 & 7
	}

	/// True if room texture, false if object texture
	pub fn room_texture(&self) -> bool {
		self.0 & 0x8000 != 0
	}
}

#[derive(Readable, Clone, Copy, Debug)]
pub struct Tr4ObjectTexture {
	pub attribute: u16,
	pub tile_and_flag: TileAndFlag,
	pub flags: ObjectTextureFlags,
	/// Units are 1/256th of a pixel
	pub vertices: [U16Vec2; 4],
	#[skip_8]
	pub width: u32,
	pub height: u32,
}

impl From<Tr4ObjectTexture> for ObjectTexture {
	fn from(t: Tr4ObjectTexture) -> Self {
		ObjectTexture { attribute: t.attribute, tile_and_flag: t.tile_and_flag, vertices: t.vertices }
	}
}

/// TR5 object textures carry two trailing padding bytes.
#[derive(Clone, Copy, Debug)]
pub struct Tr5ObjectTexture(pub Tr4ObjectTexture);

impl Readable for Tr5ObjectTexture {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let texture = Tr4ObjectTexture::read::<E>(reader)?;
		reader.skip(2)?;
		Ok(Tr5ObjectTexture(texture))
	}
}

impl From<Tr5ObjectTexture> for ObjectTexture {
	fn from(Tr5ObjectTexture(texture): Tr5ObjectTexture) -> Self {
		texture.into()
	}
}

pub const SOUND_MAP_SIZE: usize = 370;
