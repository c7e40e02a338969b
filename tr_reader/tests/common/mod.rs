#![allow(dead_code)]

use byteorder::{WriteBytesExt, LE};
use tr_reader::LoadCallbacks;

pub const PALETTE_BYTES: usize = 256 * 3;
pub const LIGHT_MAP_BYTES: usize = 32 * 256;
pub const TEXTILE8_BYTES: usize = 256 * 256;

/// Little-endian level image written field by field.
#[derive(Default)]
pub struct Builder {
	pub data: Vec<u8>,
}

impl Builder {
	pub fn u8(&mut self, value: u8) -> &mut Self {
		self.data.push(value);
		self
	}

	pub fn u16(&mut self, value: u16) -> &mut Self {
		self.data.write_u16::<LE>(value).unwrap();
		self
	}

	pub fn i16(&mut self, value: i16) -> &mut Self {
		self.data.write_i16::<LE>(value).unwrap();
		self
	}

	pub fn u32(&mut self, value: u32) -> &mut Self {
		self.data.write_u32::<LE>(value).unwrap();
		self
	}

	pub fn i32(&mut self, value: i32) -> &mut Self {
		self.data.write_i32::<LE>(value).unwrap();
		self
	}

	pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
		self.data.extend_from_slice(bytes);
		self
	}

	pub fn fill(&mut self, len: usize, value: u8) -> &mut Self {
		self.data.resize(self.data.len() + len, value);
		self
	}

	/// `count` empty `u32`-counted tables.
	pub fn empty(&mut self, count: usize) -> &mut Self {
		for _ in 0..count {
			self.u32(0);
		}
		self
	}

	pub fn position(&self) -> usize {
		self.data.len()
	}
}

/// Where the TR1 palette goes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PaletteAt {
	Retail,
	Demo,
}

pub const ROOM_X: i32 = 2048;
pub const ENTITY_TYPE: i16 = 12;
pub const SAMPLE: &[u8] = b"RIFF\x04\0\0\0WAVE";

/// One textured triangle over one vertex, lit by one light value.
pub fn pc_mesh(b: &mut Builder) {
	b.i16(0).i16(0).i16(0).i32(64);
	b.i16(1).i16(10).i16(20).i16(30);
	b.i16(-1).i16(4096);
	// textured rectangles
	b.i16(0);
	b.i16(1).u16(0).u16(0).u16(0).u16(0);
	// coloured rectangles and triangles
	b.i16(0).i16(0);
}

/// A TR1 PC level: one textile, one room with one vertex and one sector, one model,
/// one entity, one embedded sample.
pub fn tr1_level(palette_at: PaletteAt) -> Vec<u8> {
	let mut b = Builder::default();
	b.u32(0x20);
	// one textile, every pixel index 1 except the first
	b.u32(1).u8(0).fill(TEXTILE8_BYTES - 1, 1);
	b.u32(0);

	// rooms
	b.u16(1);
	b.i32(ROOM_X).i32(1024).i32(0).i32(-1024);
	b.u32(6).i16(1).i16(0).i16(-256).i16(512).i16(4096).i16(0).i16(0).i16(0);
	// portals
	b.u16(0);
	// one sector
	b.u16(1).u16(1).u16(3).u16(0).u8(255).u8(0x81).u8(255).u8(0x81);
	// ambient, lights, static meshes, alternate room, flags
	b.i16(100).u16(0).u16(0).i16(-1).i16(1);

	// floor data
	b.u32(2).u16(0x8001).u16(7);
	let mut mesh = Builder::default();
	pc_mesh(&mut mesh);
	b.u32(mesh.data.len() as u32 / 2).bytes(&mesh.data);
	b.u32(2).u32(0).u32(0);
	// animations, state changes, dispatches, commands, mesh tree, frames
	b.empty(6);
	// one model on mesh pointer 1
	b.u32(1).u32(0).u16(1).u16(1).u32(0).u32(0).u16(0xffff);
	// static meshes, object textures, sprite textures, sprite sequences
	b.empty(4);
	if palette_at == PaletteAt::Demo {
		b.fill(PALETTE_BYTES, 63);
	}
	// cameras, sound sources, boxes, overlaps (no zones), animated textures
	b.empty(5);
	b.u32(1).i16(ENTITY_TYPE).i16(0).i32(ROOM_X + 512).i32(0).i32(1536).i16(0x4000).i16(-1).u16(0x3e00);
	b.fill(LIGHT_MAP_BYTES, 0);
	if palette_at == PaletteAt::Retail {
		b.fill(PALETTE_BYTES, 63);
	}
	// cinematic frames, demo data
	b.u16(0).u16(0);
	b.fill(256 * 2, 0xff);
	// sound details
	b.u32(0);
	b.u32(SAMPLE.len() as u32).bytes(SAMPLE);
	b.u32(1).u32(0);
	b.data
}

/// A TR1 PC level with every table empty and no sound map.
pub fn empty_tr1_level() -> Vec<u8> {
	let mut b = Builder::default();
	b.u32(0x20).u32(0).u32(0).u16(0);
	// floor data through the entities
	b.empty(20);
	b.fill(LIGHT_MAP_BYTES, 0).fill(PALETTE_BYTES, 0);
	// cinematic frames, demo data
	b.u16(0).u16(0);
	// sound details, sound data, sample indices
	b.empty(3);
	b.data
}

/// Counts what the decoder hands out.
#[derive(Default)]
pub struct Recorder {
	pub progress: Vec<String>,
	pub textiles: Vec<Vec<u32>>,
	pub sounds: Vec<(u16, Vec<u8>)>,
}

impl LoadCallbacks for Recorder {
	fn on_progress(&mut self, message: &str) {
		self.progress.push(message.to_owned());
	}

	fn on_textile(&mut self, pixels: &[u32]) {
		self.textiles.push(pixels.to_vec());
	}

	fn on_sound(&mut self, index: u16, data: &[u8]) {
		self.sounds.push((index, data.to_vec()));
	}
}
