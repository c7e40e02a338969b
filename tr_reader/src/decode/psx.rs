//! Steps shared by the TR1-3 PlayStation layouts: VAB sound banks, 4-bit textiles with their
//! CLUTs, and object/sprite textures pointing into them.

use log::debug;
use crate::{
	files,
	model::{
		psx::{self, Clut, PsxObjectTexture, PsxSpriteTexture, TEXTILE4_SIZE},
		ObjectTexture, Room,
	},
	read_vec,
	sound::read_vab,
	texture::{textile16_to_rgba, ClutResolver, IndexedTextiles, TransparencyRule},
	Reader, Result, LE,
};
use super::{in_order, Context, Samples};

/// On-disk size of `PsxObjectTexture`
pub const OBJECT_TEXTURE_SIZE: usize = 16;

/// Raw 4-bit textiles and CLUTs, plus the 16-bit textiles converted from them so far.
#[derive(Debug, Default)]
pub struct PsxTextures {
	textiles: Vec<u8>,
	cluts: Vec<Clut>,
	resolver: ClutResolver,
	converted: Vec<Vec<u16>>,
}

impl PsxTextures {
	pub fn read(reader: &mut Reader, num_textiles: usize, num_cluts: usize) -> Result<Self> {
		let textiles = reader.take(num_textiles.saturating_mul(TEXTILE4_SIZE))?.to_vec();
		let cluts = read_vec::<LE, Clut>(reader, num_cluts)?;
		Ok(PsxTextures { textiles, cluts, ..Default::default() })
	}

	pub fn num_textiles(&self) -> usize {
		self.textiles.len() / TEXTILE4_SIZE
	}

	pub fn num_cluts(&self) -> usize {
		self.cluts.len()
	}

	/// Converted textile index for the pair.
	pub fn resolve_tile(&mut self, tile: u16, clut: u16) -> u16 {
		let source = IndexedTextiles { textiles: &self.textiles, cluts: &self.cluts };
		let (index, pixels) = self.resolver.resolve(&source, tile, clut);
		self.converted.extend(pixels);
		index
	}

	pub fn resolve_texture(&mut self, texture: &mut PsxObjectTexture, rule: TransparencyRule) -> ObjectTexture {
		let source = IndexedTextiles { textiles: &self.textiles, cluts: &self.cluts };
		let pixels = self.resolver.resolve_object_texture(&source, texture, rule);
		self.converted.extend(pixels);
		texture.to_object_texture()
	}

	/// Textiles converted since the last call.
	pub fn take_converted(&mut self) -> Vec<Vec<u16>> {
		std::mem::take(&mut self.converted)
	}
}

/// Texture value ending a roomlet's quads
const END_OF_QUADS: u32 = 0x3ff;

/// Roomlet geometry at each offset from `data_start`, appended to `room`.
///
/// A roomlet is a 6-byte bounding box, vertex and triangle counts, packed vertices and
/// triangles, then quads in groups of three after a word holding their three 10-bit textures.
pub fn roomlets(reader: &mut Reader, room: &mut Room, data_start: usize, offsets: &[u32]) -> Result<()> {
	for &offset in offsets {
		reader.seek(data_start.saturating_add(offset as usize));
		reader.skip(6)?;
		let num_vertices = reader.read::<u8>()? as usize;
		let num_triangles = reader.read::<u8>()? as usize;
		let y_top = room.info.y_top;
		let vertices = read_vec::<LE, u32>(reader, num_vertices)?
			.into_iter()
			.map(|v| psx::unpack_color_vertex(v, y_top))
			.collect::<Vec<_>>();
		let triangles = read_vec::<LE, u32>(reader, num_triangles)?
			.into_iter()
			.map(psx::unpack_roomlet_triangle)
			.collect::<Vec<_>>();
		let mut quads = vec![];
		'groups: loop {
			let textures = reader.read::<u32>()?;
			let faces = reader.read::<[u32; 3]>()?;
			for (index, face) in faces.into_iter().enumerate() {
				let texture = (textures >> (10 * index)) & END_OF_QUADS;
				if texture == END_OF_QUADS {
					break 'groups;
				}
				quads.push(psx::unpack_roomlet_quad(face, texture as u16));
			}
		}
		debug!("[{}] Roomlet of {} vertices, {} triangles, {} quads", reader.position(), vertices.len(), triangles.len(), quads.len());
		room.append_geometry(vertices, quads, triangles);
	}
	Ok(())
}

/// Sample rate of the TR1 and TR3 banks
pub const SAMPLE_RATE: u32 = 11025;
/// Sample rate of the retail TR2 banks
pub const TR2_SAMPLE_RATE: u32 = 8000;

impl Context<'_> {
	/// `num_textiles` 4-bit textiles followed by `num_cluts` CLUTs.
	pub fn psx_textiles(&mut self, reader: &mut Reader, num_textiles: usize, num_cluts: usize) -> Result<PsxTextures> {
		self.step(reader, "textiles");
		let textures = PsxTextures::read(reader, num_textiles, num_cluts)?;
		debug!("[{}] Read {} textile4s and {} cluts", reader.position(), textures.num_textiles(), textures.num_cluts());
		Ok(textures)
	}

	/// Counted textiles then counted CLUTs, `clut_factor` CLUTs per count.
	pub fn psx_counted_textiles(&mut self, reader: &mut Reader, clut_factor: usize) -> Result<PsxTextures> {
		self.step(reader, "textiles");
		let num_textiles = reader.read::<u32>()? as usize;
		let textiles = reader.take(num_textiles.saturating_mul(TEXTILE4_SIZE))?.to_vec();
		let mut num_cluts = reader.read::<u32>()?;
		if num_cluts & 0xffff0000 != 0 {
			// two bytes of padding before the count
			reader.seek(reader.position() - 2);
			num_cluts = reader.read()?;
		}
		let cluts = read_vec::<LE, Clut>(reader, (num_cluts as usize).saturating_mul(clut_factor))?;
		debug!("[{}] Read {} textile4s and {} cluts", reader.position(), num_textiles, cluts.len());
		Ok(PsxTextures { textiles, cluts, ..Default::default() })
	}

	pub fn psx_object_textures(
		&mut self,
		reader: &mut Reader,
		textures: &mut PsxTextures,
		rule: TransparencyRule,
	) -> Result<()> {
		let raw = self.list::<u32, PsxObjectTexture, PsxObjectTexture>(reader, "object textures")?;
		self.level.object_textures = raw.into_iter().map(|mut texture| textures.resolve_texture(&mut texture, rule)).collect();
		Ok(())
	}

	pub fn psx_sprite_textures(&mut self, reader: &mut Reader, textures: &mut PsxTextures) -> Result<()> {
		let raw = self.list::<u32, PsxSpriteTexture, PsxSpriteTexture>(reader, "sprite textures")?;
		self.level.sprite_textures = raw.iter().map(|sprite| sprite.to_sprite(textures.resolve_tile(sprite.tile, sprite.clut))).collect();
		Ok(())
	}

	/// Room textures, each stored with two lower detail copies that are passed over.
	pub fn psx_room_textures(&mut self, reader: &mut Reader, textures: &mut PsxTextures) -> Result<()> {
		self.step(reader, "room textures");
		let count = reader.read::<u32>()? as usize;
		let mut room_textures = Vec::with_capacity(count.min(reader.remaining() / OBJECT_TEXTURE_SIZE));
		for _ in 0..count {
			let mut texture = reader.read::<PsxObjectTexture>()?;
			reader.skip(OBJECT_TEXTURE_SIZE * 2)?;
			room_textures.push(textures.resolve_texture(&mut texture, TransparencyRule::TextureArea));
		}
		self.finished(reader, room_textures.len(), "room textures");
		self.append_room_textures(room_textures);
		Ok(())
	}

	/// Room faces number room textures from zero. They are stored after the object textures,
	/// so every room face is moved past them.
	pub fn append_room_textures(&mut self, room_textures: Vec<ObjectTexture>) {
		let base = self.level.object_textures.len() as u16;
		debug!("Moving room textures past {} object textures", base);
		for room in &mut self.level.rooms {
			for face in &mut room.rectangles {
				face.texture = face.texture.wrapping_add(base);
			}
			for face in &mut room.triangles {
				face.texture = face.texture.wrapping_add(base);
			}
		}
		self.level.object_textures.extend(room_textures);
	}

	/// Hands over textiles converted so far. `force_alpha` makes every non-black pixel opaque.
	pub fn emit_psx_textiles(&mut self, textures: &mut PsxTextures, force_alpha: bool) {
		for mut textile in textures.take_converted() {
			if force_alpha {
				for pixel in textile.iter_mut().filter(|p| **p != 0) {
					*pixel |= 0x8000;
				}
			}
			self.emit_textile(&textile16_to_rgba(&textile));
		}
	}

	/// Sound bank at the cursor: header size, `pBAV` header, body size, bodies.
	/// The cursor always ends up after the bank.
	pub fn psx_sound_bank(&mut self, reader: &mut Reader, sample_rate: u32) -> Result<()> {
		let start = reader.position();
		reader.skip(16)?;
		let bank_size = reader.read::<u32>()? as usize;
		reader.skip(2)?;
		self.sounds(reader, |ctx, reader| {
			ctx.progress("Reading sound bank");
			Ok(in_order(read_vab(reader, sample_rate)?))
		});
		reader.seek(start.saturating_add(bank_size).saturating_add(8));
		Ok(())
	}

	/// `PSXSOUND/<name>.VBH` and `.VBB`, joined into one bank.
	pub fn external_sound_bank(&mut self) -> Result<Samples> {
		self.progress("Reading external sound bank");
		let mut bank = self.companion(|level| files::psx_sound_bank_paths(level).0)?;
		let body = self.companion(|level| files::psx_sound_bank_paths(level).1)?;
		bank.extend_from_slice(&(body.len() as u32).to_le_bytes());
		bank.extend_from_slice(&body);
		let mut reader = Reader::new(&bank);
		// magic, version, id, total size, reserved
		reader.skip(18)?;
		Ok(in_order(read_vab(&mut reader, SAMPLE_RATE)?))
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		model::{psx::CLUT_COLORS, Face, Vertex},
		Level, LoadCallbacks, LoadOptions,
	};
	use super::*;

	#[derive(Default)]
	struct Textiles(Vec<Vec<u32>>);

	impl LoadCallbacks for Textiles {
		fn on_textile(&mut self, pixels: &[u32]) {
			self.0.push(pixels.to_vec());
		}
	}

	fn textures() -> PsxTextures {
		let mut data = vec![0x10; TEXTILE4_SIZE];
		let mut clut = [0x801fu16; CLUT_COLORS];
		clut[0] = 0;
		for colour in clut {
			data.extend_from_slice(&colour.to_le_bytes());
		}
		PsxTextures::read(&mut Reader::new(&data), 1, 1).unwrap()
	}

	#[test]
	fn sprites_share_converted_textiles() {
		let mut textures = textures();
		assert_eq!(textures.resolve_tile(0, 0), 0);
		assert_eq!(textures.resolve_tile(0, 0), 0);
		assert_eq!(textures.take_converted().len(), 1);
		assert!(textures.take_converted().is_empty());
	}

	#[test]
	fn room_textures_follow_object_textures() {
		let options = LoadOptions::default();
		let mut textiles = Textiles::default();
		let mut ctx = Context::new(Level::default(), &options, &(), None, &mut textiles);
		ctx.level.object_textures = vec![ObjectTexture::default(); 3];
		let mut room = Room::default();
		room.append_geometry([Vertex::default(); 3], Vec::<Face<4>>::new(), [Face::new([0, 1, 2], 1)]);
		ctx.level.rooms.push(room);

		let mut data = 1u32.to_le_bytes().to_vec();
		data.extend_from_slice(&[0; OBJECT_TEXTURE_SIZE * 3]);
		let mut textures = textures();
		ctx.psx_room_textures(&mut Reader::new(&data), &mut textures).unwrap();
		assert_eq!(ctx.level.object_textures.len(), 4);
		assert_eq!(ctx.level.rooms[0].triangles[0].texture, 4);
		// pixel (0, 0) uses CLUT entry 0, which is transparent
		assert_eq!(ctx.level.object_textures[3].attribute, 1);

		ctx.emit_psx_textiles(&mut textures, true);
		assert_eq!(ctx.level.num_textiles, 1);
		drop(ctx);
		assert_eq!(textiles.0[0][0], 0);
		assert_eq!(textiles.0[0][1], 0xff0000ff);
	}

	fn word(data: &mut Vec<u8>, value: u32) {
		data.extend_from_slice(&value.to_le_bytes());
	}

	#[test]
	fn roomlet_faces_follow_earlier_roomlets() {
		let mut data = vec![];
		let mut offsets = vec![];
		for _ in 0..2 {
			offsets.push(data.len() as u32);
			data.extend_from_slice(&[0; 6]);
			// two vertices, one triangle
			data.extend_from_slice(&[2, 1]);
			word(&mut data, 0);
			word(&mut data, 1 << 10);
			word(&mut data, 1 << 7 | 1 << 21);
			// one quad, then the end marker in the second slot
			word(&mut data, 5 | 0x3ff << 10);
			word(&mut data, 1 << 7 | 1 << 14);
			word(&mut data, 0xdead);
			word(&mut data, 0xbeef);
		}
		let mut room = Room::default();
		roomlets(&mut Reader::new(&data), &mut room, 0, &offsets).unwrap();
		assert_eq!(room.vertices.len(), 4);
		assert_eq!(room.triangles[1].vertices, [2, 3, 2]);
		assert_eq!(room.triangles[1].texture, 1);
		assert_eq!((room.rectangles.len(), room.rectangles[1].vertices), (2, [2, 3, 2, 3]));
		assert_eq!(room.rectangles[0].texture, 5);
		assert!(room.face_indices_in_range());
	}

	#[test]
	fn clut_count_after_padding() {
		let options = LoadOptions::default();
		let mut callbacks = ();
		let mut ctx = Context::new(Level::default(), &options, &(), None, &mut callbacks);
		let mut data = 0u32.to_le_bytes().to_vec();
		data.extend_from_slice(&[0xcd, 0xab]);
		data.extend_from_slice(&1u32.to_le_bytes());
		data.extend_from_slice(&[0; 32 * 2]);
		let mut reader = Reader::new(&data);
		let textures = ctx.psx_counted_textiles(&mut reader, 2).unwrap();
		assert_eq!(textures.num_cluts(), 2);
		assert!(reader.is_at_end());
	}
}
