//! Textile pixel conversion, PSX CLUT resolution and the Saturn tile atlas.
//!
//! Every textile handed to `LoadCallbacks::on_textile` is 256x256 `u32` pixels in `0xAABBGGRR`.

use glam::U16Vec2;
use log::debug;
use crate::model::{
	psx::{Clut, PsxObjectTexture, CLUT_COLORS, RESOLVED, TEXTILE4_SIZE},
	Color3, ObjectTexture, SpriteTexture, TileAndFlag, IMAGE_SIZE, NUM_PIXELS,
};

pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
	(a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

fn expand5(channel: u16) -> u8 {
	((channel & 0x1f) as u32 * 255 / 31) as u8
}

/// 8-bit indexed textile through a 6-bit palette. Index 0 is transparent.
pub fn textile8_to_rgba(textile: &[u8], palette: &[Color3]) -> Vec<u32> {
	textile
		.iter()
		.map(|&index| match (index, palette.get(index as usize)) {
			(0, _) | (_, None) => 0,
			(_, Some(&Color3 { r, g, b })) => {
				rgba(r.saturating_mul(4), g.saturating_mul(4), b.saturating_mul(4), 0xff)
			},
		})
		.collect()
}

/// `ARRRRRGGGGGBBBBB`
pub fn argb1555_to_rgba(pixel: u16) -> u32 {
	let a = if pixel & 0x8000 != 0 { 0xff } else { 0 };
	rgba(expand5(pixel >> 10), expand5(pixel >> 5), expand5(pixel), a)
}

/// 32-bit textiles are stored as B, G, R, A bytes.
pub fn bgra_to_rgba(pixel: u32) -> u32 {
	let [b, g, r, a] = pixel.to_le_bytes();
	rgba(r, g, b, a)
}

/// TR2 E3 textiles ignore the alpha bit; magenta and black are transparent.
pub fn e3_555_to_rgba(pixel: u16) -> u32 {
	let (r, g, b) = (expand5(pixel >> 10), expand5(pixel >> 5), expand5(pixel));
	match (r, g, b) {
		(255, 0, 255) | (0, 0, 0) => 0,
		_ => rgba(r, g, b, 0xff),
	}
}

/// PSX colour (red in the low bits) to `ARRRRRGGGGGBBBBB`.
pub fn psx_to_argb1555(colour: u16) -> u16 {
	let r = colour & 0x1f;
	let g = (colour >> 5) & 0x1f;
	let b = (colour >> 10) & 0x1f;
	(colour & 0x8000) | r << 10 | g << 5 | b
}

pub fn textile16_to_rgba(textile: &[u16]) -> Vec<u32> {
	textile.iter().copied().map(argb1555_to_rgba).collect()
}

/// Source of 4-bit indexed pixels and CLUTs.
pub trait TextileSource {
	/// Colour index of pixel (`x`, `y`) of `tile`, `None` if the tile does not exist.
	fn index(&self, tile: u16, x: usize, y: usize) -> Option<u8>;
	fn clut(&self, clut: u16) -> Option<Clut>;
}

/// Two pixels per byte, the even pixel in the low nibble.
fn nibble(byte: u8, x: usize) -> u8 {
	if x % 2 == 1 { byte >> 4 } else { byte & 0xf }
}

/// 4-bit textiles stored back to back with a separate CLUT table (TR1-3 PSX).
pub struct IndexedTextiles<'a> {
	pub textiles: &'a [u8],
	pub cluts: &'a [Clut],
}

impl TextileSource for IndexedTextiles<'_> {
	fn index(&self, tile: u16, x: usize, y: usize) -> Option<u8> {
		let offset = tile as usize * TEXTILE4_SIZE + (y * IMAGE_SIZE + x) / 2;
		if tile as usize >= self.textiles.len() / TEXTILE4_SIZE {
			return None;
		}
		self.textiles.get(offset).map(|&byte| nibble(byte, x))
	}

	fn clut(&self, clut: u16) -> Option<Clut> {
		self.cluts.get(clut as usize).copied()
	}
}

/// Right half of PSX VRAM (TR4/5 PSX). Texture pages and CLUTs are VRAM addresses.
pub struct Vram<'a> {
	pub data: &'a [u8],
}

impl Vram<'_> {
	/// Bytes per VRAM row
	pub const STRIDE: usize = 1024;
	pub const SIZE: usize = 0x80000;

	/// Page origin, x in bytes.
	fn page(tile: u16) -> Option<(usize, usize)> {
		let x = (tile as i32 & 0xf) * 64;
		let y = ((tile as i32 >> 4) & 1) * 256;
		let x = (x - 512) * 2;
		Some((usize::try_from(x).ok()?, y as usize))
	}
}

impl TextileSource for Vram<'_> {
	fn index(&self, tile: u16, x: usize, y: usize) -> Option<u8> {
		let (tx, ty) = Self::page(tile)?;
		self.data.get((ty + y) * Self::STRIDE + tx + x / 2).map(|&byte| nibble(byte, x))
	}

	fn clut(&self, clut: u16) -> Option<Clut> {
		let x = (clut as i32 & 0x3f) * 16;
		let y = ((clut >> 6) & 0x1ff) as usize;
		let x = usize::try_from((x - 512) * 2).ok()?;
		let start = y * Self::STRIDE + x;
		let bytes = self.data.get(start..start + CLUT_COLORS * 2)?;
		let mut colours = [0; CLUT_COLORS];
		for (colour, pair) in colours.iter_mut().zip(bytes.chunks_exact(2)) {
			*colour = u16::from_le_bytes([pair[0], pair[1]]);
		}
		Some(colours)
	}
}

/// Applies `clut` to `tile`. Missing tiles or CLUTs give an all-zero textile.
pub fn convert_textile4(source: &dyn TextileSource, tile: u16, clut: u16) -> Vec<u16> {
	let mut pixels = vec![0u16; NUM_PIXELS];
	let Some(colours) = source.clut(clut) else {
		return pixels;
	};
	if source.index(tile, 0, 0).is_none() {
		return pixels;
	}
	for y in 0..IMAGE_SIZE {
		for x in 0..IMAGE_SIZE {
			if let Some(index) = source.index(tile, x, y) {
				pixels[y * IMAGE_SIZE + x] = psx_to_argb1555(colours[index as usize]);
			}
		}
	}
	pixels
}

/// Alpha-tested if the CLUT has a fully transparent entry.
pub fn attribute_for_clut(clut: &Clut) -> u16 {
	clut.contains(&0) as u16
}

/// Alpha-tested if any pixel inside the texture's corners maps to a transparent colour.
pub fn attribute_for_object_texture(source: &dyn TextileSource, texture: &PsxObjectTexture, clut: &Clut) -> u16 {
	let xs = [texture.x0, texture.x1, texture.x2, texture.x3];
	let ys = [texture.y0, texture.y1, texture.y2, texture.y3];
	let (Some(&x0), Some(&x1)) = (xs.iter().min(), xs.iter().max()) else {
		return 0;
	};
	let (Some(&y0), Some(&y1)) = (ys.iter().min(), ys.iter().max()) else {
		return 0;
	};
	for y in y0 as usize..=y1 as usize {
		for x in x0 as usize..=x1 as usize {
			if let Some(index) = source.index(texture.tile, x, y) {
				if clut[index as usize] == 0 {
					return 1;
				}
			}
		}
	}
	0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransparencyRule {
	/// TR1 PSX
	Clut,
	/// TR2 PSX keeps the attribute stored with the texture
	Stored,
	/// TR3+ PSX
	TextureArea,
}

/// Converts each distinct (tile, CLUT) pair once.
/// Indices are positions in the list of converted textiles.
#[derive(Debug, Default)]
pub struct ClutResolver {
	converted: Vec<(u16, u16)>,
}

impl ClutResolver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of converted textiles.
	pub fn len(&self) -> usize {
		self.converted.len()
	}

	pub fn is_empty(&self) -> bool {
		self.converted.is_empty()
	}

	/// Textile index for the pair, with the new textile's pixels the first time the pair is seen.
	pub fn resolve(&mut self, source: &dyn TextileSource, tile: u16, clut: u16) -> (u16, Option<Vec<u16>>) {
		if let Some(index) = self.converted.iter().position(|&pair| pair == (tile, clut)) {
			return (index as u16, None);
		}
		debug!("Converting textile {} with clut {}", tile, clut);
		self.converted.push((tile, clut));
		((self.converted.len() - 1) as u16, Some(convert_textile4(source, tile, clut)))
	}

	/// Points `texture` at its converted textile and marks it resolved.
	/// Resolving an already resolved texture changes nothing.
	pub fn resolve_object_texture(
		&mut self,
		source: &dyn TextileSource,
		texture: &mut PsxObjectTexture,
		rule: TransparencyRule,
	) -> Option<Vec<u16>> {
		if texture.is_resolved() {
			return None;
		}
		let clut = source.clut(texture.clut).unwrap_or_default();
		texture.attribute = match rule {
			TransparencyRule::Clut => attribute_for_clut(&clut),
			TransparencyRule::Stored => texture.attribute,
			TransparencyRule::TextureArea => attribute_for_object_texture(source, texture, &clut),
		};
		let (index, pixels) = self.resolve(source, texture.tile, texture.clut);
		texture.tile = index;
		texture.clut = RESOLVED;
		pixels
	}
}

/// Packs pixel blocks into 256x256 textiles left to right, top to bottom.
/// A textile is published when the next block does not fit below the current rows.
pub struct TileMapper {
	current: Vec<u32>,
	textile: u16,
	x: usize,
	y: usize,
	y_extent: usize,
	published: usize,
}

impl TileMapper {
	/// `first_textile` is the index the first published textile will have.
	pub fn new(first_textile: u16) -> Self {
		TileMapper { current: vec![0; NUM_PIXELS], textile: first_textile, x: 0, y: 0, y_extent: 0, published: 0 }
	}

	pub fn published(&self) -> usize {
		self.published
	}

	fn publish(&mut self, on_publish: &mut dyn FnMut(&[u32])) {
		on_publish(&self.current);
		self.published += 1;
		self.textile = self.textile.wrapping_add(1);
		self.current.fill(0);
		self.x = 0;
		self.y = 0;
		self.y_extent = 0;
	}

	fn find_space(&mut self, width: usize, height: usize, on_publish: &mut dyn FnMut(&[u32])) {
		if self.x + width > IMAGE_SIZE {
			self.y = self.y_extent;
			self.x = 0;
		}
		if self.y + height > IMAGE_SIZE {
			self.publish(on_publish);
		}
	}

	/// Copies the block in, cropping anything beyond one textile.
	fn place(&mut self, data: &[u32], width: usize, height: usize, on_publish: &mut dyn FnMut(&[u32])) -> (usize, usize) {
		let (width, height) = (width.clamp(2, IMAGE_SIZE), height.clamp(2, IMAGE_SIZE));
		self.find_space(width, height, on_publish);
		for (row, source) in data.chunks(width.max(1)).take(height).enumerate() {
			let start = (self.y + row) * IMAGE_SIZE + self.x;
			let len = source.len().min(width);
			self.current[start..start + len].copy_from_slice(&source[..len]);
		}
		(width, height)
	}

	fn advance(&mut self, width: usize, height: usize) {
		self.x += width;
		self.y_extent = self.y_extent.max(self.y + height);
	}

	/// Places `data` (`width` x `height` pixels, row-major) and returns an object texture
	/// covering it with a one pixel inset.
	pub fn map(&mut self, data: &[u32], width: usize, height: usize, on_publish: &mut dyn FnMut(&[u32])) -> ObjectTexture {
		let (width, height) = self.place(data, width, height, on_publish);
		let corner = |x: usize, y: usize| U16Vec2::new(x as u16, y as u16) << 8;
		let (left, top) = (self.x + 1, self.y + 1);
		let (right, bottom) = (self.x + width - 1, self.y + height - 1);
		let texture = ObjectTexture {
			attribute: data.iter().any(|p| p & 0xff00_0000 == 0) as u16,
			tile_and_flag: TileAndFlag(self.textile),
			vertices: [corner(left, top), corner(right, top), corner(left, bottom), corner(right, bottom)],
		};
		self.advance(width, height);
		texture
	}

	/// As `map`, keeping the sprite's world-space extents.
	pub fn map_sprite(
		&mut self,
		data: &[u32],
		width: usize,
		height: usize,
		sprite: &SpriteTexture,
		on_publish: &mut dyn FnMut(&[u32]),
	) -> SpriteTexture {
		let (width, height) = self.place(data, width, height, on_publish);
		let texture = SpriteTexture {
			tile: self.textile,
			x: (self.x + 1) as u8,
			y: (self.y + 1) as u8,
			width: (((width - 2) << 8) + 255) as u16,
			height: (((height - 2) << 8) + 255) as u16,
			..*sprite
		};
		self.advance(width, height);
		texture
	}

	/// Publishes the textile in progress.
	pub fn finish(mut self, on_publish: &mut dyn FnMut(&[u32])) -> usize {
		self.publish(on_publish);
		self.published
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Solid {
		tiles: u16,
		cluts: Vec<Clut>,
	}

	impl TextileSource for Solid {
		fn index(&self, tile: u16, x: usize, _y: usize) -> Option<u8> {
			(tile < self.tiles).then_some((x % 16) as u8)
		}

		fn clut(&self, clut: u16) -> Option<Clut> {
			self.cluts.get(clut as usize).copied()
		}
	}

	fn source() -> Solid {
		let mut clut = [0x801f; CLUT_COLORS];
		clut[0] = 0;
		Solid { tiles: 2, cluts: vec![clut, [0xfc00; CLUT_COLORS]] }
	}

	#[test]
	fn colour_conversions() {
		assert_eq!(argb1555_to_rgba(0xfc00), 0xff0000ff);
		assert_eq!(argb1555_to_rgba(0x03e0), 0x0000ff00);
		assert_eq!(bgra_to_rgba(u32::from_le_bytes([1, 2, 3, 4])), 0x04010203);
		assert_eq!(e3_555_to_rgba(0x7c1f), 0);
		assert_eq!(psx_to_argb1555(0x801f), 0xfc00);
		let palette = [Color3::default(), Color3 { r: 63, g: 0, b: 1 }];
		assert_eq!(textile8_to_rgba(&[0, 1, 2], &palette), vec![0, 0xff0400fc, 0]);
	}

	#[test]
	fn pairs_are_converted_once() {
		let source = source();
		let mut resolver = ClutResolver::new();
		let (first, pixels) = resolver.resolve(&source, 1, 0);
		assert_eq!(first, 0);
		let pixels = pixels.unwrap();
		assert_eq!(pixels.len(), NUM_PIXELS);
		assert_eq!((pixels[0], pixels[1]), (0, 0xfc00));
		assert_eq!(resolver.resolve(&source, 1, 0), (0, None));
		assert_eq!(resolver.resolve(&source, 1, 1).0, 1);
		assert_eq!(resolver.len(), 2);
	}

	#[test]
	fn resolving_a_texture_twice_is_a_no_op() {
		let source = source();
		let mut resolver = ClutResolver::new();
		let mut texture = PsxObjectTexture { tile: 1, clut: 0, x1: 3, ..Default::default() };
		assert!(resolver.resolve_object_texture(&source, &mut texture, TransparencyRule::Clut).is_some());
		assert!(texture.is_resolved());
		assert_eq!((texture.tile, texture.attribute), (0, 1));
		let snapshot = texture;
		assert!(resolver.resolve_object_texture(&source, &mut texture, TransparencyRule::Clut).is_none());
		assert_eq!(texture, snapshot);
		assert_eq!(resolver.len(), 1);
	}

	#[test]
	fn transparency_by_area_ignores_unused_entries() {
		let source = source();
		let texture = PsxObjectTexture { tile: 0, x0: 1, x1: 15, x2: 1, x3: 15, ..Default::default() };
		let clut = source.cluts[0];
		assert_eq!(attribute_for_object_texture(&source, &texture, &clut), 0);
		let texture = PsxObjectTexture { x0: 0, ..texture };
		assert_eq!(attribute_for_object_texture(&source, &texture, &clut), 1);
	}

	#[test]
	fn missing_tile_gives_blank_textile() {
		let pixels = convert_textile4(&source(), 9, 0);
		assert!(pixels.iter().all(|&p| p == 0));
	}

	#[test]
	fn vram_pages_and_cluts() {
		let mut data = vec![0u8; Vram::SIZE];
		// clut 0x20 -> x 512 halfwords, row 0
		data[0] = 0x1f;
		data[1] = 0x80;
		// page 8 -> byte 0 of row 0
		data[Vram::STRIDE * 3] = 0x10;
		let vram = Vram { data: &data };
		assert_eq!(vram.clut(0x20).map(|c| c[0]), Some(0x801f));
		assert_eq!(vram.index(8, 1, 3), Some(1));
		assert_eq!(vram.index(0, 0, 0), None);
		assert_eq!(vram.clut(0), None);
	}

	#[test]
	fn tile_mapper_rows_and_pages() {
		let mut published = vec![];
		let mut on_publish = |textile: &[u32]| published.push(textile.to_vec());
		let mut mapper = TileMapper::new(5);
		let block = vec![0xff00_00ffu32; 200 * 100];
		let a = mapper.map(&block, 200, 100, &mut on_publish);
		let b = mapper.map(&block, 200, 100, &mut on_publish);
		let c = mapper.map(&block, 200, 100, &mut on_publish);
		assert_eq!(a.tile(), 5);
		assert_eq!(a.pixel(0), U16Vec2::new(1, 1));
		assert_eq!(a.pixel(3), U16Vec2::new(199, 99));
		assert_eq!(a.attribute, 0);
		assert_eq!((b.tile(), b.pixel(0)), (5, U16Vec2::new(1, 101)));
		assert_eq!((c.tile(), c.pixel(0)), (6, U16Vec2::new(1, 1)));
		assert_eq!(mapper.finish(&mut on_publish), 2);
		assert_eq!(published.len(), 2);
		assert_eq!(published[0][0], 0xff00_00ff);
		assert_eq!(published[0][200], 0);
	}

	#[test]
	fn sprite_keeps_extents() {
		let mut on_publish = |_: &[u32]| {};
		let mut mapper = TileMapper::new(0);
		let sprite = SpriteTexture { left: -10, right: 10, ..Default::default() };
		let mapped = mapper.map_sprite(&[0; 16], 4, 4, &sprite, &mut on_publish);
		assert_eq!((mapped.x, mapped.y, mapped.width), (1, 1, 2 * 256 + 255));
		assert_eq!((mapped.left, mapped.right), (-10, 10));
	}
}
