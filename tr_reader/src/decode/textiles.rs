//! Palettes and PC textiles. Each textile is converted and handed over as soon as it is read.

use byteorder::ByteOrder;
use log::{debug, warn};
use crate::{
	model::{Color3, Color4, NUM_PIXELS, PALETTE_SIZE},
	read_vec,
	texture::{argb1555_to_rgba, bgra_to_rgba, textile8_to_rgba},
	Reader, Result, LE,
};
use super::Context;

pub const TEXTILE8_SIZE: usize = NUM_PIXELS;
pub const TEXTILE16_SIZE: usize = NUM_PIXELS * 2;
pub const TEXTILE32_SIZE: usize = NUM_PIXELS * 4;

pub(super) fn textile16(bytes: &[u8], convert: fn(u16) -> u32) -> Vec<u32> {
	bytes.chunks_exact(2).map(|pair| convert(LE::read_u16(pair))).collect()
}

fn textile32(bytes: &[u8]) -> Vec<u32> {
	bytes.chunks_exact(4).map(|quad| bgra_to_rgba(LE::read_u32(quad))).collect()
}

impl Context<'_> {
	/// 256 6-bit colours.
	pub fn palette(&mut self, reader: &mut Reader) -> Result<()> {
		self.step(reader, "8-bit palette");
		self.level.palette = read_vec::<LE, Color3>(reader, PALETTE_SIZE)?;
		Ok(())
	}

	/// The 8-bit palette followed by the 16-bit one.
	pub fn palettes_tr2_3(&mut self, reader: &mut Reader) -> Result<()> {
		self.palette(reader)?;
		self.step(reader, "16-bit palette");
		self.level.palette16 = read_vec::<LE, Color4>(reader, PALETTE_SIZE)?;
		Ok(())
	}

	/// 8-bit textiles are kept raw since the palette they need may come later in the file.
	pub fn textiles8(&mut self, reader: &mut Reader) -> Result<Vec<u8>> {
		self.step(reader, "textiles");
		let count = reader.read::<u32>()? as usize;
		self.progress(&format!("Reading {} 8-bit textiles", count));
		let data = reader.take(count.saturating_mul(TEXTILE8_SIZE))?;
		Ok(data.to_vec())
	}

	/// Converts raw 8-bit textiles through the current palette.
	pub fn emit_textiles8(&mut self, textiles: &[u8]) {
		debug!("Converting {} 8-bit textiles", textiles.len() / TEXTILE8_SIZE);
		let palette = std::mem::take(&mut self.level.palette);
		for textile in textiles.chunks_exact(TEXTILE8_SIZE) {
			self.emit_textile(&textile8_to_rgba(textile, &palette));
		}
		self.level.palette = palette;
	}

	/// 8-bit textiles are skipped in favour of the 16-bit copies that follow them.
	pub fn textiles16(&mut self, reader: &mut Reader, convert: fn(u16) -> u32) -> Result<()> {
		self.step(reader, "textiles");
		let count = reader.read::<u32>()? as usize;
		self.progress(&format!("Skipping {} 8-bit textiles", count));
		reader.skip_n(count, TEXTILE8_SIZE)?;
		self.progress(&format!("Reading {} 16-bit textiles", count));
		for _ in 0..count {
			let bytes = reader.take(TEXTILE16_SIZE)?;
			self.emit_textile(&textile16(bytes, convert));
		}
		Ok(())
	}

	/// Room, object and bump textile counts, summed.
	fn textile_counts(&mut self, reader: &mut Reader) -> Result<usize> {
		let room = reader.read::<u16>()?;
		let object = reader.read::<u16>()?;
		let bump = reader.read::<u16>()?;
		debug!("[{}] Textile counts - Room:{}, Object:{}, Bump:{}", reader.position(), room, object, bump);
		Ok(room as usize + object as usize + bump as usize)
	}

	/// Compressed 32-bit textiles, then the same textiles at 16 bits, then two misc textiles.
	/// The 16-bit set is only used when every 32-bit textile is blank.
	pub fn textiles_tr4_5(&mut self, reader: &mut Reader) -> Result<()> {
		let count = self.textile_counts(reader)?;
		self.progress(&format!("Reading {} 32-bit textiles", count));
		let data32 = reader.read_compressed()?;
		let data32 = data32.get(..count.saturating_mul(TEXTILE32_SIZE)).unwrap_or(&data32[..]);
		if data32.iter().all(|&b| b == 0) {
			warn!("32-bit textiles were all blank, discarding");
			self.progress(&format!("Reading {} 16-bit textiles", count));
			let data16 = reader.read_compressed()?;
			for textile in data16.chunks_exact(TEXTILE16_SIZE).take(count) {
				self.emit_textile(&textile16(textile, argb1555_to_rgba));
			}
		} else {
			for textile in data32.chunks_exact(TEXTILE32_SIZE) {
				self.emit_textile(&textile32(textile));
			}
			self.progress(&format!("Skipping {} 16-bit textiles", count));
			reader.skip_compressed()?;
		}
		debug!("[{}] Reading misc textiles", reader.position());
		let misc = reader.read_compressed()?;
		for textile in misc.chunks_exact(TEXTILE32_SIZE).take(2) {
			self.emit_textile(&textile32(textile));
		}
		Ok(())
	}

	/// Uncompressed 32-bit textiles followed by `num_misc` misc textiles.
	pub fn remastered_textiles(&mut self, reader: &mut Reader, num_misc: usize) -> Result<()> {
		let count = self.textile_counts(reader)?;
		self.progress(&format!("Reading {} 32-bit textiles", count));
		reader.skip(4)?;
		for _ in 0..count + num_misc {
			let bytes = reader.take(TEXTILE32_SIZE)?;
			self.emit_textile(&textile32(bytes));
		}
		Ok(())
	}
}
