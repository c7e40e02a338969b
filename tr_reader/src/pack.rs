//! Container of embedded level files, found on multi-level demo discs.

use log::{debug, warn};
use crate::{
	files::Files,
	version::{self, LevelVersion},
	Error, Level, LoadCallbacks, LoadOptions, Readable, Reader, Result,
};

pub const NUM_SLOTS: usize = 50;
const SLOT_TABLE_OFFSET: usize = 4;

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Slot {
	start: u32,
	size: u32,
}

#[derive(Debug)]
pub struct Part {
	/// Position in the slot table
	pub slot: usize,
	/// Byte offset into the pack
	pub start: u32,
	pub size: u32,
	pub data: Vec<u8>,
	/// Detected version of the embedded level, if it has a recognizable header
	pub version: Option<LevelVersion>,
	/// Populated by `Pack::load` when the part decodes
	pub level: Option<Box<Level>>,
}

#[derive(Debug, Default)]
pub struct Pack {
	name: String,
	parts: Vec<Part>,
}

impl Pack {
	/// Reads the slot table and copies out every non-empty part. Parts are not decoded.
	pub fn read(data: &[u8], name: &str) -> Result<Self> {
		let mut reader = Reader::new(data);
		reader.seek(SLOT_TABLE_OFFSET);
		let slots = reader.read::<[Slot; NUM_SLOTS]>()?;
		let mut parts = vec![];
		for (slot, Slot { start, size }) in slots.into_iter().enumerate() {
			if size == 0 {
				continue;
			}
			reader.seek(start as usize);
			let data = reader.take(size as usize)?.to_vec();
			let version = version::detect(&data, None).ok().filter(|v| !v.is_unknown());
			parts.push(Part { slot, start, size, data, version, level: None });
		}
		debug!("Read {} pack parts", parts.len());
		Ok(Pack { name: name.to_owned(), parts })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn parts(&self) -> &[Part] {
		&self.parts
	}

	/// Decodes every part without sounds. A part that fails keeps `level` empty.
	pub fn load(&mut self, files: &dyn Files) {
		let options = LoadOptions { sounds: false, ..Default::default() };
		for part in &mut self.parts {
			let name = format!("{}:{}", self.name, part.slot);
			match load_part(&part.data, &name, &options, files) {
				Ok(level) => part.level = Some(Box::new(level)),
				Err(e) => {
					warn!("Preview of {} unavailable: {}", name, e);
					part.level = None;
				},
			}
		}
	}

	pub fn part_level(&self, index: usize) -> Option<&Level> {
		self.parts.get(index)?.level.as_deref()
	}

	/// Fully decodes one part with the caller's options, sounds included if asked for.
	pub fn open_part(
		&self,
		index: usize,
		options: &LoadOptions,
		files: &dyn Files,
		callbacks: &mut dyn LoadCallbacks,
	) -> Option<Result<Level>> {
		let part = self.parts.get(index)?;
		let name = format!("{}:{}", self.name, part.slot);
		Some(check_not_pack(&part.data).and_then(|_| Level::load_from_bytes(&part.data, &name, None, options, files, callbacks)))
	}
}

fn check_not_pack(data: &[u8]) -> Result<()> {
	match version::detect(data, None)? {
		v if v.pack => Err(Error::UnrecognizedFormat { version: v.raw_version }),
		_ => Ok(()),
	}
}

fn load_part(data: &[u8], name: &str, options: &LoadOptions, files: &dyn Files) -> Result<Level> {
	check_not_pack(data)?;
	Level::load_from_bytes(data, name, None, options, files, &mut ())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pack(parts: &[&[u8]]) -> Vec<u8> {
		let header = SLOT_TABLE_OFFSET + NUM_SLOTS * 8;
		let mut data = vec![0u8; header];
		let mut start = header;
		for (i, part) in parts.iter().enumerate() {
			let slot = SLOT_TABLE_OFFSET + i * 2 * 8;
			data[slot..slot + 4].copy_from_slice(&(start as u32).to_le_bytes());
			data[slot + 4..slot + 8].copy_from_slice(&(part.len() as u32).to_le_bytes());
			start += part.len();
		}
		for part in parts {
			data.extend_from_slice(part);
		}
		data
	}

	#[test]
	fn empty_slots_are_skipped() {
		let data = pack(&[b"abcd", b"xy"]);
		let pack = Pack::read(&data, "DEMO").unwrap();
		assert_eq!(pack.parts().len(), 2);
		assert_eq!(pack.parts()[0].slot, 0);
		assert_eq!(pack.parts()[1].slot, 2);
		assert_eq!(pack.parts()[1].data, b"xy");
	}

	#[test]
	fn part_past_end_is_truncated() {
		let mut data = pack(&[b"abcd"]);
		data.truncate(data.len() - 1);
		assert!(Pack::read(&data, "DEMO").unwrap_err().is_truncated());
	}

	#[test]
	fn undecodable_parts_have_no_level() {
		let data = pack(&[&[0x20, 0, 0, 0, 1]]);
		let mut pack = Pack::read(&data, "DEMO").unwrap();
		pack.load(&());
		assert!(pack.part_level(0).is_none());
		assert!(pack.part_level(5).is_none());
	}

	#[test]
	fn nested_pack_is_rejected() {
		let inner = pack(&[]);
		let data = pack(&[&inner]);
		let pack = Pack::read(&data, "DEMO").unwrap();
		assert!(pack.open_part(0, &LoadOptions::default(), &(), &mut ()).unwrap().is_err());
	}
}
