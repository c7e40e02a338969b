extern crate self as tr_reader;

mod error;
mod impls;
mod decode;
mod level;
pub mod files;
pub mod version;
pub mod model;
pub mod mesh;
pub mod texture;
pub mod sound;
pub mod pack;

use std::io::{Cursor, Read};
use compress::zlib::Decoder;
use num_traits::AsPrimitive;
pub(crate) use tr_derive::Readable;

pub use byteorder::{ByteOrder, BE, LE};
pub use error::{Error, Result};
pub use level::{Level, LoadCallbacks, LoadOptions};

/// Fixed-layout record that can be read field by field in either byte order.
pub trait Readable: Sized {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self>;
}

/// Read cursor over an in-memory level buffer.
/// Every read is bounds-checked; running out of bytes yields `Error::Truncated`.
#[derive(Clone)]
pub struct Reader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// The whole buffer, regardless of position.
	pub fn data(&self) -> &'a [u8] {
		self.data
	}

	pub fn position(&self) -> usize {
		self.pos
	}

	pub fn remaining(&self) -> usize {
		self.data.len().saturating_sub(self.pos)
	}

	pub fn is_at_end(&self) -> bool {
		self.pos >= self.data.len()
	}

	/// Move to an absolute position. Positions past the end are allowed, the next read fails.
	pub fn seek(&mut self, pos: usize) {
		self.pos = pos;
	}

	fn truncated(&self, needed: usize) -> Error {
		Error::Truncated { offset: self.pos, needed, available: self.remaining() }
	}

	pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
		if len > self.remaining() {
			return Err(self.truncated(len));
		}
		let bytes = &self.data[self.pos..self.pos + len];
		self.pos += len;
		Ok(bytes)
	}

	pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut array = [0; N];
		array.copy_from_slice(self.take(N)?);
		Ok(array)
	}

	pub fn skip(&mut self, len: usize) -> Result<()> {
		self.take(len).map(|_| ())
	}

	/// Skip `count` records of `size` bytes each.
	pub fn skip_n(&mut self, count: usize, size: usize) -> Result<()> {
		match count.checked_mul(size) {
			Some(len) => self.skip(len),
			None => Err(self.truncated(usize::MAX)),
		}
	}

	/// Little-endian read.
	pub fn read<T: Readable>(&mut self) -> Result<T> {
		T::read::<LE>(self)
	}

	/// Little-endian read that leaves the cursor where it was.
	pub fn peek<T: Readable>(&mut self) -> Result<T> {
		let pos = self.pos;
		let value = T::read::<LE>(self);
		self.pos = pos;
		value
	}

	/// Reads an uncompressed length, a compressed length and a zlib stream.
	/// The inflated data must be exactly the declared length.
	pub fn read_compressed(&mut self) -> Result<Vec<u8>> {
		let uncompressed_len = self.read::<u32>()? as usize;
		let compressed_len = self.read::<u32>()? as usize;
		let offset = self.pos;
		let compressed = self.take(compressed_len)?;
		let mut decoder = Decoder::new(Cursor::new(compressed)).take(uncompressed_len as u64 + 1);
		let mut data = Vec::with_capacity(uncompressed_len.min(compressed_len.saturating_mul(64)));
		decoder
			.read_to_end(&mut data)
			.map_err(|e| Error::Decompression { offset, reason: e.to_string() })?;
		if data.len() != uncompressed_len {
			return Err(Error::Decompression {
				offset,
				reason: format!("inflated to {} bytes, expected {}", data.len(), uncompressed_len),
			});
		}
		Ok(data)
	}

	pub fn skip_compressed(&mut self) -> Result<()> {
		self.skip(4)?;
		let compressed_len = self.read::<u32>()? as usize;
		self.skip(compressed_len)
	}
}

pub fn read_vec<E: ByteOrder, T: Readable>(reader: &mut Reader, len: usize) -> Result<Vec<T>> {
	let mut vec = Vec::with_capacity(len.min(reader.remaining()));
	for _ in 0..len {
		vec.push(T::read::<E>(reader)?);
	}
	Ok(vec)
}

pub fn read_boxed_slice<E: ByteOrder, T: Readable>(reader: &mut Reader, len: usize) -> Result<Box<[T]>> {
	Ok(read_vec::<E, T>(reader, len)?.into_boxed_slice())
}

/// Reads a count of type `L`, then that many items.
/// Negative signed counts fail as truncation rather than wrapping.
pub fn read_list<E: ByteOrder, L, T>(reader: &mut Reader) -> Result<Box<[T]>>
where
	L: Readable + AsPrimitive<i64>,
	T: Readable,
{
	let len = L::read::<E>(reader)?.as_();
	if len < 0 {
		return Err(reader.truncated(usize::MAX));
	}
	read_boxed_slice::<E, T>(reader, len as usize)
}
