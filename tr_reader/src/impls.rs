use std::mem::size_of;
use arrayvec::ArrayVec;
use byteorder::ByteOrder;
use glam::{I16Vec2, I16Vec3, IVec3, U16Vec2, Vec3};
use nonmax::{NonMaxU8, NonMaxU16};
use shared::min_max::MinMax;
use crate::{Error, Reader, Readable, Result};

//primitive impls

impl Readable for u8 {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		Ok(reader.take_array::<1>()?[0])
	}
}

impl Readable for i8 {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		Ok(reader.take_array::<1>()?[0] as i8)
	}
}

macro_rules! impl_readable_prim {
	($type:ty, $func:ident) => {
		impl Readable for $type {
			fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
				Ok(E::$func(&reader.take_array::<{ size_of::<$type>() }>()?))
			}
		}
	};
}

impl_readable_prim!(u16, read_u16);
impl_readable_prim!(i16, read_i16);
impl_readable_prim!(u32, read_u32);
impl_readable_prim!(i32, read_i32);
impl_readable_prim!(u64, read_u64);
impl_readable_prim!(f32, read_f32);

//array impls

impl<T: Readable, const N: usize> Readable for [T; N] {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let mut array = ArrayVec::<T, N>::new();
		for _ in 0..N {
			array.push(T::read::<E>(reader)?);
		}
		array.into_inner().map_err(|partial| Error::Truncated {
			offset: reader.position(),
			needed: N - partial.len(),
			available: reader.remaining(),
		})
	}
}

//nonmax impls

impl Readable for Option<NonMaxU8> {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		Ok(NonMaxU8::new(u8::read::<E>(reader)?))
	}
}

impl Readable for Option<NonMaxU16> {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		Ok(NonMaxU16::new(u16::read::<E>(reader)?))
	}
}

//minmax impl

impl<T: Readable> Readable for MinMax<T> {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		Ok(MinMax { min: T::read::<E>(reader)?, max: T::read::<E>(reader)? })
	}
}

//glam impls

macro_rules! impl_readable_glam {
	($type:ty, $array:ty) => {
		impl Readable for $type {
			fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
				Ok(<$array>::read::<E>(reader)?.into())
			}
		}
	};
}

impl_readable_glam!(U16Vec2, [u16; 2]);
impl_readable_glam!(I16Vec2, [i16; 2]);
impl_readable_glam!(I16Vec3, [i16; 3]);
impl_readable_glam!(IVec3, [i32; 3]);
impl_readable_glam!(Vec3, [f32; 3]);

