//! Meshes, decoded from the shared mesh data blob the first time a pointer is used.

use std::{collections::HashMap, sync::{atomic::{AtomicUsize, Ordering}, Arc, Mutex}};
use byteorder::ByteOrder;
use glam::I16Vec3;
use log::debug;
use crate::{
	model::{psx::PsxVertex, Face, RawFace, RawMeshFace},
	read_list, read_vec, Readable, Reader, Result, BE, LE,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
	/// Relative to the mesh origin
	pub centre: I16Vec3,
	pub coll_radius: i32,
	pub vertices: Vec<I16Vec3>,
	/// Empty when the mesh carries `lights` instead
	pub normals: Vec<I16Vec3>,
	pub lights: Vec<i16>,
	pub textured_rectangles: Vec<Face<4>>,
	pub textured_triangles: Vec<Face<3>>,
	/// `texture` is a palette index
	pub colored_rectangles: Vec<Face<4>>,
	/// `texture` is a palette index
	pub colored_triangles: Vec<Face<3>>,
}

impl Mesh {
	pub fn has_normals(&self) -> bool {
		!self.normals.is_empty()
	}

	pub fn num_faces(&self) -> usize {
		self.textured_rectangles.len()
			+ self.textured_triangles.len()
			+ self.colored_rectangles.len()
			+ self.colored_triangles.len()
	}
}

/// On-disk mesh encoding, one per group of level variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeshFormat {
	/// TR1-3 PC: textured then coloured face lists
	#[default]
	Pc,
	/// TR4+ PC and Dreamcast: textured faces with effect flags
	PcEffects,
	Tr1Psx,
	/// No centre, 16-bit radius
	Tr1PsxMay1996,
	/// Reflective face lists, indices shifted by 3
	Tr2Psx,
	/// Padded face lists, indices shifted by 3
	Tr2PsxVersion44,
	/// Padded face lists, indices unshifted
	Tr2PsxVersion38,
	/// Byte-packed faces behind a face data offset
	Tr3Psx,
	/// As TR3, never with vertex lights
	Tr4Psx,
	/// Big-endian primitive groups
	Saturn,
}

/// Face lists whose on-disk layout is `T`, converted to the shared face.
fn faces<E: ByteOrder, T: Readable + Into<Face<N>>, const N: usize>(reader: &mut Reader) -> Result<Vec<Face<N>>> {
	Ok(read_list::<E, i16, T>(reader)?.into_vec().into_iter().map(Into::into).collect())
}

fn shifted<const N: usize>(faces: Vec<Face<N>>, shift: u32) -> Vec<Face<N>> {
	faces
		.into_iter()
		.map(|mut f| {
			f.vertices = f.vertices.map(|v| v >> shift);
			f
		})
		.collect()
}

fn psx_vertices<E: ByteOrder>(reader: &mut Reader, len: usize) -> Result<Vec<I16Vec3>> {
	Ok(read_vec::<E, PsxVertex>(reader, len)?.into_iter().map(|v| v.pos).collect())
}

/// A positive count reads that many normals, otherwise the magnitude counts vertex lights.
fn normals_or_lights<E: ByteOrder>(mesh: &mut Mesh, reader: &mut Reader, count: i16) -> Result<()> {
	if count > 0 {
		mesh.normals = read_vec::<E, I16Vec3>(reader, count as usize)?;
	} else {
		mesh.lights = read_vec::<E, i16>(reader, count.unsigned_abs() as usize)?;
	}
	Ok(())
}

/// PSX meshes share one signed count for vertices and normals or lights.
fn psx_normals_or_lights<E: ByteOrder>(mesh: &mut Mesh, reader: &mut Reader, count: i16) -> Result<()> {
	let len = count.unsigned_abs() as usize;
	if count > 0 {
		mesh.normals = psx_vertices::<E>(reader, len)?;
	} else {
		mesh.lights = read_vec::<E, i16>(reader, len)?;
	}
	Ok(())
}

fn decode_pc<E: ByteOrder>(reader: &mut Reader, effects: bool) -> Result<Mesh> {
	let centre = I16Vec3::read::<E>(reader)?;
	let coll_radius = i32::read::<E>(reader)?;
	let vertices = read_list::<E, i16, I16Vec3>(reader)?.into_vec();
	let mut mesh = Mesh { centre, coll_radius, vertices, ..Default::default() };
	let normals = i16::read::<E>(reader)?;
	normals_or_lights::<E>(&mut mesh, reader, normals)?;
	if effects {
		mesh.textured_rectangles = faces::<E, RawMeshFace<4>, 4>(reader)?;
		mesh.textured_triangles = faces::<E, RawMeshFace<3>, 3>(reader)?;
	} else {
		mesh.textured_rectangles = faces::<E, RawFace<4>, 4>(reader)?;
		mesh.textured_triangles = faces::<E, RawFace<3>, 3>(reader)?;
		mesh.colored_rectangles = faces::<E, RawFace<4>, 4>(reader)?;
		mesh.colored_triangles = faces::<E, RawFace<3>, 3>(reader)?;
	}
	Ok(mesh)
}

/// Texture values above 255 are object textures, the rest are colours.
fn decode_tr1_psx<E: ByteOrder>(reader: &mut Reader, may_1996: bool) -> Result<Mesh> {
	let (centre, coll_radius) = if may_1996 {
		(I16Vec3::ZERO, u16::read::<E>(reader)? as i32)
	} else {
		(I16Vec3::read::<E>(reader)?, i32::read::<E>(reader)?)
	};
	let count = i16::read::<E>(reader)?;
	let vertices = psx_vertices::<E>(reader, count.unsigned_abs() as usize)?;
	let mut mesh = Mesh { centre, coll_radius, vertices, ..Default::default() };
	psx_normals_or_lights::<E>(&mut mesh, reader, count)?;
	let rectangles = faces::<E, RawFace<4>, 4>(reader)?;
	let triangles = faces::<E, RawFace<3>, 3>(reader)?;
	(mesh.textured_rectangles, mesh.colored_rectangles) = rectangles.into_iter().partition(|f| f.texture > 255);
	(mesh.textured_triangles, mesh.colored_triangles) = triangles.into_iter().partition(|f| f.texture > 255);
	Ok(mesh)
}

#[derive(Readable, Clone, Copy, Debug)]
struct ReflectiveFace<const N: usize> {
	face: RawFace<N>,
	#[allow(dead_code)]
	unknown: u16,
}

impl<const N: usize> From<ReflectiveFace<N>> for Face<N> {
	fn from(ReflectiveFace { face, .. }: ReflectiveFace<N>) -> Self {
		face.into()
	}
}

fn decode_tr2_psx<E: ByteOrder>(reader: &mut Reader) -> Result<Mesh> {
	let centre = I16Vec3::read::<E>(reader)?;
	let coll_radius = i32::read::<E>(reader)?;
	let count = i16::read::<E>(reader)?;
	let vertices = psx_vertices::<E>(reader, count.unsigned_abs() as usize)?;
	let mut mesh = Mesh { centre, coll_radius, vertices, ..Default::default() };
	psx_normals_or_lights::<E>(&mut mesh, reader, count)?;
	if count > 0 {
		mesh.textured_rectangles = faces::<E, ReflectiveFace<4>, 4>(reader)?;
		mesh.textured_triangles = faces::<E, ReflectiveFace<3>, 3>(reader)?;
	}
	mesh.textured_rectangles.extend(faces::<E, RawFace<4>, 4>(reader)?);
	mesh.textured_triangles.extend(faces::<E, RawFace<3>, 3>(reader)?);
	mesh.textured_rectangles = shifted(mesh.textured_rectangles, 3);
	mesh.textured_triangles = shifted(mesh.textured_triangles, 3);
	Ok(mesh)
}

/// Face list whose records start on a 4-byte boundary relative to the mesh.
fn padded_faces<E: ByteOrder, const N: usize>(reader: &mut Reader, start: usize) -> Result<Vec<Face<N>>>
where
	RawFace<N>: Readable,
{
	let count = i16::read::<E>(reader)?;
	if (reader.position() - start) % 4 != 0 {
		reader.skip(2)?;
	}
	let len = usize::try_from(count).unwrap_or(0);
	Ok(read_vec::<E, RawFace<N>>(reader, len)?.into_iter().map(Into::into).collect())
}

fn decode_tr2_psx_padded<E: ByteOrder>(reader: &mut Reader, start: usize, shift: u32) -> Result<Mesh> {
	let centre = I16Vec3::read::<E>(reader)?;
	let coll_radius = i32::read::<E>(reader)?;
	let count = i16::read::<E>(reader)?;
	let vertices = psx_vertices::<E>(reader, count.unsigned_abs() as usize)?;
	let mut mesh = Mesh { centre, coll_radius, vertices, ..Default::default() };
	psx_normals_or_lights::<E>(&mut mesh, reader, count)?;
	mesh.textured_rectangles = shifted(padded_faces::<E, 4>(reader, start)?, shift);
	mesh.textured_triangles = shifted(padded_faces::<E, 3>(reader, start)?, shift);
	Ok(mesh)
}

/// TR3/TR4 PSX: face words hold byte vertex indices, textures are split across a shared word.
fn decode_packed<E: ByteOrder>(reader: &mut Reader, late: bool) -> Result<Mesh> {
	let centre = I16Vec3::read::<E>(reader)?;
	let coll_radius = i16::read::<E>(reader)? as i32;
	let num_vertices = u8::read::<E>(reader)? as usize;
	let flags = u8::read::<E>(reader)?;
	let face_data_offset = u16::read::<E>(reader)? as usize;
	let at = reader.position();
	let vertices = psx_vertices::<E>(reader, num_vertices)?;
	let mut mesh = Mesh { centre, coll_radius, vertices, ..Default::default() };
	if flags & 0x80 == 0 {
		mesh.normals = psx_vertices::<E>(reader, num_vertices)?;
	} else if !late {
		mesh.lights = read_vec::<E, i16>(reader, num_vertices)?;
	}
	reader.seek(at + face_data_offset);
	let num_triangles = u16::read::<E>(reader)?;
	let num_rectangles = u16::read::<E>(reader)?;
	let mut textures = 0u32;
	for i in 0..num_triangles {
		if i % 4 == 0 {
			textures = u32::read::<E>(reader)?;
		}
		let b = u32::read::<E>(reader)?;
		let texture = ((textures & 0xff) | (((b >> 24) & 0xff) << 8)) as u16;
		mesh.textured_triangles.push(Face::new(
			[(b & 0xff) as u16, ((b >> 8) & 0xff) as u16, ((b >> 16) & 0xff) as u16],
			texture,
		));
		textures >>= 8;
	}
	for i in 0..num_rectangles {
		if i % 2 == 0 {
			textures = u32::read::<E>(reader)?;
		}
		let b = u32::read::<E>(reader)?;
		mesh.textured_rectangles.push(Face::new(
			[(b & 0xff) as u16, ((b >> 8) & 0xff) as u16, ((b >> 24) & 0xff) as u16, ((b >> 16) & 0xff) as u16],
			(textures & 0xffff) as u16,
		));
		textures >>= 16;
	}
	if late {
		let in_range = |v: &u16| (*v as usize) < num_vertices;
		if !mesh.textured_rectangles.iter().all(|f| f.vertices.iter().all(in_range)) {
			mesh.textured_rectangles.clear();
		}
		if !mesh.textured_triangles.iter().all(|f| f.vertices.iter().all(in_range)) {
			mesh.textured_triangles.clear();
		}
	}
	Ok(mesh)
}

fn decode_saturn(reader: &mut Reader) -> Result<Mesh> {
	use crate::model::saturn::{Primitive, MESH_INDEX_SHIFT};
	let centre = I16Vec3::read::<BE>(reader)?;
	let coll_radius = u16::read::<BE>(reader)? as i32;
	reader.skip(2)?;
	let count = i16::read::<BE>(reader)?;
	let vertices = read_vec::<BE, I16Vec3>(reader, count.unsigned_abs() as usize)?;
	let mut mesh = Mesh { centre, coll_radius, vertices, ..Default::default() };
	let normals = i16::read::<BE>(reader)?;
	normals_or_lights::<BE>(&mut mesh, reader, normals)?;
	let num_primitives = u16::read::<BE>(reader)? as usize;
	let num_groups = u16::read::<BE>(reader)?;
	let mut total = 0;
	for _ in 0..num_groups {
		if total >= num_primitives {
			break;
		}
		let Some(primitive) = Primitive::from_u16(u16::read::<BE>(reader)?) else {
			break;
		};
		let len = u16::read::<BE>(reader)? as usize;
		total += len;
		let rectangles = |reader: &mut Reader| -> Result<Vec<Face<4>>> {
			let faces = read_vec::<BE, RawFace<4>>(reader, len)?.into_iter().map(Into::into).collect();
			Ok(shifted(faces, MESH_INDEX_SHIFT))
		};
		let triangles = |reader: &mut Reader| -> Result<Vec<Face<3>>> {
			let faces = read_vec::<BE, RawFace<3>>(reader, len)?.into_iter().map(Into::into).collect();
			Ok(shifted(faces, MESH_INDEX_SHIFT))
		};
		match primitive {
			Primitive::ColoredTriangles => mesh.colored_triangles.extend(triangles(reader)?),
			Primitive::ColoredRectangles => mesh.colored_rectangles.extend(rectangles(reader)?),
			Primitive::TexturedRectangles => mesh.textured_rectangles.extend(rectangles(reader)?),
			Primitive::TexturedTriangles => mesh.textured_triangles.extend(triangles(reader)?),
		}
	}
	Ok(mesh)
}

/// Decodes the mesh at byte offset `pointer` of `data`.
pub fn decode_mesh(data: &[u8], pointer: u32, format: MeshFormat) -> Result<Mesh> {
	let mut reader = Reader::new(data);
	let start = pointer as usize;
	reader.seek(start);
	match format {
		MeshFormat::Pc => decode_pc::<LE>(&mut reader, false),
		MeshFormat::PcEffects => decode_pc::<LE>(&mut reader, true),
		MeshFormat::Tr1Psx => decode_tr1_psx::<LE>(&mut reader, false),
		MeshFormat::Tr1PsxMay1996 => decode_tr1_psx::<LE>(&mut reader, true),
		MeshFormat::Tr2Psx => decode_tr2_psx::<LE>(&mut reader),
		MeshFormat::Tr2PsxVersion44 => decode_tr2_psx_padded::<LE>(&mut reader, start, 3),
		MeshFormat::Tr2PsxVersion38 => decode_tr2_psx_padded::<LE>(&mut reader, start, 0),
		MeshFormat::Tr3Psx => decode_packed::<LE>(&mut reader, false),
		MeshFormat::Tr4Psx => decode_packed::<LE>(&mut reader, true),
		MeshFormat::Saturn => decode_saturn(&mut reader),
	}
}

/// Mesh data blob and the meshes decoded from it so far, keyed by pointer.
/// Each pointer is decoded at most once, however many threads ask for it.
#[derive(Debug, Default)]
pub struct MeshCache {
	data: Vec<u8>,
	format: MeshFormat,
	meshes: Mutex<HashMap<u32, Arc<Mesh>>>,
	decodes: AtomicUsize,
}

impl MeshCache {
	pub fn new(data: Vec<u8>, format: MeshFormat) -> Self {
		MeshCache { data, format, ..Default::default() }
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn format(&self) -> MeshFormat {
		self.format
	}

	/// Mesh at byte offset `pointer`. Failed decodes are not cached.
	pub fn get(&self, pointer: u32) -> Result<Arc<Mesh>> {
		let mut meshes = self.meshes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		if let Some(mesh) = meshes.get(&pointer) {
			return Ok(mesh.clone());
		}
		debug!("Decoding mesh at {}", pointer);
		self.decodes.fetch_add(1, Ordering::Relaxed);
		let mesh = Arc::new(decode_mesh(&self.data, pointer, self.format)?);
		meshes.insert(pointer, mesh.clone());
		Ok(mesh)
	}

	/// Number of times a mesh has been decoded from the blob.
	pub fn decode_count(&self) -> usize {
		self.decodes.load(Ordering::Relaxed)
	}

	pub fn num_cached(&self) -> usize {
		self.meshes.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
	}
}

#[cfg(test)]
mod tests {
	use byteorder::{WriteBytesExt, LE};
	use super::*;

	fn pc_mesh() -> Vec<u8> {
		let mut data = vec![];
		for v in [1i16, 2, 3] {
			data.write_i16::<LE>(v).unwrap();
		}
		data.write_i32::<LE>(100).unwrap();
		data.write_i16::<LE>(3).unwrap();
		for v in 0..9i16 {
			data.write_i16::<LE>(v).unwrap();
		}
		data.write_i16::<LE>(-3).unwrap();
		for v in [10i16, 20, 30] {
			data.write_i16::<LE>(v).unwrap();
		}
		data.write_i16::<LE>(0).unwrap();
		data.write_i16::<LE>(1).unwrap();
		for v in [0u16, 1, 2, 7] {
			data.write_u16::<LE>(v).unwrap();
		}
		data.write_i16::<LE>(0).unwrap();
		data.write_i16::<LE>(0).unwrap();
		data
	}

	#[test]
	fn pc_mesh_with_lights() {
		let mesh = decode_mesh(&pc_mesh(), 0, MeshFormat::Pc).unwrap();
		assert_eq!(mesh.centre, I16Vec3::new(1, 2, 3));
		assert_eq!(mesh.vertices.len(), 3);
		assert!(!mesh.has_normals());
		assert_eq!(mesh.lights, vec![10, 20, 30]);
		assert_eq!(mesh.textured_triangles[0].texture, 7);
		assert!(mesh.colored_triangles.is_empty());
	}

	#[test]
	fn repeated_requests_decode_once() {
		let cache = MeshCache::new(pc_mesh(), MeshFormat::Pc);
		let first = cache.get(0).unwrap();
		for _ in 0..5 {
			assert!(Arc::ptr_eq(&first, &cache.get(0).unwrap()));
		}
		assert_eq!(cache.decode_count(), 1);
	}

	#[test]
	fn concurrent_requests_decode_once() {
		let cache = MeshCache::new(pc_mesh(), MeshFormat::Pc);
		std::thread::scope(|s| {
			for _ in 0..8 {
				s.spawn(|| assert_eq!(cache.get(0).unwrap().vertices.len(), 3));
			}
		});
		assert_eq!(cache.decode_count(), 1);
		assert_eq!(cache.num_cached(), 1);
	}

	#[test]
	fn truncated_mesh_is_an_error_and_not_cached() {
		let data = pc_mesh();
		let cache = MeshCache::new(data[..20].to_vec(), MeshFormat::Pc);
		assert!(cache.get(0).unwrap_err().is_truncated());
		assert_eq!(cache.num_cached(), 0);
	}

	#[test]
	fn packed_psx_faces() {
		let mut data = vec![];
		for v in [0i16, 0, 0] {
			data.write_i16::<LE>(v).unwrap();
		}
		data.write_i16::<LE>(50).unwrap();
		data.write_u8(3).unwrap();
		data.write_u8(0x80).unwrap();
		data.write_u16::<LE>(3 * 8 + 3 * 2).unwrap();
		for _ in 0..3 {
			data.write_u64::<LE>(0).unwrap();
		}
		for light in [1i16, 2, 3] {
			data.write_i16::<LE>(light).unwrap();
		}
		data.write_u16::<LE>(1).unwrap();
		data.write_u16::<LE>(1).unwrap();
		data.write_u32::<LE>(0x34).unwrap();
		data.write_u32::<LE>(0x12_02_01_00).unwrap();
		data.write_u32::<LE>(0x0099).unwrap();
		data.write_u32::<LE>(0x01_02_00_00 | 0x0100).unwrap();
		let mesh = decode_mesh(&data, 0, MeshFormat::Tr3Psx).unwrap();
		assert_eq!(mesh.lights, vec![1, 2, 3]);
		assert_eq!(mesh.textured_triangles[0].vertices, [0, 1, 2]);
		assert_eq!(mesh.textured_triangles[0].texture, 0x1234);
		assert_eq!(mesh.textured_rectangles[0].vertices, [0, 1, 1, 2]);
		assert_eq!(mesh.textured_rectangles[0].texture, 0x99);

		let late = decode_mesh(&data, 0, MeshFormat::Tr4Psx).unwrap();
		assert!(late.lights.is_empty() && late.normals.is_empty());
		assert_eq!(late.textured_rectangles, mesh.textured_rectangles);
	}

	#[test]
	fn saturn_groups_are_big_endian_and_shifted() {
		use byteorder::BE;
		let mut data = vec![];
		for v in [0i16, 0, 0] {
			data.write_i16::<BE>(v).unwrap();
		}
		data.write_u16::<BE>(64).unwrap();
		data.write_u16::<BE>(0).unwrap();
		data.write_i16::<BE>(-3).unwrap();
		for v in 0..9i16 {
			data.write_i16::<BE>(v).unwrap();
		}
		data.write_i16::<BE>(-3).unwrap();
		for _ in 0..3 {
			data.write_i16::<BE>(0).unwrap();
		}
		data.write_u16::<BE>(1).unwrap();
		data.write_u16::<BE>(2).unwrap();
		data.write_u16::<BE>(8).unwrap();
		data.write_u16::<BE>(1).unwrap();
		for v in [0u16, 32, 64, 5] {
			data.write_u16::<BE>(v).unwrap();
		}
		let mesh = decode_mesh(&data, 0, MeshFormat::Saturn).unwrap();
		assert_eq!(mesh.coll_radius, 64);
		assert_eq!(mesh.vertices[2], I16Vec3::new(6, 7, 8));
		assert_eq!(mesh.textured_triangles.len(), 1);
		assert_eq!(mesh.textured_triangles[0].vertices, [0, 1, 2]);
		assert_eq!(mesh.textured_triangles[0].texture, 5);
	}
}
