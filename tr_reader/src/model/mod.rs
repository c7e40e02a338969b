pub mod light;
pub mod tr1;
pub mod tr2;
pub mod tr3;
pub mod tr4;
pub mod tr5;
pub mod psx;
pub mod saturn;

use bitfield::bitfield;
use glam::{I16Vec3, IVec3, U16Vec2, Vec3};
use nonmax::{NonMaxU16, NonMaxU8};
use shared::min_max::MinMax;
use crate::{Readable, Reader, Result};

pub use light::{Light, LightType};

pub const PALETTE_SIZE: usize = 256;
pub const IMAGE_SIZE: usize = 256;
pub const NUM_PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;
pub const LIGHT_MAP_SIZE: usize = 32 * PALETTE_SIZE;

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color3 {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color4 {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl From<Color3> for Color4 {
	fn from(Color3 { r, g, b }: Color3) -> Self {
		Color4 { r, g, b, a: 0xff }
	}
}

/// World position and vertical extent of a room.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomInfo {
	/// World coords
	pub x: i32,
	/// World coords
	pub z: i32,
	pub y_bottom: i32,
	pub y_top: i32,
}

/// Room vertex after conversion from any of the on-disk layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
	/// Relative to Room
	pub pos: Vec3,
	pub lighting: i16,
	pub attributes: u16,
	/// Linear RGB, may exceed 1.0 on formats that double brightness
	pub color: Vec3,
}

impl Vertex {
	/// TR1/2 brightness, 0 is brightest and 8191 darkest.
	pub fn from_brightness(pos: I16Vec3, lighting: i16, attributes: u16) -> Self {
		let value = 1.0 - lighting as f32 / 8191.0;
		Vertex { pos: pos.as_vec3(), lighting, attributes, color: Vec3::splat(value) }
	}

	/// TR3/4 15-bit colour.
	pub fn from_rgb555(pos: I16Vec3, lighting: i16, attributes: u16, color: u16) -> Self {
		Vertex { pos: pos.as_vec3(), lighting, attributes, color: rgb555(color) / 16.5 }
	}
}

/// Unpacks the 5-bit channels of a `0RRRRRGGGGGBBBBB` colour without scaling.
pub fn rgb555(color: u16) -> Vec3 {
	Vec3::new(
		((color >> 10) & 0x1f) as f32,
		((color >> 5) & 0x1f) as f32,
		(color & 0x1f) as f32,
	)
}

bitfield! {
	#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
	pub struct TextureDetails(u16);
	/// Index into object_textures
	pub texture_index, _: 14, 0;
	pub double_sided, _: 15;
	/// Index into palette for coloured mesh faces
	pub palette_index, _: 7, 0;
	/// Index into palette16 for coloured mesh faces
	pub palette16_index, _: 15, 8;
}

/// Room or mesh polygon. `N` is 3 or 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face<const N: usize> {
	/// Index into the owning vertex list
	pub vertices: [u16; N],
	pub texture: u16,
	pub effects: u16,
}

impl<const N: usize> Face<N> {
	pub fn new(vertices: [u16; N], texture: u16) -> Self {
		Face { vertices, texture, effects: 0 }
	}

	pub fn details(&self) -> TextureDetails {
		TextureDetails(self.texture)
	}

	pub fn offset(mut self, by: u16) -> Self {
		for v in &mut self.vertices {
			*v = v.wrapping_add(by);
		}
		self
	}
}

/// Face layout shared by TR1-3 rooms and meshes.
#[derive(Readable, Clone, Copy, Debug)]
pub struct RawFace<const N: usize> {
	pub vertices: [u16; N],
	pub texture: u16,
}

impl<const N: usize> From<RawFace<N>> for Face<N> {
	fn from(RawFace { vertices, texture }: RawFace<N>) -> Self {
		Face { vertices, texture, effects: 0 }
	}
}

bitfield! {
	#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
	pub struct MeshEffects(u16);
	pub additive, _: 0;
	pub shiny, _: 1;
	pub shine_strength, _: 7, 2;
}

/// Face layout of TR4+ meshes and TR5 rooms.
#[derive(Readable, Clone, Copy, Debug)]
pub struct RawMeshFace<const N: usize> {
	pub vertices: [u16; N],
	pub texture: u16,
	pub effects: MeshEffects,
}

impl<const N: usize> From<RawMeshFace<N>> for Face<N> {
	fn from(RawMeshFace { vertices, texture, effects }: RawMeshFace<N>) -> Self {
		Face { vertices, texture, effects: effects.0 }
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomSprite {
	/// Index into Room.vertices
	pub vertex: u16,
	/// Index into sprite_textures
	pub texture: u16,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Portal {
	/// Index into rooms
	pub adjoining_room: u16,
	pub normal: I16Vec3,
	/// Relative to Room
	pub vertices: [I16Vec3; 4],
}

bitfield! {
	#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
	pub struct SectorMaterialAndBox(u16);
	/// Footstep sound
	pub material, _: 3, 0;
	/// Index into boxes
	pub box_index, _: 14, 4;
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sector {
	/// Index into floor_data
	pub floor_data_index: u16,
	/// Whole word is the box index before TR3
	pub material_and_box: SectorMaterialAndBox,
	/// Index into rooms
	pub room_below: Option<NonMaxU8>,
	pub floor: i8,
	/// Index into rooms
	pub room_above: Option<NonMaxU8>,
	pub ceiling: i8,
}

/// Placement of a static mesh in a room, in the TR2/3 layout.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomStaticMesh {
	/// World coords
	pub pos: IVec3,
	/// Units are 1/65536th of a rotation
	pub rotation: u16,
	pub color: u16,
	pub unused: u16,
	/// Id into static_meshes
	pub mesh_id: u16,
}

/// Room with geometry, sectors and lighting in one shape for every format.
#[derive(Clone, Debug, Default)]
pub struct Room {
	pub info: RoomInfo,
	pub num_x_sectors: u16,
	pub num_z_sectors: u16,
	pub sectors: Vec<Sector>,
	pub vertices: Vec<Vertex>,
	/// `vertices` index into Room.vertices
	pub rectangles: Vec<Face<4>>,
	/// `vertices` index into Room.vertices
	pub triangles: Vec<Face<3>>,
	pub sprites: Vec<RoomSprite>,
	pub portals: Vec<Portal>,
	pub static_meshes: Vec<RoomStaticMesh>,
	pub lights: Vec<Light>,
	pub ambient_intensity_1: i16,
	pub ambient_intensity_2: i16,
	pub light_mode: i16,
	/// ARGB, TR4+
	pub color: u32,
	/// Index into rooms, -1 for none
	pub alternate_room: i16,
	pub flags: i16,
	pub water_scheme: u8,
	pub reverb_info: u8,
	pub alternate_group: u8,
}

impl Room {
	pub fn is_water(&self) -> bool {
		self.flags & 1 != 0
	}

	pub fn sector(&self, x: u16, z: u16) -> Option<&Sector> {
		if x >= self.num_x_sectors || z >= self.num_z_sectors {
			return None;
		}
		self.sectors.get(x as usize * self.num_z_sectors as usize + z as usize)
	}

	/// Appends vertices and faces whose indices are local to `vertices`.
	pub fn append_geometry(
		&mut self,
		vertices: impl IntoIterator<Item = Vertex>,
		rectangles: impl IntoIterator<Item = Face<4>>,
		triangles: impl IntoIterator<Item = Face<3>>,
	) {
		let base = self.vertices.len() as u16;
		self.vertices.extend(vertices);
		self.rectangles.extend(rectangles.into_iter().map(|f| f.offset(base)));
		self.triangles.extend(triangles.into_iter().map(|f| f.offset(base)));
	}

	/// True if every face refers to a vertex of this room.
	pub fn face_indices_in_range(&self) -> bool {
		let len = self.vertices.len();
		self.rectangles.iter().flat_map(|f| f.vertices).chain(self.triangles.iter().flat_map(|f| f.vertices))
			.all(|v| (v as usize) < len)
	}
}

/// Room sectors, preceded on disk by their z and x counts.
pub(crate) struct Sectors {
	pub num_z: u16,
	pub num_x: u16,
	pub sectors: Vec<Sector>,
}

impl Readable for Sectors {
	fn read<E: byteorder::ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let num_z = u16::read::<E>(reader)?;
		let num_x = u16::read::<E>(reader)?;
		let sectors = crate::read_vec::<E, _>(reader, num_z as usize * num_x as usize)?;
		Ok(Sectors { num_z, num_x, sectors })
	}
}

impl Room {
	pub(crate) fn set_sectors(&mut self, Sectors { num_z, num_x, sectors }: Sectors) {
		self.num_z_sectors = num_z;
		self.num_x_sectors = num_x;
		self.sectors = sectors;
	}
}

/// Item placed in the level, in the TR2-5 layout.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Entity {
	/// Id into models, or sprite_sequences
	pub type_id: i16,
	/// Index into rooms
	pub room: i16,
	/// World coords
	pub pos: IVec3,
	/// Units are 1/65536th of a rotation
	pub angle: i16,
	pub intensity1: i16,
	/// Object code bits on TR4+
	pub intensity2: i16,
	pub flags: u16,
}

impl Entity {
	pub fn ocb(&self) -> i16 {
		self.intensity2
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AiObject {
	/// Id into models
	pub type_id: u16,
	/// Index into rooms
	pub room: u16,
	/// World coords
	pub pos: IVec3,
	pub ocb: i16,
	pub flags: u16,
	pub angle: i32,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Model {
	pub id: u32,
	pub num_meshes: u16,
	/// Index into mesh_pointers
	pub mesh_id: u16,
	/// Offset into mesh_tree
	pub mesh_tree: u32,
	/// Byte offset into frames
	pub frame_offset: u32,
	/// Index into animations
	pub animation: Option<NonMaxU16>,
}

/// Model followed by two padding bytes (TR5, PSX and Saturn tables).
#[derive(Clone, Copy, Debug)]
pub struct PaddedModel(pub Model);

impl Readable for PaddedModel {
	fn read<E: byteorder::ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let model = Model::read::<E>(reader)?;
		reader.skip(2)?;
		Ok(PaddedModel(model))
	}
}

impl From<PaddedModel> for Model {
	fn from(PaddedModel(model): PaddedModel) -> Self {
		model
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundBox {
	pub x: MinMax<i16>,
	pub y: MinMax<i16>,
	pub z: MinMax<i16>,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticMesh {
	pub id: u32,
	/// Index into mesh_pointers
	pub mesh: u16,
	pub visibility: BoundBox,
	pub collision: BoundBox,
	pub flags: u16,
}

bitfield! {
	#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
	pub struct TileAndFlag(u16);
	/// Index into textiles
	pub tile, set_tile: 14, 0;
	pub triangle, _: 15;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
	Opaque,
	Test,
	Add,
	Other(u16),
}

/// Textured quad descriptor referenced by room and mesh faces.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectTexture {
	pub attribute: u16,
	pub tile_and_flag: TileAndFlag,
	/// Units are 1/256th of a pixel
	pub vertices: [U16Vec2; 4],
}

impl ObjectTexture {
	pub fn blend_mode(&self) -> BlendMode {
		match self.attribute {
			0 => BlendMode::Opaque,
			1 => BlendMode::Test,
			2 => BlendMode::Add,
			m => BlendMode::Other(m),
		}
	}

	pub fn tile(&self) -> u16 {
		self.tile_and_flag.tile()
	}

	/// Corner in whole pixels.
	pub fn pixel(&self, corner: usize) -> U16Vec2 {
		self.vertices[corner] >> 8
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpriteTexture {
	/// Index into textiles
	pub tile: u16,
	pub x: u8,
	pub y: u8,
	/// Units are 1/256th of a pixel
	pub width: u16,
	/// Units are 1/256th of a pixel
	pub height: u16,
	pub left: i16,
	pub top: i16,
	pub right: i16,
	pub bottom: i16,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpriteSequence {
	pub sprite_id: i32,
	pub negative_length: i16,
	/// Index into sprite_textures
	pub offset: i16,
}

impl SpriteSequence {
	pub fn len(&self) -> usize {
		self.negative_length.unsigned_abs() as usize
	}

	pub fn is_empty(&self) -> bool {
		self.negative_length == 0
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Camera {
	/// World coords
	pub pos: IVec3,
	/// Index into rooms
	pub room: i16,
	pub flags: u16,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlybyCamera {
	/// World coords
	pub pos: IVec3,
	pub direction: IVec3,
	pub sequence: u8,
	pub index: u8,
	pub fov: u16,
	pub roll: i16,
	pub timer: u16,
	pub speed: u16,
	pub flags: u16,
	/// Index into rooms
	pub room: u32,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoundSource {
	/// World coords
	pub pos: IVec3,
	/// Index into sound_map
	pub sound_id: u16,
	pub flags: u16,
}

/// Sound details in the TR1/2 layout; TR3+ packs range and pitch into the volume and chance words.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoundDetails {
	/// Index into sample_indices
	pub sample: u16,
	pub volume: u16,
	pub chance: u16,
	pub characteristics: u16,
}

impl SoundDetails {
	pub fn num_samples(&self) -> u16 {
		(self.characteristics >> 2) & 0x3f
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateChange {
	pub state: u16,
	pub num_anim_dispatches: u16,
	/// Index into anim_dispatches
	pub anim_dispatch: u16,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimDispatch {
	pub low_frame: i16,
	pub high_frame: i16,
	/// Index into animations
	pub next_animation: i16,
	pub next_frame: i16,
}

/// Animation in the TR4/5 layout; earlier layouts convert with zero lateral motion.
#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Animation {
	/// Byte offset into frames
	pub frame_offset: u32,
	/// 30ths of a second
	pub frame_rate: u8,
	/// Words per frame
	pub frame_size: u8,
	pub state: u16,
	/// Fixed-point
	pub speed: i32,
	/// Fixed-point
	pub accel: i32,
	/// Fixed-point
	pub lateral_speed: i32,
	/// Fixed-point
	pub lateral_accel: i32,
	pub frame_start: u16,
	pub frame_end: u16,
	pub next_animation: u16,
	pub next_frame: u16,
	pub num_state_changes: u16,
	/// Index into state_changes
	pub state_change: u16,
	pub num_anim_commands: u16,
	/// Index into anim_commands
	pub anim_command: u16,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CinematicFrame {
	pub target: I16Vec3,
	pub pos: I16Vec3,
	pub fov: i16,
	pub roll: i16,
}

bitfield! {
	#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
	pub struct MeshNodeFlags(u32);
	pub pop, _: 0;
	pub push, _: 1;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshNode {
	pub flags: MeshNodeFlags,
	/// Relative to parent
	pub offset: IVec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameRotation {
	X(f32),
	Y(f32),
	Z(f32),
	All(Vec3),
}

impl FrameRotation {
	/// Euler angles in radians.
	pub fn angles(&self) -> Vec3 {
		match *self {
			FrameRotation::X(x) => Vec3::new(x, 0.0, 0.0),
			FrameRotation::Y(y) => Vec3::new(0.0, y, 0.0),
			FrameRotation::Z(z) => Vec3::new(0.0, 0.0, z),
			FrameRotation::All(all) => all,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
	pub bound_box: MinMax<I16Vec3>,
	pub offset: I16Vec3,
	pub rotations: Vec<FrameRotation>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn appended_geometry_is_offset_by_existing_vertices() {
		let mut room = Room::default();
		let quad = Face::new([0, 1, 2, 3], 5);
		room.append_geometry(vec![Vertex::default(); 4], [quad], []);
		room.append_geometry(vec![Vertex::default(); 3], [], [Face::new([0, 1, 2], 6)]);
		assert_eq!(room.rectangles[0].vertices, [0, 1, 2, 3]);
		assert_eq!(room.triangles[0].vertices, [4, 5, 6]);
		assert!(room.face_indices_in_range());
	}

	#[test]
	fn sector_lookup_is_column_major() {
		let mut room = Room { num_x_sectors: 2, num_z_sectors: 3, ..Default::default() };
		room.sectors = (0..6).map(|i| Sector { floor_data_index: i, ..Default::default() }).collect();
		assert_eq!(room.sector(1, 2).map(|s| s.floor_data_index), Some(5));
		assert!(room.sector(2, 0).is_none());
	}

	#[test]
	fn texture_details_split() {
		let face = Face::new([0, 1, 2], 0x8123);
		assert!(face.details().double_sided());
		assert_eq!(face.details().texture_index(), 0x123);
	}
}
