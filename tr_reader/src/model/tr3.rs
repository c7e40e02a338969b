//! On-disk records specific to TR3, also used by TR4 rooms.

use byteorder::ByteOrder;
use glam::{I16Vec3, IVec3};
use crate::{Readable, Reader, Result};
use super::{Color3, LightType, Vertex};

#[derive(Readable, Clone, Copy, Debug)]
pub struct RoomVertex {
	/// Relative to Room
	pub vertex: I16Vec3,
	pub lighting: i16,
	pub attributes: u16,
	/// 15-bit RGB
	pub color: u16,
}

impl From<RoomVertex> for Vertex {
	fn from(RoomVertex { vertex, lighting, attributes, color }: RoomVertex) -> Self {
		Vertex::from_rgb555(vertex, lighting, attributes, color)
	}
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SunLight {
	pub normal: I16Vec3,
	pub unused: u16,
}

#[derive(Readable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointLight {
	pub intensity: i32,
	pub fade: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightComponent {
	Sun(SunLight),
	Point(PointLight),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Light {
	/// World coords
	pub pos: IVec3,
	pub color: Color3,
	pub component: LightComponent,
}

impl Light {
	pub fn sun(pos: IVec3, color: Color3, normal: I16Vec3) -> Self {
		Light { pos, color, component: LightComponent::Sun(SunLight { normal, unused: 0 }) }
	}

	pub fn point(pos: IVec3, color: Color3, intensity: i32, fade: i32) -> Self {
		Light { pos, color, component: LightComponent::Point(PointLight { intensity, fade }) }
	}

	pub fn light_type(&self) -> LightType {
		match self.component {
			LightComponent::Sun(_) => LightType::Sun,
			LightComponent::Point(_) => LightType::Point,
		}
	}

	pub(crate) fn sun_component(&self) -> Option<&SunLight> {
		match &self.component {
			LightComponent::Sun(sun) => Some(sun),
			LightComponent::Point(_) => None,
		}
	}

	pub(crate) fn point_component(&self) -> Option<&PointLight> {
		match &self.component {
			LightComponent::Point(point) => Some(point),
			LightComponent::Sun(_) => None,
		}
	}
}

impl Readable for Light {
	fn read<E: ByteOrder>(reader: &mut Reader) -> Result<Self> {
		let pos = IVec3::read::<E>(reader)?;
		let color = Color3::read::<E>(reader)?;
		//both variants are 8 bytes, anything but a sun reads as a point
		let component = match u8::read::<E>(reader)? {
			0 => LightComponent::Sun(SunLight::read::<E>(reader)?),
			_ => LightComponent::Point(PointLight::read::<E>(reader)?),
		};
		Ok(Light { pos, color, component })
	}
}
