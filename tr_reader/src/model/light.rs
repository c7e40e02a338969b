use glam::Vec3;
use super::{tr1, tr2, tr3, tr4, tr5};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
	Sun,
	Point,
	Spot,
	Shadow,
	FogBulb,
}

impl LightType {
	pub(crate) fn from_u8(value: u8) -> Self {
		match value {
			0 => LightType::Sun,
			2 => LightType::Spot,
			3 => LightType::Shadow,
			4 => LightType::FogBulb,
			_ => LightType::Point,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			LightType::Sun => "Sun",
			LightType::Point => "Point",
			LightType::Spot => "Spot",
			LightType::Shadow => "Shadow",
			LightType::FogBulb => "Fog Bulb",
		}
	}
}

/// Room light, kept in the layout of the generation that stored it.
///
/// Every query is answered for every variant: fields the variant does not store come back as zero,
/// except `color`, which is white for the generations without coloured lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
	Tr1(tr1::Light),
	Tr2(tr2::Light),
	Tr3(tr3::Light),
	Tr4(tr4::Light),
	Tr5(tr5::Light),
	Tr5Fog(tr5::FogBulb),
}

impl Light {
	/// World coords
	pub fn position(&self) -> Vec3 {
		match self {
			Light::Tr1(l) => l.pos.as_vec3(),
			Light::Tr2(l) => l.pos.as_vec3(),
			Light::Tr3(l) => l.pos.as_vec3(),
			Light::Tr4(l) => l.pos.as_vec3(),
			Light::Tr5(l) => l.pos,
			Light::Tr5Fog(l) => l.pos,
		}
	}

	/// Linear RGB in 0..=1.
	pub fn color(&self) -> Vec3 {
		match self {
			Light::Tr1(_) | Light::Tr2(_) => Vec3::ONE,
			Light::Tr3(l) => Vec3::new(l.color.r as f32, l.color.g as f32, l.color.b as f32) / 255.0,
			Light::Tr4(l) => Vec3::new(l.color.r as f32, l.color.g as f32, l.color.b as f32) / 255.0,
			Light::Tr5(l) => l.color,
			Light::Tr5Fog(l) => l.color,
		}
	}

	pub fn light_type(&self) -> LightType {
		match self {
			Light::Tr1(_) | Light::Tr2(_) => LightType::Point,
			Light::Tr3(l) => l.light_type(),
			Light::Tr4(l) => LightType::from_u8(l.light_type),
			Light::Tr5(l) => LightType::from_u8(l.light_type),
			Light::Tr5Fog(_) => LightType::FogBulb,
		}
	}

	pub fn intensity(&self) -> i32 {
		match self {
			Light::Tr1(l) => l.intensity as i32,
			Light::Tr2(l) => l.intensity1 as i32,
			Light::Tr3(l) => l.point_component().map_or(0, |p| p.intensity),
			Light::Tr4(l) => l.intensity as i32,
			Light::Tr5(_) | Light::Tr5Fog(_) => 0,
		}
	}

	pub fn fade(&self) -> i32 {
		match self {
			Light::Tr1(l) => l.fade as i32,
			Light::Tr2(l) => l.fade1 as i32,
			Light::Tr3(l) => l.point_component().map_or(0, |p| p.fade),
			_ => 0,
		}
	}

	pub fn direction(&self) -> Vec3 {
		match (self, self.light_type()) {
			(Light::Tr3(l), LightType::Sun) => l.sun_component().map_or(Vec3::ZERO, |s| s.normal.as_vec3()),
			(Light::Tr4(l), LightType::Sun | LightType::Spot) => l.direction,
			(Light::Tr5(l), LightType::Sun | LightType::Spot) => l.direction,
			_ => Vec3::ZERO,
		}
	}

	/// Hotspot
	pub fn inner(&self) -> f32 {
		match self {
			Light::Tr4(l) => l.hotspot,
			Light::Tr5(l) => l.hotspot,
			_ => 0.0,
		}
	}

	/// Falloff
	pub fn outer(&self) -> f32 {
		match self {
			Light::Tr4(l) => l.falloff,
			Light::Tr5(l) => l.falloff,
			_ => 0.0,
		}
	}

	pub fn rad_in(&self) -> f32 {
		match self {
			Light::Tr5(l) => l.rad_in,
			_ => 0.0,
		}
	}

	pub fn rad_out(&self) -> f32 {
		match self {
			Light::Tr5(l) => l.rad_out,
			_ => 0.0,
		}
	}

	pub fn range(&self) -> f32 {
		match self {
			Light::Tr5(l) => l.range,
			_ => 0.0,
		}
	}

	pub fn length(&self) -> f32 {
		match self {
			Light::Tr4(l) => l.length,
			_ => 0.0,
		}
	}

	pub fn cutoff(&self) -> f32 {
		match self {
			Light::Tr4(l) => l.cutoff,
			_ => 0.0,
		}
	}

	/// Fog bulbs only
	pub fn radius(&self) -> f32 {
		match (self, self.light_type()) {
			(Light::Tr4(l), LightType::FogBulb) => l.falloff,
			(Light::Tr5Fog(l), _) => l.radius,
			_ => 0.0,
		}
	}

	/// Fog bulbs only
	pub fn density(&self) -> f32 {
		match (self, self.light_type()) {
			(Light::Tr4(l), LightType::FogBulb) => l.color.r as f32 / 255.0,
			(Light::Tr5Fog(l), _) => l.density,
			_ => 0.0,
		}
	}
}
