use std::ops::Sub;
use glam_traits::{GBVec, GVec};

/// Inclusive range or volume defined by a minimum and maximum.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinMax<T> {
	pub min: T,
	pub max: T,
}

impl<T> MinMax<T> where T: Clone {
	pub fn new(a: T) -> Self {
		Self { min: a.clone(), max: a }
	}
}

impl<T> MinMax<T> where T: Copy + Sub<Output = T> {
	pub fn size(&self) -> T {
		self.max - self.min
	}
}

pub trait VecMinMax<T> {
	fn update(&mut self, v: T);
	fn contains(&self, other: &Self) -> bool;
}

impl<T> VecMinMax<T> for MinMax<T> where T: GVec {
	fn update(&mut self, a: T) {
		self.min = self.min.min(a);
		self.max = self.max.max(a);
	}
	
	fn contains(&self, other: &Self) -> bool {
		self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
	}
}

pub trait VecMinMaxFromIterator: Iterator {
	fn vec_min_max(self) -> Option<MinMax<Self::Item>>;
}

impl<T> VecMinMaxFromIterator for T where T: Iterator, T::Item: GVec {
	fn vec_min_max(mut self) -> Option<MinMax<Self::Item>> {
		let mut min_max = MinMax::new(self.next()?);
		for a in self {
			min_max.update(a);
		}
		Some(min_max)
	}
}

pub trait ScalarMinMax<T> {
	fn update(&mut self, a: T);
	fn contains(&self, a: T) -> bool;
}

impl<T> ScalarMinMax<T> for MinMax<T> where T: Copy + Ord {
	fn update(&mut self, a: T) {
		self.min = self.min.min(a);
		self.max = self.max.max(a);
	}
	
	fn contains(&self, a: T) -> bool {
		self.min <= a && a <= self.max
	}
}

pub trait ScalarMinMaxFromIterator: Iterator {
	fn min_max(self) -> Option<MinMax<Self::Item>>;
}

impl<T> ScalarMinMaxFromIterator for T where T: Iterator, T::Item: Copy + Ord {
	fn min_max(mut self) -> Option<MinMax<Self::Item>> {
		let mut min_max = MinMax::new(self.next()?);
		for a in self {
			ScalarMinMax::update(&mut min_max, a);
		}
		Some(min_max)
	}
}

#[cfg(test)]
mod tests {
	use glam::{vec3, Vec3};
	use super::*;

	#[test]
	fn scalar_range_from_iterator() {
		let range = [5, -3, 12, 0].into_iter().min_max().unwrap();
		assert_eq!(range, MinMax { min: -3, max: 12 });
		assert_eq!(range.size(), 15);
		assert!(range.contains(0));
		assert!(!range.contains(13));
		assert_eq!(std::iter::empty::<i32>().min_max(), None);
	}

	#[test]
	fn vector_volume_from_iterator() {
		let volume = [vec3(1.0, 5.0, -2.0), vec3(-4.0, 2.0, 8.0)].into_iter().vec_min_max().unwrap();
		assert_eq!(volume.min, vec3(-4.0, 2.0, -2.0));
		assert_eq!(volume.max, vec3(1.0, 5.0, 8.0));
		assert!(volume.contains(&MinMax::new(Vec3::new(0.0, 3.0, 0.0))));
	}
}
