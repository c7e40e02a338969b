use std::{env::args, fs, path::{Path, PathBuf}};
use anyhow::{bail, Context, Result};
use image::RgbaImage;
use itertools::Itertools;
use log::{debug, warn};
use tr_reader::{model::IMAGE_SIZE, Level, LoadCallbacks, LoadOptions};

/// Writes textiles as PNG and samples as they are stored (WAV) while the level decodes.
struct Dump {
	out: Option<PathBuf>,
	textiles: usize,
	sounds: usize,
}

impl Dump {
	fn write(&self, name: String, write: impl FnOnce(&Path) -> Result<()>) {
		let Some(out) = &self.out else {
			return;
		};
		let path = out.join(name);
		if let Err(e) = write(&path) {
			warn!("Could not write {}: {:#}", path.display(), e);
		}
	}
}

impl LoadCallbacks for Dump {
	fn on_progress(&mut self, message: &str) {
		debug!("{}", message);
	}

	fn on_textile(&mut self, pixels: &[u32]) {
		self.write(format!("textile_{}.png", self.textiles), |path| save_textile(path, pixels));
		self.textiles += 1;
	}

	fn on_sound(&mut self, index: u16, data: &[u8]) {
		self.write(format!("sound_{}.wav", index), |path| Ok(fs::write(path, data)?));
		self.sounds += 1;
	}
}

/// `0xAABBGGRR` pixels are R, G, B, A bytes in little-endian order.
fn save_textile(path: &Path, pixels: &[u32]) -> Result<()> {
	let bytes = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
	let size = IMAGE_SIZE as u32;
	let image = RgbaImage::from_raw(size, size, bytes).context("textile is not 256x256")?;
	image.save(path)?;
	Ok(())
}

fn print_summary(level: &Level) {
	let version = level.version();
	println!("{}: {} ({:?} {:?}, version {:#x})", level.name(), level.variant(), version.platform, version.generation, version.raw_version);
	if level.trng() {
		println!("TRNG level");
	}
	let counts = [
		("rooms", level.num_rooms()),
		("textiles", level.num_textiles() as usize),
		("object textures", level.num_object_textures()),
		("sprite textures", level.num_sprite_textures()),
		("floor data", level.num_floor_data()),
		("mesh pointers", level.num_mesh_pointers()),
		("models", level.num_models()),
		("static meshes", level.num_static_meshes()),
		("entities", level.num_entities()),
		("ai objects", level.num_ai_objects()),
		("cameras", level.num_cameras()),
		("sound sources", level.num_sound_sources()),
		("sound samples", level.num_sound_samples() as usize),
	];
	println!("{}", counts.iter().map(|(name, count)| format!("{} {}", count, name)).join(", "));
	if let Some(pack) = level.pack() {
		for (index, part) in pack.parts().iter().enumerate() {
			let variant = part.version.map_or("unknown".to_owned(), |v| v.variant().to_string());
			println!("  part {}: {} bytes at {:#x}, {}", index, part.size, part.start, variant);
			if let Some(level) = pack.part_level(index) {
				println!("    {} rooms, {} entities", level.num_rooms(), level.num_entities());
			}
		}
	}
}

fn main() -> Result<()> {
	env_logger::init();
	let mut args = args().skip(1);
	let Some(level_path) = args.next() else {
		bail!("usage: tr_dump <level> [output directory]");
	};
	let out = args.next().map(PathBuf::from);
	if let Some(out) = &out {
		fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
	}
	let options = LoadOptions { sounds: out.is_some(), textiles: out.is_some(), ..Default::default() };
	let mut dump = Dump { out, textiles: 0, sounds: 0 };
	let level = Level::load(&level_path, &options, &mut dump).with_context(|| format!("loading {}", level_path))?;
	print_summary(&level);
	if let Some(out) = &dump.out {
		println!("Wrote {} textiles and {} sounds to {}", dump.textiles, dump.sounds, out.display());
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn textile_round_trips_through_png() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("textile.png");
		let mut pixels = vec![0u32; IMAGE_SIZE * IMAGE_SIZE];
		pixels[1] = 0xff0000ff;
		save_textile(&path, &pixels).unwrap();
		let image = image::open(&path).unwrap().to_rgba8();
		assert_eq!(image.get_pixel(1, 0).0, [0xff, 0, 0, 0xff]);
		assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
	}

	#[test]
	fn short_textile_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		assert!(save_textile(&dir.path().join("short.png"), &[0; 16]).is_err());
	}

	#[test]
	fn nothing_is_written_without_an_output_directory() {
		let mut dump = Dump { out: None, textiles: 0, sounds: 0 };
		dump.on_sound(3, b"RIFF");
		dump.on_textile(&[0; 4]);
		assert_eq!((dump.textiles, dump.sounds), (1, 1));
	}
}
