//! Access to files next to a level: `MAIN.SFX`, PSX sound banks and Saturn companion files.

use std::{collections::HashMap, fs, io, path::{Path, PathBuf}};

pub trait Files {
	fn load_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskFiles;

impl Files for DiskFiles {
	fn load_file(&self, path: &Path) -> io::Result<Vec<u8>> {
		fs::read(path)
	}
}

/// In-memory files keyed by exact path.
impl Files for HashMap<PathBuf, Vec<u8>> {
	fn load_file(&self, path: &Path) -> io::Result<Vec<u8>> {
		self.get(path).cloned().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
	}
}

/// No files at all.
impl Files for () {
	fn load_file(&self, path: &Path) -> io::Result<Vec<u8>> {
		Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
	}
}

/// `MAIN.SFX` in the level's folder.
pub fn main_sfx_path(level: &Path) -> PathBuf {
	level.with_file_name("MAIN.SFX")
}

/// External PSX sound bank files, `../PSXSOUND/<stem>.VBH` and `.VBB`.
pub fn psx_sound_bank_paths(level: &Path) -> (PathBuf, PathBuf) {
	let folder = level.parent().unwrap_or(Path::new("")).join("..").join("PSXSOUND");
	let stem = level.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
	(folder.join(format!("{}.VBH", stem)), folder.join(format!("{}.VBB", stem)))
}

/// Saturn companion file with the level's stem and `extension`.
pub fn companion_path(level: &Path, extension: &str) -> PathBuf {
	level.with_extension(extension)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sibling_paths() {
		let level = Path::new("data/LEVEL1.PSX");
		assert_eq!(main_sfx_path(level), Path::new("data/MAIN.SFX"));
		assert_eq!(companion_path(Path::new("data/LEVEL1.SAT"), "SAD"), Path::new("data/LEVEL1.SAD"));
		let (header, body) = psx_sound_bank_paths(level);
		assert_eq!(header, Path::new("data/../PSXSOUND/LEVEL1.VBH"));
		assert_eq!(body, Path::new("data/../PSXSOUND/LEVEL1.VBB"));
	}

	#[test]
	fn disk_files_read_from_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("MAIN.SFX");
		std::fs::write(&path, b"RIFF").unwrap();
		assert_eq!(DiskFiles.load_file(&path).unwrap(), b"RIFF");
		assert_eq!(DiskFiles.load_file(&dir.path().join("missing")).unwrap_err().kind(), io::ErrorKind::NotFound);
	}

	#[test]
	fn in_memory_files() {
		let mut files = HashMap::new();
		files.insert(PathBuf::from("a/MAIN.SFX"), vec![1, 2]);
		assert_eq!(files.load_file(Path::new("a/MAIN.SFX")).unwrap(), vec![1, 2]);
		assert!(().load_file(Path::new("a/MAIN.SFX")).is_err());
	}
}
