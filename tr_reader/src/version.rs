use std::{fmt, path::Path};
use crate::{Error, Result};

/// Hardware a level was built for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Platform {
	#[default]
	Unknown,
	Pc,
	Psx,
	Dreamcast,
	Saturn,
}

/// Game generation, ordered so later games compare greater.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Generation {
	#[default]
	Unknown,
	Tr1,
	Tr2,
	Tr3,
	Tr4,
	Tr5,
}

/// Result of sniffing a level's header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LevelVersion {
	pub platform: Platform,
	pub generation: Generation,
	/// Version word as found in the file (or the prototype build number for PSX prototypes)
	pub raw_version: u32,
	pub remastered: bool,
	pub pack: bool,
	pub saturn: bool,
}

/// One decode routine. Selected once per level, it drives every per-format step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
	Tr1Pc,
	Tr1Psx,
	/// Build 27 prototype
	Tr1PsxVersion27,
	Tr1PsxMay1996,
	Tr1Saturn,
	Tr2Pc,
	Tr2Psx,
	Tr2PsxVersion38,
	Tr2PsxVersion42,
	Tr2PsxVersion44,
	Tr3Pc,
	Tr3Psx,
	Tr4Pc,
	Tr4PcRemastered,
	Tr4Psx,
	Tr5Pc,
	Tr5PcRemastered,
	Tr5Psx,
	Tr5Dreamcast,
	Pack,
	Unknown,
}

//raw version words
pub const TR1_PC: u32 = 0x00000020;
pub const TR2_PC: u32 = 0x0000002D;
pub const TR2_PC_E3: u32 = 0x00000026;
pub const TR3_PC: u32 = 0xFF080038;
pub const TR3_PC_ALT: u32 = 0xFF180038;
pub const TR3_PC_DEMO: u32 = 0xFF180034;
pub const TR4_PC: u32 = 0x00345254;
pub const TR4_PC_DEMO: u32 = 0x63345254;
pub const TR1_PSX_VERSION_27: u32 = 0x1B;
pub const TR1_PSX_MAY_1996: u32 = 0x0B;
pub const TR2_PSX_VERSION_38: u32 = 0x26;
pub const TR2_PSX_VERSION_42: u32 = 0x2A;
pub const TR2_PSX_VERSION_44: u32 = 0x2C;
pub const TR3_PSX: u32 = 0x00000034;

const VAB_MAGIC: &[u8; 4] = b"pBAV";
const SATURN_MAGIC: &[u8; 8] = b"ROOMFILE";
const TEXTILE4_SIZE: usize = 32768;
const CLUT_SIZE: usize = 32;
const TR4_PSX_INFO_OFFSETS: [usize; 3] = [0x6000, 0x7000, 0x7800];
const TR5_PSX_INFO_OFFSET: usize = 0x4C800;
const DREAMCAST_PAGE: usize = 2048;

impl LevelVersion {
	pub fn new(platform: Platform, generation: Generation, raw_version: u32) -> Self {
		Self { platform, generation, raw_version, ..Default::default() }
	}

	pub fn is_unknown(&self) -> bool {
		!self.pack && self.generation == Generation::Unknown
	}

	pub fn variant(&self) -> Variant {
		use Generation::*;
		if self.pack {
			return Variant::Pack;
		}
		match (self.platform, self.generation) {
			(Platform::Pc, Tr1) => Variant::Tr1Pc,
			(Platform::Pc, Tr2) => Variant::Tr2Pc,
			(Platform::Pc, Tr3) => Variant::Tr3Pc,
			(Platform::Pc, Tr4) if self.remastered => Variant::Tr4PcRemastered,
			(Platform::Pc, Tr4) => Variant::Tr4Pc,
			(Platform::Pc, Tr5) if self.remastered => Variant::Tr5PcRemastered,
			(Platform::Pc, Tr5) => Variant::Tr5Pc,
			(Platform::Psx, Tr1) => match self.raw_version {
				TR1_PSX_VERSION_27 => Variant::Tr1PsxVersion27,
				TR1_PSX_MAY_1996 => Variant::Tr1PsxMay1996,
				_ => Variant::Tr1Psx,
			},
			(Platform::Psx, Tr2) => match self.raw_version {
				TR2_PSX_VERSION_38 => Variant::Tr2PsxVersion38,
				TR2_PSX_VERSION_42 => Variant::Tr2PsxVersion42,
				TR2_PSX_VERSION_44 => Variant::Tr2PsxVersion44,
				_ => Variant::Tr2Psx,
			},
			(Platform::Psx, Tr3) => Variant::Tr3Psx,
			(Platform::Psx, Tr4) => Variant::Tr4Psx,
			(Platform::Psx, Tr5) => Variant::Tr5Psx,
			(Platform::Dreamcast, Tr5) => Variant::Tr5Dreamcast,
			(Platform::Saturn, Tr1) => Variant::Tr1Saturn,
			_ => Variant::Unknown,
		}
	}
}

impl Variant {
	pub fn version(self) -> LevelVersion {
		use Generation::*;
		let (platform, generation, raw_version) = match self {
			Variant::Tr1Pc => (Platform::Pc, Tr1, TR1_PC),
			Variant::Tr1Psx => (Platform::Psx, Tr1, TR1_PC),
			Variant::Tr1PsxVersion27 => (Platform::Psx, Tr1, TR1_PSX_VERSION_27),
			Variant::Tr1PsxMay1996 => (Platform::Psx, Tr1, TR1_PSX_MAY_1996),
			Variant::Tr1Saturn => (Platform::Saturn, Tr1, 0),
			Variant::Tr2Pc => (Platform::Pc, Tr2, TR2_PC),
			Variant::Tr2Psx => (Platform::Psx, Tr2, TR2_PC),
			Variant::Tr2PsxVersion38 => (Platform::Psx, Tr2, TR2_PSX_VERSION_38),
			Variant::Tr2PsxVersion42 => (Platform::Psx, Tr2, TR2_PSX_VERSION_42),
			Variant::Tr2PsxVersion44 => (Platform::Psx, Tr2, TR2_PSX_VERSION_44),
			Variant::Tr3Pc => (Platform::Pc, Tr3, TR3_PC),
			Variant::Tr3Psx => (Platform::Psx, Tr3, TR3_PSX),
			Variant::Tr4Pc | Variant::Tr4PcRemastered => (Platform::Pc, Tr4, TR4_PC),
			Variant::Tr4Psx => (Platform::Psx, Tr4, 0),
			Variant::Tr5Pc | Variant::Tr5PcRemastered => (Platform::Pc, Tr5, TR4_PC),
			Variant::Tr5Psx => (Platform::Psx, Tr5, 0),
			Variant::Tr5Dreamcast => (Platform::Dreamcast, Tr5, 0),
			Variant::Pack => return LevelVersion { pack: true, ..Default::default() },
			Variant::Unknown => return LevelVersion::default(),
		};
		LevelVersion {
			platform,
			generation,
			raw_version,
			remastered: matches!(self, Variant::Tr4PcRemastered | Variant::Tr5PcRemastered),
			pack: false,
			saturn: self == Variant::Tr1Saturn,
		}
	}

	pub fn platform(self) -> Platform {
		self.version().platform
	}

	pub fn generation(self) -> Generation {
		self.version().generation
	}
}

impl fmt::Display for Variant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let version = self.version();
		match self {
			Variant::Pack => f.write_str("Pack"),
			Variant::Unknown => f.write_str("Unknown"),
			_ => {
				write!(f, "{:?} {:?}", version.generation, version.platform)?;
				match self {
					Variant::Tr1PsxVersion27 | Variant::Tr2PsxVersion38 | Variant::Tr2PsxVersion42 | Variant::Tr2PsxVersion44 => {
						write!(f, " (version {})", version.raw_version)
					},
					Variant::Tr1PsxMay1996 => f.write_str(" (May 1996)"),
					Variant::Tr4PcRemastered | Variant::Tr5PcRemastered => f.write_str(" (remastered)"),
					_ => Ok(()),
				}
			},
		}
	}
}

/// Maps a version word to a version. Total: unmatched words give `Unknown`.
pub fn classify(raw_version: u32) -> LevelVersion {
	use Generation::*;
	let pc = |generation| LevelVersion::new(Platform::Pc, generation, raw_version);
	let psx = |generation| LevelVersion::new(Platform::Psx, generation, raw_version);
	match raw_version {
		0 => LevelVersion { raw_version, pack: true, ..Default::default() },
		TR4_PC | TR4_PC_DEMO => pc(Tr4),
		TR1_PSX_VERSION_27 | TR1_PSX_MAY_1996 => psx(Tr1),
		TR2_PSX_VERSION_42 | TR2_PSX_VERSION_44 => psx(Tr2),
		_ => {
			let high = raw_version & 0xFFFFFF00;
			match raw_version & 0xFF {
				0x20 if high == 0 => pc(Tr1),
				0x20 => psx(Tr1),
				0x26 | 0x2D => pc(Tr2),
				// 0xFF??0034 and 0xFF??0038
				0x34 | 0x38 if raw_version & 0xFF00FF00 == 0xFF000000 => pc(Tr3),
				0x34 | 0x38 if high == 0 => psx(Tr3),
				_ => LevelVersion { raw_version, ..Default::default() },
			}
		},
	}
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
	let bytes = data.get(offset..offset.checked_add(4)?)?;
	Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn has_extension(file_name: Option<&str>, extension: &str) -> bool {
	file_name
		.and_then(|name| Path::new(name).extension())
		.map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
}

/// A zlib stream header: deflate method and a valid check value.
fn is_zlib_header(data: &[u8], offset: usize) -> bool {
	match data.get(offset..offset.saturating_add(2)) {
		Some(&[cmf, flg]) => cmf & 0x0F == 8 && (((cmf as u16) << 8) | flg as u16) % 31 == 0,
		_ => false,
	}
}

/// Version word and 3 textile counts, then uncompressed and compressed sizes.
const TR4_COMPRESSED_TEXTILES: usize = 4 + 6 + 8;

fn detect_pc_remastered(data: &[u8]) -> bool {
	data.len() >= TR4_COMPRESSED_TEXTILES + 2 && !is_zlib_header(data, TR4_COMPRESSED_TEXTILES)
}

/// PSX levels that open with a sound bank: `[header size]["pBAV" header][body size][bodies]`.
/// The VAB total size field lets us find the word after the bank.
/// TR1 levels without a bank start with a zero word and a skippable sound block instead.
fn detect_psx_with_sound_bank(data: &[u8]) -> Option<LevelVersion> {
	let psx = |generation, raw_version| Some(LevelVersion::new(Platform::Psx, generation, raw_version));
	let version_after = |after_bank: usize, textiles: usize, cluts: usize| {
		u32_at(data, after_bank.checked_add(textiles * TEXTILE4_SIZE + cluts * CLUT_SIZE)?)
	};
	if data.get(4..8)? != VAB_MAGIC {
		let after_sounds = (u32_at(data, 4)? as usize).checked_add(8)?;
		if u32_at(data, 0)? == 0 && version_after(after_sounds, 13, 1024) == Some(TR1_PC) {
			return psx(Generation::Tr1, TR1_PC);
		}
		return None;
	}
	let after_bank = (u32_at(data, 16)? as usize).checked_add(8)?;
	match u32_at(data, after_bank) {
		Some(TR2_PC) => return psx(Generation::Tr2, TR2_PC),
		Some(TR2_PSX_VERSION_44) => return psx(Generation::Tr2, TR2_PSX_VERSION_44),
		_ => {},
	}
	if version_after(after_bank, 13, 1024) == Some(TR1_PC) {
		return psx(Generation::Tr1, TR1_PC);
	}
	if version_after(after_bank, 18, 2048) == Some(TR2_PSX_VERSION_42) {
		return psx(Generation::Tr2, TR2_PSX_VERSION_42);
	}
	if version_after(after_bank, 14, 1024) == Some(TR2_PSX_VERSION_38) {
		return psx(Generation::Tr2, TR2_PSX_VERSION_38);
	}
	None
}

/// Prototype PSX builds, and TR1 levels whose sounds live in an external bank, start straight
/// with textiles and carry the version word after them.
fn detect_psx_headerless(data: &[u8]) -> Option<LevelVersion> {
	if u32_at(data, 13 * TEXTILE4_SIZE + 1024 * CLUT_SIZE) == Some(TR1_PC) {
		return Some(LevelVersion::new(Platform::Psx, Generation::Tr1, TR1_PC));
	}
	if u32_at(data, 15 * TEXTILE4_SIZE + 1024 * CLUT_SIZE) == Some(TR1_PSX_VERSION_27) {
		return Some(LevelVersion::new(Platform::Psx, Generation::Tr1, TR1_PSX_VERSION_27));
	}
	if u32_at(data, 20 * TEXTILE4_SIZE + 2048 * CLUT_SIZE) == Some(TR1_PSX_MAY_1996) {
		return Some(LevelVersion::new(Platform::Psx, Generation::Tr1, TR1_PSX_MAY_1996));
	}
	None
}

fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
	let bytes = data.get(offset..offset.checked_add(2)?)?;
	Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// TR4/TR5 PSX files carry a level info block at a fixed offset: a small version word,
/// section offsets that land inside the file and a plausible room count.
fn is_psx_level_info(data: &[u8], offset: usize) -> bool {
	let plausible = || -> Option<bool> {
		let version = u32_at(data, offset)?;
		let room_data_offset = u32_at(data, offset + 20)? as usize;
		let textiles_offset = u32_at(data, offset + 12)? as usize;
		let num_rooms = u16_at(data, offset + 46)?;
		Some(
			(1..=0xFF).contains(&version)
				&& (1..1024).contains(&num_rooms)
				&& offset + room_data_offset < data.len()
				&& offset + textiles_offset < data.len(),
		)
	};
	plausible().unwrap_or(false)
}

/// Offset of the level info block of a TR4/TR5 PSX file.
pub(crate) fn psx_level_info_offset(data: &[u8], generation: Generation) -> Option<usize> {
	match generation {
		Generation::Tr5 => Some(TR5_PSX_INFO_OFFSET).filter(|&offset| is_psx_level_info(data, offset)),
		_ => TR4_PSX_INFO_OFFSETS.iter().copied().find(|&offset| is_psx_level_info(data, offset)),
	}
}

fn detect_psx_late(data: &[u8]) -> Option<LevelVersion> {
	[Generation::Tr5, Generation::Tr4].into_iter().find_map(|generation| {
		let offset = psx_level_info_offset(data, generation)?;
		Some(LevelVersion::new(Platform::Psx, generation, u32_at(data, offset)?))
	})
}

/// Dreamcast files are paged: the first page holds the textile size and is otherwise blank.
fn detect_dreamcast(data: &[u8]) -> Option<LevelVersion> {
	let page = data.get(8..DREAMCAST_PAGE)?;
	if u32_at(data, 0)? == 0 || page.iter().any(|&b| b != 0) {
		return None;
	}
	let counts = (0..3).map(|i| u32_at(data, DREAMCAST_PAGE + i * 4)).collect::<Option<Vec<_>>>()?;
	if counts.iter().all(|&c| c < 256) {
		Some(LevelVersion::new(Platform::Dreamcast, Generation::Tr5, 0))
	} else {
		None
	}
}

/// Sniffs a whole level buffer.
/// `file_name` disambiguates TR4 from TR5 PC files (`.trc`).
pub fn detect(data: &[u8], file_name: Option<&str>) -> Result<LevelVersion> {
	if data.len() < 4 {
		return Err(Error::Truncated { offset: 0, needed: 4, available: data.len() });
	}
	if data.starts_with(SATURN_MAGIC) {
		return Ok(LevelVersion { saturn: true, ..LevelVersion::new(Platform::Saturn, Generation::Tr1, 0) });
	}
	if let Some(version) = detect_psx_with_sound_bank(data) {
		return Ok(version);
	}
	let raw_version = u32_at(data, 0).unwrap_or_default();
	let mut version = classify(raw_version);
	if version.platform == Platform::Pc {
		if version.generation == Generation::Tr4 {
			if has_extension(file_name, "trc") {
				version.generation = Generation::Tr5;
			}
			version.remastered = detect_pc_remastered(data);
		}
		return Ok(version);
	}
	if let Some(version) = detect_psx_headerless(data) {
		return Ok(version);
	}
	if version.generation != Generation::Unknown || version.pack {
		return Ok(version);
	}
	Ok(detect_psx_late(data)
		.or_else(|| detect_dreamcast(data))
		.unwrap_or(version))
}
