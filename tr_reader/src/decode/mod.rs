//! Per-format decoders. Each walks its file once, filling the shared `Level`
//! through the steps in `tables` and `rooms`.

mod tables;
mod rooms;
mod textiles;
mod psx;
mod tr1_pc;
mod tr2_pc;
mod tr3_pc;
mod tr4_5_pc;
mod tr1_psx;
mod tr2_psx;
mod tr3_psx;
mod late_psx;
mod dreamcast;
mod saturn;

use std::{io, path::{Path, PathBuf}};
use log::{debug, warn};
use crate::{
	files::{self, Files},
	pack::Pack,
	version::Variant,
	Error, Level, LoadCallbacks, LoadOptions, Reader, Result,
};

/// Sound samples with the slot each one is delivered to.
pub(crate) type Samples = Vec<(u16, Vec<u8>)>;

/// Samples numbered in the order they were found.
pub(crate) fn in_order(samples: Vec<Vec<u8>>) -> Samples {
	samples.into_iter().enumerate().map(|(i, s)| (i as u16, s)).collect()
}

/// State of one decode: the level being filled and the caller's collaborators.
pub(crate) struct Context<'a> {
	pub level: Level,
	pub options: &'a LoadOptions,
	pub files: &'a dyn Files,
	pub path: Option<&'a Path>,
	pub callbacks: &'a mut dyn LoadCallbacks,
}

impl<'a> Context<'a> {
	pub fn new(
		level: Level,
		options: &'a LoadOptions,
		files: &'a dyn Files,
		path: Option<&'a Path>,
		callbacks: &'a mut dyn LoadCallbacks,
	) -> Self {
		Context { level, options, files, path, callbacks }
	}

	pub fn progress(&mut self, message: &str) {
		self.callbacks.on_progress(message);
	}

	/// Announces a table about to be read at the cursor.
	pub fn step(&mut self, reader: &Reader, name: &str) {
		self.callbacks.on_progress(&format!("Reading {}", name));
		debug!("[{}] Reading {}", reader.position(), name);
	}

	pub fn finished(&self, reader: &Reader, count: usize, name: &str) {
		debug!("[{}] Read {} {}", reader.position(), count, name);
	}

	/// Hands a converted 256x256 textile to the caller.
	pub fn emit_textile(&mut self, pixels: &[u32]) {
		self.level.num_textiles += 1;
		if self.options.textiles {
			self.callbacks.on_textile(pixels);
		}
	}

	/// Runs a sound extraction step when sounds were asked for.
	/// On failure nothing is delivered, the cursor goes back to where the step began and decoding carries on.
	pub fn sounds<F>(&mut self, reader: &mut Reader, read: F)
	where
		F: FnOnce(&mut Self, &mut Reader) -> Result<Samples>,
	{
		if !self.options.sounds {
			return;
		}
		let start = reader.position();
		match read(self, reader) {
			Ok(samples) => {
				self.progress("Generating sounds");
				for (index, data) in &samples {
					self.level.num_sound_samples += 1;
					self.callbacks.on_sound(*index, data);
				}
				debug!("Delivered {} sound samples", samples.len());
			},
			Err(e) => {
				warn!("Failed to load sound samples: {}", e);
				self.progress("Failed to load sound samples");
				reader.seek(start);
			},
		}
	}

	/// Loads a file next to the level.
	pub fn companion(&self, path: impl FnOnce(&Path) -> PathBuf) -> Result<Vec<u8>> {
		let Some(level) = self.path else {
			return Err(Error::Io(io::Error::new(io::ErrorKind::NotFound, "level has no path")));
		};
		let path = path(level);
		debug!("Loading {}", path.display());
		self.files.load_file(&path).map_err(|e| {
			warn!("Could not load {}: {}", path.display(), e);
			Error::Io(e)
		})
	}

	/// Splits `MAIN.SFX` and maps each sample index to its RIFF file.
	/// Without sample indices every file is delivered in order.
	pub fn main_sfx_samples(&self) -> Result<Samples> {
		let sfx = self.companion(files::main_sfx_path)?;
		let riffs = crate::sound::split_riff(&sfx);
		let indices = &self.level.sample_indices;
		if indices.is_empty() {
			return Ok(in_order(riffs.iter().map(|s| s.to_vec()).collect()));
		}
		Ok(indices
			.iter()
			.enumerate()
			.filter_map(|(slot, &index)| Some((slot as u16, riffs.get(index as usize)?.to_vec())))
			.collect())
	}
}

/// Decodes `data` as the variant already stored on `ctx.level`.
pub(crate) fn decode(ctx: &mut Context, data: &[u8]) -> Result<()> {
	let mut reader = Reader::new(data);
	let reader = &mut reader;
	let version = ctx.level.version;
	match version.variant() {
		Variant::Tr1Pc => tr1_pc::decode(ctx, reader),
		Variant::Tr2Pc => tr2_pc::decode(ctx, reader),
		Variant::Tr3Pc => tr3_pc::decode(ctx, reader),
		Variant::Tr4Pc => tr4_5_pc::decode_tr4(ctx, reader),
		Variant::Tr4PcRemastered => tr4_5_pc::decode_tr4_remastered(ctx, reader),
		Variant::Tr5Pc => tr4_5_pc::decode_tr5(ctx, reader),
		Variant::Tr5PcRemastered => tr4_5_pc::decode_tr5_remastered(ctx, reader),
		variant @ (Variant::Tr1Psx | Variant::Tr1PsxVersion27 | Variant::Tr1PsxMay1996) => {
			tr1_psx::decode(ctx, reader, variant)
		},
		variant @ (Variant::Tr2Psx | Variant::Tr2PsxVersion38 | Variant::Tr2PsxVersion42 | Variant::Tr2PsxVersion44) => {
			tr2_psx::decode(ctx, reader, variant)
		},
		Variant::Tr3Psx => tr3_psx::decode(ctx, reader),
		Variant::Tr4Psx | Variant::Tr5Psx => late_psx::decode(ctx, reader),
		Variant::Tr5Dreamcast => dreamcast::decode(ctx, reader),
		Variant::Tr1Saturn => saturn::decode(ctx, reader),
		Variant::Pack => {
			ctx.progress("Reading pack");
			let mut pack = Pack::read(data, &ctx.level.name)?;
			pack.load(ctx.files);
			ctx.level.pack = Some(pack);
			Ok(())
		},
		Variant::Unknown => Err(Error::UnrecognizedFormat { version: version.raw_version }),
	}
}
