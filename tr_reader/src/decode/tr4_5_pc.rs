//! TR4 and TR5 PC, both the retail and the remastered releases.

use log::{debug, info};
use crate::{
	files,
	mesh::MeshFormat,
	model::{
		tr4::{Tr4ObjectTexture, Tr5ObjectTexture},
		Entity, Model, PaddedModel,
	},
	Reader, Result,
};
use super::{in_order, rooms, Context, Samples};

/// `NG` as a little-endian word, found after NGLE sound tables and at the end of TRNG levels.
const NG_MARKER: u16 = 0x474E;

/// Which of the per-generation tables a TR4-like walk reads.
struct Layout {
	models_padded: bool,
	marker_len: usize,
	tr5_object_textures: bool,
	demo_and_sounds: bool,
	ai_objects_first: bool,
	flyby_cameras: bool,
}

const TR4: Layout = Layout {
	models_padded: false,
	marker_len: 3,
	tr5_object_textures: false,
	demo_and_sounds: true,
	ai_objects_first: false,
	flyby_cameras: true,
};

const TR4_REMASTERED: Layout = Layout { demo_and_sounds: false, ..TR4 };

const TR5: Layout = Layout { models_padded: true, marker_len: 4, tr5_object_textures: true, ..TR4 };

const TR5_REMASTERED: Layout = Layout { demo_and_sounds: false, ai_objects_first: true, ..TR4 };

/// Everything after the rooms.
fn tables(ctx: &mut Context, reader: &mut Reader, layout: &Layout) -> Result<()> {
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, MeshFormat::PcEffects)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr4_5(reader)?;
	ctx.animation_tables(reader)?;
	if layout.models_padded {
		ctx.models::<PaddedModel>(reader)?;
	} else {
		ctx.models::<Model>(reader)?;
	}
	ctx.static_meshes(reader)?;
	ctx.marker(reader, "SPR", layout.marker_len)?;
	ctx.sprites(reader)?;
	ctx.cameras(reader)?;
	if layout.flyby_cameras {
		ctx.flyby_cameras(reader)?;
	}
	ctx.sound_sources(reader)?;
	ctx.boxes(reader, 8, 10)?;
	ctx.animated_textures(reader)?;
	ctx.animated_texture_uv_count(reader)?;
	ctx.marker(reader, "TEX", layout.marker_len)?;
	if layout.tr5_object_textures {
		ctx.object_textures::<Tr5ObjectTexture>(reader)?;
	} else {
		ctx.object_textures::<Tr4ObjectTexture>(reader)?;
	}
	if layout.ai_objects_first {
		ctx.ai_objects(reader)?;
		ctx.entities::<Entity>(reader)?;
	} else {
		ctx.entities::<Entity>(reader)?;
		ctx.ai_objects(reader)?;
	}
	if layout.demo_and_sounds {
		ctx.demo_data(reader)?;
		ctx.sound_tables(reader)?;
	}
	Ok(())
}

/// NGLE levels replace the embedded samples with (start, size) pairs into `MAIN.SFX`, followed by `NG`.
fn is_ngle(reader: &Reader) -> bool {
	let mut ahead = reader.clone();
	let Ok(count) = ahead.read::<u32>() else {
		return false;
	};
	ahead.skip_n(count as usize, 8).is_ok() && ahead.read::<u16>().ok() == Some(NG_MARKER)
}

fn ngle_samples(ctx: &mut Context, reader: &mut Reader) -> Result<Samples> {
	ctx.progress("Reading NGLE sound samples");
	let count = reader.read::<u32>()? as usize;
	debug!("[{}] Reading {} sound samples", reader.position(), count);
	let ranges = crate::read_vec::<crate::LE, [u32; 2]>(reader, count)?;
	let sfx = ctx.companion(files::main_sfx_path)?;
	let mut sfx = Reader::new(&sfx);
	let samples = ranges
		.iter()
		.map(|&[start, size]| {
			sfx.seek(start as usize);
			Ok(sfx.take(size as usize)?.to_vec())
		})
		.collect::<Result<Vec<_>>>()?;
	Ok(in_order(samples))
}

/// Count, then per sample its uncompressed size, stored size and stored bytes.
pub(super) fn embedded_samples(ctx: &mut Context, reader: &mut Reader) -> Result<Samples> {
	ctx.progress("Reading sound samples");
	let count = reader.read::<u32>()?;
	debug!("[{}] Reading {} sound samples", reader.position(), count);
	let mut samples = vec![];
	for _ in 0..count {
		let _uncompressed = reader.read::<u32>()?;
		let size = reader.read::<u32>()? as usize;
		samples.push(reader.take(size)?.to_vec());
	}
	Ok(in_order(samples))
}

fn skip_samples(reader: &mut Reader, ngle: bool) -> Result<()> {
	let count = reader.read::<u32>()? as usize;
	if ngle {
		return reader.skip_n(count, 8);
	}
	for _ in 0..count {
		reader.skip(4)?;
		let size = reader.read::<u32>()? as usize;
		reader.skip(size)?;
	}
	Ok(())
}

/// Sample table after the level data, embedded or NGLE.
fn sound_samples(ctx: &mut Context, reader: &mut Reader) {
	let start = reader.position();
	let ngle = is_ngle(reader);
	ctx.level.trng |= ngle;
	ctx.sounds(reader, |ctx, reader| if ngle { ngle_samples(ctx, reader) } else { embedded_samples(ctx, reader) });
	if !ctx.options.sounds && skip_samples(reader, ngle).is_err() {
		reader.seek(start);
	}
}

fn check_trng(ctx: &mut Context, reader: &mut Reader) {
	if reader.peek::<u16>().ok() == Some(NG_MARKER) {
		ctx.level.trng = true;
	}
	if ctx.level.trng {
		info!("TRNG level detected");
	}
}

pub fn decode_tr4(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.skip(4)?;
	ctx.textiles_tr4_5(reader)?;
	ctx.progress("Decompressing level data");
	let data = reader.read_compressed()?;
	ctx.progress("Processing level data");
	let mut level_data = Reader::new(&data);
	let level_reader = &mut level_data;
	// unused
	level_reader.skip(4)?;
	if level_reader.is_at_end() {
		debug!("No level data after the textiles");
		return Ok(());
	}
	ctx.rooms::<u16>(level_reader, rooms::tr4)?;
	tables(ctx, level_reader, &TR4)?;
	sound_samples(ctx, reader);
	check_trng(ctx, reader);
	Ok(())
}

pub fn decode_tr4_remastered(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.skip(4)?;
	ctx.remastered_textiles(reader, 2)?;
	ctx.progress("Processing level data");
	ctx.rooms::<u16>(reader, rooms::tr4)?;
	tables(ctx, reader, &TR4_REMASTERED)?;
	ctx.sounds(reader, |ctx, _| ctx.main_sfx_samples());
	Ok(())
}

pub fn decode_tr5(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.skip(4)?;
	ctx.textiles_tr4_5(reader)?;
	ctx.level.lara_type = reader.read()?;
	ctx.level.weather_type = reader.read()?;
	debug!("[{}] Lara type {}, weather type {}", reader.position(), ctx.level.lara_type, ctx.level.weather_type);
	reader.skip(28)?;
	let uncompressed = reader.read::<u32>()? as usize;
	// stored size, the level data is not compressed
	reader.skip(4)?;
	ctx.progress("Processing level data");
	let at = reader.position();
	// unused
	reader.skip(4)?;
	if reader.is_at_end() {
		debug!("No level data after the textiles");
		return Ok(());
	}
	ctx.rooms::<u32>(reader, rooms::tr5)?;
	tables(ctx, reader, &TR5)?;
	reader.seek(at.saturating_add(uncompressed));
	sound_samples(ctx, reader);
	Ok(())
}

pub fn decode_tr5_remastered(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.skip(4)?;
	ctx.remastered_textiles(reader, 3)?;
	ctx.level.lara_type = reader.read()?;
	ctx.progress("Processing level data");
	ctx.rooms::<u16>(reader, rooms::tr5_remastered)?;
	tables(ctx, reader, &TR5_REMASTERED)?;
	ctx.sounds(reader, |ctx, _| ctx.main_sfx_samples());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ngle_tables_end_in_the_marker() {
		let mut data = 2u32.to_le_bytes().to_vec();
		data.extend_from_slice(&[0; 16]);
		data.extend_from_slice(&NG_MARKER.to_le_bytes());
		let reader = Reader::new(&data);
		assert!(is_ngle(&reader));
		assert_eq!(reader.position(), 0);
		assert!(!is_ngle(&Reader::new(&data[..data.len() - 1])));
	}

	#[test]
	fn embedded_sample_table_is_walked() {
		let mut data = 2u32.to_le_bytes().to_vec();
		for size in [3u32, 1] {
			data.extend_from_slice(&100u32.to_le_bytes());
			data.extend_from_slice(&size.to_le_bytes());
			data.extend(std::iter::repeat(7).take(size as usize));
		}
		data.extend_from_slice(&NG_MARKER.to_le_bytes());
		let mut reader = Reader::new(&data);
		skip_samples(&mut reader, false).unwrap();
		assert_eq!(reader.read::<u16>().unwrap(), NG_MARKER);
	}
}
