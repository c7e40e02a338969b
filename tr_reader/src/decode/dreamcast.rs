//! TR5 Dreamcast. The PC layout cut into 2048-byte pages, with uncompressed 16-bit textiles up front.

use log::debug;
use crate::{
	mesh::MeshFormat,
	model::{tr2, tr4::Tr5ObjectTexture, tr5, Entity, PaddedModel, Room, Vertex},
	texture::argb1555_to_rgba,
	Readable, Reader, Result,
};
use super::{rooms, textiles::{textile16, TEXTILE16_SIZE}, tr4_5_pc::embedded_samples, Context};

const PAGE: usize = 2048;
/// JOBY1 stores each textile with its own size.
const JOBY1_TEXTILE_SIZE: u32 = 3011032;

/// Sections always end on the next page boundary, a full page on when they fill theirs exactly.
fn paged<F>(ctx: &mut Context, reader: &mut Reader, section: F) -> Result<()>
where
	F: FnOnce(&mut Context, &mut Reader) -> Result<()>,
{
	let start = reader.position();
	section(ctx, reader)?;
	let used = reader.position().saturating_sub(start);
	reader.seek(start + (used / PAGE + 1) * PAGE);
	Ok(())
}

#[derive(Readable)]
struct RoomVertex {
	vertex: tr5::RoomVertex,
	_separator: u32,
}

impl From<RoomVertex> for Vertex {
	fn from(RoomVertex { vertex, .. }: RoomVertex) -> Self {
		vertex.into()
	}
}

fn room(reader: &mut Reader) -> Result<Room> {
	rooms::xela::<RoomVertex>(reader, 16)
}

fn textile_counts(reader: &mut Reader) -> Result<usize> {
	let [room, object, bump] = reader.read::<[u32; 3]>()?;
	debug!("[{}] Textile counts - Room:{}, Object:{}, Bump:{}", reader.position(), room, object, bump);
	Ok(room as usize + object as usize + bump as usize)
}

fn textiles(ctx: &mut Context, reader: &mut Reader, textile_size: u32) -> Result<()> {
	let textiles_end = textile_size as usize + PAGE;
	if textile_size == JOBY1_TEXTILE_SIZE {
		return paged(ctx, reader, |ctx, reader| {
			let count = textile_counts(reader)?;
			ctx.progress(&format!("Reading {} 16-bit textiles", count));
			for _ in 0..count {
				// x
				reader.skip(4)?;
				let size = reader.read::<u32>()? as usize;
				let mut bytes = reader.take(size)?.to_vec();
				bytes.resize(TEXTILE16_SIZE, 0);
				ctx.emit_textile(&textile16(&bytes, argb1555_to_rgba));
			}
			reader.seek(textiles_end);
			Ok(())
		});
	}
	let mut count = 0;
	paged(ctx, reader, |_, reader| {
		count = textile_counts(reader)?;
		Ok(())
	})?;
	paged(ctx, reader, |ctx, reader| {
		ctx.progress(&format!("Reading {} 16-bit textiles", count));
		for _ in 0..count {
			let bytes = reader.take(TEXTILE16_SIZE)?;
			ctx.emit_textile(&textile16(bytes, argb1555_to_rgba));
		}
		reader.seek(textiles_end);
		Ok(())
	})
}

/// `TOSS`, then the same sample table as TR4 and TR5 PC.
fn sound_samples(ctx: &mut Context, reader: &mut Reader) {
	ctx.sounds(reader, |ctx, reader| {
		reader.skip(4)?;
		embedded_samples(ctx, reader)
	});
}

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let mut textile_size = 0;
	paged(ctx, reader, |_, reader| {
		textile_size = reader.read::<u32>()?;
		Ok(())
	})?;
	debug!("Textile data ends at {}", textile_size as usize + PAGE);
	textiles(ctx, reader, textile_size)?;
	paged(ctx, reader, |ctx, reader| {
		ctx.level.lara_type = reader.read()?;
		ctx.level.weather_type = reader.read()?;
		debug!("[{}] Lara type {}, weather type {}", reader.position(), ctx.level.lara_type, ctx.level.weather_type);
		reader.skip(28)
	})?;
	ctx.progress("Processing level data");
	paged(ctx, reader, |ctx, reader| {
		// unused
		reader.skip(4)?;
		ctx.rooms::<u32>(reader, room)?;
		ctx.floor_data(reader)
	})?;
	paged(ctx, reader, |ctx, reader| {
		ctx.mesh_data(reader, MeshFormat::PcEffects)?;
		ctx.mesh_pointers(reader)?;
		ctx.animations_tr4_5(reader)?;
		ctx.animation_tables(reader)?;
		ctx.models::<PaddedModel>(reader)?;
		ctx.static_meshes(reader)
	})?;
	paged(ctx, reader, |ctx, reader| {
		ctx.marker(reader, "SPR", 4)?;
		ctx.sprites(reader)
	})?;
	paged(ctx, reader, |ctx, reader| {
		ctx.cameras(reader)?;
		ctx.flyby_cameras(reader)
	})?;
	paged(ctx, reader, |ctx, reader| ctx.sound_sources(reader))?;
	paged(ctx, reader, |ctx, reader| ctx.boxes(reader, tr2::BOX_SIZE, tr2::ZONES_PER_BOX))?;
	paged(ctx, reader, |ctx, reader| {
		ctx.animated_textures(reader)?;
		ctx.animated_texture_uv_count(reader)
	})?;
	paged(ctx, reader, |ctx, reader| {
		ctx.marker(reader, "TEX", 4)?;
		ctx.object_textures::<Tr5ObjectTexture>(reader)
	})?;
	paged(ctx, reader, |ctx, reader| ctx.entities::<Entity>(reader))?;
	paged(ctx, reader, |ctx, reader| ctx.ai_objects(reader))?;
	paged(ctx, reader, |ctx, reader| ctx.demo_data(reader))?;
	paged(ctx, reader, |ctx, reader| ctx.sound_tables(reader))?;
	// SAMP and its size
	paged(ctx, reader, |_, reader| reader.skip(8))?;
	sound_samples(ctx, reader);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Level, LoadOptions, LE};

	#[test]
	fn pages_round_up_past_a_full_page() {
		let data = vec![0u8; PAGE * 4];
		let mut reader = Reader::new(&data);
		let options = LoadOptions::default();
		let mut callbacks = ();
		let mut ctx = Context::new(Level::default(), &options, &(), None, &mut callbacks);
		paged(&mut ctx, &mut reader, |_, reader| reader.skip(10)).unwrap();
		assert_eq!(reader.position(), PAGE);
		paged(&mut ctx, &mut reader, |_, reader| reader.skip(PAGE)).unwrap();
		assert_eq!(reader.position(), PAGE * 3);
	}

	#[test]
	fn room_vertices_carry_a_separator() {
		let data = vec![0u8; 64];
		let mut reader = Reader::new(&data);
		RoomVertex::read::<LE>(&mut reader).unwrap();
		let mut pc = Reader::new(&data);
		tr5::RoomVertex::read::<LE>(&mut pc).unwrap();
		assert_eq!(reader.position(), pc.position() + 4);
	}
}
