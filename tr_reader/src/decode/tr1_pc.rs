use log::warn;
use crate::{
	mesh::MeshFormat,
	model::{tr1, Model, ObjectTexture},
	sound::slice_at_offsets,
	Reader, Result,
};
use super::{in_order, rooms, Context};

/// Where the 8-bit palette sits after the sprite sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PaletteAt {
	/// After the light map
	Retail,
	/// Before the cameras, as in the earliest demos
	Demo,
}

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.skip(4)?;
	let textiles = ctx.textiles8(reader)?;
	// unused
	reader.skip(4)?;
	ctx.rooms::<u16>(reader, rooms::tr1)?;
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, MeshFormat::Pc)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr1_3(reader)?;
	ctx.animation_tables(reader)?;
	ctx.models::<Model>(reader)?;
	ctx.static_meshes(reader)?;
	ctx.object_textures::<ObjectTexture>(reader)?;
	ctx.sprites(reader)?;

	let checkpoint = reader.position();
	let sound_data = match tail(ctx, reader, PaletteAt::Retail) {
		Ok(sound_data) => sound_data,
		Err(first) => {
			warn!("{}, retrying with the demo layout", first);
			ctx.progress("Attempting to load as TR1 demo");
			reader.seek(checkpoint);
			tail(ctx, reader, PaletteAt::Demo).map_err(|second| {
				warn!("Demo layout failed too: {}", second);
				first
			})?
		},
	};

	ctx.emit_textiles8(&textiles);
	ctx.sounds(reader, |ctx, _| {
		let samples = slice_at_offsets(&sound_data, &ctx.level.sample_indices);
		Ok(in_order(samples.into_iter().map(<[u8]>::to_vec).collect()))
	});
	Ok(())
}

/// Everything from the cameras on. Returns the embedded sound data.
fn tail(ctx: &mut Context, reader: &mut Reader, palette_at: PaletteAt) -> Result<Vec<u8>> {
	if palette_at == PaletteAt::Demo {
		ctx.palette(reader)?;
	}
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	ctx.boxes(reader, tr1::BOX_SIZE, tr1::ZONES_PER_BOX)?;
	ctx.animated_textures(reader)?;
	ctx.entities::<tr1::Entity>(reader)?;
	ctx.light_map(reader)?;
	if palette_at == PaletteAt::Retail {
		ctx.palette(reader)?;
	}
	ctx.cinematic_frames(reader)?;
	ctx.demo_data(reader)?;
	ctx.sound_map_until_details(reader)?;
	ctx.sound_details(reader)?;
	let sound_data = ctx.list::<u32, u8, u8>(reader, "sound data")?;
	ctx.sample_indices(reader)?;
	Ok(sound_data)
}
