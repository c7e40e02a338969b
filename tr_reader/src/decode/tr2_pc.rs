use crate::{
	mesh::MeshFormat,
	model::{tr2, Entity, Model, ObjectTexture},
	sound::read_e3_samples,
	texture::{argb1555_to_rgba, e3_555_to_rgba},
	version::TR2_PC_E3,
	Reader, Result,
};
use super::{in_order, rooms, Context};

/// The E3 build stores a 6-bit palette only, 20-byte boxes and its samples inline.
fn is_e3(ctx: &Context) -> bool {
	ctx.level.version.raw_version == TR2_PC_E3
}

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	let e3 = is_e3(ctx);
	reader.skip(4)?;
	if e3 {
		ctx.palette(reader)?;
		ctx.textiles16(reader, e3_555_to_rgba)?;
	} else {
		ctx.palettes_tr2_3(reader)?;
		ctx.textiles16(reader, argb1555_to_rgba)?;
	}
	// unused
	reader.skip(4)?;
	ctx.rooms::<u16>(reader, rooms::tr2)?;
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, MeshFormat::Pc)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr1_3(reader)?;
	ctx.animation_tables(reader)?;
	ctx.models::<Model>(reader)?;
	ctx.static_meshes(reader)?;
	ctx.object_textures::<ObjectTexture>(reader)?;
	ctx.sprites(reader)?;
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	if e3 {
		ctx.boxes(reader, 20, tr2::ZONES_PER_BOX)?;
	} else {
		ctx.boxes(reader, tr2::BOX_SIZE, tr2::ZONES_PER_BOX)?;
	}
	ctx.animated_textures(reader)?;
	ctx.entities::<Entity>(reader)?;
	ctx.light_map(reader)?;
	ctx.cinematic_frames(reader)?;
	ctx.demo_data(reader)?;
	if e3 {
		ctx.sound_map_until_details(reader)?;
		ctx.sound_details(reader)?;
		ctx.sounds(reader, |_, reader| Ok(in_order(read_e3_samples(reader)?)));
	} else {
		ctx.sound_tables(reader)?;
		ctx.sounds(reader, |ctx, _| ctx.main_sfx_samples());
	}
	Ok(())
}
