use log::debug;
use crate::{
	mesh::MeshFormat,
	model::{tr2, Entity, Model, ObjectTexture},
	texture::argb1555_to_rgba,
	Reader, Result,
};
use super::{rooms, Context};

pub fn decode(ctx: &mut Context, reader: &mut Reader) -> Result<()> {
	reader.skip(4)?;
	ctx.palettes_tr2_3(reader)?;
	ctx.textiles16(reader, argb1555_to_rgba)?;
	// unused
	reader.skip(4)?;
	if reader.is_at_end() {
		debug!("[{}] No level data after the textiles", reader.position());
		return Ok(());
	}
	ctx.rooms::<u16>(reader, rooms::tr3)?;
	ctx.floor_data(reader)?;
	ctx.mesh_data(reader, MeshFormat::Pc)?;
	ctx.mesh_pointers(reader)?;
	ctx.animations_tr1_3(reader)?;
	ctx.animation_tables(reader)?;
	ctx.models::<Model>(reader)?;
	ctx.static_meshes(reader)?;
	ctx.sprites(reader)?;
	ctx.cameras(reader)?;
	ctx.sound_sources(reader)?;
	ctx.boxes(reader, tr2::BOX_SIZE, tr2::ZONES_PER_BOX)?;
	ctx.animated_textures(reader)?;
	ctx.object_textures::<ObjectTexture>(reader)?;
	ctx.entities::<Entity>(reader)?;
	ctx.light_map(reader)?;
	ctx.cinematic_frames(reader)?;
	ctx.demo_data(reader)?;
	ctx.sound_tables(reader)?;
	ctx.sounds(reader, |ctx, _| ctx.main_sfx_samples());
	Ok(())
}
