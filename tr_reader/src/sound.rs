//! Sound sample extraction: raw PCM slicing, RIFF splitting and PSX ADPCM decoding.

use byteorder::{ByteOrder, LE};
use log::debug;
use crate::{Reader, Result};

/// Bytes per PSX ADPCM block
pub const ADPCM_BLOCK_SIZE: usize = 16;
pub const SAMPLES_PER_BLOCK: usize = 28;
const END_OF_SAMPLE: u8 = 7;

/// Predictor coefficients in 1/64ths.
const COEFFICIENTS: [(i32, i32); 5] = [(0, 0), (60, 0), (115, -52), (98, -55), (122, -60)];

/// Decodes PSX 4-bit ADPCM into 16-bit PCM. A block flagged 7 ends the sample.
pub fn decode_adpcm(data: &[u8]) -> Vec<i16> {
	let mut samples = Vec::with_capacity(data.len() / ADPCM_BLOCK_SIZE * SAMPLES_PER_BLOCK);
	let (mut s1, mut s2) = (0i32, 0i32);
	for block in data.chunks_exact(ADPCM_BLOCK_SIZE) {
		let shift = (block[0] & 0xf).min(12);
		let (f0, f1) = COEFFICIENTS.get((block[0] >> 4) as usize).copied().unwrap_or((0, 0));
		if block[1] == END_OF_SAMPLE {
			break;
		}
		for &byte in &block[2..] {
			for nibble in [byte & 0xf, byte >> 4] {
				let delta = (((nibble as u16) << 12) as i16 >> shift) as i32;
				let sample = (delta + ((s1 * f0 + s2 * f1 + 32) >> 6)).clamp(i16::MIN as i32, i16::MAX as i32);
				s2 = s1;
				s1 = sample;
				samples.push(sample as i16);
			}
		}
	}
	samples
}

pub const WAV_HEADER_SIZE: usize = 44;

/// Mono 16-bit PCM WAV file.
pub fn wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
	let data_len = samples.len() * 2;
	let mut out = vec![0u8; WAV_HEADER_SIZE + data_len];
	let (header, data) = out.split_at_mut(WAV_HEADER_SIZE);
	header[0..4].copy_from_slice(b"RIFF");
	LE::write_u32(&mut header[4..8], (36 + data_len) as u32);
	header[8..16].copy_from_slice(b"WAVEfmt ");
	LE::write_u32(&mut header[16..20], 16);
	// PCM, mono
	LE::write_u16(&mut header[20..22], 1);
	LE::write_u16(&mut header[22..24], 1);
	LE::write_u32(&mut header[24..28], sample_rate);
	LE::write_u32(&mut header[28..32], sample_rate * 2);
	LE::write_u16(&mut header[32..34], 2);
	LE::write_u16(&mut header[34..36], 16);
	header[36..40].copy_from_slice(b"data");
	LE::write_u32(&mut header[40..44], data_len as u32);
	LE::write_i16_into(samples, data);
	out
}

pub fn adpcm_to_wav(data: &[u8], sample_rate: u32) -> Vec<u8> {
	wav(&decode_adpcm(data), sample_rate)
}

/// Slices `data` at each offset; the last slice runs to the end. Bad offsets give empty slices.
pub fn slice_at_offsets<'a>(data: &'a [u8], offsets: &[u32]) -> Vec<&'a [u8]> {
	offsets
		.iter()
		.enumerate()
		.map(|(i, &start)| {
			let end = offsets.get(i + 1).map_or(data.len(), |&end| end as usize);
			data.get(start as usize..end).unwrap_or_default()
		})
		.collect()
}

/// Splits concatenated RIFF files such as MAIN.SFX. Stops at the first chunk that does not fit.
pub fn split_riff(data: &[u8]) -> Vec<&[u8]> {
	let mut samples = vec![];
	let mut reader = Reader::new(data);
	while reader.remaining() >= 8 {
		let start = reader.position();
		let Ok(magic) = reader.take_array::<4>() else { break };
		let Ok(size) = reader.read::<u32>() else { break };
		if &magic != b"RIFF" || reader.skip(size as usize).is_err() {
			break;
		}
		samples.push(&data[start..reader.position()]);
	}
	debug!("Split {} RIFF samples", samples.len());
	samples
}

/// PSX VAB sound bank, read from its program count onwards.
/// Each VAG sample is converted to WAV, in bank order.
pub fn read_vab(reader: &mut Reader, sample_rate: u32) -> Result<Vec<Vec<u8>>> {
	let num_programs = reader.read::<u16>()? as usize;
	let _num_tones = reader.read::<u16>()?;
	let num_vags = reader.read::<u16>()? as usize;
	// volume, pan, attributes, reserved
	reader.skip(8)?;
	reader.skip_n(128, 16)?;
	reader.skip_n(num_programs * 16, 32)?;
	let sizes = reader.read::<[u16; 256]>()?;
	let body_len = reader.read::<u32>()? as usize;
	let mut body = Reader::new(reader.take(body_len)?);
	debug!("Reading {} VAG samples from {} bytes", num_vags, body_len);
	sizes
		.iter()
		.skip(1)
		.take(num_vags)
		.map(|&size| Ok(adpcm_to_wav(body.take((size as usize) << 3)?, sample_rate)))
		.collect()
}

/// TR2 E3 samples are stored inline: two skipped words, then a RIFF size word heading the file.
pub fn read_e3_samples(reader: &mut Reader) -> Result<Vec<Vec<u8>>> {
	let count = reader.peek::<u32>()?;
	let mut samples = vec![];
	for _ in 0..count {
		reader.skip(8)?;
		let size = reader.peek::<u32>()? as usize;
		let start = reader.position() - 4;
		reader.seek(start);
		samples.push(reader.take(size + 4)?.to_vec());
	}
	Ok(samples)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn silent_block_decodes_to_silence() {
		let block = [0u8; ADPCM_BLOCK_SIZE];
		let samples = decode_adpcm(&block);
		assert_eq!(samples, vec![0; SAMPLES_PER_BLOCK]);
		let file = wav(&samples, 11025);
		assert_eq!(file.len(), 44 + 56);
		assert_eq!(&file[0..4], b"RIFF");
		assert_eq!(u32::from_le_bytes(file[40..44].try_into().unwrap()), 56);
		assert_eq!(u32::from_le_bytes(file[24..28].try_into().unwrap()), 11025);
	}

	#[test]
	fn wav_lengths_follow_the_samples() {
		let samples = [1i16, -2, 0x1234];
		let file = wav(&samples, 22050);
		assert_eq!(file.len(), WAV_HEADER_SIZE + 6);
		assert_eq!(u32::from_le_bytes(file[4..8].try_into().unwrap()), 36 + 6);
		assert_eq!(&file[8..16], b"WAVEfmt ");
		assert_eq!(u32::from_le_bytes(file[28..32].try_into().unwrap()), 44100);
		assert_eq!(&file[WAV_HEADER_SIZE..], &[1, 0, 0xfe, 0xff, 0x34, 0x12]);

		let mut block = [0u8; ADPCM_BLOCK_SIZE];
		block[0] = 12;
		block[2] = 0x01;
		let file = adpcm_to_wav(&block, 8000);
		assert_eq!(file.len(), WAV_HEADER_SIZE + SAMPLES_PER_BLOCK * 2);
		assert_eq!(&file[WAV_HEADER_SIZE..WAV_HEADER_SIZE + 2], &[1, 0]);
	}

	#[test]
	fn end_flag_stops_decoding() {
		let mut data = [0u8; ADPCM_BLOCK_SIZE * 2];
		data[ADPCM_BLOCK_SIZE + 1] = END_OF_SAMPLE;
		assert_eq!(decode_adpcm(&data).len(), SAMPLES_PER_BLOCK);
	}

	#[test]
	fn nibbles_are_signed_and_low_first() {
		let mut block = [0u8; ADPCM_BLOCK_SIZE];
		block[0] = 12;
		block[2] = 0xf1;
		let samples = decode_adpcm(&block);
		assert_eq!(&samples[..3], &[1, -1, 0]);
	}

	#[test]
	fn predictor_carries_between_samples() {
		let mut block = [0u8; ADPCM_BLOCK_SIZE];
		block[0] = 0x10 | 8;
		block[2] = 0x04;
		let samples = decode_adpcm(&block);
		// 4 << 4 = 64, then 64 * 60 / 64
		assert_eq!(&samples[..2], &[64, 60]);
	}

	#[test]
	fn pcm_slices_run_to_the_end() {
		let data = [1, 2, 3, 4, 5];
		let slices = slice_at_offsets(&data, &[0, 2, 9]);
		assert_eq!(slices[0], &[1, 2]);
		assert!(slices[1].is_empty() && slices[2].is_empty());
		let slices = slice_at_offsets(&data, &[0, 3]);
		assert_eq!(slices[1], &[4, 5]);
	}

	#[test]
	fn riff_chunks_are_split() {
		let mut data = vec![];
		for payload in [&b"WAVEabcd"[..], &b"WAVE"[..]] {
			data.extend_from_slice(b"RIFF");
			data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
			data.extend_from_slice(payload);
		}
		data.extend_from_slice(b"junk");
		let samples = split_riff(&data);
		assert_eq!(samples.len(), 2);
		assert_eq!(samples[0].len(), 16);
		assert_eq!(samples[1], b"RIFF\x04\0\0\0WAVE");
	}

	#[test]
	fn vab_samples_in_bank_order() {
		let mut data = vec![];
		data.extend_from_slice(&1u16.to_le_bytes());
		data.extend_from_slice(&1u16.to_le_bytes());
		data.extend_from_slice(&2u16.to_le_bytes());
		data.extend_from_slice(&[0; 8]);
		data.extend_from_slice(&[0; 128 * 16]);
		data.extend_from_slice(&[0; 16 * 32]);
		let mut sizes = [0u16; 256];
		sizes[1] = 2;
		sizes[2] = 4;
		for size in sizes {
			data.extend_from_slice(&size.to_le_bytes());
		}
		data.extend_from_slice(&48u32.to_le_bytes());
		data.extend_from_slice(&[0; 48]);
		let samples = read_vab(&mut Reader::new(&data), 8000).unwrap();
		assert_eq!(samples.len(), 2);
		assert_eq!(samples[0].len(), 44 + SAMPLES_PER_BLOCK * 2);
		assert_eq!(samples[1].len(), 44 + SAMPLES_PER_BLOCK * 4);
	}

	#[test]
	fn truncated_vab_body_is_an_error() {
		let mut data = vec![0u8; 6 + 8 + 128 * 16];
		data[4] = 1;
		data.extend_from_slice(&[0; 512]);
		data.extend_from_slice(&100u32.to_le_bytes());
		assert!(read_vab(&mut Reader::new(&data), 8000).unwrap_err().is_truncated());
	}
}
