// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! 16-bit signed little endian PCM encoding.

/// Full scale for 16-bit output. Negative full scale is -MAX_AMPLITUDE rather than
/// i16::MIN, so the output range is symmetric.
pub const MAX_AMPLITUDE: i16 = i16::MAX;

/// Clips a float sample to [-1.0, 1.0] and converts it into a 16-bit sample.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    if sample >= 1.0 {
        MAX_AMPLITUDE
    } else if sample <= -1.0 {
        -MAX_AMPLITUDE
    } else {
        // NaN converts to 0.
        (sample * f32::from(MAX_AMPLITUDE)) as i16
    }
}

/// Appends the samples to out as 16-bit little endian PCM.
pub fn encode(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&quantize(*sample).to_le_bytes());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_full_scale() {
        let mut out = Vec::new();
        encode(&[1.0, -1.0, 0.0], &mut out);
        assert_eq!(vec![0xff, 0x7f, 0x01, 0x80, 0x00, 0x00], out);
    }

    #[test]
    fn test_clipping() {
        let mut clipped = Vec::new();
        encode(&[1.5, -7.0, f32::INFINITY, f32::NEG_INFINITY], &mut clipped);
        let mut full_scale = Vec::new();
        encode(&[1.0, -1.0, 1.0, -1.0], &mut full_scale);
        assert_eq!(full_scale, clipped);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(16383, quantize(0.5));
        assert_eq!(-16383, quantize(-0.5));
        assert_eq!(0, quantize(f32::NAN));
        assert_eq!(-MAX_AMPLITUDE, quantize(-1.0));
        assert_ne!(i16::MIN, quantize(-2.0));
    }

    #[test]
    fn test_appends() {
        let mut out = vec![0xaa];
        encode(&[0.5], &mut out);
        assert_eq!(vec![0xaa, 0xff, 0x3f], out);

        let capacity = out.capacity();
        out.clear();
        encode(&[0.5], &mut out);
        assert_eq!(capacity, out.capacity());
    }
}
