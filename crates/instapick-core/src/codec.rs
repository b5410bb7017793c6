//! Identifier ↔ pick color codec.
//!
//! Identifiers are written to the pick target as three base-255 digits:
//!
//! ```text
//! a  = fract(id * (1/255, 1/255², 1/255³))
//! a -= a.xxy * (0, 1/255, 1/255)
//! color = (a.r, a.g, a.b, 1)
//! ```
//!
//! After 8-bit unorm quantization each channel holds one digit in `0..255`,
//! lowest digit in red. Decoding weights the channels with the same base:
//! `id = b * 255² + g * 255 + r`. The weights are base 255, not 256, and both
//! sides must agree on that. Every identifier in `0..255³` round-trips.

/// Number base of one color channel.
const BASE: f64 = 255.0;

/// Encodes an identifier into the normalized RGBA color the ID materials emit.
///
/// This evaluates the shader formula on the CPU in double precision.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_id(id: u32) -> [f32; 4] {
    let id = f64::from(id);
    let weights = [1.0 / BASE, 1.0 / (BASE * BASE), 1.0 / (BASE * BASE * BASE)];
    let a = weights.map(|w| {
        let v = id * w;
        v - v.floor()
    });
    let r = a[0];
    let g = a[1] - a[0] / BASE;
    let b = a[2] - a[1] / BASE;
    [r as f32, g as f32, b as f32, 1.0]
}

/// Converts a normalized channel to the byte an `Rgba8Unorm` target stores.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Encodes an identifier into the `[r, g, b]` bytes read back from the target.
#[must_use]
pub fn id_to_color(id: u32) -> [u8; 3] {
    let [r, g, b, _] = encode_id(id);
    [quantize_unorm8(r), quantize_unorm8(g), quantize_unorm8(b)]
}

/// Decodes the identifier stored in an 8-bit RGB sample.
#[must_use]
pub fn color_to_id(r: u8, g: u8, b: u8) -> u32 {
    u32::from(b) * 255 * 255 + u32::from(g) * 255 + u32::from(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::MAX_PICK_ID;
    use proptest::prelude::*;

    #[test]
    fn test_specific_colors() {
        assert_eq!(id_to_color(0), [0, 0, 0]);
        assert_eq!(id_to_color(1), [1, 0, 0]);
        assert_eq!(id_to_color(42), [42, 0, 0]);
        assert_eq!(id_to_color(254), [254, 0, 0]);
        assert_eq!(id_to_color(255), [0, 1, 0]);
        assert_eq!(id_to_color(255 * 255), [0, 0, 1]);
        assert_eq!(id_to_color(MAX_PICK_ID), [254, 254, 254]);
    }

    #[test]
    fn test_alpha_is_opaque() {
        assert_eq!(encode_id(1234)[3], 1.0);
    }

    #[test]
    fn test_channels_match_base_255_digits() {
        for id in (0..=MAX_PICK_ID).step_by(9973) {
            let expected = [id % 255, (id / 255) % 255, id / (255 * 255)];
            let color = id_to_color(id);
            assert_eq!(color.map(u32::from), expected, "digits for {id}");
        }
    }

    #[test]
    fn test_multiples_of_base_do_not_carry_into_red() {
        // fract() of an exact multiple must land on 0, not just below 1.
        for k in 1..255 * 255 {
            let id = k * 255;
            assert_eq!(color_to_id_tuple(id_to_color(id)), id);
        }
    }

    fn color_to_id_tuple([r, g, b]: [u8; 3]) -> u32 {
        color_to_id(r, g, b)
    }

    #[test]
    fn test_upper_range_roundtrip() {
        for id in (MAX_PICK_ID - 70_000)..=MAX_PICK_ID {
            assert_eq!(color_to_id_tuple(id_to_color(id)), id);
        }
    }

    proptest! {
        #[test]
        fn prop_roundtrip(id in 0..=MAX_PICK_ID) {
            prop_assert_eq!(color_to_id_tuple(id_to_color(id)), id);
        }

        #[test]
        fn prop_channels_never_reach_255(id in 0..=MAX_PICK_ID) {
            prop_assert!(id_to_color(id).iter().all(|&c| c < 255));
        }
    }
}
