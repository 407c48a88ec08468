//! Cosimulation wire format: packing/unpacking typed values into the
//! little-endian `u32`-word stream the HDL testbench shim exchanges with
//! the host process.
//!
//! Each value is serialized as a bitwidth-prefixed sequence of 32-bit
//! words: one `u32` giving the value's bit width, followed by
//! `ceil(width / 32)` little-endian `u32` words holding the bits
//! (unused high bits of the final word are zero). This lines up with the
//! wire layout `pygears/sim/extens/vcd.py` and the cosim socket shim both
//! read and write directly.

use crate::error::CoreError;

/// Packs `value`'s low `width` bits into the wire format.
///
/// `width` must be within `[1, 64]` for the value to losslessly roundtrip
/// through a `u64` -- wider types are chunked by the caller one
/// `u64`-sized limb at a time.
pub fn encode(value: u64, width: u32) -> Vec<u32> {
    let masked = if width >= 64 { value } else { value & ((1u64 << width) - 1) };
    let word_count = width.div_ceil(32).max(1) as usize;
    let mut out = Vec::with_capacity(word_count + 1);
    out.push(width);
    for i in 0..word_count {
        out.push(((masked >> (32 * i as u32)) & 0xffff_ffff) as u32);
    }
    out
}

/// Decodes one bitwidth-prefixed value from the front of `words`,
/// returning the value and the remaining unconsumed words.
pub fn decode(words: &[u32]) -> Result<(u64, u32, &[u32]), CoreError> {
    let (&width, rest) = words
        .split_first()
        .ok_or_else(|| CoreError::TypeMatch { reason: "empty wire buffer".into() })?;
    if width == 0 || width > 64 {
        return Err(CoreError::TypeMatch {
            reason: format!("unsupported wire width {width}"),
        });
    }
    let word_count = width.div_ceil(32).max(1) as usize;
    if rest.len() < word_count {
        return Err(CoreError::TypeMatch {
            reason: "truncated wire buffer".into(),
        });
    }
    let mut value: u64 = 0;
    for (i, w) in rest[..word_count].iter().enumerate() {
        value |= (*w as u64) << (32 * i as u32);
    }
    if width < 64 {
        value &= (1u64 << width) - 1;
    }
    Ok((value, width, &rest[word_count..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_value() {
        let wire = encode(5, 4);
        let (value, width, rest) = decode(&wire).unwrap();
        assert_eq!(value, 5);
        assert_eq!(width, 4);
        assert!(rest.is_empty());
    }

    #[test]
    fn roundtrip_wide_value_spans_multiple_words() {
        let wire = encode(0xdead_beef_cafe, 48);
        assert_eq!(wire.len(), 1 + 48u32.div_ceil(32) as usize);
        let (value, width, _) = decode(&wire).unwrap();
        assert_eq!(value, 0xdead_beef_cafe);
        assert_eq!(width, 48);
    }

    #[test]
    fn encode_masks_out_of_range_bits() {
        let wire = encode(0xff, 4);
        let (value, _, _) = decode(&wire).unwrap();
        assert_eq!(value, 0xf);
    }

    #[test]
    fn decode_leaves_trailing_words_for_next_value() {
        let mut buf = encode(3, 4);
        buf.extend(encode(7, 4));
        let (first, _, rest) = decode(&buf).unwrap();
        assert_eq!(first, 3);
        let (second, _, rest2) = decode(rest).unwrap();
        assert_eq!(second, 7);
        assert!(rest2.is_empty());
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        assert!(decode(&[40]).is_err());
    }

    #[test]
    fn decode_rejects_empty_buffer() {
        assert!(decode(&[]).is_err());
    }
}
