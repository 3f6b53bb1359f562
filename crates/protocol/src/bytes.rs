use num_complex::Complex32;

/// Reinterpret a little-endian byte buffer as int16 words.
/// A trailing odd byte is ignored.
pub fn le_words(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Pair consecutive words as (real, imag) complex samples.
pub fn words_to_complex(words: &[i16]) -> Vec<Complex32> {
    words
        .chunks_exact(2)
        .map(|p| Complex32::new(p[0] as f32, p[1] as f32))
        .collect()
}

/// Serialize one complex sample to the replay wire layout:
/// big-endian int16 real followed by big-endian int16 imag.
pub fn complex_to_wire(c: Complex32) -> [u8; 4] {
    let re = saturate_i16(c.re).to_be_bytes();
    let im = saturate_i16(c.im).to_be_bytes();
    [re[0], re[1], im[0], im[1]]
}

fn saturate_i16(v: f32) -> i16 {
    v.clamp(-32768.0, 32767.0) as i16
}
