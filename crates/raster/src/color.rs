use image::Rgba;

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(raw: &str) -> Option<Rgba<u8>> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(Rgba(out))
        }
        6 | 8 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            let a = if hex.len() == 8 {
                channel(&hex[6..8])?
            } else {
                255
            };
            Some(Rgba([r, g, b, a]))
        }
        _ => None,
    }
}

/// Index raster colour for a footprint ordinal. The RGB triple holds the low
/// 24 bits of the ordinal; alpha is always opaque.
pub fn encode_ordinal(ordinal: usize) -> Rgba<u8> {
    let v = (ordinal as u64 + 0x100_0000) & 0xFF_FFFF;
    Rgba([(v >> 16) as u8, (v >> 8) as u8, v as u8, 255])
}

/// Inverse of [`encode_ordinal`]. Anything not fully opaque is empty space.
pub fn decode_ordinal(px: Rgba<u8>) -> Option<usize> {
    let [r, g, b, a] = px.0;
    if a != 255 {
        return None;
    }
    Some(((r as usize) << 16) | ((g as usize) << 8) | b as usize)
}
