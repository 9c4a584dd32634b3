// src/ui/color.rs
pub type Rgb = [u8; 3];

/// Straight-alpha RGBA with channels in 0..=1.
pub type Rgba = [f32; 4];

pub const BLACK: Rgba = [0.0, 0.0, 0.0, 1.0];
pub const TRANSPARENT: Rgba = [0.0, 0.0, 0.0, 0.0];

/// Racing neon palette: cyan, orange, red, gold, white.
pub const DEFAULT_PALETTE: [Rgb; 5] = [
    [0, 212, 255],
    [255, 140, 0],
    [255, 51, 102],
    [255, 215, 0],
    [255, 255, 255],
];

#[inline(always)]
pub fn rgba(c: Rgb, alpha: f32) -> Rgba {
    [
        c[0] as f32 / 255.0,
        c[1] as f32 / 255.0,
        c[2] as f32 / 255.0,
        alpha.clamp(0.0, 1.0),
    ]
}

/// Same as the CSS `rgba(r, g, b, a)` with 8-bit channels.
#[inline(always)]
pub fn rgba8(r: u8, g: u8, b: u8, alpha: f32) -> Rgba {
    rgba([r, g, b], alpha)
}

/// Accepts "#rgb" or "#rrggbb" (or without '#').
pub fn rgb_hex(s: &str) -> Result<Rgb, String> {
    #[inline(always)]
    fn nib(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(10 + (b - b'a')),
            b'A'..=b'F' => Some(10 + (b - b'A')),
            _ => None,
        }
    }

    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed).as_bytes();
    let nibs: Option<Vec<u8>> = digits.iter().map(|&b| nib(b)).collect();
    let nibs = nibs.ok_or_else(|| format!("'{}' contains a non-hex digit", s))?;

    match nibs.len() {
        3 => Ok([nibs[0] * 17, nibs[1] * 17, nibs[2] * 17]),
        6 => Ok([
            (nibs[0] << 4) | nibs[1],
            (nibs[2] << 4) | nibs[3],
            (nibs[4] << 4) | nibs[5],
        ]),
        _ => Err(format!("'{}' must have 3 or 6 hex digits", s)),
    }
}

/// Parses a comma separated list of hex colours.
pub fn palette_from_list(s: &str) -> Result<Vec<Rgb>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(rgb_hex)
        .collect()
}

/// "rrggbb" without the leading '#', which INI files would read as a comment.
pub fn to_hex(c: Rgb) -> String {
    format!("{:02x}{:02x}{:02x}", c[0], c[1], c[2])
}
