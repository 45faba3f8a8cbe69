//! Static brick layout templates
//!
//! One character per grid cell:
//! - `.` empty
//! - `n` normal, `p` normal carrying a power-up
//! - `c` cracked (multi-hit)
//! - `e` explosive
//! - `m` metal, `x` gold (both indestructible)

use super::entities::BrickClass;

pub const GRID_COLUMNS: usize = 10;

/// A cell decoded from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpec {
    pub class: BrickClass,
    pub indestructible: bool,
    pub has_powerup: bool,
}

/// Decode one template character
pub fn decode_cell(c: char) -> Option<CellSpec> {
    let (class, indestructible, has_powerup) = match c {
        'n' => (BrickClass::Normal, false, false),
        'p' => (BrickClass::Normal, false, true),
        'c' => (BrickClass::Cracked, false, false),
        'e' => (BrickClass::Explosive, false, false),
        'm' => (BrickClass::Metal, true, false),
        'x' => (BrickClass::Normal, true, false),
        _ => return None,
    };
    Some(CellSpec {
        class,
        indestructible,
        has_powerup,
    })
}

pub const LAYOUTS: &[&[&str]] = &[
    &[
        "nnnnnnnnnn",
        "nnnnnnnnnn",
        "nnnpnnpnnn",
        "nnnnnnnnnn",
    ],
    &[
        "cccccccccc",
        "nnnennenn.",
        ".nnpnnpnn.",
        "..nnnnnn..",
        "...nnnn...",
    ],
    &[
        "m.nnnnnn.m",
        "nncnnnncnn",
        "nnnnennnnn",
        "npnnnnnnpn",
        "m.nnnnnn.m",
    ],
    &[
        "nnnnnnnnnn",
        "cxccccccxc",
        "nnnnnnnnnn",
        "neeneenee.",
        "pnnnnnnnnp",
    ],
    &[
        "..nnnnnn..",
        ".nccnnccn.",
        "nnnnpnnnnn",
        "nnennnnenn",
        ".nnnnnnnn.",
        "..mmmmmm..",
    ],
    &[
        "cccccccccc",
        "c.n.n.n.nc",
        "cnpnenpn.c",
        "c.n.n.n.nc",
        "cccccccccc",
    ],
    &[
        "xnnnnnnnnx",
        "nnmnnnnmnn",
        "nneccccenn",
        "nnmnnnnmnn",
        "xnnnpnnnnx",
        "nnnnnnnnnn",
    ],
    &[
        "eccccccce.",
        "cnnnnnnnnc",
        "cnpnnnnpnc",
        "cnnnmmnnnc",
        "cnnnnnnnnc",
        "eccccccce.",
    ],
];

/// Cover for boss arenas. Holds no destructible bricks; the level ends when
/// the last boss instance falls.
pub const BOSS_LAYOUT: &[&str] = &["", "", "", "", "", "", ".m......m.", ""];

/// Row colors; each level picks a palette so consecutive levels differ
pub const PALETTES: &[&[u32]] = &[
    &[0xe74c3c, 0xe67e22, 0xf1c40f, 0x2ecc71, 0x3498db, 0x9b59b6],
    &[0x1abc9c, 0x16a085, 0x27ae60, 0x2980b9, 0x8e44ad, 0x2c3e50],
    &[0xff6b81, 0xff9f43, 0xfeca57, 0x48dbfb, 0x1dd1a1, 0x5f27cd],
];

pub const METAL_COLOR: u32 = 0x95a5a6;
pub const GOLD_COLOR: u32 = 0xd4ac0d;

/// Template for a regular level (1-based), wrapping around once the list runs out
pub fn layout_for_level(level: u32) -> &'static [&'static str] {
    let index = (level.max(1) - 1) as usize % LAYOUTS.len();
    LAYOUTS[index]
}

/// Row color for a level/row pair
pub fn row_color(level: u32, row: usize) -> u32 {
    let palette = PALETTES[(level.max(1) - 1) as usize % PALETTES.len()];
    palette[row % palette.len()]
}
