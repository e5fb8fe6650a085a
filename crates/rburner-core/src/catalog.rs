//! GAL/PLD device catalog
//!
//! Static descriptions of every part the programmer firmware knows about:
//! fuse and pin counts, row geometry, and the row addresses used for the
//! UES/PES regions, erase operations and configuration bits.

/// PES ID byte marking parts that are programmed over JTAG instead of the
/// row-based GAL algorithm.
pub const JTAG_ID: u8 = 0xFF;

/// Supported device types.
///
/// The discriminants match the type codes the firmware expects in the `g`
/// and `#t` commands (`'0' + discriminant`), so they must stay in catalog
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GalType {
    Gal16V8 = 1,
    Gal18V10,
    Gal20V8,
    Gal20Ra10,
    Gal20Xv10,
    Gal22V10,
    Gal26Cv12,
    Gal26V12,
    Gal6001,
    Gal6002,
    Atf16V8B,
    Atf20V8B,
    Atf22V10B,
    Atf22V10C,
    Atf750C,
    // JTAG based PLDs at the end: they have no type code in the firmware
    Atf1502As,
    Atf1504As,
}

/// Catalog row for one device type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GalInfo {
    /// Device type this row describes
    pub gal: GalType,
    /// PES ID bytes (variant 1 / variant 2, e.g. 16V8=0x00, 16V8A+=0x1A)
    pub id0: u8,
    pub id1: u8,
    /// Canonical chip name
    pub name: &'static str,
    /// Total number of fuses
    pub fuses: u32,
    /// Number of pins on the chip
    pub pins: u32,
    /// Number of fuse rows
    pub rows: u32,
    /// Number of fuses per row
    pub bits: u32,
    /// UES row number
    pub ues_row: u32,
    /// First UES fuse number
    pub ues_fuse: u32,
    /// Number of UES bytes
    pub ues_bytes: u32,
    /// Row address for erase
    pub erase_row: u32,
    /// Row address for erase-all
    pub erase_all_row: u32,
    /// Row address for PES read/write
    pub pes_row: u32,
    /// Number of PES bytes
    pub pes_bytes: u32,
    /// Row address of the config bits
    pub cfg_row: u32,
    /// Number of config bits
    pub cfg_bits: u32,
}

impl GalInfo {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        gal: GalType,
        id0: u8,
        id1: u8,
        name: &'static str,
        fuses: u32,
        pins: u32,
        rows: u32,
        bits: u32,
        ues_row: u32,
        ues_fuse: u32,
        ues_bytes: u32,
        erase_row: u32,
        erase_all_row: u32,
        pes_row: u32,
        pes_bytes: u32,
        cfg_row: u32,
        cfg_bits: u32,
    ) -> Self {
        Self {
            gal,
            id0,
            id1,
            name,
            fuses,
            pins,
            rows,
            bits,
            ues_row,
            ues_fuse,
            ues_bytes,
            erase_row,
            erase_all_row,
            pes_row,
            pes_bytes,
            cfg_row,
            cfg_bits,
        }
    }

    /// Whether this part is programmed over JTAG (XSVF playback)
    pub fn is_jtag(&self) -> bool {
        self.id0 == JTAG_ID && self.id1 == JTAG_ID
    }
}

/// The device catalog, in firmware type-code order.
#[rustfmt::skip]
pub static GALINFO: &[GalInfo] = &[
    //                                                               name         fuses  pins rows bits |--- UES ----| |-erase-| |-PES-| |-CFG-|
    GalInfo::new(GalType::Gal16V8,   0x00,    0x1A,    "GAL16V8",    2194,  20,  32,  64,  32,  2056, 8,  63,  54,  58,  8,  60,  82),
    GalInfo::new(GalType::Gal18V10,  0x50,    0x51,    "GAL18V10",   3540,  20,  36,  96,  36,  3476, 8,  61,  60,  58, 10,  16,  20),
    GalInfo::new(GalType::Gal20V8,   0x20,    0x3A,    "GAL20V8",    2706,  24,  40,  64,  40,  2568, 8,  63,  59,  58,  8,  60,  82),
    GalInfo::new(GalType::Gal20Ra10, 0x60,    0x61,    "GAL20RA10",  3274,  24,  40,  80,  40,  3210, 8,  61,  60,  58, 10,  16,  10),
    GalInfo::new(GalType::Gal20Xv10, 0x65,    0x66,    "GAL20XV10",  1671,  24,  40,  40,  44,  1631, 5,  61,  60,  58,  5,  16,  31),
    GalInfo::new(GalType::Gal22V10,  0x48,    0x49,    "GAL22V10",   5892,  24,  44, 132,  44,  5828, 8,  61,  60,  58, 10,  16,  20),
    GalInfo::new(GalType::Gal26Cv12, 0x58,    0x59,    "GAL26CV12",  6432,  28,  52, 122,  52,  6368, 8,  61,  60,  58, 12,  16,  24),
    GalInfo::new(GalType::Gal26V12,  0x5D,    0x5D,    "GAL26V12",   7912,  28,  52, 150,  52,  7848, 8,  61,  60,  58, 12,  16,  48),
    GalInfo::new(GalType::Gal6001,   0x40,    0x41,    "GAL6001",    8294,  24,  78,  75,  97,  8222, 9,  63,  62,  96,  8,   8,  68),
    GalInfo::new(GalType::Gal6002,   0x44,    0x44,    "GAL6002",    8330,  24,  78,  75,  97,  8258, 9,  63,  62,  96,  8,   8, 104),
    GalInfo::new(GalType::Atf16V8B,  0x00,    0x00,    "ATF16V8B",   2194,  20,  32,  64,  32,  2056, 8,  63,  54,  58,  8,  60,  82),
    GalInfo::new(GalType::Atf20V8B,  0x00,    0x00,    "ATF20V8B",   2706,  24,  40,  64,  40,  2568, 8,  63,  59,  58,  8,  60,  82),
    GalInfo::new(GalType::Atf22V10B, 0x00,    0x00,    "ATF22V10B",  5892,  24,  44, 132,  44,  5828, 8,  61,  60,  58, 10,  16,  20),
    GalInfo::new(GalType::Atf22V10C, 0x00,    0x00,    "ATF22V10C",  5892,  24,  44, 132,  44,  5828, 8,  61,  60,  58, 10,  16,  20),
    GalInfo::new(GalType::Atf750C,   0x00,    0x00,    "ATF750C",   14499,  24,  84, 171,  84, 14435, 8,  61,  60, 127, 10,  16,  71),
    GalInfo::new(GalType::Atf1502As, JTAG_ID, JTAG_ID, "ATF1502AS",     0,   0,   0,   0,   0,     0, 0,   0,   0,   0,  8,   0,   0),
    GalInfo::new(GalType::Atf1504As, JTAG_ID, JTAG_ID, "ATF1504AS",     0,   0,   0,   0,   0,     0, 0,   0,   0,   0,  8,   0,   0),
];

impl GalType {
    /// Look up a device type by its catalog name, case-insensitively.
    pub fn from_name(name: &str) -> Option<GalType> {
        GALINFO
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .map(|info| info.gal)
    }

    /// The catalog row for this device type.
    pub fn info(self) -> &'static GalInfo {
        // The table is indexed by discriminant - 1 by construction.
        &GALINFO[self as usize - 1]
    }

    /// The ASCII type code used on the wire (`g` and `#t` commands).
    pub fn code(self) -> char {
        (b'0' + self as u8) as char
    }

    /// Whether this part is programmed over JTAG (XSVF playback)
    pub fn is_jtag(self) -> bool {
        self.info().is_jtag()
    }

    /// All catalog names, for help text and error messages.
    pub fn names() -> impl Iterator<Item = &'static str> {
        GALINFO.iter().map(|info| info.name)
    }
}

/// Infer a device type from the fuse and pin counts declared in a fuse map.
///
/// A row matches when its fuse count equals `last_fuse` (or its UES region
/// is the tail of the fuse map and starts at `last_fuse`), and its pin
/// count equals `pins`. A zero count matches anything; a 24-pin row also
/// accepts a declared 28-pin count (package variant). When the caller has
/// already selected a type, a row with an exact fuse-count match is
/// preferred over the first match in table order.
pub fn infer_type(last_fuse: u32, pins: u32, selected: Option<GalType>) -> Option<GalType> {
    let mut first = None;
    for info in GALINFO {
        let fuses_match = last_fuse == 0
            || info.fuses == last_fuse
            || (info.ues_fuse == last_fuse && info.ues_fuse + 8 * info.ues_bytes == info.fuses);
        let pins_match = pins == 0 || info.pins == pins || (info.pins == 24 && pins == 28);
        if fuses_match && pins_match {
            if selected.is_none() {
                return Some(info.gal);
            }
            if info.fuses == last_fuse {
                return Some(info.gal);
            }
            if first.is_none() {
                first = Some(info.gal);
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        assert_eq!(GalType::from_name("GAL16V8"), Some(GalType::Gal16V8));
        assert_eq!(GalType::from_name("atf22v10c"), Some(GalType::Atf22V10C));
        assert_eq!(GalType::from_name("PAL16L8"), None);
    }

    #[test]
    fn type_codes_follow_catalog_order() {
        assert_eq!(GalType::Gal16V8.code(), '1');
        assert_eq!(GalType::Atf16V8B.code(), (b'0' + 11) as char);
        for info in GALINFO {
            assert_eq!(info.gal.info().name, info.name);
        }
    }

    #[test]
    fn jtag_parts_are_flagged() {
        assert!(GalType::Atf1502As.is_jtag());
        assert!(GalType::Atf1504As.is_jtag());
        assert!(!GalType::Gal16V8.is_jtag());
    }

    #[test]
    fn infer_exact_fuse_and_pin_count() {
        assert_eq!(infer_type(3540, 20, None), Some(GalType::Gal18V10));
        assert_eq!(infer_type(5892, 24, None), Some(GalType::Gal22V10));
    }

    #[test]
    fn infer_ambiguous_counts_take_first_row() {
        // No counts at all: first catalog row wins.
        assert_eq!(infer_type(0, 0, None), Some(GalType::Gal16V8));
        // 2194/20 matches both GAL16V8 and ATF16V8B; table order decides.
        assert_eq!(infer_type(2194, 20, None), Some(GalType::Gal16V8));
    }

    #[test]
    fn infer_accepts_ues_boundary_and_28_pin_variant() {
        // A file that stops at the UES region start still identifies the part.
        assert_eq!(infer_type(2056, 20, None), Some(GalType::Gal16V8));
        // 28-pin declared count matches a 24-pin catalog row.
        assert_eq!(infer_type(5892, 28, None), Some(GalType::Gal22V10));
    }

    #[test]
    fn infer_with_selection_prefers_exact_fuse_count() {
        // 2056 is the UES boundary of GAL16V8 but not an exact fuse count;
        // with a selected type the scan still reports the first match.
        assert_eq!(
            infer_type(2056, 20, Some(GalType::Atf16V8B)),
            Some(GalType::Gal16V8)
        );
        assert_eq!(
            infer_type(5892, 24, Some(GalType::Atf22V10C)),
            Some(GalType::Gal22V10)
        );
    }
}
