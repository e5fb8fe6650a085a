//! JEDEC fuse-map parser
//!
//! Parses the `*`-delimited fuse-map dialect produced by GAL assemblers:
//! `L<addr> <bits>` fuse lines, `F<0|1>` bulk fill, `G<0|1>` security,
//! `QF`/`QP` geometry and `C<hex>` checksum directives. Unknown directives
//! are skipped as comments. The parser is an explicit state machine; every
//! rejected character is reported with its byte offset.

use crate::bitmap::FuseBitmap;
use crate::catalog::{infer_type, GalType};
use crate::checksum::fuse_checksum;
use crate::error::{CoreError, Result};
use crate::MAX_FUSES;

/// Parser states. `*` re-enters `Command` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first `*`
    Outside,
    /// Skipping a comment or unknown directive
    Skip,
    /// Reading the directive letter after `*`
    Command,
    /// First digit of an `L` address
    Address1,
    /// Remaining digits of an `L` address
    AddressRest,
    /// The fill value of an `F` directive
    FuseInit,
    /// Bit stream of an `L` line
    ReadBits,
    /// `P` or `F` selector after `Q`
    QSelect,
    /// First digit of `QP`
    Qp1,
    /// Remaining digits of `QP`
    QpRest,
    /// First digit of `QF`
    Qf1,
    /// Remaining digits of `QF`
    QfRest,
    /// After a complete `QP`/`QF` literal; only whitespace may follow
    QDone,
    /// The value of a `G` directive
    Security,
    /// First hex digit of a `C` directive
    Checksum1,
    /// Remaining hex digits of a `C` directive
    ChecksumRest,
}

/// Everything a fuse-map file declares.
#[derive(Debug, Clone)]
pub struct JedecFile {
    /// The parsed fuse bitmap
    pub bitmap: FuseBitmap,
    /// Security fuse (`G` directive), default off
    pub security: bool,
    /// Checksum declared by the file (`C` directive), if any
    pub declared_checksum: Option<u16>,
    /// Checksum computed over `[0, last_fuse)`; this is what gets uploaded
    pub checksum: u16,
    /// Last-fuse address declared by `QF` (0 when absent)
    pub last_fuse: u32,
    /// Pin count declared by `QP` (0 when absent)
    pub pins: u32,
    /// Device type inferred from the declared counts
    pub detected: Option<GalType>,
    /// Auto-power-down fuse on ATF16V8B/ATF22V10C-class parts whose fuse
    /// map carries one bit past the published count
    pub apd: Option<bool>,
}

impl JedecFile {
    /// Fuse count to transmit: the catalog count plus the APD fuse if the
    /// file carried one.
    pub fn upload_fuse_count(&self, gal: GalType) -> usize {
        gal.info().fuses as usize + usize::from(self.apd.unwrap_or(false))
    }
}

fn hex_value(b: u8) -> Option<u16> {
    match b {
        b'0'..=b'9' => Some(u16::from(b - b'0')),
        b'a'..=b'f' => Some(u16::from(b - b'a') + 10),
        b'A'..=b'F' => Some(u16::from(b - b'A') + 10),
        _ => None,
    }
}

fn parse_err(offset: usize, found: u8) -> CoreError {
    CoreError::Parse {
        offset,
        found: found as char,
    }
}

/// Parse fuse-map text.
///
/// `selected` is the device type chosen on the command line, if any; it
/// steers type inference and enables the APD special cases. Fails at the
/// byte offset of the first invalid character; a declared checksum that
/// does not match the computed one is only warned about.
pub fn parse_fuse_map(text: &str, selected: Option<GalType>) -> Result<JedecFile> {
    let mut bitmap = FuseBitmap::new(MAX_FUSES);
    let mut state = State::Outside;
    let mut address: usize = 0;
    let mut security = false;
    let mut declared: Option<u16> = None;
    let mut last_fuse: u32 = 0;
    let mut pins: u32 = 0;

    for (n, &b) in text.as_bytes().iter().enumerate() {
        // Command markers take priority in every state.
        if b == b'*' {
            state = State::Command;
            continue;
        }
        let space = b.is_ascii_whitespace();
        state = match state {
            State::Outside | State::Skip => state,
            State::Command => {
                if space {
                    State::Command
                } else {
                    match b {
                        b'L' => {
                            address = 0;
                            State::Address1
                        }
                        b'F' => State::FuseInit,
                        b'G' => State::Security,
                        b'Q' => State::QSelect,
                        b'C' => {
                            declared = Some(0);
                            State::Checksum1
                        }
                        _ => State::Skip,
                    }
                }
            }
            State::Address1 => match b {
                b'0'..=b'9' => {
                    address = usize::from(b - b'0');
                    State::AddressRest
                }
                _ => return Err(parse_err(n, b)),
            },
            State::AddressRest => match b {
                _ if space => State::ReadBits,
                b'0'..=b'9' => {
                    address = 10 * address + usize::from(b - b'0');
                    State::AddressRest
                }
                _ => return Err(parse_err(n, b)),
            },
            State::FuseInit => match b {
                _ if space => State::FuseInit,
                b'0' | b'1' => {
                    bitmap.fill(b == b'1');
                    State::Skip
                }
                _ => return Err(parse_err(n, b)),
            },
            State::ReadBits => match b {
                _ if space => State::ReadBits,
                b'0' | b'1' => {
                    bitmap.set(address, b == b'1')?;
                    address += 1;
                    State::ReadBits
                }
                _ => return Err(parse_err(n, b)),
            },
            State::QSelect => match b {
                _ if space => State::QSelect,
                b'P' => {
                    pins = 0;
                    State::Qp1
                }
                b'F' => {
                    last_fuse = 0;
                    State::Qf1
                }
                _ => State::Command,
            },
            State::Qp1 => match b {
                _ if space => State::Qp1,
                b'0'..=b'9' => {
                    pins = u32::from(b - b'0');
                    State::QpRest
                }
                _ => return Err(parse_err(n, b)),
            },
            State::QpRest => match b {
                b'0'..=b'9' => {
                    pins = 10 * pins + u32::from(b - b'0');
                    State::QpRest
                }
                _ if space => State::QDone,
                _ => return Err(parse_err(n, b)),
            },
            State::Qf1 => match b {
                _ if space => State::Qf1,
                b'0'..=b'9' => {
                    last_fuse = u32::from(b - b'0');
                    State::QfRest
                }
                _ => return Err(parse_err(n, b)),
            },
            State::QfRest => match b {
                b'0'..=b'9' => {
                    last_fuse = 10 * last_fuse + u32::from(b - b'0');
                    State::QfRest
                }
                _ if space => State::QDone,
                _ => return Err(parse_err(n, b)),
            },
            State::QDone => {
                if space {
                    State::QDone
                } else {
                    return Err(parse_err(n, b));
                }
            }
            State::Security => match b {
                _ if space => State::Security,
                b'0' | b'1' => {
                    security = b == b'1';
                    State::Skip
                }
                _ => return Err(parse_err(n, b)),
            },
            State::Checksum1 => match hex_value(b) {
                _ if space => State::Checksum1,
                Some(v) => {
                    declared = Some(v);
                    State::ChecksumRest
                }
                None => return Err(parse_err(n, b)),
            },
            State::ChecksumRest => match hex_value(b) {
                Some(v) => {
                    declared = declared.map(|c| c.wrapping_mul(16).wrapping_add(v));
                    State::ChecksumRest
                }
                None if space => State::Command,
                None => return Err(parse_err(n, b)),
            },
        };
    }

    let mut checksum = 0;
    let mut detected = None;
    if last_fuse != 0 || pins != 0 {
        checksum = fuse_checksum(&bitmap, last_fuse as usize);
        if let Some(given) = declared {
            if given != 0 && given != checksum {
                log::warn!(
                    "checksum does not match: given=0x{:04X} calculated=0x{:04X} last fuse={}",
                    given,
                    checksum,
                    last_fuse
                );
            }
        }
        detected = infer_type(last_fuse, pins, selected);
    }

    // One fuse past the published count on these families is the
    // auto-power-down control fuse, not part of the fuse layout.
    let apd = match (last_fuse, selected) {
        (2195, Some(GalType::Atf16V8B)) => Some(bitmap.get(2194)),
        (5893, Some(GalType::Atf22V10C)) => Some(bitmap.get(5892)),
        _ => None,
    };
    if let Some(pd) = apd {
        log::debug!("PD fuse detected: {}", u8::from(pd));
    }

    Ok(JedecFile {
        bitmap,
        security,
        declared_checksum: declared,
        checksum,
        last_fuse,
        pins,
        detected,
        apd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_fuse_map() {
        let jed = parse_fuse_map("header junk\n*F0*L0004 1101*G1*QP20*QF2194*C00B0*\n", None)
            .unwrap();
        assert!(jed.bitmap.get(4));
        assert!(jed.bitmap.get(5));
        assert!(!jed.bitmap.get(6));
        assert!(jed.bitmap.get(7));
        assert!(jed.security);
        assert_eq!(jed.pins, 20);
        assert_eq!(jed.last_fuse, 2194);
        assert_eq!(jed.declared_checksum, Some(0x00B0));
        assert_eq!(jed.checksum, 0x00B0);
        assert_eq!(jed.detected, Some(GalType::Gal16V8));
    }

    #[test]
    fn bulk_fill_then_bit_overrides() {
        let jed = parse_fuse_map("*F1*L0000 000*QF8*", None).unwrap();
        assert!(!jed.bitmap.get(0));
        assert!(!jed.bitmap.get(2));
        assert!(jed.bitmap.get(3));
    }

    #[test]
    fn whitespace_inside_bit_stream_is_ignored() {
        let jed = parse_fuse_map("*L0000 10\n 01\t1*", None).unwrap();
        assert!(jed.bitmap.get(0));
        assert!(!jed.bitmap.get(1));
        assert!(!jed.bitmap.get(2));
        assert!(jed.bitmap.get(3));
        assert!(jed.bitmap.get(4));
    }

    #[test]
    fn invalid_bit_character_reports_its_offset() {
        let err = parse_fuse_map("*L0000 10x1*", None).unwrap_err();
        assert_eq!(
            err,
            CoreError::Parse {
                offset: 9,
                found: 'x'
            }
        );
    }

    #[test]
    fn address_past_capacity_is_fatal() {
        let text = format!("*L{} 1*", MAX_FUSES);
        let err = parse_fuse_map(&text, None).unwrap_err();
        assert!(matches!(err, CoreError::FuseOverflow { .. }));
    }

    #[test]
    fn trailing_garbage_after_qf_literal_is_an_error() {
        let err = parse_fuse_map("*QF2194 x*", None).unwrap_err();
        assert!(matches!(err, CoreError::Parse { found: 'x', .. }));
    }

    #[test]
    fn unknown_directives_are_skipped() {
        let jed = parse_fuse_map("*N a note 012xyz*QP24*QF2706*", None).unwrap();
        assert_eq!(jed.detected, Some(GalType::Gal20V8));
    }

    #[test]
    fn checksum_accepts_both_hex_cases() {
        let jed = parse_fuse_map("*QF8*Cbeef*", None).unwrap();
        assert_eq!(jed.declared_checksum, Some(0xBEEF));
        let jed = parse_fuse_map("*QF8*CBEEF*", None).unwrap();
        assert_eq!(jed.declared_checksum, Some(0xBEEF));
    }

    #[test]
    fn mismatched_checksum_is_not_fatal() {
        // Computed checksum over 8 set fuses is 0x00FF; the file claims
        // 0x1234. Parsing succeeds and the computed value is kept.
        let jed = parse_fuse_map("*L0000 11111111*QF8*C1234*", None).unwrap();
        assert_eq!(jed.checksum, 0x00FF);
        assert_eq!(jed.declared_checksum, Some(0x1234));
    }

    #[test]
    fn apd_fuse_is_split_off_for_atf16v8b() {
        let bits = "1".repeat(2195);
        let text = format!("*QF2195*L0000 {}*", bits);
        let jed = parse_fuse_map(&text, Some(GalType::Atf16V8B)).unwrap();
        assert_eq!(jed.apd, Some(true));
        assert_eq!(jed.upload_fuse_count(GalType::Atf16V8B), 2195);

        // Same file without the selection: no APD interpretation.
        let jed = parse_fuse_map(&text, None).unwrap();
        assert_eq!(jed.apd, None);
    }

    #[test]
    fn apd_fuse_is_split_off_for_atf22v10c() {
        let text = "*QF5893*L5892 0*";
        let jed = parse_fuse_map(text, Some(GalType::Atf22V10C)).unwrap();
        assert_eq!(jed.apd, Some(false));
        assert_eq!(jed.upload_fuse_count(GalType::Atf22V10C), 5892 + 1);
    }

    #[test]
    fn round_trip_through_serialized_text() {
        let mut reference = FuseBitmap::new(MAX_FUSES);
        for i in 0..2194 {
            reference.set(i, i % 7 == 0 || i % 31 == 3).unwrap();
        }

        let mut text = String::from("*F0*L0000 ");
        for i in 0..2194 {
            text.push(if reference.get(i) { '1' } else { '0' });
        }
        text.push_str("*QP20*QF2194*");

        let jed = parse_fuse_map(&text, None).unwrap();
        assert_eq!(jed.bitmap, reference);
        assert_eq!(
            jed.checksum,
            fuse_checksum(&reference, 2194),
            "re-parsed checksum must match the reference bitmap"
        );
    }
}
