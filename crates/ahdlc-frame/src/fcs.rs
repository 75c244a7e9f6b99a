//! 16-bit frame check sequence (RFC 1662, appendix C.2).
//!
//! Reflected CRC-CCITT over polynomial `0x8408`, driven by a 256-entry lookup
//! table. Encoder and decoder share [`update`]; nothing here holds state.

/// Initial FCS value for every new frame.
pub const INIT_FCS: u16 = 0xFFFF;

/// Residue left in the accumulator after a payload and its own FCS.
pub const GOOD_FCS: u16 = 0xF0B8;

/// Reflected CCITT polynomial the table is generated from.
pub const POLYNOMIAL: u16 = 0x8408;

/// Precomputed FCS-16 table.
pub static FCS_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut b = 0usize;
    while b < 256 {
        let mut v = b as u16;
        let mut i = 0;
        while i < 8 {
            v = if v & 1 != 0 { (v >> 1) ^ POLYNOMIAL } else { v >> 1 };
            i += 1;
        }
        table[b] = v;
        b += 1;
    }
    table
}

/// Fold one byte into a running FCS.
#[inline]
pub fn update(fcs: u16, byte: u8) -> u16 {
    (fcs >> 8) ^ FCS_TABLE[((fcs ^ byte as u16) & 0xFF) as usize]
}

/// Fold a slice into a running FCS.
pub fn accumulate(fcs: u16, data: &[u8]) -> u16 {
    data.iter().fold(fcs, |fcs, &byte| update(fcs, byte))
}

/// The complemented FCS transmitted after `payload`, in wire order (low byte first).
pub fn trailer(payload: &[u8]) -> [u8; 2] {
    (accumulate(INIT_FCS, payload) ^ 0xFFFF).to_le_bytes()
}

/// True when `frame` (payload followed by its two FCS bytes, unescaped) checks out.
pub fn is_good(frame: &[u8]) -> bool {
    accumulate(INIT_FCS, frame) == GOOD_FCS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_rfc1662_reference_rows() {
        assert_eq!(
            FCS_TABLE[..8],
            [0x0000, 0x1189, 0x2312, 0x329b, 0x4624, 0x57ad, 0x6536, 0x74bf]
        );
        assert_eq!(
            FCS_TABLE[128..136],
            [0x8408, 0x9581, 0xa71a, 0xb693, 0xc22c, 0xd3a5, 0xe13e, 0xf0b7]
        );
        assert_eq!(
            FCS_TABLE[248..],
            [0x7bc7, 0x6a4e, 0x58d5, 0x495c, 0x3de3, 0x2c6a, 0x1ef1, 0x0f78]
        );
    }

    #[test]
    fn check_value_for_standard_input() {
        // CRC-16/X-25 check value over "123456789".
        let fcs = accumulate(INIT_FCS, b"123456789") ^ 0xFFFF;
        assert_eq!(fcs, 0x906E);
        assert_eq!(trailer(b"123456789"), [0x6E, 0x90]);
    }

    #[test]
    fn payload_with_trailer_yields_good_residue() {
        let payload = [0x01, 0x7E, 0x7D, 0x02];
        let mut frame = payload.to_vec();
        frame.extend_from_slice(&trailer(&payload));
        assert!(is_good(&frame));

        frame[1] ^= 0x01;
        assert!(!is_good(&frame));
    }

    #[test]
    fn empty_payload_trailer_still_checks() {
        let trailer = trailer(&[]);
        assert_eq!(trailer, [0x00, 0x00]);
        assert!(is_good(&trailer));
    }
}
