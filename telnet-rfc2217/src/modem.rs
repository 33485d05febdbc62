//! Modem status line assembly and delta-notification arithmetic, shared by
//! `PortManager`'s server-role poll and any test harness exercising it
//! directly (Testable Property 4).

use crate::protocol::{
    MODEMSTATE_MASK_CD, MODEMSTATE_MASK_CD_CHANGE, MODEMSTATE_MASK_CTS, MODEMSTATE_MASK_CTS_CHANGE,
    MODEMSTATE_MASK_DSR, MODEMSTATE_MASK_DSR_CHANGE, MODEMSTATE_MASK_RI, MODEMSTATE_MASK_RI_CHANGE,
};

/// The four UART status inputs the wire byte is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemLines {
    pub cts: bool,
    pub dsr: bool,
    pub ri: bool,
    pub cd: bool,
}

/// Packs the high nibble of a `SERVER_NOTIFY_MODEMSTATE` payload: bit 7 CD,
/// bit 6 RI, bit 5 DSR, bit 4 CTS.
pub fn pack_lines(lines: ModemLines) -> u8 {
    let mut byte = 0u8;
    if lines.cts {
        byte |= MODEMSTATE_MASK_CTS;
    }
    if lines.dsr {
        byte |= MODEMSTATE_MASK_DSR;
    }
    if lines.ri {
        byte |= MODEMSTATE_MASK_RI;
    }
    if lines.cd {
        byte |= MODEMSTATE_MASK_CD;
    }
    byte
}

/// Sets the low-nibble delta bit for each high-nibble bit that differs
/// between `previous` and `current` (both already packed via `pack_lines`,
/// or raw bytes with only the high nibble meaningful).
pub fn delta_bits(previous: u8, current: u8) -> u8 {
    let changed = previous ^ current;
    let mut deltas = 0u8;
    if changed & MODEMSTATE_MASK_CTS != 0 {
        deltas |= MODEMSTATE_MASK_CTS_CHANGE;
    }
    if changed & MODEMSTATE_MASK_DSR != 0 {
        deltas |= MODEMSTATE_MASK_DSR_CHANGE;
    }
    if changed & MODEMSTATE_MASK_RI != 0 {
        deltas |= MODEMSTATE_MASK_RI_CHANGE;
    }
    if changed & MODEMSTATE_MASK_CD != 0 {
        deltas |= MODEMSTATE_MASK_CD_CHANGE;
    }
    deltas
}

/// Full notification payload: current status bits in the high nibble, deltas
/// against `previous` in the low nibble.
pub fn notification_payload(previous: u8, lines: ModemLines) -> u8 {
    let current = pack_lines(lines);
    current | delta_bits(previous, current)
}

/// Decides whether a notification should be emitted this tick, per §4.E
/// point 4: changed-or-forced, and the client has to be RFC2217-aware, and
/// the result survives the configured mask.
pub fn should_notify(
    previous: u8,
    current: u8,
    force: bool,
    client_is_rfc2217: bool,
    modemstate_mask: u8,
) -> bool {
    (current != previous || force) && client_is_rfc2217 && (current & modemstate_mask) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_lines_sets_expected_bits() {
        let lines = ModemLines {
            cts: true,
            dsr: false,
            ri: false,
            cd: true,
        };
        assert_eq!(pack_lines(lines), MODEMSTATE_MASK_CTS | MODEMSTATE_MASK_CD);
    }

    #[test]
    fn delta_reflects_only_changed_lines() {
        let previous = 0x00;
        let current = MODEMSTATE_MASK_CTS;
        assert_eq!(delta_bits(previous, current), MODEMSTATE_MASK_CTS_CHANGE);
    }

    #[test]
    fn scenario_s4_cts_rising_edge() {
        let previous = 0x00;
        let lines = ModemLines {
            cts: true,
            dsr: false,
            ri: false,
            cd: false,
        };
        assert_eq!(notification_payload(previous, lines), 0x11);
    }

    #[test]
    fn no_change_suppresses_notification() {
        assert!(!should_notify(0x10, 0x10, false, true, 0xFF));
    }

    #[test]
    fn change_without_rfc2217_client_suppresses_notification() {
        assert!(!should_notify(0x00, 0x10, false, false, 0xFF));
    }

    #[test]
    fn forced_notification_bypasses_change_check() {
        assert!(should_notify(0x10, 0x10, true, true, 0xFF));
    }

    #[test]
    fn mask_can_suppress_a_real_change() {
        assert!(!should_notify(0x00, MODEMSTATE_MASK_CTS, false, true, 0x00));
    }
}
