//! First-fit slot packing.
//!
//! Each slot is a bitmask over the days of one month; bit `i` set means day
//! index `i` is taken in that slot. A bar spanning `[start, start + span)`
//! goes into the first slot it does not overlap, or opens a new one.

/// Days a month can have. Masks are `u64`, so this always fits.
pub const MAX_DAYS: u32 = 31;

/// Mask of the day interval `[start, start + span)`.
pub fn interval_mask(start: u32, span: u32) -> u64 {
    let span = span.clamp(1, MAX_DAYS);
    let start = start.min(MAX_DAYS - 1);
    ((1u64 << span) - 1) << start
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPacker {
    occupied: Vec<u64>,
}

impl SlotPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the first slot free for `[start, start + span)` and return its index.
    pub fn place(&mut self, start: u32, span: u32) -> u32 {
        let key = interval_mask(start, span);
        let slot = match self.occupied.iter().position(|mask| mask & key == 0) {
            Some(i) => {
                self.occupied[i] |= key;
                i
            }
            None => {
                self.occupied.push(key);
                self.occupied.len() - 1
            }
        };
        slot as u32
    }

    pub fn occupied(&self) -> &[u64] {
        &self.occupied
    }

    pub fn slot_count(&self) -> usize {
        self.occupied.len()
    }

    /// Highest slot holding a bar on `day`, if any.
    pub fn deepest_on(&self, day: u32) -> Option<u32> {
        let bit = 1u64 << day.min(63);
        self.occupied
            .iter()
            .rposition(|mask| mask & bit != 0)
            .map(|i| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_mask() {
        assert_eq!(interval_mask(4, 3), 0b111_0000);
        assert_eq!(interval_mask(0, 1), 1);
        assert_eq!(interval_mask(0, 31).count_ones(), 31);
        assert_eq!(interval_mask(30, 1), 1 << 30);
    }

    #[test]
    fn test_overlapping_bars_stack() {
        let mut packer = SlotPacker::new();
        assert_eq!(packer.place(4, 3), 0);
        assert_eq!(packer.place(5, 2), 1);
        assert_eq!(packer.occupied()[0] & packer.occupied()[1], 0);
    }

    #[test]
    fn test_first_fit_reuses_lowest_free_slot() {
        let mut packer = SlotPacker::new();
        assert_eq!(packer.place(0, 5), 0);
        assert_eq!(packer.place(3, 5), 1);
        // free in slot 0 again after day 4
        assert_eq!(packer.place(5, 2), 0);
        // touching ranges do not overlap
        assert_eq!(packer.place(8, 1), 0);
        assert_eq!(packer.slot_count(), 2);
    }

    #[test]
    fn test_deepest_slot_per_day() {
        let mut packer = SlotPacker::new();
        packer.place(0, 10);
        packer.place(2, 3);
        packer.place(3, 1);
        assert_eq!(packer.deepest_on(0), Some(0));
        assert_eq!(packer.deepest_on(3), Some(2));
        assert_eq!(packer.deepest_on(4), Some(1));
        assert_eq!(packer.deepest_on(20), None);
    }

    #[test]
    fn test_packing_never_shares_bits_within_a_slot() {
        let bars = [(0, 3), (1, 4), (2, 2), (6, 9), (4, 7), (10, 1), (0, 31), (15, 16)];
        let mut packer = SlotPacker::new();
        let mut masks: Vec<Vec<u64>> = Vec::new();
        for (start, span) in bars {
            let slot = packer.place(start, span) as usize;
            if masks.len() <= slot {
                masks.resize(slot + 1, Vec::new());
            }
            masks[slot].push(interval_mask(start, span));
        }
        for slot in masks {
            for (i, a) in slot.iter().enumerate() {
                for b in &slot[i + 1..] {
                    assert_eq!(a & b, 0);
                }
            }
        }
    }
}
