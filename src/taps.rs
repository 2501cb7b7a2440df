//! Tap address tracking for the multi-tap delay.
//!
//! A [`TapSet`] holds one live position, where each new sample is written,
//! followed by the echo taps. Tap `n` starts `tap_spacing * n - 1` slots
//! ahead of the live position; because every position advances by one slot
//! per tick and the buffer is circular, being ahead by `d` slots means
//! reading what was written `capacity - d` ticks ago.
//!
//! The `- 1` keeps a tap from landing on a slot the live position has not
//! written yet in the current rotation.

/// Index of the live position within a [`TapSet`].
pub const LIVE: usize = 0;

/// Cyclic read/write positions into a [`SampleBuffer`](crate::ringbuf::SampleBuffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapSet {
    /// Live position followed by the echo tap positions
    positions: Box<[usize]>,

    /// Distance between consecutive taps, in samples
    tap_spacing: usize,
}

impl TapSet {
    /// Creates a tap set of `tap_count` positions spaced `tap_spacing` apart.
    ///
    /// # Panics
    ///
    /// Panics if `tap_count` is less than 2 or `tap_spacing` is zero.
    #[must_use]
    pub fn new(tap_spacing: usize, tap_count: usize) -> Self {
        assert!(tap_count >= 2, "need a live position and at least one echo tap");
        assert!(tap_spacing > 0, "tap spacing must be non-zero");

        let mut taps = Self {
            positions: vec![0; tap_count].into_boxed_slice(),
            tap_spacing,
        };
        taps.reset();
        taps
    }

    /// Restores the initial rotation.
    ///
    /// Position 0 is set to 0 and tap `n` to `tap_spacing * n - 1`.
    pub fn reset(&mut self) {
        for (n, position) in self.positions.iter_mut().enumerate() {
            *position = if n == LIVE {
                0
            } else {
                self.tap_spacing * n - 1
            };
        }
    }

    /// Moves every position forward by one slot, wrapping to 0 past
    /// `top_address`.
    #[inline]
    pub fn advance(&mut self, top_address: usize) {
        for position in &mut self.positions {
            *position += 1;
            if *position > top_address {
                *position = 0;
            }
        }
    }

    /// The position the newest sample is written to.
    #[inline]
    #[must_use]
    pub fn live(&self) -> usize {
        self.positions[LIVE]
    }

    /// Echo tap positions paired with their tap index, starting at 1.
    #[inline]
    pub fn echoes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.positions.iter().copied().enumerate().skip(1)
    }

    /// All positions, live first.
    #[must_use]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Total number of positions, live included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always `false`: a tap set holds at least the live position and one
    /// echo tap.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Distance between consecutive taps, in samples.
    #[must_use]
    pub fn tap_spacing(&self) -> usize {
        self.tap_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACING: usize = 400;
    const TAPS: usize = 3;
    const TOP: usize = SPACING * TAPS - 1;

    #[test]
    fn initial_positions() {
        let taps = TapSet::new(SPACING, TAPS);
        assert_eq!(taps.positions(), &[0, 399, 799]);
        assert_eq!(taps.live(), 0);
        assert!(taps.positions().iter().all(|&position| position <= TOP));
    }

    #[test]
    fn initial_positions_in_range_for_all_tap_counts() {
        for tap_count in 2..=10 {
            for spacing in [1, 2, 7, 400] {
                let taps = TapSet::new(spacing, tap_count);
                let top = spacing * tap_count - 1;
                assert_eq!(taps.live(), 0);
                assert!(taps.positions().iter().all(|&position| position <= top));
            }
        }
    }

    #[test]
    fn advance_rotates_modulo_capacity() {
        let initial = TapSet::new(SPACING, TAPS);
        let mut taps = initial.clone();
        for k in 1..=3 * (TOP + 1) + 17 {
            taps.advance(TOP);
            for (position, start) in taps.positions().iter().zip(initial.positions()) {
                assert_eq!(*position, (start + k) % (TOP + 1));
            }
        }
    }

    #[test]
    fn relative_offsets_are_preserved() {
        let mut taps = TapSet::new(SPACING, TAPS);
        for _ in 0..5000 {
            taps.advance(TOP);
            let live = taps.live();
            for (n, position) in taps.echoes() {
                let ahead = (position + TOP + 1 - live) % (TOP + 1);
                assert_eq!(ahead, SPACING * n - 1);
            }
        }
    }

    #[test]
    fn reset_is_idempotent() {
        let fresh = TapSet::new(SPACING, TAPS);
        let mut taps = fresh.clone();
        for _ in 0..1234 {
            taps.advance(TOP);
        }
        taps.reset();
        assert_eq!(taps, fresh);
        taps.reset();
        assert_eq!(taps, fresh);
    }

    #[test]
    fn echoes_skip_live_position() {
        let taps = TapSet::new(10, 4);
        let echoes: Vec<_> = taps.echoes().collect();
        assert_eq!(echoes, vec![(1, 9), (2, 19), (3, 29)]);
    }
}
