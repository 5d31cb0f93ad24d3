//! Double-buffered axis values.

/// One scalar input channel with a staged value.
///
/// Backends write into `next` during a drain (`set` for absolute readings, `add` for
/// deltas), and the owning device promotes it with [`commit`](Self::commit) once per tick.
/// Readers may look at any of the three slots at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VirtualAxis {
    current: f32,
    previous: f32,
    next: f32,
}

/// All three slots of an axis at once.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisValues {
    pub current: f32,
    pub previous: f32,
    pub next: f32,
}

impl VirtualAxis {
    pub const fn new() -> Self {
        Self {
            current: 0.0,
            previous: 0.0,
            next: 0.0,
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn get_previous(&self) -> f32 {
        self.previous
    }

    #[inline]
    pub fn get_next(&self) -> f32 {
        self.next
    }

    pub fn values(&self) -> AxisValues {
        AxisValues {
            current: self.current,
            previous: self.previous,
            next: self.next,
        }
    }

    /// Overwrite the staged value.
    #[inline]
    pub fn set(&mut self, value: f32) {
        self.next = value;
    }

    /// Accumulate into the staged value.
    #[inline]
    pub fn add(&mut self, value: f32) {
        self.next += value;
    }

    /// Shift `current` into `previous` and `next` into `current`.
    ///
    /// `next` is left untouched, so committing twice without staging anything
    /// copies the same value into both slots.
    #[inline]
    pub fn commit(&mut self) {
        self.previous = self.current;
        self.current = self.next;
    }

    /// Zero every slot.
    pub fn reset(&mut self) {
        self.set(0.0);
        self.commit();
        self.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_promotes_staged_value() {
        let mut axis = VirtualAxis::new();
        axis.set(0.5);
        assert_eq!(axis.get(), 0.0);
        assert_eq!(axis.get_next(), 0.5);

        axis.commit();
        assert_eq!(axis.get(), 0.5);
        assert_eq!(axis.get_previous(), 0.0);

        axis.set(-1.0);
        axis.commit();
        assert_eq!(axis.get(), -1.0);
        assert_eq!(axis.get_previous(), 0.5);
    }

    #[test]
    fn add_accumulates_and_set_overwrites() {
        let mut axis = VirtualAxis::new();
        axis.add(2.0);
        axis.add(3.0);
        axis.commit();
        assert_eq!(axis.get(), 5.0);

        axis.set(1.0);
        axis.set(4.0);
        axis.commit();
        assert_eq!(axis.get(), 4.0);
        assert_eq!(axis.get_previous(), 5.0);
    }

    #[test]
    fn commit_leaves_next_in_place() {
        let mut axis = VirtualAxis::new();
        axis.set(1.0);
        axis.commit();
        axis.commit();
        assert_eq!(axis.values(), AxisValues { current: 1.0, previous: 1.0, next: 1.0 });
    }

    #[test]
    fn reset_clears_all_slots() {
        let mut axis = VirtualAxis::new();
        axis.set(0.25);
        axis.commit();
        axis.set(0.75);
        axis.commit();
        axis.add(1.0);

        axis.reset();
        assert_eq!(axis.values(), AxisValues::default());
    }
}
