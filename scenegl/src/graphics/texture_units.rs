//! Texture unit assignment
//!
//! Program-global textures (shadow maps, then environment maps) take the low
//! units. Material textures start at the program's base unit and wrap back to
//! it when the device runs out of units.

/// Hands out texture units for one material bind
#[derive(Debug, Clone)]
pub struct TextureUnitAllocator {
    base: u32,
    max: u32,
    next: u32,
    wrapped: bool,
}

impl TextureUnitAllocator {
    /// `base` is the first unit free for material textures, `max` the device
    /// limit
    pub fn new(base: u32, max: u32) -> Self {
        let max = max.max(1);
        Self {
            base: base.min(max - 1),
            max,
            next: 0,
            wrapped: false,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Next unit, wrapping modulo the units above `base`
    pub fn next_unit(&mut self) -> u32 {
        let span = self.max - self.base;
        if self.next == span && !self.wrapped {
            self.wrapped = true;
            tracing::debug!(
                "texture units exhausted ({} available from unit {}), wrapping",
                span,
                self.base
            );
        }
        let unit = self.base + self.next % span;
        self.next += 1;
        unit
    }

    /// Whether any unit has been handed out twice
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// Start over at the base unit
    pub fn reset(&mut self) {
        self.next = 0;
        self.wrapped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_start_at_base() {
        let mut units = TextureUnitAllocator::new(3, 8);
        assert_eq!(units.next_unit(), 3);
        assert_eq!(units.next_unit(), 4);
    }

    #[test]
    fn test_units_wrap_back_to_base() {
        let mut units = TextureUnitAllocator::new(2, 4);
        let assigned: Vec<u32> = (0..5).map(|_| units.next_unit()).collect();
        assert_eq!(assigned, vec![2, 3, 2, 3, 2]);
        assert!(units.wrapped());
        units.reset();
        assert_eq!(units.next_unit(), 2);
        assert!(!units.wrapped());
    }

    #[test]
    fn test_base_beyond_limit_still_yields_valid_units() {
        let mut units = TextureUnitAllocator::new(10, 4);
        assert_eq!(units.next_unit(), 3);
        assert_eq!(units.next_unit(), 3);
    }
}
