//! Integer colour interpolation.

use crate::events::LedValue;

/// Linear interpolation from `a` to `b` at `num / den`.
///
/// `num` is expected to be in `0..=den`; `den == 0` returns `a`.
pub fn lerp(a: u8, b: u8, num: u16, den: u16) -> u8 {
    if den == 0 {
        return a;
    }
    let num = num.min(den);
    let a = i32::from(a);
    let b = i32::from(b);
    let value = a + (b - a) * i32::from(num) / i32::from(den);
    value.clamp(0, 255) as u8
}

/// Channel-wise [`lerp`].
pub fn lerp_led(a: LedValue, b: LedValue, num: u16, den: u16) -> LedValue {
    LedValue::new(
        lerp(a.r, b.r, num, den),
        lerp(a.g, b.g, num, den),
        lerp(a.b, b.b, num, den),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(lerp(10, 200, 0, 128), 10);
        assert_eq!(lerp(10, 200, 128, 128), 200);
    }

    #[test]
    fn midpoint_both_directions() {
        assert_eq!(lerp(0, 255, 64, 128), 127);
        assert_eq!(lerp(255, 0, 64, 128), 128);
    }

    #[test]
    fn degenerate_denominator() {
        assert_eq!(lerp(42, 0, 5, 0), 42);
        assert_eq!(lerp(0, 100, 300, 200), 100, "num is clamped to den");
    }

    #[test]
    fn led_lerp() {
        let red = LedValue::new(255, 0, 0);
        let yellow = LedValue::new(255, 255, 0);
        assert_eq!(lerp_led(red, yellow, 64, 128), LedValue::new(255, 127, 0));
    }
}
