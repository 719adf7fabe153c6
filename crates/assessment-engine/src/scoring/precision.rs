//! Decimal rounding for pass/fail and threshold comparisons.
//!
//! Values are rounded on their shortest round-trip decimal representation
//! rather than on the binary value, so `0.49995` rounds up to `0.5` even though
//! the nearest `f64` sits just below the midpoint. Only comparison points use
//! these helpers; accumulation stays in raw `f64`.

/// Round half-up to four decimal places.
pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

/// Threshold check performed on rounded values on both sides.
pub fn meets_threshold(value: f64, threshold: f64) -> bool {
    round4(value) >= round4(threshold)
}

/// Round half-up (away from zero) to `places` decimal places.
pub fn round_to(value: f64, places: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = match repr.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => return value,
    };

    if frac_part.len() <= places {
        return value;
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(places))
        .map(|byte| byte - b'0')
        .collect();
    let round_up = frac_part.as_bytes()[places] >= b'5';

    if round_up {
        let mut index = digits.len();
        loop {
            if index == 0 {
                digits.insert(0, 1);
                break;
            }
            index -= 1;
            if digits[index] == 9 {
                digits[index] = 0;
            } else {
                digits[index] += 1;
                break;
            }
        }
    }

    let split = digits.len() - places;
    let mut rounded = String::with_capacity(digits.len() + 2);
    rounded.extend(digits[..split].iter().map(|digit| char::from(b'0' + digit)));
    if places > 0 {
        rounded.push('.');
        rounded.extend(digits[split..].iter().map(|digit| char::from(b'0' + digit)));
    }

    let magnitude: f64 = rounded.parse().unwrap_or(value.abs());
    if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}
