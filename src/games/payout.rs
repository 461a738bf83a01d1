//! Payout multiplier from the survival probability of drawing without
//! replacement.

/// Share of fair odds paid to the player (2% house edge)
pub const DEFAULT_HOUSE_EDGE: f64 = 0.98;

/// Probability of opening `safe_opened` cells in uniform random order without
/// hitting any of `bomb_count` bombs.
pub fn survival_probability(total_cells: u32, bomb_count: u32, safe_opened: u32) -> f64 {
    let total = i64::from(total_cells);
    let safe = total - i64::from(bomb_count);
    let mut survival = 1.0;

    for i in 0..i64::from(safe_opened) {
        let remaining_cells = total - i;
        if remaining_cells <= 0 {
            return 0.0;
        }
        survival *= (safe - i) as f64 / remaining_cells as f64;
    }

    survival
}

/// Multiplier with the default house edge
pub fn compute_multiplier(total_cells: u32, bomb_count: u32, safe_opened: u32) -> f64 {
    compute_multiplier_with_edge(total_cells, bomb_count, safe_opened, DEFAULT_HOUSE_EDGE)
}

/// `house_edge / survival`, rounded to six decimals. Exactly `1` before any
/// reveal and `0` once survival is impossible.
pub fn compute_multiplier_with_edge(
    total_cells: u32,
    bomb_count: u32,
    safe_opened: u32,
    house_edge: f64,
) -> f64 {
    if safe_opened == 0 {
        return 1.0;
    }

    let survival = survival_probability(total_cells, bomb_count, safe_opened);
    if survival <= 0.0 {
        return 0.0;
    }

    round6(house_edge / survival)
}

/// Six decimal digits. The exact decimal expansion of `value` is cut after
/// the sixth digit and rounded up when the first dropped digit is 5 or more,
/// so exact halves round away from zero.
fn round6(value: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return value;
    }

    // 1074 fractional digits hold any f64 exactly
    let exact = format!("{:.1074}", value);
    let Some((whole, fraction)) = exact.split_once('.') else {
        return value;
    };

    let mut digits: Vec<u8> = whole.bytes().chain(fraction.bytes().take(6)).collect();
    if fraction.as_bytes().get(6).is_some_and(|&d| d >= b'5') {
        increment_decimal(&mut digits);
    }

    let split = digits.len() - 6;
    let mut text = String::with_capacity(digits.len() + 1);
    for (i, digit) in digits.iter().enumerate() {
        if i == split {
            text.push('.');
        }
        text.push(char::from(*digit));
    }

    text.parse().unwrap_or(value)
}

/// Add one unit in the last place of an ASCII digit string
fn increment_decimal(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}
