//! Weighted mod-10 check digit used by 13-digit article numbers.

/// Computes the check digit over `digits` (values `0..=9`).
///
/// Weights alternate 1, 3, 1, 3... starting at the first digit, the weighted
/// sum is reduced mod 10 and the check digit is `(10 - sum % 10) % 10`.
pub fn check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            let weight = if i % 2 == 0 { 1 } else { 3 };
            u32::from(d) * weight
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Computes the check digit of an ASCII digit string.
///
/// Returns `None` if `s` contains anything other than `0-9`.
pub fn check_digit_str(s: &str) -> Option<u8> {
    let digits = s
        .bytes()
        .map(|b| b.is_ascii_digit().then(|| b - b'0'))
        .collect::<Option<Vec<u8>>>()?;
    Some(check_digit(&digits))
}
