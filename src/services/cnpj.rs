//! CNPJ (Brazilian company registry number) validation

use serde::Serialize;

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Outcome of a CNPJ check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CnpjCheck {
    pub valid: bool,
    /// The 14 digits, when the input had exactly 14
    pub digits: Option<String>,
    /// `XX.XXX.XXX/XXXX-XX`, when valid
    pub formatted: Option<String>,
    /// Why the number was rejected
    pub reason: Option<&'static str>,
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

/// Validate a CNPJ; only its digits are considered
pub fn check_cnpj(input: &str) -> CnpjCheck {
    let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();
    let reject = |reason, digits: Option<String>| CnpjCheck {
        valid: false,
        digits,
        formatted: None,
        reason: Some(reason),
    };

    if digits.len() != 14 {
        return reject("must have 14 digits", None);
    }

    let as_string: String = digits.iter().map(|d| char::from(b'0' + *d as u8)).collect();
    if digits.iter().all(|d| *d == digits[0]) {
        return reject("repeated digits", Some(as_string));
    }

    let first = check_digit(&digits[..12], &FIRST_WEIGHTS);
    let second = check_digit(&digits[..13], &SECOND_WEIGHTS);
    if digits[12] != first || digits[13] != second {
        return reject("check digits do not match", Some(as_string));
    }

    CnpjCheck {
        valid: true,
        formatted: Some(format_digits(&as_string)),
        digits: Some(as_string),
        reason: None,
    }
}

/// `true` if `input` is a well-formed CNPJ
pub fn validate_cnpj(input: &str) -> bool {
    check_cnpj(input).valid
}

/// Format 14 digits as `XX.XXX.XXX/XXXX-XX`; `None` for anything else
pub fn format_cnpj(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 14).then(|| format_digits(&digits))
}

fn format_digits(d: &str) -> String {
    format!(
        "{}.{}.{}/{}-{}",
        &d[0..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..14]
    )
}
