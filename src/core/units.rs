use crate::domain::model::Wei;
use crate::utils::error::{RegistryError, Result};

/// 以太單位的小數位數
pub const ETHER_DECIMALS: u32 = 18;

fn scale(decimals: u32) -> Result<u128> {
    10u128
        .checked_pow(decimals)
        .ok_or_else(|| RegistryError::InvalidAmount {
            value: format!("10^{}", decimals),
            reason: "scale does not fit into 128 bits".to_string(),
        })
}

/// 將十進位字串轉為最小單位整數，例如 "0.5" -> 5 * 10^17
pub fn parse_units(value: &str, decimals: u32) -> Result<u128> {
    let invalid = |reason: &str| RegistryError::InvalidAmount {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("amount cannot be negative"));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("amount has no digits"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("amount must contain only digits and one decimal point"));
    }
    if frac_part.len() > decimals as usize {
        return Err(invalid(&format!(
            "at most {} fractional digits are allowed",
            decimals
        )));
    }

    let overflow = || invalid("amount does not fit into 128 bits");

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };

    let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale(decimals)?)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// 最小單位轉回十進位字串，尾端 0 省略但至少保留一位小數
pub fn format_units(amount: u128, decimals: u32) -> Result<String> {
    let unit = scale(decimals)?;
    let whole = amount / unit;
    let fraction = amount % unit;

    let mut digits = format!("{:0>width$}", fraction, width = decimals as usize);
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    if digits.is_empty() {
        digits.push('0');
    }

    Ok(format!("{}.{}", whole, digits))
}

pub fn parse_ether(value: &str) -> Result<Wei> {
    parse_units(value, ETHER_DECIMALS).map(Wei)
}

pub fn format_ether(amount: Wei) -> String {
    // 18 位小數的 scale 必定在 u128 範圍內
    let unit = 1_000_000_000_000_000_000u128;
    let whole = amount.0 / unit;
    let mut digits = format!("{:018}", amount.0 % unit);
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    format!("{}.{}", whole, digits)
}
