use crate::constants::TOKEN_DECIMALS;
use crate::error::{ClientError, Field};

const DISPLAY_DECIMALS: usize = 4;

pub fn shorten_id(id: &str) -> String {
    if id.len() > 12 {
        // 0x598928d1...4d73ffbd style: keep the 0x prefix plus a few chars each side
        format!("{}...{}", &id[..6], &id[id.len() - 4..])
    } else {
        id.to_string()
    }
}

/// `0x` followed by exactly 40 hex digits. Checksum casing is not verified.
pub fn is_valid_address(candidate: &str) -> bool {
    match candidate.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Parse a user-entered decimal string into base units (10^18 per token).
/// Only strictly positive values are accepted.
pub fn parse_amount(input: &str) -> Result<u128, ClientError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(Field::Amount, "enter an amount"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(ClientError::validation(Field::Amount, "not a number"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClientError::validation(Field::Amount, "not a number"));
    }
    if fraction.len() > TOKEN_DECIMALS as usize {
        return Err(ClientError::validation(
            Field::Amount,
            format!("at most {} decimal places", TOKEN_DECIMALS),
        ));
    }

    let overflow = || ClientError::validation(Field::Amount, "amount too large");
    let unit = 10u128.pow(TOKEN_DECIMALS);
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let padded = format!("{:0<width$}", fraction, width = TOKEN_DECIMALS as usize);
    let fraction_units = padded.parse::<u128>().map_err(|_| overflow())?;

    let value = whole_units
        .checked_mul(unit)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)?;

    if value == 0 {
        return Err(ClientError::validation(Field::Amount, "must be greater than 0"));
    }
    Ok(value)
}

/// Render base units as a trimmed decimal, e.g. `1500000000000000000` -> `1.5`
pub fn format_token_amount(amount: u128) -> String {
    let unit = 10u128.pow(TOKEN_DECIMALS);
    let whole = amount / unit;
    let fraction = amount % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", fraction, width = TOKEN_DECIMALS as usize);
    let shown = digits[..DISPLAY_DECIMALS].trim_end_matches('0');
    if shown.is_empty() {
        format!("{}", whole)
    } else {
        format!("{}.{}", whole, shown)
    }
}

pub fn format_timestamp(unix_secs: u64) -> String {
    let days = unix_secs / 86_400;
    let secs_of_day = unix_secs % 86_400;
    let (year, month, day) = civil_from_days(days as i64);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02} UTC",
        year,
        month,
        day,
        secs_of_day / 3600,
        (secs_of_day / 60) % 60
    )
}

// Howard Hinnant's days-to-civil conversion
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}
