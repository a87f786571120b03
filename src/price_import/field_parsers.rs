//! Field parsing utilities for price import files.
//!
//! Contains pure functions for normalising raw text, splitting lines and
//! parsing individual fields like prices and product codes.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::money::{round2, MAX_PRICE};

/// Characters some supplier exports wrap product codes in
const CODE_DECORATIONS: [char; 3] = ['°', '[', ']'];

/// Strips a UTF-8 BOM, normalises line endings and drops blank lines.
pub fn normalize_lines(content: &str) -> Vec<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .split("\r\n")
        .flat_map(|chunk| chunk.split(['\r', '\n']))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Lowercases, trims and removes diacritics ("Código " -> "codigo").
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Picks `;` or `,` based on which one the header line uses more.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    let delimiter = if semicolons > 0 && semicolons >= commas {
        b';'
    } else {
        b','
    };
    debug!(
        "Detected delimiter '{}' ({semicolons} semicolons, {commas} commas)",
        delimiter as char
    );
    delimiter
}

/// Splits one line into trimmed fields, honouring quotes and `""` escapes.
pub fn split_line(line: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => {
            let record = record.context("Failed to tokenize line")?;
            Ok(record.iter().map(str::to_string).collect())
        }
        None => Ok(Vec::new()),
    }
}

/// Removes `°`, `[` and `]` decoration from a product code.
pub fn clean_code(code: &str) -> String {
    code.chars()
        .filter(|c| !CODE_DECORATIONS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parses a price written in either local or plain notation.
///
/// Currency symbols and spaces are ignored. When a comma is present it is
/// the decimal separator and any dot before it is a thousands separator
/// ("1.234,56" -> 1234.56); otherwise the number is read as is
/// ("1500", "12.5"). The result is rounded to 2 decimals and must be a
/// non-negative number no larger than [`MAX_PRICE`].
///
/// # Arguments
/// * `raw` - The price column as it appears in the file (e.g. "$ 1.234,50")
pub fn parse_locale_price(raw: &str) -> Result<f64> {
    debug!("Parsing price string: {raw}");
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if cleaned.is_empty() {
        warn!("Price '{raw}' contains no digits");
        bail!("price '{raw}' is empty or not a number");
    }

    let normalized = match cleaned.find(',') {
        Some(comma) => {
            let integer_part = cleaned[..comma].replace('.', "");
            format!("{}.{}", integer_part, &cleaned[comma + 1..])
        }
        None => cleaned,
    };

    let value = normalized
        .parse::<f64>()
        .with_context(|| format!("price '{raw}' is not a valid number"))?;

    if !value.is_finite() || value < 0.0 {
        warn!("Rejected price '{raw}' parsed as {value}");
        bail!("price '{raw}' must be a non-negative number");
    }

    if value > MAX_PRICE {
        warn!("Rejected price '{raw}' above {MAX_PRICE}");
        bail!("price '{raw}' exceeds the maximum of {MAX_PRICE}");
    }

    let rounded = round2(value);
    debug!("Successfully parsed price: {rounded}");
    Ok(rounded)
}

#[cfg(test)]
#[path = "field_parsers_tests.rs"]
mod tests;
