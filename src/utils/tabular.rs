//! Defensive parsing of single-column listings printed by mysqlsh
//!
//! `mysqlsh --sql -e` output varies with version and terminal: it may carry a
//! header, box-drawing borders, warnings about passwords on the command line,
//! or notes. Only plain identifier lines survive.

/// Extract the values of a one-column result, in output order.
///
/// `header` is the column name, compared case-insensitively.
pub fn parse_name_column(output: &str, header: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_noise(line))
        .filter(|line| !line.eq_ignore_ascii_case(header))
        .filter(|line| is_identifier(line))
        .map(str::to_string)
        .collect()
}

fn is_noise(line: &str) -> bool {
    const NOISE_PREFIXES: [&str; 5] = ["WARNING:", "Warning:", "Note:", "+", "|"];
    NOISE_PREFIXES.iter().any(|p| line.starts_with(p))
}

fn is_identifier(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'))
}
