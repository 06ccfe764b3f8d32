//! Academic-year derivation for the local fallback path.

/// Derive the next sequential academic year from the latest known one.
///
/// Handles both plain years ("2024" -> "2025") and range spellings
/// ("2024-2025" -> "2025-2026"). Years with no numeric prefix get a
/// "-next" suffix so year creation still works offline.
pub fn next_year(latest: Option<&str>) -> String {
    let Some(latest) = latest else {
        return format!("{}", chrono::Utc::now().format("%Y"));
    };

    let digits: String = latest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(start) = digits.parse::<u32>() else {
        return format!("{}-next", latest);
    };

    if latest.contains('-') {
        format!("{}-{}", start + 1, start + 2)
    } else {
        (start + 1).to_string()
    }
}
