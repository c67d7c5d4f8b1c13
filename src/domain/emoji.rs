/// Unicode blocks accepted as emoji glyphs.
///
/// Covers pictographs, emoticons, transport/map symbols, supplemental symbols,
/// dingbats and miscellaneous symbols. Variation selectors and zero-width joiners
/// are not glyphs on their own.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1F5FF), // Misc symbols and pictographs
    (0x1F600, 0x1F64F), // Emoticons
    (0x1F680, 0x1F6FF), // Transport and map symbols
    (0x1F700, 0x1F77F), // Alchemical symbols
    (0x1F780, 0x1F7FF), // Geometric shapes extended
    (0x1F800, 0x1F8FF), // Supplemental arrows-C
    (0x1F900, 0x1F9FF), // Supplemental symbols and pictographs
    (0x1FA70, 0x1FAFF), // Symbols and pictographs extended-A
    (0x1F1E6, 0x1F1FF), // Regional indicators (flags)
    (0x2600, 0x26FF),   // Misc symbols
    (0x2700, 0x27BF),   // Dingbats
    (0x2B50, 0x2B55),   // Stars and circles
    (0x231A, 0x231B),   // Watch, hourglass
    (0x23E9, 0x23FA),   // Media controls, alarm clock
];

/// Returns true if `c` is a recognised emoji glyph.
pub fn is_emoji_glyph(c: char) -> bool {
    let code = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|(start, end)| (*start..=*end).contains(&code))
}

/// Returns true if `text` contains at least one recognised emoji glyph.
pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(is_emoji_glyph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_emoji() {
        assert!(contains_emoji("✨"));
        assert!(contains_emoji("🍛"));
        assert!(contains_emoji("🏨"));
        assert!(contains_emoji("😀"));
        assert!(contains_emoji("trip ✈️"));
        assert!(contains_emoji("🇮🇳"));
    }

    #[test]
    fn test_rejects_plain_text() {
        assert!(!contains_emoji(""));
        assert!(!contains_emoji("abc"));
        assert!(!contains_emoji(":)"));
        assert!(!contains_emoji("\u{FE0F}"));
    }
}
