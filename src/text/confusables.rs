// Confusable-character folding.
//
// Maps glyphs that render like Latin letters (Cyrillic and Greek lookalikes,
// accented Latin, fullwidth forms, circled and "fancy" mathematical letters)
// onto their plain ASCII counterpart. Every output is an ASCII lowercase
// letter or digit, which is itself never remapped, so folding twice is the
// same as folding once.

/// Fold one already-lowercased character. Returns `None` when the character
/// has no ASCII lookalike and should be kept as-is.
pub fn fold(c: char) -> Option<char> {
    if c.is_ascii() {
        return None;
    }

    let folded = match c {
        // Cyrillic
        'а' => 'a',
        'в' => 'b',
        'е' | 'ё' => 'e',
        'һ' | 'н' => 'h',
        'і' | 'ї' => 'i',
        'ј' => 'j',
        'к' => 'k',
        'ӏ' => 'l',
        'м' => 'm',
        'о' => 'o',
        'р' => 'p',
        'ԛ' => 'q',
        'ѕ' => 's',
        'т' => 't',
        'у' => 'y',
        'х' => 'x',
        'ԁ' => 'd',
        'ԝ' => 'w',
        'с' => 'c',

        // Greek
        'α' | 'ά' => 'a',
        'β' => 'b',
        'ε' | 'έ' => 'e',
        'η' => 'n',
        'ι' | 'ί' | 'ϊ' => 'i',
        'κ' => 'k',
        'ν' => 'v',
        'ο' | 'ό' => 'o',
        'ρ' => 'p',
        'τ' => 't',
        'υ' | 'ύ' => 'u',
        'χ' => 'x',
        'γ' => 'y',
        'ω' => 'w',

        // Accented Latin
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' | 'ĉ' | 'ċ' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ğ' | 'ģ' | 'ĝ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => 'i',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ň' | 'ņ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ŕ' | 'ř' => 'r',
        'ś' | 'š' | 'ş' | 'ș' => 's',
        'ť' | 'ţ' | 'ț' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',

        _ => return fold_by_range(c),
    };

    Some(folded)
}

/// Contiguous Unicode blocks that are straight restylings of a-z / 0-9.
fn fold_by_range(c: char) -> Option<char> {
    let cp = c as u32;
    let letter = |offset: u32| char::from_u32('a' as u32 + offset);
    let digit = |offset: u32| char::from_u32('0' as u32 + offset);

    match cp {
        // Fullwidth lowercase and digits (uppercase is lowercased before we get here)
        0xFF41..=0xFF5A => letter(cp - 0xFF41),
        0xFF10..=0xFF19 => digit(cp - 0xFF10),
        // Circled lowercase
        0x24D0..=0x24E9 => letter(cp - 0x24D0),
        // Mathematical alphanumerics: 13 styles of A-Z followed by a-z.
        // These have no case mapping, so both halves land here.
        0x1D400..=0x1D6A3 => letter((cp - 0x1D400) % 52 % 26),
        // Mathematical digits: 5 styles of 0-9
        0x1D7CE..=0x1D7FF => digit((cp - 0x1D7CE) % 10),
        _ => None,
    }
}

/// Characters that render as nothing and are used to split words invisibly:
/// zero-width spaces and joiners, soft hyphens, BOMs, and combining marks
/// (strike-through and stacked-accent tricks).
pub fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
            | '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic_lookalikes_fold_to_latin() {
        let folded: String = "ѕеха".chars().map(|c| fold(c).unwrap_or(c)).collect();
        assert_eq!(folded, "sexa");
    }

    #[test]
    fn test_ascii_is_untouched() {
        for c in ('a'..='z').chain('0'..='9') {
            assert_eq!(fold(c), None, "{c} should not be remapped");
        }
    }

    #[test]
    fn test_fullwidth_and_circled() {
        assert_eq!(fold('ｓ'), Some('s'));
        assert_eq!(fold('７'), Some('7'));
        assert_eq!(fold('ⓢ'), Some('s'));
    }

    #[test]
    fn test_math_bold_and_script_letters() {
        // U+1D41A MATHEMATICAL BOLD SMALL A
        assert_eq!(fold('\u{1D41A}'), Some('a'));
        // U+1D400 MATHEMATICAL BOLD CAPITAL A
        assert_eq!(fold('\u{1D400}'), Some('a'));
        // U+1D4FC MATHEMATICAL BOLD SCRIPT SMALL S
        assert_eq!(fold('\u{1D4FC}'), Some('s'));
    }

    #[test]
    fn test_outputs_are_fixed_points() {
        for cp in 0x80u32..0x2_0000 {
            if let Some(c) = char::from_u32(cp) {
                if let Some(out) = fold(c) {
                    assert!(out.is_ascii_lowercase() || out.is_ascii_digit());
                    assert_eq!(fold(out), None);
                }
            }
        }
    }

    #[test]
    fn test_invisible_characters() {
        assert!(is_invisible('\u{200B}'));
        assert!(is_invisible('\u{0336}')); // combining long stroke overlay
        assert!(!is_invisible(' '));
        assert!(!is_invisible('-'));
    }
}
