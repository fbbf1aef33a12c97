/// Normalizes a label: exotic whitespace becomes a plain space, the
/// katakana middle dot and wave dash are folded to their CJK-neutral forms,
/// and the result is trimmed.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            c if is_odd_space(c) => ' ',
            '・' => '·',
            '〜' => '～',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_odd_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\u{A0}'
            | '\u{1680}'
            | '\u{180E}'
            | '\u{2000}'..='\u{200F}'
            | '\u{2028}'..='\u{202F}'
            | '\u{205F}'
            | '\u{2060}'..='\u{206E}'
            | '\u{3000}'
            | '\u{3164}'
            | '\u{FEFF}'
    )
}
