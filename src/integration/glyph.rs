//! Character class index to plate glyph mapping.

use std::fmt;

/// Category of a plate glyph; layout rules are written in these terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphKind {
    Digit,
    /// Hangul usage-code syllable, e.g. `가`.
    Syllable,
    /// Province or city name printed on older and commercial plates, e.g. `서울`.
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph {
    pub text: &'static str,
    pub kind: GlyphKind,
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

const SYLLABLES: [&str; 40] = [
    "가", "나", "다", "라", "마", "거", "너", "더", "러", "머", "버", "서", "어", "저", "고", "노",
    "도", "로", "모", "보", "소", "오", "조", "구", "누", "두", "루", "무", "부", "수", "우", "주",
    "아", "바", "사", "자", "배", "하", "허", "호",
];

const REGIONS: [&str; 17] = [
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "경기", "강원", "충북", "충남",
    "전북", "전남", "경북", "경남", "제주",
];

/// Number of character classes the recogniser is expected to emit.
pub const GLYPH_CLASSES: usize = DIGITS.len() + SYLLABLES.len() + REGIONS.len();

/// Look up the glyph for a character detector class id.
pub fn glyph_for_class(class_id: usize) -> Option<Glyph> {
    let syllable_start = DIGITS.len();
    let region_start = syllable_start + SYLLABLES.len();

    let (text, kind) = if class_id < syllable_start {
        (DIGITS[class_id], GlyphKind::Digit)
    } else if class_id < region_start {
        (SYLLABLES[class_id - syllable_start], GlyphKind::Syllable)
    } else if class_id < GLYPH_CLASSES {
        (REGIONS[class_id - region_start], GlyphKind::Region)
    } else {
        return None;
    };
    Some(Glyph { text, kind })
}

/// Split plate text back into glyphs, e.g. for ground truth. Region names take precedence.
pub fn parse_plate_text(text: &str) -> Option<Vec<Glyph>> {
    let mut glyphs = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(region) = REGIONS.iter().copied().find(|r| rest.starts_with(*r)) {
            glyphs.push(Glyph {
                text: region,
                kind: GlyphKind::Region,
            });
            rest = &rest[region.len()..];
            continue;
        }
        let ch = rest.chars().next()?;
        let single = &rest[..ch.len_utf8()];
        let glyph = if let Some(d) = DIGITS.iter().copied().find(|d| *d == single) {
            Glyph {
                text: d,
                kind: GlyphKind::Digit,
            }
        } else {
            let s = SYLLABLES.iter().copied().find(|s| *s == single)?;
            Glyph {
                text: s,
                kind: GlyphKind::Syllable,
            }
        };
        glyphs.push(glyph);
        rest = &rest[ch.len_utf8()..];
    }
    Some(glyphs)
}
