/// Three-close momentum patterns over the tail of a closing-price series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePattern {
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl ClosePattern {
    pub fn signal(&self) -> &'static str {
        match self {
            ClosePattern::ThreeWhiteSoldiers => "Three white soldiers pattern",
            ClosePattern::ThreeBlackCrows => "Three black crows pattern",
        }
    }
}

/// Detect a pattern over the last 3 closes: strictly rising or strictly falling.
pub fn detect_close_pattern(closes: &[f64]) -> Option<ClosePattern> {
    if closes.len() < 3 {
        return None;
    }

    let last = &closes[closes.len() - 3..];
    if last[0] < last[1] && last[1] < last[2] {
        Some(ClosePattern::ThreeWhiteSoldiers)
    } else if last[0] > last[1] && last[1] > last[2] {
        Some(ClosePattern::ThreeBlackCrows)
    } else {
        None
    }
}
