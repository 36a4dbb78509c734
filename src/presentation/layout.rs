use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// One line of text positioned on the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub row: u16,
    pub col: u16,
    pub text: String,
}

/// Word-wrap `text` to `cols` display columns, then centre the block both ways
/// inside a `cols` x `rows` area. Lines past the bottom are dropped.
pub fn centered_lines(text: &str, cols: u16, rows: u16) -> Vec<PlacedLine> {
    let width = usize::from(cols.max(1));
    let lines: Vec<String> = text
        .lines()
        .flat_map(|line| wrap(line, width))
        .collect();
    let top = usize::from(rows).saturating_sub(lines.len()) / 2;
    lines
        .into_iter()
        .enumerate()
        .take(usize::from(rows))
        .map(|(offset, line)| {
            let col = width.saturating_sub(line.width()) / 2;
            PlacedLine {
                row: (top + offset) as u16,
                col: col as u16,
                text: line,
            }
        })
        .collect()
}

fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.trim().is_empty() {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.width()
        } else {
            current.width() + 1 + word.width()
        };
        if needed > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        while current.width() > width {
            let (head, tail) = split_at_width(&current, width);
            out.push(head);
            current = tail;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Split so the head fits in `width` columns; the head always takes one char.
fn split_at_width(text: &str, width: usize) -> (String, String) {
    let mut used = 0;
    let mut cut = 0;
    for (idx, ch) in text.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > width && idx > 0 {
            break;
        }
        used += w;
        cut = idx + ch.len_utf8();
    }
    (text[..cut].to_string(), text[cut..].to_string())
}
