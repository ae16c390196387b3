//! Text normalization for the destination markup dialect.
//!
//! The destination renderer treats the MarkdownV2 reserved set as control
//! characters; unescaped occurrences corrupt or reject the message, so every
//! reserved character in generated text gets exactly one backslash.
//! Sanitization is purely textual and has no failure mode. Quality gating
//! happens in the orchestrator, not here.

/// Characters the destination markup dialect reserves.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

const HEADER_GLYPH: &str = "• ";

/// Normalizes generated copy: strips debug delimiter lines, softens
/// markdown headers into a plain leading glyph, escapes the reserved set
/// and trims. Idempotent when re-applied to its own output.
pub fn sanitize(raw: &str) -> String {
    let stripped = strip_debug_delimiters(raw);
    let softened = soften_headers(&stripped);
    escape_markup(&softened).trim().to_string()
}

/// Drops separator lines the generator occasionally leaks: horizontal
/// rules made of dashes and triple-backtick fences.
fn strip_debug_delimiters(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            let is_rule = trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-');
            let is_fence = trimmed.starts_with("```");
            !is_rule && !is_fence
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns structural markdown headers (`# Title`, `## Title`, ...) into a
/// plain bulleted line. Headers survive as ordinary text otherwise, which
/// reads badly once the `#` is escaped.
fn soften_headers(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let hashes = trimmed.chars().take_while(|&c| c == '#').count();
            if hashes > 0 {
                let rest = trimmed[hashes..].trim_start();
                if !rest.is_empty() {
                    return format!("{HEADER_GLYPH}{rest}");
                }
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Backslash-escapes every reserved character. An already escaped
/// occurrence is passed through unchanged, so repeated application never
/// double-escapes.
fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if RESERVED.contains(&next) {
                    out.push('\\');
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
            out.push('\\');
        } else if RESERVED.contains(&c) {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }

    out
}
