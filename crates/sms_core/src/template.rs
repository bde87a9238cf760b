//! Placeholder substitution for message templates.
//!
//! Two placeholder syntaxes are recognized: `{{key}}` and `{key}`. The
//! double-brace pass runs first over the template; the single-brace pass then
//! runs over the result. Keys are trimmed and matched case-sensitively.
//! Placeholders whose key is not present are left untouched. Keys cannot
//! contain braces and there is no escape for literal braces.

use crate::Fields;

/// Substitutes every known placeholder in `template` with the matching field.
pub fn render(template: &str, fields: &Fields) -> String {
    let doubled = substitute(template, "{{", "}}", fields);
    substitute(&doubled, "{", "}", fields)
}

/// Lists the keys referenced by `template`, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut collect = |key: &str| {
        if !keys.iter().any(|known| known == key) {
            keys.push(key.to_string());
        }
    };
    // Blank out what the first pass consumed so `{{a}}` is not seen again as `{a}`.
    let remainder = scan(template, "{{", "}}", |key, _raw| {
        collect(key);
        String::new()
    });
    scan(&remainder, "{", "}", |key, raw| {
        collect(key);
        raw.to_string()
    });
    keys
}

fn substitute(input: &str, open: &str, close: &str, fields: &Fields) -> String {
    scan(input, open, close, |key, raw| match fields.get(key) {
        Some(value) => value.to_string(),
        None => raw.to_string(),
    })
}

/// Walks `input` left to right, handing every `open key close` match to
/// `replace` together with its raw text. Text that is not part of a match is
/// copied as is. Replacement output is never scanned again.
fn scan<F>(input: &str, open: &str, close: &str, mut replace: F) -> String
where
    F: FnMut(&str, &str) -> String,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(open) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + open.len()..];

        // The key runs up to the first closing brace and must be non-empty.
        let matched = after_open
            .find('}')
            .filter(|&end| end > 0 && after_open[end..].starts_with(close));

        match matched {
            Some(end) => {
                let raw_len = open.len() + end + close.len();
                let raw = &rest[start..start + raw_len];
                let key = after_open[..end].trim();
                out.push_str(&replace(key, raw));
                rest = &rest[start + raw_len..];
            }
            None => {
                // Not a placeholder here; keep the first char and retry after it.
                let skip = rest[start..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&rest[start..start + skip]);
                rest = &rest[start + skip..];
            }
        }
    }

    out.push_str(rest);
    out
}
