//! `${VAR}` and `${VAR:-fallback}` expansion over raw config text.

/// Expand placeholders from the process environment.
///
/// A variable that is unset and has no fallback stays verbatim, so the
/// validator still sees (and can report) the placeholder.
pub fn substitute_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body_and_tail = &rest[start + 2..];
        let Some(end) = body_and_tail.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let body = &body_and_tail[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        // `:-` also replaces a set-but-empty variable, as in the shell.
        let value = if name.is_empty() {
            None
        } else {
            lookup(name).filter(|v| fallback.is_none() || !v.is_empty())
        };
        match (value, fallback) {
            (Some(value), _) => out.push_str(&value),
            (None, Some(fallback)) if !name.is_empty() => out.push_str(fallback),
            _ => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &body_and_tail[end + 1..];
    }

    out.push_str(rest);
    out
}
