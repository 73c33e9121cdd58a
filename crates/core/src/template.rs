//! Positional placeholder filling for NLU reply templates.
//!
//! Reply fragments such as `["Your wait is", "{0}", "minutes"]` are joined
//! with single spaces and every `{n}` token is replaced by `args[n]`. Tokens
//! without a matching argument, or with a zero-padded index such as `{01}`,
//! are left in place.

pub fn fill_placeholders(fragments: &[String], args: &[String]) -> String {
    let text = fragments.join(" ");
    let mut output = String::with_capacity(text.len());
    let mut rest = text.as_str();

    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let digits = after.bytes().take_while(|byte| byte.is_ascii_digit()).count();

        if digits > 0 && after.as_bytes().get(digits) == Some(&b'}') {
            let token = &rest[start..start + digits + 2];
            let index = &after[..digits];
            let value = if digits > 1 && index.starts_with('0') {
                None
            } else {
                index.parse::<usize>().ok().and_then(|index| args.get(index))
            };
            match value {
                Some(value) => output.push_str(value),
                None => output.push_str(token),
            }
            rest = &after[digits + 1..];
        } else {
            output.push('{');
            rest = after;
        }
    }

    output.push_str(rest);
    output
}

/// Returns a single filled fragment, or `original` unchanged when either the
/// template or the arguments are absent.
pub fn replace_params(
    original: Option<Vec<String>>,
    args: Option<&[String]>,
) -> Option<Vec<String>> {
    match (original, args) {
        (Some(fragments), Some(args)) => Some(vec![fill_placeholders(&fragments, args)]),
        (original, _) => original,
    }
}
