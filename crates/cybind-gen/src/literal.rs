//! Translation of C/C++ initializer tokens into Python literals.
//!
//! Every emitter renders default arguments through [`translate_tokens`], so a
//! given initializer always reads the same in the pyx and pyi outputs.

/// Tokens with a fixed Python spelling.
const LITERALS: &[(&str, &str)] = &[
    ("NULL", "None"),
    ("nullptr", "None"),
    ("true", "True"),
    ("false", "False"),
    ("FLT_MAX", "3.402823466e+38"),
    ("FLT_MIN", "1.175494351e-38"),
    ("DBL_MAX", "1.7976931348623158e+308"),
    ("DBL_MIN", "2.2250738585072014e-308"),
];

/// Translate a single token.
pub fn translate_token(token: &str) -> String {
    if let Some((_, python)) = LITERALS.iter().find(|(c, _)| *c == token) {
        return (*python).to_string();
    }
    if token.starts_with('"') {
        return format!("b{}", token);
    }
    if let Some(number) = strip_float_suffix(token) {
        return number.to_string();
    }
    token.to_string()
}

/// Translate and join the tokens of an initializer expression.
pub fn translate_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    tokens
        .into_iter()
        .map(translate_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `1.5f`, `2.f`, `1e3f` lose the `f`. Hex literals such as `0xff` are left
/// alone since their trailing `f` is a digit.
fn strip_float_suffix(token: &str) -> Option<&str> {
    let body = token.strip_suffix(['f', 'F'])?;
    if body.starts_with("0x") || body.starts_with("0X") {
        return None;
    }
    let last = body.chars().last()?;
    if !(last.is_ascii_digit() || last == '.') {
        return None;
    }
    let numeric = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    numeric.then_some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_literals() {
        assert_eq!(translate_token("FLT_MAX"), "3.402823466e+38");
        assert_eq!(translate_token("FLT_MIN"), "1.175494351e-38");
        assert_eq!(translate_token("true"), "True");
        assert_eq!(translate_token("false"), "False");
        assert_eq!(translate_token("NULL"), "None");
        assert_eq!(translate_token("nullptr"), "None");
    }

    #[test]
    fn test_float_suffix() {
        assert_eq!(translate_token("1.5f"), "1.5");
        assert_eq!(translate_token("2.f"), "2.");
        assert_eq!(translate_token("1e-3f"), "1e-3");
        assert_eq!(translate_token("0xff"), "0xff");
        assert_eq!(translate_token("buf"), "buf");
    }

    #[test]
    fn test_strings_become_bytes() {
        assert_eq!(translate_token("\"%.3f\""), "b\"%.3f\"");
    }

    #[test]
    fn test_join() {
        assert_eq!(translate_tokens(["-", "1.0f"]), "- 1.0");
        assert_eq!(
            translate_tokens(["ImVec2", "(", "0", ",", "0", ")"]),
            "ImVec2 ( 0 , 0 )"
        );
    }
}
