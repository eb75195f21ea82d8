/// Returns `true` if `name` is a valid Python identifier and not a keyword.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    if !(first.is_alphabetic() || first == '_') {
        return false;
    }

    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }

    !is_keyword(name)
}

/// Returns `true` if `name` is a Python keyword (soft keywords excluded).
pub fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "False"
            | "None"
            | "True"
            | "and"
            | "as"
            | "assert"
            | "async"
            | "await"
            | "break"
            | "class"
            | "continue"
            | "def"
            | "del"
            | "elif"
            | "else"
            | "except"
            | "finally"
            | "for"
            | "from"
            | "global"
            | "if"
            | "import"
            | "in"
            | "is"
            | "lambda"
            | "nonlocal"
            | "not"
            | "or"
            | "pass"
            | "raise"
            | "return"
            | "try"
            | "while"
            | "with"
            | "yield"
    )
}

#[cfg(test)]
mod tests {
    use super::{is_identifier, is_keyword};

    #[test]
    fn identifiers() {
        assert!(is_identifier("foo"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("snake_case_2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2000"));
        assert!(!is_identifier("foo-bar"));
        assert!(!is_identifier("class"));
    }

    #[test]
    fn soft_keywords_are_identifiers() {
        assert!(!is_keyword("match"));
        assert!(!is_keyword("type"));
        assert!(is_identifier("match"));
    }
}
