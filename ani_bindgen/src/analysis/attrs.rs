//! Attribute argument checking.

use crate::error::Diagnostics;
use crate::ir::{Attr, AttrValue};

fn kind_name(letter: char) -> &'static str {
    match letter {
        's' => "str",
        'i' => "int",
        'f' => "float",
        'b' => "bool",
        _ => "unknown",
    }
}

/// Check `attr` against an argument pattern such as `"s"` or `"ss*"`.
///
/// Letters are `s`, `i`, `f` and `b`; a trailing `*` lets the letter before
/// it repeat, turning the arity check into a lower bound. Reports at most
/// one diagnostic.
pub fn check_attr_args(diags: &mut Diagnostics, attr: &Attr, pattern: &str) -> bool {
    let (fixed, repeat): (Vec<char>, Option<char>) = match pattern.strip_suffix('*') {
        Some(head) => {
            let mut letters: Vec<char> = head.chars().collect();
            let repeat = letters.pop();
            (letters, repeat)
        }
        None => (pattern.chars().collect(), None),
    };

    let args = &attr.args;
    let loc = attr.loc.as_ref();
    if repeat.is_none() && args.len() != fixed.len() {
        diags.error(
            format!("@{} expects exactly {} arguments", attr.name, fixed.len()),
            loc,
        );
        return false;
    }
    if repeat.is_some() && args.len() < fixed.len() {
        diags.error(
            format!("@{} expects at least {} arguments", attr.name, fixed.len()),
            loc,
        );
        return false;
    }

    for (i, arg) in args.iter().enumerate() {
        let expected = match fixed.get(i).copied().or(repeat) {
            Some(letter) => letter,
            None => break,
        };
        if arg.pattern_char() != expected {
            diags.error(
                format!(
                    "@{} expects {}th argument to be {}",
                    attr.name,
                    i + 1,
                    kind_name(expected)
                ),
                loc,
            );
            return false;
        }
    }
    true
}

/// Optional single string argument, as taken by `@get`, `@overload` and
/// friends. `Err` means the attribute was malformed and already reported.
pub(crate) fn optional_str_arg(diags: &mut Diagnostics, attr: &Attr) -> Result<Option<String>, ()> {
    if attr.args.is_empty() {
        return Ok(None);
    }
    if check_attr_args(diags, attr, "s") {
        Ok(attr.str_arg(0).map(String::from))
    } else {
        Err(())
    }
}

/// Every string argument, when the whole attribute matches `pattern`
pub(crate) fn str_args(diags: &mut Diagnostics, attr: &Attr, pattern: &str) -> Option<Vec<String>> {
    if !check_attr_args(diags, attr, pattern) {
        return None;
    }
    Some(
        attr.args
            .iter()
            .filter_map(AttrValue::as_str)
            .map(String::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, args: Vec<AttrValue>) -> Attr {
        Attr::new(name, args)
    }

    fn s(v: &str) -> AttrValue {
        AttrValue::Str(v.to_string())
    }

    #[test]
    fn test_exact_arity() {
        let mut diags = Diagnostics::new();
        assert!(check_attr_args(&mut diags, &attr("static", vec![s("Math")]), "s"));
        assert!(!check_attr_args(&mut diags, &attr("static", vec![]), "s"));
        assert_eq!(diags.items()[0].message, "@static expects exactly 1 arguments");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_repeat_marker() {
        let mut diags = Diagnostics::new();
        let ns = attr("namespace", vec![s("geo"), s("a.b"), s("c")]);
        assert!(check_attr_args(&mut diags, &ns, "ss*"));
        assert!(check_attr_args(&mut diags, &attr("namespace", vec![s("geo")]), "ss*"));
        assert!(!check_attr_args(&mut diags, &attr("namespace", vec![]), "ss*"));
        assert_eq!(diags.items()[0].message, "@namespace expects at least 1 arguments");
    }

    #[test]
    fn test_argument_kind() {
        let mut diags = Diagnostics::new();
        let bad = attr("namespace", vec![s("geo"), AttrValue::Int(2)]);
        assert!(!check_attr_args(&mut diags, &bad, "ss*"));
        assert_eq!(diags.items()[0].message, "@namespace expects 2th argument to be str");

        let flag = attr("flag", vec![AttrValue::Float(1.0)]);
        assert!(!check_attr_args(&mut diags, &flag, "b"));
        assert_eq!(diags.items()[1].message, "@flag expects 1th argument to be bool");
    }

    #[test]
    fn test_optional_str_arg() {
        let mut diags = Diagnostics::new();
        assert_eq!(optional_str_arg(&mut diags, &attr("get", vec![])), Ok(None));
        assert_eq!(
            optional_str_arg(&mut diags, &attr("get", vec![s("size")])),
            Ok(Some("size".to_string()))
        );
        assert_eq!(
            optional_str_arg(&mut diags, &attr("get", vec![AttrValue::Bool(true)])),
            Err(())
        );
        assert_eq!(diags.len(), 1);
    }
}
