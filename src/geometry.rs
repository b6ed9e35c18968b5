// src/geometry.rs
//
// Pure geometry resolution: the formula mini-language and anchor/gravity
// alignment math. No side effects, no I/O - everything here is a plain
// function over numbers and strings, called by the constraint hooks.

use crate::error::PipeError;

/// Characters recognized as formula operators.
///
/// - `-` deducts `2 * operand` (box-model deduction, both sides)
/// - `x` multiplies by `operand` as a clamped percentage
/// - `a` adds `2 * operand`
/// - `r` rounds down to the nearest multiple of `operand`
const OPERATORS: [char; 4] = ['-', 'x', 'a', 'r'];

/// Apply a formula to a base value.
///
/// A formula is a succession of operators and operands like `x50-20r2`. If it
/// is prefixed by a numeric literal, that literal replaces `base`: `100-10`
/// gives `80` no matter what `base` is.
///
/// A spec that parses as a plain number short-circuits before tokenization.
/// The parsed float must round-trip to the exact input string - otherwise a
/// lenient parse would happily read `100-10` as `100` and swallow the `-`
/// operator.
pub fn compute_formula(spec: &str, base: f64) -> Result<f64, PipeError> {
    if let Ok(plain) = spec.parse::<f64>() {
        if format!("{plain}") == spec {
            return Ok(plain);
        }
    }

    let tokens = tokenize(spec);
    let len = tokens.len();

    // A valid formula is composed of pairs of operators and operands plus an
    // optional leading value (2n+1 tokens).
    if len % 2 == 0 {
        return Err(PipeError::formula(spec.to_owned()));
    }

    // If a number was prepended, it overrides the base.
    let mut value = match tokens[0].parse::<f64>() {
        Ok(v) => v,
        Err(_) if len == 1 => return Err(PipeError::formula(spec.to_owned())),
        Err(_) => base,
    };

    for pair in tokens[1..].chunks(2) {
        let op = &pair[0];
        let operand: f64 = pair[1]
            .parse()
            .map_err(|_| PipeError::formula_operand(pair[1].clone(), spec.to_owned()))?;

        match op.as_str() {
            "-" => value -= 2.0 * operand,
            "a" => value += 2.0 * operand,
            "x" => value *= percent_factor(operand),
            "r" => {
                if operand == 0.0 {
                    return Err(PipeError::formula_operand(pair[1].clone(), spec.to_owned()));
                }
                value = round_down(value, operand);
            }
            other => {
                return Err(PipeError::formula_operand(other.to_owned(), spec.to_owned()));
            }
        }
    }

    Ok(value)
}

/// Split a formula into alternating operand/operator tokens, keeping the
/// operator characters as their own tokens (mirrors a split-with-capture).
fn tokenize(spec: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in spec.chars() {
        if OPERATORS.contains(&c) {
            tokens.push(std::mem::take(&mut current));
            tokens.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    tokens.push(current);
    tokens
}

/// Top-left origin of a box of `width` x `height` aligned to the reference
/// point `(x, y)` according to an anchor/gravity code.
///
/// Codes are one of `tl, t, tr, r, br, b, bl, l`, order- and
/// case-insensitive. Anything else (missing, empty, longer than two
/// characters, unknown letters) centers that axis - the safe fallback.
pub fn resolve_anchor_origin(code: Option<&str>, width: f64, height: f64, x: f64, y: f64) -> (f64, f64) {
    let code = match code {
        Some(c) if !c.is_empty() && c.len() <= 2 => c.to_lowercase(),
        _ => {
            return (x - (width / 2.0).round(), y - (height / 2.0).round());
        }
    };

    let ox = if code.contains('l') {
        x
    } else if code.contains('r') {
        x - width
    } else {
        x - (width / 2.0).round()
    };

    let oy = if code.contains('t') {
        y
    } else if code.contains('b') {
        y - height
    } else {
        y - (height / 2.0).round()
    };

    (ox, oy)
}

/// Coordinates of the anchor point itself inside a `width` x `height` box.
///
/// This is the mirror of [`resolve_anchor_origin`]: computing the origin
/// around `(0, 0)` yields the point's coordinates by central symmetry, so we
/// negate them back.
pub fn resolve_anchor_point(code: Option<&str>, width: f64, height: f64) -> (f64, f64) {
    let (ox, oy) = resolve_anchor_origin(code, width, height, 0.0, 0.0);
    (-ox, -oy)
}

/// Convert a percentage operand to a factor in `[0, 1]`.
pub fn percent_factor(value: f64) -> f64 {
    clamp(value / 100.0, 0.0, 1.0)
}

/// Parse a trailing-`%` percentage string into a factor in `[0, 1]`.
///
/// This is a separate, simpler grammar than formulas: `"50%"` -> `0.5`.
/// Unparseable input yields `0`.
pub fn percentage(spec: &str) -> f64 {
    let trimmed = spec.trim_end_matches('%');
    percent_factor(trimmed.parse::<f64>().unwrap_or(0.0))
}

/// Round `value` down to the nearest multiple of `multiple`.
pub fn round_down(value: f64, multiple: f64) -> f64 {
    (value / multiple).floor() * multiple
}

/// Clamp `value` into `[min, max]`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod formula_tests {
        use super::*;

        #[test]
        fn plain_numeric_string_is_idempotent() {
            assert_eq!(compute_formula("100", 0.0).unwrap(), 100.0);
            assert_eq!(compute_formula("100.5", 0.0).unwrap(), 100.5);
            assert_eq!(compute_formula("-10", 999.0).unwrap(), -10.0);
        }

        #[test]
        fn box_model_subtraction() {
            assert_eq!(compute_formula("100-10", 0.0).unwrap(), 80.0);
            assert_eq!(compute_formula("100-10-10-5", 0.0).unwrap(), 50.0);
        }

        #[test]
        fn addition_is_double_sided() {
            assert_eq!(compute_formula("100a10", 0.0).unwrap(), 120.0);
        }

        #[test]
        fn percentage_multiplication_chains() {
            assert_eq!(compute_formula("100x10x10", 0.0).unwrap(), 1.0);
            assert_eq!(compute_formula("100x50", 0.0).unwrap(), 50.0);
        }

        #[test]
        fn percentage_operand_clamps_above_100() {
            // x200 clamps to a factor of 1, never upscales
            assert_eq!(compute_formula("100x200", 0.0).unwrap(), 100.0);
        }

        #[test]
        fn round_down_to_multiple() {
            assert_eq!(compute_formula("100r66", 0.0).unwrap(), 66.0);
            assert_eq!(compute_formula("100r66r20", 0.0).unwrap(), 60.0);
        }

        #[test]
        fn base_is_used_without_leading_literal() {
            // no leading literal: the reference value is the base
            assert_eq!(compute_formula("-10", 100.0).unwrap(), -10.0); // plain number wins
            assert_eq!(compute_formula("x50", 100.0).unwrap(), 50.0);
            assert_eq!(compute_formula("a10", 100.0).unwrap(), 120.0);
        }

        #[test]
        fn leading_literal_overrides_base() {
            assert_eq!(compute_formula("200x50", 100.0).unwrap(), 100.0);
        }

        #[test]
        fn malformed_formula_fails_with_spec_in_message() {
            let err = compute_formula("woot", 0.0).unwrap_err();
            assert!(err.to_string().contains("woot"));
        }

        #[test]
        fn missing_operand_fails() {
            assert!(compute_formula("100-", 0.0).is_err());
            assert!(compute_formula("100--10", 0.0).is_err());
        }

        #[test]
        fn round_to_zero_multiple_fails() {
            assert!(compute_formula("100r0", 0.0).is_err());
        }

        #[test]
        fn scientific_notation_does_not_shortcircuit_but_still_resolves() {
            // "1e2" does not round-trip through the canonical float form, so
            // it goes through the tokenizer as a leading literal.
            assert_eq!(compute_formula("1e2", 0.0).unwrap(), 100.0);
        }
    }

    mod anchor_tests {
        use super::*;

        const CODES: [&str; 8] = ["tl", "t", "tr", "r", "br", "b", "bl", "l"];

        #[test]
        fn center_fallback_for_invalid_codes() {
            // missing, empty, too long, and unknown letters all center
            for code in [None, Some(""), Some("xyz"), Some("q")] {
                let origin = resolve_anchor_origin(code, 10.0, 10.0, 50.0, 50.0);
                assert_eq!(origin, (45.0, 45.0), "code {code:?}");
            }
        }

        #[test]
        fn corner_codes() {
            assert_eq!(resolve_anchor_origin(Some("tl"), 4.0, 4.0, 0.0, 0.0), (0.0, 0.0));
            assert_eq!(resolve_anchor_origin(Some("br"), 4.0, 4.0, 8.0, 8.0), (4.0, 4.0));
            assert_eq!(resolve_anchor_origin(Some("tr"), 4.0, 4.0, 8.0, 0.0), (4.0, 0.0));
            assert_eq!(resolve_anchor_origin(Some("bl"), 4.0, 4.0, 0.0, 8.0), (0.0, 4.0));
        }

        #[test]
        fn edge_codes_center_the_other_axis() {
            assert_eq!(resolve_anchor_origin(Some("t"), 4.0, 4.0, 8.0, 0.0), (6.0, 0.0));
            assert_eq!(resolve_anchor_origin(Some("l"), 4.0, 4.0, 0.0, 8.0), (0.0, 6.0));
        }

        #[test]
        fn codes_are_order_insensitive() {
            assert_eq!(
                resolve_anchor_origin(Some("tl"), 6.0, 4.0, 3.0, 7.0),
                resolve_anchor_origin(Some("lt"), 6.0, 4.0, 3.0, 7.0)
            );
        }

        #[test]
        fn codes_are_case_insensitive() {
            assert_eq!(
                resolve_anchor_origin(Some("BR"), 6.0, 4.0, 3.0, 7.0),
                resolve_anchor_origin(Some("br"), 6.0, 4.0, 3.0, 7.0)
            );
        }

        #[test]
        fn anchor_point_is_negated_origin() {
            // origin + point == reference, for the (0,0)-based relationship
            for code in CODES {
                let (ox, oy) = resolve_anchor_origin(Some(code), 8.0, 6.0, 0.0, 0.0);
                let (px, py) = resolve_anchor_point(Some(code), 8.0, 6.0);
                assert_eq!(ox + px, 0.0, "x symmetry broken for {code}");
                assert_eq!(oy + py, 0.0, "y symmetry broken for {code}");
            }
        }

        #[test]
        fn anchor_point_values() {
            assert_eq!(resolve_anchor_point(Some("tl"), 8.0, 8.0), (0.0, 0.0));
            assert_eq!(resolve_anchor_point(Some("br"), 8.0, 8.0), (8.0, 8.0));
            assert_eq!(resolve_anchor_point(None, 8.0, 8.0), (4.0, 4.0));
        }
    }

    mod scalar_tests {
        use super::*;

        #[test]
        fn percentage_strings() {
            assert_eq!(percentage("50%"), 0.5);
            assert_eq!(percentage("150%"), 1.0);
            assert_eq!(percentage("0%"), 0.0);
            assert_eq!(percentage("garbage"), 0.0);
        }

        #[test]
        fn round_down_basics() {
            assert_eq!(round_down(100.0, 66.0), 66.0);
            assert_eq!(round_down(65.0, 66.0), 0.0);
            assert_eq!(round_down(132.0, 66.0), 132.0);
        }

        #[test]
        fn clamp_basics() {
            assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
            assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
            assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
        }
    }
}
