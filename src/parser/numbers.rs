//! Whitespace separated value lists
//!
//! Array content may reach a parser in several text runs, and a run may end
//! in the middle of a token. [`ListParser`] keeps the unfinished tail of
//! each run and parses it together with the next one.

use crate::error::{Error, Result};
use std::str::FromStr;

/// Value type that can appear in a COLLADA list
pub trait ListValue: Sized {
    /// Name used in parse error messages
    const TYPE_NAME: &'static str;

    /// Parse one token
    fn parse_token(token: &str) -> Option<Self>;
}

impl ListValue for f64 {
    const TYPE_NAME: &'static str = "floating-point number";

    fn parse_token(token: &str) -> Option<Self> {
        f64::from_str(token).ok()
    }
}

impl ListValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn parse_token(token: &str) -> Option<Self> {
        i64::from_str(token).ok()
    }
}

impl ListValue for u32 {
    const TYPE_NAME: &'static str = "non-negative integer";

    fn parse_token(token: &str) -> Option<Self> {
        u32::from_str(token).ok()
    }
}

impl ListValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn parse_token(token: &str) -> Option<Self> {
        match token {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ListValue for String {
    const TYPE_NAME: &'static str = "name";

    fn parse_token(token: &str) -> Option<Self> {
        Some(token.to_string())
    }
}

/// Incremental parser for one list element
#[derive(Debug)]
pub struct ListParser<T> {
    element: &'static str,
    carry: String,
    values: Vec<T>,
}

impl<T: ListValue> ListParser<T> {
    /// New parser; `element` names the list in error messages
    pub fn new(element: &'static str) -> Self {
        Self {
            element,
            carry: String::new(),
            values: Vec::new(),
        }
    }

    /// New parser with room for `capacity` values
    pub fn with_capacity(element: &'static str, capacity: usize) -> Self {
        Self {
            element,
            carry: String::new(),
            values: Vec::with_capacity(capacity),
        }
    }

    fn push_token(&mut self, token: &str) -> Result<()> {
        match T::parse_token(token) {
            Some(value) => {
                self.values.push(value);
                Ok(())
            }
            None => Err(Error::parse_error_with_context(
                &format!("{} value", self.element),
                token,
                T::TYPE_NAME,
            )),
        }
    }

    /// Feed one text run
    pub fn feed(&mut self, text: &str) -> Result<()> {
        let mut text = text;

        if !self.carry.is_empty() {
            // Complete the token cut off by the previous run
            let end = text
                .find(|c: char| c.is_ascii_whitespace())
                .unwrap_or(text.len());
            self.carry.push_str(&text[..end]);
            text = &text[end..];
            if text.is_empty() {
                return Ok(());
            }
            let token = std::mem::take(&mut self.carry);
            self.push_token(&token)?;
        }

        let ends_mid_token = text
            .chars()
            .last()
            .is_some_and(|c| !c.is_ascii_whitespace());
        let mut tokens = text.split_ascii_whitespace().peekable();
        while let Some(token) = tokens.next() {
            if ends_mid_token && tokens.peek().is_none() {
                self.carry.push_str(token);
            } else {
                self.push_token(token)?;
            }
        }
        Ok(())
    }

    /// Values parsed so far, excluding an unfinished token
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value was parsed yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.carry.is_empty()
    }

    /// Finish the list and return its values
    pub fn finish(mut self) -> Result<Vec<T>> {
        if !self.carry.is_empty() {
            let token = std::mem::take(&mut self.carry);
            self.push_token(&token)?;
        }
        Ok(self.values)
    }
}

/// Parse a complete list in one go
pub fn parse_list<T: ListValue>(element: &'static str, text: &str) -> Result<Vec<T>> {
    let mut parser = ListParser::new(element);
    parser.feed(text)?;
    parser.finish()
}

/// Parse a single number
pub fn parse_float(element: &str, text: &str) -> Result<f64> {
    let text = text.trim();
    f64::parse_token(text)
        .ok_or_else(|| Error::parse_error_with_context(element, text, f64::TYPE_NAME))
}

/// Parse exactly `N` numbers
pub fn parse_fixed<const N: usize>(element: &'static str, text: &str) -> Result<[f64; N]> {
    let values: Vec<f64> = parse_list(element, text)?;
    values.try_into().map_err(|values: Vec<f64>| {
        Error::InvalidModel(format!(
            "<{}> holds {} values, expected {}",
            element,
            values.len(),
            N
        ))
    })
}

/// Number of values `count` items of `size` values take
///
/// Counts come from attributes, so the product may not fit.
pub fn value_count(element: &str, count: usize, size: usize) -> Result<usize> {
    count.checked_mul(size).ok_or_else(|| {
        Error::InvalidModel(format!(
            "<{}> count {} of {} values each is out of range",
            element, count, size
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_count_overflow() {
        assert_eq!(value_count("accessor", 4, 3).unwrap(), 12);
        let err = value_count("accessor", usize::MAX, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidModel(_)));
        assert!(err.to_string().contains("accessor"));
    }

    #[test]
    fn test_parse_floats() {
        let values: Vec<f64> = parse_list("float_array", " 1 2.5\n-3e2\t0 ").unwrap();
        assert_eq!(values, vec![1.0, 2.5, -300.0, 0.0]);
    }

    #[test]
    fn test_special_float_tokens() {
        let values: Vec<f64> = parse_list("float_array", "INF -INF NaN").unwrap();
        assert!(values[0].is_infinite() && values[0] > 0.0);
        assert!(values[1].is_infinite() && values[1] < 0.0);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_empty_list() {
        let values: Vec<f64> = parse_list("float_array", "").unwrap();
        assert!(values.is_empty());
        let parser: ListParser<f64> = ListParser::new("float_array");
        assert!(parser.finish().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_token_is_error() {
        let err = parse_list::<f64>("float_array", "1.0 abc 3").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
        assert!(err.to_string().contains("abc"));

        assert!(parse_list::<u32>("p", "1 -2").is_err());
        assert!(parse_list::<f64>("float_array", "1,5").is_err());
    }

    #[test]
    fn test_token_split_across_runs() {
        let mut parser = ListParser::<f64>::new("float_array");
        parser.feed("1.0 2.").unwrap();
        assert_eq!(parser.len(), 1);
        parser.feed("5 3").unwrap();
        parser.feed("0 ").unwrap();
        assert_eq!(parser.finish().unwrap(), vec![1.0, 2.5, 30.0]);
    }

    #[test]
    fn test_run_boundary_at_whitespace() {
        let mut parser = ListParser::<i64>::new("p");
        parser.feed("1 2 ").unwrap();
        parser.feed(" 3").unwrap();
        assert_eq!(parser.finish().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_carry_then_whitespace_only_run() {
        let mut parser = ListParser::<u32>::new("vcount");
        parser.feed("4 1").unwrap();
        parser.feed("2").unwrap();
        parser.feed("   ").unwrap();
        assert_eq!(parser.finish().unwrap(), vec![4, 12]);
    }

    #[test]
    fn test_bools_and_names() {
        assert_eq!(
            parse_list::<bool>("bool_array", "true 0 1 false").unwrap(),
            vec![true, false, true, false]
        );
        assert_eq!(
            parse_list::<String>("Name_array", "LINEAR BEZIER").unwrap(),
            vec!["LINEAR".to_string(), "BEZIER".to_string()]
        );
        assert!(parse_list::<bool>("bool_array", "yes").is_err());
    }

    #[test]
    fn test_parse_fixed() {
        let v: [f64; 3] = parse_fixed("translate", "1 2 3").unwrap();
        assert_eq!(v, [1.0, 2.0, 3.0]);
        assert!(parse_fixed::<3>("translate", "1 2").is_err());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("xfov", " 45.0 ").unwrap(), 45.0);
        assert!(parse_float("xfov", "wide").is_err());
    }
}
