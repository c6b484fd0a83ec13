//! S-expression reader.
//!
//! Reading happens in two steps. [`parse_data`] turns text into owned
//! [`Datum`] trees without touching any environment, and [`Datum::to_value`]
//! interns the symbols of one datum in the current namespace of an
//! [`Environment`]. Keeping the steps apart lets a caller intern each top-level
//! form right before evaluating it, so `(in-namespace ...)` affects the forms
//! that follow it.
//!
//! ```text
//! 42  -7  2.5  1e3             numbers
//! "a\nb"  #\a  #\Space         strings and characters
//! foo  :key  lib:name  lib::x  symbols (upper-cased), keywords, qualified names
//! (a b . c)                    proper and dotted lists
//! 'x  `x  ,x  ,@x              quote, backquote, unquote and splice
//! ; line   #| block |#         comments
//! ```

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{recognize, value},
    error::ErrorKind,
    multi::many0,
    sequence::pair,
};

use crate::ast::{ListBuilder, Number, NumberType, SymbolRef, Value};
use crate::evaluator::Environment;
use crate::{Error, MAX_PARSE_DEPTH};

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Skip `;` line comments and `#| |#` block comments
    pub handle_comments: bool,
    /// Maximum nesting of lists and quote prefixes
    pub max_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            handle_comments: true,
            max_depth: MAX_PARSE_DEPTH,
        }
    }
}

/// Symbol token as written, before interning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolName {
    Plain(String),
    /// `:name`
    Keyword(String),
    /// `ns:name`, must be exported from `ns`
    Exported { namespace: String, name: String },
    /// `ns::name`, interned in `ns` on demand
    Interned { namespace: String, name: String },
}

impl SymbolName {
    fn resolve(&self, env: &mut Environment) -> Result<SymbolRef, Error> {
        match self {
            SymbolName::Plain(name) => env.intern_symbol(name),
            SymbolName::Keyword(name) => env.intern_keyword(name),
            SymbolName::Exported { namespace, name } => {
                env.find_exported_symbol_in_namespace(namespace, name)
            }
            SymbolName::Interned { namespace, name } => {
                env.find_interned_symbol_in_namespace(namespace, name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Quote,
    Backquote,
    Unquote,
    Splice,
}

/// Parsed form, independent of any environment
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Integer(NumberType),
    Float(f64),
    String(String),
    Character(char),
    Symbol(SymbolName),
    /// Elements and the optional dotted tail
    List(Vec<Datum>, Option<Box<Datum>>),
    Quoted(QuoteKind, Box<Datum>),
}

impl Datum {
    /// Intern the symbols of this datum and build the runtime value
    pub fn to_value(&self, env: &mut Environment) -> Result<Value, Error> {
        Ok(match self {
            Datum::Integer(n) => Value::Number(Number::Int(*n)),
            Datum::Float(x) => Value::Number(Number::Float(*x)),
            Datum::String(s) => Value::string(s),
            Datum::Character(c) => Value::Character(*c),
            Datum::Symbol(name) => {
                let sym = name.resolve(env)?;
                // NIL and T read as their values
                match sym.value() {
                    Some(value) => value.clone(),
                    None => Value::Symbol(sym),
                }
            }
            Datum::List(items, tail) => {
                let mut builder = ListBuilder::new();
                for item in items {
                    builder.push(item.to_value(env)?);
                }
                match tail {
                    Some(tail) => builder.finish_with_tail(tail.to_value(env)?),
                    None => builder.finish(),
                }
            }
            Datum::Quoted(kind, inner) => {
                let symbols = env.system_symbols();
                let operator = match kind {
                    QuoteKind::Quote => symbols.quote.clone(),
                    QuoteKind::Backquote => symbols.backquote.clone(),
                    QuoteKind::Unquote => symbols.unquote.clone(),
                    QuoteKind::Splice => symbols.splice.clone(),
                };
                Value::list([Value::Symbol(operator), inner.to_value(env)?])
            }
        })
    }
}

/// Position in the nesting while parsing
#[derive(Clone, Copy)]
struct ReadState<'c> {
    config: &'c ReaderConfig,
    depth: usize,
    backquotes: usize,
}

impl<'c> ReadState<'c> {
    fn new(config: &'c ReaderConfig) -> Self {
        ReadState {
            config,
            depth: 0,
            backquotes: 0,
        }
    }

    fn nested(self) -> Self {
        ReadState {
            depth: self.depth + 1,
            ..self
        }
    }
}

fn failure(input: &str, kind: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, kind))
}

/// Convert nom parsing errors to user-friendly messages
fn parse_error_to_message(
    input: &str,
    error: nom::Err<nom::error::Error<&str>>,
    config: &ReaderConfig,
) -> String {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::Char if e.input.is_empty() => "Unexpected end of input".into(),
                ErrorKind::Char => format!("Expected character at position {position}"),
                ErrorKind::TooLarge => format!(
                    "Expression too deeply nested (max depth: {})",
                    config.max_depth
                ),
                ErrorKind::Verify => {
                    format!("unquote outside of a backquote at position {position}")
                }
                ErrorKind::Digit => format!("integer literal out of range at position {position}"),
                ErrorKind::TakeUntil => "unterminated block comment".into(),
                _ => {
                    if position < input.len() {
                        let remaining_chars: String =
                            input.chars().skip(position).take(10).collect();
                        format!("Invalid syntax near '{remaining_chars}'")
                    } else {
                        "Unexpected end of input".into()
                    }
                }
            }
        }
        nom::Err::Incomplete(_) => "Incomplete input".into(),
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || "()'`\",;".contains(c)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), take_while(|c: char| c != '\n'))).parse(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    let (rest, _) = tag("#|").parse(input)?;
    match take_until::<_, _, nom::error::Error<&str>>("|#").parse(rest) {
        Ok((rest, body)) => Ok((&rest[2..], body)),
        Err(_) => Err(failure(input, ErrorKind::TakeUntil)),
    }
}

/// Skip whitespace and, when enabled, comments
fn skip_space<'a>(input: &'a str, config: &ReaderConfig) -> IResult<&'a str, ()> {
    if config.handle_comments {
        value((), many0(alt((multispace1, line_comment, block_comment)))).parse(input)
    } else {
        value((), multispace0).parse(input)
    }
}

/// Parse a string literal
fn parse_string(input: &str) -> IResult<&str, Datum> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut chars = String::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => return Ok((char_iter.as_str(), Datum::String(chars))),
            Some('\\') => {
                match char_iter.next() {
                    Some('n') => chars.push('\n'),
                    Some('t') => chars.push('\t'),
                    Some('r') => chars.push('\r'),
                    Some('\\') => chars.push('\\'),
                    Some('"') => chars.push('"'),
                    // Unknown or incomplete escape sequence
                    _ => return Err(failure(remaining, ErrorKind::Escaped)),
                }
                remaining = char_iter.as_str();
            }
            Some(ch) => {
                chars.push(ch);
                remaining = char_iter.as_str();
            }
            None => return Err(failure(remaining, ErrorKind::Char)),
        }
    }
}

/// Parse a character literal: `#\a`, `#\(` or a name such as `#\Space`
fn parse_character(input: &str) -> IResult<&str, Datum> {
    let (input, _) = tag("#\\").parse(input)?;
    let (rest, name) = take_while(|c: char| !is_delimiter(c)).parse(input)?;

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        // A delimiter right after the prefix is the character itself
        (None, _) => {
            let mut chars = input.chars();
            match chars.next() {
                Some(c) => Ok((chars.as_str(), Datum::Character(c))),
                None => Err(failure(input, ErrorKind::Char)),
            }
        }
        (Some(c), None) => Ok((rest, Datum::Character(c))),
        _ => {
            let c = match name.to_ascii_lowercase().as_str() {
                "space" => ' ',
                "newline" => '\n',
                "tab" => '\t',
                "return" => '\r',
                "backspace" => '\u{8}',
                "page" => '\u{c}',
                _ => return Err(failure(input, ErrorKind::Alpha)),
            };
            Ok((rest, Datum::Character(c)))
        }
    }
}

fn is_integer_text(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_float_text(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || "+-.eE".contains(c))
}

/// Split a symbol token into its namespace qualifier and name
fn symbol_name(token: &str) -> Option<SymbolName> {
    let upper = token.to_uppercase();
    if let Some(name) = upper.strip_prefix(':') {
        return (!name.is_empty() && !name.contains(':'))
            .then(|| SymbolName::Keyword(name.to_string()));
    }
    if let Some((namespace, name)) = upper.split_once("::") {
        return (!namespace.is_empty() && !name.is_empty() && !name.contains(':')).then(|| {
            SymbolName::Interned {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
        });
    }
    if let Some((namespace, name)) = upper.split_once(':') {
        return (!namespace.is_empty() && !name.is_empty() && !name.contains(':')).then(|| {
            SymbolName::Exported {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
        });
    }
    Some(SymbolName::Plain(upper))
}

/// Parse a number or a symbol
fn parse_atom(input: &str) -> IResult<&str, Datum> {
    let (rest, token) = take_while1(|c: char| !is_delimiter(c)).parse(input)?;

    if is_integer_text(token) {
        return match token.parse::<NumberType>() {
            Ok(n) => Ok((rest, Datum::Integer(n))),
            Err(_) => Err(failure(input, ErrorKind::Digit)),
        };
    }
    if is_float_text(token)
        && let Ok(x) = token.parse::<f64>()
    {
        return Ok((rest, Datum::Float(x)));
    }
    if token == "." {
        return Err(failure(input, ErrorKind::Tag));
    }
    match symbol_name(token) {
        Some(name) => Ok((rest, Datum::Symbol(name))),
        None => Err(failure(input, ErrorKind::Alpha)),
    }
}

/// A lone `.` inside a list introduces the dotted tail
fn dot_separator(input: &str) -> Option<&str> {
    let rest = input.strip_prefix('.')?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if is_delimiter(c) => Some(rest),
        Some(_) => None,
    }
}

fn parse_list<'a>(input: &'a str, state: ReadState<'_>) -> IResult<&'a str, Datum> {
    let (mut input, _) = char('(').parse(input)?;
    let mut items = Vec::new();

    loop {
        let (rest, ()) = skip_space(input, state.config)?;
        if let Some(rest) = rest.strip_prefix(')') {
            return Ok((rest, Datum::List(items, None)));
        }
        if rest.is_empty() {
            return Err(failure(rest, ErrorKind::Char));
        }
        if let Some(after_dot) = dot_separator(rest) {
            if items.is_empty() {
                return Err(failure(rest, ErrorKind::Tag));
            }
            let (after_tail, tail) = parse_datum(after_dot, state.nested())?;
            let (after_tail, ()) = skip_space(after_tail, state.config)?;
            let Some(after_close) = after_tail.strip_prefix(')') else {
                return Err(failure(after_tail, ErrorKind::Char));
            };
            return Ok((after_close, Datum::List(items, Some(Box::new(tail)))));
        }

        let (rest, item) = parse_datum(rest, state.nested())?;
        items.push(item);
        input = rest;
    }
}

/// Parse `'x`, `` `x ``, `,x` and `,@x`
fn parse_quoted<'a>(input: &'a str, state: ReadState<'_>) -> IResult<&'a str, Datum> {
    let (rest, prefix) = alt((tag("'"), tag("`"), tag(",@"), tag(","))).parse(input)?;
    let mut inner = state.nested();
    let kind = match prefix {
        "'" => QuoteKind::Quote,
        "`" => {
            inner.backquotes += 1;
            QuoteKind::Backquote
        }
        _ => {
            if state.backquotes == 0 {
                return Err(failure(input, ErrorKind::Verify));
            }
            inner.backquotes -= 1;
            if prefix == ",@" {
                QuoteKind::Splice
            } else {
                QuoteKind::Unquote
            }
        }
    };
    let (rest, datum) = parse_datum(rest, inner)?;
    Ok((rest, Datum::Quoted(kind, Box::new(datum))))
}

/// Parse one datum, skipping leading whitespace and comments
fn parse_datum<'a>(input: &'a str, state: ReadState<'_>) -> IResult<&'a str, Datum> {
    if state.depth >= state.config.max_depth {
        return Err(failure(input, ErrorKind::TooLarge));
    }
    let (input, ()) = skip_space(input, state.config)?;
    alt((
        |input| parse_quoted(input, state),
        |input| parse_list(input, state),
        parse_string,
        parse_character,
        parse_atom,
    ))
    .parse(input)
}

/// Parse every top-level datum in `source`
pub fn parse_data(source: &str, config: &ReaderConfig) -> Result<Vec<Datum>, Error> {
    let to_error = |e| Error::ParseError(parse_error_to_message(source, e, config));
    let state = ReadState::new(config);
    let mut data = Vec::new();
    let mut input = source;
    loop {
        let (rest, ()) = skip_space(input, config).map_err(to_error)?;
        if rest.is_empty() {
            return Ok(data);
        }
        let (rest, datum) = parse_datum(rest, state).map_err(to_error)?;
        data.push(datum);
        input = rest;
    }
}

/// Read every top-level form of `source` into values, interning all of them
/// in the namespace that is current when the call starts
pub fn read_all(source: &str, env: &mut Environment) -> Result<Vec<Value>, Error> {
    parse_data(source, &ReaderConfig::default())?
        .iter()
        .map(|datum| datum.to_value(env))
        .collect()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Test result variants for comprehensive reader tests
    #[derive(Debug)]
    enum ReadTestResult {
        Printed(&'static str),       // Reading succeeds and the forms print like this
        SpecificError(&'static str), // Reading fails with an error containing this string
        Error,                       // Reading fails (any error)
    }
    use ReadTestResult::*;

    fn run_read_tests(test_cases: Vec<(&str, ReadTestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Read test #{}", i + 1);
            let mut env = Environment::new();
            let result = read_all(input, &mut env).map(|values| {
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            });

            match (result, expected) {
                (Ok(actual), Printed(expected)) => {
                    assert_eq!(actual, *expected, "{test_id}: mismatch for '{input}'");

                    // What the printer writes reads back to the same text
                    let mut env = Environment::new();
                    let reread = read_all(&actual, &mut env).unwrap_or_else(|e| {
                        panic!("{test_id}: round-trip read failed for '{actual}': {e:?}")
                    });
                    let reprinted = reread
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    assert_eq!(actual, reprinted, "{test_id}: round-trip mismatch");
                }
                (Err(_), Error) => {}
                (Err(err), SpecificError(expected_text)) => {
                    let error_msg = format!("{err:?}");
                    assert!(
                        error_msg.contains(expected_text),
                        "{test_id}: error should contain '{expected_text}', got {error_msg}"
                    );
                }
                (Ok(actual), Error | SpecificError(_)) => {
                    panic!("{test_id}: expected error for '{input}', got {actual}");
                }
                (Err(err), Printed(_)) => {
                    panic!("{test_id}: expected success for '{input}', got error {err:?}");
                }
            }
        }
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_reader_comprehensive() {
        let test_cases = vec![
            // ===== NUMBERS =====
            ("42", Printed("42")),
            ("-5", Printed("-5")),
            ("+7", Printed("7")),
            ("2.5", Printed("2.5")),
            ("-0.5", Printed("-0.5")),
            ("1e3", Printed("1000.0")),
            ("9223372036854775807", Printed("9223372036854775807")),
            ("-9223372036854775808", Printed("-9223372036854775808")),
            ("99999999999999999999", SpecificError("out of range")),
            // ===== SYMBOLS =====
            ("foo", Printed("FOO")),
            ("Mixed-Case", Printed("MIXED-CASE")),
            ("+", Printed("+")),
            ("-", Printed("-")),
            ("<=", Printed("<=")),
            ("&rest", Printed("&REST")),
            ("123abc", Printed("123ABC")),
            ("1+", Printed("1+")),
            // NIL and T read as their values
            ("nil", Printed("NIL")),
            ("t", Printed("T")),
            ("()", Printed("NIL")),
            // Keywords and qualified names
            (":key", Printed(":KEY")),
            ("glisp:car", Printed("CAR")),
            ("user::fresh", Printed("FRESH")),
            ("keyword::k", Printed(":K")),
            ("glisp:nope", SpecificError("not exported")),
            ("nowhere:x", SpecificError("undefined namespace")),
            ("glisp::nope", SpecificError("locked namespace")),
            (":", Error),
            ("a:b:c", Error),
            // ===== STRINGS =====
            (r#""hello""#, Printed(r#""hello""#)),
            (r#""a\nb\t\"c\"\\""#, Printed(r#""a\nb\t\"c\"\\""#)),
            (r#""""#, Printed(r#""""#)),
            (r#""bad\zescape""#, Error),
            (r#""unterminated"#, Error),
            (r#""trailing\"#, Error),
            // ===== CHARACTERS =====
            (r"#\a", Printed(r"#\a")),
            (r"#\Space", Printed(r"#\Space")),
            (r"#\newline", Printed(r"#\Newline")),
            (r"#\(", Printed(r"#\(")),
            (r"#\nosuchname", Error),
            // ===== LISTS =====
            ("(1 2 3)", Printed("(1 2 3)")),
            ("( 1\t\n2 )", Printed("(1 2)")),
            ("((1) (2 (3)))", Printed("((1) (2 (3)))")),
            ("(a . b)", Printed("(A . B)")),
            ("(1 2 . 3)", Printed("(1 2 . 3)")),
            ("(1 . (2 3))", Printed("(1 2 3)")),
            ("(a .b)", Printed("(A .B)")),
            ("(. a)", Error),
            ("(a . b c)", Error),
            ("(a .)", Error),
            ("(1 2", SpecificError("end of input")),
            (")", Error),
            ("(1))", Error),
            // ===== QUOTATION =====
            ("'x", Printed("(QUOTE X)")),
            ("'(1 2)", Printed("(QUOTE (1 2))")),
            ("`(a ,b ,@c)", Printed("(BACKQUOTE (A (UNQUOTE B) (SPLICE C)))")),
            ("`(a . ,b)", Printed("(BACKQUOTE (A UNQUOTE B))")),
            ("``,,x", Printed("(BACKQUOTE (BACKQUOTE (UNQUOTE (UNQUOTE X))))")),
            (",x", SpecificError("unquote outside of a backquote")),
            (",@x", SpecificError("unquote outside of a backquote")),
            ("`(a ,,b)", SpecificError("unquote outside of a backquote")),
            // ===== COMMENTS AND MULTIPLE FORMS =====
            ("1 2 3", Printed("1 2 3")),
            ("; comment\n42 ; trailing", Printed("42")),
            ("(1 #| inside |# 2)", Printed("(1 2)")),
            ("#| unterminated", SpecificError("unterminated block comment")),
            ("", Printed("")),
            ("   \n\t", Printed("")),
        ];

        run_read_tests(test_cases);
    }

    #[test]
    fn test_reader_depth_limits() {
        let config = ReaderConfig::default();
        let under_limit = format!(
            "{}1{}",
            "(".repeat(MAX_PARSE_DEPTH - 1),
            ")".repeat(MAX_PARSE_DEPTH - 1)
        );
        let at_limit = format!(
            "{}1{}",
            "(".repeat(MAX_PARSE_DEPTH),
            ")".repeat(MAX_PARSE_DEPTH)
        );
        let quotes_at_limit = format!("{}a", "'".repeat(MAX_PARSE_DEPTH));

        assert!(parse_data(&under_limit, &config).is_ok());
        for input in [&at_limit, &quotes_at_limit] {
            let err = parse_data(input, &config).unwrap_err();
            assert!(format!("{err}").contains("too deeply nested"), "{err}");
        }

        let shallow = ReaderConfig {
            max_depth: 2,
            ..config
        };
        assert!(parse_data("(1)", &shallow).is_ok());
        assert!(parse_data("((1))", &shallow).is_err());
    }

    #[test]
    fn test_comments_can_be_disabled() {
        let config = ReaderConfig {
            handle_comments: false,
            ..ReaderConfig::default()
        };
        assert!(parse_data("; comment", &config).is_err());
        assert_eq!(
            parse_data("(1 2)", &config).unwrap(),
            vec![Datum::List(
                vec![Datum::Integer(1), Datum::Integer(2)],
                None
            )]
        );
    }

    #[test]
    fn test_symbols_intern_in_current_namespace() {
        let mut env = Environment::new();
        let data = parse_data("foo foo", &ReaderConfig::default()).unwrap();
        let first = data[0].to_value(&mut env).unwrap();
        let second = data[1].to_value(&mut env).unwrap();
        assert!(first.eql(&second));

        // The same datum interned in another namespace yields another symbol
        env.eval_str("(namespace other)").unwrap();
        env.change_current_namespace("OTHER").unwrap();
        let third = data[0].to_value(&mut env).unwrap();
        assert!(!first.eql(&third));

        // Keywords are shared by every namespace
        let key = Datum::Symbol(SymbolName::Keyword("K".into()));
        let in_other = key.to_value(&mut env).unwrap();
        env.change_current_namespace("USER").unwrap();
        assert!(in_other.eql(&key.to_value(&mut env).unwrap()));
    }

    proptest! {
        #[test]
        fn prop_integers_read_back(n in any::<i64>()) {
            let data = parse_data(&n.to_string(), &ReaderConfig::default()).unwrap();
            prop_assert_eq!(data, vec![Datum::Integer(n)]);
        }

        #[test]
        fn prop_symbols_are_upper_cased(name in "[a-z][a-z0-9*?!-]{0,10}") {
            let data = parse_data(&name, &ReaderConfig::default()).unwrap();
            prop_assert_eq!(data, vec![Datum::Symbol(SymbolName::Plain(name.to_uppercase()))]);
        }
    }
}
