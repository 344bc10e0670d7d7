//! Recursive-descent parser for SCIM filter expressions (RFC 7644 §3.4.2.2).
//!
//! ```text
//! filter     = orExpr
//! orExpr     = andExpr { "or" andExpr }
//! andExpr    = notExpr { "and" notExpr }
//! notExpr    = "not" ( "(" filter ")" | attrExpr ) | "(" filter ")" | attrExpr
//! attrExpr   = attrPath "pr" | attrPath compareOp compValue
//! attrPath   = [URI ":"] ATTRNAME ["[" filter "]"] ["." ATTRNAME]
//! compareOp  = "eq" | "ne" | "co" | "sw" | "ew" | "gt" | "ge" | "lt" | "le"
//! compValue  = "true" | "false" | "null" | NUMBER | STRING
//! ```
//!
//! Keywords and operators are case-insensitive. Input length and nesting depth
//! are bounded by [`FilterLimits`].

use super::{AttrPath, CompareOp, Filter, FilterParseError, FilterValue};

/// Maximum filter length in bytes unless configured otherwise.
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Maximum nesting depth of groups, `not` and value filters.
pub const MAX_FILTER_DEPTH: usize = 32;

/// Bounds applied before and during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterLimits {
    pub max_length: usize,
    pub max_depth: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_length: MAX_FILTER_LENGTH,
            max_depth: MAX_FILTER_DEPTH,
        }
    }
}

/// Parse a filter expression with the default limits.
///
/// ```rust
/// use scim_engine::filter::{parse_filter, Filter};
///
/// let filter = parse_filter(r#"emails[type eq "work"].value co "@example.com""#).unwrap();
/// assert!(matches!(filter, Filter::Compare { .. }));
/// ```
pub fn parse_filter(input: &str) -> Result<Filter, FilterParseError> {
    parse_filter_with(input, FilterLimits::default())
}

/// Parse a filter expression with explicit limits.
pub fn parse_filter_with(input: &str, limits: FilterLimits) -> Result<Filter, FilterParseError> {
    if input.len() > limits.max_length {
        return Err(FilterParseError::limit(
            format!(
                "Filter exceeds maximum length ({} bytes, max {})",
                input.len(),
                limits.max_length
            ),
            0,
        ));
    }
    if input.trim().is_empty() {
        return Err(FilterParseError::new("Filter is empty", 0));
    }

    let mut parser = Parser::new(input, limits.max_depth);
    let filter = parser.parse_filter()?;
    parser.expect_end()?;
    Ok(filter)
}

/// Parse a standalone attribute path such as a PATCH `path` or `sortBy`.
///
/// ```rust
/// use scim_engine::filter::parse_attr_path;
///
/// let path = parse_attr_path(r#"members[value eq "2819c223"]"#).unwrap();
/// assert_eq!(path.attr, "members");
/// assert!(path.value_filter.is_some());
/// ```
pub fn parse_attr_path(input: &str) -> Result<AttrPath, FilterParseError> {
    let limits = FilterLimits::default();
    if input.len() > limits.max_length {
        return Err(FilterParseError::limit("Attribute path is too long", 0));
    }
    let mut parser = Parser::new(input, limits.max_depth);
    let path = parser.parse_attr_path()?;
    parser.expect_end()?;
    Ok(path)
}

struct Parser<'a> {
    input: &'a str,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, max_depth: usize) -> Self {
        Self {
            input,
            position: 0,
            depth: 0,
            max_depth,
        }
    }

    fn enter_scope(&mut self) -> Result<(), FilterParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FilterParseError::limit(
                format!("Filter exceeds maximum nesting depth ({})", self.max_depth),
                self.position,
            ));
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn expect_end(&mut self) -> Result<(), FilterParseError> {
        self.skip_whitespace();
        if self.position < self.input.len() {
            return Err(FilterParseError::new(
                format!("Unexpected input: '{}'", &self.input[self.position..]),
                self.position,
            ));
        }
        Ok(())
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_and_expr()?;
        while self.try_keyword("or") {
            let right = self.parse_and_expr()?;
            left = Filter::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_not_expr()?;
        while self.try_keyword("and") {
            let right = self.parse_not_expr()?;
            left = Filter::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();

        if self.try_keyword("not") {
            self.skip_whitespace();
            self.enter_scope()?;
            let inner = if self.peek() == Some('(') {
                self.parse_group()?
            } else {
                self.parse_attr_expr()?
            };
            self.exit_scope();
            return Ok(Filter::Not(Box::new(inner)));
        }

        if self.peek() == Some('(') {
            return self.parse_group();
        }

        self.parse_attr_expr()
    }

    fn parse_group(&mut self) -> Result<Filter, FilterParseError> {
        if !self.try_char('(') {
            return Err(FilterParseError::new("Expected '('", self.position));
        }
        self.enter_scope()?;
        let inner = self.parse_filter()?;
        self.exit_scope();
        self.skip_whitespace();
        if !self.try_char(')') {
            return Err(FilterParseError::new(
                "Expected ')' to close grouped expression",
                self.position,
            ));
        }
        Ok(inner)
    }

    fn parse_attr_expr(&mut self) -> Result<Filter, FilterParseError> {
        let attr = self.parse_attr_path()?;
        self.skip_whitespace();

        if self.try_keyword("pr") {
            return Ok(Filter::Present { attr });
        }

        let op = self.parse_compare_op()?;
        self.skip_whitespace();
        let value = self.parse_value()?;
        Ok(Filter::Compare { attr, op, value })
    }

    fn parse_attr_path(&mut self) -> Result<AttrPath, FilterParseError> {
        self.skip_whitespace();
        let start = self.position;
        let (schema, attr, urn_sub) = self.parse_qualified_name()?;

        let value_filter = if urn_sub.is_none() && self.try_char('[') {
            self.enter_scope()?;
            let filter = self.parse_filter()?;
            self.exit_scope();
            self.skip_whitespace();
            if !self.try_char(']') {
                return Err(FilterParseError::new(
                    "Expected ']' to close value filter",
                    self.position,
                ));
            }
            Some(Box::new(filter))
        } else {
            None
        };

        let sub_attr = match urn_sub {
            Some(sub) => Some(sub),
            None if self.try_char('.') => Some(self.parse_simple_name()?),
            None => None,
        };

        if attr.is_empty() {
            return Err(FilterParseError::new("Expected attribute name", start));
        }

        Ok(AttrPath {
            schema,
            attr,
            sub_attr,
            value_filter,
        })
    }

    /// `[URI ":"] ATTRNAME`, where a URI-qualified name may carry its own `.sub`.
    fn parse_qualified_name(
        &mut self,
    ) -> Result<(Option<String>, String, Option<String>), FilterParseError> {
        let remaining = &self.input[self.position..];
        let is_urn = remaining
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("urn:"));
        if !is_urn {
            return Ok((None, self.parse_simple_name()?, None));
        }

        let start = self.position;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '-' | '$'))
        {
            self.advance();
        }
        let token = &self.input[start..self.position];
        let Some(split) = token.rfind(':') else {
            return Err(FilterParseError::new("Invalid schema URI", start));
        };
        let (schema, rest) = (&token[..split], &token[split + 1..]);
        let (attr, sub) = match rest.split_once('.') {
            Some((attr, sub)) if !sub.is_empty() => (attr, Some(sub.to_string())),
            Some(_) => {
                return Err(FilterParseError::new(
                    "Expected sub-attribute name after '.'",
                    self.position,
                ));
            }
            None => (rest, None),
        };
        if attr.is_empty() {
            return Err(FilterParseError::new(
                "Expected attribute name after schema URI",
                self.position,
            ));
        }
        Ok((Some(schema.to_string()), attr.to_string(), sub))
    }

    fn parse_simple_name(&mut self) -> Result<String, FilterParseError> {
        self.skip_whitespace();
        let start = self.position;

        // Attribute names start with a letter, or '$' for "$ref"
        if !self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '$')
        {
            return Err(FilterParseError::new("Expected attribute name", self.position));
        }
        self.advance();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.advance();
        }
        Ok(self.input[start..self.position].to_string())
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, FilterParseError> {
        self.skip_whitespace();
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        let op_str = &self.input[start..self.position];
        CompareOp::parse(op_str).ok_or_else(|| {
            FilterParseError::new(format!("Unknown operator: '{}'", op_str), start)
        })
    }

    fn parse_value(&mut self) -> Result<FilterValue, FilterParseError> {
        self.skip_whitespace();

        if self.peek() == Some('"') {
            return self.parse_string_value();
        }
        if self.try_keyword("true") {
            return Ok(FilterValue::Bool(true));
        }
        if self.try_keyword("false") {
            return Ok(FilterValue::Bool(false));
        }
        if self.try_keyword("null") {
            return Ok(FilterValue::Null);
        }
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            return self.parse_number_value();
        }

        Err(FilterParseError::new(
            "Expected value (string, boolean, number, or null)",
            self.position,
        ))
    }

    fn parse_string_value(&mut self) -> Result<FilterValue, FilterParseError> {
        let start = self.position;
        self.advance();
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(FilterParseError::new("Unterminated string", start)),
                Some('"') => {
                    self.advance();
                    return Ok(FilterValue::String(value));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        _ => {
                            return Err(FilterParseError::new(
                                "Invalid escape sequence",
                                self.position,
                            ));
                        }
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn parse_number_value(&mut self) -> Result<FilterValue, FilterParseError> {
        let start = self.position;

        if matches!(self.peek(), Some('-' | '+')) {
            self.advance();
        }
        self.skip_digits();
        if self.peek() == Some('.') {
            self.advance();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('-' | '+')) {
                self.advance();
            }
            self.skip_digits();
        }

        let num_str = &self.input[start..self.position];
        num_str
            .parse::<f64>()
            .map(FilterValue::Number)
            .map_err(|_| FilterParseError::new(format!("Invalid number: '{}'", num_str), start))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn try_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `keyword` (case-insensitive) when it is a whole word.
    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let remaining = &self.input[self.position..];
        let Some(candidate) = remaining.get(..keyword.len()) else {
            return false;
        };
        if !candidate.eq_ignore_ascii_case(keyword) {
            return false;
        }
        let boundary = remaining[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_' && c != '.' && c != ':');
        if boundary {
            self.position += keyword.len();
        }
        boundary
    }
}
