//! Recursive-descent parser over the lexer's token stream, producing a
//! `vizquery_core::Query` (spec §4.8).

use std::collections::BTreeMap;

use vizquery_core::{
    AbstractColumn, AggregationOp, BoolOp, CompareOp, DateTimeValue, DateValue, ErrorKey, Filter,
    Query, QueryError, QueryOptions, QueryResult, ScalarFunction, SortDirection, SortSpec,
    TimeOfDayValue, Value,
};

use crate::lexer::{tokenize, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn keyword(tok: &Token) -> Option<String> {
    match tok {
        Token::Ident(s) => Some(s.to_ascii_uppercase()),
        _ => None,
    }
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_keyword(&self, kw: &str) -> bool {
        keyword(self.peek()).as_deref() == Some(kw)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, detail: impl Into<String>) -> QueryError {
        QueryError::invalid(ErrorKey::ParseError, detail.into())
    }

    fn expect_keyword(&mut self, kw: &str) -> QueryResult<()> {
        if self.at_keyword(kw) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {kw}, found {:?}", self.peek())))
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> QueryResult<String> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            other => Err(self.err(format!("expected an identifier, found {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> QueryResult<String> {
        match self.advance() {
            Token::String(s) => Ok(s),
            other => Err(self.err(format!("expected a string literal, found {other:?}"))),
        }
    }

    fn expect_number(&mut self) -> QueryResult<f64> {
        match self.advance() {
            Token::Number(n) => Ok(n),
            other => Err(self.err(format!("expected a number, found {other:?}"))),
        }
    }

    fn expect_usize(&mut self) -> QueryResult<usize> {
        let n = self.expect_number()?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(self.err(format!("expected a non-negative integer, got {n}")));
        }
        Ok(n as usize)
    }

    // --- columns -----------------------------------------------------

    fn parse_aggregation(&mut self, op: AggregationOp) -> QueryResult<AbstractColumn> {
        self.advance();
        if self.peek() != &Token::LParen {
            return Err(self.err(format!("expected ( after {}", op.name())));
        }
        self.advance();
        let inner = self.parse_additive()?;
        if self.advance() != Token::RParen {
            return Err(self.err("expected ) closing aggregation"));
        }
        Ok(AbstractColumn::aggregation(inner, op))
    }

    fn parse_scalar_call(&mut self, function: ScalarFunction) -> QueryResult<AbstractColumn> {
        self.advance();
        if self.advance() != Token::LParen {
            return Err(self.err(format!("expected ( after {}", function.name())));
        }
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.parse_additive()?);
                if self.eat_comma() {
                    continue;
                }
                break;
            }
        }
        if self.advance() != Token::RParen {
            return Err(self.err(format!("expected ) closing {}", function.name())));
        }
        if let Some(arity) = function.arity() {
            if arity != args.len() {
                return Err(self.err(format!(
                    "{} expects {arity} arguments, got {}",
                    function.name(),
                    args.len()
                )));
            }
        }
        Ok(AbstractColumn::ScalarFunctionCall { function, args })
    }

    fn eat_comma(&mut self) -> bool {
        if self.peek() == &Token::Comma {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Primary columns: identifiers, literals, aggregation/scalar calls,
    /// and parenthesized sub-expressions.
    fn parse_primary(&mut self) -> QueryResult<AbstractColumn> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(AbstractColumn::Constant(Value::number(n)))
            }
            Token::String(s) => {
                self.advance();
                Ok(AbstractColumn::Constant(Value::text(s)))
            }
            Token::DateLit(s) => {
                self.advance();
                Ok(AbstractColumn::Constant(Value::Date(Some(parse_date(&s)?))))
            }
            Token::DateTimeLit(s) => {
                self.advance();
                Ok(AbstractColumn::Constant(Value::DateTime(Some(parse_datetime(&s)?))))
            }
            Token::TimeOfDayLit(s) => {
                self.advance();
                Ok(AbstractColumn::Constant(Value::TimeOfDay(Some(parse_timeofday(&s)?))))
            }
            Token::LParen => {
                self.advance();
                let col = self.parse_additive()?;
                if self.advance() != Token::RParen {
                    return Err(self.err("expected ) closing parenthesized expression"));
                }
                Ok(col)
            }
            Token::Ident(ref s) => {
                let upper = s.to_ascii_uppercase();
                match upper.as_str() {
                    "TRUE" => {
                        self.advance();
                        Ok(AbstractColumn::Constant(Value::boolean(true)))
                    }
                    "FALSE" => {
                        self.advance();
                        Ok(AbstractColumn::Constant(Value::boolean(false)))
                    }
                    "MIN" if self.peek_is_call() => self.parse_aggregation(AggregationOp::Min),
                    "MAX" if self.peek_is_call() => self.parse_aggregation(AggregationOp::Max),
                    "SUM" if self.peek_is_call() => self.parse_aggregation(AggregationOp::Sum),
                    "AVG" if self.peek_is_call() => self.parse_aggregation(AggregationOp::Avg),
                    "COUNT" if self.peek_is_call() => self.parse_aggregation(AggregationOp::Count),
                    _ => {
                        if let Some(function) = scalar_function_named(&upper) {
                            self.parse_scalar_call(function)
                        } else {
                            let id = self.expect_ident()?;
                            Ok(AbstractColumn::simple(id))
                        }
                    }
                }
            }
            other => Err(self.err(format!("unexpected token {other:?} in column expression"))),
        }
    }

    fn peek_is_call(&self) -> bool {
        self.tokens.get(self.pos + 1) == Some(&Token::LParen)
    }

    fn parse_multiplicative(&mut self) -> QueryResult<AbstractColumn> {
        let mut left = self.parse_primary()?;
        loop {
            let function = match self.peek() {
                Token::Star => ScalarFunction::Product,
                Token::Slash => ScalarFunction::Quotient,
                _ => break,
            };
            self.advance();
            let right = self.parse_primary()?;
            left = AbstractColumn::ScalarFunctionCall {
                function,
                args: vec![left, right],
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> QueryResult<AbstractColumn> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let function = match self.peek() {
                Token::Plus => ScalarFunction::Sum,
                Token::Minus => ScalarFunction::Difference,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = AbstractColumn::ScalarFunctionCall {
                function,
                args: vec![left, right],
            };
        }
        Ok(left)
    }

    fn parse_column_list(&mut self) -> QueryResult<Vec<AbstractColumn>> {
        let mut out = vec![self.parse_additive()?];
        while self.eat_comma() {
            out.push(self.parse_additive()?);
        }
        Ok(out)
    }

    // --- filter --------------------------------------------------------

    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::Ident(s) => match s.to_ascii_uppercase().as_str() {
                "CONTAINS" => CompareOp::Contains,
                "LIKE" => CompareOp::Like,
                "MATCHES" => CompareOp::Matches,
                _ => return None,
            },
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_filter_primary(&mut self) -> QueryResult<Filter> {
        if self.eat_keyword("NOT") {
            return Ok(Filter::Negation(Box::new(self.parse_filter_primary()?)));
        }
        if self.peek() == &Token::LParen {
            self.advance();
            let f = self.parse_filter_or()?;
            if self.advance() != Token::RParen {
                return Err(self.err("expected ) closing filter expression"));
            }
            return Ok(f);
        }

        if self.at_keyword("STARTS") {
            return Err(self.err("STARTS WITH must follow a column expression"));
        }

        let lhs = self.parse_additive()?;

        if self.eat_keyword("IS") {
            self.expect_keyword("NULL")?;
            return Ok(Filter::ColumnIsNull(lhs));
        }
        if self.at_keyword("STARTS") {
            self.advance();
            self.expect_keyword("WITH")?;
            let rhs = self.parse_additive()?;
            return Ok(make_compare(lhs, rhs, CompareOp::StartsWith));
        }
        if self.at_keyword("ENDS") {
            self.advance();
            self.expect_keyword("WITH")?;
            let rhs = self.parse_additive()?;
            return Ok(make_compare(lhs, rhs, CompareOp::EndsWith));
        }

        let op = self
            .parse_compare_op()
            .ok_or_else(|| self.err(format!("expected a comparison operator, found {:?}", self.peek())))?;
        let rhs = self.parse_additive()?;
        Ok(make_compare(lhs, rhs, op))
    }

    fn parse_filter_and(&mut self) -> QueryResult<Filter> {
        let mut children = vec![self.parse_filter_primary()?];
        while self.eat_keyword("AND") {
            children.push(self.parse_filter_primary()?);
        }
        Ok(if children.len() == 1 {
            children.pop().unwrap()
        } else {
            Filter::Compound {
                op: BoolOp::And,
                children,
            }
        })
    }

    fn parse_filter_or(&mut self) -> QueryResult<Filter> {
        let mut children = vec![self.parse_filter_and()?];
        while self.eat_keyword("OR") {
            children.push(self.parse_filter_and()?);
        }
        Ok(if children.len() == 1 {
            children.pop().unwrap()
        } else {
            Filter::Compound {
                op: BoolOp::Or,
                children,
            }
        })
    }

    // --- top-level clauses ----------------------------------------------

    fn parse_query(&mut self) -> QueryResult<Query> {
        let mut query = Query::empty();

        if self.eat_keyword("SELECT") {
            query.selection = Some(self.parse_column_list()?);
        }
        if self.eat_keyword("WHERE") {
            query.filter = Some(self.parse_filter_or()?);
        }
        if self.eat_keyword("GROUP") {
            self.expect_keyword("BY")?;
            query.group = self.parse_column_list()?;
        }
        if self.eat_keyword("PIVOT") {
            query.pivot = self.parse_column_list()?;
        }
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            query.sort = self.parse_sort_list()?;
        }
        if self.eat_keyword("LIMIT") {
            query.row_limit = Some(self.expect_usize()?);
        }
        if self.eat_keyword("OFFSET") {
            query.row_offset = Some(self.expect_usize()?);
        }
        if self.eat_keyword("SKIPPING") {
            query.row_skipping = Some(self.expect_usize()?);
        }
        if self.eat_keyword("LABEL") {
            query.labels = self.parse_label_or_format_list()?;
        }
        if self.eat_keyword("FORMAT") {
            query.user_format_options = self.parse_label_or_format_list()?;
        }
        if self.eat_keyword("OPTIONS") {
            query.options = self.parse_options()?;
        }

        if self.peek() != &Token::Eof {
            return Err(self.err(format!("unexpected trailing token {:?}", self.peek())));
        }
        Ok(query)
    }

    fn parse_sort_list(&mut self) -> QueryResult<Vec<SortSpec>> {
        let mut out = Vec::new();
        loop {
            let column = self.parse_additive()?;
            let direction = if self.eat_keyword("DESC") {
                SortDirection::Desc
            } else {
                self.eat_keyword("ASC");
                SortDirection::Asc
            };
            out.push(SortSpec { column, direction });
            if !self.eat_comma() {
                break;
            }
        }
        Ok(out)
    }

    fn parse_label_or_format_list(&mut self) -> QueryResult<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        loop {
            let col = self.parse_additive()?;
            let text = self.expect_string()?;
            out.insert(col.id(), text);
            if !self.eat_comma() {
                break;
            }
        }
        Ok(out)
    }

    fn parse_options(&mut self) -> QueryResult<QueryOptions> {
        let mut opts = QueryOptions::default();
        loop {
            let ident = self.expect_ident()?;
            match ident.to_ascii_uppercase().as_str() {
                "NO_FORMAT" => opts.no_format = true,
                "NO_VALUES" => opts.no_values = true,
                other => return Err(self.err(format!("unknown query option {other}"))),
            }
            if !self.eat_comma() {
                break;
            }
        }
        Ok(opts)
    }
}

fn make_compare(lhs: AbstractColumn, rhs: AbstractColumn, op: CompareOp) -> Filter {
    match (lhs, rhs) {
        (AbstractColumn::Constant(value), column) | (column, AbstractColumn::Constant(value))
            if !matches!(column, AbstractColumn::Constant(_)) =>
        {
            Filter::ColumnValue { column, value, op }
        }
        (lhs, rhs) => Filter::ColumnColumn { lhs, rhs, op },
    }
}

fn scalar_function_named(upper: &str) -> Option<ScalarFunction> {
    Some(match upper {
        "NOW" => ScalarFunction::Now,
        "TODATE" => ScalarFunction::ToDate,
        "YEAR" => ScalarFunction::Year,
        "MONTH" => ScalarFunction::Month,
        "DAY" => ScalarFunction::Day,
        "QUARTER" => ScalarFunction::Quarter,
        "DAYOFWEEK" => ScalarFunction::DayOfWeek,
        "HOUR" => ScalarFunction::Hour,
        "MINUTE" => ScalarFunction::Minute,
        "SECOND" => ScalarFunction::Second,
        "MILLISECOND" => ScalarFunction::Millisecond,
        "LOWER" => ScalarFunction::Lower,
        "UPPER" => ScalarFunction::Upper,
        "DIFFERENCE" => ScalarFunction::Difference,
        "QUOTIENT" => ScalarFunction::Quotient,
        "PRODUCT" => ScalarFunction::Product,
        "CONCAT" => ScalarFunction::Concat,
        "DATEDIFF" => ScalarFunction::DateDiff,
        _ => return None,
    })
}

fn split_ymd(s: &str) -> QueryResult<(i32, u8, u8)> {
    let (date_part, _) = s.split_once(' ').unwrap_or((s, ""));
    let mut it = date_part.splitn(3, '-');
    let err = || QueryError::invalid(ErrorKey::ParseError, format!("invalid date literal {s:?}"));
    let year: i32 = it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let month: u8 = it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let day: u8 = it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    Ok((year, month.saturating_sub(1), day))
}

fn split_hms_ms(s: &str) -> QueryResult<(u8, u8, u8, u16)> {
    let time_part = s.split_once(' ').map(|(_, t)| t).unwrap_or(s);
    let (hms, ms) = time_part.split_once('.').unwrap_or((time_part, "0"));
    let mut it = hms.splitn(3, ':');
    let err = || QueryError::invalid(ErrorKey::ParseError, format!("invalid time literal {s:?}"));
    let hour: u8 = it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let minute: u8 = it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let second: u8 = it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let millisecond: u16 = ms.parse().map_err(|_| err())?;
    Ok((hour, minute, second, millisecond))
}

fn parse_date(s: &str) -> QueryResult<DateValue> {
    let (year, month, day) = split_ymd(s)?;
    DateValue::new(year, month, day)
}

fn parse_datetime(s: &str) -> QueryResult<DateTimeValue> {
    let (year, month, day) = split_ymd(s)?;
    let (hour, minute, second, millisecond) = split_hms_ms(s)?;
    DateTimeValue::new(year, month, day, hour, minute, second, millisecond)
}

fn parse_timeofday(s: &str) -> QueryResult<TimeOfDayValue> {
    let (hour, minute, second, millisecond) = split_hms_ms(s)?;
    TimeOfDayValue::new(hour, minute, second, millisecond)
}

/// Parses a vizquery query string into a `Query` (spec §4.8). Every
/// clause is optional; an empty string parses to `Query::empty()`.
pub fn parse(input: &str) -> QueryResult<Query> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_query()
}
