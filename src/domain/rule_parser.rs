//! Custom rule text parser.
//!
//! Recursive descent over a small grammar:
//!
//! ```text
//! rule       := "AND" "(" conditions ")" | "OR" "(" conditions ")" | condition
//! conditions := condition ("," condition)*
//! condition  := "PRICE" cmp number
//!             | "RSI" "(" integer ")" cmp number
//!             | "MA_CROSS" "(" integer "," integer "," ("ABOVE" | "BELOW") ")"
//!             | "BOLLINGER" "(" integer "," number "," ("UPPER" | "LOWER") ","
//!                           ("CROSS_ABOVE" | "CROSS_BELOW") ")"
//! cmp        := "<" | ">" | "="
//! ```
//!
//! A bare condition is an AND of one. Errors carry the character offset.

use crate::domain::error::ParseError;
use crate::domain::rule::{Band, Combinator, Comparison, Condition, CrossDirection, MaDirection, Rule};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    /// Positions are reported in chars so the caret lines up under the input.
    fn error_at(&self, byte_pos: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.input[..byte_pos].chars().count(),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    /// Consumes one of `choices`, returning its index.
    fn expect_one_of(&mut self, choices: &[&str]) -> Result<usize, ParseError> {
        self.skip_whitespace();
        for (i, choice) in choices.iter().enumerate() {
            if self.consume_keyword(choice) {
                return Ok(i);
            }
        }
        Err(self.error(format!(
            "expected one of {}, found '{}'",
            choices.join(", "),
            self.peek_word()
        )))
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error_at(start, "expected number"));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error_at(start, format!("invalid number: {}", num_str)))
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.pos == start {
            return Err(self.error_at(start, "expected integer"));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<usize>()
            .map_err(|_| self.error_at(start, format!("invalid integer: {}", num_str)))
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseError> {
        self.skip_whitespace();
        let op = match self.peek() {
            Some('<') => Comparison::Lt,
            Some('>') => Comparison::Gt,
            Some('=') => Comparison::Eq,
            Some(ch) => return Err(self.error(format!("expected '<', '>' or '=', found '{}'", ch))),
            None => return Err(self.error("expected '<', '>' or '=', found end of input")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        self.skip_whitespace();

        if self.consume_keyword("PRICE") {
            let operator = self.parse_comparison()?;
            let value = self.parse_number()?;
            return Ok(Condition::PriceThreshold { operator, value });
        }

        if self.consume_keyword("RSI") {
            self.expect_char('(')?;
            let period = self.parse_integer()?;
            self.expect_char(')')?;
            let operator = self.parse_comparison()?;
            let value = self.parse_number()?;
            return Ok(Condition::Rsi {
                period,
                operator,
                value,
            });
        }

        if self.consume_keyword("MA_CROSS") {
            self.expect_char('(')?;
            let short_window = self.parse_integer()?;
            self.expect_char(',')?;
            let long_window = self.parse_integer()?;
            self.expect_char(',')?;
            let direction = match self.expect_one_of(&["ABOVE", "BELOW"])? {
                0 => MaDirection::Above,
                _ => MaDirection::Below,
            };
            self.expect_char(')')?;
            return Ok(Condition::MaCrossover {
                short_window,
                long_window,
                direction,
            });
        }

        if self.consume_keyword("BOLLINGER") {
            self.expect_char('(')?;
            let window = self.parse_integer()?;
            self.expect_char(',')?;
            let num_std_dev = self.parse_number()?;
            self.expect_char(',')?;
            let band = match self.expect_one_of(&["UPPER", "LOWER"])? {
                0 => Band::Upper,
                _ => Band::Lower,
            };
            self.expect_char(',')?;
            let direction = match self.expect_one_of(&["CROSS_ABOVE", "CROSS_BELOW"])? {
                0 => CrossDirection::CrossAbove,
                _ => CrossDirection::CrossBelow,
            };
            self.expect_char(')')?;
            return Ok(Condition::BollingerBand {
                window,
                num_std_dev,
                band,
                direction,
            });
        }

        if self.peek_keyword("AND") || self.peek_keyword("OR") {
            return Err(self.error("nested AND/OR is not supported"));
        }

        Err(self.error(format!(
            "expected condition (PRICE, RSI, MA_CROSS, BOLLINGER), found '{}'",
            self.peek_word()
        )))
    }

    fn parse_conditions(&mut self) -> Result<Vec<Condition>, ParseError> {
        self.expect_char('(')?;
        let mut conditions = vec![self.parse_condition()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.advance();
                    conditions.push(self.parse_condition()?);
                }
                Some(')') => {
                    self.advance();
                    return Ok(conditions);
                }
                Some(ch) => return Err(self.error(format!("expected ',' or ')', found '{}'", ch))),
                None => return Err(self.error("expected ',' or ')', found end of input")),
            }
        }
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();
        let operator = if self.consume_keyword("AND") {
            Combinator::And
        } else if self.consume_keyword("OR") {
            Combinator::Or
        } else {
            return Ok(Rule::all(vec![self.parse_condition()?]));
        };
        let conditions = self.parse_conditions()?;
        Ok(Rule {
            operator,
            conditions,
        })
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after rule: '{}'",
                self.remaining()
            )));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}
