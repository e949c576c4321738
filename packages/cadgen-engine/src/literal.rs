//! Tolerant parser for Python-style literals: single-quoted strings,
//! unquoted mapping keys, `True`/`False`/`None`, tuples and trailing
//! commas. Used as the second tier of specification parsing when strict
//! JSON fails; the result is re-serialized to strict JSON by the caller.

use serde_json::{Map, Number, Value};

pub fn parse(input: &str) -> Result<Value, String> {
    let mut parser = Parser {
        chars: input.char_indices().peekable(),
        input,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if let Some(&(pos, _)) = parser.chars.peek() {
        return Err(format!("trailing characters at byte {pos}"));
    }
    Ok(value)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn pos(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((pos, c)) => Err(format!("expected '{expected}' at byte {pos}, found '{c}'")),
            None => Err(format!("expected '{expected}', found end of input")),
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.mapping(),
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some('\'') | Some('"') => Ok(Value::String(self.string()?)),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => {
                let pos = self.pos();
                Err(format!("unexpected character '{c}' at byte {pos}"))
            }
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn mapping(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.chars.next();
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.skip_ws();
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.chars.next();
                }
                Some('}') => {}
                _ => {
                    let pos = self.pos();
                    return Err(format!("expected ',' or '}}' at byte {pos}"));
                }
            }
        }
    }

    /// Mapping keys may be quoted strings, bare identifiers, or numbers.
    fn key(&mut self) -> Result<String, String> {
        self.skip_ws();
        match self.peek() {
            Some('\'') | Some('"') => self.string(),
            Some(c) if c.is_alphabetic() || c == '_' => Ok(self.identifier()),
            Some(c) if c.is_ascii_digit() || c == '-' => match self.number()? {
                Value::Number(n) => Ok(n.to_string()),
                _ => unreachable!(),
            },
            _ => {
                let pos = self.pos();
                Err(format!("expected mapping key at byte {pos}"))
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, String> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.chars.next();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.chars.next();
                }
                Some(c) if c == close => {}
                _ => {
                    let pos = self.pos();
                    return Err(format!("expected ',' or '{close}' at byte {pos}"));
                }
            }
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let (start, quote) = self.chars.next().expect("caller checked the quote");
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(out),
                Some((pos, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '\'')) => out.push('\''),
                    Some((_, '"')) => out.push('"'),
                    Some((_, 'u')) => {
                        let mut code = String::new();
                        for _ in 0..4 {
                            match self.chars.next() {
                                Some((_, h)) if h.is_ascii_hexdigit() => code.push(h),
                                _ => return Err(format!("bad \\u escape at byte {pos}")),
                            }
                        }
                        let n = u32::from_str_radix(&code, 16).expect("hex digits only");
                        out.push(
                            char::from_u32(n)
                                .ok_or_else(|| format!("bad \\u escape at byte {pos}"))?,
                        );
                    }
                    Some((_, other)) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err("unterminated escape at end of input".to_string()),
                },
                Some((_, c)) => out.push(c),
                None => return Err(format!("unterminated string starting at byte {start}")),
            }
        }
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos();
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.chars.next();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            // Sign characters are only consumed mid-number after an exponent.
            let c = self.peek().expect("peeked above");
            if matches!(c, '+' | '-') {
                let here = self.pos();
                let prev = self.input[start..here].chars().next_back();
                if !matches!(prev, Some('e') | Some('E')) {
                    break;
                }
            }
            self.chars.next();
        }
        let end = self.pos();
        let text = &self.input[start..end];
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        let float = text
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{text}' at byte {start}"))?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite number '{text}' at byte {start}"))
    }

    fn identifier(&mut self) -> String {
        let start = self.pos();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.chars.next();
        }
        let end = self.pos();
        self.input[start..end].to_string()
    }

    fn word(&mut self) -> Result<Value, String> {
        let start = self.pos();
        let word = self.identifier();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(format!("unexpected word '{word}' at byte {start}")),
        }
    }
}
