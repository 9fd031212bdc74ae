use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::extractor::error::ExtractorError;

/// Locate `start_pattern` in `webpage`, take the object literal that follows it
/// and parse it as JSON after JS normalization.
///
/// `name` only feeds the error message.
pub fn search_json(start_pattern: &Regex, webpage: &str, name: &str) -> Result<Value, ExtractorError> {
    let not_found = || ExtractorError::ValidationError(format!("Unable to extract {name}"));

    let start = start_pattern.find(webpage).ok_or_else(not_found)?.end();
    let literal = extract_balanced_object(&webpage[start..]).ok_or_else(not_found)?;
    debug!(name, len = literal.len(), "Found embedded object literal");

    Ok(serde_json::from_str(&js_to_json(literal))?)
}

/// Return the first balanced `{...}` or `[...]` at the start of `input`
/// (leading whitespace skipped). Brackets inside strings and comments do not
/// count.
pub fn extract_balanced_object(input: &str) -> Option<&str> {
    let offset = input.len() - input.trim_start().len();
    let body = &input[offset..];
    let bytes = body.as_bytes();

    let open = *bytes.first()?;
    if open != b'{' && open != b'[' {
        return None;
    }

    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&body[..=i]);
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Convert a JavaScript object literal into JSON text.
///
/// Handles quoting styles, unquoted keys, `undefined`/`void 0`, `!0`/`!1`,
/// hex numbers, comments and trailing commas. Bare identifiers in value
/// position become strings.
///
/// ```rust
/// use kinescope_parser::webpage::js_to_json;
///
/// let json = js_to_json("{id: 'a', list: [1, 2,], hidden: !0, poster: undefined}");
/// let value: serde_json::Value = serde_json::from_str(&json).unwrap();
/// assert_eq!(value["id"], "a");
/// assert_eq!(value["hidden"], true);
/// assert!(value["poster"].is_null());
/// ```
pub fn js_to_json(src: &str) -> String {
    JsConverter {
        chars: src.chars().collect(),
        pos: 0,
        out: String::with_capacity(src.len() + src.len() / 8),
    }
    .run()
}

struct JsConverter {
    chars: Vec<char>,
    pos: usize,
    out: String,
}

impl JsConverter {
    fn run(mut self) -> String {
        while let Some(c) = self.peek(0) {
            match c {
                '"' | '\'' | '`' => {
                    let s = self.read_string(c);
                    self.push_json_string(&s);
                }
                '/' if matches!(self.peek(1), Some('/' | '*')) => self.skip_comment(),
                ',' => {
                    let next = self.skip_trivia_from(self.pos + 1);
                    if !matches!(self.chars.get(next), Some('}' | ']')) {
                        self.out.push(',');
                    }
                    self.pos += 1;
                }
                '!' if matches!(self.peek(1), Some('0' | '1'))
                    && !self.peek(2).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.out
                        .push_str(if self.peek(1) == Some('0') { "true" } else { "false" });
                    self.pos += 2;
                }
                c if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) => {
                    self.read_number();
                }
                c if is_ident_start(c) => self.read_identifier(),
                c => {
                    self.out.push(c);
                    self.pos += 1;
                }
            }
        }
        self.out
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    /// Position of the next char that is neither whitespace nor inside a comment.
    fn skip_trivia_from(&self, mut i: usize) -> usize {
        loop {
            match self.chars.get(i) {
                Some(c) if c.is_whitespace() => i += 1,
                Some('/') if self.chars.get(i + 1) == Some(&'/') => {
                    while i < self.chars.len() && self.chars[i] != '\n' {
                        i += 1;
                    }
                }
                Some('/') if self.chars.get(i + 1) == Some(&'*') => {
                    i += 2;
                    while i < self.chars.len()
                        && !(self.chars[i] == '*' && self.chars.get(i + 1) == Some(&'/'))
                    {
                        i += 1;
                    }
                    i = (i + 2).min(self.chars.len());
                }
                _ => return i,
            }
        }
    }

    fn skip_comment(&mut self) {
        let end = self.skip_trivia_from(self.pos);
        // keep line structure so error positions stay meaningful
        if self.chars[self.pos..end].contains(&'\n') {
            self.out.push('\n');
        } else {
            self.out.push(' ');
        }
        self.pos = end;
    }

    fn followed_by_colon(&self) -> bool {
        self.chars.get(self.skip_trivia_from(self.pos)) == Some(&':')
    }

    fn push_json_string(&mut self, s: &str) {
        match serde_json::to_string(s) {
            Ok(quoted) => self.out.push_str(&quoted),
            Err(_) => self.out.push_str("null"),
        }
    }

    fn read_string(&mut self, quote: char) -> String {
        let mut s = String::new();
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                c if c == quote => return s,
                '\\' => self.read_escape(&mut s),
                c => s.push(c),
            }
        }
        s
    }

    fn read_escape(&mut self, s: &mut String) {
        let Some(c) = self.peek(0) else {
            return;
        };
        self.pos += 1;
        match c {
            'n' => s.push('\n'),
            't' => s.push('\t'),
            'r' => s.push('\r'),
            'b' => s.push('\u{8}'),
            'f' => s.push('\u{c}'),
            'v' => s.push('\u{b}'),
            '0' if !self.peek(0).is_some_and(|d| d.is_ascii_digit()) => s.push('\0'),
            '\r' => {
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            'x' => match self.read_hex(2) {
                Some(code) => s.push(char::from_u32(code).unwrap_or('\u{fffd}')),
                None => s.push('x'),
            },
            'u' => {
                let code = if self.peek(0) == Some('{') {
                    self.read_braced_hex()
                } else {
                    self.read_hex(4)
                };
                match code {
                    Some(high @ 0xD800..=0xDBFF) => s.push(self.finish_surrogate(high)),
                    Some(code) => s.push(char::from_u32(code).unwrap_or('\u{fffd}')),
                    None => s.push('u'),
                }
            }
            other => s.push(other),
        }
    }

    fn finish_surrogate(&mut self, high: u32) -> char {
        if self.peek(0) == Some('\\') && self.peek(1) == Some('u') {
            let save = self.pos;
            self.pos += 2;
            if let Some(low @ 0xDC00..=0xDFFF) = self.read_hex(4) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(code).unwrap_or('\u{fffd}');
            }
            self.pos = save;
        }
        '\u{fffd}'
    }

    fn read_hex(&mut self, len: usize) -> Option<u32> {
        let digits: String = self.chars.get(self.pos..self.pos + len)?.iter().collect();
        let code = u32::from_str_radix(&digits, 16).ok()?;
        self.pos += len;
        Some(code)
    }

    fn read_braced_hex(&mut self) -> Option<u32> {
        let close = self.chars[self.pos..].iter().position(|&c| c == '}')?;
        let digits: String = self.chars[self.pos + 1..self.pos + close].iter().collect();
        let code = u32::from_str_radix(&digits, 16).ok()?;
        self.pos += close + 1;
        Some(code)
    }

    fn read_number(&mut self) {
        let start = self.pos;
        let text: String;

        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X')) {
            self.pos += 2;
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start + 2..self.pos].iter().collect();
            text = match u64::from_str_radix(&digits, 16) {
                Ok(n) => n.to_string(),
                Err(_) => self.chars[start..self.pos].iter().collect(),
            };
        } else {
            while self.peek(0).is_some_and(|c| c.is_ascii_digit() || c == '.') {
                self.pos += 1;
            }
            if matches!(self.peek(0), Some('e' | 'E')) {
                self.pos += 1;
                if matches!(self.peek(0), Some('+' | '-')) {
                    self.pos += 1;
                }
                while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            let raw: String = self.chars[start..self.pos].iter().collect();
            text = normalize_decimal(&raw);
        }

        if self.followed_by_colon() {
            self.push_json_string(&text);
        } else {
            self.out.push_str(&text);
        }
    }

    fn read_identifier(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
        let ident: String = self.chars[start..self.pos].iter().collect();

        if self.followed_by_colon() {
            self.push_json_string(&ident);
            return;
        }

        match ident.as_str() {
            "true" | "false" | "null" => self.out.push_str(&ident),
            "undefined" | "NaN" | "Infinity" => {
                // a unary sign before a non-finite literal has nothing to apply to
                let end = self.out.trim_end().len();
                if self.out[..end].ends_with(['-', '+']) {
                    self.out.truncate(end - 1);
                }
                self.out.push_str("null");
            }
            "void" => {
                let next = self.skip_trivia_from(self.pos);
                if self.chars.get(next) == Some(&'0') {
                    self.pos = next + 1;
                }
                self.out.push_str("null");
            }
            _ => self.push_json_string(&ident),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// `.5` → `0.5`, `5.` → `5.0`, leading zeros dropped.
fn normalize_decimal(raw: &str) -> String {
    let mut s = raw.to_string();
    if s.starts_with('.') {
        s.insert(0, '0');
    }
    if let Some(dot) = s.find('.')
        && !s[dot + 1..].starts_with(|c: char| c.is_ascii_digit())
    {
        s.insert(dot + 1, '0');
    }
    let int_end = s.find(['.', 'e', 'E']).unwrap_or(s.len());
    let trimmed = s[..int_end].trim_start_matches('0');
    let int_part = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{int_part}{}", &s[int_end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::LazyLock;

    fn parse(js: &str) -> Value {
        let json = js_to_json(js);
        serde_json::from_str(&json).unwrap_or_else(|e| panic!("{e}: {json}"))
    }

    #[test]
    fn quotes_keys_and_converts_single_quotes() {
        assert_eq!(
            parse(r#"{id: 'a7f0', "title": 'It\'s "here"', $k: 1, _x2: `tpl`}"#),
            json!({"id": "a7f0", "title": "It's \"here\"", "$k": 1, "_x2": "tpl"})
        );
    }

    #[test]
    fn literals_and_trailing_commas() {
        assert_eq!(
            parse("{a: undefined, b: void 0, c: !0, d: !1, e: [1, 2, ], f: {g: null,},}"),
            json!({"a": null, "b": null, "c": true, "d": false, "e": [1, 2], "f": {"g": null}})
        );
    }

    #[test]
    fn non_finite_numbers_become_null() {
        assert_eq!(
            parse("{max: Infinity, min: -Infinity, spaced: - Infinity, rate: NaN, gap: -1}"),
            json!({"max": null, "min": null, "spaced": null, "rate": null, "gap": -1})
        );
    }

    #[test]
    fn numbers_are_normalized() {
        assert_eq!(
            parse("{hex: 0x1F, frac: .5, dot: 5., exp: 1e3, neg: -2.5, 1: 'one', lead: 007}"),
            json!({"hex": 31, "frac": 0.5, "dot": 5.0, "exp": 1000.0, "neg": -2.5, "1": "one", "lead": 7})
        );
    }

    #[test]
    fn comments_are_dropped() {
        let js = "{\n  // player id\n  id: 'x', /* legacy, ] */ list: [1 /* one */, 2, // two\n ],\n}";
        assert_eq!(parse(js), json!({"id": "x", "list": [1, 2]}));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse(r"{a: '\x41B\u{43}', b: 'line\
cont', c: '😀', d: 'tab\there', e: 'https:\/\/k.io\/x'}"),
            json!({"a": "ABC", "b": "linecont", "c": "\u{1F600}", "d": "tab\there", "e": "https://k.io/x"})
        );
    }

    #[test]
    fn bare_identifiers_become_strings() {
        assert_eq!(
            parse("{mode: autoplay, url: 'https://a/b?c=1&d=2'}"),
            json!({"mode": "autoplay", "url": "https://a/b?c=1&d=2"})
        );
    }

    #[test]
    fn plain_json_passes_through() {
        let value = json!({"a": [1, {"b": "c\"d"}], "e": -1.5e-3, "f": "π"});
        assert_eq!(parse(&value.to_string()), value);
    }

    #[test]
    fn balanced_object_ignores_brackets_in_strings_and_comments() {
        let input = "  {a: '}', b: \"{\", c: [1, 2], // }\n d: `]`} trailing; var x = {};";
        assert_eq!(
            extract_balanced_object(input),
            Some("{a: '}', b: \"{\", c: [1, 2], // }\n d: `]`}")
        );
        assert_eq!(extract_balanced_object("x = {}"), None);
        assert_eq!(extract_balanced_object("{unterminated: 1"), None);
        assert_eq!(extract_balanced_object("[1, [2]] tail"), Some("[1, [2]]"));
    }

    static START: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"var\s+playerOptions\s*=").unwrap());

    #[test]
    fn search_json_finds_assignment() {
        let page = "<script>var playerOptions = {playlist: [{id: 'x'}]};\nvar other = {};</script>";
        let value = search_json(&START, page, "player data").unwrap();
        assert_eq!(value["playlist"][0]["id"], "x");
    }

    #[test]
    fn search_json_reports_missing_block() {
        let err = search_json(&START, "<html></html>", "player data").unwrap_err();
        assert!(matches!(err, ExtractorError::ValidationError(ref m) if m.contains("player data")));

        let err = search_json(&START, "var playerOptions = loadOptions();", "player data").unwrap_err();
        assert!(matches!(err, ExtractorError::ValidationError(_)));
    }

    #[test]
    fn search_json_reports_unparseable_block() {
        let err = search_json(&START, "var playerOptions = {a: b c};", "player data").unwrap_err();
        assert!(matches!(err, ExtractorError::JsonError(_)));
    }
}
