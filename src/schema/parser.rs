//! schema::parser
//!
//! Generic statement syntax of the modeling language.
//!
//! Every construct is a statement: a keyword, an optional argument, and
//! either a terminating `;` or a `{ ... }` block of substatements. This
//! module turns source text into a [`Statement`] tree without interpreting
//! any keyword; [`super::compile`] gives the tree its meaning.
//!
//! # Lexical rules
//!
//! - `//` line comments and `/* */` block comments
//! - unquoted arguments end at whitespace, `;`, `{` or `}`
//! - double-quoted strings support `\n`, `\t`, `\"` and `\\` escapes
//! - single-quoted strings are taken literally
//! - quoted strings may be concatenated with `+`
//!
//! # Example
//!
//! ```
//! use modreg::schema::parser::parse_statements;
//!
//! let module = parse_statements("module m { prefix \"m\"; leaf l { type string; } }").unwrap();
//! assert_eq!(module.keyword, "module");
//! assert_eq!(module.child_arg("prefix"), Some("m"));
//! assert_eq!(module.children.len(), 2);
//! ```

use thiserror::Error;

/// A syntax error with the line it was found on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One parsed statement and its substatements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Keyword, possibly prefixed for extension statements (`ext:foo`).
    pub keyword: String,
    /// Argument, if any.
    pub argument: Option<String>,
    /// Line the keyword starts on (1-based).
    pub line: usize,
    /// Substatements in source order.
    pub children: Vec<Statement>,
}

impl Statement {
    /// The argument, or an empty string when there is none.
    pub fn arg(&self) -> &str {
        self.argument.as_deref().unwrap_or("")
    }

    /// First substatement with the given keyword.
    pub fn child(&self, keyword: &str) -> Option<&Statement> {
        self.children.iter().find(|c| c.keyword == keyword)
    }

    /// All substatements with the given keyword.
    pub fn children_named<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Statement> {
        self.children.iter().filter(move |c| c.keyword == keyword)
    }

    /// Argument of the first substatement with the given keyword.
    pub fn child_arg(&self, keyword: &str) -> Option<&str> {
        self.child(keyword).and_then(|c| c.argument.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Open,
    Close,
    Semi,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.line;
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(SyntaxError::new(start, "unterminated comment"));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Next token with the line it starts on, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, SyntaxError> {
        self.skip_trivia()?;
        let line = self.line;
        let token = match self.peek() {
            None => return Ok(None),
            Some('{') => {
                self.bump();
                Token::Open
            }
            Some('}') => {
                self.bump();
                Token::Close
            }
            Some(';') => {
                self.bump();
                Token::Semi
            }
            Some('"') | Some('\'') => Token::Quoted(self.quoted_concat()?),
            Some(_) => Token::Word(self.unquoted()),
        };
        Ok(Some((token, line)))
    }

    fn unquoted(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, ';' | '{' | '}' | '"' | '\'') {
                break;
            }
            if c == '/' && matches!(self.peek_at(1), Some('/') | Some('*')) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn quoted_concat(&mut self) -> Result<String, SyntaxError> {
        let mut out = self.quoted()?;
        loop {
            let save = (self.pos, self.line);
            self.skip_trivia()?;
            if self.peek() != Some('+') {
                (self.pos, self.line) = save;
                return Ok(out);
            }
            self.bump();
            self.skip_trivia()?;
            match self.peek() {
                Some('"') | Some('\'') => out.push_str(&self.quoted()?),
                _ => return Err(SyntaxError::new(self.line, "expected quoted string after '+'")),
            }
        }
    }

    fn quoted(&mut self) -> Result<String, SyntaxError> {
        let start = self.line;
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SyntaxError::new(start, "unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') if quote == '"' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        return Err(SyntaxError::new(
                            self.line,
                            format!("invalid escape sequence '\\{other}'"),
                        ))
                    }
                    None => return Err(SyntaxError::new(start, "unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

struct Parser {
    lexer: Lexer,
    lookahead: Option<(Token, usize)>,
}

impl Parser {
    fn next(&mut self) -> Result<Option<(Token, usize)>, SyntaxError> {
        match self.lookahead.take() {
            Some(t) => Ok(Some(t)),
            None => self.lexer.next_token(),
        }
    }

    fn statement(&mut self, keyword: String, line: usize) -> Result<Statement, SyntaxError> {
        let mut stmt = Statement {
            keyword,
            argument: None,
            line,
            children: Vec::new(),
        };

        let mut token = self.next()?;
        if let Some((Token::Word(arg) | Token::Quoted(arg), _)) = token {
            stmt.argument = Some(arg);
            token = self.next()?;
        }

        match token {
            Some((Token::Semi, _)) => Ok(stmt),
            Some((Token::Open, _)) => {
                loop {
                    match self.next()? {
                        Some((Token::Close, _)) => return Ok(stmt),
                        Some((Token::Word(kw), l)) => {
                            let child = self.statement(kw, l)?;
                            stmt.children.push(child);
                        }
                        Some((other, l)) => {
                            return Err(SyntaxError::new(
                                l,
                                format!("expected keyword, found {}", describe(&other)),
                            ))
                        }
                        None => {
                            return Err(SyntaxError::new(
                                line,
                                format!("missing '}}' for '{}'", stmt.keyword),
                            ))
                        }
                    }
                }
            }
            Some((other, l)) => Err(SyntaxError::new(
                l,
                format!(
                    "expected ';' or '{{' after '{}', found {}",
                    stmt.keyword,
                    describe(&other)
                ),
            )),
            None => Err(SyntaxError::new(
                line,
                format!("unexpected end of input in '{}'", stmt.keyword),
            )),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("'{w}'"),
        Token::Quoted(q) => format!("string \"{q}\""),
        Token::Open => "'{'".into(),
        Token::Close => "'}'".into(),
        Token::Semi => "';'".into(),
    }
}

/// Parse source text holding exactly one top-level statement.
///
/// # Errors
///
/// Returns a [`SyntaxError`] for malformed input, an empty document, or
/// trailing content after the top-level statement.
pub fn parse_statements(src: &str) -> Result<Statement, SyntaxError> {
    let mut parser = Parser {
        lexer: Lexer::new(src),
        lookahead: None,
    };

    let root = match parser.next()? {
        Some((Token::Word(kw), line)) => parser.statement(kw, line)?,
        Some((other, line)) => {
            return Err(SyntaxError::new(
                line,
                format!("expected keyword, found {}", describe(&other)),
            ))
        }
        None => return Err(SyntaxError::new(1, "empty document")),
    };

    if let Some((token, line)) = parser.next()? {
        return Err(SyntaxError::new(
            line,
            format!("unexpected {} after top-level statement", describe(&token)),
        ));
    }

    Ok(root)
}
