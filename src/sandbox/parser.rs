//! Parser for the closed probe grammar
//!
//! Accepted shape:
//!
//! ```text
//! program    := { import | describe | test }
//! import     := "import" ... "from" STRING ";"?
//! describe   := "test" "." "describe" "(" STRING "," "async"? "(" ")" "=>" "{" { test } "}" ")" ";"?
//! test       := "test" "(" STRING "," "async" "(" "{" IDENT {"," IDENT} "}" ")" "=>" block ")" ";"?
//! stmt       := ("const"|"let") IDENT "=" expr
//!             | "await"? expect
//!             | "for" "(" "const" IDENT "of" expr ")" block
//!             | expr
//! expect     := "expect" "(" expr ")" ["." "not"] "." MATCHER "(" [expr] ")"
//! postfix    := primary { "." IDENT ["(" args ")"] | "[" expr "]" }
//! ```
//!
//! Identifiers are resolved while parsing: anything that is neither a
//! binding in scope nor one of the predefined names is rejected here, so the
//! interpreter never meets an unknown name.

use super::lexer::{self, Spanned, TemplatePart, Tok};
use crate::HttpMethod;

/// The probe body falls outside the accepted grammar
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Names visible in every test body
pub const PREDEFINED: &[&str] = &["authToken"];

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Module names from import declarations
    pub imports: Vec<String>,
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub line: usize,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Bind {
        name: String,
        value: Expr,
    },
    Expect(Expectation),
    ForOf {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    ToBe,
    ToBeLessThan,
    ToBeGreaterThanOrEqual,
    ToBeDefined,
    ToContain,
}

impl Matcher {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "toBe" => Some(Matcher::ToBe),
            "toBeLessThan" => Some(Matcher::ToBeLessThan),
            "toBeGreaterThanOrEqual" => Some(Matcher::ToBeGreaterThanOrEqual),
            "toBeDefined" => Some(Matcher::ToBeDefined),
            "toContain" => Some(Matcher::ToContain),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Matcher::ToBe => "toBe",
            Matcher::ToBeLessThan => "toBeLessThan",
            Matcher::ToBeGreaterThanOrEqual => "toBeGreaterThanOrEqual",
            Matcher::ToBeDefined => "toBeDefined",
            Matcher::ToContain => "toContain",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub subject: Expr,
    pub negated: bool,
    pub matcher: Matcher,
    pub expected: Option<Expr>,
    pub line: usize,
}

/// Methods callable on runtime values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Status,
    Ok,
    Text,
    Json,
    Headers,
    Repeat,
    Includes,
    ToLowerCase,
}

impl Method {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "status" => Some(Method::Status),
            "ok" => Some(Method::Ok),
            "text" => Some(Method::Text),
            "json" => Some(Method::Json),
            "headers" => Some(Method::Headers),
            "repeat" => Some(Method::Repeat),
            "includes" => Some(Method::Includes),
            "toLowerCase" => Some(Method::ToLowerCase),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Status => "status",
            Method::Ok => "ok",
            Method::Text => "text",
            Method::Json => "json",
            Method::Headers => "headers",
            Method::Repeat => "repeat",
            Method::Includes => "includes",
            Method::ToLowerCase => "toLowerCase",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
    Var(String),
    Template(Vec<Segment>),
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        target: Box<Expr>,
        method: Method,
        args: Vec<Expr>,
    },
    Http(HttpCall),
    All(Batch),
}

/// The single HTTP primitive: `request.<verb>(url, options?)`
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: HttpMethod,
    pub url: Box<Expr>,
    pub options: Option<Box<Expr>>,
}

/// Argument of `Promise.all`
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    List(Vec<Expr>),
    /// `Array.from({ length: N }, (_, i) => call)`
    Repeat {
        count: usize,
        index_binding: Option<String>,
        call: Box<Expr>,
    },
}

const MAX_BATCH: usize = 1000;

/// Deepest accepted nesting of expressions, blocks and interpolations
pub const MAX_NESTING: usize = 64;

pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens).program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    scopes: Vec<Vec<String>>,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            scopes: Vec::new(),
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, CompileError>) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|s| &s.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|s| &s.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.line(), message)
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(Tok::Ident(name)) => format!("'{}'", name),
            Some(Tok::Str(_)) | Some(Tok::Template(_)) => "string".to_string(),
            Some(Tok::Number(n)) => format!("number {}", n),
            Some(Tok::Punct(p)) => format!("'{}'", p),
        }
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|s| s.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Tok::Punct(p)) if *p == punct)
    }

    fn is_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(n)) if n == name)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.is_ident(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), CompileError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                punct,
                self.describe_current()
            )))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), CompileError> {
        if self.eat_ident(name) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                name,
                self.describe_current()
            )))
        }
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected identifier, found {}",
                self.describe_current()
            ))),
        }
    }

    /// A string literal, or a template without interpolations
    fn string(&mut self) -> Result<String, CompileError> {
        let value = match self.peek() {
            Some(Tok::Str(value)) => value.clone(),
            Some(Tok::Template(parts)) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(t) => text.push_str(t),
                        TemplatePart::Expr(_) => {
                            return Err(self.error("expected plain string, found interpolation"));
                        }
                    }
                }
                text
            }
            _ => {
                return Err(self.error(format!(
                    "expected string, found {}",
                    self.describe_current()
                )));
            }
        };
        self.pos += 1;
        Ok(value)
    }

    fn declare(&mut self, name: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name);
        }
    }

    fn resolves(&self, name: &str) -> bool {
        PREDEFINED.contains(&name)
            || self
                .scopes
                .iter()
                .any(|scope| scope.iter().any(|n| n == name))
    }

    fn program(mut self) -> Result<Program, CompileError> {
        let mut program = Program {
            imports: Vec::new(),
            tests: Vec::new(),
        };

        while self.peek().is_some() {
            if self.eat_punct(";") {
                continue;
            }
            if self.is_ident("import") {
                program.imports.push(self.import()?);
            } else if self.is_ident("test") {
                if matches!(self.peek_at(1), Some(Tok::Punct("."))) {
                    program.tests.extend(self.describe()?);
                } else {
                    program.tests.push(self.test()?);
                }
            } else {
                return Err(self.error(format!(
                    "expected import or test declaration, found {}",
                    self.describe_current()
                )));
            }
        }

        if program.tests.is_empty() {
            return Err(CompileError::new(self.line(), "no test declared"));
        }
        Ok(program)
    }

    fn import(&mut self) -> Result<String, CompileError> {
        self.expect_keyword("import")?;
        while !self.is_ident("from") {
            if self.next().is_none() {
                return Err(self.error("import without 'from'"));
            }
        }
        self.expect_keyword("from")?;
        let module = self.string()?;
        self.eat_punct(";");
        Ok(module)
    }

    fn describe(&mut self) -> Result<Vec<TestCase>, CompileError> {
        self.expect_keyword("test")?;
        self.expect_punct(".")?;
        self.expect_keyword("describe")?;
        self.expect_punct("(")?;
        self.string()?;
        self.expect_punct(",")?;
        self.eat_ident("async");
        self.expect_punct("(")?;
        self.expect_punct(")")?;
        self.expect_punct("=>")?;
        self.expect_punct("{")?;

        let mut tests = Vec::new();
        while !self.eat_punct("}") {
            if self.eat_punct(";") {
                continue;
            }
            if !self.is_ident("test") {
                return Err(self.error(format!(
                    "expected test declaration, found {}",
                    self.describe_current()
                )));
            }
            if matches!(self.peek_at(1), Some(Tok::Punct("."))) {
                tests.extend(self.nested(Self::describe)?);
            } else {
                tests.push(self.test()?);
            }
        }

        self.expect_punct(")")?;
        self.eat_punct(";");
        Ok(tests)
    }

    fn test(&mut self) -> Result<TestCase, CompileError> {
        let line = self.line();
        self.expect_keyword("test")?;
        self.expect_punct("(")?;
        let name = self.string()?;
        self.expect_punct(",")?;
        self.expect_keyword("async")?;
        self.expect_punct("(")?;
        self.expect_punct("{")?;
        loop {
            let fixture = self.ident()?;
            if fixture != "request" {
                return Err(self.error(format!("unsupported fixture '{}'", fixture)));
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        self.expect_punct(")")?;
        self.expect_punct("=>")?;
        let body = self.block()?;
        self.expect_punct(")")?;
        self.eat_punct(";");
        Ok(TestCase { name, line, body })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect_punct("{")?;
        self.scopes.push(Vec::new());
        let mut stmts = Vec::new();
        while !self.eat_punct("}") {
            if self.peek().is_none() {
                return Err(self.error("unterminated block"));
            }
            if self.eat_punct(";") {
                continue;
            }
            stmts.push(self.stmt()?);
        }
        self.scopes.pop();
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, CompileError> {
        if self.eat_ident("const") || self.eat_ident("let") {
            let name = self.ident()?;
            self.expect_punct("=")?;
            let value = self.expr()?;
            self.eat_punct(";");
            self.declare(name.clone());
            return Ok(Stmt::Bind { name, value });
        }

        if self.eat_ident("for") {
            self.expect_punct("(")?;
            if !self.eat_ident("const") {
                self.expect_keyword("let")?;
            }
            let binding = self.ident()?;
            self.expect_keyword("of")?;
            let iterable = self.expr()?;
            self.expect_punct(")")?;
            self.scopes.push(vec![binding.clone()]);
            let body = self.block();
            self.scopes.pop();
            return Ok(Stmt::ForOf {
                binding,
                iterable,
                body: body?,
            });
        }

        let awaited = self.eat_ident("await");
        if self.is_ident("expect") {
            let expectation = self.expectation()?;
            self.eat_punct(";");
            return Ok(Stmt::Expect(expectation));
        }
        if awaited {
            self.pos -= 1;
        }
        let expr = self.expr()?;
        self.eat_punct(";");
        Ok(Stmt::Expr(expr))
    }

    fn expectation(&mut self) -> Result<Expectation, CompileError> {
        let line = self.line();
        self.expect_keyword("expect")?;
        self.expect_punct("(")?;
        let subject = self.expr()?;
        self.expect_punct(")")?;
        self.expect_punct(".")?;

        let mut negated = false;
        let mut name = self.ident()?;
        if name == "not" {
            negated = true;
            self.expect_punct(".")?;
            name = self.ident()?;
        }
        let matcher = Matcher::from_name(&name)
            .ok_or_else(|| CompileError::new(line, format!("unsupported matcher '{}'", name)))?;
        if negated && matcher != Matcher::ToContain {
            return Err(CompileError::new(
                line,
                format!("'.not' is only supported with toContain, not {}", name),
            ));
        }

        self.expect_punct("(")?;
        let expected = if self.is_punct(")") {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect_punct(")")?;

        if matcher != Matcher::ToBeDefined && expected.is_none() {
            return Err(CompileError::new(line, format!("{} needs an argument", name)));
        }

        Ok(Expectation {
            subject,
            negated,
            matcher,
            expected,
            line,
        })
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        self.nested(|p| {
            p.eat_ident("await");
            p.postfix()
        })
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let name = self.ident()?;
                if self.is_punct("(") {
                    let method = Method::from_name(&name)
                        .ok_or_else(|| self.error(format!("unsupported method '{}'", name)))?;
                    let args = self.args()?;
                    expr = Expr::Call {
                        target: Box::new(expr),
                        method,
                        args,
                    };
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat_punct("[") {
                let index = self.expr()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, CompileError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.expr()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let line = self.line();
        let Some(tok) = self.next() else {
            return Err(self.error("unexpected end of input"));
        };

        match tok {
            Tok::Str(value) => Ok(Expr::Str(value)),
            Tok::Number(n) => Ok(Expr::Number(n)),
            Tok::Template(parts) => self.template(parts),
            Tok::Punct("-") => match self.next() {
                Some(Tok::Number(n)) => Ok(Expr::Number(-n)),
                _ => Err(CompileError::new(line, "'-' must prefix a number")),
            },
            Tok::Punct("(") => {
                let inner = self.expr()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Tok::Punct("{") => self.object(),
            Tok::Punct("[") => {
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.expr()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Tok::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "null" => Ok(Expr::Null),
                "undefined" => Ok(Expr::Undefined),
                "request" => self.http_call(),
                "Promise" => self.batch(),
                _ if self.resolves(&name) => Ok(Expr::Var(name)),
                _ => Err(CompileError::new(line, format!("unknown identifier '{}'", name))),
            },
            Tok::Punct(p) => Err(CompileError::new(line, format!("unexpected '{}'", p))),
        }
    }

    fn template(&mut self, parts: Vec<TemplatePart>) -> Result<Expr, CompileError> {
        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePart::Text(text) => segments.push(Segment::Text(text)),
                TemplatePart::Expr(tokens) => {
                    let mut inner = Parser {
                        tokens,
                        pos: 0,
                        scopes: self.scopes.clone(),
                        depth: self.depth,
                    };
                    let expr = inner.expr()?;
                    if inner.peek().is_some() {
                        return Err(inner.error("unexpected tokens in template interpolation"));
                    }
                    segments.push(Segment::Expr(expr));
                }
            }
        }
        Ok(Expr::Template(segments))
    }

    fn object(&mut self) -> Result<Expr, CompileError> {
        let mut fields = Vec::new();
        while !self.eat_punct("}") {
            let line = self.line();
            let key = match self.next() {
                Some(Tok::Ident(name)) => name,
                Some(Tok::Str(value)) => value,
                Some(Tok::Number(n)) => n.to_string(),
                _ => return Err(CompileError::new(line, "expected object key")),
            };
            let value = if self.eat_punct(":") {
                self.expr()?
            } else if self.resolves(&key) {
                Expr::Var(key.clone())
            } else {
                return Err(CompileError::new(line, format!("unknown identifier '{}'", key)));
            };
            fields.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(fields))
    }

    fn http_call(&mut self) -> Result<Expr, CompileError> {
        self.expect_punct(".")?;
        let verb = self.ident()?;
        let method = HttpMethod::from_str(&verb)
            .ok_or_else(|| self.error(format!("unsupported request method '{}'", verb)))?;
        let mut args = self.args()?.into_iter();
        let url = args
            .next()
            .ok_or_else(|| self.error(format!("request.{} needs a URL", verb)))?;
        let options = args.next().map(Box::new);
        if args.next().is_some() {
            return Err(self.error(format!("too many arguments to request.{}", verb)));
        }
        Ok(Expr::Http(HttpCall {
            method,
            url: Box::new(url),
            options,
        }))
    }

    fn batch(&mut self) -> Result<Expr, CompileError> {
        self.expect_punct(".")?;
        self.expect_keyword("all")?;
        self.expect_punct("(")?;

        let batch = if self.eat_ident("Array") {
            self.expect_punct(".")?;
            self.expect_keyword("from")?;
            self.expect_punct("(")?;
            self.expect_punct("{")?;
            self.expect_keyword("length")?;
            self.expect_punct(":")?;
            let line = self.line();
            let count = match self.next() {
                Some(Tok::Number(n)) if n >= 0.0 && n.fract() == 0.0 && (n as usize) <= MAX_BATCH => {
                    n as usize
                }
                _ => {
                    return Err(CompileError::new(
                        line,
                        format!("Array.from length must be an integer up to {}", MAX_BATCH),
                    ));
                }
            };
            self.expect_punct("}")?;
            self.expect_punct(",")?;
            self.eat_ident("async");
            self.expect_punct("(")?;
            let mut params = Vec::new();
            while !self.eat_punct(")") {
                params.push(self.ident()?);
                if !self.eat_punct(",") {
                    self.expect_punct(")")?;
                    break;
                }
            }
            if params.len() > 2 {
                return Err(self.error("Array.from callback takes at most two parameters"));
            }
            self.expect_punct("=>")?;
            let index_binding = params.get(1).cloned();
            self.scopes.push(params);
            let call = self.expr();
            self.scopes.pop();
            self.expect_punct(")")?;
            Batch::Repeat {
                count,
                index_binding,
                call: Box::new(call?),
            }
        } else {
            let line = self.line();
            match self.primary()? {
                Expr::Array(items) => {
                    if items.len() > MAX_BATCH {
                        return Err(CompileError::new(line, "Promise.all batch too large"));
                    }
                    Batch::List(items)
                }
                _ => {
                    return Err(CompileError::new(
                        line,
                        "Promise.all expects an array literal or Array.from",
                    ));
                }
            }
        };

        self.expect_punct(")")?;
        Ok(Expr::All(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY: &str = r#"
import { test, expect } from '@playwright/test';

test('GET /api/users happy path', async ({ request }) => {
  const response = await request.get('http://x.test/api/users', {
    headers: { Authorization: `Bearer ${authToken}` },
  });
  expect(response.status()).toBeLessThan(500);
});
"#;

    #[test]
    fn test_parse_happy_probe() {
        let program = parse(HAPPY).unwrap();
        assert_eq!(program.imports, vec!["@playwright/test".to_string()]);
        assert_eq!(program.tests.len(), 1);
        let test = &program.tests[0];
        assert_eq!(test.name, "GET /api/users happy path");
        assert_eq!(test.line, 4);
        assert_eq!(test.body.len(), 2);

        let Stmt::Bind { name, value } = &test.body[0] else {
            panic!("expected binding");
        };
        assert_eq!(name, "response");
        let Expr::Http(call) = value else {
            panic!("expected request call");
        };
        assert_eq!(call.method, HttpMethod::Get);
        assert!(call.options.is_some());

        let Stmt::Expect(expectation) = &test.body[1] else {
            panic!("expected expectation");
        };
        assert_eq!(expectation.matcher, Matcher::ToBeLessThan);
        assert!(!expectation.negated);
    }

    #[test]
    fn test_parse_negated_contain_and_loops() {
        let source = r#"
test('batch', async ({ request }) => {
  const responses = await Promise.all(Array.from({ length: 3 }, () => request.get('/a')));
  expect(responses.length).toBe(3);
  for (const r of responses) {
    const body = await r.text();
    expect(body.toLowerCase()).not.toContain('sql syntax');
  }
});
"#;
        let program = parse(source).unwrap();
        let body = &program.tests[0].body;
        assert!(matches!(
            &body[0],
            Stmt::Bind { value: Expr::All(Batch::Repeat { count: 3, .. }), .. }
        ));
        let Stmt::ForOf { body: inner, .. } = &body[2] else {
            panic!("expected for-of");
        };
        let Stmt::Expect(expectation) = &inner[1] else {
            panic!("expected expectation");
        };
        assert!(expectation.negated);
        assert_eq!(expectation.matcher, Matcher::ToContain);
    }

    #[test]
    fn test_describe_is_flattened() {
        let source = r#"
test.describe('users', () => {
  test('a', async ({ request }) => { await request.get('/a'); });
  test('b', async ({ request }) => { await request.get('/b'); });
});
"#;
        let program = parse(source).unwrap();
        let names: Vec<_> = program.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_identifier_is_rejected() {
        let source = "test('x', async ({ request }) => {\n  require('child_process');\n});";
        let err = parse(source).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("require"));
    }

    #[test]
    fn test_unsupported_method_is_rejected() {
        let source = "test('x', async ({ request }) => {\n  const r = await request.get('/a');\n  r.constructor('x');\n});";
        let err = parse(source).unwrap_err();
        assert!(err.message.contains("constructor"), "{}", err.message);
    }

    #[test]
    fn test_not_only_with_contain() {
        let source = "test('x', async ({ request }) => {\n  expect(1).not.toBe(2);\n});";
        let err = parse(source).unwrap_err();
        assert!(err.message.contains("toContain"));
    }

    #[test]
    fn test_binding_out_of_scope() {
        let source = r#"
test('x', async ({ request }) => {
  for (const r of [1, 2]) { const inner = r; }
  expect(inner).toBeDefined();
});
"#;
        assert!(parse(source).is_err());
    }

    #[test]
    fn test_deep_nesting_is_a_compile_error() {
        let wrap = |inner: &str| format!("test('x', async ({{ request }}) => {{\n  const a = {};\n}});", inner);
        let parens = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));

        assert!(parse(&wrap(&parens(MAX_NESTING - 8))).is_ok());

        let err = parse(&wrap(&parens(100_000))).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "nesting too deep");

        let arrays = format!("{}{}", "[".repeat(100_000), "]".repeat(100_000));
        assert_eq!(parse(&wrap(&arrays)).unwrap_err().message, "nesting too deep");

        let loops = format!(
            "test('x', async ({{ request }}) => {{\n{}{}}});",
            "for (const r of [1]) {\n".repeat(10_000),
            "}\n".repeat(10_000)
        );
        assert_eq!(parse(&loops).unwrap_err().message, "nesting too deep");
    }

    #[test]
    fn test_empty_program_is_rejected() {
        let err = parse("import { test } from '@playwright/test';").unwrap_err();
        assert_eq!(err.message, "no test declared");
    }
}
