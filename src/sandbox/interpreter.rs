//! Async evaluator for parsed probe programs
//!
//! Every request goes through the probe's [`ExecutionContext`]; nothing else
//! in a probe body can reach outside the interpreter.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::parser::{Batch, Expectation, Expr, HttpCall, Matcher, Method, Program, Segment, Stmt};
use super::ProbeExecutionError;
use crate::http::{join_url, ExecutionContext, HttpReply, HttpRequest};

/// Cap on `String.repeat` output
const MAX_REPEAT_LEN: usize = 16 * 1024 * 1024;

/// Requests one program may send, nested batches included
pub const MAX_REQUESTS: usize = 1000;

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
    Response(Arc<HttpReply>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Response(_) => "APIResponse",
        }
    }

    fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Response(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields {
                    if !matches!(v, Value::Undefined) {
                        map.insert(k.clone(), v.to_json());
                    }
                }
                serde_json::Value::Object(map)
            }
        }
    }

    /// String coercion used by template literals
    fn coerce_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.coerce_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Response(_) => "[object APIResponse]".to_string(),
        }
    }

    /// Rendering used in assertion messages
    fn display(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s),
            Value::Response(reply) => format!("APIResponse {{ status: {} }}", reply.status),
            Value::Array(_) | Value::Object(_) => self.to_json().to_string(),
            other => other.coerce_string(),
        }
    }

    fn get(&self, key: &str) -> Result<Value, ProbeExecutionError> {
        match self {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                self.type_name(),
                key
            ))),
            Value::Str(s) if key == "length" => Ok(Value::Number(s.encode_utf16().count() as f64)),
            Value::Array(items) if key == "length" => Ok(Value::Number(items.len() as f64)),
            Value::Object(fields) => Ok(fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Undefined)),
            Value::Array(items) => match key.parse::<usize>() {
                Ok(index) => Ok(items.get(index).cloned().unwrap_or(Value::Undefined)),
                Err(_) => Ok(Value::Undefined),
            },
            _ => Ok(Value::Undefined),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn type_error(message: impl Into<String>) -> ProbeExecutionError {
    ProbeExecutionError::Assertion(format!("TypeError: {}", message.into()))
}

/// Block-scoped variable bindings
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: Vec<(String, Value)>,
}

impl Env {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.vars.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn push(&mut self, name: impl Into<String>, value: Value) {
        self.vars.push((name.into(), value));
    }
}

pub struct Interpreter<'a> {
    context: &'a ExecutionContext,
    base_url: &'a str,
    auth_token: &'a str,
    /// Request slots taken so far; batches take theirs before fanning out
    slots: AtomicUsize,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a ExecutionContext, base_url: &'a str, auth_token: &'a str) -> Self {
        Self {
            context,
            base_url,
            auth_token,
            slots: AtomicUsize::new(0),
        }
    }

    fn reserve(&self, slots: usize) -> Result<(), ProbeExecutionError> {
        let before = self.slots.fetch_add(slots, Ordering::SeqCst);
        if before.saturating_add(slots) > MAX_REQUESTS {
            return Err(ProbeExecutionError::Assertion(format!(
                "RangeError: more than {} requests in one run",
                MAX_REQUESTS
            )));
        }
        Ok(())
    }

    /// Run every test in order; the first failing test stops the program
    pub async fn run(&self, program: &Program) -> Result<(), ProbeExecutionError> {
        for test in &program.tests {
            let mut env = Env::default();
            env.push("authToken", Value::Str(self.auth_token.to_string()));
            self.exec_block(&test.body, &mut env)
                .await
                .map_err(|e| match e {
                    ProbeExecutionError::Assertion(message) => {
                        ProbeExecutionError::Assertion(format!("{}: {}", test.name, message))
                    }
                    ProbeExecutionError::Network(message) => {
                        ProbeExecutionError::Network(format!("{}: {}", test.name, message))
                    }
                    other => other,
                })?;
        }
        Ok(())
    }

    fn exec_block<'s>(
        &'s self,
        stmts: &'s [Stmt],
        env: &'s mut Env,
    ) -> BoxFuture<'s, Result<(), ProbeExecutionError>> {
        async move {
            let mark = env.vars.len();
            for stmt in stmts {
                match stmt {
                    Stmt::Bind { name, value } => {
                        let value = self.eval(value, env).await?;
                        env.push(name.clone(), value);
                    }
                    Stmt::Expect(expectation) => self.check(expectation, env).await?,
                    Stmt::ForOf {
                        binding,
                        iterable,
                        body,
                    } => {
                        let items = match self.eval(iterable, env).await? {
                            Value::Array(items) => items,
                            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                            other => {
                                return Err(type_error(format!(
                                    "{} is not iterable",
                                    other.type_name()
                                )));
                            }
                        };
                        for item in items {
                            env.push(binding.clone(), item);
                            self.exec_block(body, env).await?;
                            env.vars.pop();
                        }
                    }
                    Stmt::Expr(expr) => {
                        self.eval(expr, env).await?;
                    }
                }
            }
            env.vars.truncate(mark);
            Ok(())
        }
        .boxed()
    }

    fn eval<'s>(&'s self, expr: &'s Expr, env: &'s Env) -> BoxFuture<'s, Result<Value, ProbeExecutionError>> {
        async move {
            match expr {
                Expr::Str(s) => Ok(Value::Str(s.clone())),
                Expr::Number(n) => Ok(Value::Number(*n)),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Null => Ok(Value::Null),
                Expr::Undefined => Ok(Value::Undefined),
                Expr::Var(name) => Ok(env.lookup(name).cloned().unwrap_or(Value::Undefined)),
                Expr::Template(segments) => {
                    let mut out = String::new();
                    for segment in segments {
                        match segment {
                            Segment::Text(text) => out.push_str(text),
                            Segment::Expr(expr) => out.push_str(&self.eval(expr, env).await?.coerce_string()),
                        }
                    }
                    Ok(Value::Str(out))
                }
                Expr::Object(fields) => {
                    let mut values = Vec::with_capacity(fields.len());
                    for (key, value) in fields {
                        values.push((key.clone(), self.eval(value, env).await?));
                    }
                    Ok(Value::Object(values))
                }
                Expr::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item, env).await?);
                    }
                    Ok(Value::Array(values))
                }
                Expr::Member(target, key) => self.eval(target, env).await?.get(key),
                Expr::Index(target, index) => {
                    let target = self.eval(target, env).await?;
                    let key = match self.eval(index, env).await? {
                        Value::Number(n) => format_number(n),
                        other => other.coerce_string(),
                    };
                    if let (Value::Str(s), Ok(i)) = (&target, key.parse::<usize>()) {
                        return Ok(s
                            .chars()
                            .nth(i)
                            .map(|c| Value::Str(c.to_string()))
                            .unwrap_or(Value::Undefined));
                    }
                    target.get(&key)
                }
                Expr::Call {
                    target,
                    method,
                    args,
                } => {
                    let target = self.eval(target, env).await?;
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg, env).await?);
                    }
                    call_method(target, *method, values)
                }
                Expr::Http(call) => self.http(call, env, false).await,
                Expr::All(batch) => self.batch(batch, env).await,
            }
        }
        .boxed()
    }

    /// Send one request; `reserved` when the enclosing batch already took its slot
    async fn http(&self, call: &HttpCall, env: &Env, reserved: bool) -> Result<Value, ProbeExecutionError> {
        let url = match self.eval(&call.url, env).await? {
            Value::Str(url) => url,
            other => return Err(type_error(format!("URL must be a string, got {}", other.type_name()))),
        };
        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url
        } else {
            join_url(self.base_url, &url)
        };

        let mut request = HttpRequest::new(call.method, url);
        if let Some(options) = &call.options {
            match self.eval(options, env).await? {
                Value::Object(fields) => {
                    for (key, value) in fields {
                        match (key.as_str(), value) {
                            ("headers", Value::Object(headers)) => {
                                for (name, value) in headers {
                                    request = request.header(name, value.coerce_string());
                                }
                            }
                            ("data", Value::Str(raw)) => request = request.raw_body(raw),
                            ("data", Value::Undefined) => {}
                            ("data", value) => request = request.json(&value.to_json()),
                            (other, _) => {
                                tracing::debug!("Ignoring request option '{}'", other);
                            }
                        }
                    }
                }
                Value::Undefined => {}
                other => {
                    return Err(type_error(format!(
                        "request options must be an object, got {}",
                        other.type_name()
                    )));
                }
            }
        }

        if !reserved {
            self.reserve(1)?;
        }
        let reply = self
            .context
            .send(request)
            .await
            .map_err(|e| ProbeExecutionError::Network(e.to_string()))?;
        Ok(Value::Response(Arc::new(reply)))
    }

    /// Evaluate a batch element, spending the slot the batch reserved for it
    fn element<'s>(&'s self, item: &'s Expr, env: &'s Env) -> BoxFuture<'s, Result<Value, ProbeExecutionError>> {
        match item {
            Expr::Http(call) => self.http(call, env, true).boxed(),
            other => self.eval(other, env),
        }
    }

    async fn batch(&self, batch: &Batch, env: &Env) -> Result<Value, ProbeExecutionError> {
        let results = match batch {
            Batch::List(items) => {
                // Nested batches reserve for their own elements
                self.reserve(items.iter().filter(|item| !matches!(item, Expr::All(_))).count())?;
                join_all(items.iter().map(|item| self.element(item, env))).await
            }
            Batch::Repeat {
                count,
                index_binding,
                call,
            } => {
                if !matches!(**call, Expr::All(_)) {
                    self.reserve(*count)?;
                }
                let scoped: Vec<Env> = (0..*count)
                    .map(|i| {
                        let mut env = env.clone();
                        if let Some(name) = index_binding {
                            env.push(name.clone(), Value::Number(i as f64));
                        }
                        env
                    })
                    .collect();
                join_all(scoped.iter().map(|env| self.element(call, env))).await
            }
        };
        results.into_iter().collect::<Result<Vec<_>, _>>().map(Value::Array)
    }

    async fn check(&self, expectation: &Expectation, env: &Env) -> Result<(), ProbeExecutionError> {
        let received = self.eval(&expectation.subject, env).await?;
        let expected = match &expectation.expected {
            Some(expr) => Some(self.eval(expr, env).await?),
            None => None,
        };
        assert_matcher(expectation, &received, expected.as_ref())
    }
}

fn call_method(target: Value, method: Method, args: Vec<Value>) -> Result<Value, ProbeExecutionError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
    match (method, &target) {
        (Method::Status, Value::Response(reply)) => Ok(Value::Number(f64::from(reply.status))),
        (Method::Ok, Value::Response(reply)) => Ok(Value::Bool((200..300).contains(&reply.status))),
        (Method::Text, Value::Response(reply)) => Ok(Value::Str(reply.body.clone())),
        (Method::Json, Value::Response(reply)) => serde_json::from_str(&reply.body)
            .map(Value::from_json)
            .map_err(|e| ProbeExecutionError::Assertion(format!("SyntaxError: response is not JSON: {}", e))),
        (Method::Headers, Value::Response(reply)) => Ok(Value::Object(
            reply
                .headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), Value::Str(v.clone())))
                .collect(),
        )),
        (Method::Repeat, Value::Str(s)) => match arg(0) {
            Value::Number(n) if n >= 0.0 && n.is_finite() => {
                let count = n as usize;
                if s.len().saturating_mul(count) > MAX_REPEAT_LEN {
                    return Err(ProbeExecutionError::Assertion(
                        "RangeError: Invalid string length".to_string(),
                    ));
                }
                Ok(Value::Str(s.repeat(count)))
            }
            _ => Err(ProbeExecutionError::Assertion(
                "RangeError: Invalid count value".to_string(),
            )),
        },
        (Method::Includes, Value::Str(s)) => match arg(0) {
            Value::Str(needle) => Ok(Value::Bool(s.contains(needle.as_str()))),
            other => Ok(Value::Bool(s.contains(other.coerce_string().as_str()))),
        },
        (Method::Includes, Value::Array(items)) => {
            let needle = arg(0);
            Ok(Value::Bool(items.iter().any(|v| strict_equals(v, &needle))))
        }
        (Method::ToLowerCase, Value::Str(s)) => Ok(Value::Str(s.to_lowercase())),
        _ => Err(type_error(format!(
            "{}.{} is not a function",
            target.type_name(),
            method.name()
        ))),
    }
}

fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::Response(x), Value::Response(y)) => Arc::ptr_eq(x, y),
        _ => a == b,
    }
}

fn assert_matcher(
    expectation: &Expectation,
    received: &Value,
    expected: Option<&Value>,
) -> Result<(), ProbeExecutionError> {
    let name = expectation.matcher.name();
    let not = if expectation.negated { ".not" } else { "" };
    let expected_value = expected.cloned().unwrap_or(Value::Undefined);

    let pass = match expectation.matcher {
        Matcher::ToBe => strict_equals(received, &expected_value),
        Matcher::ToBeDefined => !matches!(received, Value::Undefined),
        Matcher::ToBeLessThan | Matcher::ToBeGreaterThanOrEqual => {
            let (Value::Number(r), Value::Number(e)) = (received, &expected_value) else {
                return Err(ProbeExecutionError::Assertion(format!(
                    "line {}: expect(received).{}(expected)\n\nMatcher error: received and expected values must be numbers\nReceived: {}\nExpected: {}",
                    expectation.line,
                    name,
                    received.display(),
                    expected_value.display()
                )));
            };
            if expectation.matcher == Matcher::ToBeLessThan {
                r < e
            } else {
                r >= e
            }
        }
        Matcher::ToContain => match (received, &expected_value) {
            (Value::Str(haystack), Value::Str(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.iter().any(|v| strict_equals(v, needle)),
            _ => {
                return Err(ProbeExecutionError::Assertion(format!(
                    "line {}: expect(received){}.toContain(expected)\n\nMatcher error: received value must not be {}",
                    expectation.line,
                    not,
                    received.type_name()
                )));
            }
        },
    };

    if pass != expectation.negated {
        return Ok(());
    }

    let mut message = format!(
        "line {}: expect(received){}.{}({})\n\n",
        expectation.line,
        not,
        name,
        if expected.is_some() { "expected" } else { "" }
    );
    match expectation.matcher {
        Matcher::ToBeDefined => message.push_str(&format!("Received: {}", received.display())),
        Matcher::ToBeLessThan => message.push_str(&format!(
            "Expected: < {}\nReceived:   {}",
            expected_value.display(),
            received.display()
        )),
        Matcher::ToBeGreaterThanOrEqual => message.push_str(&format!(
            "Expected: >= {}\nReceived:    {}",
            expected_value.display(),
            received.display()
        )),
        Matcher::ToContain if expectation.negated => message.push_str(&format!(
            "Expected substring: not {}\nReceived string:        {}",
            expected_value.display(),
            truncate(&received.display())
        )),
        Matcher::ToContain => message.push_str(&format!(
            "Expected substring: {}\nReceived string:    {}",
            expected_value.display(),
            truncate(&received.display())
        )),
        Matcher::ToBe => message.push_str(&format!(
            "Expected: {}\nReceived: {}",
            expected_value.display(),
            received.display()
        )),
    }
    Err(ProbeExecutionError::Assertion(message))
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 200;
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
