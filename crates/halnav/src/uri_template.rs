//! # URI Templates
//!
//! RFC 6570 (level 3 operators plus the `*` and `:n` modifiers) with support for
//! **partial expansion**: variables that have no value are kept in the output as
//! syntactically valid expressions, so a link can be bound in several steps.
//!
//! ```rust
//! use halnav::uri_template::UriTemplate;
//! use serde_json::json;
//!
//! let template = UriTemplate::parse("/items/{id}{?q,page}");
//! let partial = template
//!     .bind("id", json!("42"))
//!     .bind("page", json!(2))
//!     .expand_partial();
//! assert_eq!(partial, "/items/42?page=2{&q}");
//!
//! // Nothing bound: the template comes back unchanged.
//! assert_eq!(UriTemplate::parse("/items/{id}{?q,page}").expand_partial(), "/items/{id}{?q,page}");
//! ```
//!
//! ## Partial expansion rules
//!
//! - Query operators (`?`, `&`) emit all bound variables first and then a single
//!   continuation expression (`{&rest}`) for the unbound ones.
//! - Self-prefixing operators (`/`, `.`, `;`) keep the variable order; consecutive
//!   unbound variables stay grouped in one expression.
//! - Operators without a per-variable prefix (simple, `+`, `#`) are only expanded
//!   once all of their variables are bound; otherwise the expression is kept intact.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Returns `true` if `uri` still contains at least one `{...}` expression.
pub fn has_expressions(uri: &str) -> bool {
    match uri.find('{') {
        Some(start) => uri[start..].contains('}'),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::Path),
            ';' => Some(Operator::PathParam),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Operator::Simple => "",
            Operator::Reserved => "+",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    fn first(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ",",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query | Operator::QueryContinuation => "&",
        }
    }

    fn named(self) -> bool {
        matches!(
            self,
            Operator::PathParam | Operator::Query | Operator::QueryContinuation
        )
    }

    fn if_empty(self) -> &'static str {
        match self {
            Operator::Query | Operator::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Operator::Reserved | Operator::Fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    explode: bool,
    prefix: Option<usize>,
}

impl VarSpec {
    fn parse(raw: &str) -> Self {
        if let Some(name) = raw.strip_suffix('*') {
            return Self {
                name: name.to_string(),
                explode: true,
                prefix: None,
            };
        }
        if let Some((name, len)) = raw.split_once(':') {
            if let Ok(len) = len.parse() {
                return Self {
                    name: name.to_string(),
                    explode: false,
                    prefix: Some(len),
                };
            }
        }
        Self {
            name: raw.to_string(),
            explode: false,
            prefix: None,
        }
    }

    fn source(&self) -> String {
        match (self.explode, self.prefix) {
            (true, _) => format!("{}*", self.name),
            (false, Some(len)) => format!("{}:{}", self.name, len),
            (false, None) => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression {
        operator: Operator,
        variables: Vec<VarSpec>,
    },
}

/// A parsed URI template together with the values bound so far.
#[derive(Debug, Clone, Default)]
pub struct UriTemplate {
    parts: Vec<Part>,
    values: HashMap<String, Value>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Self {
        let mut parts = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            let body = &rest[start + 1..start + len];
            let mut chars = body.chars();
            let (operator, names) = match chars.next().and_then(Operator::from_char) {
                Some(op) => (op, chars.as_str()),
                None => (Operator::Simple, body),
            };
            parts.push(Part::Expression {
                operator,
                variables: names
                    .split(',')
                    .filter(|n| !n.is_empty())
                    .map(VarSpec::parse)
                    .collect(),
            });
            rest = &rest[start + len + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }
        Self {
            parts,
            values: HashMap::new(),
        }
    }

    /// Names of all variables declared by the template, in order of appearance.
    pub fn variables(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Expression { variables, .. } => Some(variables),
                Part::Literal(_) => None,
            })
            .flatten()
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Binds a value; `null` (and empty lists/objects) leave the variable unset.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn bind_all(mut self, values: &Map<String, Value>) -> Self {
        for (name, value) in values {
            self.values.insert(name.clone(), value.clone());
        }
        self
    }

    /// Whether a variable outside a query expression is still unbound. Unbound query
    /// variables (`{?..}`, `{&..}`) are optional: [`expand`](Self::expand) drops them.
    pub fn has_unbound_required(&self) -> bool {
        self.parts.iter().any(|part| match part {
            Part::Expression {
                operator,
                variables,
            } => {
                !matches!(operator, Operator::Query | Operator::QueryContinuation)
                    && variables.iter().any(|v| self.value_of(v).is_none())
            }
            Part::Literal(_) => false,
        })
    }

    /// Expands all bound variables and keeps unbound ones as expressions.
    pub fn expand_partial(&self) -> String {
        self.render(true)
    }

    /// Expands all bound variables and drops unbound ones (RFC 6570 semantics).
    pub fn expand(&self) -> String {
        self.render(false)
    }

    fn value_of(&self, var: &VarSpec) -> Option<&Value> {
        match self.values.get(&var.name) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Object(entries)) if entries.is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn render(&self, keep_unbound: bool) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression {
                    operator,
                    variables,
                } => {
                    if keep_unbound {
                        self.render_partial(&mut out, *operator, variables);
                    } else {
                        self.render_bound(&mut out, *operator, variables);
                    }
                }
            }
        }
        out
    }

    fn render_bound(&self, out: &mut String, operator: Operator, variables: &[VarSpec]) {
        let mut first = true;
        for var in variables {
            if let Some(value) = self.value_of(var) {
                out.push_str(if first {
                    operator.first()
                } else {
                    operator.separator()
                });
                first = false;
                expand_value(out, operator, var, value);
            }
        }
    }

    fn render_partial(&self, out: &mut String, operator: Operator, variables: &[VarSpec]) {
        let unbound: Vec<&VarSpec> = variables
            .iter()
            .filter(|v| self.value_of(v).is_none())
            .collect();
        if unbound.is_empty() {
            self.render_bound(out, operator, variables);
            return;
        }
        match operator {
            Operator::Simple | Operator::Reserved | Operator::Fragment => {
                push_expression(out, operator.symbol(), variables.iter());
            }
            Operator::Query | Operator::QueryContinuation => {
                let bound_any = unbound.len() < variables.len();
                self.render_bound(out, operator, variables);
                let continuation = if bound_any || operator == Operator::QueryContinuation {
                    "&"
                } else {
                    "?"
                };
                push_expression(out, continuation, unbound.into_iter());
            }
            Operator::Label | Operator::Path | Operator::PathParam => {
                let mut pending: Vec<&VarSpec> = Vec::new();
                for var in variables {
                    match self.value_of(var) {
                        Some(value) => {
                            if !pending.is_empty() {
                                push_expression(out, operator.symbol(), pending.drain(..));
                            }
                            out.push_str(operator.first());
                            expand_value(out, operator, var, value);
                        }
                        None => pending.push(var),
                    }
                }
                if !pending.is_empty() {
                    push_expression(out, operator.symbol(), pending.into_iter());
                }
            }
        }
    }
}

fn push_expression<'a>(out: &mut String, symbol: &str, vars: impl Iterator<Item = &'a VarSpec>) {
    out.push('{');
    out.push_str(symbol);
    let names: Vec<String> = vars.map(VarSpec::source).collect();
    out.push_str(&names.join(","));
    out.push('}');
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn expand_value(out: &mut String, operator: Operator, var: &VarSpec, value: &Value) {
    let reserved = operator.allow_reserved();
    match value {
        Value::Array(items) => {
            let encoded: Vec<String> = items.iter().map(|i| encode(&scalar(i), reserved)).collect();
            if var.explode {
                let joined: Vec<String> = if operator.named() {
                    encoded
                        .iter()
                        .map(|v| named_pair(operator, &var.name, v))
                        .collect()
                } else {
                    encoded
                };
                out.push_str(&joined.join(operator.separator()));
            } else {
                if operator.named() {
                    out.push_str(&var.name);
                    out.push('=');
                }
                out.push_str(&encoded.join(","));
            }
        }
        Value::Object(entries) => {
            let pairs: Vec<(String, String)> = entries
                .iter()
                .map(|(k, v)| (encode(k, reserved), encode(&scalar(v), reserved)))
                .collect();
            if var.explode {
                let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
                out.push_str(&joined.join(operator.separator()));
            } else {
                if operator.named() {
                    out.push_str(&var.name);
                    out.push('=');
                }
                let flat: Vec<String> = pairs.into_iter().flat_map(|(k, v)| [k, v]).collect();
                out.push_str(&flat.join(","));
            }
        }
        _ => {
            let mut text = scalar(value);
            if let Some(len) = var.prefix {
                text = text.chars().take(len).collect();
            }
            let encoded = encode(&text, reserved);
            if operator.named() {
                out.push_str(&named_pair(operator, &var.name, &encoded));
            } else {
                out.push_str(&encoded);
            }
        }
    }
}

fn named_pair(operator: Operator, name: &str, encoded: &str) -> String {
    if encoded.is_empty() {
        format!("{name}{}", operator.if_empty())
    } else {
        format!("{name}={encoded}")
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn is_reserved(b: u8) -> bool {
    matches!(
        b,
        b':' | b'/' | b'?' | b'#' | b'[' | b']' | b'@' | b'!' | b'$' | b'&' | b'\''
            | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
    )
}

fn encode(text: &str, allow_reserved: bool) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let pct_triplet = allow_reserved
            && b == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        if is_unreserved(b) || (allow_reserved && is_reserved(b)) || pct_triplet {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
        i += 1;
    }
    out
}
