//! A small, closed template language for deriving object keys.
//!
//! Text is copied verbatim; `{{ ... }}` actions evaluate a pipeline of
//! commands. A command is either a single operand (`.Field`, `"string"`,
//! `42`, `true`, `(pipeline)`) or a function from the [`FunctionTable`]
//! followed by operands. The value of each pipeline stage is appended as the
//! final argument of the next stage:
//!
//! ```text
//! {{ modifyTime "%Y/%m/%d" }}/{{ .Filename | lower }}
//! {{ join (split .TagsExplicitStr ",") "/" }}
//! ```
//!
//! Nothing outside the registered function set can be called.

use std::fmt;

use super::context::TemplateContext;
use super::functions::FunctionTable;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),

    #[error("template execution error: {0}")]
    Exec(String),
}

/// Runtime value flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    pub fn to_text(&self, func: &str) -> Result<String, TemplateError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::List(_) => Err(TemplateError::Exec(format!(
                "{func}: expected string, got list"
            ))),
        }
    }

    pub fn to_int(&self, func: &str) -> Result<i64, TemplateError> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Str(s) => s.trim().parse().map_err(|_| {
                TemplateError::Exec(format!("{func}: expected integer, got {s:?}"))
            }),
            other => Err(TemplateError::Exec(format!(
                "{func}: expected integer, got {other}"
            ))),
        }
    }

    pub fn to_list(&self, func: &str) -> Result<Vec<String>, TemplateError> {
        match self {
            Value::List(items) => Ok(items.clone()),
            other => Err(TemplateError::Exec(format!(
                "{func}: expected list, got {other}"
            ))),
        }
    }

    /// Zero value test used by `default`, `empty` and conditionals.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::Int(i) => *i == 0,
            Value::Bool(b) => !b,
            Value::List(items) => items.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => write!(f, "[{}]", items.join(" ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Ident(String),
    Str(String),
    Int(i64),
    Bool(bool),
    LParen,
    RParen,
    Pipe,
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Action(Pipeline),
}

#[derive(Debug, Clone)]
struct Pipeline {
    commands: Vec<Command>,
}

#[derive(Debug, Clone)]
enum Command {
    Call { name: String, args: Vec<Operand> },
    Operand(Operand),
}

#[derive(Debug, Clone)]
enum Operand {
    Field(String),
    Literal(Value),
    Pipeline(Box<Pipeline>),
}

/// A parsed template, reusable across entries.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `source`, resolving function names against `functions`.
    pub fn parse(source: &str, functions: &FunctionTable) -> Result<Self, TemplateError> {
        let mut nodes = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                nodes.push(Node::Text(rest[..open].to_string()));
            }
            let mut lexer = Lexer::new(&rest[open + 2..]);
            let tokens = lexer.tokenize()?;
            let mut parser = Parser {
                tokens: &tokens,
                idx: 0,
                functions,
            };
            let pipeline = parser.parse_pipeline()?;
            if parser.idx != tokens.len() {
                return Err(TemplateError::Parse(format!(
                    "unexpected {:?} in action",
                    tokens[parser.idx]
                )));
            }
            nodes.push(Node::Action(pipeline));
            rest = &rest[open + 2 + lexer.pos..];
        }
        if !rest.is_empty() {
            nodes.push(Node::Text(rest.to_string()));
        }
        Ok(Self { nodes })
    }

    pub fn execute(
        &self,
        ctx: &TemplateContext<'_>,
        functions: &FunctionTable,
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => {
                    let value = eval_pipeline(pipeline, ctx, functions)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

fn eval_pipeline(
    pipeline: &Pipeline,
    ctx: &TemplateContext<'_>,
    functions: &FunctionTable,
) -> Result<Value, TemplateError> {
    let mut previous: Option<Value> = None;
    for command in &pipeline.commands {
        let value = match command {
            Command::Operand(operand) => {
                if previous.is_some() {
                    return Err(TemplateError::Exec(
                        "cannot pipe a value into a non-function".into(),
                    ));
                }
                eval_operand(operand, ctx, functions)?
            }
            Command::Call { name, args } => {
                let mut values = args
                    .iter()
                    .map(|arg| eval_operand(arg, ctx, functions))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(prev) = previous.take() {
                    values.push(prev);
                }
                functions.call(name, ctx, &values)?
            }
        };
        previous = Some(value);
    }
    previous.ok_or_else(|| TemplateError::Exec("empty pipeline".into()))
}

fn eval_operand(
    operand: &Operand,
    ctx: &TemplateContext<'_>,
    functions: &FunctionTable,
) -> Result<Value, TemplateError> {
    match operand {
        Operand::Field(name) => ctx
            .field(name)
            .ok_or_else(|| TemplateError::Exec(format!("unknown field .{name}"))),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Pipeline(inner) => eval_pipeline(inner, ctx, functions),
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Consume tokens up to and including the closing `}}`.
    fn tokenize(&mut self) -> Result<Vec<Token>, TemplateError> {
        let src = self.src;
        let mut tokens = Vec::new();
        loop {
            let rest = &src[self.pos..];
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.is_empty() {
                return Err(TemplateError::Parse("unclosed action".into()));
            }
            if trimmed.starts_with("}}") {
                self.pos += 2;
                return Ok(tokens);
            }

            let mut chars = trimmed.chars();
            let Some(c) = chars.next() else {
                return Err(TemplateError::Parse("unclosed action".into()));
            };
            let next = chars.next();
            let token = match c {
                '(' => {
                    self.pos += 1;
                    Token::LParen
                }
                ')' => {
                    self.pos += 1;
                    Token::RParen
                }
                '|' => {
                    self.pos += 1;
                    Token::Pipe
                }
                '"' => self.lex_string(trimmed)?,
                '.' => {
                    let name: String = trimmed[1..]
                        .chars()
                        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
                        .collect();
                    if name.is_empty() || name.ends_with('.') {
                        return Err(TemplateError::Parse("malformed field reference".into()));
                    }
                    self.pos += 1 + name.len();
                    Token::Field(name)
                }
                c if c.is_ascii_digit()
                    || (c == '-' && next.is_some_and(|d| d.is_ascii_digit())) =>
                {
                    let digits: String = trimmed
                        .char_indices()
                        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
                        .map(|(_, c)| c)
                        .collect();
                    self.pos += digits.len();
                    let value = digits.parse().map_err(|_| {
                        TemplateError::Parse(format!("integer out of range: {digits}"))
                    })?;
                    Token::Int(value)
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident: String = trimmed
                        .chars()
                        .take_while(|c| c.is_alphanumeric() || *c == '_')
                        .collect();
                    self.pos += ident.len();
                    match ident.as_str() {
                        "true" => Token::Bool(true),
                        "false" => Token::Bool(false),
                        _ => Token::Ident(ident),
                    }
                }
                other => {
                    return Err(TemplateError::Parse(format!(
                        "unexpected character {other:?} in action"
                    )))
                }
            };
            tokens.push(token);
        }
    }

    fn lex_string(&mut self, input: &str) -> Result<Token, TemplateError> {
        let mut value = String::new();
        let mut escaped = false;
        for (i, c) in input.char_indices().skip(1) {
            if escaped {
                value.push(match c {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += i + 1;
                return Ok(Token::Str(value));
            } else {
                value.push(c);
            }
        }
        Err(TemplateError::Parse("unterminated string literal".into()))
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    idx: usize,
    functions: &'t FunctionTable,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, TemplateError> {
        let mut commands = vec![self.parse_command()?];
        while self.peek() == Some(&Token::Pipe) {
            self.idx += 1;
            commands.push(self.parse_command()?);
        }
        Ok(Pipeline { commands })
    }

    fn parse_command(&mut self) -> Result<Command, TemplateError> {
        if let Some(Token::Ident(name)) = self.peek() {
            let name = name.clone();
            if !self.functions.contains(&name) {
                return Err(TemplateError::Parse(format!(
                    "function {name:?} not defined"
                )));
            }
            self.idx += 1;
            let mut args = Vec::new();
            while let Some(operand) = self.parse_operand()? {
                args.push(operand);
            }
            return Ok(Command::Call { name, args });
        }

        let operand = self
            .parse_operand()?
            .ok_or_else(|| TemplateError::Parse("missing value for command".into()))?;
        if self.parse_operand()?.is_some() {
            return Err(TemplateError::Parse(
                "arguments given to a non-function".into(),
            ));
        }
        Ok(Command::Operand(operand))
    }

    fn parse_operand(&mut self) -> Result<Option<Operand>, TemplateError> {
        let operand = match self.peek() {
            Some(Token::Field(name)) => Operand::Field(name.clone()),
            Some(Token::Str(s)) => Operand::Literal(Value::Str(s.clone())),
            Some(Token::Int(i)) => Operand::Literal(Value::Int(*i)),
            Some(Token::Bool(b)) => Operand::Literal(Value::Bool(*b)),
            Some(Token::LParen) => {
                self.idx += 1;
                let inner = self.parse_pipeline()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(TemplateError::Parse("unclosed parenthesis".into()));
                }
                self.idx += 1;
                return Ok(Some(Operand::Pipeline(Box::new(inner))));
            }
            Some(Token::Ident(name)) => {
                return Err(TemplateError::Parse(format!(
                    "function {name:?} used as an argument; wrap the call in parentheses"
                )))
            }
            Some(Token::RParen) | Some(Token::Pipe) | None => return Ok(None),
        };
        self.idx += 1;
        Ok(Some(operand))
    }
}
