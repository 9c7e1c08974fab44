//! The closed set of functions callable from rewrite templates.
//!
//! Argument order follows the usual "subject first" convention
//! (`replace s old new n`, `join list sep`, `default value fallback`),
//! except for `ternary` whose condition comes last so it composes with
//! pipes.

use std::collections::HashMap;
use std::fmt;

use super::context::TemplateContext;
use super::format;
use super::template::{TemplateError, Value};

pub type TemplateFn = fn(&TemplateContext<'_>, &[Value]) -> Result<Value, TemplateError>;

#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<&'static str, TemplateFn>,
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable")
            .field("functions", &names)
            .finish()
    }
}

#[derive(Default)]
pub struct FunctionTableBuilder {
    functions: HashMap<&'static str, TemplateFn>,
}

impl FunctionTableBuilder {
    pub fn register(mut self, name: &'static str, func: TemplateFn) -> Self {
        self.functions.insert(name, func);
        self
    }

    pub fn build(self) -> FunctionTable {
        FunctionTable {
            functions: self.functions,
        }
    }
}

impl FunctionTable {
    pub fn builder() -> FunctionTableBuilder {
        FunctionTableBuilder::default()
    }

    /// Every function available to rule templates.
    pub fn standard() -> Self {
        Self::builder()
            // strings
            .register("lower", |_, a| unary_text("lower", a, |s| s.to_lowercase()))
            .register("upper", |_, a| unary_text("upper", a, |s| s.to_uppercase()))
            .register("title", |_, a| unary_text("title", a, title_case))
            .register("trim", |_, a| unary_text("trim", a, |s| s.trim().to_string()))
            .register("trimLeft", trim_left)
            .register("trimRight", trim_right)
            .register("trimPrefix", trim_prefix)
            .register("trimSuffix", trim_suffix)
            .register("replace", replace)
            .register("replaceAll", replace_all)
            .register("hasPrefix", |_, a| {
                let [s, p] = arity::<2>("hasPrefix", a)?;
                Ok(Value::Bool(s.to_text("hasPrefix")?.starts_with(&p.to_text("hasPrefix")?)))
            })
            .register("hasSuffix", |_, a| {
                let [s, p] = arity::<2>("hasSuffix", a)?;
                Ok(Value::Bool(s.to_text("hasSuffix")?.ends_with(&p.to_text("hasSuffix")?)))
            })
            .register("contains", |_, a| {
                let [s, sub] = arity::<2>("contains", a)?;
                Ok(Value::Bool(s.to_text("contains")?.contains(&sub.to_text("contains")?)))
            })
            .register("join", join)
            .register("split", split)
            // paths
            .register("base", |_, a| unary_text("base", a, |s| format::base_name(&s)))
            .register("dir", |_, a| unary_text("dir", a, |s| format::dir_name(&s)))
            .register("ext", |_, a| unary_text("ext", a, |s| format::extension(&s)))
            .register("clean", |_, a| unary_text("clean", a, |s| format::clean_path(&s)))
            .register("joinPath", join_path)
            // time
            .register("formatUnix", |_, a| {
                let [secs, layout] = arity::<2>("formatUnix", a)?;
                let secs = secs.to_int("formatUnix")?;
                let layout = layout.to_text("formatUnix")?;
                Ok(Value::Str(format::format_unix(secs, &layout)?))
            })
            .register("modifyTime", |ctx, a| {
                entry_time("modifyTime", ctx.entry().modify_time_unix, a)
            })
            .register("createTime", |ctx, a| {
                entry_time("createTime", ctx.entry().create_time_unix, a)
            })
            .register("accessTime", |ctx, a| {
                entry_time("accessTime", ctx.entry().access_time_unix, a)
            })
            // size
            .register("formatSize", |_, a| {
                let [size, unit] = arity::<2>("formatSize", a)?;
                Ok(Value::Str(format::format_size(
                    size.to_int("formatSize")?,
                    &unit.to_text("formatSize")?,
                )))
            })
            .register("sizeFormatted", |ctx, a| {
                let [unit] = arity::<1>("sizeFormatted", a)?;
                Ok(Value::Str(format::format_size(
                    ctx.size(),
                    &unit.to_text("sizeFormatted")?,
                )))
            })
            // lists
            .register("first", |_, a| {
                let [list] = arity::<1>("first", a)?;
                Ok(Value::Str(list.to_list("first")?.into_iter().next().unwrap_or_default()))
            })
            .register("last", |_, a| {
                let [list] = arity::<1>("last", a)?;
                Ok(Value::Str(list.to_list("last")?.pop().unwrap_or_default()))
            })
            .register("index", index)
            .register("length", length)
            // logic
            .register("ternary", |_, a| {
                let [yes, no, cond] = arity::<3>("ternary", a)?;
                Ok(if cond.is_empty() { no.clone() } else { yes.clone() })
            })
            .register("default", |_, a| {
                let [value, fallback] = arity::<2>("default", a)?;
                Ok(if value.is_empty() { fallback.clone() } else { value.clone() })
            })
            .register("eq", |_, a| {
                let [x, y] = arity::<2>("eq", a)?;
                Ok(Value::Bool(values_equal(x, y)))
            })
            .register("ne", |_, a| {
                let [x, y] = arity::<2>("ne", a)?;
                Ok(Value::Bool(!values_equal(x, y)))
            })
            .register("empty", |_, a| {
                let [x] = arity::<1>("empty", a)?;
                Ok(Value::Bool(x.is_empty()))
            })
            // arithmetic
            .register("add", |_, a| arith("add", a, i64::wrapping_add))
            .register("sub", |_, a| arith("sub", a, i64::wrapping_sub))
            .register("mul", |_, a| arith("mul", a, i64::wrapping_mul))
            .register("div", |_, a| {
                arith("div", a, |x, y| if y == 0 { 0 } else { x.wrapping_div(y) })
            })
            // conversions
            .register("toString", |_, a| {
                let [x] = arity::<1>("toString", a)?;
                Ok(Value::Str(x.to_string()))
            })
            .register("toInt", |_, a| {
                let [x] = arity::<1>("toInt", a)?;
                Ok(Value::Int(x.to_int("toInt").unwrap_or(0)))
            })
            .build()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn call(
        &self,
        name: &str,
        ctx: &TemplateContext<'_>,
        args: &[Value],
    ) -> Result<Value, TemplateError> {
        let func = self
            .functions
            .get(name)
            .ok_or_else(|| TemplateError::Exec(format!("function {name:?} not defined")))?;
        func(ctx, args)
    }
}

fn arity<'v, const N: usize>(
    func: &str,
    args: &'v [Value],
) -> Result<&'v [Value; N], TemplateError> {
    <&[Value; N]>::try_from(args).map_err(|_| {
        TemplateError::Exec(format!(
            "{func}: expected {N} argument(s), got {}",
            args.len()
        ))
    })
}

fn unary_text(
    func: &str,
    args: &[Value],
    op: impl FnOnce(String) -> String,
) -> Result<Value, TemplateError> {
    let [s] = arity::<1>(func, args)?;
    Ok(Value::Str(op(s.to_text(func)?)))
}

fn title_case(s: String) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric() && c != '_' && c != '\'';
    }
    out
}

fn trim_left(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, cutset] = arity::<2>("trimLeft", args)?;
    let cutset = cutset.to_text("trimLeft")?;
    let s = s.to_text("trimLeft")?;
    Ok(Value::Str(
        s.trim_start_matches(|c: char| cutset.contains(c)).to_string(),
    ))
}

fn trim_right(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, cutset] = arity::<2>("trimRight", args)?;
    let cutset = cutset.to_text("trimRight")?;
    let s = s.to_text("trimRight")?;
    Ok(Value::Str(s.trim_end_matches(|c: char| cutset.contains(c)).to_string()))
}

fn trim_prefix(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, prefix] = arity::<2>("trimPrefix", args)?;
    let s = s.to_text("trimPrefix")?;
    let prefix = prefix.to_text("trimPrefix")?;
    Ok(Value::Str(
        s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string(),
    ))
}

fn trim_suffix(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, suffix] = arity::<2>("trimSuffix", args)?;
    let s = s.to_text("trimSuffix")?;
    let suffix = suffix.to_text("trimSuffix")?;
    Ok(Value::Str(
        s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string(),
    ))
}

/// `replace s old new n`; a negative `n` replaces every occurrence.
fn replace(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, old, new, n] = arity::<4>("replace", args)?;
    let s = s.to_text("replace")?;
    let old = old.to_text("replace")?;
    let new = new.to_text("replace")?;
    let n = n.to_int("replace")?;
    let replaced = match usize::try_from(n) {
        Ok(count) => s.replacen(old.as_str(), &new, count),
        Err(_) => s.replace(old.as_str(), &new),
    };
    Ok(Value::Str(replaced))
}

fn replace_all(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, old, new] = arity::<3>("replaceAll", args)?;
    let s = s.to_text("replaceAll")?;
    Ok(Value::Str(
        s.replace(old.to_text("replaceAll")?.as_str(), &new.to_text("replaceAll")?),
    ))
}

fn join(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [list, sep] = arity::<2>("join", args)?;
    Ok(Value::Str(list.to_list("join")?.join(&sep.to_text("join")?)))
}

fn split(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [s, sep] = arity::<2>("split", args)?;
    let s = s.to_text("split")?;
    let sep = sep.to_text("split")?;
    let parts = if sep.is_empty() {
        s.chars().map(String::from).collect()
    } else {
        s.split(sep.as_str()).map(str::to_string).collect()
    };
    Ok(Value::List(parts))
}

fn join_path(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let parts = args
        .iter()
        .map(|v| v.to_text("joinPath"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Str(format::join_path(&parts)))
}

fn entry_time(func: &str, secs: i64, args: &[Value]) -> Result<Value, TemplateError> {
    let [layout] = arity::<1>(func, args)?;
    Ok(Value::Str(format::format_unix(secs, &layout.to_text(func)?)?))
}

/// Out-of-range positions yield the empty string.
fn index(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [list, i] = arity::<2>("index", args)?;
    let list = list.to_list("index")?;
    let i = i.to_int("index")?;
    let item = usize::try_from(i)
        .ok()
        .and_then(|i| list.get(i).cloned())
        .unwrap_or_default();
    Ok(Value::Str(item))
}

fn length(_: &TemplateContext<'_>, args: &[Value]) -> Result<Value, TemplateError> {
    let [x] = arity::<1>("length", args)?;
    let len = match x {
        Value::List(items) => items.len(),
        other => other.to_text("length")?.chars().count(),
    };
    Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

fn values_equal(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => a == b,
        _ => x.to_string() == y.to_string(),
    }
}

fn arith(
    func: &str,
    args: &[Value],
    op: impl FnOnce(i64, i64) -> i64,
) -> Result<Value, TemplateError> {
    let [x, y] = arity::<2>(func, args)?;
    Ok(Value::Int(op(x.to_int(func)?, y.to_int(func)?)))
}
