//! functions callable from `[eval:...]` expressions
//!
//! Nothing outside this list is reachable from a configuration file.
use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

pub const ALLOWLIST: &[&str] = &[
    "upper",
    "lower",
    "trim",
    "tonumber",
    "env",
    "join_path",
    "coalesce",
    "hostname",
];

pub(crate) fn declare_allowlist(ctx: &mut Context) {
    let string = || FuncDef::builder().param(ParamType::String);

    ctx.declare_func("upper", string().build(upper));
    ctx.declare_func("lower", string().build(lower));
    ctx.declare_func("trim", string().build(trim));
    ctx.declare_func(
        "tonumber",
        FuncDef::builder()
            .param(ParamType::one_of([ParamType::String, ParamType::Number]))
            .build(tonumber),
    );
    ctx.declare_func("env", string().build(env));
    ctx.declare_func(
        "join_path",
        FuncDef::builder()
            .variadic_param(ParamType::String)
            .build(join_path),
    );
    ctx.declare_func(
        "coalesce",
        FuncDef::builder()
            .variadic_param(ParamType::Any)
            .build(coalesce),
    );
    ctx.declare_func("hostname", FuncDef::builder().build(hostname));
}

fn first_str(args: &FuncArgs) -> Result<&str, String> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| "expected a string argument".to_string())
}

fn upper(args: FuncArgs) -> Result<Value, String> {
    first_str(&args).map(|s| s.to_uppercase().into())
}

fn lower(args: FuncArgs) -> Result<Value, String> {
    first_str(&args).map(|s| s.to_lowercase().into())
}

fn trim(args: FuncArgs) -> Result<Value, String> {
    first_str(&args).map(|s| s.trim().into())
}

fn tonumber(args: FuncArgs) -> Result<Value, String> {
    match args.first() {
        Some(Value::Number(num)) => Ok(Value::Number(*num)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(int) = s.parse::<i64>() {
                return Ok(int.into());
            }
            s.parse::<f64>()
                .ok()
                .and_then(hcl::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("`{s}` is not a number"))
        }
        _ => Err("expected a string or a number".to_string()),
    }
}

/// `null` when the variable is unset, which renders as undefined
fn env(args: FuncArgs) -> Result<Value, String> {
    let name = first_str(&args)?;
    Ok(std::env::var(name).map_or(Value::Null, Value::String))
}

fn join_path(args: FuncArgs) -> Result<Value, String> {
    let mut path = std::path::PathBuf::new();
    for element in args.iter() {
        path.push(element.as_str().unwrap_or_default());
    }
    Ok(path.to_string_lossy().into_owned().into())
}

fn coalesce(args: FuncArgs) -> Result<Value, String> {
    Ok(args
        .iter()
        .find(|value| !value.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn hostname(_args: FuncArgs) -> Result<Value, String> {
    whoami::fallible::hostname()
        .map(Value::String)
        .map_err(|err| err.to_string())
}
