//! expression evaluation
//!
//! String leaves of a document may contain `[eval:<expr>]` spans. `<expr>` is an HCL expression
//! evaluated with [hcl::eval] in a context that only knows
//! - the document itself as `doc`, as it looked after the previous pass and without the values
//!   that still hold `[eval:` or `[_eval:` markers
//! - variables declared on the [Evaluator] (`node`, `service`, `site` when evaluated through a
//!   [crate::context::Context])
//! - the functions in [functions::ALLOWLIST]
//!
//! One pass walks the whole tree and replaces every outermost span with its rendered result, then
//! removes one level of escaping from the text around it (`[_eval:` becomes `[eval:`). Passes repeat
//! until the tree no longer changes.
//!
//! An expression that reads a sibling which is not settled yet fails with "no such key". While
//! passes still make progress such a span, like any span that fails or yields `null`, is kept as-is
//! and retried. Once the tree is stable, a finalizing pass replaces such spans with [UNDEFINED].
//!
//! A result that contains a marker itself is inserted as text and evaluated by the next pass, so
//! nested expressions run outside-in, one level per pass.
pub mod functions;
pub mod span;

use crate::visit::VisitStringsMut;
use hcl::eval::Evaluate;
use indexmap::IndexMap;
use serde_json::Value;
use span::Segment;

/// Replacement text for spans that cannot be evaluated
pub const UNDEFINED: &str = "(undef)";

pub const DEFAULT_MAX_PASSES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct EvalOptions {
    /// emit an advisory for every span that ends up [UNDEFINED]
    pub warn_on_uninitialized: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            warn_on_uninitialized: true,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("evaluation did not converge after {passes} passes")]
    NonConvergent { passes: usize },
}

/// Why a single expression has no value
#[derive(thiserror::Error, Debug)]
pub enum ExprError {
    #[error("syntax error: {0}")]
    Syntax(#[from] hcl_edit::parser::Error),
    #[error("evaluation failed: {0}")]
    Failed(#[from] hcl::eval::Error),
    #[error("result is null")]
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// keep failing spans for a later pass
    Defer,
    /// replace failing spans with [UNDEFINED]
    Finalize,
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    variables: IndexMap<String, Value>,
    max_passes: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            variables: Default::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Make `name` visible to expressions
    ///
    /// Names that are not valid identifiers are sanitized (`my-var` becomes `my_var`).
    pub fn declare_var(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declare_var(name, value);
        self
    }

    /// Evaluate until a fixed point is reached
    pub fn evaluate(&self, value: &Value, options: EvalOptions) -> Result<Value, EvalError> {
        let mut current = value.clone();
        let mut kind = Pass::Defer;

        for pass in 1..=self.max_passes {
            let next = self.pass(&current, kind, options);
            let stable = next == current;
            tracing::trace!(pass, ?kind, stable, "evaluation pass");
            current = next;

            if stable {
                match kind {
                    Pass::Defer => kind = Pass::Finalize,
                    Pass::Finalize => return Ok(current),
                }
            }
        }

        tracing::debug!(passes = self.max_passes, "evaluation did not converge");
        Err(EvalError::NonConvergent {
            passes: self.max_passes,
        })
    }

    /// Evaluate a single expression against `doc`
    pub fn evaluate_expression(&self, expression: &str, doc: &Value) -> Result<Value, ExprError> {
        let ctx = self.context(doc);
        Self::run(expression, &ctx).map(|value| crate::value::to_json(&value))
    }

    fn pass(&self, current: &Value, kind: Pass, options: EvalOptions) -> Value {
        let ctx = self.context(current);
        let mut next = current.clone();

        next.visit_strings_mut(&mut |s: &mut String| {
            if span::has_markers(s) {
                *s = Self::expand(s, &ctx, kind, options);
            }
        });

        next
    }

    /// Only settled values of `doc` are visible
    fn context(&self, doc: &Value) -> hcl::eval::Context<'static> {
        let mut ctx = hcl::eval::Context::new();
        functions::declare_allowlist(&mut ctx);

        for (name, value) in &self.variables {
            ctx.declare_var(name.as_str(), crate::value::to_hcl(value));
        }
        let settled = settled(doc).unwrap_or(Value::Null);
        ctx.declare_var("doc", crate::value::to_hcl(&settled));

        ctx
    }

    fn expand(text: &str, ctx: &hcl::eval::Context, kind: Pass, options: EvalOptions) -> String {
        let mut out = String::with_capacity(text.len());

        for segment in span::segments(text) {
            match segment {
                Segment::Literal(literal) => out.push_str(&span::unshift(literal)),
                Segment::Expression { span, expr } => match Self::render(expr, ctx) {
                    Ok(rendered) => out.push_str(&span::unshift(&rendered)),
                    Err(reason) => match kind {
                        Pass::Defer => out.push_str(span),
                        Pass::Finalize => {
                            if options.warn_on_uninitialized {
                                tracing::warn!(expression = expr.trim(), %reason, "expression is undefined");
                            }
                            out.push_str(UNDEFINED);
                        }
                    },
                },
            }
        }

        out
    }

    fn render(expr: &str, ctx: &hcl::eval::Context) -> Result<String, ExprError> {
        Self::run(expr, ctx)
            .and_then(|value| crate::value::render(&value).ok_or(ExprError::Null))
    }

    fn run(expr: &str, ctx: &hcl::eval::Context) -> Result<hcl::Value, ExprError> {
        let parsed: hcl_edit::expr::Expression = expr.trim().parse()?;
        let value = hcl::Expression::from(parsed).evaluate(ctx)?;
        Ok(value)
    }
}

/// `value` without the string leaves that still hold markers
///
/// Objects drop such entries. An array with such an element is unsettled as a whole, so indexes
/// never shift.
fn settled(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if span::has_markers(s) => None,
        Value::Array(items) => items
            .iter()
            .map(settled)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Value::Object(object) => Some(Value::Object(
            object
                .iter()
                .filter_map(|(key, value)| settled(value).map(|value| (key.clone(), value)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}
