//! Braid Context Engine
//!
//! Deterministic context selection over thread-graph snapshots: bounded
//! closure expansion, active-context compilation and budgeted unfold
//! planning. Everything in this crate is a pure function over the caller's
//! snapshot, re-running an operation on the same input yields the same
//! output.

mod closure;
mod compile;
mod lexical;
mod planner;

pub use closure::{expand_closure, fold_members, ClosureResult, EdgeTraceEntry};
pub use compile::{
    compile_active_context, CompileExplain, CompiledContext, ParentLink, ParentSource,
};
pub use lexical::{estimate_tokens, node_preview, score_text, tokenize_query};
pub use planner::{
    apply_unfold, plan_unfold, ApplyOptions, ApplyResult, ApplyStep, PlanOptions, PlanResult,
    UnfoldCandidate,
};
