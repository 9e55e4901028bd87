// Purpose: Manifest front end: lex, parse, and evaluate DEPS files declaratively.
// Inputs/Outputs: Turns DEPS text into a DepsTable of submodule path -> {url, pin}.
// Invariants: Evaluation is restricted to string literals, Var substitution, and concatenation.
// Gotchas: The grammar is deliberately closed; widening it reopens the exec-a-manifest hole.

pub mod eval;
pub mod lexer;
pub mod parser;
pub mod suggest;
