// Purpose: Evaluate a parsed DEPS manifest into the dependency table.
// Inputs/Outputs: ManifestAst in, DepsTable (vars + submodule path -> {url, pin}) out.
// Invariants: Only string literals, Var substitution, and concatenation are evaluated.
// Gotchas: String-form entries split at the LAST `@` so ssh user@host urls survive.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, bail};

use super::lexer::Span;
use super::parser::{self, Assign, DictEntry, ExprKind, ManifestAst};
use super::suggest;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepEntry {
    pub url: String,
    pub pin: String,
}

#[derive(Clone, Debug, Default)]
pub struct DepsTable {
    pub vars: BTreeMap<String, String>,
    pub deps: BTreeMap<String, DepEntry>,
}

impl DepsTable {
    pub fn parse(src: &str) -> anyhow::Result<Self> {
        let ast = parser::parse_text(src)?;
        build_table(&ast)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("evaluate {}", path.display()))
    }
}

fn find_assign<'a>(ast: &'a ManifestAst, name: &str) -> anyhow::Result<Option<&'a Assign>> {
    let mut found = None;
    for a in &ast.assigns {
        if a.name == name {
            if found.is_some() {
                bail!(
                    "{}:{}: `{}` is assigned more than once",
                    a.span.line,
                    a.span.column,
                    name
                );
            }
            found = Some(a);
        }
    }
    Ok(found)
}

fn dict_entries(assign: &Assign) -> anyhow::Result<&[DictEntry]> {
    match &assign.value.kind {
        ExprKind::Dict(entries) => Ok(entries),
        _ => bail!(
            "{}:{}: `{}` must be a dict",
            assign.span.line,
            assign.span.column,
            assign.name
        ),
    }
}

struct VarEnv<'a> {
    raw: BTreeMap<String, &'a DictEntry>,
    resolved: BTreeMap<String, String>,
    visiting: Vec<String>,
}

impl<'a> VarEnv<'a> {
    fn lookup(&mut self, name: &str, span: Span) -> anyhow::Result<String> {
        if let Some(v) = self.resolved.get(name) {
            return Ok(v.clone());
        }
        let Some(entry) = self.raw.get(name).copied() else {
            match suggest::did_you_mean(name, self.raw.keys().cloned()) {
                Some(hint) => bail!(
                    "{}:{}: undefined var `{}`; {}",
                    span.line,
                    span.column,
                    name,
                    hint
                ),
                None => bail!("{}:{}: undefined var `{}`", span.line, span.column, name),
            }
        };
        if self.visiting.iter().any(|v| v == name) {
            bail!(
                "{}:{}: var `{}` is defined in terms of itself",
                span.line,
                span.column,
                name
            );
        }
        self.visiting.push(name.to_string());
        let value = eval_string(&entry.value, self)?;
        self.visiting.pop();
        self.resolved.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

fn eval_string(expr: &parser::Expr, env: &mut VarEnv) -> anyhow::Result<String> {
    match &expr.kind {
        ExprKind::Str(s) => Ok(s.clone()),
        ExprKind::VarRef(name) => env.lookup(name, expr.span),
        ExprKind::Concat(a, b) => {
            let mut s = eval_string(a, env)?;
            s.push_str(&eval_string(b, env)?);
            Ok(s)
        }
        ExprKind::Dict(_) => bail!(
            "{}:{}: expected a string expression, found a dict",
            expr.span.line,
            expr.span.column
        ),
    }
}

fn build_table(ast: &ManifestAst) -> anyhow::Result<DepsTable> {
    let mut env = VarEnv {
        raw: BTreeMap::new(),
        resolved: BTreeMap::new(),
        visiting: Vec::new(),
    };
    if let Some(assign) = find_assign(ast, "vars")? {
        for entry in dict_entries(assign)? {
            if env.raw.insert(entry.key.clone(), entry).is_some() {
                bail!(
                    "{}:{}: duplicate var `{}`",
                    entry.span.line,
                    entry.span.column,
                    entry.key
                );
            }
        }
    }
    // Resolve every declared var up front so cycles surface even when unused.
    for (name, span) in env
        .raw
        .iter()
        .map(|(k, v)| (k.clone(), v.span))
        .collect::<Vec<_>>()
    {
        env.lookup(&name, span)?;
    }

    let Some(deps_assign) = find_assign(ast, "deps")? else {
        bail!("manifest does not define `deps`");
    };
    let mut deps: BTreeMap<String, DepEntry> = BTreeMap::new();
    for entry in dict_entries(deps_assign)? {
        if deps.contains_key(&entry.key) {
            bail!(
                "{}:{}: duplicate dep `{}`",
                entry.span.line,
                entry.span.column,
                entry.key
            );
        }
        let dep = eval_dep_entry(entry, &mut env)?;
        deps.insert(entry.key.clone(), dep);
    }

    Ok(DepsTable {
        vars: env.resolved,
        deps,
    })
}

fn eval_dep_entry(entry: &DictEntry, env: &mut VarEnv) -> anyhow::Result<DepEntry> {
    if let ExprKind::Dict(fields) = &entry.value.kind {
        let mut url: Option<String> = None;
        let mut pin: Option<String> = None;
        for f in fields {
            let slot = match f.key.as_str() {
                "url" => &mut url,
                "tag" => &mut pin,
                other => bail!(
                    "{}:{}: unknown key `{}` in dep `{}` (expected `url` and `tag`)",
                    f.span.line,
                    f.span.column,
                    other,
                    entry.key
                ),
            };
            if slot.is_some() {
                bail!(
                    "{}:{}: duplicate key `{}` in dep `{}`",
                    f.span.line,
                    f.span.column,
                    f.key,
                    entry.key
                );
            }
            *slot = Some(eval_string(&f.value, env)?);
        }
        let Some(url) = url else {
            bail!(
                "{}:{}: dep `{}` is missing `url`",
                entry.span.line,
                entry.span.column,
                entry.key
            );
        };
        let Some(pin) = pin else {
            bail!(
                "{}:{}: dep `{}` is missing `tag`",
                entry.span.line,
                entry.span.column,
                entry.key
            );
        };
        if url.is_empty() || pin.is_empty() {
            bail!(
                "{}:{}: dep `{}` has an empty url or tag",
                entry.span.line,
                entry.span.column,
                entry.key
            );
        }
        return Ok(DepEntry { url, pin });
    }

    let resolved = eval_string(&entry.value, env)?;
    let Some(at) = resolved.rfind('@') else {
        bail!(
            "{}:{}: dep `{}` has no pinned revision (expected `url@pin` in `{}`)",
            entry.span.line,
            entry.span.column,
            entry.key,
            resolved
        );
    };
    let (url, pin) = (&resolved[..at], &resolved[at + 1..]);
    if url.is_empty() || pin.is_empty() {
        bail!(
            "{}:{}: dep `{}` has an empty url or pin in `{}`",
            entry.span.line,
            entry.span.column,
            entry.key,
            resolved
        );
    }
    Ok(DepEntry {
        url: url.to_string(),
        pin: pin.to_string(),
    })
}
