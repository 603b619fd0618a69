//! Intermediate AST for the PRISM language constructs we emit.
//!
//! Kept as a typed tree rather than ad-hoc string formatting (the source
//! repo's `formula_generators.py`/`module_generators.py` pattern of
//! repeated near-duplicate templates) so that Property 2 of the spec
//! ("every identifier used in a guard or update is either a declared
//! region state variable or a declared formula") is checkable in-memory,
//! against this tree, before any text is rendered.

use std::fmt::Write as _;

/// Deterministic 6-fractional-digit formatting for numeric literals (§6.2).
pub fn format_const(v: f64) -> String {
    format!("{v:.6}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// A boolean expression over PRISM variables and previously-declared
/// formulas. Variable names are plain strings (`state_3`, `step_3`, ...);
/// the predicate/module synthesisers are responsible for only ever naming
/// variables that some module actually declares.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `var op literal`
    Cmp(String, CmpOp, i64),
    /// `var = v1 | var = v2 | ...` (rendered in one parenthesised group)
    In(String, Vec<i64>),
    /// A reference to a `formula`-declared name.
    FormulaRef(String),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    True,
    False,
}

impl Expr {
    pub fn cmp(var: impl Into<String>, op: CmpOp, value: i64) -> Self {
        Expr::Cmp(var.into(), op, value)
    }

    pub fn eq(var: impl Into<String>, value: i64) -> Self {
        Expr::cmp(var, CmpOp::Eq, value)
    }

    pub fn r#in(var: impl Into<String>, values: impl Into<Vec<i64>>) -> Self {
        Expr::In(var.into(), values.into())
    }

    pub fn and(parts: impl Into<Vec<Expr>>) -> Self {
        let parts = parts.into();
        match parts.len() {
            0 => Expr::True,
            1 => parts.into_iter().next().unwrap(),
            _ => Expr::And(parts),
        }
    }

    pub fn or(parts: impl Into<Vec<Expr>>) -> Self {
        let parts = parts.into();
        match parts.len() {
            0 => Expr::False,
            1 => parts.into_iter().next().unwrap(),
            _ => Expr::Or(parts),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn render(&self) -> String {
        match self {
            Expr::Cmp(var, op, v) => format!("{var}{}{v}", op.symbol()),
            Expr::In(var, values) => {
                if values.len() == 1 {
                    format!("{var}={}", values[0])
                } else {
                    let parts: Vec<String> = values.iter().map(|v| format!("{var}={v}")).collect();
                    format!("({})", parts.join("|"))
                }
            }
            Expr::FormulaRef(name) => name.clone(),
            Expr::Not(inner) => format!("!({})", inner.render()),
            Expr::And(parts) => {
                if parts.is_empty() {
                    "true".to_string()
                } else {
                    let rendered: Vec<String> = parts.iter().map(Expr::render).collect();
                    format!("({})", rendered.join("&"))
                }
            }
            Expr::Or(parts) => {
                if parts.is_empty() {
                    "false".to_string()
                } else {
                    let rendered: Vec<String> = parts.iter().map(Expr::render).collect();
                    format!("({})", rendered.join("|"))
                }
            }
            Expr::True => "true".to_string(),
            Expr::False => "false".to_string(),
        }
    }

    /// Every plain variable name referenced anywhere in this expression
    /// (not counting formula references), used by Property 2 closure
    /// checks.
    pub fn variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Cmp(var, ..) | Expr::In(var, _) => out.push(var.clone()),
            Expr::FormulaRef(_) | Expr::True | Expr::False => {}
            Expr::Not(inner) => inner.variables(out),
            Expr::And(parts) | Expr::Or(parts) => {
                for p in parts {
                    p.variables(out);
                }
            }
        }
    }

    /// Every formula name referenced anywhere in this expression.
    pub fn formula_refs(&self, out: &mut Vec<String>) {
        match self {
            Expr::FormulaRef(name) => out.push(name.clone()),
            Expr::Cmp(..) | Expr::In(..) | Expr::True | Expr::False => {}
            Expr::Not(inner) => inner.formula_refs(out),
            Expr::And(parts) | Expr::Or(parts) => {
                for p in parts {
                    p.formula_refs(out);
                }
            }
        }
    }
}

/// A single-variable update inside a command's right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// `var' = literal`
    Int(String, i64),
    /// `var' = var + 1`
    Increment(String),
}

impl Assign {
    fn render(&self) -> String {
        match self {
            Assign::Int(var, v) => format!("({var}'={v})"),
            Assign::Increment(var) => format!("({var}'={var}+1)"),
        }
    }

    pub fn var(&self) -> &str {
        match self {
            Assign::Int(v, _) | Assign::Increment(v) => v,
        }
    }
}

/// One weighted branch of a command's update. `probability` is `None`
/// for a command with a single, fully-weighted arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub probability: Option<f64>,
    pub assigns: Vec<Assign>,
}

impl Arm {
    pub fn deterministic(assigns: Vec<Assign>) -> Self {
        Arm {
            probability: None,
            assigns,
        }
    }

    pub fn weighted(probability: f64, assigns: Vec<Assign>) -> Self {
        Arm {
            probability: Some(probability),
            assigns,
        }
    }

    fn render(&self) -> String {
        let body = if self.assigns.is_empty() {
            "true".to_string()
        } else {
            let parts: Vec<String> = self.assigns.iter().map(Assign::render).collect();
            parts.join(" & ")
        };
        match self.probability {
            Some(p) => format!("{}:{body}", format_const(p)),
            None => body,
        }
    }
}

/// A guarded command, optionally labelled with a synchronising action.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// `None` renders as the unlabelled `[]`.
    pub action: Option<String>,
    pub name: String,
    pub guard: Expr,
    pub arms: Vec<Arm>,
}

impl Command {
    pub fn render(&self) -> String {
        let label = match &self.action {
            Some(name) => format!("[{name}]"),
            None => "[]".to_string(),
        };
        let body = self
            .arms
            .iter()
            .map(Arm::render)
            .collect::<Vec<_>>()
            .join(" + ");
        format!("  {label} {} -> {body}; // {}", self.guard.render(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub low: i64,
    pub high: i64,
    pub init: i64,
}

impl VarDecl {
    fn render(&self) -> String {
        format!("  {} : [{}..{}] init {};", self.name, self.low, self.high, self.init)
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub variables: Vec<VarDecl>,
    pub commands: Vec<Command>,
}

impl Module {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "module {}", self.name);
        for v in &self.variables {
            let _ = writeln!(out, "{}", v.render());
        }
        if !self.variables.is_empty() {
            let _ = writeln!(out);
        }
        for c in &self.commands {
            let _ = writeln!(out, "{}", c.render());
        }
        let _ = write!(out, "endmodule");
        out
    }

    /// Every variable this module declares.
    pub fn declared_vars(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Formula {
    pub name: String,
    pub body: Expr,
}

impl Formula {
    pub fn render_formula(&self) -> String {
        format!("formula {} = {};", self.name, self.body.render())
    }

    pub fn render_label(&self) -> String {
        format!("label \"{}\" = {};", self.name, self.body.render())
    }
}

/// A named, ordered group of formulas. Groups are rendered with blank
/// lines between them, matching §6.2 item 2's fixed ordering.
#[derive(Debug, Clone, Default)]
pub struct FormulaSection {
    pub formulas: Vec<Formula>,
}

#[derive(Debug, Clone)]
pub struct RewardItem {
    pub guard: Expr,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct Rewards {
    pub impact_name: String,
    pub items: Vec<RewardItem>,
}

impl Rewards {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "rewards \"{}\"", self.impact_name);
        for item in &self.items {
            let _ = writeln!(out, "  {} : {};", item.guard.render(), format_const(item.value));
        }
        let _ = write!(out, "endrewards");
        out
    }
}

/// The complete synthesised model, in the exact top-to-bottom layout of
/// §6.2: header, formula sections, modules (ascending id), labels,
/// rewards (sorted by impact name).
#[derive(Debug, Clone, Default)]
pub struct PrismModel {
    pub formula_sections: Vec<FormulaSection>,
    pub modules: Vec<Module>,
    pub rewards: Vec<Rewards>,
}

impl PrismModel {
    pub fn all_formulas(&self) -> impl Iterator<Item = &Formula> {
        self.formula_sections.iter().flat_map(|s| &s.formulas)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "mdp");
        let _ = writeln!(out);

        for (i, section) in self.formula_sections.iter().enumerate() {
            if section.formulas.is_empty() {
                continue;
            }
            if i > 0 {
                let _ = writeln!(out);
            }
            for f in &section.formulas {
                let _ = writeln!(out, "{}", f.render_formula());
            }
        }
        let _ = writeln!(out);

        for (i, module) in self.modules.iter().enumerate() {
            if i > 0 {
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "{}", module.render());
        }
        let _ = writeln!(out);

        for f in self.all_formulas() {
            let _ = writeln!(out, "{}", f.render_label());
        }

        if !self.rewards.is_empty() {
            let _ = writeln!(out);
            for (i, r) in self.rewards.iter().enumerate() {
                if i > 0 {
                    let _ = writeln!(out);
                }
                let _ = writeln!(out, "{}", r.render());
            }
        }

        out
    }
}
