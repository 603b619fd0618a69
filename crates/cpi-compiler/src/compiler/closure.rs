//! Property 2 (syntactic closure): every identifier used in a command's
//! guard or update is either a region state variable declared in some
//! emitted module or a formula declared in the header.
//!
//! Checked against the in-memory [`prism_ast`](super::prism_ast) tree
//! rather than the rendered text, which is the whole point of keeping an
//! AST instead of formatting strings directly (see DESIGN.md).

use std::collections::HashSet;

use thiserror::Error;

use super::prism_ast::PrismModel;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClosureViolation {
    #[error("command '{command}' in module '{module}' references undeclared variable '{var}'")]
    UndeclaredVariable {
        module: String,
        command: String,
        var: String,
    },
    #[error("command '{command}' in module '{module}' references undeclared formula '{formula}'")]
    UndeclaredFormula {
        module: String,
        command: String,
        formula: String,
    },
    #[error("command '{command}' in module '{module}' updates foreign variable '{var}' (a module may only assign its own variables)")]
    ForeignAssignment {
        module: String,
        command: String,
        var: String,
    },
}

pub fn check(model: &PrismModel) -> Result<(), ClosureViolation> {
    let declared_formulas: HashSet<&str> =
        model.all_formulas().map(|f| f.name.as_str()).collect();

    // A guard may read any module's variable (PRISM allows cross-module
    // reads in guards; only assignments are module-local), so this set is
    // global rather than per-module.
    let all_vars: HashSet<&str> = model
        .modules
        .iter()
        .flat_map(|m| m.variables.iter().map(|v| v.name.as_str()))
        .collect();

    for module in &model.modules {
        let declared_vars: HashSet<&str> =
            module.variables.iter().map(|v| v.name.as_str()).collect();

        for command in &module.commands {
            let mut vars = Vec::new();
            command.guard.variables(&mut vars);
            for var in vars {
                if !all_vars.contains(var.as_str()) {
                    return Err(ClosureViolation::UndeclaredVariable {
                        module: module.name.clone(),
                        command: command.name.clone(),
                        var,
                    });
                }
            }

            let mut formulas = Vec::new();
            command.guard.formula_refs(&mut formulas);
            for formula in formulas {
                if !declared_formulas.contains(formula.as_str()) {
                    return Err(ClosureViolation::UndeclaredFormula {
                        module: module.name.clone(),
                        command: command.name.clone(),
                        formula,
                    });
                }
            }

            for arm in &command.arms {
                for assign in &arm.assigns {
                    let var = assign.var();
                    if !declared_vars.contains(var) {
                        return Err(ClosureViolation::ForeignAssignment {
                            module: module.name.clone(),
                            command: command.name.clone(),
                            var: var.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpi_core::Cpi;

    #[test]
    fn generated_models_are_closed() {
        let scenarios = [
            r#"{"type":"task","id":0,"duration":1,"impacts":{"c":5}}"#,
            r#"{
                "type":"choice","id":0,
                "true":{"type":"task","id":1,"duration":1,"impacts":{"c":1}},
                "false":{"type":"task","id":2,"duration":1,"impacts":{"c":10}}
            }"#,
            r#"{
                "type":"loop","id":0,"probability":0.5,
                "child":{"type":"task","id":1,"duration":1,"impacts":{"c":2}}
            }"#,
            r#"{
                "type":"loop","id":0,"probability":0.5,
                "child":{
                    "type":"loop","id":1,"probability":0.3,
                    "child":{"type":"task","id":2,"duration":1,"impacts":{"c":1}}
                }
            }"#,
        ];
        for json in scenarios {
            let cpi = Cpi::load(json).unwrap();
            let model = super::super::compile(&cpi).unwrap();
            check(&model).unwrap();
        }
    }

    #[test]
    fn catches_undeclared_variable() {
        use super::super::prism_ast::{Arm, Assign, Command, Expr, Module, VarDecl};
        let model = PrismModel {
            formula_sections: vec![],
            modules: vec![Module {
                name: "task0".to_string(),
                variables: vec![VarDecl {
                    name: "state_0".to_string(),
                    low: 0,
                    high: 5,
                    init: 1,
                }],
                commands: vec![Command {
                    action: None,
                    name: "bogus".to_string(),
                    guard: Expr::eq("state_99", 1),
                    arms: vec![Arm::deterministic(vec![Assign::Int(
                        "state_0".to_string(),
                        2,
                    )])],
                }],
            }],
            rewards: vec![],
        };
        assert!(matches!(
            check(&model),
            Err(ClosureViolation::UndeclaredVariable { .. })
        ));
    }
}
