//! Glues the three synthesisers together into one `compile` entry point and
//! hosts the intermediate PRISM AST they all target.

pub mod closure;
pub mod modules;
pub mod names;
pub mod predicates;
pub mod prism_ast;
pub mod property;
pub mod rewards;

use cpi_core::Cpi;
use thiserror::Error;

use closure::ClosureViolation;
use prism_ast::PrismModel;

/// `cpi-compiler`'s only error: a synthesis pass produced a model that
/// fails Property 2 (syntactic closure). A validated [`Cpi`] should never
/// trigger this — it exists so the closure check has somewhere to report
/// to, rather than being a silent `debug_assert!` that vanishes in release
/// builds.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("generated model fails syntactic closure: {0}")]
    ClosureViolation(#[from] ClosureViolation),
}

/// C2 + C3 + C4: synthesise the complete PRISM model for `cpi`.
///
/// The three synthesisers each see the whole `Cpi` independently and agree
/// on identifiers only through the shared [`names`] module — there is no
/// hidden coupling beyond that. [`closure::check`] then verifies the
/// result references only variables and formulas the model itself declares
/// (Property 2) before handing it back.
pub fn compile(cpi: &Cpi) -> Result<PrismModel, CompileError> {
    let predicates = predicates::synthesise(cpi);
    let modules = modules::synthesise(cpi);
    let rewards = rewards::synthesise(cpi);

    let model = PrismModel {
        formula_sections: predicates.sections,
        modules,
        rewards,
    };

    closure::check(&model)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_single_task() {
        let cpi = Cpi::load(r#"{"type":"task","id":0,"duration":1,"impacts":{"cost":5}}"#).unwrap();
        let model = compile(&cpi).unwrap();
        assert_eq!(model.modules.len(), 1);
        assert_eq!(model.rewards.len(), 1);
        let rendered = model.render();
        assert!(rendered.starts_with("mdp\n"));
        assert!(rendered.contains("module task0"));
        assert!(rendered.contains("rewards \"cost\""));
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let json = r#"{
            "type":"parallel","id":0,
            "first_split":{"type":"task","id":1,"duration":2,"impacts":{"c":1,"t":2}},
            "second_split":{"type":"task","id":2,"duration":3,"impacts":{"c":2,"t":3}}
        }"#;
        let cpi = Cpi::load(json).unwrap();
        let a = compile(&cpi).unwrap().render();
        let b = compile(&cpi).unwrap().render();
        assert_eq!(a, b, "Property 1: compiling twice must be byte-identical");
    }
}
