// Rule executor system.
//
// One generic interpreter (engine.rs) consumes declarative
// condition → region → action tables (sections.rs). Only the two
// sections with real algorithms get bespoke executors:
// - worksheet.rs: scope-of-work table filtering
// - quantities.rs: derived-quantity paragraph fills

pub mod engine;
pub mod quantities;
pub mod sections;
pub mod worksheet;

pub use engine::{
    AssemblyContext, Condition, FactKey, RuleAction, RuleEngine, RuleSpec, SectionOutcome,
    SectionRule, SectionRules,
};
