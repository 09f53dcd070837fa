// Run a mapping definition over a JSON document
// Usage: cargo run --example map_json <definition.json> <source.json>
// Engine settings are read from FIELDMAP_* variables (a .env file works too)

use fieldmap_core::{
    EngineContext, Field, FieldTree, FieldType, MappingDefinition, MappingProcessor, MappingValidator, Session,
};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: map_json <definition.json> <source.json>");
        std::process::exit(2);
    }

    let definition = MappingDefinition::from_json_str(&std::fs::read_to_string(&args[1])?)?;
    let source: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&args[2])?)?;

    let context = EngineContext::from_env()?;
    for finding in MappingValidator::new(context.conversion()).validate(&definition) {
        eprintln!("definition: {}", finding);
    }

    let mut session = Session::new(definition);
    session
        .add_source(FieldTree::from_json("source", &source)?)
        .add_target(FieldTree::new("target"));
    MappingProcessor::new(context).process(&mut session)?;

    // Reading the empty path assembles the whole target document
    if let Some(target) = session.target("target") {
        let root = target.read_value(&Field::new("", FieldType::Any))?;
        for leaf in root.leaves() {
            println!("{} = {}", leaf.path, leaf.value_or_null());
        }
    }

    for audit in session.audits() {
        eprintln!("{}", audit);
    }
    println!(
        "{} error(s), {} warning(s)",
        session.audits().error_count(),
        session.audits().warning_count()
    );
    Ok(())
}
