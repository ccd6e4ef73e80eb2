/* Analyze command - show resolved chains, group plans and programs */

use super::common::{load_schema, select_records};
use accel_gen::compiler::chain::{describe_chain, FieldSet, Step};
use accel_gen::compiler::planner::plan_group;
use accel_gen::compiler::AccessorCompiler;
use accel_gen::model::ClassRegistry;
use std::path::PathBuf;

/* Execute the analyze command */
pub fn run(
    files: Vec<PathBuf>,
    records: Vec<String>,
    print_chains: bool,
    print_program: bool,
) -> anyhow::Result<()> {
    let schema = load_schema(&files, true)?;
    let records = select_records(&schema, records)?;
    let compiler = AccessorCompiler::new(&schema);

    for record in &records {
        println!("[~] Record {}", record);
        println!("==============================");

        let Some(fields) = compiler.resolve_chains(record)? else {
            println!("[!] No mapping, skipped\n");
            continue;
        };
        println!("  Fields: {}", fields.len());

        if print_chains {
            println!("\n  Chains:");
            for (field, chain) in &fields {
                println!("    {} -> {}", field, describe_chain(schema.classes(), chain));
            }
        }

        println!("\n  Group plan:");
        if fields.is_empty() {
            println!("    (empty)");
        } else {
            print_group_tree(schema.classes(), &[], fields, 2)?;
        }

        let Some(program) = compiler.compile(record)? else {
            continue;
        };
        println!(
            "\n[✓] {} functions ({} getters, {} setters)",
            program.len(),
            program.getters.len(),
            program.setters.len()
        );
        if print_program {
            println!();
            print!("{}", program.listing(schema.classes()));
        }
        println!();
    }

    Ok(())
}

/* Recursively print the group tree the batch accessors are built from */
fn print_group_tree(
    classes: &ClassRegistry,
    prefix: &[Step],
    fields: FieldSet,
    indent_level: usize,
) -> anyhow::Result<()> {
    let indent = "  ".repeat(indent_level);
    let plan = plan_group(classes, prefix, fields)?;
    println!("{}[{}] {}", indent, describe_chain(classes, prefix), classes.name(plan.class));

    for (field, step) in &plan.direct {
        println!("{}  {} <- {}", indent, field, step.name());
    }

    let groups = plan.self_group.into_iter().chain(plan.compound);
    for group in groups {
        let mut nested = prefix.to_vec();
        nested.push(group.step);
        print_group_tree(classes, &nested, group.fields, indent_level + 1)?;
    }
    Ok(())
}
