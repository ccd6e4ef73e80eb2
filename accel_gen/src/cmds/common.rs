/* Common utilities shared between analyze and compile commands */

use accel_gen::schema::Schema;
use std::path::PathBuf;

/* Load and merge schema files, reporting progress when verbose */
pub fn load_schema(files: &[PathBuf], verbose: bool) -> anyhow::Result<Schema> {
  if verbose {
    println!("[~] Loading schema files...");
    for file in files {
      println!("    - {}", file.display());
    }
  }

  let schema = Schema::from_files(files)?;

  if verbose {
    println!("[✓] Loaded {} classes", schema.classes().len());
    for class in schema.classes().iter() {
      match class.parent {
        Some(parent) => println!(
          "  - {} extends {} ({} slots)",
          class.name,
          schema.classes().name(parent),
          class.width()
        ),
        None => println!("  - {} ({} slots)", class.name, class.width()),
      }
    }
    println!();
  }

  Ok(schema)
}

/* Requested record classes, or every mapped record when none were given */
pub fn select_records(schema: &Schema, requested: Vec<String>) -> anyhow::Result<Vec<String>> {
  if requested.is_empty() {
    let all: Vec<String> = schema.record_names().map(str::to_string).collect();
    if all.is_empty() {
      anyhow::bail!("schema does not map any record classes");
    }
    return Ok(all);
  }

  for record in &requested {
    if schema.classes().lookup(record).is_none() {
      anyhow::bail!("unknown record class '{}'", record);
    }
  }
  Ok(requested)
}
