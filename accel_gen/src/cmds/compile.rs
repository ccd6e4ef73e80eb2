/* Compile command - write accessor artifacts for mapped records */

use super::common::{load_schema, select_records};
use accel_gen::artifact::DirectorySink;
use accel_gen::compiler::{AccessorCompiler, CompileOptions};
use std::path::PathBuf;

/* Execute the compile command */
pub fn run(
  files: Vec<PathBuf>,
  records: Vec<String>,
  output_dir: PathBuf,
  listing: bool,
  verbose: bool,
) -> anyhow::Result<()> {
  if verbose {
    println!("Accessor Compiler - Artifact Generation");
    println!("=======================================\n");
    println!("[~] Configuration:");
    println!("  Output directory: {}", output_dir.display());
    println!("  Listing: {}", if listing { "yes" } else { "no" });
    println!("  Input files: {}", files.len());
    println!();
  }

  let schema = load_schema(&files, verbose)?;
  let records = select_records(&schema, records)?;

  let compiler = AccessorCompiler::with_options(&schema, CompileOptions { emit_listing: listing });
  let mut sink = DirectorySink::new(&output_dir);

  let mut generated = 0usize;
  let mut skipped = Vec::new();
  for record in &records {
    if verbose {
      println!("[~] Compiling accessors for {}...", record);
    }
    match compiler.generate(record, &mut sink) {
      Ok(true) => generated += 1,
      Ok(false) => skipped.push(record.clone()),
      Err(err) => {
        println!("[✗] {}: {}", record, err);
        return Err(err.into());
      }
    }
  }

  if verbose {
    for path in sink.written() {
      println!("  wrote {}", path.display());
    }
  }
  for record in &skipped {
    println!("[!] No mapping for {}, skipped", record);
  }
  println!(
    "[✓] Generated accessors for {} record(s) in {}",
    generated,
    output_dir.display()
  );

  Ok(())
}
