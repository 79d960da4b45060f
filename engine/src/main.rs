//! Sheetbind CLI - check spreadsheets against a mapping profile
//!
//! # Commands
//!
//! ```bash
//! sheetbind sheets input.xlsx                          # List sheets and header cells
//! sheetbind check input.xlsx --profile products.json   # Map rows, print row errors
//! sheetbind check input.csv -p p.json --error-column 10 --output checked.csv
//! sheetbind example-profile                            # Print a sample profile
//! ```
//!
//! `check` exits with status 1 when any row error was found.

use clap::{Parser, Subcommand};
use sheetbind::document;
use sheetbind::schema::profile::example_profile;
use sheetbind::{
    DynamicRecord, Profile, ReadOptions, Reader, RowContext, RowError, RuleValidator,
    SchemaValidator, ValidationFailure, Validator,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sheetbind")]
#[command(about = "Map spreadsheet rows to records and write errors back", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a document with their first row
    Sheets {
        /// Input CSV or XLSX file
        input: PathBuf,
    },

    /// Map every row through a profile and report row errors
    Check {
        /// Input CSV or XLSX file
        input: PathBuf,

        /// Mapping profile (JSON)
        #[arg(short, long)]
        profile: PathBuf,

        /// Sheet name (wins over --sheet-index)
        #[arg(short, long)]
        sheet: Option<String>,

        /// 0-based sheet index
        #[arg(long)]
        sheet_index: Option<usize>,

        /// Header row (1-based, 0 = no header)
        #[arg(long)]
        header: Option<usize>,

        /// First data row (1-based)
        #[arg(long)]
        start: Option<usize>,

        /// Write error messages into this 1-based column
        #[arg(short, long)]
        error_column: Option<usize>,

        /// Write the annotated document here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print row errors as JSON
        #[arg(long)]
        json: bool,

        /// Stream rows instead of loading all records
        #[arg(long)]
        stream: bool,
    },

    /// Show an example mapping profile
    ExampleProfile,
}

/// Overrides given on the command line.
struct CheckArgs {
    sheet: Option<String>,
    sheet_index: Option<usize>,
    header: Option<usize>,
    start: Option<usize>,
    error_column: Option<usize>,
    output: Option<PathBuf>,
    json: bool,
    stream: bool,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    sheetbind::logging::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Check {
            input,
            profile,
            sheet,
            sheet_index,
            header,
            start,
            error_column,
            output,
            json,
            stream,
        } => cmd_check(
            &input,
            &profile,
            CheckArgs {
                sheet,
                sheet_index,
                header,
                start,
                error_column,
                output,
                json,
                stream,
            },
        ),

        Commands::ExampleProfile => cmd_example_profile(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let workbook = document::open(input)?;
    eprintln!("📄 {} ({} sheets)", input.display(), workbook.sheet_count());

    for sheet in workbook.sheets() {
        println!("{} ({} rows)", sheet.name, sheet.row_count());
        if let Some(first) = sheet.rows().first() {
            println!("   {}", first.join(" | "));
        }
    }
    Ok(())
}

fn cmd_check(input: &Path, profile_path: &Path, args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let profile = Profile::from_json(&fs::read_to_string(profile_path)?)?;
    let options = merge_options(profile.options.clone().unwrap_or_default(), &args);
    let descriptor = Arc::new(profile.descriptor()?);

    let rules = RuleValidator::new(Arc::clone(&descriptor))?;
    let schema = profile.schema.as_ref().map(SchemaValidator::new).transpose()?;
    let validator = |record: &DynamicRecord| -> Vec<ValidationFailure> {
        let mut failures = rules.validate(record);
        if let Some(schema) = &schema {
            failures.extend(schema.validate(record));
        }
        failures
    };

    eprintln!("📄 Checking: {} with profile '{}'", input.display(), profile.name);

    // stream_file writes errors back itself when no separate output is wanted
    let in_place = args.output.is_none();
    let (records, errors) = if args.stream {
        let mut records = 0;
        let mut reader = Reader::with_descriptor(Arc::clone(&descriptor), options.clone())
            .validator(&validator)
            .on_row(|_ctx: &RowContext, record: Option<DynamicRecord>, _errors: &[RowError]| {
                if record.is_some() {
                    records += 1;
                }
                Ok(())
            });
        let errors = if in_place {
            reader.stream_file(input)?
        } else {
            let doc = document::open_streaming(input)?;
            reader.stream(&*doc)?
        };
        drop(reader);
        (records, errors)
    } else {
        let result = Reader::with_descriptor(Arc::clone(&descriptor), options.clone())
            .validator(&validator)
            .read_file(input)?;
        (result.records.len(), result.errors)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&errors)?);
    } else {
        for error in &errors {
            println!("{}", error);
        }
    }

    if options.error_column.is_some_and(|c| c > 0) {
        match &args.output {
            Some(output) => {
                let source = fs::read(input)?;
                let mut sink = fs::File::create(output)?;
                sheetbind::write_errors_to(&mut sink, &source, &errors, &options)?;
                eprintln!("💾 Annotated copy written to: {}", output.display());
            }
            None if !args.stream && !errors.is_empty() => {
                sheetbind::write_errors(input, &errors, &options)?;
                eprintln!("💾 Errors written into: {}", input.display());
            }
            None => {}
        }
    }

    eprintln!("\n📊 Results: {} records, {} row errors", records, errors.len());

    if !errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Command-line flags override the profile's embedded options.
fn merge_options(mut options: ReadOptions, args: &CheckArgs) -> ReadOptions {
    if let Some(name) = &args.sheet {
        options = options.sheet(name.clone());
    }
    if let Some(index) = args.sheet_index {
        options = options.sheet_at(index);
    }
    if let Some(row) = args.header {
        options = options.header(row);
    }
    if let Some(row) = args.start {
        options = options.start_row(row);
    }
    if let Some(column) = args.error_column {
        options = options.error_column(column);
    }
    options
}

fn cmd_example_profile() -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&example_profile())?;
    println!("{}", json);
    Ok(())
}
