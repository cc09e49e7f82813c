use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rtunnel_proto::{ErrorCategory, ErrorCode};
use serde::Serialize;

use crate::cmd::CodesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct CodeEntry {
    code: u16,
    name: &'static str,
    category: &'static str,
    connection_fatal: bool,
}

impl From<ErrorCode> for CodeEntry {
    fn from(code: ErrorCode) -> Self {
        let category = code.category();
        Self {
            code: code.as_u16(),
            name: code.name(),
            category: category.name(),
            connection_fatal: category.is_connection_fatal(),
        }
    }
}

pub fn run(args: CodesArgs, format: OutputFormat) -> CliResult<i32> {
    let wanted = args.category.map(ErrorCategory::from);
    let entries: Vec<CodeEntry> = ErrorCode::ALL
        .into_iter()
        .filter(|code| wanted.is_none_or(|category| code.category() == category))
        .map(CodeEntry::from)
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "NAME", "CATEGORY", "CONNECTION FATAL"]);
            for entry in &entries {
                table.add_row(vec![
                    entry.code.to_string(),
                    entry.name.to_string(),
                    entry.category.to_string(),
                    if entry.connection_fatal { "yes" } else { "no" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for entry in &entries {
                println!(
                    "{} {} category={} fatal={}",
                    entry.code, entry.name, entry.category, entry.connection_fatal
                );
            }
        }
        OutputFormat::Raw => {
            for entry in &entries {
                println!("{}\t{}", entry.code, entry.name);
            }
        }
    }

    Ok(SUCCESS)
}
