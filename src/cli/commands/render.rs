//! `render`: turn epoch-ns datetime columns back into strings

use std::path::PathBuf;

use clap::Args;
use schema_toolkit::import::load_render_view;
use schema_toolkit::{Delimiter, load_csv, render_table, write_csv};

use crate::error::CliError;

/// Arguments for the `render` command
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Data file with encoded datetime columns
    #[arg(long, value_name = "PATH")]
    pub data: PathBuf,

    /// Schema contract written by `prepare`
    #[arg(long, value_name = "PATH")]
    pub schema: PathBuf,

    /// Where to write the rendered data
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Keep the encoded columns and append `<col>__rendered` columns
    #[arg(long = "keep-original")]
    pub keep_original: bool,

    /// Comma-separated columns to render (default: every datetime column)
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Field delimiter: auto, tab, or a single character
    #[arg(long, default_value = "auto")]
    pub delimiter: Delimiter,
}

/// Handle the `render` command
pub fn handle_render(args: &RenderArgs) -> Result<(), CliError> {
    let view = load_render_view(&args.schema)?;
    let loaded = load_csv(&args.data, args.delimiter)?;

    if matches!(&args.columns, Some(columns) if columns.is_empty()) {
        return Err(CliError::InvalidArgument(
            "--columns needs at least one column name".to_string(),
        ));
    }

    let rendered = render_table(
        &loaded.table,
        &view,
        args.columns.as_deref(),
        args.keep_original,
    )?;
    write_csv(&rendered, &args.out, loaded.delimiter)?;

    eprintln!("Rendered data written to: {}", args.out.display());
    Ok(())
}
