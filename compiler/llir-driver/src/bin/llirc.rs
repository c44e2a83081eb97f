use clap::Parser;
use llir_driver::pipeline::{execute_assembly_pipeline, PipelineOptions};
use llir_driver::query::EmitQuery;
use miette::{IntoDiagnostic, NamedSource};

#[derive(clap::Parser)]
#[command(version, about, long_about = None)]
struct AppArgs {
    /// The input assembly. If this is `-`, the input is read from stdin.
    input: String,

    /// Should the parser records be emitted?
    #[arg(long, default_value = "false")]
    emit_records: bool,

    /// Should the structural dump of the linked module be emitted?
    #[arg(long, default_value = "false")]
    emit_ir: bool,

    /// Emission queries to specify which functions should be emitted.
    #[arg(long)]
    emit_query: Vec<String>,
}

fn main() -> miette::Result<()> {
    env_logger::init();
    let args = AppArgs::parse();

    let source = match args.input.as_str() {
        "-" => std::io::read_to_string(std::io::stdin()).into_diagnostic()?,
        path => std::fs::read_to_string(path).into_diagnostic()?,
    };
    let source_code = NamedSource::new(&args.input, source.clone());
    let options = PipelineOptions {
        emit_records: args.emit_records,
        emit_ir: args.emit_ir,
        queries: EmitQuery::from_queries(&args.emit_query)?,
    };

    let result = || -> miette::Result<()> {
        execute_assembly_pipeline(options, &source)?;
        Ok(())
    }();
    result.map_err(|e| e.with_source_code(source_code))?;
    Ok(())
}
