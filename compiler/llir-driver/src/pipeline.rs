use crate::operations::{BuildOperation, IrEmitOperation, ParseOperation, RecordEmitOperation};
use crate::query::{EmitQuery, QueryError};
use bumpalo::Bump;
use llir_ir::arena::IrArena;
use llir_ir::error::IrError;
use llir_syntax::ParseError;
use miette::Diagnostic;
use thiserror::Error;

/// Execute the entire assembly pipeline.
pub fn execute_assembly_pipeline(opts: PipelineOptions, input: &str) -> Result<(), PipelineError> {
    let bump = Bump::new();
    let pipeline = Pipeline::new(opts, &bump);
    let records = ParseOperation::execute(&pipeline, input)?;
    let records = RecordEmitOperation::execute(&pipeline, records)?;
    let module = BuildOperation::execute(&pipeline, records)?;
    let _ = IrEmitOperation::execute(&pipeline, module)?;
    Ok(())
}

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] ParseError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ir(#[from] IrError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    RecordEmission(#[from] RecordEmissionError),
}

#[derive(Debug, Error, Diagnostic)]
#[error("failed to serialize records to ron")]
#[diagnostic(code(driver::record_emission))]
pub struct RecordEmissionError {
    #[source]
    pub source: ron::Error,
}

/// Options for the assembly pipeline.
///
/// Most of these are derived from the command line arguments.
#[derive(Debug, Default)]
pub struct PipelineOptions {
    pub emit_records: bool,
    pub emit_ir: bool,
    pub queries: Vec<EmitQuery>,
}

/// An assembly pipeline, holding the options and the arena the module is built in.
pub struct Pipeline<'ir> {
    pub opts: PipelineOptions,
    pub arena: IrArena<'ir>,
}

impl<'ir> Pipeline<'ir> {
    pub fn new(opts: PipelineOptions, bump: &'ir Bump) -> Self {
        Self {
            opts,
            arena: IrArena::new(bump),
        }
    }
}

pub trait PipelineOperation<'ir, I, O> {
    fn execute(pipeline: &Pipeline<'ir>, input: I) -> Result<O, PipelineError>;
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{execute_assembly_pipeline, PipelineError, PipelineOptions};
    use crate::query::{EmitQuery, QueryError};
    use llir_macros::{assert_err, assert_matches, assert_ok};

    const IDENTITY: &str = r#"
define i32 @id(i32 %x) {
entry:
  ret i32 %x
}
"#;

    #[test]
    fn test_pipeline_builds_without_emission() {
        assert_ok!(execute_assembly_pipeline(PipelineOptions::default(), IDENTITY));
    }

    #[test]
    fn test_query_for_unknown_function_is_an_error() {
        let options = PipelineOptions {
            emit_ir: true,
            queries: assert_ok!(EmitQuery::from_queries(&["ir.fn.missing"])),
            ..Default::default()
        };
        let err = assert_err!(execute_assembly_pipeline(options, IDENTITY));
        let name = assert_matches!(err, PipelineError::Query(QueryError::UnknownFunction(name)) => name);
        assert_eq!(name, "missing");
    }

    #[test]
    fn test_records_with_wide_integers_are_emitted() {
        let options = PipelineOptions {
            emit_records: true,
            ..Default::default()
        };
        assert_ok!(execute_assembly_pipeline(
            options,
            r#"
define i128 @big() {
entry:
  ret i128 170141183460469231731687303715884105727
}
"#
        ));
    }

    #[test]
    fn test_syntax_errors_stop_the_pipeline() {
        let err = assert_err!(execute_assembly_pipeline(
            PipelineOptions::default(),
            "define i32 @id("
        ));
        assert_matches!(err, PipelineError::Syntax(_) => ());
    }
}
