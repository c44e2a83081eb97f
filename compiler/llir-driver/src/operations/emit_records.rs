use crate::pipeline::{Pipeline, PipelineError, PipelineOperation, RecordEmissionError};
use llir_syntax::RawModule;

/// Operation for emitting the parser records.
pub struct RecordEmitOperation {}
impl<'ir> PipelineOperation<'ir, RawModule, RawModule> for RecordEmitOperation {
    fn execute(pipeline: &Pipeline<'ir>, input: RawModule) -> Result<RawModule, PipelineError> {
        if !pipeline.opts.emit_records {
            return Ok(input);
        }
        let records = ron::ser::to_string_pretty(&input, Default::default())
            .map_err(|source| RecordEmissionError { source })?;
        println!("{}", records);
        Ok(input)
    }
}
