use crate::pipeline::{Pipeline, PipelineError, PipelineOperation};
use llir_syntax::{parse_module, RawModule};

/// Operation for parsing the input source into records.
pub struct ParseOperation {}
impl<'ir, T: AsRef<str>> PipelineOperation<'ir, T, RawModule> for ParseOperation {
    fn execute(_: &Pipeline<'ir>, input: T) -> Result<RawModule, PipelineError> {
        let records = parse_module(input.as_ref())?;
        log::debug!(
            "parsed {} functions and {} globals",
            records.functions.len(),
            records.global_variables.len()
        );
        Ok(records)
    }
}
