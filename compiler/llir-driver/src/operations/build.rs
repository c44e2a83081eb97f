use crate::pipeline::{Pipeline, PipelineError, PipelineOperation};
use llir_ir::build_module;
use llir_ir::module::Module;
use llir_syntax::RawModule;

/// Operation for building the linked module from the records.
pub struct BuildOperation {}
impl<'ir> PipelineOperation<'ir, RawModule, Module<'ir>> for BuildOperation {
    fn execute(pipeline: &Pipeline<'ir>, input: RawModule) -> Result<Module<'ir>, PipelineError> {
        let module = build_module(&pipeline.arena, &input)?;
        Ok(module)
    }
}
