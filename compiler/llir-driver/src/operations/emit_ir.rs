use crate::pipeline::{Pipeline, PipelineError, PipelineOperation};
use crate::query::{EmitQuery, IrEmitQuery, QueryError};
use llir_ir::module::Module;
use llir_ir::passes::IrDumpPass;

/// Operation for emitting the structural dump of the module.
pub struct IrEmitOperation;

impl IrEmitOperation {
    pub fn decode(query: &IrEmitQuery, module: &Module<'_>) -> Result<String, PipelineError> {
        match query {
            IrEmitQuery::Function(name) => {
                let function = module
                    .get_function(name)
                    .ok_or_else(|| QueryError::UnknownFunction(name.clone()))?;
                Ok(IrDumpPass::format_function_to_string(function))
            }
        }
    }
}

impl<'ir> PipelineOperation<'ir, Module<'ir>, Module<'ir>> for IrEmitOperation {
    fn execute(pipeline: &Pipeline<'ir>, input: Module<'ir>) -> Result<Module<'ir>, PipelineError> {
        if !pipeline.opts.emit_ir {
            return Ok(input);
        }
        // Without queries the whole module is dumped.
        if pipeline.opts.queries.is_empty() {
            println!("{}", IrDumpPass::format_module_to_string(&input));
            return Ok(input);
        }
        for query in pipeline.opts.queries.iter() {
            let EmitQuery::Ir(query) = query;
            println!("{}", Self::decode(query, &input)?);
        }
        Ok(input)
    }
}
