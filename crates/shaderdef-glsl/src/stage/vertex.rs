//! Vertex stage: attribute inputs in, one interface block out.

use alloc::{string::String, vec::Vec};

use shaderdef_ir::{AggregateRole, Param, ParamQualifier, ReturnType, Stage, StageLayout};

use crate::{
    decl::attribute_inputs,
    error::GlslResult,
    stage::{
        aggregate_with_role, param_aggregate, unexpected_param, unexpected_return, StageEmitter,
        StagePlan, StageState,
    },
};

pub struct VertexEmitter;

impl StageEmitter for VertexEmitter {
    fn stage(&self) -> Stage {
        Stage::Vertex
    }

    fn layout_lines(&self, _layout: Option<&StageLayout>) -> GlslResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn bind_param(
        &self,
        state: &mut StageState<'_>,
        param: &Param,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        let aggregate = param_aggregate(param, Stage::Vertex)?;
        match (aggregate.role(), param.qualifier) {
            (AggregateRole::AttributeBlock, ParamQualifier::None) => {
                let inputs = attribute_inputs(state, aggregate, &mut plan.next_location)?;
                plan.inputs.extend(inputs);
                plan.bind_interface(param, AggregateRole::AttributeBlock);
                Ok(())
            }
            (AggregateRole::UniformBlock, ParamQualifier::None | ParamQualifier::Uniform) => {
                plan.bind_uniforms(state, param, aggregate)
            }
            _ => Err(unexpected_param(
                param,
                Stage::Vertex,
                "an attribute block or a uniform block",
            )),
        }
    }

    fn bind_output(
        &self,
        state: &mut StageState<'_>,
        returns: &ReturnType,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        match returns {
            ReturnType::Void => Ok(()),
            ReturnType::Value(ty) => match aggregate_with_role(ty, AggregateRole::ShaderInterface) {
                Some(aggregate) => plan.output_block(state, aggregate, false),
                None => Err(unexpected_return(returns, Stage::Vertex, "a shader interface")),
            },
            ReturnType::Generator(_) => {
                Err(unexpected_return(returns, Stage::Vertex, "a shader interface"))
            }
        }
    }
}
