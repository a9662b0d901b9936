//! Fragment stage: interface block in, located outputs out.

use alloc::{string::String, vec::Vec};

use shaderdef_ir::{AggregateRole, Param, ParamQualifier, ReturnType, Stage, StageLayout};

use crate::{
    decl::fragment_outputs,
    error::GlslResult,
    function::{OutputStyle, OutputTarget},
    stage::{
        aggregate_with_role, param_aggregate, unexpected_param, unexpected_return, StageEmitter,
        StagePlan, StageState,
    },
};

pub struct FragmentEmitter;

impl StageEmitter for FragmentEmitter {
    fn stage(&self) -> Stage {
        Stage::Fragment
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
        let aggregate = param_aggregate(param, Stage::Fragment)?;
        match (aggregate.role(), param.qualifier) {
            (AggregateRole::ShaderInterface, ParamQualifier::None) => {
                plan.input_block(state, param, aggregate, None)
            }
            (AggregateRole::UniformBlock, ParamQualifier::None | ParamQualifier::Uniform) => {
                plan.bind_uniforms(state, param, aggregate)
            }
            _ => Err(unexpected_param(
                param,
                Stage::Fragment,
                "a shader interface or a uniform block",
            )),
        }
    }

    fn bind_output(
        &self,
        state: &mut StageState<'_>,
        returns: &ReturnType,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        let expected = "a fragment output aggregate";
        match returns {
            ReturnType::Void => Ok(()),
            ReturnType::Value(ty) => match aggregate_with_role(ty, AggregateRole::FragmentOutput) {
                Some(aggregate) => {
                    plan.outputs.extend(fragment_outputs(state, aggregate)?);
                    plan.output = Some(OutputTarget {
                        aggregate: aggregate.clone(),
                        style: OutputStyle::Bare,
                    });
                    Ok(())
                }
                None => Err(unexpected_return(returns, Stage::Fragment, expected)),
            },
            ReturnType::Generator(_) => Err(unexpected_return(returns, Stage::Fragment, expected)),
        }
    }
}
