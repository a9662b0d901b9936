//! Compute stage: uniforms only, work group size from the layout.

use alloc::{format, string::String, vec, vec::Vec};

use shaderdef_ir::{AggregateRole, Param, ParamQualifier, ReturnType, Stage, StageLayout};

use crate::{
    error::{bail, GlslResult},
    stage::{
        missing_layout, param_aggregate, unexpected_param, unexpected_return, StageEmitter,
        StagePlan, StageState,
    },
};

pub struct ComputeEmitter;

impl StageEmitter for ComputeEmitter {
    fn stage(&self) -> Stage {
        Stage::Compute
    }

    fn layout_lines(&self, layout: Option<&StageLayout>) -> GlslResult<Vec<String>> {
        let [x, y, z] = match layout {
            Some(StageLayout::Compute { local_size }) => *local_size,
            _ => return Err(missing_layout(Stage::Compute, "a local work group size")),
        };
        if x == 0 || y == 0 || z == 0 {
            bail!(
                InvalidLayout,
                "local work group size must be positive in every dimension, found ({}, {}, {})",
                x,
                y,
                z
            );
        }
        Ok(vec![format!(
            "layout(local_size_x = {}, local_size_y = {}, local_size_z = {}) in;",
            x, y, z
        )])
    }

    fn bind_param(
        &self,
        state: &mut StageState<'_>,
        param: &Param,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        let aggregate = param_aggregate(param, Stage::Compute)?;
        match (aggregate.role(), param.qualifier) {
            (AggregateRole::UniformBlock, ParamQualifier::None | ParamQualifier::Uniform) => {
                plan.bind_uniforms(state, param, aggregate)
            }
            _ => Err(unexpected_param(param, Stage::Compute, "a uniform block")),
        }
    }

    fn bind_output(
        &self,
        _state: &mut StageState<'_>,
        returns: &ReturnType,
        _plan: &mut StagePlan,
    ) -> GlslResult<()> {
        match returns {
            ReturnType::Void => Ok(()),
            _ => Err(unexpected_return(returns, Stage::Compute, "nothing")),
        }
    }
}
