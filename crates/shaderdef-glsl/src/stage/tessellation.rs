//! Tessellation control and evaluation stages.
//!
//! Both read per-vertex arrays of run-time length. Control outputs are
//! arrayed per invocation; evaluation outputs are a plain block.

use alloc::{format, string::String, vec, vec::Vec};

use shaderdef_ir::{AggregateRole, Param, ParamQualifier, ReturnType, Stage, StageLayout};

use crate::{
    error::{bail, GlslResult},
    stage::{
        aggregate_with_role, check_gl_in, missing_layout, param_aggregate, unexpected_param,
        unexpected_return, StageEmitter, StagePlan, StageState,
    },
};

/// Most output vertices a patch may declare.
const MAX_PATCH_VERTICES: u32 = 32;

fn bind_tess_param(
    stage: Stage,
    state: &mut StageState<'_>,
    param: &Param,
    plan: &mut StagePlan,
) -> GlslResult<()> {
    let aggregate = param_aggregate(param, stage)?;
    match (aggregate.role(), param.qualifier) {
        (AggregateRole::ShaderInterface, ParamQualifier::Sequence) => {
            plan.input_block(state, param, aggregate, Some(None))
        }
        (AggregateRole::BuiltinPerVertex, ParamQualifier::Sequence) => check_gl_in(param, stage),
        (AggregateRole::UniformBlock, ParamQualifier::None | ParamQualifier::Uniform) => {
            plan.bind_uniforms(state, param, aggregate)
        }
        _ => Err(unexpected_param(
            param,
            stage,
            "a per-vertex sequence or a uniform block",
        )),
    }
}

fn bind_tess_output(
    stage: Stage,
    state: &mut StageState<'_>,
    returns: &ReturnType,
    plan: &mut StagePlan,
) -> GlslResult<()> {
    match returns {
        ReturnType::Void => Ok(()),
        ReturnType::Value(ty) => match aggregate_with_role(ty, AggregateRole::ShaderInterface) {
            Some(aggregate) => plan.output_block(state, aggregate, stage == Stage::TessControl),
            None => Err(unexpected_return(returns, stage, "a shader interface")),
        },
        ReturnType::Generator(_) => Err(unexpected_return(returns, stage, "a shader interface")),
    }
}

pub struct TessControlEmitter;

impl StageEmitter for TessControlEmitter {
    fn stage(&self) -> Stage {
        Stage::TessControl
    }

    fn layout_lines(&self, layout: Option<&StageLayout>) -> GlslResult<Vec<String>> {
        let vertices = match layout {
            Some(StageLayout::TessControl { vertices }) => *vertices,
            _ => return Err(missing_layout(Stage::TessControl, "the patch vertex count")),
        };
        if vertices == 0 || vertices > MAX_PATCH_VERTICES {
            bail!(
                InvalidLayout,
                "patch vertex count must be between 1 and {}, found {}",
                MAX_PATCH_VERTICES,
                vertices
            );
        }
        Ok(vec![format!("layout(vertices = {}) out;", vertices)])
    }

    fn bind_param(
        &self,
        state: &mut StageState<'_>,
        param: &Param,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        bind_tess_param(Stage::TessControl, state, param, plan)
    }

    fn bind_output(
        &self,
        state: &mut StageState<'_>,
        returns: &ReturnType,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        bind_tess_output(Stage::TessControl, state, returns, plan)
    }
}

pub struct TessEvalEmitter;

impl StageEmitter for TessEvalEmitter {
    fn stage(&self) -> Stage {
        Stage::TessEval
    }

    fn layout_lines(&self, layout: Option<&StageLayout>) -> GlslResult<Vec<String>> {
        match layout {
            Some(StageLayout::TessEval {
                primitive,
                spacing,
                order,
                point_mode,
            }) => {
                let mut qualifiers = format!("{}, {}, {}", primitive.name(), spacing.name(), order.name());
                if *point_mode {
                    qualifiers.push_str(", point_mode");
                }
                Ok(vec![format!("layout({}) in;", qualifiers)])
            }
            _ => Err(missing_layout(Stage::TessEval, "the patch primitive")),
        }
    }

    fn bind_param(
        &self,
        state: &mut StageState<'_>,
        param: &Param,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        bind_tess_param(Stage::TessEval, state, param, plan)
    }

    fn bind_output(
        &self,
        state: &mut StageState<'_>,
        returns: &ReturnType,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        bind_tess_output(Stage::TessEval, state, returns, plan)
    }
}
