//! Geometry stage: per-vertex arrays in, vertices emitted with `yield`.

use alloc::{format, string::String, vec, vec::Vec};

use shaderdef_ir::{AggregateRole, Param, ParamQualifier, ReturnType, Stage, StageLayout};

use crate::{
    error::{bail, GlslResult},
    stage::{
        aggregate_with_role, check_gl_in, missing_layout, param_aggregate, unexpected_param,
        unexpected_return, StageEmitter, StagePlan, StageState,
    },
};

pub struct GeometryEmitter;

impl StageEmitter for GeometryEmitter {
    fn stage(&self) -> Stage {
        Stage::Geometry
    }

    fn layout_lines(&self, layout: Option<&StageLayout>) -> GlslResult<Vec<String>> {
        let (input, output, max_vertices) = match layout {
            Some(StageLayout::Geometry {
                input,
                output,
                max_vertices,
            }) => (input, output, *max_vertices),
            _ => {
                return Err(missing_layout(
                    Stage::Geometry,
                    "input and output primitives",
                ))
            }
        };
        if max_vertices == 0 {
            bail!(InvalidLayout, "max_vertices must be positive");
        }
        Ok(vec![
            format!("layout({}) in;", input.name()),
            format!(
                "layout({}, max_vertices = {}) out;",
                output.name(),
                max_vertices
            ),
        ])
    }

    fn bind_param(
        &self,
        state: &mut StageState<'_>,
        param: &Param,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        let aggregate = param_aggregate(param, Stage::Geometry)?;
        let len = match state.stage_def.layout {
            Some(StageLayout::Geometry { input, .. }) => Some(input.vertex_count()),
            _ => None,
        };
        match (aggregate.role(), param.qualifier) {
            (AggregateRole::ShaderInterface, ParamQualifier::Sequence) => {
                plan.input_block(state, param, aggregate, Some(len))
            }
            (AggregateRole::BuiltinPerVertex, ParamQualifier::Sequence) => {
                check_gl_in(param, Stage::Geometry)
            }
            (AggregateRole::UniformBlock, ParamQualifier::None | ParamQualifier::Uniform) => {
                plan.bind_uniforms(state, param, aggregate)
            }
            _ => Err(unexpected_param(
                param,
                Stage::Geometry,
                "a per-vertex sequence or a uniform block",
            )),
        }
    }

    fn bind_output(
        &self,
        state: &mut StageState<'_>,
        returns: &ReturnType,
        plan: &mut StagePlan,
    ) -> GlslResult<()> {
        let expected = "a generator of a shader interface";
        match returns {
            ReturnType::Generator(ty) => {
                match aggregate_with_role(ty, AggregateRole::ShaderInterface) {
                    Some(aggregate) => plan.output_block(state, aggregate, false),
                    None => Err(unexpected_return(returns, Stage::Geometry, expected)),
                }
            }
            _ => Err(unexpected_return(returns, Stage::Geometry, expected)),
        }
    }
}
