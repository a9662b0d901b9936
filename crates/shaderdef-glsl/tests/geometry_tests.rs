//! Tests for geometry stage emission

mod shader_test;

use std::sync::Arc;

use shader_test::{stage_error, vs_out, ShaderTest};
use shaderdef_glsl::ErrorKind;
use shaderdef_ir::{
    Aggregate, AggregateRole, Expr, FunctionDef, InputPrimitive, OutputPrimitive, Param, Stage,
    StageDef, StageLayout, Stmt, TypeDescriptor,
};

fn gs_out() -> Arc<Aggregate> {
    Aggregate::builder("GsOut", AggregateRole::ShaderInterface)
        .field("gl_Position", TypeDescriptor::vec4())
        .field("color", TypeDescriptor::vec4())
        .build()
        .unwrap()
}

fn triangle_layout() -> StageLayout {
    StageLayout::geometry(InputPrimitive::Triangles, OutputPrimitive::TriangleStrip, 3)
}

fn emit_vertex(index: Expr) -> Stmt {
    Stmt::yield_(Expr::call_kw(
        "GsOut",
        vec![
            ("gl_Position", Expr::name("vs_out").index(index.clone()).attr("gl_Position")),
            ("color", Expr::name("vs_out").index(index).attr("color")),
        ],
    ))
}

#[test]
fn test_geometry_passthrough_unrolled() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("vs_out", &vs_out()))
        .generates(TypeDescriptor::aggregate(&gs_out()))
        .stmt(emit_vertex(Expr::int(0)))
        .stmt(emit_vertex(Expr::int(1)))
        .stmt(emit_vertex(Expr::int(2)))
        .stmt(Stmt::expr(Expr::call("EndPrimitive", vec![])))
        .build();
    let test =
        ShaderTest::single(StageDef::new(Stage::Geometry, entry).with_layout(triangle_layout()))
            .unwrap();
    test.assert_glsl(
        r#"
        #version 330 core

        layout(triangles) in;
        layout(triangle_strip, max_vertices = 3) out;

        in VsOut {
            vec4 color;
            vec3 normal;
        } vs_out[];

        out GsOut {
            vec4 color;
        } gs_out;

        void main() {
            gl_Position = gl_in[0].gl_Position;
            gs_out.color = vs_out[0].color;
            EmitVertex();
            gl_Position = gl_in[1].gl_Position;
            gs_out.color = vs_out[1].color;
            EmitVertex();
            gl_Position = gl_in[2].gl_Position;
            gs_out.color = vs_out[2].color;
            EmitVertex();
            EndPrimitive();
        }
    "#,
    );
    assert_eq!(test.count_lines("EmitVertex();"), 3);
    test.assert_parses();
}

#[test]
fn test_geometry_loop_over_input_length() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("vs_out", &vs_out()))
        .generates(TypeDescriptor::aggregate(&gs_out()))
        .stmt(Stmt::for_(
            "i",
            Expr::range(vec![Expr::call("len", vec![Expr::name("vs_out")])]),
            vec![emit_vertex(Expr::name("i"))],
        ))
        .stmt(Stmt::expr(Expr::call("EndPrimitive", vec![])))
        .build();
    let test =
        ShaderTest::single(StageDef::new(Stage::Geometry, entry).with_layout(triangle_layout()))
            .unwrap();
    test.assert_filecheck(
        r#"
        check: for (int i = 0; i < 3; i++) {
        nextln: gl_Position = gl_in[i].gl_Position;
        nextln: gs_out.color = vs_out[i].color;
        nextln: EmitVertex();
        nextln: }
        nextln: EndPrimitive();
    "#,
    );
}

#[test]
fn test_explicit_gl_in_parameter() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("gl_in", &Aggregate::gl_per_vertex()))
        .generates(TypeDescriptor::aggregate(&gs_out()))
        .stmt(Stmt::yield_(Expr::call_kw(
            "GsOut",
            vec![
                ("gl_Position", Expr::name("gl_in").index(Expr::int(0)).attr("gl_Position")),
                ("color", Expr::call("vec4", vec![Expr::float(1.0)])),
            ],
        )))
        .build();
    let layout = StageLayout::geometry(InputPrimitive::Points, OutputPrimitive::Points, 1);
    let test = ShaderTest::single(StageDef::new(Stage::Geometry, entry).with_layout(layout)).unwrap();
    test.assert_line("layout(points) in;");
    test.assert_line("layout(points, max_vertices = 1) out;");
    test.assert_line("gl_Position = gl_in[0].gl_Position;");
    test.assert_absent("in gl_PerVertex");
}

#[test]
fn test_geometry_requires_layout() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("vs_out", &vs_out()))
        .generates(TypeDescriptor::aggregate(&gs_out()))
        .stmt(emit_vertex(Expr::int(0)))
        .build();
    let err = stage_error(StageDef::new(Stage::Geometry, entry));
    assert!(matches!(err.kind, ErrorKind::InvalidLayout(_)), "{}", err);
    assert_eq!(err.context.stage, Some(Stage::Geometry));
}

#[test]
fn test_geometry_input_index_out_of_range() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("vs_out", &vs_out()))
        .generates(TypeDescriptor::aggregate(&gs_out()))
        .stmt(emit_vertex(Expr::int(3)))
        .build();
    let err =
        stage_error(StageDef::new(Stage::Geometry, entry).with_layout(triangle_layout()));
    assert!(matches!(err.kind, ErrorKind::Index(_)), "{}", err);
}

#[test]
fn test_geometry_must_generate() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("vs_out", &vs_out()))
        .returns(TypeDescriptor::aggregate(&gs_out()))
        .build();
    let err =
        stage_error(StageDef::new(Stage::Geometry, entry).with_layout(triangle_layout()));
    assert!(matches!(err.kind, ErrorKind::InvalidInterface(_)), "{}", err);
}

#[test]
fn test_yield_outside_geometry() {
    let entry = FunctionDef::builder("vertex_main")
        .returns(TypeDescriptor::aggregate(&gs_out()))
        .stmt(Stmt::yield_(Expr::call_kw(
            "GsOut",
            vec![("color", Expr::call("vec4", vec![Expr::float(1.0)]))],
        )))
        .build();
    let err = stage_error(StageDef::new(Stage::Vertex, entry));
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);
}

#[test]
fn test_return_inside_generator() {
    let entry = FunctionDef::builder("geometry_main")
        .param(Param::sequence("vs_out", &vs_out()))
        .generates(TypeDescriptor::aggregate(&gs_out()))
        .stmt(emit_vertex(Expr::int(0)))
        .stmt(Stmt::ret(None).at(9))
        .build();
    let err =
        stage_error(StageDef::new(Stage::Geometry, entry).with_layout(triangle_layout()));
    assert!(matches!(err.kind, ErrorKind::InvalidReturn(_)), "{}", err);
    assert_eq!(err.context.loc, shaderdef_ir::SourceLoc::line(9));
}
