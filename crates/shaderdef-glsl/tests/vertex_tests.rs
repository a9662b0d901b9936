//! Tests for vertex stage emission

mod shader_test;

use shader_test::{globals, vertex_in, vs_out, vs_out_flat, ShaderTest};
use shaderdef_ir::{
    Aggregate, AggregateRole, BinaryOp, Expr, FunctionDef, GlslVersion, Param, ShaderDefinition,
    Stage, StageDef, Stmt, TypeDescriptor,
};

fn transform_entry() -> StageDef {
    let entry = FunctionDef::builder("vertex_main")
        .param(Param::interface("attribs", &vertex_in()))
        .param(Param::interface("globals", &globals()))
        .returns(TypeDescriptor::aggregate(&vs_out()))
        .stmt(Stmt::assign(
            Expr::name("pos"),
            Expr::binary(
                BinaryOp::Mul,
                Expr::binary(
                    BinaryOp::Mul,
                    Expr::name("globals").attr("projection"),
                    Expr::name("globals").attr("model_view"),
                ),
                Expr::call(
                    "vec4",
                    vec![Expr::name("attribs").attr("vert_loc"), Expr::float(1.0)],
                ),
            ),
        ))
        .stmt(Stmt::ret(Some(Expr::call_kw(
            "VsOut",
            vec![
                ("gl_Position", Expr::name("pos")),
                ("color", Expr::name("attribs").attr("vert_col")),
                ("normal", Expr::name("attribs").attr("vert_nor")),
            ],
        ))))
        .build();
    StageDef::new(Stage::Vertex, entry)
}

#[test]
fn test_vertex_full_output() {
    let test = ShaderTest::single(transform_entry()).unwrap();
    test.assert_glsl(
        r#"
        #version 330 core

        layout(location=0) in vec3 vert_loc;
        layout(location=1) in vec3 vert_nor;
        layout(location=2) in vec4 vert_col;

        uniform mat4 model_view;
        uniform mat4 projection;

        out VsOut {
            vec4 color;
            vec3 normal;
        } vs_out;

        void main() {
            vec4 pos = ((projection * model_view) * vec4(vert_loc, 1.0));
            gl_Position = pos;
            vs_out.color = vert_col;
            vs_out.normal = vert_nor;
        }
    "#,
    );
    test.assert_parses();
}

#[test]
fn test_attribute_locations_follow_slot_counts() {
    let attribs = Aggregate::builder("Skinned", AggregateRole::AttributeBlock)
        .field("bone", TypeDescriptor::mat4())
        .field("weight", TypeDescriptor::float())
        .build()
        .unwrap();
    let entry = FunctionDef::builder("vertex_main")
        .param(Param::interface("v", &attribs))
        .stmt(Stmt::assign(
            Expr::name("gl_Position"),
            Expr::binary(
                BinaryOp::Mul,
                Expr::name("v").attr("bone"),
                Expr::call("vec4", vec![Expr::name("v").attr("weight")]),
            ),
        ))
        .build();
    let test = ShaderTest::single(StageDef::new(Stage::Vertex, entry)).unwrap();
    test.assert_line("layout(location=0) in mat4 bone;");
    test.assert_line("layout(location=4) in float weight;");
    test.assert_line("gl_Position = (bone * vec4(weight));");
}

#[test]
fn test_void_vertex_entry_writes_builtins() {
    let entry = FunctionDef::builder("vertex_main")
        .param(Param::interface("attribs", &vertex_in()))
        .stmt(Stmt::assign(
            Expr::name("gl_position"),
            Expr::call(
                "vec4",
                vec![Expr::name("attribs").attr("vert_loc"), Expr::int(1)],
            ),
        ))
        .stmt(Stmt::assign(Expr::name("gl_PointSize"), Expr::int(2)))
        .build();
    let test = ShaderTest::single(StageDef::new(Stage::Vertex, entry)).unwrap();
    test.assert_filecheck(
        r#"
        check: void main() {
        nextln: gl_Position = vec4(vert_loc, 1.0);
        nextln: gl_PointSize = 2.0;
        nextln: }
    "#,
    );
    test.assert_absent("out VsOut");
}

#[test]
fn test_interpolation_qualifier_emitted() {
    let entry = FunctionDef::builder("vertex_main")
        .returns(TypeDescriptor::aggregate(&vs_out_flat()))
        .stmt(Stmt::ret(Some(Expr::call_kw(
            "VsOut",
            vec![
                ("gl_Position", Expr::call("vec4", vec![Expr::float(0.0)])),
                ("color", Expr::call("vec4", vec![Expr::float(1.0)])),
                ("instance", Expr::name("gl_InstanceID")),
            ],
        ))))
        .build();
    let test = ShaderTest::single(StageDef::new(Stage::Vertex, entry)).unwrap();
    test.assert_filecheck(
        r#"
        check: out VsOut {
        nextln: vec4 color;
        nextln: flat int instance;
        nextln: } vs_out;
        check: vs_out.instance = gl_InstanceID;
    "#,
    );
}

#[test]
fn test_early_return_keeps_return_statement() {
    let entry = FunctionDef::builder("vertex_main")
        .param(Param::interface("attribs", &vertex_in()))
        .returns(TypeDescriptor::aggregate(&vs_out()))
        .stmt(Stmt::if_(
            Expr::binary(
                BinaryOp::Gt,
                Expr::name("attribs").attr("vert_col").attr("a"),
                Expr::float(0.5),
            ),
            vec![Stmt::ret(Some(Expr::call_kw(
                "VsOut",
                vec![("color", Expr::name("attribs").attr("vert_col"))],
            )))],
            vec![],
        ))
        .stmt(Stmt::ret(Some(Expr::call_kw(
            "VsOut",
            vec![("normal", Expr::name("attribs").attr("vert_nor"))],
        ))))
        .build();
    let test = ShaderTest::single(StageDef::new(Stage::Vertex, entry)).unwrap();
    test.assert_filecheck(
        r#"
        check: if (vert_col.a > 0.5) {
        nextln: vs_out.color = vert_col;
        nextln: return;
        nextln: }
        nextln: vs_out.normal = vert_nor;
        nextln: }
    "#,
    );
}

#[test]
fn test_requested_version_and_profile() {
    let definition = ShaderDefinition::new()
        .with_version(GlslVersion::core(450))
        .with_stage(transform_entry());
    let test = ShaderTest::new(&definition, Stage::Vertex).unwrap();
    test.assert_filecheck("check: #version 450 core");

    let definition = ShaderDefinition::new()
        .with_version(GlslVersion::new(140))
        .with_stage(transform_entry());
    let test = ShaderTest::new(&definition, Stage::Vertex).unwrap();
    assert!(test.source().starts_with("#version 140\n"));
}
