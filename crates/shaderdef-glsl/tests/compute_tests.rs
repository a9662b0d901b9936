//! Tests for compute stage emission

mod shader_test;

use std::sync::Arc;

use shader_test::{globals, stage_error, ShaderTest};
use shaderdef_glsl::ErrorKind;
use shaderdef_ir::{
    Aggregate, AggregateRole, Expr, FunctionDef, Param, Stage, StageDef, StageLayout, Stmt,
    TypeDescriptor,
};

fn images() -> Arc<Aggregate> {
    Aggregate::builder("Images", AggregateRole::UniformBlock)
        .field("target", TypeDescriptor::opaque("image2D"))
        .build()
        .unwrap()
}

fn global_xy() -> Expr {
    Expr::call(
        "ivec2",
        vec![Expr::name("gl_GlobalInvocationID").attr("xy")],
    )
}

fn shared_tile(count: Expr) -> Stmt {
    Stmt::assign(
        Expr::name("tile"),
        Expr::call("shared", vec![Expr::type_ref(TypeDescriptor::float()), count]),
    )
}

#[test]
fn test_compute_full_output() {
    let entry = FunctionDef::builder("compute_main")
        .param(Param::interface("images", &images()))
        .stmt(shared_tile(Expr::int(64)))
        .stmt(Stmt::assign(
            Expr::name("idx"),
            Expr::name("gl_LocalInvocationID").attr("x"),
        ))
        .stmt(Stmt::assign(
            Expr::name("tile").index(Expr::name("idx")),
            Expr::float(1.0),
        ))
        .stmt(Stmt::expr(Expr::call("barrier", vec![])))
        .stmt(Stmt::expr(Expr::call(
            "imageStore",
            vec![
                Expr::name("images").attr("target"),
                global_xy(),
                Expr::call("vec4", vec![Expr::name("tile").index(Expr::name("idx"))]),
            ],
        )))
        .build();
    let test = ShaderTest::single(
        StageDef::new(Stage::Compute, entry).with_layout(StageLayout::compute(64, 1, 1)),
    )
    .unwrap();
    test.assert_glsl(
        r#"
        #version 430 core

        layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;

        layout(rgba32f) uniform image2D target;

        shared float tile[64];

        void main() {
            uint idx = gl_LocalInvocationID.x;
            tile[idx] = 1.0;
            barrier();
            imageStore(target, ivec2(gl_GlobalInvocationID.xy), vec4(tile[idx]));
        }
    "#,
    );
    test.assert_parses();
}

#[test]
fn test_integer_image_formats_and_atomics() {
    let counters = Aggregate::builder("Counters", AggregateRole::UniformBlock)
        .field("counts", TypeDescriptor::opaque("uimage2D"))
        .field("ids", TypeDescriptor::opaque("iimage2D"))
        .build()
        .unwrap();
    let entry = FunctionDef::builder("compute_main")
        .param(Param::interface("counters", &counters))
        .stmt(Stmt::expr(Expr::call(
            "imageAtomicAdd",
            vec![Expr::name("counters").attr("counts"), global_xy(), Expr::int(1)],
        )))
        .build();
    let test = ShaderTest::single(
        StageDef::new(Stage::Compute, entry).with_layout(StageLayout::compute(8, 8, 1)),
    )
    .unwrap();
    test.assert_filecheck(
        r#"
        check: layout(local_size_x = 8, local_size_y = 8, local_size_z = 1) in;
        check: layout(r32ui) uniform uimage2D counts;
        nextln: layout(r32i) uniform iimage2D ids;
        check: imageAtomicAdd(counts, ivec2(gl_GlobalInvocationID.xy), 1u);
    "#,
    );
}

#[test]
fn test_scalar_shared_variable_and_uniform_matrices() {
    let entry = FunctionDef::builder("compute_main")
        .param(Param::interface("globals", &globals()))
        .stmt(Stmt::assign(
            Expr::name("total"),
            Expr::call("shared", vec![Expr::type_ref(TypeDescriptor::uint())]),
        ))
        .stmt(Stmt::assign(Expr::name("total"), Expr::int(0)))
        .build();
    let test = ShaderTest::single(
        StageDef::new(Stage::Compute, entry).with_layout(StageLayout::compute(1, 1, 1)),
    )
    .unwrap();
    test.assert_line("uniform mat4 model_view;");
    test.assert_line("shared uint total;");
    test.assert_line("total = 0u;");
}

#[test]
fn test_shared_outside_compute() {
    let entry = FunctionDef::builder("fragment_main")
        .stmt(shared_tile(Expr::int(4)))
        .build();
    let err = stage_error(StageDef::new(Stage::Fragment, entry));
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);
}

#[test]
fn test_shared_length_must_be_constant() {
    let entry = FunctionDef::builder("compute_main")
        .stmt(Stmt::assign(Expr::name("n"), Expr::int(4)))
        .stmt(shared_tile(Expr::name("n")))
        .build();
    let err = stage_error(
        StageDef::new(Stage::Compute, entry).with_layout(StageLayout::compute(4, 1, 1)),
    );
    assert!(matches!(err.kind, ErrorKind::NonConstantBound(_)), "{}", err);
}

#[test]
fn test_compute_layout_rules() {
    let entry = || FunctionDef::builder("compute_main").stmt(Stmt::pass()).build();
    let err = stage_error(StageDef::new(Stage::Compute, entry()));
    assert!(matches!(err.kind, ErrorKind::InvalidLayout(_)), "{}", err);

    let err = stage_error(
        StageDef::new(Stage::Compute, entry()).with_layout(StageLayout::compute(16, 0, 1)),
    );
    assert!(matches!(err.kind, ErrorKind::InvalidLayout(_)), "{}", err);
}

#[test]
fn test_compute_entry_returns_nothing() {
    let entry = FunctionDef::builder("compute_main")
        .returns(TypeDescriptor::float())
        .stmt(Stmt::ret(Some(Expr::float(1.0))))
        .build();
    let err = stage_error(
        StageDef::new(Stage::Compute, entry).with_layout(StageLayout::compute(1, 1, 1)),
    );
    assert!(matches!(err.kind, ErrorKind::InvalidInterface(_)), "{}", err);
}
