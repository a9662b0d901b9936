//! Tests for list comprehension unrolling and counted loops

mod shader_test;

use std::sync::Arc;

use shader_test::{stage_error, ShaderTest};
use shaderdef_glsl::{ErrorKind, GlslError};
use shaderdef_ir::{
    Aggregate, AggregateRole, BinaryOp, Expr, FunctionDef, Param, Stage, StageDef, Stmt,
    TypeDescriptor,
};

fn params() -> Arc<Aggregate> {
    Aggregate::builder("Params", AggregateRole::UniformBlock)
        .field("threshold", TypeDescriptor::float())
        .build()
        .unwrap()
}

fn fragment(body: Vec<Stmt>) -> ShaderTest {
    let entry = FunctionDef::builder("fragment_main")
        .param(Param::interface("params", &params()))
        .body(body)
        .build();
    ShaderTest::single(StageDef::new(Stage::Fragment, entry)).unwrap()
}

fn fragment_error(body: Vec<Stmt>) -> GlslError {
    let entry = FunctionDef::builder("fragment_main")
        .param(Param::interface("params", &params()))
        .body(body)
        .build();
    stage_error(StageDef::new(Stage::Fragment, entry))
}

fn comp(element: Expr, iter: Expr, filter: Option<Expr>) -> Expr {
    Expr::list_comp(element, "i", iter, filter)
}

fn float_i() -> Expr {
    Expr::call("float", vec![Expr::name("i")])
}

#[test]
fn test_comprehension_unrolls_per_element() {
    let test = fragment(vec![Stmt::assign(
        Expr::name("halves"),
        comp(
            Expr::binary(BinaryOp::Mul, float_i(), Expr::float(0.5)),
            Expr::range(vec![Expr::int(3)]),
            None,
        ),
    )]);
    test.assert_glsl(
        r#"
        #version 330 core

        uniform float threshold;

        void main() {
            float halves[3];
            halves[0] = (0.0 * 0.5);
            halves[1] = (1.0 * 0.5);
            halves[2] = (2.0 * 0.5);
        }
    "#,
    );
    test.assert_parses();
}

#[test]
fn test_runtime_filter_guards_each_slot() {
    let test = fragment(vec![Stmt::assign(
        Expr::name("kept"),
        comp(
            float_i(),
            Expr::range(vec![Expr::int(4)]),
            Some(Expr::binary(
                BinaryOp::Gt,
                float_i(),
                Expr::name("params").attr("threshold"),
            )),
        ),
    )]);
    test.assert_filecheck(
        r#"
        check: float kept[4];
        nextln: if (0.0 > threshold) {
        nextln: kept[0] = 0.0;
        nextln: }
        nextln: if (1.0 > threshold) {
        nextln: kept[1] = 1.0;
        nextln: }
    "#,
    );
    assert_eq!(test.count_lines("}"), 5);
}

#[test]
fn test_constant_filter_drops_slots() {
    let test = fragment(vec![Stmt::assign(
        Expr::name("evens"),
        comp(
            Expr::binary(BinaryOp::Mul, Expr::name("i"), Expr::int(2)),
            Expr::range(vec![Expr::int(0), Expr::int(6), Expr::int(2)]),
            Some(Expr::binary(BinaryOp::NotEq, Expr::name("i"), Expr::int(2))),
        ),
    )]);
    test.assert_filecheck(
        r#"
        check: int evens[3];
        nextln: evens[0] = (0 * 2);
        nextln: evens[2] = (4 * 2);
        nextln: }
    "#,
    );
    test.assert_absent("if");
}

#[test]
fn test_annotated_comprehension() {
    let test = fragment(vec![Stmt::declare(
        "weights",
        TypeDescriptor::array(TypeDescriptor::float(), 2),
        Some(comp(Expr::name("i"), Expr::range(vec![Expr::int(2)]), None)),
    )]);
    test.assert_line("float weights[2];");
    test.assert_line("weights[1] = 1.0;");

    let err = fragment_error(vec![Stmt::declare(
        "weights",
        TypeDescriptor::array(TypeDescriptor::float(), 4),
        Some(comp(Expr::name("i"), Expr::range(vec![Expr::int(2)]), None)),
    )]);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{}", err);
}

#[test]
fn test_runtime_bound_rejected_but_loop_accepted() {
    let bound = || Stmt::assign(Expr::name("n"), Expr::int(4));
    let err = fragment_error(vec![
        bound(),
        Stmt::assign(
            Expr::name("values"),
            comp(float_i(), Expr::range(vec![Expr::name("n")]), None),
        ),
    ]);
    assert!(matches!(err.kind, ErrorKind::NonConstantBound(_)), "{}", err);

    let test = fragment(vec![
        bound(),
        Stmt::assign(Expr::name("total"), Expr::float(0.0)),
        Stmt::for_(
            "i",
            Expr::range(vec![Expr::name("n")]),
            vec![Stmt::aug_assign(Expr::name("total"), BinaryOp::Add, float_i())],
        ),
    ]);
    test.assert_filecheck(
        r#"
        check: for (int i = 0; i < n; i++) {
        nextln: total = (total + float(i));
        nextln: }
    "#,
    );
}

#[test]
fn test_loop_steps() {
    let test = fragment(vec![
        Stmt::assign(Expr::name("total"), Expr::int(0)),
        Stmt::for_(
            "i",
            Expr::range(vec![Expr::int(1), Expr::int(9), Expr::int(3)]),
            vec![Stmt::aug_assign(Expr::name("total"), BinaryOp::Add, Expr::name("i"))],
        ),
        Stmt::for_(
            "j",
            Expr::range(vec![Expr::int(5), Expr::int(0), Expr::int(-1)]),
            vec![Stmt::continue_()],
        ),
    ]);
    test.assert_line("for (int i = 1; i < 9; i += 3) {");
    test.assert_line("for (int j = 5; j > 0; j -= 1) {");
    test.assert_line("continue;");

    let err = fragment_error(vec![Stmt::for_(
        "i",
        Expr::range(vec![Expr::int(0), Expr::int(4), Expr::int(0)]),
        vec![],
    )]);
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);
}

#[test]
fn test_extreme_range_bounds() {
    let test = fragment(vec![Stmt::assign(
        Expr::name("v"),
        comp(
            Expr::int(1),
            Expr::range(vec![Expr::int(i64::MIN), Expr::int(i64::MAX), Expr::int(i64::MAX)]),
            None,
        ),
    )]);
    test.assert_filecheck(
        r#"
        check: int v[3];
        nextln: v[0] = 1;
        nextln: v[1] = 1;
        nextln: v[2] = 1;
    "#,
    );

    let err = fragment_error(vec![Stmt::for_(
        "i",
        Expr::range(vec![Expr::int(0), Expr::int(-4), Expr::int(i64::MIN)]),
        vec![],
    )]);
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);
}

#[test]
fn test_loop_variable_is_read_only() {
    let err = fragment_error(vec![Stmt::for_(
        "i",
        Expr::range(vec![Expr::int(4)]),
        vec![Stmt::assign(Expr::name("i"), Expr::int(0))],
    )]);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{}", err);
}

#[test]
fn test_comprehension_rejections() {
    let err = fragment_error(vec![Stmt::assign(
        Expr::name("values"),
        comp(float_i(), Expr::name("params"), None),
    )]);
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);

    let err = fragment_error(vec![
        Stmt::assign(Expr::name("values"), Expr::int(0)),
        Stmt::assign(
            Expr::name("values"),
            comp(float_i(), Expr::range(vec![Expr::int(2)]), None),
        ),
    ]);
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);

    let err = fragment_error(vec![Stmt::assign(
        Expr::name("values"),
        comp(float_i(), Expr::range(vec![Expr::int(0)]), None),
    )]);
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);

    let err = fragment_error(vec![Stmt::break_()]);
    assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)), "{}", err);
}
