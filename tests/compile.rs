use indoc::indoc;
use pretty_assertions::assert_eq;
use warc::{compile, error::ErrorKind, parse, CompileOptions};

fn ir(src: &str) -> warc::codegen::ir::Module {
    compile(src, &CompileOptions::default())
        .unwrap_or_else(|diagnostic| panic!("failed to compile: {diagnostic}"))
}

fn main_text(src: &str) -> String {
    ir(src).function_text("main").expect("main is always generated")
}

#[test]
fn test_no_constant_folding() {
    let main = main_text("war x : int = 1; war y : int = x + 2;");
    assert!(main.contains("%x = load i64, ptr %x.addr"), "{main}");
    assert!(main.contains("%add = add i64 %x, 2"), "{main}");
    assert!(main.contains("store i64 %add, ptr %y.addr"), "{main}");
}

#[test]
fn test_call_with_matching_arguments() {
    let module = ir("tren int add [int a, int b] { return a + b; } war z : int = add[2,3];");
    let add = module.function_text("add").unwrap();
    assert!(add.starts_with("define i64 @add(i64 %a, i64 %b) {"), "{add}");
    let main = module.function_text("main").unwrap();
    assert!(main.contains("%call = call i64 @add(i64 2, i64 3)"), "{main}");
}

#[test]
fn test_constant_condition() {
    let main = main_text("if (1) do war x : int = 5;");
    assert!(main.contains("%cond = icmp ne i64 1, 0"), "{main}");
    assert!(main.contains("br i1 %cond, label %then, label %next"), "{main}");
}

#[test]
fn test_array_elements_must_agree() {
    assert!(compile("war arr : array<int> = [1,2,3];", &CompileOptions::default()).is_ok());

    let error = compile("war arr : array<int> = [1, true];", &CompileOptions::default())
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Semantic);
}

#[test]
fn test_self_recursion() {
    let module = ir(include_str!("../demos/fib.war"));
    let fib = module.function_text("fib").unwrap();
    assert_eq!(fib.matches("call i64 @fib").count(), 2, "{fib}");
}

#[test]
fn test_loop_checks_condition_first() {
    let main = main_text("war n : int = 0; alive by [n] { n = n - 1; }");
    let entry = main.find("br label %loop.header").unwrap();
    let header = main.find("loop.header:").unwrap();
    let body = main.find("loop.body:").unwrap();
    assert!(entry < header && header < body, "{main}");
    assert!(
        main.contains("br i1 %cond, label %loop.body, label %loop.exit"),
        "{main}"
    );
    assert!(main.contains("  br label %loop.header\n\nloop.exit:"), "{main}");
}

#[test]
fn test_shadowing_inside_block() {
    let main = main_text("war x : int = 1; { war x : bool = true; x = false; } x = 2;");
    assert!(main.contains("%x.addr = alloca i64"), "{main}");
    assert!(main.contains("%x.addr1 = alloca i64"), "{main}");
    assert!(main.contains("store i64 0, ptr %x.addr1"), "{main}");
    assert!(main.contains("store i64 2, ptr %x.addr\n"), "{main}");
}

#[test]
fn test_nested_array_types_are_structural() {
    assert!(parse("war a : array<array<int>> = [[1], [2, 3]]; war b : array<array<int>> = a;").is_ok());

    let error = parse("war a : array<array<int>> = [[1]]; war b : array<bool> = a;").unwrap_err();
    assert_eq!(
        error.to_string(),
        "line 1: semantic error: expected type array<bool>, but got array<array<int>>"
    );
}

#[test]
fn test_module_layout() {
    let module = compile(
        "tren int id[int x] return x; print[id[1]];",
        &CompileOptions {
            module_name: "layout".to_string(),
        },
    )
    .unwrap();
    assert_eq!(module.name(), "layout");
    assert_eq!(
        module.function_names().collect::<Vec<_>>(),
        ["printf", "print", "main", "id"]
    );

    let text = module.to_string();
    assert!(text.starts_with("; ModuleID = 'layout'\n"), "{text}");
    assert!(
        text.contains("@.str.0 = private unnamed_addr constant [11 x i8] c\"out: %lld\\0A\\00\""),
        "{text}"
    );
    assert!(text.contains("declare i32 @printf(ptr, ...)"), "{text}");
}

#[test]
fn test_demos_compile() {
    for src in [
        include_str!("../demos/fib.war"),
        include_str!("../demos/arrays.war"),
        include_str!("../demos/counter.war"),
    ] {
        if let Err(diagnostic) = compile(src, &CompileOptions::default()) {
            panic!("failed to compile demo: {diagnostic}\n{src}");
        }
    }
}

#[test]
fn test_nothing_function_call() {
    let module = ir(include_str!("../demos/counter.war"));
    let report = module.function_text("report").unwrap();
    assert!(report.starts_with("define void @report(i64 %value) {"), "{report}");
    assert!(report.trim_end().ends_with("ret void\n}"), "{report}");
    let main = module.function_text("main").unwrap();
    assert!(main.contains("call void @report(i64 %count"), "{main}");
}

#[test]
fn test_returning_branches_need_no_dead_blocks() {
    let module = ir(indoc! {"
        tren int sign[int n] { if (n < 0) do return 0 - 1; return 1; }
        tren int first[int n] { alive by [n] { return n; } return 0; }
    "});
    for name in ["sign", "first"] {
        let text = module.function_text(name).unwrap();
        assert!(!text.contains("dead:"), "{text}");
        assert!(!text.contains("unreachable"), "{text}");
    }
    let first = module.function_text("first").unwrap();
    assert!(first.contains("loop.exit:\n  ret i64 0"), "{first}");
}

#[test]
fn test_dead_code_after_return_is_isolated() {
    let g = ir("tren int g[] { if (1) do return 1; return 2; print[3]; }")
        .function_text("g")
        .unwrap();
    assert!(g.contains("next:\n  ret i64 2\n\ndead:"), "{g}");
    assert!(g.trim_end().ends_with("unreachable\n}"), "{g}");
    assert_eq!(g.matches("unreachable").count(), 1);
}
