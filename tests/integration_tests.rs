use cfcc::compile;
use cfcc::error::CompileError;
use cfcc::options::CompilerOptions;

fn wrap_in_main(input: &str) -> String {
    format!("function Main(): int {{{}}}", input)
}

fn compile_main(input: &str) -> String {
    compile(&wrap_in_main(input), &CompilerOptions::default()).unwrap()
}

#[test]
fn folded_sum_is_returned_as_an_immediate() {
    let asm = compile_main("var x: int; x = 2 + 3; return x;");
    assert_eq!(
        asm,
        "\
.text
.globl _Main
.globl Main
_Main:
Main:
    push %ebp
    mov %esp, %ebp
    push %ebx
    push %esi
    push %edi
    sub $4, %esp
    movl $5, -16(%ebp)
    movl $5, %eax
    add $4, %esp
    pop %edi
    pop %esi
    pop %ebx
    leave
    ret
"
    );
}

#[test]
fn division_by_literal_zero() {
    let asm = compile_main("var x: int; x = 10 / 0; return x;");
    assert!(asm.contains("    movl $0, -16(%ebp)\n"));
    assert!(asm.contains("    movl $0, %eax\n"));
    assert!(!asm.contains("idiv"));
}

#[test]
fn constant_condition_keeps_one_branch() {
    let asm = compile_main("var x: int; if (1 > 0) { x = 1; } else { x = 2; } return x;");
    assert!(asm.contains("    movl $1, -16(%ebp)\n"));
    assert!(!asm.contains("$2"));
    assert!(!asm.contains("IfWithElse"));
    assert!(!asm.contains("cmp"));
    assert!(asm.contains("    movl $1, %eax\n"));
}

#[test]
fn call_forgets_known_values() {
    let asm = compile(
        "
function f(a: int): int { return a; }
function Main(): int {
    var x, y: int;
    x = 3;
    y = f(x);
    return x;
}",
        &CompilerOptions::default(),
    )
    .unwrap();
    assert!(asm.contains("    pushl $3\n    call f\n"));
    assert!(asm.ends_with(
        "    movl -16(%ebp), %eax\n    add $8, %esp\n    pop %edi\n    pop %esi\n    pop %ebx\n    leave\n    ret\n"
    ));
}

#[test]
fn array_store_keeps_scalars_folded() {
    let asm = compile_main("var a: intarray[3]; var x: int; x = 4; a[2] = 7; return x;");
    assert!(asm.contains("    movl $7, -16(%ebp)\n"));
    assert!(asm.contains("    movl $4, -28(%ebp)\n"));
    assert!(asm.contains("    movl $4, %eax\n"));
}

#[test]
fn output_is_deterministic() {
    let program = "
function fib(n: int): int {
    var a, b, t, i: int;
    a = 0;
    b = 1;
    i = 0;
    while (i < n) {
        t = a + b;
        a = b;
        b = t;
        i = i + 1;
    }
    return a;
}
function Main(): int {
    var r: int;
    var v: intarray[10];
    r = fib(10);
    v[r / 11] = fib(r - 50);
    if (r == 55 && !(r < 0) || false) { r = |r - 100|; } else { r = -r; }
    return r;
}";
    let options = CompilerOptions {
        folding_enabled: true,
        trace_enabled: true,
    };
    assert_eq!(compile(program, &options), compile(program, &options));
}

#[test]
fn every_pass_reports_its_errors() {
    let options = CompilerOptions::default();
    assert!(matches!(
        compile(&wrap_in_main("x = 99999999999; return 0;"), &options),
        Err(CompileError::Lex { .. })
    ));
    assert!(matches!(
        compile(&wrap_in_main("return 0"), &options),
        Err(CompileError::Syntax { .. })
    ));
    assert!(matches!(
        compile(&wrap_in_main("x = 1; return 0;"), &options),
        Err(CompileError::Semantic { .. })
    ));
}

#[test]
fn empty_program() {
    assert_eq!(
        compile("", &CompilerOptions::default()).unwrap(),
        ".text\n.globl _Main\n.globl Main\n"
    );
}
