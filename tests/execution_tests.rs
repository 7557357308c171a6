use std::collections::HashMap;

use cfcc::compile;
use cfcc::options::CompilerOptions;

const REGISTERS: [&str; 8] = ["eax", "ebx", "ecx", "edx", "esi", "edi", "ebp", "esp"];
const RETURN_TO_HOST: i32 = -1;
const MAX_STEPS: usize = 1_000_000;

#[derive(Clone, Debug)]
enum Operand {
    Imm(i32),
    Reg(usize),
    /// Low byte of a register, as in `%al`.
    Byte(usize),
    Mem {
        disp: i32,
        base: usize,
        index: Option<(usize, i32)>,
    },
    Label(String),
}

#[derive(Default)]
struct Flags {
    zf: bool,
    sf: bool,
    of: bool,
    cf: bool,
}

/// Just enough of a 32-bit x86 machine to run what the compiler emits.
struct Machine {
    program: Vec<(String, Vec<Operand>)>,
    labels: HashMap<String, usize>,
    regs: [i32; 8],
    memory: HashMap<i32, i32>,
    flags: Flags,
}

fn register(name: &str) -> usize {
    REGISTERS
        .iter()
        .position(|r| *r == name)
        .unwrap_or_else(|| panic!("unknown register {}", name))
}

fn split_operands(text: &str) -> Vec<String> {
    let mut operands = vec![];
    let mut depth = 0;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                operands.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => (),
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        operands.push(current.trim().to_string());
    }
    operands
}

fn parse_operand(text: &str) -> Operand {
    if let Some(imm) = text.strip_prefix('$') {
        return Operand::Imm(imm.parse().unwrap());
    }
    if let Some(name) = text.strip_prefix('%') {
        return match name {
            "al" => Operand::Byte(register("eax")),
            "bl" => Operand::Byte(register("ebx")),
            _ => Operand::Reg(register(name)),
        };
    }
    let Some(open) = text.find('(') else {
        return Operand::Label(text.to_string());
    };
    let disp = match &text[..open] {
        "" => 0,
        d => d.parse().unwrap(),
    };
    let inner: Vec<_> = text[open + 1..text.len() - 1]
        .split(',')
        .map(|p| p.trim().trim_start_matches('%'))
        .collect();
    let index = match inner.len() {
        1 => None,
        2 => Some((register(inner[1]), 1)),
        _ => Some((register(inner[1]), inner[2].parse().unwrap())),
    };
    Operand::Mem {
        disp,
        base: register(inner[0]),
        index,
    }
}

impl Machine {
    fn load(assembly: &str) -> Self {
        let mut program = vec![];
        let mut labels = HashMap::new();
        for line in assembly.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with('.') {
                continue;
            }
            if let Some(label) = line.strip_suffix(':') {
                labels.insert(label.to_string(), program.len());
                continue;
            }
            let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
            let operands = split_operands(rest).iter().map(|o| parse_operand(o)).collect();
            program.push((mnemonic.to_string(), operands));
        }

        let mut regs = [0; 8];
        regs[register("esp")] = 0x10000;
        Self {
            program,
            labels,
            regs,
            memory: HashMap::new(),
            flags: Flags::default(),
        }
    }

    fn address(&self, operand: &Operand) -> i32 {
        let Operand::Mem { disp, base, index } = operand else {
            panic!("not a memory operand: {:?}", operand);
        };
        let offset = index.map_or(0, |(r, scale)| self.regs[r].wrapping_mul(scale));
        self.regs[*base].wrapping_add(*disp).wrapping_add(offset)
    }

    fn read(&self, operand: &Operand) -> i32 {
        match operand {
            Operand::Imm(v) => *v,
            Operand::Reg(r) => self.regs[*r],
            Operand::Byte(r) => self.regs[*r] & 0xff,
            Operand::Mem { .. } => *self.memory.get(&self.address(operand)).unwrap_or(&0),
            Operand::Label(l) => panic!("cannot read label {}", l),
        }
    }

    fn write(&mut self, operand: &Operand, value: i32) {
        match operand {
            Operand::Reg(r) => self.regs[*r] = value,
            Operand::Byte(r) => self.regs[*r] = (self.regs[*r] & !0xff) | (value & 0xff),
            Operand::Mem { .. } => {
                let address = self.address(operand);
                self.memory.insert(address, value);
            }
            _ => panic!("cannot write {:?}", operand),
        }
    }

    fn push(&mut self, value: i32) {
        let esp = register("esp");
        self.regs[esp] -= 4;
        self.memory.insert(self.regs[esp], value);
    }

    fn pop(&mut self) -> i32 {
        let esp = register("esp");
        let value = *self.memory.get(&self.regs[esp]).unwrap_or(&0);
        self.regs[esp] += 4;
        value
    }

    fn set_result_flags(&mut self, result: i32) {
        self.flags.zf = result == 0;
        self.flags.sf = result < 0;
    }

    fn condition(&self, mnemonic: &str) -> bool {
        let f = &self.flags;
        match mnemonic {
            "je" => f.zf,
            "jne" => !f.zf,
            "jl" | "cmovl" => f.sf != f.of,
            "jge" => f.sf == f.of,
            "jg" => !f.zf && f.sf == f.of,
            "jle" => f.zf || f.sf != f.of,
            "jmp" => true,
            _ => panic!("unknown condition {}", mnemonic),
        }
    }

    fn jump_target(&self, operand: &Operand) -> usize {
        let Operand::Label(label) = operand else {
            panic!("not a label: {:?}", operand);
        };
        self.labels[label]
    }

    /// Calls `func` with no arguments and returns `%eax`.
    fn call(&mut self, func: &str) -> i32 {
        self.push(RETURN_TO_HOST);
        let mut pc = self.labels[func];

        for _ in 0..MAX_STEPS {
            let (mnemonic, ops) = self.program[pc].clone();
            pc += 1;
            match mnemonic.as_str() {
                "push" | "pushl" => {
                    let v = self.read(&ops[0]);
                    self.push(v);
                }
                "pop" => {
                    let v = self.pop();
                    self.write(&ops[0], v);
                }
                "mov" | "movl" => {
                    let v = self.read(&ops[0]);
                    self.write(&ops[1], v);
                }
                "movzbl" => {
                    let v = self.read(&ops[0]) & 0xff;
                    self.write(&ops[1], v);
                }
                "leal" => {
                    let v = self.address(&ops[0]);
                    self.write(&ops[1], v);
                }
                "add" | "sub" | "imul" | "and" | "or" => {
                    let (src, dst) = (self.read(&ops[0]), self.read(&ops[1]));
                    let v = match mnemonic.as_str() {
                        "add" => dst.wrapping_add(src),
                        "sub" => dst.wrapping_sub(src),
                        "imul" => dst.wrapping_mul(src),
                        "and" => dst & src,
                        _ => dst | src,
                    };
                    self.set_result_flags(v);
                    self.write(&ops[1], v);
                }
                "cmp" => {
                    let (src, dst) = (self.read(&ops[0]), self.read(&ops[1]));
                    self.set_result_flags(dst.wrapping_sub(src));
                    self.flags.of = dst.checked_sub(src).is_none();
                    self.flags.cf = (dst as u32) < (src as u32);
                }
                "test" => {
                    let v = self.read(&ops[0]) & self.read(&ops[1]);
                    self.set_result_flags(v);
                    self.flags.of = false;
                    self.flags.cf = false;
                }
                "setne" => {
                    let v = !self.flags.zf as i32;
                    self.write(&ops[0], v);
                }
                "neg" => {
                    let x = self.read(&ops[0]);
                    let v = x.wrapping_neg();
                    self.set_result_flags(v);
                    self.flags.cf = x != 0;
                    self.flags.of = x == i32::MIN;
                    self.write(&ops[0], v);
                }
                "sbb" => {
                    let (src, dst) = (self.read(&ops[0]), self.read(&ops[1]));
                    let v = dst.wrapping_sub(src).wrapping_sub(self.flags.cf as i32);
                    self.write(&ops[1], v);
                }
                "inc" => {
                    let v = self.read(&ops[0]).wrapping_add(1);
                    self.write(&ops[0], v);
                }
                "cdq" => {
                    let eax = self.regs[register("eax")];
                    self.regs[register("edx")] = if eax < 0 { -1 } else { 0 };
                }
                "idiv" => {
                    let divisor = self.read(&ops[0]);
                    let eax = self.regs[register("eax")];
                    self.regs[register("eax")] = eax.wrapping_div(divisor);
                    self.regs[register("edx")] = eax.wrapping_rem(divisor);
                }
                "cmovl" => {
                    if self.condition("cmovl") {
                        let v = self.read(&ops[0]);
                        self.write(&ops[1], v);
                    }
                }
                "je" | "jne" | "jl" | "jge" | "jg" | "jle" | "jmp" => {
                    if self.condition(&mnemonic) {
                        pc = self.jump_target(&ops[0]);
                    }
                }
                "call" => {
                    self.push(pc as i32);
                    pc = self.jump_target(&ops[0]);
                }
                "leave" => {
                    self.regs[register("esp")] = self.regs[register("ebp")];
                    let ebp = self.pop();
                    self.regs[register("ebp")] = ebp;
                }
                "ret" => {
                    let target = self.pop();
                    if target == RETURN_TO_HOST {
                        return self.regs[register("eax")];
                    }
                    pc = target as usize;
                }
                _ => panic!("unsupported instruction {}", mnemonic),
            }
        }
        panic!("{} did not return", func);
    }
}

fn run(input: &str, folding_enabled: bool) -> i32 {
    let options = CompilerOptions {
        folding_enabled,
        trace_enabled: false,
    };
    Machine::load(&compile(input, &options).unwrap()).call("Main")
}

/// Runs `input` with and without folding and checks both agree on `expected`.
fn assert_returns(input: &str, expected: i32) {
    assert_eq!(run(input, true), expected, "folding on");
    assert_eq!(run(input, false), expected, "folding off");
}

fn wrap_in_main(input: &str) -> String {
    format!("function Main(): int {{{}}}", input)
}

#[test]
fn logical_operators_on_ints() {
    assert_returns(&wrap_in_main("var a, r: int; a = 2; r = a && 1; return r;"), 1);
    assert_returns(&wrap_in_main("var a, r: int; a = 2; r = a || 0; return r;"), 1);
    assert_returns(&wrap_in_main("var a, r: int; a = 2; r = a && 4; return r;"), 1);
    assert_returns(&wrap_in_main("var a, r: int; a = 0; r = a || 0; return r;"), 0);
}

#[test]
fn logical_operators_on_unknown_ints() {
    let program = "
function f(a: int, b: int): int { var r: int; r = a && b; return r; }
function g(a: int, b: int): int { var r: int; r = a || b; return r; }
function Main(): int {
    var x, y: int;
    x = f(2, 4);
    y = g(2, 4);
    return x * 10 + y;
}";
    assert_returns(program, 11);
}

#[test]
fn arithmetic() {
    assert_returns(
        &wrap_in_main("var a, b: int; a = 7; b = a * 3 - 10 / 2; return |b - 20| + -a;"),
        -3,
    );
    assert_returns(
        "function f(a: int, b: int): int { return (a - b) / 2 + a * b; } function Main(): int { var r: int; r = f(9, -3); return r; }",
        -21,
    );
}

#[test]
fn comparisons_and_not() {
    let program = "
function f(a: int): int {
    var r: int;
    r = 0;
    if (a < 3) { r = r + 1; }
    if (a <= 3) { r = r + 2; }
    if (a > 3) { r = r + 4; }
    if (a >= 3) { r = r + 8; }
    if (a == 3) { r = r + 16; }
    if (a != 3) { r = r + 32; }
    if (!(a == 3)) { r = r + 64; }
    return r;
}
function Main(): int {
    var x, y, z: int;
    x = f(2);
    y = f(3);
    z = f(4);
    return x * 10000 + y * 100 + z;
}";
    assert_returns(program, 99 * 10000 + 26 * 100 + 108);
}

#[test]
fn loops_and_arrays() {
    let program = "
function Main(): int {
    var i, s: int;
    var a: intarray[5];
    i = 0;
    while (i < 5) {
        a[i] = i * i;
        i = i + 1;
    }
    a[2] = a[4] + a[1];
    s = 0;
    i = 0;
    while (i < 5) {
        s = s + a[i];
        i = i + 1;
    }
    return s;
}";
    assert_returns(program, 43);
}

#[test]
fn recursion_and_array_calls() {
    let program = "
function fib(n: int): int {
    var a, b: int;
    if (n < 2) { a = n; } else { a = fib(n - 1); b = fib(n - 2); a = a + b; }
    return a;
}
function Main(): int {
    var v: intarray[3];
    var i: int;
    i = 1;
    v[i] = fib(10);
    v[2] = fib(5);
    return v[1] + v[i + 1];
}";
    assert_returns(program, 60);
}
