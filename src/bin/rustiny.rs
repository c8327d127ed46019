//! A thin illustrative CLI wrapper around the allocator core (§2, §6: "not a
//! protocol surface"). Builds a tiny hand-written function, runs liveness
//! analysis and allocation against a toy four-register target, and prints
//! the location each value ended up in.

extern crate clap;
extern crate env_logger;
extern crate lsra;

use clap::{App, Arg};

use lsra::driver;
use lsra::ir::{Block, BlockId, Function, InstId, Instruction, Operand, ParameterLocation};
use lsra::machine::{Arch, CallingConvention, PointerWidth, RegisterFile, RegisterMask, Target};
use lsra::regalloc::{self, AllocatorConfig};
use lsra::resolver;
use lsra::util;

/// `a, b = params; sum = a + b; call(sum); use(sum)` — small enough to read
/// the allocator's decisions off the printed trace, large enough to exercise
/// a call-clobber fixed interval.
fn demo_function() -> Function {
    let mut a = Instruction::new(InstId(0));
    a.parameter = Some(ParameterLocation::Register(0));

    let mut b = Instruction::new(InstId(1));
    b.parameter = Some(ParameterLocation::Register(1));

    let mut sum = Instruction::new(InstId(2));
    sum.inputs = vec![Operand::new(InstId(0)), Operand::new(InstId(1))];

    let mut call = Instruction::new(InstId(3));
    call.dst_count = 0;
    call.is_call = true;
    call.inputs = vec![Operand::new(InstId(2))];

    let mut ret = Instruction::new(InstId(4));
    ret.dst_count = 0;
    ret.inputs = vec![Operand::fixed(InstId(2), 0)];

    let block = Block { id: BlockId(0), insts: vec![InstId(0), InstId(1), InstId(2), InstId(3), InstId(4)], successors: Vec::new() };

    Function::new(vec![a, b, sum, call, ret], vec![block])
}

fn demo_target() -> Target {
    let mut int_clobbers = RegisterMask::new();
    int_clobbers.insert(0);
    int_clobbers.insert(1);

    let int_regs = RegisterFile {
        mask: RegisterMask::from_range(4),
        first_callee_save: 2,
        accumulator_reg: None,
        zero_reg: None,
        call_clobbers: int_clobbers,
    };

    let fp_regs = RegisterFile {
        mask: RegisterMask::from_range(2),
        first_callee_save: 0,
        accumulator_reg: None,
        zero_reg: None,
        call_clobbers: RegisterMask::new(),
    };

    let cconv = CallingConvention::new(PointerWidth::Bits64, vec![ParameterLocation::Register(0), ParameterLocation::Register(1)]);

    Target { arch: Arch::None, int_regs, fp_regs, max_imm_slots: 4, cconv }
}

fn render_trace(store: &regalloc::IntervalStore) -> String {
    let mut lines = Vec::new();
    for id in store.ids() {
        let interval = store.get(id);
        if let Some(inst) = interval.inst {
            lines.push(format!("{} -> {:?} [{}, {})", inst, interval.location, interval.begin.0, interval.end.0));
        }
    }

    let plan = resolver::build(store);
    for mv in &plan.moves {
        lines.push(format!("move {} : {:?} -> {:?} at {}", mv.inst, mv.from, mv.to, mv.at.0));
    }

    lsra::connect!(lines, "{}", "\n")
}

#[cfg(not(test))]
fn main() {
    env_logger::init();

    let app = App::new("lsra")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Markus Siemens <siemens1993@gmail.com>")
        .about("Linear-scan register allocator demo")
        .arg(
            Arg::with_name("output")
                .short("o")
                .value_name("OUTPUT")
                .help("Write the allocation trace to this file instead of stdout"),
        )
        .arg(
            Arg::with_name("bytecode")
                .long("bytecode")
                .help("Run in bytecode-optimizer mode (disables register stealing)"),
        )
        .arg(
            Arg::with_name("remat")
                .long("remat")
                .help("Enable single-immediate constant rematerialization"),
        );
    let args = app.get_matches();

    let function = demo_function();
    let target = demo_target();
    let config = AllocatorConfig::new(Arch::None)
        .with_bytecode_mode(args.is_present("bytecode"))
        .with_remat(args.is_present("remat"));

    let store = match regalloc::allocate(&function, target, config) {
        Ok(store) => store,
        Err(err) => {
            driver::fatal(format!("allocation failed: {}", err));
            driver::abort();
        }
    };

    let trace = render_trace(&store);
    match args.value_of("output") {
        Some(path) => util::write_file(path, &trace),
        None => println!("{}", trace),
    }
}
