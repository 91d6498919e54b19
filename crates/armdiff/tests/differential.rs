use std::cell::Cell;
use std::rc::Rc;

use armdiff::engine::{CpuMode, EngineError, FaultKind};
use armdiff::{
    CandidateAdapter, ExecutionAdapter, Field, Flag, Harness, HarnessConfig, LOADSTORE,
    MachineState, MemoryLayout, ReferenceAdapter, Reg, RunOutcome, StateComparator, TestCase,
    WindowId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

mod common;

use common::{LDRB_RRX, MOV_R0_R0, TritonLike, UnicornLike};

const HEAP: u32 = 0x0030_0000;

fn reference() -> ReferenceAdapter<impl armdiff::engine::ReferenceFactory> {
    ReferenceAdapter::new(
        UnicornLike::factory(Rc::new(Cell::new(0))),
        MemoryLayout::default(),
    )
    .with_label("unicorn")
}

fn candidate() -> CandidateAdapter<impl armdiff::engine::CandidateFactory> {
    CandidateAdapter::new(|_mode: CpuMode| Ok::<_, EngineError>(TritonLike::new()))
        .with_label("triton")
}

fn initial(seed: u64) -> MachineState {
    HarnessConfig::default()
        .initializer
        .build(&mut StdRng::seed_from_u64(seed))
}

fn run_to_string<R: ExecutionAdapter, C: ExecutionAdapter>(
    harness: &Harness<R, C>,
    initial: MachineState,
) -> (armdiff::RunReport, String) {
    let mut out = Vec::new();
    let report = harness.run(initial, &mut out).unwrap();
    (report, String::from_utf8(out).unwrap())
}

#[test]
fn ldrb_rrx_loads_heap_byte_on_both_engines() {
    let input = initial(7);
    assert!(!input.flag(Flag::C));

    let ref_out = reference().execute(&LDRB_RRX, &input).unwrap();
    let cand_out = candidate().execute(&LDRB_RRX, &input).unwrap();

    // r1 - (r4 >> 1 | C << 31) = HEAP + 40 - 4
    assert_eq!(ref_out.reg(Reg::R0), 0x24);
    assert_eq!(ref_out.pc(), input.pc() + 4);
    for reg in Reg::ALL {
        if reg != Reg::R0 && reg != Reg::Pc {
            assert_eq!(ref_out.reg(reg), input.reg(reg), "{reg} changed");
        }
    }
    assert_eq!(ref_out.flags(), input.flags());
    assert_eq!(ref_out.heap(), input.heap());
    assert_eq!(ref_out.stack(), input.stack());

    assert!(StateComparator::compare(&ref_out, &cand_out).is_empty());
    assert_eq!(ref_out, cand_out);
}

#[test]
fn builtin_table_passes() {
    let harness = Harness::new(HarnessConfig::default(), reference(), candidate()).unwrap();
    let (report, text) = run_to_string(&harness, initial(11));
    assert!(report.is_success());
    assert_eq!(report.passed, LOADSTORE.len());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(text, "[OK] ldrb r0, [r1, -r4, rrx]\n");
}

#[test]
fn carry_set_faults_on_both_engines_and_aborts() {
    let mut input = initial(3);
    input.set_flag(Flag::C, true);

    let ref_fault = reference().execute(&LDRB_RRX, &input).unwrap_err();
    let cand_fault = candidate().execute(&LDRB_RRX, &input).unwrap_err();
    assert_eq!(ref_fault.kind(), FaultKind::UnmappedAccess);
    assert_eq!(cand_fault.kind(), FaultKind::UnmappedAccess);
    assert_eq!(
        ref_fault.source,
        EngineError::UnmappedAccess {
            address: Some(HEAP.wrapping_add(40).wrapping_sub(0x8000_0004))
        }
    );

    let harness = Harness::new(HarnessConfig::default(), reference(), candidate()).unwrap();
    let (report, text) = run_to_string(&harness, input);
    assert_eq!(report.exit_code(), 1);
    assert!(matches!(report.outcome, RunOutcome::Aborted { case: 0, .. }));
    assert_eq!(
        text,
        "[KO] ldrb r0, [r1, -r4, rrx]\n\tunicorn: invalid memory access at 0x80300024\n"
    );
}

#[test]
fn heap_divergence_is_localized_and_stops_the_run() {
    let config = HarnessConfig::default().with_cases(vec![
        LOADSTORE[0].clone(),
        TestCase::new(MOV_R0_R0, "mov r0, r0"),
    ]);
    let corrupt = CandidateAdapter::new(|_mode: CpuMode| {
        Ok::<_, EngineError>(TritonLike::corrupting(HEAP + 12))
    })
    .with_label("triton");
    let harness = Harness::new(config, reference(), corrupt).unwrap();
    let (report, text) = run_to_string(&harness, initial(5));

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.passed, 0);
    let RunOutcome::Failed { case, report: diff, .. } = &report.outcome else {
        panic!("expected a divergence");
    };
    assert_eq!(*case, 0);
    assert_eq!(diff.len(), 1);
    assert_eq!(
        diff.get(Field::Memory {
            window: WindowId::Heap,
            offset: 12
        }),
        Some((12, 13))
    );

    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("[KO] ldrb r0, [r1, -r4, rrx] (heap differs!)"));
    assert_eq!(lines.next(), Some("\theap: in | unicorn | triton"));
    assert_eq!(lines.next(), Some("\theap[12] @ 0x0030000c: 0c | 0c | 0d"));
    assert!(!text.contains("mov r0, r0"));
}

#[test]
fn later_cases_run_at_advanced_pc() {
    let config = HarnessConfig::default().with_cases(vec![
        TestCase::new(MOV_R0_R0, "mov r0, r0"),
        LOADSTORE[0].clone(),
        TestCase::new(MOV_R0_R0, "mov r0, r0"),
    ]);
    let harness = Harness::new(config, reference(), candidate()).unwrap();
    let (report, text) = run_to_string(&harness, initial(9));
    assert!(report.is_success(), "{text}");
    assert_eq!(report.passed, 3);
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|line| line.starts_with("[OK] ")));
}

#[test]
fn every_execution_opens_a_fresh_engine() {
    let opened = Rc::new(Cell::new(0));
    let adapter = ReferenceAdapter::new(
        UnicornLike::factory(Rc::clone(&opened)),
        MemoryLayout::default(),
    );
    let input = initial(1);
    let first = adapter.execute(&LDRB_RRX, &input).unwrap();
    let second = adapter.execute(&LDRB_RRX, &input).unwrap();
    assert_eq!(opened.get(), 2);
    assert_eq!(first, second);
}

#[test]
fn adapters_leave_input_untouched() {
    let input = initial(21);
    let snapshot = input.clone();
    let _ = reference().execute(&LDRB_RRX, &input).unwrap();
    assert_eq!(input, snapshot);
    let _ = candidate().execute(&LDRB_RRX, &input).unwrap();
    assert_eq!(input, snapshot);
}

#[test]
fn unknown_instruction_is_undefined() {
    let input = initial(4);
    let fault = candidate().execute(&[0xff, 0xff, 0xff, 0xff], &input).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::UndefinedInstruction);
    assert_eq!(fault.engine, "triton");
}

#[test]
fn short_memory_read_aborts_instead_of_passing() {
    let truncated = CandidateAdapter::new(|_mode: CpuMode| {
        Ok::<_, EngineError>(TritonLike::truncating(12))
    })
    .with_label("triton");

    let fault = truncated.execute(&LDRB_RRX, &initial(8)).unwrap_err();
    assert_eq!(fault.engine, "triton");
    assert_eq!(
        fault.source,
        EngineError::ShortRead {
            address: 0x0020_0000,
            expected: 0x100,
            actual: 12,
        }
    );

    let harness = Harness::new(HarnessConfig::default(), reference(), truncated).unwrap();
    let (report, text) = run_to_string(&harness, initial(8));
    assert_eq!(report.exit_code(), 1);
    assert!(matches!(report.outcome, RunOutcome::Aborted { case: 0, .. }));
    assert_eq!(
        text,
        "[KO] ldrb r0, [r1, -r4, rrx]\n\ttriton: read 12 bytes at 0x00200000, expected 256\n"
    );
}

#[test]
fn reference_layout_must_match_config() {
    let moved = ReferenceAdapter::new(
        UnicornLike::factory(Rc::new(Cell::new(0))),
        MemoryLayout {
            heap_base: 0x0040_0000,
            ..MemoryLayout::default()
        },
    )
    .with_label("unicorn");
    let result = Harness::new(HarnessConfig::default(), moved, candidate());
    assert!(matches!(
        result,
        Err(armdiff::Error::LayoutMismatch { adapter }) if adapter == "unicorn"
    ));

    let thumb = candidate().with_mode(CpuMode::Thumb);
    let result = Harness::new(HarnessConfig::default(), reference(), thumb);
    assert!(matches!(result, Err(armdiff::Error::ModeMismatch { .. })));
}
