//! Save-state compatibility tests

use hle_api::{CoreState, Error, HleConfig};
use hle_jit::LoopExit;
use hle_syscalls::mips::{self, REG_V0};
use hle_syscalls::{CallSite, HleContext};

use crate::common::*;

const SITES: [u32; 3] = [0x0890_0000, 0x0890_0040, 0x0890_0080];
const TARGET: u32 = 0x0892_0000;

fn with_deferred(config: HleConfig) -> (HleContext, FakeMachine) {
    let mut hle = HleContext::new(config).unwrap();
    let mut machine = FakeMachine::default();
    hle.write_syscall(&mut machine.ram, "GuestLib", 0x0000_0A01, SITES[0]).unwrap();
    hle.write_syscall(&mut machine.ram, "GuestLib", 0x0000_0A02, SITES[1]).unwrap();
    hle.write_syscall(&mut machine.ram, "OtherLib", 0x0000_0A01, SITES[2]).unwrap();
    (hle, machine)
}

#[test]
fn test_deferred_list_survives_a_reload() {
    let (saved_from, _) = with_deferred(HleConfig::default());
    let bytes = saved_from.save_state().unwrap();

    let mut hle = hle_context();
    hle.load_state(&bytes).unwrap();
    assert_eq!(hle.patcher().unresolved(), saved_from.patcher().unresolved());

    // Loading restores the queue, not guest memory; resolution writes it.
    let mut machine = FakeMachine::default();
    assert_eq!(hle.resolve_syscall(&mut machine.ram, "GuestLib", 0x0000_0A01, TARGET).unwrap(), 1);
    assert_eq!(mips::jump_target(SITES[0], machine.ram.words[&SITES[0]]), Some(TARGET));
    assert_eq!(hle.patcher().unresolved().len(), 2);
    assert!(!machine.ram.words.contains_key(&SITES[2]));
}

#[test]
fn test_keep_resolved_entries() {
    let config = HleConfig::default().with_prune_resolved_syscalls(false);
    let (mut hle, mut machine) = with_deferred(config);

    assert_eq!(hle.resolve_syscall(&mut machine.ram, "GuestLib", 0x0000_0A02, TARGET).unwrap(), 1);
    assert_eq!(hle.patcher().unresolved().len(), 3);

    // A reloaded module binds the same site again.
    let moved = TARGET + 0x1000;
    assert_eq!(hle.resolve_syscall(&mut machine.ram, "GuestLib", 0x0000_0A02, moved).unwrap(), 1);
    assert_eq!(hle.patcher().call_site(SITES[1]), Some(CallSite::DirectJump(moved)));

    let bytes = hle.save_state().unwrap();
    let mut reloaded = HleContext::new(HleConfig::default().with_prune_resolved_syscalls(false)).unwrap();
    reloaded.load_state(&bytes).unwrap();
    assert_eq!(reloaded.patcher().unresolved().len(), 3);
}

#[test]
fn test_bad_state_leaves_context_untouched() {
    let (mut hle, _) = with_deferred(HleConfig::default());
    let before = hle.patcher().unresolved().to_vec();

    let err = hle.load_state(&[0xFF, 0xFF, 0xFF]).unwrap_err();
    assert!(matches!(err, Error::ParseError(_)));
    assert_eq!(hle.patcher().unresolved(), &before[..]);
}

#[test]
fn test_resume_after_load() {
    const NID: u32 = 0x0000_0A01;

    let (saved_from, _) = with_deferred(HleConfig::default());
    let bytes = saved_from.save_state().unwrap();

    let mut machine = FakeMachine::default();
    machine.ram.load(MAIN, &[jal(SITES[0]), mips::make_nop(), mips::make_j(EXIT), mips::make_nop()]);
    machine.ram.load(TARGET, &[addiu(REG_V0 as u32, 0, 3), mips::make_jr_ra(), mips::make_nop()]);

    let mut hle = hle_context();
    hle.load_state(&bytes).unwrap();
    assert_eq!(hle.resolve_syscall(&mut machine.ram, "GuestLib", NID, TARGET).unwrap(), 1);

    let mut executor = GuestExecutor::new(machine, hle);
    let exit = dispatch_loop().run(&mut executor).unwrap();

    assert_eq!(exit, LoopExit::CoreState(CoreState::PowerDown));
    assert_eq!(executor.machine.cpu.gpr[REG_V0], 3);
}
