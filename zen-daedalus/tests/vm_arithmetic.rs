mod support;

use pretty_assertions::assert_eq;
use support::{build_module, const_func, CodeBuilder, TY_INT};
use zen_daedalus::{Script, Vm, VmConfig};

#[test]
fn multiplies_two_immediates_and_returns_the_product() {
    let mut code = CodeBuilder::new();
    let func_addr = code.addr();
    code.pushi(6).pushi(7).mul().rsr();

    let func = const_func("TESTFUNC", func_addr as i32, TY_INT);
    let bytes = build_module(100, &[func], &code.finish());

    let script = Script::load(&bytes).unwrap();
    let mut vm = Vm::new(script, VmConfig::default());

    vm.call(0).unwrap();
    assert_eq!(vm.pop_int().unwrap(), 42);
}

#[test]
fn popping_an_int_off_an_empty_stack_tolerantly_returns_zero() {
    let code = CodeBuilder::new();
    let func = const_func("EMPTY", 0, TY_INT);
    let bytes = build_module(100, &[func], &code.finish());

    let script = Script::load(&bytes).unwrap();
    let mut vm = Vm::new(script, VmConfig::default());

    assert_eq!(vm.pop_int().unwrap(), 0);
    assert_eq!(vm.pop_float().unwrap(), 0.0);
}
