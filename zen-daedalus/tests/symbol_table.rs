mod support;

use pretty_assertions::assert_eq;
use support::{build_module, const_int, int_var, CodeBuilder};
use zen_daedalus::{Script, SymbolStorage, Vm, VmConfig, VmException};

#[test]
fn round_trips_a_global_int_variable_through_its_own_storage() {
    let symbols = vec![int_var("COUNTER", 7)];
    let bytes = build_module(100, &symbols, &[]);

    let mut script = Script::load(&bytes).unwrap();
    let sym = script.find_symbol_by_name("counter").expect("case-insensitive lookup");
    assert!(matches!(sym.storage, SymbolStorage::Ints(ref v) if v == &[7]));
    assert_eq!(sym.get_int(0, None, &zen_daedalus::MemberBindings::default()).unwrap(), 7);

    let bindings = zen_daedalus::MemberBindings::default();
    script
        .find_symbol_by_name_mut("COUNTER")
        .unwrap()
        .set_int(0, 42, None, &bindings)
        .unwrap();
    assert_eq!(
        script.find_symbol_by_name("COUNTER").unwrap().get_int(0, None, &bindings).unwrap(),
        42
    );
}

#[test]
fn writing_a_const_symbol_through_the_vm_is_rejected_unless_overridden() {
    let mut code = CodeBuilder::new();
    code.pushi(99).pushv(1).movi().rsr();

    let symbols = vec![support::const_void_func("SETTER", 0), const_int("LIMIT", 1)];
    let bytes = build_module(100, &symbols, &code.finish());

    let script = Script::load(&bytes).unwrap();
    let mut vm = Vm::new(script, VmConfig::default());

    let err = vm.call(0).unwrap_err();
    assert!(matches!(
        err,
        VmException::Symbol(zen_daedalus::SymbolError::IllegalConstAccess(ref name)) if name == "LIMIT"
    ));
}

#[test]
fn ignore_const_specifier_lets_the_write_through() {
    let mut code = CodeBuilder::new();
    code.pushi(99).pushv(1).movi().rsr();

    let symbols = vec![support::const_void_func("SETTER", 0), const_int("LIMIT", 1)];
    let bytes = build_module(100, &symbols, &code.finish());

    let script = Script::load(&bytes).unwrap();
    let config = VmConfig {
        ignore_const_specifier: true,
        ..VmConfig::default()
    };
    let mut vm = Vm::new(script, config);

    vm.call(0).unwrap();
    assert_eq!(
        vm.script().find_symbol_by_name("LIMIT").unwrap().get_int(0, None, &zen_daedalus::MemberBindings::default()).unwrap(),
        99
    );
}
