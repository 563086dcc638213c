mod support;

use pretty_assertions::assert_eq;
use support::{build_module, class, const_func, const_void_func, instance, member_int, CodeBuilder, TY_INT};
use zen_daedalus::{Instance, Script, Vm, VmConfig};

struct Npc {
    x: i32,
}

#[test]
fn writes_and_reads_a_host_bound_member_through_the_vm() {
    // Symbol layout: 0 = class C, 1 = member C.X, 2 = SETX, 3 = GETX, 4 = HERO.
    let mut code = CodeBuilder::new();
    let setx_addr = code.addr();
    code.pushi(5).pushv(1).movi().rsr();
    let getx_addr = code.addr();
    code.pushv(1).rsr();

    let symbols = vec![
        class("C"),
        member_int("C.X", 0),
        const_void_func("SETX", setx_addr as i32),
        const_func("GETX", getx_addr as i32, TY_INT),
        instance("HERO", 0),
    ];
    let bytes = build_module(100, &symbols, &code.finish());

    let mut script = Script::load(&bytes).unwrap();
    script
        .register_member_int::<Npc>("C.X", |npc| npc.x, |npc, v| npc.x = v)
        .unwrap();

    let mut vm = Vm::new(script, VmConfig::default());
    let hero = Instance::host(4, Npc { x: 0 });
    vm.set_current_instance(Some(hero.clone()));

    vm.call(2).unwrap(); // SETX: self.x = 5

    assert_eq!(hero.borrow().downcast_ref::<Npc>().unwrap().x, 5);

    vm.call(3).unwrap(); // GETX: return self.x
    assert_eq!(vm.pop_int().unwrap(), 5);
}

#[test]
fn rejects_registering_a_member_under_two_different_host_types() {
    struct Other {
        x: i32,
    }

    let symbols = vec![class("C"), member_int("C.X", 0)];
    let bytes = build_module(100, &symbols, &[]);
    let mut script = Script::load(&bytes).unwrap();

    script
        .register_member_int::<Npc>("C.X", |npc| npc.x, |npc, v| npc.x = v)
        .unwrap();

    let err = script
        .register_member_int::<Other>("C.X", |o| o.x, |o, v| o.x = v)
        .unwrap_err();
    assert!(matches!(err, zen_daedalus::SymbolError::MemberRegistration { .. }));
}
