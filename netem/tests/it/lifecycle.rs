use netem::{
    ext::{Arg, Capability, CapabilitySet, ProgramType, Signature},
    Handle, Host, InitError, NetemModule, PacketContext, QdiscKind, QdiscOps, QdiscSpec,
    RegisterError, RegistryError, MODULE_NAME, READ_STATS,
};

#[derive(Debug)]
struct Placeholder;

impl Capability for Placeholder {
    fn name(&self) -> &'static str {
        READ_STATS
    }

    fn signature(&self) -> Signature {
        Signature { context: true, params: &[] }
    }

    fn call(&self, _ctx: &PacketContext, _args: &mut [Arg<'_>]) -> i32 {
        0
    }
}

#[test]
fn netem_qdiscs_need_the_module() {
    let _ = tracing_subscriber::fmt::try_init();
    let host = Host::new();
    let eth0 = host.registry().add_device("eth0").unwrap();

    let err = host.registry().create_qdisc(eth0, Handle::new(1, 0), QdiscSpec::netem()).unwrap_err();
    assert!(matches!(err, RegistryError::UnknownDiscipline(QdiscKind::Netem)));

    let module = NetemModule::init(&host).unwrap();
    host.registry().create_qdisc(eth0, Handle::new(1, 0), QdiscSpec::netem()).unwrap();

    module.exit();
    let err = host.registry().create_qdisc(eth0, Handle::new(2, 0), QdiscSpec::netem()).unwrap_err();
    assert!(matches!(err, RegistryError::UnknownDiscipline(QdiscKind::Netem)));
}

#[test]
fn failed_capability_leaves_no_qdisc_registration() {
    let _ = tracing_subscriber::fmt::try_init();
    let host = Host::new();
    host.capabilities()
        .register(ProgramType::SchedCls, CapabilitySet::new("squatter").with(Placeholder))
        .unwrap();

    let err = NetemModule::init(&host).unwrap_err();
    assert!(matches!(err, InitError::Capability(RegisterError::Exists { .. })));
    assert_eq!(err.errno(), -17);
    assert!(host.disciplines().lookup("netem").is_none());

    // Once the clash is gone the module loads.
    host.capabilities().unregister(ProgramType::SchedCls, "squatter").unwrap();
    let _module = NetemModule::init(&host).unwrap();
    assert!(host.disciplines().is_registered("netem"));
    assert_eq!(host.capabilities().names(ProgramType::SchedCls), vec![READ_STATS]);
}

#[test]
fn failed_qdisc_registration_publishes_nothing() {
    let host = Host::new();
    host.disciplines().register(QdiscOps::for_kind(QdiscKind::Netem)).unwrap();

    let err = NetemModule::init(&host).unwrap_err();
    assert!(matches!(err, InitError::Qdisc(_)));
    assert!(host.capabilities().names(ProgramType::SchedCls).is_empty());
}

#[test]
fn loading_twice_fails_without_disturbing_the_first() {
    let host = Host::new();
    let first = NetemModule::init(&host).unwrap();

    assert!(NetemModule::init(&host).is_err());
    assert!(host.disciplines().is_registered("netem"));
    assert!(host.capabilities().resolve(ProgramType::SchedCls, READ_STATS).is_some());

    first.exit();
    assert!(!host.disciplines().is_registered("netem"));
    assert!(host.capabilities().unregister(ProgramType::SchedCls, MODULE_NAME).is_err());
}
