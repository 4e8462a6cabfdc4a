//! Integration tests for constructor selection and call-site planning
//!
//! Covers the selection rules (score, tie-breaking, ambiguity), the failure
//! kinds surfaced to callers, cycle detection and open generic resolution.

use elif_resolver::container::{
    CallSite, CallSiteResolver, ConstructorInfo, Dependency, ParameterInfo, ResolutionFailure,
    ServiceDescriptor, ServiceId, ServiceRegistry, ServiceRegistryBuilder, ServiceScope,
    TypeMetadata,
};
use elif_resolver::{CoreError, ResolverConfig};
use serde_json::Value;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("elif_resolver=trace")
        .try_init();
}

fn ctor(params: &[&str]) -> ConstructorInfo {
    ConstructorInfo::public(params.iter().map(|p| ParameterInfo::single(*p)).collect())
}

fn simple(name: &str) -> TypeMetadata {
    TypeMetadata::new(name).with_default_constructor()
}

/// Registry with a parameterless implementation for each contract
fn registry_with(contracts: &[&str]) -> ServiceRegistryBuilder {
    contracts.iter().fold(ServiceRegistryBuilder::new(), |builder, contract| {
        builder
            .bind(*contract, simple(&format!("{}Impl", contract.trim_start_matches('I'))))
            .expect("plain bindings are always accepted")
    })
}

fn resolve(registry: &ServiceRegistry, contract: &str) -> Result<CallSite, ResolutionFailure> {
    CallSiteResolver::new(registry).resolve(&ServiceId::new(contract))
}

fn chosen_parameters(site: &CallSite) -> Vec<Dependency> {
    match site.unwrap_lifetime() {
        CallSite::Instantiate { .. } => Vec::new(),
        CallSite::ConstructWith { constructor, .. } => constructor.parameters.clone(),
        other => panic!("Expected a constructor call site, got {:?}", other),
    }
}

#[test]
fn test_parameterless_fallback_when_dependency_missing() -> Result<(), CoreError> {
    init_tracing();
    let metadata = simple("A").with_constructor(ctor(&["IFoo"]));
    let registry = ServiceRegistryBuilder::new().bind("IA", metadata)?.build()?;

    let site = resolve(&registry, "IA")?;
    assert_eq!(site.lifetime(), Some(ServiceScope::Transient));
    assert!(matches!(
        site.unwrap_lifetime(),
        CallSite::Instantiate { implementation } if implementation.type_name() == "A"
    ));
    Ok(())
}

#[test]
fn test_higher_score_constructor_is_chosen() -> Result<(), CoreError> {
    let registry = registry_with(&["IFoo", "IBar"])
        .bind(
            "IA",
            TypeMetadata::new("A")
                .with_constructor(ctor(&["IFoo"]))
                .with_constructor(ctor(&["IFoo", "IBar"])),
        )?
        .build()?;

    let site = resolve(&registry, "IA")?;
    assert_eq!(
        chosen_parameters(&site),
        vec![Dependency::Single("IFoo".into()), Dependency::Single("IBar".into())]
    );

    let arguments = site.unwrap_lifetime().dependencies();
    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments[0].implementation(), Some(&ServiceId::new("FooImpl")));
    assert_eq!(arguments[1].implementation(), Some(&ServiceId::new("BarImpl")));
    Ok(())
}

#[test]
fn test_disjoint_constructors_are_ambiguous() -> Result<(), CoreError> {
    let registry = registry_with(&["IFoo", "IBar"])
        .bind(
            "IB",
            TypeMetadata::new("B")
                .with_constructor(ctor(&["IFoo"]))
                .with_constructor(ctor(&["IBar"])),
        )?
        .build()?;

    match resolve(&registry, "IB") {
        Err(ResolutionFailure::AmbiguousConstructors {
            contract,
            implementation,
            constructors,
        }) => {
            assert_eq!(contract, ServiceId::new("IB"));
            assert_eq!(implementation, ServiceId::new("B"));
            let rendered: Vec<String> = constructors.iter().map(ToString::to_string).collect();
            assert_eq!(rendered, vec!["(IFoo)", "(IBar)"]);
        }
        other => panic!("Expected ambiguity, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_single_constructor_reports_unresolvable_parameter() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind("IC", TypeMetadata::new("C").with_constructor(ctor(&["IFoo"])))?
        .build()?;

    assert_eq!(
        resolve(&registry, "IC").unwrap_err(),
        ResolutionFailure::UnresolvableParameter {
            contract: "IC".into(),
            implementation: "C".into(),
            parameter: "IFoo".into(),
        }
    );
    Ok(())
}

#[test]
fn test_parameterless_type_always_instantiates() -> Result<(), CoreError> {
    for contracts in [&[][..], &["IFoo"][..], &["IFoo", "IBar"][..]] {
        let registry = registry_with(contracts).bind("IPlain", simple("Plain"))?.build()?;
        let site = resolve(&registry, "IPlain")?;
        assert!(matches!(site.unwrap_lifetime(), CallSite::Instantiate { .. }));
    }
    Ok(())
}

#[test]
fn test_type_without_public_constructor_fails() -> Result<(), CoreError> {
    let registry = registry_with(&["IFoo"])
        .bind("INone", TypeMetadata::new("NoConstructors"))?
        .bind(
            "IHidden",
            TypeMetadata::new("Hidden").with_constructor(ConstructorInfo::private(vec![])),
        )?
        .build()?;

    for contract in ["INone", "IHidden"] {
        let failure = resolve(&registry, contract).unwrap_err();
        assert_eq!(failure.kind(), "no_public_constructor");
        assert_eq!(failure.contract(), Some(&ServiceId::new(contract)));
    }
    Ok(())
}

#[test]
fn test_nested_constructor_chain_is_never_ambiguous() -> Result<(), CoreError> {
    let all = ["IFoo", "IBar", "IBaz"];
    let metadata = TypeMetadata::new("Nested")
        .with_constructor(ctor(&["IFoo"]))
        .with_constructor(ctor(&["IFoo", "IBar", "IBaz"]))
        .with_constructor(ctor(&["IFoo", "IBar"]));

    for mask in 0..(1u8 << all.len()) {
        let registered: Vec<&str> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1u8 << *i) != 0)
            .map(|(_, c)| *c)
            .collect();
        let registry = registry_with(&registered).bind("INested", metadata.clone())?.build()?;

        // Longest satisfiable prefix of (IFoo, IBar, IBaz)
        let expected = all.iter().take_while(|c| registered.contains(*c)).count();
        match resolve(&registry, "INested") {
            Ok(site) => assert_eq!(
                chosen_parameters(&site).len(),
                expected,
                "registered: {:?}",
                registered
            ),
            Err(ResolutionFailure::NoViableConstructor { .. }) => assert_eq!(expected, 0),
            Err(other) => panic!("Unexpected failure for {:?}: {}", registered, other),
        }
    }
    Ok(())
}

#[test]
fn test_adding_registration_moves_selection_to_superset() -> Result<(), CoreError> {
    let metadata = TypeMetadata::new("Reporter")
        .with_constructor(ctor(&["ILogger"]))
        .with_constructor(ctor(&["ILogger", "IMailer"]));

    let before = registry_with(&["ILogger"]).bind("IReporter", metadata.clone())?.build()?;
    let after = registry_with(&["ILogger", "IMailer"]).bind("IReporter", metadata)?.build()?;

    assert_eq!(chosen_parameters(&resolve(&before, "IReporter")?).len(), 1);
    assert_eq!(chosen_parameters(&resolve(&after, "IReporter")?).len(), 2);
    Ok(())
}

#[test]
fn test_collect_all_parameter_never_fails() -> Result<(), CoreError> {
    let dispatcher = TypeMetadata::new("Dispatcher")
        .with_constructor(ConstructorInfo::public(vec![ParameterInfo::all("IHandler")]));

    let empty = ServiceRegistryBuilder::new().bind("IDispatcher", dispatcher.clone())?.build()?;
    let site = resolve(&empty, "IDispatcher")?;
    match &site.unwrap_lifetime().dependencies()[0] {
        CallSite::CollectAll { service_id, members } => {
            assert_eq!(service_id, &ServiceId::new("IHandler"));
            assert!(members.is_empty());
        }
        other => panic!("Expected collect-all, got {:?}", other),
    }

    let populated = ServiceRegistryBuilder::new()
        .bind("IHandler", simple("AuditHandler"))?
        .bind("IDispatcher", dispatcher)?
        .bind("IHandler", simple("MetricsHandler"))?
        .build()?;
    let site = resolve(&populated, "IDispatcher")?;
    let members: Vec<String> = site.unwrap_lifetime().dependencies()[0]
        .dependencies()
        .iter()
        .filter_map(|m| m.implementation().map(ToString::to_string))
        .collect();
    assert_eq!(members, vec!["AuditHandler", "MetricsHandler"]);
    Ok(())
}

#[test]
fn test_top_level_resolve_all() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind("IHandler", simple("First"))?
        .bind_instance("IHandler", "static handler")?
        .build()?;
    let resolver = CallSiteResolver::new(&registry);

    let site = resolver.resolve_all(&"IHandler".into())?;
    assert_eq!(site.dependencies().len(), 2);
    assert!(matches!(site.dependencies()[1].unwrap_lifetime(), CallSite::Instance { .. }));

    let empty = resolver.resolve_all(&"IMissing".into())?;
    assert!(empty.dependencies().is_empty());
    Ok(())
}

#[test]
fn test_default_value_fallback() -> Result<(), CoreError> {
    let metadata = TypeMetadata::new("HttpClient").with_constructor(ConstructorInfo::public(vec![
        ParameterInfo::single("ITimeoutPolicy").named("timeout").with_default(30),
    ]));
    let registry = ServiceRegistryBuilder::new().bind("IHttpClient", metadata)?.build()?;

    let site = resolve(&registry, "IHttpClient")?;
    assert!(matches!(
        &site.unwrap_lifetime().dependencies()[0],
        CallSite::DefaultValue { value } if *value == Value::from(30)
    ));
    Ok(())
}

#[test]
fn test_default_only_constructor_loses_to_registered_competitor() -> Result<(), CoreError> {
    let metadata = TypeMetadata::new("HttpClient")
        .with_constructor(ConstructorInfo::public(vec![
            ParameterInfo::single("ITimeoutPolicy").with_default(30),
            ParameterInfo::single("IRetryPolicy").with_default(3),
        ]))
        .with_constructor(ctor(&["ILogger"]));
    let registry = registry_with(&["ILogger"]).bind("IHttpClient", metadata)?.build()?;

    let site = resolve(&registry, "IHttpClient")?;
    assert_eq!(chosen_parameters(&site), vec![Dependency::Single("ILogger".into())]);
    Ok(())
}

#[test]
fn test_default_only_constructor_beats_parameterless() -> Result<(), CoreError> {
    let metadata = TypeMetadata::new("HttpClient")
        .with_default_constructor()
        .with_constructor(ConstructorInfo::public(vec![
            ParameterInfo::single("ITimeoutPolicy").with_default(30),
        ]));
    let registry = ServiceRegistryBuilder::new().bind("IHttpClient", metadata)?.build()?;

    let site = resolve(&registry, "IHttpClient")?;
    assert_eq!(chosen_parameters(&site).len(), 1);
    Ok(())
}

#[test]
fn test_cycle_is_reported_with_path() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind("IA", TypeMetadata::new("A").with_constructor(ctor(&["IB"])))?
        .bind("IB", TypeMetadata::new("B").with_constructor(ctor(&["IC"])))?
        .bind("IC", TypeMetadata::new("C").with_constructor(ctor(&["IA"])))?
        .build()?;

    assert_eq!(
        resolve(&registry, "IA").unwrap_err(),
        ResolutionFailure::CyclicDependency {
            path: vec!["IA".into(), "IB".into(), "IC".into(), "IA".into()],
        }
    );
    Ok(())
}

#[test]
fn test_cycle_through_collection() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind(
            "IPlugin",
            TypeMetadata::new("CompositePlugin")
                .with_constructor(ConstructorInfo::public(vec![ParameterInfo::all("IPlugin")])),
        )?
        .build()?;

    assert_eq!(resolve(&registry, "IPlugin").unwrap_err().kind(), "cyclic_dependency");
    Ok(())
}

#[test]
fn test_shared_dependency_in_sibling_branches_is_not_a_cycle() -> Result<(), CoreError> {
    let registry = registry_with(&["ILogger"])
        .bind("IRepository", TypeMetadata::new("Repository").with_constructor(ctor(&["ILogger"])))?
        .bind(
            "IUserService",
            TypeMetadata::new("UserService").with_constructor(ctor(&["ILogger", "IRepository"])),
        )?
        .build()?;

    let site = resolve(&registry, "IUserService")?;
    assert_eq!(chosen_parameters(&site).len(), 2);
    Ok(())
}

#[test]
fn test_nested_failure_is_not_retried_with_other_constructor() -> Result<(), CoreError> {
    // IFoo is registered, so (IFoo) outranks (); its own failure is final
    let registry = ServiceRegistryBuilder::new()
        .bind("IFoo", TypeMetadata::new("Foo").with_constructor(ctor(&["IMissing"])))?
        .bind("IA", simple("A").with_constructor(ctor(&["IFoo"])))?
        .build()?;

    assert_eq!(
        resolve(&registry, "IA").unwrap_err(),
        ResolutionFailure::UnresolvableParameter {
            contract: "IFoo".into(),
            implementation: "Foo".into(),
            parameter: "IMissing".into(),
        }
    );
    Ok(())
}

#[test]
fn test_unregistered_contract() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new().build()?;
    assert_eq!(
        resolve(&registry, "ILogger").unwrap_err(),
        ResolutionFailure::ServiceNotRegistered { contract: "ILogger".into() }
    );
    Ok(())
}

#[test]
fn test_last_registration_wins() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind("ILogger", simple("ConsoleLogger"))?
        .bind_with("ILogger", simple("FileLogger"), ServiceScope::Singleton)?
        .build()?;

    let site = resolve(&registry, "ILogger")?;
    assert_eq!(site.lifetime(), Some(ServiceScope::Singleton));
    assert_eq!(site.implementation(), Some(&ServiceId::new("FileLogger")));
    Ok(())
}

#[test]
fn test_instance_and_factory_leaves_are_lifetime_wrapped() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind_instance("ISettings", 8080u16)?
        .bind_factory("IClock", ServiceScope::Scoped, || 1_700_000_000u64)?
        .bind(
            "IServer",
            TypeMetadata::new("Server").with_constructor(ctor(&["ISettings", "IClock"])),
        )?
        .build()?;

    let site = resolve(&registry, "IServer")?;
    let arguments = site.unwrap_lifetime().dependencies();
    assert_eq!(arguments[0].lifetime(), Some(ServiceScope::Singleton));
    assert!(matches!(arguments[0].unwrap_lifetime(), CallSite::Instance { .. }));
    assert_eq!(arguments[1].lifetime(), Some(ServiceScope::Scoped));
    match arguments[1].unwrap_lifetime() {
        CallSite::Factory { factory, .. } => {
            let produced = factory();
            assert_eq!(produced.downcast_ref::<u64>(), Some(&1_700_000_000u64));
        }
        other => panic!("Expected factory call site, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_open_generic_contract_is_closed_on_demand() -> Result<(), CoreError> {
    let repository =
        TypeMetadata::open("Repository", ["T"]).with_constructor(ConstructorInfo::public(vec![
            ParameterInfo::single(ServiceId::generic("IValidator", vec!["T".into()])),
            ParameterInfo::single("IDatabase"),
        ]));
    let registry = registry_with(&["IDatabase"])
        .bind_open_generic("IRepository", repository, ServiceScope::Scoped)?
        .bind(ServiceId::generic("IValidator", vec!["User".into()]), simple("UserValidator"))?
        .build()?;
    let resolver = CallSiteResolver::new(&registry);

    let site = resolver.resolve(&ServiceId::generic("IRepository", vec!["User".into()]))?;
    assert_eq!(site.lifetime(), Some(ServiceScope::Scoped));
    assert_eq!(site.implementation().map(ToString::to_string).as_deref(), Some("Repository<User>"));

    // No validator registered for Order
    let failure = resolver
        .resolve(&ServiceId::generic("IRepository", vec!["Order".into()]))
        .unwrap_err();
    assert_eq!(
        failure,
        ResolutionFailure::UnresolvableParameter {
            contract: ServiceId::generic("IRepository", vec!["Order".into()]),
            implementation: ServiceId::generic("Repository", vec!["Order".into()]),
            parameter: ServiceId::generic("IValidator", vec!["Order".into()]),
        }
    );
    Ok(())
}

#[test]
fn test_open_generic_binds_parameters_by_name_not_position() -> Result<(), CoreError> {
    init_tracing();
    let map = TypeMetadata::open("Map", ["K", "V"]).with_constructor(ConstructorInfo::public(vec![
        ParameterInfo::single(ServiceId::generic("IKeyComparer", vec!["K".into()])),
    ]));
    let contract = ServiceId::generic("IMap", vec!["V".into(), "K".into()]);
    let registry = ServiceRegistryBuilder::new()
        .add(ServiceDescriptor::for_type(contract, map, ServiceScope::Transient))?
        .bind(ServiceId::generic("IKeyComparer", vec!["u32".into()]), simple("U32Comparer"))?
        .build()?;

    let request = ServiceId::generic("IMap", vec!["String".into(), "u32".into()]);
    let site = CallSiteResolver::new(&registry).resolve(&request)?;
    assert_eq!(site.implementation().map(ToString::to_string).as_deref(), Some("Map<u32, String>"));
    match site.unwrap_lifetime() {
        CallSite::ConstructWith { arguments, .. } => {
            assert_eq!(
                arguments[0].implementation().map(ToString::to_string).as_deref(),
                Some("U32Comparer")
            );
        }
        other => panic!("Expected constructor call site, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_open_generic_matches_nested_contract_argument() -> Result<(), CoreError> {
    let validator = ServiceId::generic("IValidator", vec!["T".into()]);
    let batch = TypeMetadata::open("BatchRepository", ["T"])
        .with_constructor(ConstructorInfo::public(vec![ParameterInfo::single(validator)]));
    let vec_of = |arg: &str| ServiceId::generic("Vec", vec![arg.into()]);
    let contract = ServiceId::generic("IRepository", vec![vec_of("T")]);
    let registry = ServiceRegistryBuilder::new()
        .add(ServiceDescriptor::for_type(contract, batch, ServiceScope::Scoped))?
        .bind(ServiceId::generic("IValidator", vec!["User".into()]), simple("UserValidator"))?
        .build()?;
    let resolver = CallSiteResolver::new(&registry);

    let users = ServiceId::generic("IRepository", vec![vec_of("User")]);
    let site = resolver.resolve(&users)?;
    assert_eq!(site.lifetime(), Some(ServiceScope::Scoped));
    assert_eq!(
        site.implementation().map(ToString::to_string).as_deref(),
        Some("BatchRepository<User>")
    );

    // A bare argument does not fit Vec<T>
    let single = ServiceId::generic("IRepository", vec!["User".into()]);
    assert_eq!(
        resolver.resolve(&single).unwrap_err(),
        ResolutionFailure::ServiceNotRegistered { contract: single }
    );
    Ok(())
}

#[test]
fn test_lifetime_validation_follows_configuration() -> Result<(), CoreError> {
    let registry = ServiceRegistryBuilder::new()
        .bind_with("IRequestContext", simple("RequestContext"), ServiceScope::Scoped)?
        .bind_with(
            "ICache",
            TypeMetadata::new("Cache").with_constructor(ctor(&["IRequestContext"])),
            ServiceScope::Singleton,
        )?
        .build()?;

    assert!(CallSiteResolver::new(&registry).resolve(&"ICache".into()).is_ok());

    let strict = CallSiteResolver::with_config(&registry, ResolverConfig::strict());
    let failure = strict.resolve(&"ICache".into()).unwrap_err();
    assert_eq!(failure.kind(), "captive_dependency");
    assert_eq!(failure.contract(), Some(&ServiceId::new("ICache")));
    Ok(())
}

#[test]
fn test_concurrent_resolution_shares_registry() -> Result<(), CoreError> {
    let registry = registry_with(&["ILogger", "IMailer"])
        .bind(
            "INotifier",
            TypeMetadata::new("Notifier").with_constructor(ctor(&["ILogger", "IMailer"])),
        )?
        .build()?;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| CallSiteResolver::new(&registry).resolve(&"INotifier".into())))
            .collect();
        for handle in handles {
            let site = handle
                .join()
                .expect("resolver thread panicked")
                .expect("resolution succeeds");
            assert_eq!(site.implementation(), Some(&ServiceId::new("Notifier")));
        }
    });
    Ok(())
}
