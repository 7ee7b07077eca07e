use auto_mocker::*;
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
    fn zone(&self, offset: i32) -> String;
}

substitute! {
    pub struct ClockSubstitute for dyn Clock {
        fn now(&self) -> u64;
        fn zone(&self, offset: i32) -> String;
    }
}

struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        1_700_000_000
    }

    fn zone(&self, offset: i32) -> String {
        format!("UTC{:+}", offset)
    }
}

pub trait Greeter: Send + Sync {
    fn greet(&self, name: String) -> String;
    fn farewell(&self) -> String;
}

substitute! {
    pub struct GreeterSubstitute for dyn Greeter {
        fn greet(&self, name: String) -> String;
        fn farewell(&self) -> String = "bye".to_string();
    }
}

struct PoliteGreeter {
    clock: Arc<dyn Clock>,
}

impl Greeter for PoliteGreeter {
    fn greet(&self, name: String) -> String {
        format!("hello {} at {}", name, self.clock.now())
    }

    fn farewell(&self) -> String {
        "goodbye".into()
    }
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.interface::<dyn Clock>().overridable::<dyn Greeter>();
    catalog
        .class::<SystemClock>()
        .constructor(|()| SystemClock)
        .implements::<dyn Clock, _>(|clock| clock as Arc<dyn Clock>);
    catalog
        .class::<PoliteGreeter>()
        .constructor(|(clock,): (Arc<dyn Clock>,)| PoliteGreeter { clock })
        .implements::<dyn Greeter, _>(|greeter| greeter as Arc<dyn Greeter>);
    catalog
}

#[test]
fn test_substitute_is_cached_per_session() {
    let mut mocker = Mocker::with_catalog(catalog());

    let first = mocker.get_substitute::<dyn Clock>().unwrap();
    let second = mocker.get_substitute::<dyn Clock>().unwrap();

    assert!(first.ptr_eq(&second));
    assert!(Arc::ptr_eq(&first.object(), &second.object()));

    let other = Mocker::with_catalog(catalog()).get_substitute::<dyn Clock>().unwrap();
    assert!(!first.ptr_eq(&other));
}

#[test]
fn test_added_substitute_is_returned() {
    let mut mocker = Mocker::with_catalog(catalog());
    mocker.get_substitute::<dyn Clock>().unwrap();

    let seeded = Substitute::<dyn Clock>::new();
    seeded.setup("now").returns(5u64);
    mocker.add_substitute(seeded.clone(), true).unwrap();

    let fetched = mocker.get_substitute::<dyn Clock>().unwrap();
    assert!(fetched.ptr_eq(&seeded));
    assert_eq!(fetched.object().now(), 5);
}

#[test]
fn test_add_without_overwrite_is_rejected() {
    let mut mocker = Mocker::with_catalog(catalog());
    mocker.add_substitute(Substitute::<dyn Clock>::new(), false).unwrap();

    let err = mocker
        .add_substitute(Substitute::<dyn Clock>::new(), false)
        .err()
        .unwrap();

    assert!(matches!(err, Error::DuplicateRegistration(_)));
    assert!(err.to_string().starts_with("duplicate registration"));
}

#[test]
fn test_removed_substitute_is_recreated() {
    let mut mocker = Mocker::with_catalog(catalog());
    let first = mocker.get_substitute::<dyn Clock>().unwrap();

    assert!(mocker.remove_substitute::<dyn Clock>());
    assert!(!mocker.contains_substitute::<dyn Clock>());
    assert!(!mocker.remove_substitute::<dyn Clock>());

    let second = mocker.get_substitute::<dyn Clock>().unwrap();
    assert!(!first.ptr_eq(&second));

    mocker.clear_substitutes();
    assert!(!mocker.contains_substitute::<dyn Clock>());
}

#[test]
fn test_configure_substitute() {
    let mut mocker = Mocker::with_catalog(catalog());

    let clock = mocker
        .configure_substitute::<dyn Clock, _>(|clock| clock.setup("now").returns(10u64), false)
        .unwrap();
    assert_eq!(clock.object().now(), 10);

    mocker
        .configure_substitute::<dyn Clock, _>(|clock| clock.setup("zone").returns(String::from("CET")), false)
        .unwrap();
    assert_eq!(clock.object().now(), 10);
    assert_eq!(clock.received("now"), 2);

    mocker
        .configure_substitute::<dyn Clock, _>(|_| {}, true)
        .unwrap();
    assert_eq!(clock.received("now"), 0);
    assert_eq!(clock.object().now(), 0);
    assert_eq!(clock.object().zone(1), "");
}

#[test]
fn test_latest_matching_setup_wins() {
    let clock = Substitute::<dyn Clock>::new();
    clock.setup("zone").returns(String::from("any"));
    clock
        .setup("zone")
        .matching::<(i32,), _>(|(offset,)| *offset < 0)
        .returns(String::from("west"));

    assert_eq!(clock.object().zone(-5), "west");
    assert_eq!(clock.object().zone(3), "any");

    clock.setup("zone").returns(String::from("latest"));
    assert_eq!(clock.object().zone(-5), "latest");
    assert_eq!(clock.received_matching::<(i32,), _>("zone", |(offset,)| *offset == -5), 2);
}

#[test]
fn test_answer_can_use_arguments() {
    let clock = Substitute::<dyn Clock>::new();
    clock
        .setup("zone")
        .returns_with::<(i32,), _, _>(|(offset,)| format!("GMT{}", offset));

    assert_eq!(clock.object().zone(2), "GMT2");
}

#[test]
#[should_panic(expected = "clock stopped")]
fn test_configured_panic() {
    let clock = Substitute::<dyn Clock>::new();
    clock.setup("now").panics("clock stopped");

    clock.object().now();
}

#[test]
#[should_panic(expected = "does not return")]
fn test_mistyped_setup_panics() {
    let clock = Substitute::<dyn Clock>::new();
    clock.setup("now").returns("soon");

    clock.object().now();
}

#[test]
fn test_loose_fallbacks() {
    let greeter = Substitute::<dyn Greeter>::new();

    assert_eq!(greeter.object().greet("ann".into()), "");
    assert_eq!(greeter.object().farewell(), "bye");
    assert!(!greeter.is_partial());
}

#[test]
fn test_overridable_contract_delegates_to_real_implementation() {
    let mut mocker = Mocker::with_catalog(catalog());
    mocker
        .get_substitute::<dyn Clock>()
        .unwrap()
        .setup("now")
        .returns(42u64);

    let greeter = mocker.get_substitute::<dyn Greeter>().unwrap();
    greeter.setup("farewell").returns(String::from("later"));

    assert!(greeter.is_partial());
    assert_eq!(greeter.object().greet("ann".into()), "hello ann at 42");
    assert_eq!(greeter.object().farewell(), "later");
    assert_eq!(greeter.received_calls(), vec!["greet", "farewell"]);
}

#[test]
#[should_panic(expected = "no setup configured")]
fn test_strict_overridable_contract_has_no_base() {
    let mut mocker = Mocker::new(catalog(), |builder| {
        builder.strict(true);
    });

    let greeter = mocker.get_substitute::<dyn Greeter>().unwrap();
    assert!(!greeter.is_partial());

    greeter.object().farewell();
}

#[test]
fn test_partial_substitute_over_explicit_base() {
    let greeter = Substitute::<dyn Greeter>::partial(Arc::new(PoliteGreeter {
        clock: Arc::new(SystemClock),
    }));
    greeter
        .setup("greet")
        .matching::<(String,), _>(|(name,)| name == "bob")
        .returns(String::from("hey bob"));

    assert_eq!(greeter.object().greet("bob".into()), "hey bob");
    assert_eq!(greeter.object().greet("ann".into()), "hello ann at 1700000000");
}

#[test]
fn test_strictness_is_fixed_at_creation() {
    let mut mocker = Mocker::with_catalog(catalog());
    let loose = mocker.get_substitute::<dyn Clock>().unwrap();

    mocker.set_strict_mode(true);
    assert!(mocker.strict_mode());
    assert!(!loose.is_strict());
    assert_eq!(loose.object().now(), 0);

    mocker.remove_substitute::<dyn Clock>();
    assert!(mocker.get_substitute::<dyn Clock>().unwrap().is_strict());
}

#[test]
fn test_substitute_for_unknown_contract_is_unresolved() {
    pub trait Radio: Send + Sync {
        fn station(&self) -> String;
    }

    substitute! {
        pub struct RadioSubstitute for dyn Radio {
            fn station(&self) -> String;
        }
    }

    let mut mocker = Mocker::with_catalog(catalog());

    assert!(matches!(
        mocker.get_substitute::<dyn Radio>(),
        Err(Error::UnresolvedType(_))
    ));

    let radio = Substitute::<dyn Radio>::new();
    mocker.add_substitute(radio.clone(), false).unwrap();
    assert!(mocker.get_substitute::<dyn Radio>().unwrap().ptr_eq(&radio));
}
