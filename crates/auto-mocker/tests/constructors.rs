use auto_mocker::*;
use std::sync::Arc;

#[derive(Debug, PartialEq)]
enum Built {
    Empty,
    Count(u32),
    CountAndName(u32, String),
    NameAndCount(String, u32),
    Flag(bool),
    Internal(u32, u32),
}

struct Report(Built);

struct Missing;

fn mocker(configure: impl FnOnce(&mut ClassBuilder<'_, Report>)) -> Mocker {
    let mut catalog = Catalog::new();
    configure(&mut catalog.class::<Report>());
    Mocker::with_catalog(catalog)
}

#[test]
fn test_richest_constructor_wins() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|()| Report(Built::Empty))
            .constructor(|(count, name): (u32, String)| Report(Built::CountAndName(count, name)))
            .constructor(|(count,): (u32,)| Report(Built::Count(count)));
    });

    let report: Arc<Report> = mocker.resolve().unwrap();

    assert_eq!(report.0, Built::CountAndName(0, String::new()));
}

#[test]
fn test_unviable_constructor_is_skipped() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|(_, count): (Arc<Missing>, u32)| Report(Built::Count(count)))
            .constructor(|(flag,): (bool,)| Report(Built::Flag(flag)));
    });

    let report: Arc<Report> = mocker.resolve().unwrap();

    assert_eq!(report.0, Built::Flag(false));
}

#[test]
fn test_equal_arity_is_ambiguous() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|(count,): (u32,)| Report(Built::Count(count)))
            .constructor(|(flag,): (bool,)| Report(Built::Flag(flag)));
    });

    let err = mocker.resolve::<Arc<Report>>().err().unwrap();

    assert!(matches!(
        err,
        Error::AmbiguousConstructor {
            arity: 1,
            count: 2,
            ..
        }
    ));
    assert!(err.to_string().contains("2 constructors take 1 parameters"));
}

#[test]
fn test_subset_parameter_set_loses() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|(count, _): (u32, u32)| Report(Built::Count(count)))
            .constructor(|(count, name): (u32, String)| Report(Built::CountAndName(count, name)));
    });

    let report: Arc<Report> = mocker.resolve().unwrap();

    assert_eq!(report.0, Built::CountAndName(0, String::new()));
}

#[test]
fn test_identical_parameter_sets_are_ambiguous() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|(name, count): (String, u32)| Report(Built::NameAndCount(name, count)))
            .constructor(|(count, name): (u32, String)| Report(Built::CountAndName(count, name)));
    });

    assert!(matches!(
        mocker.resolve::<Arc<Report>>(),
        Err(Error::AmbiguousConstructor {
            arity: 2,
            count: 2,
            ..
        })
    ));
}

#[test]
fn test_non_public_constructor_is_used_when_needed() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|(_,): (Arc<Missing>,)| Report(Built::Empty))
            .internal_constructor(|(a, b): (u32, u32)| Report(Built::Internal(a, b)));
    });

    let report: Arc<Report> = mocker.resolve().unwrap();

    assert_eq!(report.0, Built::Internal(0, 0));
}

#[test]
fn test_viable_public_constructor_is_preferred() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|()| Report(Built::Empty))
            .internal_constructor(|(a, b): (u32, u32)| Report(Built::Internal(a, b)));
    });

    let report: Arc<Report> = mocker.resolve().unwrap();

    assert_eq!(report.0, Built::Empty);
}

#[test]
fn test_non_public_constructors_requested_up_front() {
    let mut catalog = Catalog::new();
    catalog
        .class::<Report>()
        .constructor(|()| Report(Built::Empty))
        .internal_constructor(|(a, b): (u32, u32)| Report(Built::Internal(a, b)));
    let mut mocker = Mocker::new(catalog, |builder| {
        builder.include_non_public(true);
    });

    let report: Arc<Report> = mocker.resolve().unwrap();

    assert_eq!(report.0, Built::Internal(0, 0));
}

#[test]
fn test_strict_mode_does_not_escalate() {
    let mut catalog = Catalog::new();
    catalog
        .class::<Report>()
        .internal_constructor(|()| Report(Built::Empty));
    let mut mocker = Mocker::new(catalog, |builder| {
        builder.strict(true);
    });

    assert!(matches!(
        mocker.resolve::<Arc<Report>>(),
        Err(Error::NoMatchingConstructor(_))
    ));
}

#[test]
fn test_first_parameter_failure_is_reported() {
    let mut mocker = mocker(|class| {
        class.constructor(|(_,): (Arc<Missing>,)| Report(Built::Empty));
    });

    assert!(matches!(
        mocker.resolve::<Arc<Report>>(),
        Err(Error::UnresolvedType(_))
    ));
}

#[test]
fn test_class_without_constructors() {
    let mut mocker = mocker(|_| {});

    assert!(matches!(
        mocker.resolve::<Arc<Report>>(),
        Err(Error::NoMatchingConstructor(_))
    ));
}

#[test]
fn test_explicit_arguments_select_by_type() {
    let mut mocker = mocker(|class| {
        class
            .constructor(|(count, name): (u32, String)| Report(Built::CountAndName(count, name)))
            .constructor(|(name, count): (String, u32)| Report(Built::NameAndCount(name, count)))
            .constructor(|(count,): (u32,)| Report(Built::Count(count)));
    });

    let report: Arc<Report> = mocker
        .resolve_with_args(Args::new().with(String::from("odometer")).with(42u32))
        .unwrap();
    assert_eq!(report.0, Built::NameAndCount("odometer".into(), 42));

    let first: Arc<Report> = mocker.resolve_with_args(Args::new().with(1u32)).unwrap();
    let second: Arc<Report> = mocker.resolve_with_args(Args::new().with(1u32)).unwrap();
    assert_eq!(first.0, Built::Count(1));
    assert!(!Arc::ptr_eq(&first, &second));

    assert!(matches!(
        mocker.resolve_with_args::<Arc<Report>>(Args::new().with(1u64)),
        Err(Error::NoMatchingConstructor(_))
    ));
}
