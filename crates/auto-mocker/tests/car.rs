use auto_mocker::*;
use std::sync::Arc;

pub trait CarService: Send + Sync {
    fn speed(&self) -> u32;
    fn model(&self) -> String;
    fn honk(&self, times: u32) -> Vec<String>;
}

substitute! {
    pub struct CarServiceSubstitute for dyn CarService {
        fn speed(&self) -> u32;
        fn model(&self) -> String;
        fn honk(&self, times: u32) -> Vec<String>;
    }
}

pub struct RealCarService;

impl CarService for RealCarService {
    fn speed(&self) -> u32 {
        120
    }

    fn model(&self) -> String {
        "roadster".into()
    }

    fn honk(&self, times: u32) -> Vec<String> {
        vec!["honk".into(); times as usize]
    }
}

pub struct Car {
    service: Arc<dyn CarService>,
}

impl Car {
    fn describe(&self) -> String {
        format!("{} at {}", self.service.model(), self.service.speed())
    }
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.interface::<dyn CarService>();
    catalog
        .class::<RealCarService>()
        .constructor(|()| RealCarService)
        .implements::<dyn CarService, _>(|service| service as Arc<dyn CarService>);
    catalog
        .class::<Car>()
        .constructor(|(service,): (Arc<dyn CarService>,)| Car { service });
    catalog
}

#[test]
fn test_car_gets_substitute_with_defaults() {
    let mut mocker = Mocker::with_catalog(catalog());

    let car: Arc<Car> = mocker.resolve().unwrap();

    assert_eq!(car.service.speed(), 0);
    assert_eq!(car.service.model(), "");
    assert!(car.service.honk(3).is_empty());

    let service = mocker.get_substitute::<dyn CarService>().unwrap();
    assert!(Arc::ptr_eq(&car.service, &service.object()));
    assert!(!service.is_strict());
    assert_eq!(service.received_calls(), vec!["speed", "model", "honk"]);
}

#[test]
fn test_car_uses_configured_substitute() {
    let mut mocker = Mocker::with_catalog(catalog());
    let service = mocker.get_substitute::<dyn CarService>().unwrap();
    service.setup("speed").returns(88u32);
    service.setup("model").returns(String::from("delorean"));

    let car: Arc<Car> = mocker.resolve().unwrap();

    assert_eq!(car.describe(), "delorean at 88");
    assert_eq!(service.received("speed"), 1);
}

#[test]
fn test_car_is_cached_per_session() {
    let mut mocker = Mocker::with_catalog(catalog());

    let first: Arc<Car> = mocker.resolve().unwrap();
    let second: Arc<Car> = mocker.resolve().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.service, &second.service));
}

#[test]
fn test_contract_resolves_to_substitute() {
    let mut mocker = Mocker::with_catalog(catalog());
    let service = mocker.get_substitute::<dyn CarService>().unwrap();
    service.setup("model").returns(String::from("substituted"));

    let resolved: Arc<dyn CarService> = mocker.resolve().unwrap();

    assert_eq!(resolved.model(), "substituted");
    assert!(Arc::ptr_eq(&resolved, &service.object()));
}

#[test]
#[should_panic(expected = "no setup configured")]
fn test_strict_car_panics_on_unconfigured_call() {
    let mut mocker = Mocker::new(catalog(), |builder| {
        builder.strict(true);
    });

    let car: Arc<Car> = mocker.resolve().unwrap();

    car.service.speed();
}

#[test]
fn test_strict_car_answers_configured_call() {
    let mut mocker = Mocker::build(catalog()).finalize();
    mocker.set_strict_mode(true);
    let service = mocker.get_substitute::<dyn CarService>().unwrap();
    service
        .setup("honk")
        .returns_with::<(u32,), _, _>(|(times,)| vec!["beep".to_string(); *times as usize]);

    let car: Arc<Car> = mocker.resolve().unwrap();

    assert!(service.is_strict());
    assert_eq!(car.service.honk(2), vec!["beep", "beep"]);
    assert_eq!(service.received_matching::<(u32,), _>("honk", |(times,)| *times == 2), 1);
}
