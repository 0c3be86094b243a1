use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::{Duration, Instant},
};

use declarative_prometheus::{
    failure::strategy::NoOp, Error, Recorder, Registerer,
};

declarative_prometheus::metric! {
    #[metric(Counter, help = "Counter that tracks how many calls were made")]
    struct NumberOfHits {
        method: &'static str,
        some_other_label: String,
    }
}

declarative_prometheus::metric! {
    #[metric(Histogram, help = "Histogram that tracks duration of the calls")]
    struct HitDuration {
        method: &'static str,
        some_other_label: f64,
    }
}

declarative_prometheus::metric! {
    #[metric(Gauge)]
    struct Temperature {
        room: &'static str,
        floor: u8,
    }
}

declarative_prometheus::metric! {
    #[metric(Counter, help = "Restarts of the service")]
    struct Restarts;
}

/// [`Registerer`] counting successful registrations.
#[derive(Default)]
struct Counting {
    registry: prometheus::Registry,
    registered: AtomicUsize,
}

impl Registerer for Counting {
    fn register(
        &self,
        collector: Box<dyn prometheus::core::Collector>,
    ) -> prometheus::Result<()> {
        self.registry.register(collector)?;
        self.registered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn recorder() -> (prometheus::Registry, Recorder) {
    let registry = prometheus::Registry::new();
    let recorder = Recorder::builder().with_registry(registry.clone()).build();
    (registry, recorder)
}

fn hello(recorder: &Recorder) {
    let _timer = recorder.start_histogram_timer(&HitDuration {
        method: "hello()",
        some_other_label: 123.123,
    });

    thread::sleep(Duration::from_millis(5));

    recorder.increment_counter(&NumberOfHits {
        method: "hello()",
        some_other_label: "someOtherLabelHello".into(),
    });
}

#[test]
fn records_counter_and_histogram() {
    let (registry, recorder) = recorder();

    hello(&recorder);
    hello(&recorder);

    let families = registry.gather();
    let names = families.iter().map(|mf| mf.get_name()).collect::<Vec<_>>();
    assert_eq!(names, ["HitDuration", "NumberOfHits"]);

    let duration = &families[0];
    assert_eq!(duration.get_help(), "Histogram that tracks duration of the calls");
    assert_eq!(duration.get_metric().len(), 1);
    let histogram = duration.get_metric()[0].get_histogram();
    assert_eq!(histogram.get_sample_count(), 2);
    assert!(histogram.get_sample_sum() >= 0.01);

    let hits = &families[1];
    assert_eq!(hits.get_metric().len(), 1);
    let metric = &hits.get_metric()[0];
    let labels = metric
        .get_label()
        .iter()
        .map(|l| (l.get_name(), l.get_value()))
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        [("method", "hello()"), ("some_other_label", "someOtherLabelHello")],
    );
    assert!((metric.get_counter().get_value() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn keeps_label_declaration_order() {
    let (registry, recorder) = recorder();

    recorder.set_gauge(&Temperature { room: "hall", floor: 2 }, 21.5);

    let families = registry.gather();
    let metric = &families[0].get_metric()[0];
    let value_of = |name: &str| {
        metric
            .get_label()
            .iter()
            .find(|l| l.get_name() == name)
            .map(|l| l.get_value().to_owned())
    };
    assert_eq!(value_of("room").as_deref(), Some("hall"));
    assert_eq!(value_of("floor").as_deref(), Some("2"));
    assert_eq!(
        recorder
            .declaration_of(&Temperature { room: "hall", floor: 2 })
            .unwrap()
            .labels
            .names()
            .collect::<Vec<_>>(),
        ["room", "floor"],
    );
    assert_eq!(families[0].get_help(), "Temperature");
}

#[test]
fn sets_gauge_and_reads_it_back() {
    let (_, recorder) = recorder();

    recorder.set_gauge(&Temperature { room: "kitchen", floor: 1 }, 42.0);

    let families = recorder.gather();
    assert_eq!(families.len(), 1);
    let value = families[0].get_metric()[0].get_gauge().get_value();
    assert!((value - 42.0).abs() < f64::EPSILON);
}

#[test]
fn records_metric_without_labels() {
    let (registry, recorder) = recorder();

    recorder.increment_counter_by(&Restarts, 3);
    recorder.increment_counter(&Restarts);

    let families = registry.gather();
    assert_eq!(families[0].get_name(), "Restarts");
    let metric = &families[0].get_metric()[0];
    assert!(metric.get_label().is_empty());
    assert!((metric.get_counter().get_value() - 4.0).abs() < f64::EPSILON);
}

#[test]
fn observes_timer_duration() {
    let (registry, recorder) = recorder();

    let timer = recorder.start_histogram_timer(&HitDuration {
        method: "slow()",
        some_other_label: 0.5,
    });
    let started = Instant::now();
    thread::sleep(Duration::from_millis(250));
    let elapsed = started.elapsed().as_secs_f64();
    let observed = timer.stop();

    assert!(observed >= 0.25, "{observed}");

    let families = registry.gather();
    let histogram = families[0].get_metric()[0].get_histogram();
    assert_eq!(histogram.get_sample_count(), 1);
    assert!(histogram.get_sample_sum() >= elapsed);
}

#[test]
fn observes_histogram_into_declared_buckets() {
    declarative_prometheus::metric! {
        #[metric(Histogram, help = "Payload sizes", buckets = &[10.0, 100.0])]
        struct PayloadSize {
            route: &'static str,
        }
    }

    let (registry, recorder) = recorder();

    for size in [5.0, 50.0, 500.0] {
        recorder.observe_histogram(&PayloadSize { route: "/" }, size);
    }

    let families = registry.gather();
    let histogram = families[0].get_metric()[0].get_histogram();
    let counts = histogram
        .get_bucket()
        .iter()
        .map(|b| (b.get_upper_bound(), b.get_cumulative_count()))
        .collect::<Vec<_>>();
    assert_eq!(counts, [(10.0, 1), (100.0, 2)]);
    assert_eq!(histogram.get_sample_count(), 3);
}

#[test]
fn registers_collector_once_under_contention() {
    const THREADS: usize = 32;

    let counting = Arc::new(Counting::default());
    let recorder = Recorder::builder()
        .with_registerer(counting.clone())
        .with_gatherer(Arc::new(counting.registry.clone()))
        .build();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles = (0..THREADS)
        .map(|i| {
            let (recorder, barrier) = (recorder.clone(), barrier.clone());
            thread::spawn(move || {
                barrier.wait();
                recorder.increment_counter(&NumberOfHits {
                    method: if i % 2 == 0 { "even" } else { "odd" },
                    some_other_label: "race".into(),
                });
            })
        })
        .collect::<Vec<_>>();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(counting.registered.load(Ordering::SeqCst), 1);
    let families = recorder.gather();
    let total = families[0]
        .get_metric()
        .iter()
        .map(|m| m.get_counter().get_value())
        .sum::<f64>();
    assert!((total - THREADS as f64).abs() < f64::EPSILON);
}

#[test]
fn fails_on_foreign_registration() {
    let (registry, recorder) = recorder();
    registry
        .register(Box::new(
            prometheus::IntCounter::new("Restarts", "registered directly")
                .unwrap(),
        ))
        .unwrap();

    let err = recorder.try_increment_counter(&Restarts).unwrap_err();

    assert!(matches!(err, Error::Registration { .. }), "{err}");
    assert!(recorder.storage().names().is_empty());
}

#[test]
#[should_panic(expected = "failed to record metric")]
fn panics_on_foreign_registration_by_default() {
    let (registry, recorder) = recorder();
    registry
        .register(Box::new(
            prometheus::IntCounter::new("Restarts", "registered directly")
                .unwrap(),
        ))
        .unwrap();

    recorder.increment_counter(&Restarts);
}

#[test]
fn skips_failed_recording_with_noop_strategy() {
    let registry = prometheus::Registry::new();
    registry
        .register(Box::new(
            prometheus::IntCounter::new("Restarts", "registered directly")
                .unwrap(),
        ))
        .unwrap();
    let recorder = Recorder::builder()
        .with_registry(registry)
        .with_failure_strategy(NoOp)
        .build();

    recorder.increment_counter(&Restarts);

    assert!(recorder.storage().names().is_empty());
}

#[test]
fn partitions_series_by_label_values() {
    declarative_prometheus::metric! {
        #[metric(Counter, help = "Handled calls")]
        struct Hits {
            #[serde(rename = "Method")]
            method: &'static str,
        }
    }

    declarative_prometheus::metric! {
        #[metric(Histogram, help = "Duration of handled calls")]
        struct Duration {
            #[serde(rename = "Method")]
            method: &'static str,
        }
    }

    let (registry, recorder) = recorder();

    for method in ["a", "a", "b"] {
        recorder.increment_counter(&Hits { method });
        recorder.observe_histogram(&Duration { method }, 0.1);
    }

    let families = registry.gather();
    assert_eq!(families.len(), 2);
    let hits = families.iter().find(|mf| mf.get_name() == "Hits").unwrap();
    let mut series = hits
        .get_metric()
        .iter()
        .map(|m| {
            let label = &m.get_label()[0];
            assert_eq!(label.get_name(), "Method");
            (label.get_value().to_owned(), m.get_counter().get_value())
        })
        .collect::<Vec<_>>();
    series.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(series, [("a".to_owned(), 2.0), ("b".to_owned(), 1.0)]);

    let duration =
        families.iter().find(|mf| mf.get_name() == "Duration").unwrap();
    assert_eq!(duration.get_metric().len(), 2);
}

#[test]
fn reports_labels_mismatch_for_shared_name() {
    declarative_prometheus::metric! {
        #[metric(Counter, help = "Served requests")]
        #[serde(rename = "Requests")]
        struct RequestsByRoute {
            route: &'static str,
            method: &'static str,
        }
    }

    declarative_prometheus::metric! {
        #[metric(Counter, help = "Served requests")]
        #[serde(rename = "Requests")]
        struct RequestsByMethod {
            method: &'static str,
            route: &'static str,
        }
    }

    let (_, recorder) = recorder();
    recorder
        .try_increment_counter(&RequestsByRoute { route: "/", method: "GET" })
        .unwrap();

    let err = recorder
        .try_increment_counter(&RequestsByMethod { method: "GET", route: "/" })
        .unwrap_err();

    match err {
        Error::LabelsMismatch { name, registered, declared } => {
            assert_eq!(name, "Requests");
            assert_eq!(registered, ["route", "method"]);
            assert_eq!(declared, ["method", "route"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn keeps_recording_after_registerer_panicked() {
    use std::{panic, sync::atomic::AtomicBool};

    /// [`Registerer`] panicking on its first registration.
    #[derive(Default)]
    struct PanicOnce {
        registry: prometheus::Registry,
        panicked: AtomicBool,
    }

    impl Registerer for PanicOnce {
        fn register(
            &self,
            collector: Box<dyn prometheus::core::Collector>,
        ) -> prometheus::Result<()> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("registerer failure");
            }
            self.registry.register(collector)
        }
    }

    let registerer = Arc::new(PanicOnce::default());
    let recorder = Recorder::builder()
        .with_registerer(registerer.clone())
        .with_gatherer(Arc::new(registerer.registry.clone()))
        .with_failure_strategy(NoOp)
        .build();

    let failed = {
        let recorder = recorder.clone();
        thread::spawn(move || recorder.increment_counter(&Restarts)).join()
    };
    assert!(failed.is_err(), "registerer should have panicked");

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        recorder.set_gauge(&Temperature { room: "attic", floor: 3 }, 1.0);
        recorder.increment_counter(&Restarts);
    }));

    assert!(res.is_ok(), "recording must survive a poisoned lock");
    let names = recorder
        .gather()
        .iter()
        .map(|mf| mf.get_name().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, ["Restarts", "Temperature"]);
}
