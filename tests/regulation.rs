use aft_core::{
    base::{ConsumerConfig, ProviderInfo, ProviderStatus},
    config::{ConfigEntity, FaultToleranceConfig},
    subscriber::{RpcError, RpcErrorType},
    utils::sleep_for_ms,
    FaultToleranceModule,
};
use std::sync::Arc;

const APP: &str = "order-app";

/// A consumer of one service, which reports the calls of each window to the module.
struct Cluster {
    module: FaultToleranceModule,
    consumer: Arc<ConsumerConfig>,
}

impl Cluster {
    fn new(config: FaultToleranceConfig, measure_interval_ms: u64) -> Self {
        let mut entity = ConfigEntity::new();
        entity.config.regulator.measure_interval_ms = measure_interval_ms;
        entity.config.apps.insert(APP.into(), config);
        Cluster {
            module: FaultToleranceModule::new(entity).unwrap(),
            consumer: Arc::new(ConsumerConfig::new(APP, "com.example.OrderService")),
        }
    }

    fn call(&self, provider: &Arc<ProviderInfo>, calls: usize, timeouts: usize) {
        let timeout = RpcError::new(RpcErrorType::ClientTimeout, "timeout after 3000ms");
        for i in 0..calls {
            let error = if i < timeouts { Some(&timeout) } else { None };
            self.module
                .subscriber()
                .on_response(&self.consumer, provider, error);
        }
    }

    /// measures every model and regulates the results on the current thread
    fn measure_and_regulate(&self) {
        let regulator = self.module.regulator();
        for model in regulator.models() {
            let result = regulator.measure(&model).unwrap();
            regulator.regulate(result);
        }
    }
}

fn provider(host: &str) -> Arc<ProviderInfo> {
    Arc::new(ProviderInfo::new(host, 12200, 100))
}

fn effective() -> FaultToleranceConfig {
    FaultToleranceConfig {
        time_window: 1,
        least_call_count: 1,
        regulation_effective: true,
        degrade_effective: true,
        ..Default::default()
    }
}

#[test]
fn degrade_then_recover() {
    // a long interval, windows are driven by the test
    let cluster = Cluster::new(effective(), 60_000);
    let bad = provider("10.0.0.1");
    let good = provider("10.0.0.2");
    cluster.call(&bad, 10, 8);
    cluster.call(&good, 70, 0);
    cluster.module.install().unwrap();
    assert_eq!(1, cluster.module.regulator().models().len());

    cluster.measure_and_regulate();
    assert_eq!(5, bad.weight());
    assert_eq!(ProviderStatus::Degraded, bad.status());
    assert_eq!(100, good.weight());
    assert_eq!(ProviderStatus::Available, good.status());

    for expected in [10, 20, 40, 80] {
        cluster.call(&bad, 10, 0);
        cluster.call(&good, 70, 0);
        cluster.measure_and_regulate();
        assert_eq!(expected, bad.weight());
        assert_eq!(ProviderStatus::Recovering, bad.status());
    }
    cluster.call(&bad, 10, 0);
    cluster.call(&good, 70, 0);
    cluster.measure_and_regulate();
    assert_eq!(100, bad.weight());
    assert_eq!(ProviderStatus::Available, bad.status());
    assert_eq!(100, good.weight());
}

#[test]
fn max_degrade_ip_count() {
    let cluster = Cluster::new(
        FaultToleranceConfig {
            degrade_max_ip_count: 1,
            ..effective()
        },
        60_000,
    );
    let bad1 = provider("10.0.0.1");
    let bad2 = provider("10.0.0.2");
    let good = provider("10.0.0.3");
    cluster.call(&bad1, 10, 8);
    cluster.call(&bad2, 10, 8);
    cluster.call(&good, 300, 0);
    cluster.module.install().unwrap();

    cluster.measure_and_regulate();
    let (degraded, other) = if bad1.weight() == 5 {
        (bad1, bad2)
    } else {
        (bad2, bad1)
    };
    assert_eq!(5, degraded.weight());
    assert_eq!(100, other.weight());
    assert_eq!(ProviderStatus::Available, other.status());

    // the degraded provider recovers and leaves the degraded list
    for _ in 0..5 {
        cluster.call(&degraded, 10, 0);
        cluster.call(&other, 10, 0);
        cluster.call(&good, 300, 0);
        cluster.measure_and_regulate();
    }
    assert_eq!(100, degraded.weight());
    assert_eq!(ProviderStatus::Available, degraded.status());

    cluster.call(&degraded, 10, 0);
    cluster.call(&other, 10, 8);
    cluster.call(&good, 300, 0);
    cluster.measure_and_regulate();
    assert_eq!(5, other.weight());
    assert_eq!(ProviderStatus::Degraded, other.status());
    assert_eq!(100, degraded.weight());
}

#[test]
fn removed_provider_frees_its_place() {
    let cluster = Cluster::new(
        FaultToleranceConfig {
            degrade_max_ip_count: 1,
            ..effective()
        },
        60_000,
    );
    let gone = provider("10.0.0.1");
    let good = provider("10.0.0.2");
    cluster.call(&gone, 10, 8);
    cluster.call(&good, 70, 0);
    cluster.module.install().unwrap();
    cluster.measure_and_regulate();
    assert_eq!(5, gone.weight());

    // the provider leaves, its stat is evicted once it has been idle long enough
    drop(gone);
    for _ in 0..10 {
        cluster.call(&good, 70, 0);
        cluster.measure_and_regulate();
    }
    assert_eq!(1, cluster.module.stat_factory().len());

    // the removal reaches the regulator asynchronously
    let bad = provider("10.0.0.3");
    let mut degraded = false;
    for _ in 0..200 {
        cluster.call(&bad, 10, 8);
        cluster.call(&good, 70, 0);
        cluster.measure_and_regulate();
        if bad.status() == ProviderStatus::Degraded {
            degraded = true;
            break;
        }
        sleep_for_ms(10);
    }
    assert!(degraded);
    assert_eq!(5, bad.weight());
    assert_eq!(100, good.weight());
}

#[test]
fn log_only_when_degrade_not_effective() {
    let cluster = Cluster::new(
        FaultToleranceConfig {
            degrade_effective: false,
            ..effective()
        },
        60_000,
    );
    let bad = provider("10.0.0.1");
    let good = provider("10.0.0.2");
    cluster.call(&bad, 10, 8);
    cluster.call(&good, 70, 0);
    cluster.module.install().unwrap();
    cluster.measure_and_regulate();
    assert_eq!(100, bad.weight());
    assert_eq!(ProviderStatus::Available, bad.status());
}

#[test]
fn log_only_when_regulation_not_effective() {
    let cluster = Cluster::new(
        FaultToleranceConfig {
            regulation_effective: false,
            ..effective()
        },
        60_000,
    );
    let bad = provider("10.0.0.1");
    let good = provider("10.0.0.2");
    // recorded straight into the stats, the subscriber is off
    let stats = cluster.module.stat_factory();
    for (provider, calls, exceptions) in [(&bad, 10, 8), (&good, 70, 0)] {
        let stat = stats.get_invocation_stat(&cluster.consumer, provider);
        for i in 0..calls {
            stat.invoke();
            if i < exceptions {
                stat.catch_exception();
            }
        }
    }
    cluster.module.install().unwrap();
    cluster.measure_and_regulate();
    assert_eq!(100, bad.weight());
    assert_eq!(ProviderStatus::Available, bad.status());
}

#[test]
fn warming_up_is_never_touched() {
    let cluster = Cluster::new(effective(), 60_000);
    let bad = Arc::new(
        ProviderInfo::new("10.0.0.1", 12200, 100).with_status(ProviderStatus::WarmingUp),
    );
    let good = provider("10.0.0.2");
    cluster.call(&bad, 10, 8);
    cluster.call(&good, 70, 0);
    cluster.module.install().unwrap();
    cluster.measure_and_regulate();
    assert_eq!(100, bad.weight());
    assert_eq!(ProviderStatus::WarmingUp, bad.status());
}

#[test]
fn degrade_floor() {
    let cluster = Cluster::new(
        FaultToleranceConfig {
            degrade_least_weight: 30,
            ..effective()
        },
        60_000,
    );
    let bad = provider("10.0.0.1");
    let good = provider("10.0.0.2");
    cluster.call(&bad, 10, 8);
    cluster.call(&good, 70, 0);
    cluster.module.install().unwrap();
    cluster.measure_and_regulate();
    assert_eq!(30, bad.weight());
    assert_eq!(ProviderStatus::Degraded, bad.status());
}

#[test]
fn disabled_module_records_nothing() {
    let cluster = Cluster::new(
        FaultToleranceConfig {
            regulation_effective: false,
            ..effective()
        },
        60_000,
    );
    assert!(!cluster.module.is_enable());
    cluster.module.install().unwrap();
    cluster.call(&provider("10.0.0.1"), 10, 8);
    assert!(cluster.module.stat_factory().is_empty());
    assert!(cluster.module.regulator().models().is_empty());
}

#[test]
fn regulate_in_background() {
    let cluster = Cluster::new(effective(), 20);
    cluster.module.install().unwrap();
    let bad = provider("10.0.0.1");
    let good = provider("10.0.0.2");
    let mut degraded = false;
    for _ in 0..250 {
        cluster.call(&bad, 10, 8);
        cluster.call(&good, 70, 0);
        sleep_for_ms(20);
        if bad.weight() < 100 {
            degraded = true;
            break;
        }
    }
    assert!(degraded);
    // the status is stored before the weight
    assert_eq!(ProviderStatus::Degraded, bad.status());
    assert!(bad.weight() <= 5);
    assert!(cluster.module.regulator().is_started());
    assert!(cluster.module.regulator().measure_counter() > 0);

    cluster.module.uninstall();
    assert!(!cluster.module.regulator().is_started());
}
