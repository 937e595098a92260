use super::*;
use crate::{
    config::{RegulatorConfig, REGULATION_QUEUE_SIZE, REGULATION_WORKER_COUNT},
    logging,
    measure::{MeasureModel, MeasureResult, MeasureState, MeasureStrategy},
    stat::{InvocationStat, ListenerId, StatEvent},
    Error,
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError},
    Arc, Mutex, RwLock, Weak,
};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// `Strategies` are the strategies a regulator resolved on `init()`.
pub(crate) struct Strategies {
    pub(crate) measure: Arc<dyn MeasureStrategy>,
    pub(crate) regulation: Arc<dyn RegulationStrategy>,
    pub(crate) degrade: Arc<dyn DegradeStrategy>,
    pub(crate) recover: Arc<dyn RecoverStrategy>,
}

impl Strategies {
    /// `regulate` applies the regulation to each detail of the result,
    /// a failure or a panic on one detail does not stop the others.
    pub(crate) fn regulate(&self, mut result: MeasureResult) {
        for detail in result.details_mut() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.regulate_detail(detail))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => logging::error!(
                    "[TimeWindowRegulator] Error when regulating {}, app: {}, error: {:?}",
                    detail.dimension,
                    detail.app_name(),
                    err
                ),
                Err(_) => logging::error!(
                    "[TimeWindowRegulator] Panicked when regulating {}, app: {}",
                    detail.dimension,
                    detail.app_name()
                ),
            }
        }
    }

    fn regulate_detail(&self, detail: &mut MeasureResultDetail) -> Result<()> {
        if self.regulation.is_degrade_effective(detail) {
            detail.log_only = false;
            if detail.dimension.provider().is_none() {
                // the provider is gone, it keeps no place in the degrade list
                self.regulation.remove_from_degrade_list(detail);
                return Ok(());
            }
            match detail.measure_state {
                MeasureState::Abnormal => {
                    if self.regulation.is_reach_max_degrade_ip_count(detail) {
                        logging::info!(
                            "[TimeWindowRegulator] {} is abnormal but the service reached its max degrade ip count, app: {}",
                            detail.dimension,
                            detail.app_name()
                        );
                    } else {
                        self.degrade.degrade(detail)?;
                    }
                }
                MeasureState::Healthy => {
                    if self.regulation.is_exist_in_the_degrade_list(detail) {
                        self.recover.recover(detail)?;
                        if detail.recovered_origin_weight {
                            self.regulation.remove_from_degrade_list(detail);
                        }
                    }
                }
                MeasureState::Ignore => {}
            }
        } else {
            detail.log_only = true;
            if detail.measure_state == MeasureState::Abnormal {
                self.degrade.degrade(detail)?;
            }
        }
        Ok(())
    }
}

/// `TimeWindowRegulator` measures the models every time their time window elapses,
/// and hands the results to a small pool of regulation workers.
///
/// The measurement is driven by a single scheduler thread ticking once per measure interval,
/// a model is measured on the ticks which are a multiple of the time window of its application.
/// Models are built from the membership events of the stat factory,
/// which are consumed by a thread of the regulator.
pub struct TimeWindowRegulator {
    context: StrategyContext,
    registry: Arc<StrategyRegistry>,
    regulator_config: RegulatorConfig,
    strategies: RwLock<Option<Arc<Strategies>>>,
    models: RwLock<Vec<Arc<MeasureModel>>>,
    measure_counter: AtomicU64,
    measure_started: AtomicBool,
    // the stop signal and the handle of the scheduler thread
    scheduler: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
    pool: Mutex<Option<SyncSender<MeasureResult>>>,
    listener: Mutex<Option<ListenerId>>,
}

impl TimeWindowRegulator {
    pub fn new(
        context: StrategyContext,
        registry: Arc<StrategyRegistry>,
        regulator_config: RegulatorConfig,
    ) -> Self {
        TimeWindowRegulator {
            context,
            registry,
            regulator_config,
            strategies: RwLock::new(None),
            models: RwLock::new(Vec::new()),
            measure_counter: AtomicU64::new(0),
            measure_started: AtomicBool::new(false),
            scheduler: Mutex::new(None),
            pool: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    /// `init` resolves the strategies by their aliases and starts listening to the stat factory.
    /// It fails on an unknown alias, and does nothing if the regulator is already initialized.
    pub fn init(self: &Arc<Self>) -> Result<()> {
        let resolved = {
            let mut strategies = self.strategies.write().unwrap();
            if strategies.is_some() {
                return Ok(());
            }
            let config = &self.regulator_config;
            let ctx = &self.context;
            let resolved = Arc::new(Strategies {
                measure: self
                    .registry
                    .new_measure_strategy(&config.measure_strategy, ctx)?,
                regulation: self
                    .registry
                    .new_regulation_strategy(&config.regulation_strategy, ctx)?,
                degrade: self
                    .registry
                    .new_degrade_strategy(&config.degrade_strategy, ctx)?,
                recover: self
                    .registry
                    .new_recover_strategy(&config.recover_strategy, ctx)?,
            });
            *strategies = Some(Arc::clone(&resolved));
            resolved
        };
        *self.pool.lock().unwrap() = Some(start_regulation_pool(&resolved));

        let (id, events) = self.context.stats.subscribe();
        *self.listener.lock().unwrap() = Some(id);
        let regulator = Arc::downgrade(self);
        thread::spawn(move || handle_stat_events(regulator, events));
        // stats observed before the regulator was initialized
        for stat in self.context.stats.all_invocation_stats() {
            self.on_stat_added(stat);
        }
        logging::info!(
            "[TimeWindowRegulator] Regulator is initialized with the strategies: measure {}, regulation {}, degrade {}, recover {}",
            self.regulator_config.measure_strategy,
            self.regulator_config.regulation_strategy,
            self.regulator_config.degrade_strategy,
            self.regulator_config.recover_strategy
        );
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.strategies.read().unwrap().is_some()
    }

    /// `start_regulate` starts the measurement scheduler, if it is not running yet.
    /// A regulator which is not initialized is never started.
    pub fn start_regulate(self: &Arc<Self>) {
        let mut scheduler = self.scheduler.lock().unwrap();
        if !self.is_initialized() {
            return;
        }
        if self
            .measure_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let interval = Duration::from_millis(std::cmp::max(
            self.regulator_config.measure_interval_ms,
            1,
        ));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let regulator = Arc::downgrade(self);
        let handle = thread::spawn(move || {
            let mut next_tick = Instant::now() + interval;
            loop {
                match stop_rx.recv_timeout(next_tick.saturating_duration_since(Instant::now())) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                next_tick += interval;
                match regulator.upgrade() {
                    Some(regulator) => {
                        let ticked = panic::catch_unwind(AssertUnwindSafe(|| regulator.do_measure()));
                        if ticked.is_err() {
                            logging::error!("[TimeWindowRegulator] Panicked in a measurement tick");
                        }
                    }
                    None => break,
                }
            }
        });
        *scheduler = Some((stop_tx, handle));
        logging::info!(
            "[TimeWindowRegulator] Start to regulate, measure interval: {}ms",
            interval.as_millis()
        );
    }

    /// `stop_regulate` stops the measurement scheduler. A running measurement is completed first.
    pub fn stop_regulate(&self) {
        let mut scheduler = self.scheduler.lock().unwrap();
        if self
            .measure_started
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if let Some((stop_tx, handle)) = scheduler.take() {
            drop(stop_tx);
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                logging::error!("[TimeWindowRegulator] The measurement scheduler panicked");
            }
        }
        logging::info!("[TimeWindowRegulator] Stop regulating");
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.measure_started.load(Ordering::SeqCst)
    }

    /// `destroy` stops the regulator and releases everything it holds.
    /// Regulations already queued are still carried out by the workers.
    pub fn destroy(&self) {
        // uninitialized first, so that no model is added and no scheduler is started afterwards
        *self.strategies.write().unwrap() = None;
        self.stop_regulate();
        if let Some(id) = self.listener.lock().unwrap().take() {
            self.context.stats.unsubscribe(id);
        }
        self.models.write().unwrap().clear();
        self.measure_counter.store(0, Ordering::SeqCst);
        *self.pool.lock().unwrap() = None;
        logging::info!("[TimeWindowRegulator] Regulator is destroyed");
    }

    pub fn models(&self) -> Vec<Arc<MeasureModel>> {
        self.models.read().unwrap().clone()
    }

    #[inline]
    pub fn measure_counter(&self) -> u64 {
        self.measure_counter.load(Ordering::SeqCst)
    }

    /// `measure` measures the model with the resolved measure strategy.
    pub fn measure(&self, model: &Arc<MeasureModel>) -> Result<MeasureResult> {
        match self.strategies() {
            Some(strategies) => strategies.measure.measure(model),
            None => Err(Error::msg("The regulator is not initialized")),
        }
    }

    /// `regulate` carries out the regulation of the result on the calling thread.
    pub fn regulate(&self, result: MeasureResult) {
        if let Some(strategies) = self.strategies() {
            strategies.regulate(result);
        }
    }

    /// `do_measure` is one tick of the measurement scheduler.
    pub(crate) fn do_measure(&self) {
        let tick = self.measure_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let strategies = match self.strategies() {
            Some(strategies) => strategies,
            None => return,
        };
        for model in self.models() {
            let time_window = self.context.config.time_window(model.app_name());
            if time_window == 0 || tick % time_window != 0 {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| strategies.measure.measure(&model))) {
                Ok(Ok(result)) => self.submit(result),
                Ok(Err(err)) => logging::error!(
                    "[TimeWindowRegulator] Error when measuring, app: {}, service: {}, error: {:?}",
                    model.app_name(),
                    model.service(),
                    err
                ),
                Err(_) => logging::error!(
                    "[TimeWindowRegulator] Panicked when measuring, app: {}, service: {}",
                    model.app_name(),
                    model.service()
                ),
            }
        }
    }

    fn submit(&self, result: MeasureResult) {
        let sender = match self.pool.lock().unwrap().as_ref() {
            Some(sender) => sender.clone(),
            None => return,
        };
        match sender.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(result)) => {
                logging::debug!(
                    "[TimeWindowRegulator] Regulation queue is full, the measure result of app {}, service {} is dropped",
                    result.model().app_name(),
                    result.model().service()
                );
                logging::FREQUENT_ERROR_ONCE.call_once(|| {
                    logging::warn!(
                        "[TimeWindowRegulator] Regulation queue is full, measure results are dropped"
                    );
                });
            }
            Err(TrySendError::Disconnected(_)) => {
                logging::debug!("[TimeWindowRegulator] Regulation pool is closed");
            }
        }
    }

    fn strategies(&self) -> Option<Arc<Strategies>> {
        self.strategies.read().unwrap().clone()
    }

    fn on_stat_added(self: &Arc<Self>, stat: Arc<InvocationStat>) {
        let strategies = match self.strategies() {
            Some(strategies) => strategies,
            None => return,
        };
        if let Some(model) = strategies.measure.build_measure_model(stat) {
            logging::debug!(
                "[TimeWindowRegulator] New measure model, app: {}, service: {}",
                model.app_name(),
                model.service()
            );
            {
                let mut models = self.models.write().unwrap();
                // destroyed in the meantime
                if !self.is_initialized() {
                    return;
                }
                models.push(model);
            }
            self.start_regulate();
        }
    }

    fn on_stat_removed(&self, stat: &Arc<InvocationStat>) {
        if let Some(strategies) = self.strategies() {
            strategies.measure.remove_measure_model(stat);
            strategies.regulation.remove_dimension(stat.dimension());
        }
    }
}

fn handle_stat_events(regulator: Weak<TimeWindowRegulator>, events: Receiver<StatEvent>) {
    for event in events {
        let regulator = match regulator.upgrade() {
            Some(regulator) => regulator,
            None => return,
        };
        match event {
            StatEvent::Added(stat) => regulator.on_stat_added(stat),
            StatEvent::Removed(stat) => regulator.on_stat_removed(&stat),
        }
    }
}

fn start_regulation_pool(strategies: &Arc<Strategies>) -> SyncSender<MeasureResult> {
    let (tx, rx) = mpsc::sync_channel::<MeasureResult>(REGULATION_QUEUE_SIZE);
    let rx = Arc::new(Mutex::new(rx));
    for _ in 0..REGULATION_WORKER_COUNT {
        let rx = Arc::clone(&rx);
        let strategies = Arc::clone(strategies);
        thread::spawn(move || loop {
            let task = rx.lock().unwrap().recv();
            match task {
                Ok(result) => strategies.regulate(result),
                Err(_) => break,
            }
        });
    }
    tx
}
