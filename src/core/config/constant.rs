// default app settings
pub const AFT_VERSION: &str = "v1";
pub const DEFAULT_APP_NAME: &str = "unknown_service";
pub const APP_NAME_ENV_KEY: &str = "AFT_APP_NAME";
pub const MEASURE_INTERVAL_ENV_KEY: &str = "AFT_MEASURE_INTERVAL_MS";
pub const CONF_FILE_PATH_ENV_KEY: &str = "AFT_CONFIG_FILE_PATH";
pub const CONFIG_FILENAME: &str = "USE_DEFAULT_CONFIGURATION";

// default fault tolerance settings of an application
pub const DEFAULT_TIME_WINDOW: u64 = 10;
pub const DEFAULT_LEAST_CALL_COUNT: u64 = 100;
pub const DEFAULT_LEAST_WINDOW_COUNT: u64 = 10;
pub const DEFAULT_LEAST_WINDOW_EXCEPTION_RATE_MULTIPLE: f64 = 6.0;
pub const DEFAULT_WEIGHT_DEGRADE_RATE: f64 = 0.05;
pub const DEFAULT_DEGRADE_LEAST_WEIGHT: i32 = 1;
pub const DEFAULT_WEIGHT_RECOVER_RATE: f64 = 2.0;
pub const DEFAULT_DEGRADE_MAX_IP_COUNT: usize = 2;

// default regulator settings
pub const DEFAULT_MEASURE_INTERVAL_MS: u64 = 1000;
pub const REGULATION_WORKER_COUNT: usize = 2;
pub const REGULATION_QUEUE_SIZE: usize = 16;
pub const DEFAULT_MEASURE_STRATEGY: &str = "serviceHorizontal";
pub const DEFAULT_REGULATION_STRATEGY: &str = "timeWindow";
pub const DEFAULT_DEGRADE_STRATEGY: &str = "weight";
pub const DEFAULT_RECOVER_STRATEGY: &str = "weight";

// default log settings
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const LOG_CONFIG_FILE: &str = "testdata/config/log4rs.yaml";
