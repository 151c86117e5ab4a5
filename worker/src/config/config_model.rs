#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: Database,
    pub poller: Poller,
    pub smtp: Smtp,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Poller {
    pub interval_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone)]
pub struct Smtp {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}
