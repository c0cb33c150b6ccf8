/// Runtime configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Students fetched concurrently; each worker owns its own browser session
    pub max_concurrent_students: usize,
    /// Explicit Chrome/Chromium binary, if not on the default lookup path
    pub chrome_executable: Option<String>,
    /// Result page of the current exam cycle
    pub result_url: String,
    /// Roster file seeding the in-memory store
    pub roster_file: String,
    /// Section scraped by the CLI runner
    pub section_id: i64,
    /// Semester scraped by the CLI runner
    pub semester_id: i64,
    /// Bounded wait for form elements
    pub element_wait_secs: u64,
    /// Bounded wait for the result detail table after submit
    pub detail_wait_secs: u64,
    /// Settle time before checking for a modal after submit
    pub alert_settle_millis: u64,
    /// Expected captcha text length; a shorter/longer read triggers one refresh
    pub captcha_length: usize,
    /// Invalid-captcha attempts per student before giving up
    pub captcha_max_attempts: usize,
    /// Backoff before re-acquiring a session after a source cooldown
    pub cooldown_backoff_secs: u64,
    /// Cooldown rounds per student before giving up
    pub cooldown_max_rounds: usize,
    /// Progress record retention
    pub progress_ttl_secs: u64,
    /// CLI progress poll interval
    pub poll_interval_secs: u64,
    // --- captcha recognition service ---
    pub captcha_api_url: String,
    pub captcha_user_id: String,
    pub captcha_api_key: String,
    pub captcha_timeout_secs: u64,
    /// Verbose per-row logging
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_students: 2,
            chrome_executable: None,
            result_url: "https://results.vtu.ac.in/JJEcbcs24/index.php".to_string(),
            roster_file: "roster.toml".to_string(),
            section_id: 1,
            semester_id: 1,
            element_wait_secs: 10,
            detail_wait_secs: 4,
            alert_settle_millis: 50,
            captcha_length: 6,
            captcha_max_attempts: 3,
            cooldown_backoff_secs: 10,
            cooldown_max_rounds: 6,
            progress_ttl_secs: 10_800,
            poll_interval_secs: 2,
            captcha_api_url: "https://api.apitruecaptcha.org/one/gettext".to_string(),
            captcha_user_id: String::new(),
            captcha_api_key: String::new(),
            captcha_timeout_secs: 5,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_students: std::env::var("MAX_CONCURRENT_STUDENTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_students),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            result_url: std::env::var("RESULT_URL").unwrap_or(default.result_url),
            roster_file: std::env::var("ROSTER_FILE").unwrap_or(default.roster_file),
            section_id: std::env::var("SECTION_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(default.section_id),
            semester_id: std::env::var("SEMESTER_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(default.semester_id),
            element_wait_secs: std::env::var("ELEMENT_WAIT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.element_wait_secs),
            detail_wait_secs: std::env::var("DETAIL_WAIT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.detail_wait_secs),
            alert_settle_millis: std::env::var("ALERT_SETTLE_MILLIS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.alert_settle_millis),
            captcha_length: std::env::var("CAPTCHA_LENGTH").ok().and_then(|v| v.parse().ok()).unwrap_or(default.captcha_length),
            captcha_max_attempts: std::env::var("CAPTCHA_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.captcha_max_attempts),
            cooldown_backoff_secs: std::env::var("COOLDOWN_BACKOFF_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cooldown_backoff_secs),
            cooldown_max_rounds: std::env::var("COOLDOWN_MAX_ROUNDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cooldown_max_rounds),
            progress_ttl_secs: std::env::var("PROGRESS_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.progress_ttl_secs),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_secs),
            captcha_api_url: std::env::var("TRUE_CAPTCHA_URL").unwrap_or(default.captcha_api_url),
            captcha_user_id: std::env::var("TRUE_CAPTCHA_USER_ID").unwrap_or(default.captcha_user_id),
            captcha_api_key: std::env::var("TRUE_CAPTCHA_API_KEY").unwrap_or(default.captcha_api_key),
            captcha_timeout_secs: std::env::var("CAPTCHA_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.captcha_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
