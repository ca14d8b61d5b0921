use crate::error::AppError;
use crate::model::{RewardEntry, Task};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const STORE_FILE_NAME: &str = "quests.json";

/// Location used for weather lookups until the user names one.
pub const DEFAULT_LOCATION: &str = "Shanghai";

/// The durable document. Everything is rewritten as a single unit on
/// every save; there is no append log.
#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    total_coins: u64,
    #[serde(default)]
    ledger: Vec<RewardEntry>,
    #[serde(default = "default_auto_reset")]
    auto_daily_reset_enabled: bool,
    #[serde(default = "default_location")]
    last_known_location: String,
}

fn default_auto_reset() -> bool {
    true
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub total_coins: u64,
    pub ledger: Vec<RewardEntry>,
    pub auto_daily_reset_enabled: bool,
    pub last_known_location: String,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            total_coins: 0,
            ledger: Vec::new(),
            auto_daily_reset_enabled: true,
            last_known_location: default_location(),
        }
    }
}

/// Result of a load that degrades to defaults instead of failing: a
/// malformed document yields the empty initial state plus the error that
/// caused the fallback.
#[derive(Debug, Clone)]
pub struct StateLoad {
    pub state: StoreState,
    pub error: Option<AppError>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("QUEST_STORE_PATH")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("quest").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("quest")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<StoreState, AppError> {
    if !path.exists() {
        return Ok(StoreState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredState =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    Ok(StoreState {
        tasks: stored.tasks,
        total_coins: stored.total_coins,
        ledger: stored.ledger,
        auto_daily_reset_enabled: stored.auto_daily_reset_enabled,
        last_known_location: stored.last_known_location,
    })
}

/// Load that never fails: corruption falls back to the empty initial
/// state and reports the cause instead of propagating it.
pub fn load_state_with_fallback(path: &Path) -> StateLoad {
    match load_state(path) {
        Ok(state) => StateLoad { state, error: None },
        Err(err) => StateLoad {
            state: StoreState::default(),
            error: Some(err),
        },
    }
}

pub fn save_state(path: &Path, state: &StoreState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredState {
        tasks: state.tasks.to_vec(),
        total_coins: state.total_coins,
        ledger: state.ledger.to_vec(),
        auto_daily_reset_enabled: state.auto_daily_reset_enabled,
        last_known_location: state.last_known_location.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;

    // Write to a sibling temp file and rename it into place, so a crash
    // mid-write cannot leave a truncated document behind.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, permissions)
            .map_err(|err| AppError::io(err.to_string()))?;
    }

    std::fs::rename(&tmp_path, path).map_err(|err| AppError::io(err.to_string()))?;

    Ok(())
}
