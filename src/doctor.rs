use curio_core::config::{AgentProfile, AppConfig};
use serde_json::Value;

struct CheckResult {
    label: String,
    ok: bool,
    detail: String,
}

/// Print health checks; returns `true` when every check passed.
pub fn run_doctor(config: &AppConfig) -> bool {
    let paths = config.pipeline.paths();
    let mut checks = Vec::new();

    // 1. Dataset present and shaped as a keyed mapping
    checks.push(check_dataset(&paths.dataset_file));

    // 2. Output directory writable
    checks.push(check_output_dir(&paths.output_dir));

    // 3. API keys for both agents
    checks.push(check_api_key("Curation agent", &config.agents.curation));
    checks.push(check_api_key("Literature agent", &config.agents.literature));

    // 4. Test-mode allow-list non-empty
    if config.pipeline.test_mode {
        checks.push(CheckResult {
            label: "Test terms".into(),
            ok: !config.pipeline.test_terms.is_empty(),
            detail: format!("{} allow-listed ids", config.pipeline.test_terms.len()),
        });
    }

    let mut ok_count = 0;
    let mut fail_count = 0;

    for check in &checks {
        let icon = if check.ok { "[OK]" } else { "[!!]" };
        println!("  {} {}: {}", icon, check.label, check.detail);
        if check.ok {
            ok_count += 1;
        } else {
            fail_count += 1;
        }
    }

    println!();
    println!("  {} passed, {} issues found", ok_count, fail_count);
    fail_count == 0
}

fn check_dataset(path: &std::path::Path) -> CheckResult {
    let label = "Dataset".to_string();
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return CheckResult {
                label,
                ok: false,
                detail: format!("{}: {}", path.display(), e),
            }
        }
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(entries)) => CheckResult {
            label,
            ok: true,
            detail: format!("{} ({} records)", path.display(), entries.len()),
        },
        Ok(_) => CheckResult {
            label,
            ok: false,
            detail: format!("{} (not a JSON object)", path.display()),
        },
        Err(e) => CheckResult {
            label,
            ok: false,
            detail: format!("{} (invalid JSON: {})", path.display(), e),
        },
    }
}

fn check_output_dir(dir: &std::path::Path) -> CheckResult {
    if let Err(e) = std::fs::create_dir_all(dir) {
        return CheckResult {
            label: "Output".into(),
            ok: false,
            detail: format!("{} (cannot create: {})", dir.display(), e),
        };
    }
    // Check writable by attempting to create a temp file
    let test_file = dir.join(".doctor_test");
    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            std::fs::remove_file(&test_file).ok();
            CheckResult {
                label: "Output".into(),
                ok: true,
                detail: format!("{}", dir.display()),
            }
        }
        Err(e) => CheckResult {
            label: "Output".into(),
            ok: false,
            detail: format!("{} (not writable: {})", dir.display(), e),
        },
    }
}

fn check_api_key(label: &str, profile: &AgentProfile) -> CheckResult {
    let model = &profile.model;
    let has_key = model
        .api_key
        .as_ref()
        .is_some_and(|k| !k.is_empty() && !k.starts_with("${"));
    let needs_key = curio_llm::providers::presets::requires_api_key(&model.provider);

    if !needs_key || has_key {
        CheckResult {
            label: label.into(),
            ok: true,
            detail: format!("{} ({})", model.model_id, model.provider),
        }
    } else {
        CheckResult {
            label: label.into(),
            ok: false,
            detail: match model.api_key_env() {
                Some(var) => format!("No API key for '{}'; set {}", model.provider, var),
                None => format!("No API key set for provider '{}'", model.provider),
            },
        }
    }
}
