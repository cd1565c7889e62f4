use std::path::{Path, PathBuf};

use mnistflow::{execute, execute_with, Cli, Command};
use serde_json::json;
use stage_core::ConfigResolver;

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

fn resolver(alias_dir: &Path) -> ConfigResolver {
    ConfigResolver::from_dir(&config_dir()).unwrap()
                                           .with_tree("test", json!({"PATH": {"MNIST": {"ALIAS_DIR": alias_dir}}}))
}

fn output(resolver: ConfigResolver, root: &Path, command: Command) -> (u8, String) {
    let mut out = Vec::new();
    let code = execute_with(resolver, root, &command, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn plan_lists_the_five_stages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (code, text) = output(resolver(dir.path()), dir.path(), Command::Plan);
    assert_eq!(code, 0);
    let ids = ["01_download", "02_plot_digits", "03_plot_embedding", "04_clf_svm", "05_plot_conf_mat"];
    let positions: Vec<usize> = ids.iter().map(|id| text.find(id).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(text.contains("-> mnist/loader_train.bin"));
    assert!(text.contains("<- mnist/predictions.npy"));
}

#[test]
fn shipped_config_dir_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli { config_dir: config_dir(),
                    root: dir.path().to_path_buf(),
                    command: Command::Plan };
    let mut out = Vec::new();
    assert_eq!(execute(&cli, &mut out).unwrap(), 0);
}

#[test]
fn invalid_settings_fail_planning_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = resolver(dir.path()).with_tree("bad", json!({"MNIST": {"BATCH_SIZE": {"TEST": 0}}}));
    let err = execute_with(resolver, dir.path(), &Command::Plan, &mut Vec::new()).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("BATCH_SIZE.TEST"));
}

#[test]
fn unknown_start_stage_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let command = Command::Run { from: Some("99_nope".into()) };
    let err = execute_with(resolver(dir.path()), dir.path(), &command, &mut Vec::new()).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("99_nope"));
}

#[test]
fn history_of_unwritten_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let command = Command::History { key: "mnist/model_svm.bin".into() };
    let err = execute_with(resolver(dir.path()), dir.path(), &command, &mut Vec::new()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn aliases_on_fresh_store_print_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (code, text) = output(resolver(dir.path()), dir.path(), Command::Aliases);
    assert_eq!(code, 0);
    assert!(text.is_empty());
}
