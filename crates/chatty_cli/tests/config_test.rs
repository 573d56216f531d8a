use camino_tempfile::tempdir;
use chatty_cli::config::{API_KEY_ENV, Config};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn test_full_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, indoc! {r#"
        [api]
        url = "http://localhost:11434/v1/"
        key = "local"

        [model]
        name = "qwen3"
        temperature = 0.2
        stream = true

        [ui]
        colors = false
        markdown = false
        theme = "Nord"

        [stream]
        max_line_length = 4096

        [storage]
        enabled = false
        path = "/tmp/chatty/sessions.db"
    "#})
    .unwrap();

    let mut config = Config::load(Some(path.as_std_path())).unwrap();
    config.apply_env(|_| None);
    config.validate().unwrap();

    assert_eq!(config.api.url, "http://localhost:11434/v1/");
    assert_eq!(config.model.name, "qwen3");
    assert_eq!(config.ui.theme.as_deref(), Some("Nord"));
    assert!(!config.ui.colors);
    assert_eq!(config.stream.max_line_length, 4096);
    assert!(!config.storage.enabled);
    assert_eq!(config.storage.database_path(), None);
}

#[test]
fn test_invalid_file_reports_all_problems() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, indoc! {r#"
        [api]
        url = "localhost"

        [model]
        temperature = 3.0
    "#})
    .unwrap();

    let config = Config::load(Some(path.as_std_path())).unwrap();
    let message = config.validate().unwrap_err().to_string();

    assert!(message.contains("api.url"), "{message}");
    assert!(message.contains("api.key"), "{message}");
    assert!(message.contains(API_KEY_ENV), "{message}");
    assert!(message.contains("model.temperature"), "{message}");
}
