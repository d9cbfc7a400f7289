use crate::tests::{EnvGuard, setup_config_dir, write_config};
use crate::{Config, DEFAULT_LAYER_ALIAS, DEFAULT_PORT};

use googletest::assert_that;
use googletest::prelude::{anything, eq, err, ok};
use log::LevelFilter;
use serial_test::serial;

// =========================================================================
// Happy Path Tests
// =========================================================================

#[test]
#[serial]
fn given_no_config_file_when_load_then_ok_with_defaults() {
    // Given
    let _temp = setup_config_dir();

    // When
    let result = Config::load();

    // Then
    assert_that!(result, ok(anything()));
    let config = result.unwrap();
    assert_that!(config.server.port, eq(DEFAULT_PORT));
    assert_that!(config.multiplex.close_timeout_ms, eq(10_000));
    assert_that!(
        config.dispatch.priority_types,
        eq(&vec![String::from("websocket.disconnect")])
    );
    assert!(config.default_layer().is_some());
}

#[test]
#[serial]
fn given_no_config_file_when_load_and_validate_then_ok() {
    // Given
    let _temp = setup_config_dir();

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, ok(anything()));
}

#[test]
#[serial]
fn given_missing_config_dir_when_load_then_dir_created() {
    // Given
    let temp = tempfile::TempDir::new().unwrap();
    let nested = temp.path().join("nested").join("conf");
    let _guard = EnvGuard::set("CL_CONFIG_DIR", nested.to_str().unwrap());

    // When
    let result = Config::load();

    // Then
    assert_that!(result, ok(anything()));
    assert!(nested.is_dir());
}

#[test]
#[serial]
fn given_valid_toml_file_when_load_then_uses_toml_values() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(
        &temp,
        r#"
            [server]
            port = 9000

            [multiplex]
            close_timeout_ms = 250

            [dispatch]
            priority_types = ["websocket.disconnect", "chat.kick"]
        "#,
    );

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.server.port, eq(9000));
    assert_that!(config.multiplex.close_timeout_ms, eq(250));
    assert_that!(config.dispatch.priority_types.len(), eq(2));
}

#[test]
#[serial]
fn given_env_var_and_toml_when_load_then_env_var_overrides_toml() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(
        &temp,
        r#"
            [server]
            port = 9000
        "#,
    );
    let _port = EnvGuard::set("CL_SERVER_PORT", "9100");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.server.port, eq(9100));
}

#[test]
#[serial]
fn given_priority_types_env_list_when_load_then_split_and_trimmed() {
    // Given
    let _temp = setup_config_dir();
    let _types = EnvGuard::set("CL_DISPATCH_PRIORITY_TYPES", " websocket.disconnect , chat.kick,,");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(
        config.dispatch.priority_types,
        eq(&vec![
            String::from("websocket.disconnect"),
            String::from("chat.kick")
        ])
    );
}

#[test]
#[serial]
fn given_logging_env_vars_when_load_then_logging_overridden() {
    // Given
    let _temp = setup_config_dir();
    let _level = EnvGuard::set("CL_LOG_LEVEL", "debug");
    let _colored = EnvGuard::set("CL_LOG_COLORED", "0");
    let _file = EnvGuard::set("CL_LOG_FILE", "server.log");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(*config.logging.level, eq(LevelFilter::Debug));
    assert_that!(config.logging.colored, eq(false));
    assert_that!(config.logging.file.as_deref(), eq(Some("server.log")));
}

#[test]
#[serial]
fn given_unknown_log_level_when_load_then_falls_back_to_info() {
    // Given
    let (temp, _guard) = setup_config_dir();
    let _level = EnvGuard::remove("CL_LOG_LEVEL");
    write_config(
        &temp,
        r#"
            [logging]
            level = "chatty"
        "#,
    );

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(*config.logging.level, eq(LevelFilter::Info));
}

// =========================================================================
// Error Tests
// =========================================================================

#[test]
#[serial]
fn given_malformed_toml_when_load_then_error() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(&temp, "[server\nport = ");

    // When
    let result = Config::load();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_layers_table_without_default_when_load_then_default_alias_added() {
    // Given
    let (temp, _guard) = setup_config_dir();
    write_config(
        &temp,
        r#"
            [layers.chat]
            capacity = 10
        "#,
    );

    // When
    let config = Config::load().unwrap();

    // Then
    assert!(config.layers.contains_key(DEFAULT_LAYER_ALIAS));
    assert!(config.layers.contains_key("chat"));
    assert_that!(config.validate(), ok(anything()));
}

#[test]
fn given_config_without_default_layer_when_validate_then_error() {
    // Given
    let config = Config::default();

    // When
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_host_and_port_when_bind_addr_then_joined() {
    // Given
    let _temp = setup_config_dir();
    let _host = EnvGuard::set("CL_SERVER_HOST", "0.0.0.0");
    let _port = EnvGuard::set("CL_SERVER_PORT", "8080");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.bind_addr(), eq("0.0.0.0:8080"));
}
